use serde_json::{Map, Value};

use crate::{
    plan::plan_nodes::RequiresSelection, response::merge::deep_merge_objects,
    schema::metadata::PossibleTypes, utils::consts::TYPENAME_FIELD_NAME,
};

/// Builds the representation sent to a subgraph for one entity.
///
/// Returns `None` when the entity has nothing to send besides its `__typename`,
/// or when no `__typename` can be determined for it.
pub fn project_requires(
    possible_types: &PossibleTypes,
    requires_selections: &[RequiresSelection],
    entity: &Value,
) -> Option<Value> {
    let Value::Object(entity_obj) = entity else {
        return None;
    };

    // The source wins, the first inline fragment is the fallback.
    let type_name = match entity_obj.get(TYPENAME_FIELD_NAME) {
        Some(Value::String(type_name)) => type_name.as_str(),
        _ => requires_selections
            .iter()
            .find_map(|selection| match selection {
                RequiresSelection::InlineFragment(fragment) => Some(fragment.type_condition.as_str()),
                RequiresSelection::Field(_) => None,
            })?,
    };

    let projected = project_object(possible_types, requires_selections, entity_obj);
    if !has_fields_besides_typename(&projected) {
        return None;
    }

    let mut representation = Map::with_capacity(projected.len() + 1);
    representation.insert(TYPENAME_FIELD_NAME.to_string(), type_name.into());
    for (key, value) in projected {
        if key != TYPENAME_FIELD_NAME {
            representation.insert(key, value);
        }
    }

    Some(Value::Object(representation))
}

fn has_fields_besides_typename(map: &Map<String, Value>) -> bool {
    map.keys().any(|key| key != TYPENAME_FIELD_NAME)
}

fn project_object(
    possible_types: &PossibleTypes,
    requires_selections: &[RequiresSelection],
    entity_obj: &Map<String, Value>,
) -> Map<String, Value> {
    let mut result_map = Map::new();

    for requires_selection in requires_selections {
        match requires_selection {
            RequiresSelection::Field(field) => {
                let response_key = field.response_key();
                let original = entity_obj
                    .get(&field.name)
                    .or_else(|| entity_obj.get(response_key));

                if let Some(projected) = original.and_then(|original| {
                    project_value(possible_types, field.selections.as_deref(), original)
                }) {
                    result_map.insert(response_key.to_string(), projected);
                }
            }
            RequiresSelection::InlineFragment(fragment) => {
                let type_name = match entity_obj.get(TYPENAME_FIELD_NAME) {
                    Some(Value::String(type_name)) => type_name.as_str(),
                    _ => fragment.type_condition.as_str(),
                };
                if possible_types.entity_satisfies_type_condition(type_name, &fragment.type_condition)
                {
                    let projected = project_object(possible_types, &fragment.selections, entity_obj);
                    deep_merge_objects(&mut result_map, projected);
                }
            }
        }
    }

    result_map
}

fn project_value(
    possible_types: &PossibleTypes,
    selections: Option<&[RequiresSelection]>,
    value: &Value,
) -> Option<Value> {
    let selections = match selections {
        Some(selections) if !selections.is_empty() => selections,
        _ => {
            return match value {
                Value::Null => None,
                value => Some(value.clone()),
            }
        }
    };

    match value {
        Value::Null => None,
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| project_value(possible_types, Some(selections), item).unwrap_or(Value::Null))
                .collect(),
        )),
        Value::Object(obj) => {
            let projected = project_object(possible_types, selections, obj);
            has_fields_besides_typename(&projected).then_some(Value::Object(projected))
        }
        scalar => Some(scalar.clone()),
    }
}
