use serde_json::Value;

use crate::{
    plan::plan_nodes::FlattenNodePathSegment,
    response::graphql_error::{GraphQLErrorPath, GraphQLErrorPathSegment},
    schema::metadata::PossibleTypes,
    utils::consts::TYPENAME_FIELD_NAME,
};

/// Walks `remaining_path` from `current_data` and calls `callback` with every
/// object found at the end of it, together with the concrete path taken.
///
/// `Field` and `Cast` steps distribute over lists on their own, `List` requires one.
/// Objects failing a `Cast` are pruned. Nulls and scalars are never collected.
pub fn traverse_and_callback<'a, Callback>(
    current_data: &'a Value,
    remaining_path: &[FlattenNodePathSegment],
    possible_types: &PossibleTypes,
    current_path: GraphQLErrorPath,
    callback: &mut Callback,
) where
    Callback: FnMut(&'a Value, GraphQLErrorPath),
{
    let Some((segment, rest_of_path)) = remaining_path.split_first() else {
        collect_objects(current_data, current_path, callback);
        return;
    };

    match (segment, current_data) {
        (FlattenNodePathSegment::List, Value::Array(arr)) => {
            for (index, item) in arr.iter().enumerate() {
                traverse_and_callback(
                    item,
                    rest_of_path,
                    possible_types,
                    current_path.concat_index(index),
                    callback,
                );
            }
        }
        (FlattenNodePathSegment::Field(_) | FlattenNodePathSegment::Cast(_), Value::Array(arr)) => {
            for (index, item) in arr.iter().enumerate() {
                traverse_and_callback(
                    item,
                    remaining_path,
                    possible_types,
                    current_path.concat_index(index),
                    callback,
                );
            }
        }
        (FlattenNodePathSegment::Field(field_name), Value::Object(map)) => {
            if let Some(next_data) = map.get(field_name) {
                traverse_and_callback(
                    next_data,
                    rest_of_path,
                    possible_types,
                    current_path.concat_str(field_name.clone()),
                    callback,
                );
            }
        }
        (FlattenNodePathSegment::Cast(type_condition), Value::Object(map)) => {
            let type_name = map
                .get(TYPENAME_FIELD_NAME)
                .and_then(Value::as_str)
                .unwrap_or(type_condition);
            if possible_types.entity_satisfies_type_condition(type_name, type_condition) {
                traverse_and_callback(
                    current_data,
                    rest_of_path,
                    possible_types,
                    current_path,
                    callback,
                );
            }
        }
        _ => {}
    }
}

fn collect_objects<'a, Callback>(
    current_data: &'a Value,
    current_path: GraphQLErrorPath,
    callback: &mut Callback,
) where
    Callback: FnMut(&'a Value, GraphQLErrorPath),
{
    match current_data {
        Value::Array(arr) => {
            for (index, item) in arr.iter().enumerate() {
                collect_objects(item, current_path.concat_index(index), callback);
            }
        }
        Value::Object(_) => callback(current_data, current_path),
        _ => {}
    }
}

/// Resolves a concrete path back to the value it points at.
pub fn value_at_path_mut<'a>(data: &'a mut Value, path: &GraphQLErrorPath) -> Option<&'a mut Value> {
    path.segments
        .iter()
        .try_fold(data, |current, segment| match (segment, current) {
            (GraphQLErrorPathSegment::String(key), Value::Object(map)) => map.get_mut(key),
            (GraphQLErrorPathSegment::Index(index), Value::Array(arr)) => arr.get_mut(*index),
            _ => None,
        })
}
