use std::collections::HashMap;

use graphql_parser::query::{
    Directive, FragmentDefinition, Selection, SelectionSet, TypeCondition, Value as ParserValue,
};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::{
    execution::request::SelectedOperation,
    projection::error::ProjectionError,
    response::merge::deep_merge,
    schema::metadata::SchemaMetadata,
    utils::consts::TYPENAME_FIELD_NAME,
};

struct ResponseProjectionContext<'a> {
    schema_metadata: &'a SchemaMetadata,
    fragments: &'a HashMap<&'a str, &'a FragmentDefinition<'static, String>>,
    variables: &'a Map<String, Value>,
}

/// Shapes the assembled data exactly like the client's selection set.
/// Everything the plan fetched only for internal use is left out.
#[instrument(level = "debug", skip_all, fields(operation_name = ?operation.name))]
pub fn project_by_operation(
    data: &Value,
    operation: &SelectedOperation<'_>,
    schema_metadata: &SchemaMetadata,
    variables: &Map<String, Value>,
) -> Result<Value, ProjectionError> {
    let root_type_name = schema_metadata
        .root_type_name(operation.kind)
        .ok_or_else(|| ProjectionError::UnknownRootType(operation.kind.to_string()))?;

    let ctx = ResponseProjectionContext {
        schema_metadata,
        fragments: &operation.fragments,
        variables,
    };

    let empty = Map::new();
    let source = data.as_object().unwrap_or(&empty);
    let mut projected = Map::new();
    project_selection_set(
        &ctx,
        operation.selection_set,
        root_type_name,
        source,
        &mut projected,
    )?;

    Ok(Value::Object(projected))
}

fn project_selection_set(
    ctx: &ResponseProjectionContext<'_>,
    selection_set: &SelectionSet<'static, String>,
    parent_type_name: &str,
    source: &Map<String, Value>,
    projected: &mut Map<String, Value>,
) -> Result<(), ProjectionError> {
    let type_name = match source.get(TYPENAME_FIELD_NAME) {
        Some(Value::String(type_name)) => type_name.as_str(),
        _ => parent_type_name,
    };

    for selection in &selection_set.items {
        match selection {
            Selection::Field(field) => {
                if !should_include(&field.directives, ctx.variables) {
                    continue;
                }
                let response_key = field.alias.as_ref().unwrap_or(&field.name);

                let value = if field.name == TYPENAME_FIELD_NAME {
                    Value::String(type_name.to_string())
                } else if field.name.starts_with("__") {
                    // Introspection is answered elsewhere, the data is taken as it is.
                    source.get(response_key).cloned().unwrap_or(Value::Null)
                } else {
                    let field_type = ctx
                        .schema_metadata
                        .field_type(type_name, &field.name)
                        .or_else(|| ctx.schema_metadata.field_type(parent_type_name, &field.name))
                        .ok_or_else(|| {
                            ProjectionError::FieldDefinitionNotFound(
                                field.name.clone(),
                                type_name.to_string(),
                            )
                        })?;

                    project_value(
                        ctx,
                        source.get(response_key),
                        &field.selection_set,
                        field_type,
                    )?
                };

                match projected.get_mut(response_key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        projected.insert(response_key.clone(), value);
                    }
                }
            }
            Selection::InlineFragment(inline_fragment) => {
                if !should_include(&inline_fragment.directives, ctx.variables) {
                    continue;
                }
                let fragment_type = match &inline_fragment.type_condition {
                    Some(TypeCondition::On(type_condition)) => type_condition.as_str(),
                    None => parent_type_name,
                };
                if satisfies(ctx, type_name, fragment_type) {
                    project_selection_set(
                        ctx,
                        &inline_fragment.selection_set,
                        fragment_type,
                        source,
                        projected,
                    )?;
                }
            }
            Selection::FragmentSpread(fragment_spread) => {
                if !should_include(&fragment_spread.directives, ctx.variables) {
                    continue;
                }
                let fragment = ctx
                    .fragments
                    .get(fragment_spread.fragment_name.as_str())
                    .ok_or_else(|| {
                        ProjectionError::FragmentNotFound(fragment_spread.fragment_name.clone())
                    })?;
                let TypeCondition::On(fragment_type) = &fragment.type_condition;
                if satisfies(ctx, type_name, fragment_type) {
                    project_selection_set(
                        ctx,
                        &fragment.selection_set,
                        fragment_type,
                        source,
                        projected,
                    )?;
                }
            }
        }
    }

    Ok(())
}

fn satisfies(ctx: &ResponseProjectionContext<'_>, type_name: &str, type_condition: &str) -> bool {
    ctx.schema_metadata
        .possible_types
        .entity_satisfies_type_condition(type_name, type_condition)
}

fn project_value(
    ctx: &ResponseProjectionContext<'_>,
    value: Option<&Value>,
    selection_set: &SelectionSet<'static, String>,
    field_type: &str,
) -> Result<Value, ProjectionError> {
    let Some(value) = value else {
        return Ok(Value::Null);
    };

    match value {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => items
            .iter()
            .map(|item| project_value(ctx, Some(item), selection_set, field_type))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(obj) if !selection_set.items.is_empty() => {
            let concrete_type = match obj.get(TYPENAME_FIELD_NAME) {
                Some(Value::String(type_name)) => type_name.as_str(),
                _ => field_type,
            };
            if ctx.schema_metadata.is_inaccessible_type(concrete_type) {
                return Ok(Value::Null);
            }

            let mut projected = Map::new();
            project_selection_set(ctx, selection_set, field_type, obj, &mut projected)?;
            Ok(Value::Object(projected))
        }
        Value::String(enum_value)
            if ctx
                .schema_metadata
                .is_inaccessible_enum_value(field_type, enum_value) =>
        {
            Ok(Value::Null)
        }
        leaf => Ok(leaf.clone()),
    }
}

/// `@skip(if:)` and `@include(if:)`, with literal or variable arguments.
pub fn should_include(
    directives: &[Directive<'static, String>],
    variables: &Map<String, Value>,
) -> bool {
    directives.iter().all(|directive| {
        let condition = directive
            .arguments
            .iter()
            .find(|(name, _)| name == "if")
            .and_then(|(_, value)| match value {
                ParserValue::Boolean(condition) => Some(*condition),
                ParserValue::Variable(variable_name) => {
                    variables.get(variable_name).and_then(Value::as_bool)
                }
                _ => None,
            });

        match directive.name.as_str() {
            "skip" => !condition.unwrap_or(false),
            "include" => condition.unwrap_or(true),
            _ => true,
        }
    })
}
