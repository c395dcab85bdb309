pub mod value_from_ast;

use std::fmt::{self, Display};

use graphql_parser::query::VariableDefinition;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::{
    execution::error::PlanExecutionError,
    schema::metadata::{InputFieldDefinition, SchemaMetadata, TypeNode},
    variables::value_from_ast::value_from_ast,
};

impl Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Named(name) => write!(f, "{}", name),
            TypeNode::List(inner) => write!(f, "[{}]", inner),
            TypeNode::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

/// Coerces the raw request variables against the operation's variable definitions.
///
/// Every problem is collected before failing. A single problem is reported as
/// [`PlanExecutionError::VariableCoercion`], several as
/// [`PlanExecutionError::AggregateVariableCoercion`].
/// Nullable variables that were neither provided nor defaulted are left out.
#[instrument(level = "trace", skip_all)]
pub fn coerce_variables(
    variable_definitions: &[VariableDefinition<'_, String>],
    raw_variables: Option<&Map<String, Value>>,
    schema_metadata: &SchemaMetadata,
) -> Result<Map<String, Value>, PlanExecutionError> {
    let mut coerced = Map::new();
    let mut errors: Vec<String> = Vec::new();

    for definition in variable_definitions {
        let variable_name = definition.name.as_str();
        let type_node: TypeNode = (&definition.var_type).into();

        let provided = raw_variables.and_then(|variables| variables.get(variable_name));
        let candidate = match (provided, &definition.default_value) {
            (Some(value), _) => value.clone(),
            (None, Some(default_value)) => value_from_ast(default_value),
            (None, None) => {
                if type_node.is_non_null() {
                    errors.push(format!(
                        "Variable \"${}\" of required type \"{}\" was not provided.",
                        variable_name, type_node
                    ));
                }
                continue;
            }
        };

        match coerce_value(&candidate, &type_node, schema_metadata) {
            Ok(value) => {
                coerced.insert(variable_name.to_string(), value);
            }
            Err(reason) => errors.push(format!(
                "Variable \"${}\" got invalid value {}; {}",
                variable_name, candidate, reason
            )),
        }
    }

    if errors.is_empty() {
        Ok(coerced)
    } else if errors.len() == 1 {
        Err(PlanExecutionError::VariableCoercion(errors.swap_remove(0)))
    } else {
        Err(PlanExecutionError::AggregateVariableCoercion(errors))
    }
}

fn coerce_value(
    value: &Value,
    type_node: &TypeNode,
    schema_metadata: &SchemaMetadata,
) -> Result<Value, String> {
    match type_node {
        TypeNode::NonNull(inner_type) => {
            if value.is_null() {
                return Err(format!(
                    "Expected non-nullable type \"{}\" not to be null.",
                    type_node
                ));
            }
            coerce_value(value, inner_type, schema_metadata)
        }
        _ if value.is_null() => Ok(Value::Null),
        TypeNode::List(inner_type) => match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    coerce_value(item, inner_type, schema_metadata)
                        .map_err(|reason| format!("At index {}: {}", index, reason))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            // a single value is accepted where a list is expected
            single => coerce_value(single, inner_type, schema_metadata)
                .map(|coerced| Value::Array(vec![coerced])),
        },
        TypeNode::Named(type_name) => coerce_named_value(value, type_name, schema_metadata),
    }
}

fn coerce_named_value(
    value: &Value,
    type_name: &str,
    schema_metadata: &SchemaMetadata,
) -> Result<Value, String> {
    match type_name {
        "String" => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(format!("String cannot represent a non string value: {}", value)),
        },
        "Int" => match value.as_i64() {
            Some(number) if i32::try_from(number).is_ok() => Ok(value.clone()),
            _ => Err(format!("Int cannot represent non-integer value: {}", value)),
        },
        "Float" => match value {
            Value::Number(_) => Ok(value.clone()),
            _ => Err(format!("Float cannot represent non numeric value: {}", value)),
        },
        "Boolean" => match value {
            Value::Bool(_) => Ok(value.clone()),
            _ => Err(format!("Boolean cannot represent a non boolean value: {}", value)),
        },
        "ID" => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(number) if number.is_i64() || number.is_u64() => {
                Ok(Value::String(number.to_string()))
            }
            _ => Err(format!("ID cannot represent value: {}", value)),
        },
        _ => {
            if let Some(enum_values) = schema_metadata.enum_values.get(type_name) {
                match value.as_str() {
                    Some(enum_value) if enum_values.contains(enum_value) => Ok(value.clone()),
                    _ => Err(format!(
                        "Value {} does not exist in \"{}\" enum.",
                        value, type_name
                    )),
                }
            } else if let Some(fields) = schema_metadata.input_object_fields.get(type_name) {
                coerce_input_object(value, type_name, fields, schema_metadata)
            } else {
                // custom scalars are passed through as-is
                Ok(value.clone())
            }
        }
    }
}

fn coerce_input_object(
    value: &Value,
    type_name: &str,
    fields: &std::collections::HashMap<String, InputFieldDefinition>,
    schema_metadata: &SchemaMetadata,
) -> Result<Value, String> {
    let Value::Object(provided) = value else {
        return Err(format!("Expected type \"{}\" to be an object.", type_name));
    };

    let mut coerced = Map::new();
    for (field_name, field_value) in provided {
        let Some(field_definition) = fields.get(field_name) else {
            return Err(format!(
                "Field \"{}\" is not defined by type \"{}\".",
                field_name, type_name
            ));
        };
        let field_value = coerce_value(field_value, &field_definition.type_node, schema_metadata)
            .map_err(|reason| format!("In field \"{}\": {}", field_name, reason))?;
        coerced.insert(field_name.clone(), field_value);
    }

    let mut missing: Vec<(&String, &InputFieldDefinition)> = fields
        .iter()
        .filter(|(field_name, _)| !provided.contains_key(field_name.as_str()))
        .collect();
    missing.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (field_name, field_definition) in missing {
        match &field_definition.default_value {
            Some(default_value) => {
                coerced.insert(field_name.clone(), default_value.clone());
            }
            None if field_definition.type_node.is_non_null() => {
                return Err(format!(
                    "Field \"{}\" of required type \"{}\" was not provided.",
                    field_name, field_definition.type_node
                ));
            }
            None => {}
        }
    }

    Ok(Value::Object(coerced))
}
