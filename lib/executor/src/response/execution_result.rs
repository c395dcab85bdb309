use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::response::graphql_error::GraphQLError;

/// The outward `{ data, errors, extensions }` of one execution.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQLError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl ExecutionResult {
    pub fn new(
        data: Option<Value>,
        errors: Option<Vec<GraphQLError>>,
        extensions: Option<Map<String, Value>>,
    ) -> ExecutionResult {
        ExecutionResult {
            data: data.filter(|data| !data.is_null()),
            errors: errors.filter(|errors| !errors.is_empty()),
            extensions: extensions.filter(|extensions| !extensions.is_empty()),
        }
    }
}
