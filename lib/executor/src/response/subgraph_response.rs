use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{response::graphql_error::GraphQLError, utils::consts::ENTITIES_FIELD_NAME};

/// A GraphQL response returned by one subgraph.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubgraphResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQLError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl SubgraphResponse {
    pub fn from_data(data: Value) -> Self {
        SubgraphResponse {
            data,
            ..Default::default()
        }
    }

    pub fn from_errors(errors: Vec<GraphQLError>) -> Self {
        SubgraphResponse {
            errors: Some(errors),
            ..Default::default()
        }
    }

    /// Moves the `_entities` list out of `data`, if there is one.
    pub fn take_entities(&mut self) -> Option<Vec<Value>> {
        match self.data.get_mut(ENTITIES_FIELD_NAME).map(Value::take) {
            Some(Value::Array(entities)) => Some(entities),
            _ => None,
        }
    }
}
