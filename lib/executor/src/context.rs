use std::sync::{Mutex, PoisonError};

use serde_json::{Map, Value};

use crate::{
    execution::request::{ExecutionRequest, SelectedOperation},
    executors::map::SubgraphExecutorMap,
    response::graphql_error::GraphQLError,
    schema::metadata::SchemaMetadata,
};

/// Per-request state of one plan execution.
///
/// `data` and `errors` are shared by every branch of the plan. They are only
/// touched inside synchronous sections, never across an `.await`.
pub struct ExecutionContext<'a> {
    pub schema_metadata: &'a SchemaMetadata,
    pub operation: SelectedOperation<'a>,
    pub variables: Map<String, Value>,
    pub request: &'a ExecutionRequest,
    pub executors: &'a SubgraphExecutorMap,
    data: Mutex<Value>,
    errors: Mutex<Vec<GraphQLError>>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        schema_metadata: &'a SchemaMetadata,
        operation: SelectedOperation<'a>,
        variables: Map<String, Value>,
        request: &'a ExecutionRequest,
        executors: &'a SubgraphExecutorMap,
    ) -> Self {
        ExecutionContext {
            schema_metadata,
            operation,
            variables,
            request,
            executors,
            data: Mutex::new(Value::Object(Map::new())),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn with_data<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut data)
    }

    pub fn push_errors(&self, new_errors: impl IntoIterator<Item = GraphQLError>) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(new_errors);
    }

    pub fn take_errors(&self) -> Vec<GraphQLError> {
        std::mem::take(&mut *self.errors.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
