use std::{any::Any, collections::HashMap, sync::Arc};

use graphql_parser::query::{
    Definition, Document, FragmentDefinition, OperationDefinition, SelectionSet,
    VariableDefinition,
};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::{execution::error::PlanExecutionError, plan::plan_nodes::OperationKind};

/// Opaque per-request data handed to every subgraph executor untouched.
pub type RequestContext = Arc<dyn Any + Send + Sync>;

/// What the client asked for.
pub struct ExecutionRequest {
    pub document: Arc<Document<'static, String>>,
    pub operation_name: Option<String>,
    pub variables: Option<Map<String, Value>>,
    pub context: Option<RequestContext>,
    pub root_value: Option<Value>,
    pub extensions: Option<Map<String, Value>>,
    pub cancellation_token: CancellationToken,
}

impl ExecutionRequest {
    pub fn new(document: Arc<Document<'static, String>>) -> Self {
        ExecutionRequest {
            document,
            operation_name: None,
            variables: None,
            context: None,
            root_value: None,
            extensions: None,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn parse(query: &str) -> Result<Self, PlanExecutionError> {
        let document = graphql_parser::parse_query::<String>(query)
            .map_err(|e| PlanExecutionError::OperationParse(e.to_string()))?
            .into_static();
        Ok(Self::new(Arc::new(document)))
    }

    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_root_value(mut self, root_value: Value) -> Self {
        self.root_value = Some(root_value);
        self
    }

    pub fn with_extensions(mut self, extensions: Map<String, Value>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn with_cancellation_token(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = cancellation_token;
        self
    }
}

/// The operation picked out of the client document, with the fragments it may spread.
pub struct SelectedOperation<'a> {
    pub name: Option<&'a str>,
    pub kind: OperationKind,
    pub variable_definitions: &'a [VariableDefinition<'static, String>],
    pub selection_set: &'a SelectionSet<'static, String>,
    pub fragments: HashMap<&'a str, &'a FragmentDefinition<'static, String>>,
}

pub fn select_operation<'a>(
    document: &'a Document<'static, String>,
    operation_name: Option<&str>,
) -> Result<SelectedOperation<'a>, PlanExecutionError> {
    let mut fragments = HashMap::new();
    let mut operations = Vec::new();

    for definition in &document.definitions {
        match definition {
            Definition::Operation(operation) => operations.push(operation),
            Definition::Fragment(fragment) => {
                fragments.insert(fragment.name.as_str(), fragment);
            }
        }
    }

    let operation = match operation_name.filter(|name| !name.is_empty()) {
        Some(name) => operations
            .into_iter()
            .find(|operation| operation_definition_name(operation) == Some(name))
            .ok_or_else(|| PlanExecutionError::OperationNotFound(name.to_string()))?,
        None => match operations.as_slice() {
            [operation] => *operation,
            [] => return Err(PlanExecutionError::MissingOperation),
            _ => return Err(PlanExecutionError::AmbiguousOperation),
        },
    };

    let (kind, variable_definitions, selection_set) = match operation {
        OperationDefinition::SelectionSet(selection_set) => {
            (OperationKind::Query, &[] as &[VariableDefinition<'static, String>], selection_set)
        }
        OperationDefinition::Query(query) => (
            OperationKind::Query,
            query.variable_definitions.as_slice(),
            &query.selection_set,
        ),
        OperationDefinition::Mutation(mutation) => (
            OperationKind::Mutation,
            mutation.variable_definitions.as_slice(),
            &mutation.selection_set,
        ),
        OperationDefinition::Subscription(subscription) => (
            OperationKind::Subscription,
            subscription.variable_definitions.as_slice(),
            &subscription.selection_set,
        ),
    };

    Ok(SelectedOperation {
        name: operation_definition_name(operation),
        kind,
        variable_definitions,
        selection_set,
        fragments,
    })
}

fn operation_definition_name<'a>(operation: &'a OperationDefinition<'static, String>) -> Option<&'a str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => query.name.as_deref(),
        OperationDefinition::Mutation(mutation) => mutation.name.as_deref(),
        OperationDefinition::Subscription(subscription) => subscription.name.as_deref(),
    }
}
