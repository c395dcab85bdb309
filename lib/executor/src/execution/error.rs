use crate::{projection::error::ProjectionError, schema::metadata::SchemaMetadataError};

/// Fatal failures. Anything that can be reported as a GraphQL error next to
/// partial data never ends up here.
#[derive(thiserror::Error, Debug, Clone)]
pub enum PlanExecutionError {
    #[error("{0}")]
    VariableCoercion(String),
    #[error("{}", .0.join("\n"))]
    AggregateVariableCoercion(Vec<String>),
    #[error("Failed to parse the operation: {0}")]
    OperationParse(String),
    #[error("Unknown operation named \"{0}\".")]
    OperationNotFound(String),
    #[error("Must provide an operation.")]
    MissingOperation,
    #[error("Must provide operation name if query contains multiple operations.")]
    AmbiguousOperation,
    #[error("Flatten node at path \"{0}\" must wrap a Fetch node, got {1}")]
    FlattenWithoutFetch(String, &'static str),
    #[error("Fetch node for subgraph \"{0}\" runs against entities but declares no requires selection")]
    MissingRequires(String),
    #[error("Failed to parse the operation of the fetch node for subgraph \"{0}\": {1}")]
    InvalidFetchOperation(String, String),
    #[error("Projection failure: {0}")]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Schema(#[from] SchemaMetadataError),
}
