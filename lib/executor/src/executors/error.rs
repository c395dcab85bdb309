use crate::response::subgraph_response::SubgraphResponse;

#[derive(thiserror::Error, Debug, Clone)]
pub enum SubgraphExecutorError {
    #[error("No executor is registered for subgraph \"{0}\"")]
    ExecutorNotFound(String),
    #[error("Failed to send request to subgraph \"{0}\": {1}")]
    RequestFailure(String, String),
    #[error("Request to subgraph \"{0}\" was cancelled")]
    Cancelled(String),
    #[error("Subgraph \"{0}\" does not support subscriptions")]
    SubscriptionsNotSupported(String),
}

/// A failed subgraph call is reported like any other subgraph error,
/// so it gets relocated and sits next to whatever data the rest of the plan produced.
pub fn error_to_subgraph_response(subgraph_name: &str, e: SubgraphExecutorError) -> SubgraphResponse {
    SubgraphResponse::from_errors(vec![format!(
        "Failed to execute request to subgraph {}: {}",
        subgraph_name, e
    )
    .into()])
}
