use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use graphql_parser::query::Document;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::{
    execution::request::RequestContext, executors::error::SubgraphExecutorError,
    plan::plan_nodes::OperationKind, response::subgraph_response::SubgraphResponse,
};

/// Runs GraphQL operations against one subgraph.
/// Transport, retries and timeouts are up to the implementation.
#[async_trait]
pub trait SubgraphExecutor {
    async fn execute<'a>(
        &self,
        execution_request: SubgraphExecutionRequest<'a>,
    ) -> Result<SubgraphResponse, SubgraphExecutorError>;

    async fn subscribe<'a>(
        &self,
        execution_request: SubgraphExecutionRequest<'a>,
    ) -> Result<BoxStream<'static, SubgraphResponse>, SubgraphExecutorError> {
        Err(SubgraphExecutorError::SubscriptionsNotSupported(
            execution_request.subgraph_name.to_string(),
        ))
    }

    fn to_boxed_arc<'a>(self) -> Arc<Box<dyn SubgraphExecutor + Send + Sync + 'a>>
    where
        Self: Sized + Send + Sync + 'a,
    {
        Arc::new(Box::new(self))
    }
}

pub type SubgraphExecutorType = dyn crate::executors::common::SubgraphExecutor + Send + Sync;

pub type SubgraphExecutorBoxedArc = Arc<Box<SubgraphExecutorType>>;

pub struct SubgraphExecutionRequest<'a> {
    pub subgraph_name: &'a str,
    pub query: &'a str,
    /// Parsed form of `query`, shared through the operation cache.
    pub document: Arc<Document<'static, String>>,
    pub operation_name: Option<&'a str>,
    pub operation_kind: OperationKind,
    pub variables: Map<String, Value>,
    pub context: Option<RequestContext>,
    pub root_value: Option<&'a Value>,
    pub extensions: Option<&'a Map<String, Value>>,
    pub cancellation_token: CancellationToken,
}
