use std::collections::HashMap;

use futures::{stream::BoxStream, StreamExt};
use tracing::{instrument, warn};

use crate::{
    executors::{
        common::{SubgraphExecutionRequest, SubgraphExecutorBoxedArc},
        error::{error_to_subgraph_response, SubgraphExecutorError},
    },
    response::subgraph_response::SubgraphResponse,
};

#[derive(Default)]
pub struct SubgraphExecutorMap {
    inner: HashMap<String, SubgraphExecutorBoxedArc>,
}

impl SubgraphExecutorMap {
    pub fn new() -> Self {
        SubgraphExecutorMap {
            inner: HashMap::new(),
        }
    }

    pub fn insert_boxed_arc(&mut self, subgraph_name: String, boxed_arc: SubgraphExecutorBoxedArc) {
        self.inner.insert(subgraph_name, boxed_arc);
    }

    pub fn get(&self, subgraph_name: &str) -> Option<&SubgraphExecutorBoxedArc> {
        self.inner.get(subgraph_name)
    }

    /// Never fails: executor errors come back as an error response.
    #[instrument(level = "trace", name = "subgraph_execute", skip_all, fields(subgraph_name = %subgraph_name))]
    pub async fn execute<'a>(
        &self,
        subgraph_name: &str,
        execution_request: SubgraphExecutionRequest<'a>,
    ) -> SubgraphResponse {
        let result = match self.inner.get(subgraph_name) {
            Some(_) if execution_request.cancellation_token.is_cancelled() => Err(
                SubgraphExecutorError::Cancelled(subgraph_name.to_string()),
            ),
            Some(executor) => executor.execute(execution_request).await,
            None => Err(SubgraphExecutorError::ExecutorNotFound(
                subgraph_name.to_string(),
            )),
        };

        result.unwrap_or_else(|e| {
            warn!("subgraph request failed: {}", e);
            error_to_subgraph_response(subgraph_name, e)
        })
    }

    /// Opens a subscription on the subgraph. A failure to open it is
    /// reported as a stream with a single error response.
    #[instrument(level = "trace", name = "subgraph_subscribe", skip_all, fields(subgraph_name = %subgraph_name))]
    pub async fn subscribe<'a>(
        &self,
        subgraph_name: &str,
        execution_request: SubgraphExecutionRequest<'a>,
    ) -> BoxStream<'static, SubgraphResponse> {
        let result = match self.inner.get(subgraph_name) {
            Some(executor) => executor.subscribe(execution_request).await,
            None => Err(SubgraphExecutorError::ExecutorNotFound(
                subgraph_name.to_string(),
            )),
        };

        match result {
            Ok(stream) => stream,
            Err(e) => {
                warn!("subgraph subscription failed: {}", e);
                futures::stream::iter([error_to_subgraph_response(subgraph_name, e)]).boxed()
            }
        }
    }
}

impl FromIterator<(String, SubgraphExecutorBoxedArc)> for SubgraphExecutorMap {
    fn from_iter<I: IntoIterator<Item = (String, SubgraphExecutorBoxedArc)>>(iter: I) -> Self {
        SubgraphExecutorMap {
            inner: iter.into_iter().collect(),
        }
    }
}
