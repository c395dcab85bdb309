use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Attach the executed query plan to `extensions.queryPlan` of every response.
    ///
    /// Meant for debugging, as it exposes the subgraph layout to clients.
    /// Can also be set via the `EXPOSE_QUERY_PLAN` environment variable.
    #[serde(default)]
    pub expose_query_plan: bool,

    /// Add `serviceName` and `code` (`DOWNSTREAM_SERVICE_ERROR`) to the extensions
    /// of errors reported by subgraphs, unless the subgraph already set them.
    ///
    /// Can also be set via the `ANNOTATE_SUBGRAPH_ERRORS` environment variable.
    #[serde(default = "default_annotate_subgraph_errors")]
    pub annotate_subgraph_errors: bool,
}

fn default_annotate_subgraph_errors() -> bool {
    true
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            expose_query_plan: false,
            annotate_subgraph_errors: default_annotate_subgraph_errors(),
        }
    }
}
