pub mod context;
pub mod execution;
pub mod executors;
pub mod plan;
pub mod projection;
pub mod response;
pub mod schema;
pub mod utils;
pub mod variables;

pub use context::ExecutionContext;
pub use execution::{
    error::PlanExecutionError,
    plan::{ExecutionState, QueryPlanExecutor},
    request::ExecutionRequest,
};
pub use executors::{
    common::{SubgraphExecutionRequest, SubgraphExecutor, SubgraphExecutorBoxedArc},
    map::SubgraphExecutorMap,
};
pub use plan::plan_nodes::QueryPlan;
pub use response::{execution_result::ExecutionResult, graphql_error::GraphQLError};
pub use schema::metadata::SchemaMetadata;

#[cfg(test)]
mod tests;
