pub mod error_normalization;
pub mod execution_result;
pub mod graphql_error;
pub mod merge;
pub mod subgraph_response;
