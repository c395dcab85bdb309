pub mod cache;
pub mod dedupe;
pub mod error;
pub mod fetch;
pub mod flatten;
pub mod plan;
pub mod request;
pub mod rewrites;
