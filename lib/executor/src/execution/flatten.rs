use serde_json::Value;
use tracing::trace;

use crate::{
    context::ExecutionContext,
    execution::{dedupe::RepresentationDeduplicator, error::PlanExecutionError},
    plan::plan_nodes::{FetchNode, FlattenNodePathSegment},
    projection::request::project_requires,
    response::graphql_error::GraphQLErrorPath,
    utils::traverse::traverse_and_callback,
};

/// The entities a Flatten node runs its fetch against.
///
/// `entity_paths[i]` is sent as `representations[representation_order[i]]`.
#[derive(Debug, Clone, Default)]
pub struct FlattenPreparedContext {
    pub entity_paths: Vec<GraphQLErrorPath>,
    pub representations: Vec<Value>,
    pub representation_order: Vec<usize>,
}

impl FlattenPreparedContext {
    pub fn is_empty(&self) -> bool {
        self.entity_paths.is_empty()
    }
}

pub fn prepare_flatten_context(
    ctx: &ExecutionContext<'_>,
    path: &[FlattenNodePathSegment],
    fetch_node: &FetchNode,
) -> Result<FlattenPreparedContext, PlanExecutionError> {
    let requires = fetch_node
        .requires
        .as_deref()
        .ok_or_else(|| PlanExecutionError::MissingRequires(fetch_node.service_name.clone()))?;
    let possible_types = &ctx.schema_metadata.possible_types;

    let mut deduplicator = RepresentationDeduplicator::new();
    let mut entity_paths = Vec::new();
    let mut representation_order = Vec::new();

    ctx.with_data(|data| {
        traverse_and_callback(
            &*data,
            path,
            possible_types,
            GraphQLErrorPath::default(),
            &mut |entity, entity_path| {
                if let Some(representation) = project_requires(possible_types, requires, entity) {
                    representation_order.push(deduplicator.insert(representation));
                    entity_paths.push(entity_path);
                }
            },
        );
    });

    trace!(
        entities = entity_paths.len(),
        representations = deduplicator.len(),
        "prepared flatten context"
    );

    Ok(FlattenPreparedContext {
        entity_paths,
        representations: deduplicator.into_representations(),
        representation_order,
    })
}
