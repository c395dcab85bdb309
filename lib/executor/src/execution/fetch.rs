use serde_json::{Map, Value};
use tracing::trace;

use hive_gateway_executor_config::executor::ExecutorConfig;

use crate::{
    context::ExecutionContext,
    execution::{
        cache::{FetchCaches, FetchDocument},
        error::PlanExecutionError,
        flatten::FlattenPreparedContext,
        plan::ExecutionState,
        rewrites::apply_rewrites,
    },
    executors::common::SubgraphExecutionRequest,
    plan::plan_nodes::FetchNode,
    projection::request::project_requires,
    response::{
        error_normalization::{
            add_subgraph_info_to_error, relocate_entity_errors, relocate_flatten_errors,
            relocate_root_errors,
        },
        graphql_error::GraphQLErrorPath,
        merge::deep_merge,
        subgraph_response::SubgraphResponse,
    },
    utils::{consts::REPRESENTATIONS_VARIABLE_NAME, traverse::value_at_path_mut},
};

/// Where the response of a fetch lands.
pub enum FetchTarget<'a> {
    /// Merged into the root of the result.
    Root,
    /// Scattered over the entities found by a Flatten node.
    Flatten(&'a FlattenPreparedContext),
    /// `_entities[i]` goes to the i-th path.
    Entities(Vec<GraphQLErrorPath>),
}

pub struct FetchJob<'a> {
    pub node: &'a FetchNode,
    pub document: FetchDocument,
    pub default_error_path: Option<GraphQLErrorPath>,
    pub target: FetchTarget<'a>,
    pub variables: Map<String, Value>,
}

/// Resolves everything a fetch needs before the subgraph is called.
/// `None` means there is nothing to ask the subgraph for.
pub fn prepare_fetch_job<'a>(
    ctx: &ExecutionContext<'_>,
    caches: &FetchCaches,
    node: &'a FetchNode,
    state: Option<&'a ExecutionState>,
) -> Result<Option<FetchJob<'a>>, PlanExecutionError> {
    let document = caches.document(&node.service_name, &node.operation)?;
    let default_error_path =
        caches.default_error_path(&node.service_name, &node.operation, &document);

    let (target, representations) = match state {
        None => (FetchTarget::Root, None),
        Some(ExecutionState::Flatten(prepared)) => {
            if prepared.representations.is_empty() {
                return Ok(None);
            }
            (
                FetchTarget::Flatten(prepared),
                Some(prepared.representations.clone()),
            )
        }
        Some(ExecutionState::Entities(entity_paths)) => {
            let requires = node
                .requires
                .as_deref()
                .ok_or_else(|| PlanExecutionError::MissingRequires(node.service_name.clone()))?;
            let possible_types = &ctx.schema_metadata.possible_types;

            let (targets, representations): (Vec<_>, Vec<_>) = ctx.with_data(|data| {
                entity_paths
                    .iter()
                    .filter_map(|entity_path| {
                        let entity = value_at_path_mut(data, entity_path)?;
                        project_requires(possible_types, requires, entity)
                            .map(|representation| (entity_path.clone(), representation))
                    })
                    .unzip()
            });

            if representations.is_empty() {
                return Ok(None);
            }
            (FetchTarget::Entities(targets), Some(representations))
        }
    };

    let mut variables: Map<String, Value> = node
        .variable_usages
        .iter()
        .flatten()
        .filter_map(|name| {
            ctx.variables
                .get(name)
                .map(|value| (name.clone(), value.clone()))
        })
        .collect();

    if let Some(mut representations) = representations {
        if let Some(input_rewrites) = &node.input_rewrites {
            for representation in representations.iter_mut() {
                apply_rewrites(
                    input_rewrites,
                    &ctx.schema_metadata.possible_types,
                    representation,
                );
            }
        }
        variables.insert(
            REPRESENTATIONS_VARIABLE_NAME.to_string(),
            Value::Array(representations),
        );
    }

    Ok(Some(FetchJob {
        node,
        document,
        default_error_path,
        target,
        variables,
    }))
}

impl<'a> FetchJob<'a> {
    /// Hands the variables over to the request, the job keeps the rest
    /// for when the response comes back.
    pub fn subgraph_request<'b>(
        &'b mut self,
        ctx: &'b ExecutionContext<'_>,
    ) -> SubgraphExecutionRequest<'b> {
        SubgraphExecutionRequest {
            subgraph_name: &self.node.service_name,
            query: &self.node.operation,
            document: self.document.clone(),
            operation_name: self.node.operation_name.as_deref(),
            operation_kind: self.node.operation_kind(),
            variables: std::mem::take(&mut self.variables),
            context: ctx.request.context.clone(),
            root_value: ctx.request.root_value.as_ref(),
            extensions: ctx.request.extensions.as_ref(),
            cancellation_token: ctx.request.cancellation_token.clone(),
        }
    }
}

/// Folds one subgraph response into the shared result.
pub fn absorb_response(
    ctx: &ExecutionContext<'_>,
    job: &FetchJob<'_>,
    mut response: SubgraphResponse,
    config: &ExecutorConfig,
) {
    let service_name = job.node.service_name.as_str();
    let possible_types = &ctx.schema_metadata.possible_types;

    if let Some(errors) = response.errors.take() {
        let default_error_path = job.default_error_path.as_ref();
        let relocated = match &job.target {
            FetchTarget::Root => relocate_root_errors(errors, default_error_path),
            FetchTarget::Flatten(prepared) => relocate_flatten_errors(
                errors,
                &prepared.entity_paths,
                &prepared.representation_order,
                default_error_path,
            ),
            FetchTarget::Entities(entity_paths) => {
                relocate_entity_errors(errors, entity_paths, default_error_path)
            }
        };

        if config.annotate_subgraph_errors {
            ctx.push_errors(
                relocated
                    .into_iter()
                    .map(|error| add_subgraph_info_to_error(error, service_name)),
            );
        } else {
            ctx.push_errors(relocated);
        }
    }

    match &job.target {
        FetchTarget::Root => {
            let mut data = response.data;
            if data.is_null() {
                trace!(service_name, "no data in subgraph response");
                return;
            }
            if let Some(output_rewrites) = &job.node.output_rewrites {
                apply_rewrites(output_rewrites, possible_types, &mut data);
            }
            ctx.with_data(|root| deep_merge(root, data));
        }
        FetchTarget::Flatten(prepared) => {
            let Some(entities) = take_rewritten_entities(job, &mut response, ctx) else {
                return;
            };
            ctx.with_data(|root| {
                for (entity_path, order) in prepared
                    .entity_paths
                    .iter()
                    .zip(&prepared.representation_order)
                {
                    if let Some(entity) = entities.get(*order) {
                        merge_into_entity(root, entity_path, entity.clone());
                    }
                }
            });
        }
        FetchTarget::Entities(entity_paths) => {
            let Some(entities) = take_rewritten_entities(job, &mut response, ctx) else {
                return;
            };
            ctx.with_data(|root| {
                for (entity_path, entity) in entity_paths.iter().zip(entities) {
                    merge_into_entity(root, entity_path, entity);
                }
            });
        }
    }
}

fn take_rewritten_entities(
    job: &FetchJob<'_>,
    response: &mut SubgraphResponse,
    ctx: &ExecutionContext<'_>,
) -> Option<Vec<Value>> {
    let Some(mut entities) = response.take_entities() else {
        trace!(
            service_name = job.node.service_name.as_str(),
            "no entities in subgraph response"
        );
        return None;
    };

    if let Some(output_rewrites) = &job.node.output_rewrites {
        for entity in entities.iter_mut() {
            apply_rewrites(
                output_rewrites,
                &ctx.schema_metadata.possible_types,
                entity,
            );
        }
    }

    Some(entities)
}

fn merge_into_entity(root: &mut Value, entity_path: &GraphQLErrorPath, entity: Value) {
    match value_at_path_mut(root, entity_path) {
        Some(target) => deep_merge(target, entity),
        None => trace!(path = %entity_path, "entity is gone from the result, skipping"),
    }
}
