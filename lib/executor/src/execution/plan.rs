use std::sync::Arc;

use async_stream::stream;
use futures::{
    future::{self, try_join_all, BoxFuture},
    stream::BoxStream,
    FutureExt, StreamExt, TryFutureExt,
};
use hive_gateway_executor_config::executor::ExecutorConfig;
use serde_json::{Map, Value};
use tracing::{debug, instrument, trace};

use crate::{
    context::ExecutionContext,
    execution::{
        cache::FetchCaches,
        error::PlanExecutionError,
        fetch::{absorb_response, prepare_fetch_job},
        flatten::{prepare_flatten_context, FlattenPreparedContext},
        request::{select_operation, ExecutionRequest},
    },
    executors::map::SubgraphExecutorMap,
    plan::plan_nodes::{
        flatten_path_to_string, ConditionNode, FetchNode, FlattenNode, PlanNode, QueryPlan,
    },
    projection::response::project_by_operation,
    response::{execution_result::ExecutionResult, graphql_error::GraphQLErrorPath},
    schema::metadata::SchemaMetadata,
    variables::coerce_variables,
};

/// What a node is evaluated against, besides the root of the result.
#[derive(Debug, Clone)]
pub enum ExecutionState {
    /// Explicit entities, addressed by their path in the result.
    Entities(Vec<GraphQLErrorPath>),
    Flatten(FlattenPreparedContext),
}

/// Runs query plans against a set of subgraphs.
///
/// One instance serves many requests; only the fetch caches are shared between them.
pub struct QueryPlanExecutor {
    schema_metadata: Arc<SchemaMetadata>,
    executors: Arc<SubgraphExecutorMap>,
    config: ExecutorConfig,
    caches: FetchCaches,
}

impl QueryPlanExecutor {
    pub fn new(schema_metadata: Arc<SchemaMetadata>, executors: Arc<SubgraphExecutorMap>) -> Self {
        QueryPlanExecutor {
            schema_metadata,
            executors,
            config: ExecutorConfig::default(),
            caches: FetchCaches::new(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn caches(&self) -> &FetchCaches {
        &self.caches
    }

    pub fn schema_metadata(&self) -> &SchemaMetadata {
        &self.schema_metadata
    }

    #[instrument(level = "debug", name = "execute_query_plan", skip_all, fields(operation_name = ?request.operation_name))]
    pub async fn execute(
        &self,
        plan: &QueryPlan,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, PlanExecutionError> {
        let ctx = self.create_context(request)?;
        if let Some(node) = &plan.node {
            self.execute_node(&ctx, node, None).await?;
        }
        self.finalize(plan, &ctx)
    }

    /// Picks the operation and coerces the variables. Fails before anything is fetched.
    pub fn create_context<'a>(
        &'a self,
        request: &'a ExecutionRequest,
    ) -> Result<ExecutionContext<'a>, PlanExecutionError> {
        let operation = select_operation(&request.document, request.operation_name.as_deref())?;
        let variables = coerce_variables(
            operation.variable_definitions,
            request.variables.as_ref(),
            &self.schema_metadata,
        )?;

        Ok(ExecutionContext::new(
            &self.schema_metadata,
            operation,
            variables,
            request,
            &self.executors,
        ))
    }

    pub fn execute_node<'a>(
        &'a self,
        ctx: &'a ExecutionContext<'a>,
        node: &'a PlanNode,
        state: Option<&'a ExecutionState>,
    ) -> BoxFuture<'a, Result<(), PlanExecutionError>> {
        match node {
            PlanNode::Sequence(node) => async move {
                // Only the first child runs against the caller's state.
                for (index, child) in node.nodes.iter().enumerate() {
                    let child_state = if index == 0 { state } else { None };
                    self.execute_node(ctx, child, child_state).await?;
                }
                Ok(())
            }
            .boxed(),
            PlanNode::Parallel(node) => try_join_all(node.nodes.iter().enumerate().map(
                |(index, child)| {
                    let child_state = if index == 0 { state } else { None };
                    self.execute_node(ctx, child, child_state)
                },
            ))
            .map_ok(|_| ())
            .boxed(),
            PlanNode::Flatten(node) => self.execute_flatten(ctx, node).boxed(),
            PlanNode::Fetch(node) => self.execute_fetch(ctx, node, state).boxed(),
            PlanNode::Condition(node) => match self.condition_branch(ctx, node) {
                Some(branch) => self.execute_node(ctx, branch, state),
                None => future::ready(Ok(())).boxed(),
            },
            PlanNode::Subscription(node) => self.execute_node(ctx, &node.primary, state),
        }
    }

    fn condition_branch<'a>(
        &self,
        ctx: &ExecutionContext<'_>,
        node: &'a ConditionNode,
    ) -> Option<&'a PlanNode> {
        let condition = matches!(ctx.variables.get(&node.condition), Some(Value::Bool(true)));
        trace!(condition = %node.condition, value = condition, "evaluated condition");

        if condition {
            node.if_clause.as_deref()
        } else {
            node.else_clause.as_deref()
        }
    }

    #[instrument(level = "trace", skip_all, fields(path = %flatten_path_to_string(&node.path)))]
    async fn execute_flatten(
        &self,
        ctx: &ExecutionContext<'_>,
        node: &FlattenNode,
    ) -> Result<(), PlanExecutionError> {
        let PlanNode::Fetch(fetch_node) = node.node.as_ref() else {
            return Err(PlanExecutionError::FlattenWithoutFetch(
                flatten_path_to_string(&node.path),
                node.node.kind(),
            ));
        };

        let prepared = prepare_flatten_context(ctx, &node.path, fetch_node)?;
        if prepared.is_empty() {
            trace!("no entities to flatten");
            return Ok(());
        }

        let state = ExecutionState::Flatten(prepared);
        self.execute_fetch(ctx, fetch_node, Some(&state)).await
    }

    #[instrument(level = "debug", skip_all, fields(service_name = %node.service_name))]
    async fn execute_fetch(
        &self,
        ctx: &ExecutionContext<'_>,
        node: &FetchNode,
        state: Option<&ExecutionState>,
    ) -> Result<(), PlanExecutionError> {
        let Some(mut job) = prepare_fetch_job(ctx, &self.caches, node, state)? else {
            trace!("nothing to fetch");
            return Ok(());
        };

        let subgraph_request = job.subgraph_request(ctx);
        let response = ctx
            .executors
            .execute(&node.service_name, subgraph_request)
            .await;

        absorb_response(ctx, &job, response, &self.config);
        Ok(())
    }

    /// Projects the assembled data against the client operation.
    pub fn finalize(
        &self,
        plan: &QueryPlan,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ExecutionResult, PlanExecutionError> {
        let data = ctx.with_data(|data| {
            project_by_operation(data, &ctx.operation, ctx.schema_metadata, &ctx.variables)
        })?;
        let errors = ctx.take_errors();

        let mut extensions = Map::new();
        if self.config.expose_query_plan {
            if let Ok(plan) = serde_json::to_value(plan) {
                extensions.insert("queryPlan".to_string(), plan);
            }
        }

        debug!(errors = errors.len(), "query plan executed");
        Ok(ExecutionResult::new(Some(data), Some(errors), Some(extensions)))
    }

    /// Streams one result per event of the subscription the plan opens.
    ///
    /// Every event is handled on a fresh context: the event is merged like the
    /// response of the primary fetch, then the rest of the plan runs on top of it.
    /// Plans that don't open a subscription yield a single result.
    pub fn subscribe<'a>(
        &'a self,
        plan: &'a QueryPlan,
        request: &'a ExecutionRequest,
    ) -> BoxStream<'a, Result<ExecutionResult, PlanExecutionError>> {
        stream! {
            let Some((primary, rest)) = subscription_parts(plan) else {
                yield self.execute(plan, request).await;
                return;
            };

            let ctx = match self.create_context(request) {
                Ok(ctx) => ctx,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let mut job = match prepare_fetch_job(&ctx, &self.caches, primary, None) {
                Ok(Some(job)) => job,
                Ok(None) => return,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let subgraph_request = job.subgraph_request(&ctx);
            let mut events = self
                .executors
                .subscribe(&primary.service_name, subgraph_request)
                .await;

            while let Some(event) = events.next().await {
                let event_ctx = match self.create_context(request) {
                    Ok(event_ctx) => event_ctx,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                absorb_response(&event_ctx, &job, event, &self.config);

                let mut failed = None;
                for node in rest {
                    if let Err(e) = self.execute_node(&event_ctx, node, None).await {
                        failed = Some(e);
                        break;
                    }
                }
                if let Some(e) = failed {
                    yield Err(e);
                    return;
                }

                yield self.finalize(plan, &event_ctx);
            }
        }
        .boxed()
    }
}

/// The fetch that opens the subscription and the nodes that run after every event.
fn subscription_parts(plan: &QueryPlan) -> Option<(&FetchNode, &[PlanNode])> {
    let PlanNode::Subscription(subscription) = plan.node.as_ref()? else {
        return None;
    };

    match subscription.primary.as_ref() {
        PlanNode::Fetch(fetch) => Some((fetch, &[] as &[PlanNode])),
        PlanNode::Sequence(sequence) => match sequence.nodes.split_first() {
            Some((PlanNode::Fetch(fetch), rest)) => Some((fetch, rest)),
            _ => None,
        },
        _ => None,
    }
}
