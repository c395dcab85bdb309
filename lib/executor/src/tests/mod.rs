use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use hive_gateway_executor_config::executor::ExecutorConfig;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use crate::{
    executors::{
        common::{SubgraphExecutionRequest, SubgraphExecutor},
        error::SubgraphExecutorError,
    },
    plan::plan_nodes::PlanNode,
    response::{graphql_error::GraphQLErrorPath, subgraph_response::SubgraphResponse},
    ExecutionRequest, ExecutionResult, ExecutionState, PlanExecutionError, QueryPlan,
    QueryPlanExecutor, SchemaMetadata, SubgraphExecutorMap,
};

const SUPERGRAPH: &str = r#"
    type Query {
      widget: Widget
      widgets: [Widget]
      products: [Product]
      pets: [Pet]
      me: User
    }
    type Subscription {
      widgetUpdated: Widget
    }
    type Widget {
      id: ID!
      name: String
      weight: Int
    }
    type Product {
      id: ID!
      upc: String
      price: Int
    }
    type User {
      id: ID!
      name: String
    }
    interface Pet {
      id: ID!
    }
    type Cat implements Pet {
      id: ID!
      lives: Int
    }
    type Dog implements Pet {
      id: ID!
      barks: Boolean
    }
"#;

type Calls = Arc<Mutex<Vec<Map<String, Value>>>>;

struct MockSubgraph {
    handler: Box<dyn Fn(&Map<String, Value>) -> Value + Send + Sync>,
    events: Vec<Value>,
    calls: Calls,
}

impl MockSubgraph {
    fn new(handler: impl Fn(&Map<String, Value>) -> Value + Send + Sync + 'static) -> Self {
        MockSubgraph {
            handler: Box::new(handler),
            events: vec![],
            calls: Arc::new(Mutex::new(vec![])),
        }
    }

    fn responding(response: Value) -> Self {
        Self::new(move |_| response.clone())
    }

    fn with_events(mut self, events: Vec<Value>) -> Self {
        self.events = events;
        self
    }

    fn calls(&self) -> Calls {
        self.calls.clone()
    }
}

#[async_trait]
impl SubgraphExecutor for MockSubgraph {
    async fn execute<'a>(
        &self,
        execution_request: SubgraphExecutionRequest<'a>,
    ) -> Result<SubgraphResponse, SubgraphExecutorError> {
        let response = (self.handler)(&execution_request.variables);
        self.calls.lock().unwrap().push(execution_request.variables);
        Ok(serde_json::from_value(response).unwrap())
    }

    async fn subscribe<'a>(
        &self,
        _execution_request: SubgraphExecutionRequest<'a>,
    ) -> Result<BoxStream<'static, SubgraphResponse>, SubgraphExecutorError> {
        let events: Vec<SubgraphResponse> = self
            .events
            .iter()
            .map(|event| serde_json::from_value(event.clone()).unwrap())
            .collect();
        Ok(futures::stream::iter(events).boxed())
    }
}

fn executor(subgraphs: Vec<(&str, MockSubgraph)>) -> QueryPlanExecutor {
    let schema_metadata = SchemaMetadata::from_sdl(SUPERGRAPH).unwrap();
    let executors: SubgraphExecutorMap = subgraphs
        .into_iter()
        .map(|(name, subgraph)| (name.to_string(), subgraph.to_boxed_arc()))
        .collect();
    QueryPlanExecutor::new(Arc::new(schema_metadata), Arc::new(executors))
}

fn plan(raw: Value) -> QueryPlan {
    serde_json::from_value(raw).unwrap()
}

fn to_json(result: &ExecutionResult) -> Value {
    serde_json::to_value(result).unwrap()
}

fn entity_fetch(service_name: &str, type_name: &str, fields: &[&str]) -> Value {
    let mut selections = vec![json!({ "kind": "Field", "name": "__typename" })];
    selections.extend(
        fields
            .iter()
            .map(|field| json!({ "kind": "Field", "name": field })),
    );
    json!({
        "kind": "Fetch",
        "serviceName": service_name,
        "operationKind": "query",
        "operation": format!(
            "query($representations:[_Any!]!){{_entities(representations:$representations){{...on {}{{__typename}}}}}}",
            type_name
        ),
        "requires": [{
            "kind": "InlineFragment",
            "typeCondition": type_name,
            "selections": selections
        }]
    })
}

fn products_plan() -> QueryPlan {
    plan(json!({
        "node": {
            "kind": "Sequence",
            "nodes": [
                {
                    "kind": "Fetch",
                    "serviceName": "a",
                    "operation": "{ products { __typename id upc } }"
                },
                {
                    "kind": "Flatten",
                    "path": ["products", "@"],
                    "node": entity_fetch("b", "Product", &["id", "upc"])
                }
            ]
        }
    }))
}

#[tokio::test]
async fn sequence_then_flatten_merges_entity_fields() {
    let b = MockSubgraph::responding(json!({ "data": { "_entities": [{ "weight": 5 }] } }));
    let b_calls = b.calls();
    let executor = executor(vec![
        (
            "a",
            MockSubgraph::responding(json!({ "data": { "widget": { "id": "1" } } })),
        ),
        ("b", b),
    ]);
    let query_plan = plan(json!({
        "node": {
            "kind": "Sequence",
            "nodes": [
                { "kind": "Fetch", "serviceName": "a", "operation": "{ widget { id } }" },
                {
                    "kind": "Flatten",
                    "path": ["widget"],
                    "node": entity_fetch("b", "Widget", &["id"])
                }
            ]
        }
    }));
    let request = ExecutionRequest::parse("{ widget { id weight } }").unwrap();

    let result = executor.execute(&query_plan, &request).await.unwrap();

    insta::assert_json_snapshot!(result, @r#"
    {
      "data": {
        "widget": {
          "id": "1",
          "weight": 5
        }
      }
    }
    "#);
    let calls = b_calls.lock().unwrap();
    assert_eq!(
        calls[0]["representations"],
        json!([{ "__typename": "Widget", "id": "1" }])
    );
}

#[tokio::test]
async fn parallel_keeps_partial_data_next_to_errors() {
    let executor = executor(vec![
        (
            "a",
            MockSubgraph::responding(json!({
                "data": { "widget": null },
                "errors": [{ "message": "widget exploded" }]
            })),
        ),
        (
            "b",
            MockSubgraph::responding(json!({ "data": { "me": { "id": "u1", "name": "Ada" } } })),
        ),
    ]);
    let query_plan = plan(json!({
        "node": {
            "kind": "Parallel",
            "nodes": [
                { "kind": "Fetch", "serviceName": "a", "operation": "{ widget { id } }" },
                { "kind": "Fetch", "serviceName": "b", "operation": "{ me { id name } }" }
            ]
        }
    }));
    let request = ExecutionRequest::parse("{ widget { id } me { id name } }").unwrap();

    let result = executor.execute(&query_plan, &request).await.unwrap();

    assert_eq!(
        to_json(&result),
        json!({
            "data": { "widget": null, "me": { "id": "u1", "name": "Ada" } },
            "errors": [{
                "message": "widget exploded",
                "path": ["widget"],
                "extensions": { "serviceName": "a", "code": "DOWNSTREAM_SERVICE_ERROR" }
            }]
        })
    );
}

#[tokio::test]
async fn condition_without_variable_takes_else_branch() {
    let if_subgraph =
        MockSubgraph::responding(json!({ "data": { "widget": { "id": "1", "name": "if" } } }));
    let if_calls = if_subgraph.calls();
    let executor = executor(vec![
        ("if", if_subgraph),
        (
            "else",
            MockSubgraph::responding(json!({ "data": { "widget": { "id": "1", "name": "else" } } })),
        ),
    ]);
    let request =
        ExecutionRequest::parse("query($flag: Boolean) { widget { id name } }").unwrap();

    let with_else = plan(json!({
        "node": {
            "kind": "Condition",
            "condition": "flag",
            "ifClause": { "kind": "Fetch", "serviceName": "if", "operation": "{ widget { id name } }" },
            "elseClause": { "kind": "Fetch", "serviceName": "else", "operation": "{ widget { id name } }" }
        }
    }));
    let result = executor.execute(&with_else, &request).await.unwrap();
    assert_eq!(
        to_json(&result),
        json!({ "data": { "widget": { "id": "1", "name": "else" } } })
    );

    let without_else = plan(json!({
        "node": {
            "kind": "Condition",
            "condition": "flag",
            "ifClause": { "kind": "Fetch", "serviceName": "if", "operation": "{ widget { id name } }" }
        }
    }));
    let result = executor.execute(&without_else, &request).await.unwrap();
    assert_eq!(to_json(&result), json!({ "data": { "widget": null } }));
    assert!(if_calls.lock().unwrap().is_empty());

    let flagged = ExecutionRequest::parse("query($flag: Boolean) { widget { id name } }")
        .unwrap()
        .with_variables(json!({ "flag": true }).as_object().cloned().unwrap());
    let result = executor.execute(&with_else, &flagged).await.unwrap();
    assert_eq!(
        to_json(&result),
        json!({ "data": { "widget": { "id": "1", "name": "if" } } })
    );
}

#[tokio::test]
async fn structurally_equal_entities_are_sent_once() {
    let b = MockSubgraph::responding(json!({
        "data": { "_entities": [{ "price": 10 }, { "price": 20 }] }
    }));
    let b_calls = b.calls();
    let executor = executor(vec![
        (
            "a",
            MockSubgraph::responding(json!({
                "data": {
                    "products": [
                        { "__typename": "Product", "id": "1", "upc": "x" },
                        { "upc": "x", "id": "1", "__typename": "Product" },
                        { "__typename": "Product", "id": "2", "upc": "y" }
                    ]
                }
            })),
        ),
        ("b", b),
    ]);
    let request = ExecutionRequest::parse("{ products { id price } }").unwrap();

    let result = executor.execute(&products_plan(), &request).await.unwrap();

    assert_eq!(
        to_json(&result),
        json!({
            "data": {
                "products": [
                    { "id": "1", "price": 10 },
                    { "id": "1", "price": 10 },
                    { "id": "2", "price": 20 }
                ]
            }
        })
    );
    let calls = b_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0]["representations"],
        json!([
            { "__typename": "Product", "id": "1", "upc": "x" },
            { "__typename": "Product", "id": "2", "upc": "y" }
        ])
    );
}

#[tokio::test]
async fn null_and_absent_requirements_deduplicate_together() {
    let b = MockSubgraph::responding(json!({ "data": { "_entities": [{ "price": 10 }] } }));
    let b_calls = b.calls();
    let executor = executor(vec![
        (
            "a",
            MockSubgraph::responding(json!({
                "data": {
                    "products": [
                        { "__typename": "Product", "id": "1", "upc": null },
                        { "__typename": "Product", "id": "1" }
                    ]
                }
            })),
        ),
        ("b", b),
    ]);
    let request = ExecutionRequest::parse("{ products { id price } }").unwrap();

    executor.execute(&products_plan(), &request).await.unwrap();

    let calls = b_calls.lock().unwrap();
    assert_eq!(
        calls[0]["representations"],
        json!([{ "__typename": "Product", "id": "1" }])
    );
}

#[tokio::test]
async fn entity_errors_fan_out_to_every_deduplicated_path() {
    let executor = executor(vec![
        (
            "a",
            MockSubgraph::responding(json!({
                "data": {
                    "products": [
                        { "__typename": "Product", "id": "1" },
                        { "__typename": "Product", "id": "1" }
                    ]
                }
            })),
        ),
        (
            "b",
            MockSubgraph::responding(json!({
                "data": { "_entities": [null] },
                "errors": [{ "message": "price unavailable", "path": ["_entities", 0, "price"] }]
            })),
        ),
    ]);
    let request = ExecutionRequest::parse("{ products { id price } }").unwrap();

    let result = executor.execute(&products_plan(), &request).await.unwrap();

    let errors = result.errors.unwrap();
    let paths: Vec<String> = errors
        .iter()
        .map(|error| error.path.as_ref().unwrap().to_string())
        .collect();
    assert_eq!(paths, vec!["products.0.price", "products.1.price"]);
    assert_eq!(
        result.data,
        Some(json!({
            "products": [{ "id": "1", "price": null }, { "id": "1", "price": null }]
        }))
    );
}

#[tokio::test]
async fn flatten_casts_skip_other_types() {
    let b = MockSubgraph::responding(json!({ "data": { "_entities": [{ "lives": 9 }] } }));
    let b_calls = b.calls();
    let executor = executor(vec![
        (
            "a",
            MockSubgraph::responding(json!({
                "data": {
                    "pets": [
                        { "__typename": "Cat", "id": "c1" },
                        { "__typename": "Dog", "id": "d1" }
                    ]
                }
            })),
        ),
        ("b", b),
    ]);
    let query_plan = plan(json!({
        "node": {
            "kind": "Sequence",
            "nodes": [
                { "kind": "Fetch", "serviceName": "a", "operation": "{ pets { __typename id } }" },
                {
                    "kind": "Flatten",
                    "path": ["pets", "@", "... on Cat"],
                    "node": entity_fetch("b", "Cat", &["id"])
                }
            ]
        }
    }));
    let request =
        ExecutionRequest::parse("{ pets { id ... on Cat { lives } ... on Dog { barks } } }")
            .unwrap();

    let result = executor.execute(&query_plan, &request).await.unwrap();

    assert_eq!(
        b_calls.lock().unwrap()[0]["representations"],
        json!([{ "__typename": "Cat", "id": "c1" }])
    );
    assert_eq!(
        to_json(&result),
        json!({
            "data": {
                "pets": [{ "id": "c1", "lives": 9 }, { "id": "d1", "barks": null }]
            }
        })
    );
}

#[tokio::test]
async fn rewrites_apply_to_representations_and_responses() {
    let b = MockSubgraph::responding(json!({
        "data": { "_entities": [{ "__typename": "Gadget", "mass": 7 }] }
    }));
    let b_calls = b.calls();
    let executor = executor(vec![
        (
            "a",
            MockSubgraph::responding(json!({
                "data": { "widget": { "__typename": "Widget", "id": "1", "label": "w" } }
            })),
        ),
        ("b", b),
    ]);
    let mut fetch_b = entity_fetch("b", "Widget", &["id"]);
    fetch_b["inputRewrites"] = json!([
        { "kind": "ValueSetter", "path": ["... on Widget", "__typename"], "setValueTo": "Gadget" }
    ]);
    fetch_b["outputRewrites"] = json!([
        { "kind": "KeyRenamer", "path": ["... on Gadget", "mass"], "renameKeyTo": "weight" },
        { "kind": "KeyRenamer", "path": ["missing"], "renameKeyTo": "whatever" },
        { "kind": "ValueSetter", "path": ["__typename"], "setValueTo": "Widget" }
    ]);
    let query_plan = plan(json!({
        "node": {
            "kind": "Sequence",
            "nodes": [
                {
                    "kind": "Fetch",
                    "serviceName": "a",
                    "operation": "{ widget { __typename id label: name } }",
                    "outputRewrites": [
                        { "kind": "KeyRenamer", "path": ["widget", "label"], "renameKeyTo": "name" }
                    ]
                },
                { "kind": "Flatten", "path": ["widget"], "node": fetch_b }
            ]
        }
    }));
    let request = ExecutionRequest::parse("{ widget { id name weight } }").unwrap();

    let result = executor.execute(&query_plan, &request).await.unwrap();

    assert_eq!(
        b_calls.lock().unwrap()[0]["representations"],
        json!([{ "__typename": "Gadget", "id": "1" }])
    );
    assert_eq!(
        to_json(&result),
        json!({ "data": { "widget": { "id": "1", "name": "w", "weight": 7 } } })
    );
}

#[tokio::test]
async fn only_used_variables_are_forwarded() {
    let a = MockSubgraph::responding(json!({ "data": { "widget": { "id": "7" } } }));
    let a_calls = a.calls();
    let executor = executor(vec![("a", a)]);
    let query_plan = plan(json!({
        "node": {
            "kind": "Fetch",
            "serviceName": "a",
            "operation": "query($id: ID) { widget { id } }",
            "variableUsages": ["id", "notProvided"]
        }
    }));
    let request = ExecutionRequest::parse("query($id: ID, $other: Int) { widget { id } }")
        .unwrap()
        .with_variables(json!({ "id": 7, "other": 1 }).as_object().cloned().unwrap());

    executor.execute(&query_plan, &request).await.unwrap();

    assert_eq!(
        Value::Object(a_calls.lock().unwrap()[0].clone()),
        json!({ "id": "7" })
    );
}

#[tokio::test]
async fn unknown_subgraph_is_a_recoverable_error() {
    let executor = executor(vec![]);
    let query_plan = plan(json!({
        "node": { "kind": "Fetch", "serviceName": "ghost", "operation": "{ widget { id } }" }
    }));
    let request = ExecutionRequest::parse("{ widget { id } }").unwrap();

    let result = executor.execute(&query_plan, &request).await.unwrap();

    assert_eq!(
        to_json(&result),
        json!({
            "data": { "widget": null },
            "errors": [{
                "message": "Failed to execute request to subgraph ghost: No executor is registered for subgraph \"ghost\"",
                "path": ["widget"],
                "extensions": { "serviceName": "ghost", "code": "DOWNSTREAM_SERVICE_ERROR" }
            }]
        })
    );
}

#[tokio::test]
async fn cancelled_requests_do_not_reach_subgraphs() {
    let a = MockSubgraph::responding(json!({ "data": { "widget": { "id": "1" } } }));
    let a_calls = a.calls();
    let executor = executor(vec![("a", a)]);
    let query_plan = plan(json!({
        "node": { "kind": "Fetch", "serviceName": "a", "operation": "{ widget { id } }" }
    }));
    let token = CancellationToken::new();
    token.cancel();
    let request = ExecutionRequest::parse("{ widget { id } }")
        .unwrap()
        .with_cancellation_token(token);

    let result = executor.execute(&query_plan, &request).await.unwrap();

    assert!(a_calls.lock().unwrap().is_empty());
    let errors = result.errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("was cancelled"));
}

#[tokio::test]
async fn contract_violations_are_fatal() {
    let executor = executor(vec![(
        "a",
        MockSubgraph::responding(json!({ "data": { "widget": { "id": "1" } } })),
    )]);
    let request = ExecutionRequest::parse("{ widget { id } }").unwrap();

    let flatten_over_sequence = plan(json!({
        "node": {
            "kind": "Flatten",
            "path": ["widget"],
            "node": { "kind": "Sequence", "nodes": [] }
        }
    }));
    assert!(matches!(
        executor.execute(&flatten_over_sequence, &request).await,
        Err(PlanExecutionError::FlattenWithoutFetch(path, kind)) if path == "widget" && kind == "Sequence"
    ));

    let flatten_without_requires = plan(json!({
        "node": {
            "kind": "Sequence",
            "nodes": [
                { "kind": "Fetch", "serviceName": "a", "operation": "{ widget { id } }" },
                {
                    "kind": "Flatten",
                    "path": ["widget"],
                    "node": { "kind": "Fetch", "serviceName": "a", "operation": "{ _entities { id } }" }
                }
            ]
        }
    }));
    assert!(matches!(
        executor.execute(&flatten_without_requires, &request).await,
        Err(PlanExecutionError::MissingRequires(service)) if service == "a"
    ));

    let broken_operation = plan(json!({
        "node": { "kind": "Fetch", "serviceName": "a", "operation": "{ widget { " }
    }));
    assert!(matches!(
        executor.execute(&broken_operation, &request).await,
        Err(PlanExecutionError::InvalidFetchOperation(service, _)) if service == "a"
    ));

    assert!(serde_json::from_value::<QueryPlan>(json!({
        "node": { "kind": "Teleport", "nodes": [] }
    }))
    .is_err());
}

#[tokio::test]
async fn invalid_variables_fail_before_any_fetch() {
    let a = MockSubgraph::responding(json!({ "data": { "widget": { "id": "1" } } }));
    let a_calls = a.calls();
    let executor = executor(vec![("a", a)]);
    let query_plan = plan(json!({
        "node": { "kind": "Fetch", "serviceName": "a", "operation": "{ widget { id } }" }
    }));
    let request = ExecutionRequest::parse("query($limit: Int!) { widget { id } }").unwrap();

    let result = executor.execute(&query_plan, &request).await;

    assert!(matches!(result, Err(PlanExecutionError::VariableCoercion(_))));
    assert!(a_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_fields_in_the_operation_are_fatal() {
    let executor = executor(vec![(
        "a",
        MockSubgraph::responding(json!({ "data": { "widget": { "id": "1" } } })),
    )]);
    let query_plan = plan(json!({
        "node": { "kind": "Fetch", "serviceName": "a", "operation": "{ widget { id } }" }
    }));
    let request = ExecutionRequest::parse("{ widget { id color } }").unwrap();

    assert!(matches!(
        executor.execute(&query_plan, &request).await,
        Err(PlanExecutionError::Projection(_))
    ));
}

#[tokio::test]
async fn config_controls_plan_exposure_and_error_annotation() {
    let executor = executor(vec![(
        "a",
        MockSubgraph::responding(json!({
            "data": { "widget": { "id": "1" } },
            "errors": [{ "message": "partial" }]
        })),
    )])
    .with_config(ExecutorConfig {
        expose_query_plan: true,
        annotate_subgraph_errors: false,
    });
    let query_plan = plan(json!({
        "node": { "kind": "Fetch", "serviceName": "a", "operation": "{ widget { id } }" }
    }));
    let request = ExecutionRequest::parse("{ widget { id } }").unwrap();

    let result = executor.execute(&query_plan, &request).await.unwrap();

    assert_eq!(
        to_json(&result),
        json!({
            "data": { "widget": { "id": "1" } },
            "errors": [{ "message": "partial", "path": ["widget"] }],
            "extensions": {
                "queryPlan": {
                    "node": { "kind": "Fetch", "serviceName": "a", "operation": "{ widget { id } }" }
                }
            }
        })
    );
}

#[tokio::test]
async fn empty_plan_projects_nulls() {
    let executor = executor(vec![]);
    let request = ExecutionRequest::parse("{ widget { id } me { id } }").unwrap();

    let result = executor
        .execute(&QueryPlan::default(), &request)
        .await
        .unwrap();

    assert_eq!(
        to_json(&result),
        json!({ "data": { "widget": null, "me": null } })
    );
}

#[tokio::test]
async fn explicit_entities_are_merged_by_position() {
    let executor = executor(vec![(
        "b",
        MockSubgraph::responding(json!({
            "data": { "_entities": [{ "weight": 1 }, { "weight": 2 }] },
            "errors": [{ "message": "too heavy", "path": ["_entities", 1, "weight"] }]
        })),
    )]);
    let request = ExecutionRequest::parse("{ widgets { id weight } }").unwrap();
    let ctx = executor.create_context(&request).unwrap();
    ctx.with_data(|data| {
        *data = json!({
            "widgets": [
                { "__typename": "Widget", "id": "1" },
                { "__typename": "Widget", "id": "2" }
            ]
        })
    });
    let node: PlanNode = serde_json::from_value(entity_fetch("b", "Widget", &["id"])).unwrap();
    let state = ExecutionState::Entities(vec![
        serde_json::from_value::<GraphQLErrorPath>(json!(["widgets", 0])).unwrap(),
        serde_json::from_value::<GraphQLErrorPath>(json!(["widgets", 1])).unwrap(),
    ]);

    executor
        .execute_node(&ctx, &node, Some(&state))
        .await
        .unwrap();
    let result = executor.finalize(&QueryPlan::default(), &ctx).unwrap();

    assert_eq!(
        result.data,
        Some(json!({ "widgets": [{ "id": "1", "weight": 1 }, { "id": "2", "weight": 2 }] }))
    );
    let errors = result.errors.unwrap();
    assert_eq!(errors[0].path.as_ref().unwrap().to_string(), "widgets.1.weight");
}

#[tokio::test]
async fn subscription_events_run_the_rest_of_the_plan() {
    let a = MockSubgraph::responding(json!({})).with_events(vec![
        json!({ "data": { "widgetUpdated": { "__typename": "Widget", "id": "1" } } }),
        json!({ "data": { "widgetUpdated": { "__typename": "Widget", "id": "2" } } }),
    ]);
    let b = MockSubgraph::new(|variables| {
        let weight = match variables["representations"][0]["id"].as_str() {
            Some("1") => 10,
            _ => 20,
        };
        json!({ "data": { "_entities": [{ "weight": weight }] } })
    });
    let executor = executor(vec![("a", a), ("b", b)]);
    let query_plan = plan(json!({
        "node": {
            "kind": "Subscription",
            "primary": {
                "kind": "Sequence",
                "nodes": [
                    {
                        "kind": "Fetch",
                        "serviceName": "a",
                        "operationKind": "subscription",
                        "operation": "subscription { widgetUpdated { __typename id } }"
                    },
                    {
                        "kind": "Flatten",
                        "path": ["widgetUpdated"],
                        "node": entity_fetch("b", "Widget", &["id"])
                    }
                ]
            }
        }
    }));
    let request = ExecutionRequest::parse("subscription { widgetUpdated { id weight } }").unwrap();

    let results: Vec<Value> = executor
        .subscribe(&query_plan, &request)
        .map(|result| to_json(&result.unwrap()))
        .collect()
        .await;

    assert_eq!(
        results,
        vec![
            json!({ "data": { "widgetUpdated": { "id": "1", "weight": 10 } } }),
            json!({ "data": { "widgetUpdated": { "id": "2", "weight": 20 } } }),
        ]
    );
}

#[tokio::test]
async fn plans_without_subscription_stream_a_single_result() {
    let executor = executor(vec![(
        "a",
        MockSubgraph::responding(json!({ "data": { "widget": { "id": "1" } } })),
    )]);
    let query_plan = plan(json!({
        "node": { "kind": "Fetch", "serviceName": "a", "operation": "{ widget { id } }" }
    }));
    let request = ExecutionRequest::parse("{ widget { id } }").unwrap();

    let results: Vec<_> = executor.subscribe(&query_plan, &request).collect().await;

    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].as_ref().unwrap().data,
        Some(json!({ "widget": { "id": "1" } }))
    );
}

#[tokio::test]
async fn fetch_operations_are_parsed_once_across_requests() {
    let executor = executor(vec![
        (
            "a",
            MockSubgraph::responding(json!({
                "data": { "products": [{ "__typename": "Product", "id": "1" }] }
            })),
        ),
        (
            "b",
            MockSubgraph::responding(json!({ "data": { "_entities": [{ "price": 1 }] } })),
        ),
    ]);
    let request = ExecutionRequest::parse("{ products { id price } }").unwrap();

    for _ in 0..3 {
        executor.execute(&products_plan(), &request).await.unwrap();
    }

    assert_eq!(executor.caches().documents_len(), 2);
}

#[tokio::test]
async fn flatten_errors_without_entity_path_go_to_the_default_path() {
    let executor = executor(vec![
        (
            "a",
            MockSubgraph::responding(json!({
                "data": { "widget": { "__typename": "Widget", "id": "1" } }
            })),
        ),
        (
            "b",
            MockSubgraph::responding(json!({
                "errors": [
                    { "message": "no path" },
                    { "message": "unknown entity", "path": ["_entities", 3, "weight"] }
                ]
            })),
        ),
    ]);
    let query_plan = plan(json!({
        "node": {
            "kind": "Sequence",
            "nodes": [
                { "kind": "Fetch", "serviceName": "a", "operation": "{ widget { __typename id } }" },
                {
                    "kind": "Flatten",
                    "path": ["widget"],
                    "node": entity_fetch("b", "Widget", &["id"])
                }
            ]
        }
    }));
    let request = ExecutionRequest::parse("{ widget { id weight } }").unwrap();

    let result = executor.execute(&query_plan, &request).await.unwrap();

    assert_eq!(
        to_json(&result)["errors"],
        json!([
            {
                "message": "no path",
                "path": ["_entities"],
                "extensions": { "serviceName": "b", "code": "DOWNSTREAM_SERVICE_ERROR" }
            },
            {
                "message": "unknown entity",
                "path": ["_entities"],
                "extensions": { "serviceName": "b", "code": "DOWNSTREAM_SERVICE_ERROR" }
            }
        ])
    );
    assert_eq!(
        result.data,
        Some(json!({ "widget": { "id": "1", "weight": null } }))
    );
}

#[tokio::test]
async fn later_nulls_overwrite_earlier_values() {
    let executor = executor(vec![
        (
            "a",
            MockSubgraph::responding(json!({ "data": { "me": { "id": "1", "name": "Ada" } } })),
        ),
        (
            "b",
            MockSubgraph::responding(json!({ "data": { "me": { "name": null } } })),
        ),
    ]);
    let query_plan = plan(json!({
        "node": {
            "kind": "Sequence",
            "nodes": [
                { "kind": "Fetch", "serviceName": "a", "operation": "{ me { id name } }" },
                { "kind": "Fetch", "serviceName": "b", "operation": "{ me { name } }" }
            ]
        }
    }));
    let request = ExecutionRequest::parse("{ me { id name } }").unwrap();

    let result = executor.execute(&query_plan, &request).await.unwrap();

    assert_eq!(
        result.data,
        Some(json!({ "me": { "id": "1", "name": null } }))
    );
}

async fn run_with_entities_state(kind: &str) -> (Calls, Calls, Option<Value>) {
    let b = MockSubgraph::responding(json!({ "data": { "_entities": [{ "weight": 3 }] } }));
    let c = MockSubgraph::responding(json!({ "data": { "me": { "id": "u1", "name": "Ada" } } }));
    let (b_calls, c_calls) = (b.calls(), c.calls());
    let executor = executor(vec![("b", b), ("c", c)]);

    let request = ExecutionRequest::parse("{ widgets { id weight } me { id name } }").unwrap();
    let ctx = executor.create_context(&request).unwrap();
    ctx.with_data(|data| *data = json!({ "widgets": [{ "__typename": "Widget", "id": "1" }] }));

    let node: PlanNode = serde_json::from_value(json!({
        "kind": kind,
        "nodes": [
            entity_fetch("b", "Widget", &["id"]),
            entity_fetch("c", "Widget", &["id"])
        ]
    }))
    .unwrap();
    let state = ExecutionState::Entities(vec![serde_json::from_value::<GraphQLErrorPath>(
        json!(["widgets", 0]),
    )
    .unwrap()]);

    executor
        .execute_node(&ctx, &node, Some(&state))
        .await
        .unwrap();
    let result = executor.finalize(&QueryPlan::default(), &ctx).unwrap();

    (b_calls, c_calls, result.data)
}

#[tokio::test]
async fn parallel_hands_the_state_to_its_first_child_only() {
    let (b_calls, c_calls, data) = run_with_entities_state("Parallel").await;

    assert_eq!(
        b_calls.lock().unwrap()[0]["representations"],
        json!([{ "__typename": "Widget", "id": "1" }])
    );
    let c_calls = c_calls.lock().unwrap();
    assert_eq!(c_calls.len(), 1);
    assert!(!c_calls[0].contains_key("representations"));
    assert_eq!(
        data,
        Some(json!({
            "widgets": [{ "id": "1", "weight": 3 }],
            "me": { "id": "u1", "name": "Ada" }
        }))
    );
}

#[tokio::test]
async fn sequence_hands_the_state_to_its_first_child_only() {
    let (b_calls, c_calls, data) = run_with_entities_state("Sequence").await;

    assert_eq!(
        b_calls.lock().unwrap()[0]["representations"],
        json!([{ "__typename": "Widget", "id": "1" }])
    );
    let c_calls = c_calls.lock().unwrap();
    assert_eq!(c_calls.len(), 1);
    assert!(!c_calls[0].contains_key("representations"));
    assert_eq!(
        data,
        Some(json!({
            "widgets": [{ "id": "1", "weight": 3 }],
            "me": { "id": "u1", "name": "Ada" }
        }))
    );
}
