use std::sync::Arc;

use futures::FutureExt;
use serde_json::{json, Value};

use crate::{
    context::RequestContext,
    execute_plan,
    executors::map::SubgraphExecutorMap,
    response::{graphql_error::GraphQLErrorPathSegment, subgraph_response::SubgraphResponse},
    tests::testkit::{
        a_b_supergraph, compose_fixtures, executor_map, init_logger, plan, MockSubgraphExecutor,
    },
};

#[tokio::test]
async fn independent_root_fields_are_merged() {
    init_logger();
    let supergraph = a_b_supergraph();
    let plan = plan(&supergraph, "{ a b }");
    let a = MockSubgraphExecutor::responding(json!({ "a": "a" }));
    let b = MockSubgraphExecutor::responding(json!({ "b": "b" }));
    let executors = executor_map(&[("a", &a), ("b", &b)]);

    // The same compiled plan serves both executions.
    for _ in 0..2 {
        let output = execute_plan(
            &plan,
            &supergraph,
            None,
            &executors,
            Arc::new(RequestContext::default()),
        )
        .await;

        assert_eq!(output.data, json!({ "a": "a", "b": "b" }));
        assert!(output.errors.is_empty());
    }

    assert_eq!(a.calls().len(), 2);
    assert_eq!(b.calls().len(), 2);
}

#[tokio::test]
async fn failed_call_only_nulls_its_own_subtree() {
    init_logger();
    let supergraph = a_b_supergraph();
    let plan = plan(&supergraph, "{ a b }");
    let a = MockSubgraphExecutor::responding(json!({ "a": "a" }));
    let b = MockSubgraphExecutor::failing("b");
    let executors = executor_map(&[("a", &a), ("b", &b)]);

    let output = execute_plan(
        &plan,
        &supergraph,
        None,
        &executors,
        Arc::new(RequestContext::default()),
    )
    .await;

    assert_eq!(output.data, json!({ "a": "a", "b": null }));
    assert_eq!(output.errors.len(), 1);
    assert_eq!(
        output.errors[0].message,
        "Failed to send request to subgraph \"b\": connection refused"
    );
    assert_eq!(output.errors[0].path, Some(vec!["b".into()]));
    assert_eq!(output.errors[0].code(), Some("SUBGRAPH_CALL_ERROR"));
}

#[tokio::test]
async fn subgraph_errors_without_data_fail_the_node() {
    let supergraph = a_b_supergraph();
    let plan = plan(&supergraph, "{ a b }");
    let a = MockSubgraphExecutor::responding(json!({ "a": "a" }));
    let b = MockSubgraphExecutor::new(|_| {
        Ok(SubgraphResponse::from_graphql_error("b broke".into()))
    });
    let executors = executor_map(&[("a", &a), ("b", &b)]);

    let output = execute_plan(
        &plan,
        &supergraph,
        None,
        &executors,
        Arc::new(RequestContext::default()),
    )
    .await;

    assert_eq!(output.data, json!({ "a": "a", "b": null }));
    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].message, "b broke");
    assert_eq!(
        output.errors[0].path,
        Some(vec![GraphQLErrorPathSegment::String("b".to_string())])
    );
}

#[tokio::test]
async fn missing_executor_is_reported_at_the_field() {
    let supergraph = a_b_supergraph();
    let plan = plan(&supergraph, "{ a b }");
    let a = MockSubgraphExecutor::responding(json!({ "a": "a" }));
    let executors = executor_map(&[("a", &a)]);

    let output = execute_plan(
        &plan,
        &supergraph,
        None,
        &executors,
        Arc::new(RequestContext::default()),
    )
    .await;

    assert_eq!(output.data, json!({ "a": "a", "b": null }));
    assert_eq!(
        output.errors[0].message,
        "No executor registered for subgraph \"b\""
    );
}

#[test]
fn completes_on_first_poll_when_no_call_suspends() {
    let supergraph = compose_fixtures(&["accounts", "reviews"]);
    let plan = plan(&supergraph, "{ reviews { body author { name } } }");
    let export = plan.nodes[0].exports[0].name.clone();

    let reviews = MockSubgraphExecutor::responding(json!({
        "reviews": [{ "body": "great", "author": { export.as_str(): "1" } }]
    }));
    let accounts = MockSubgraphExecutor::responding(json!({ "users": [{ "name": "Ada" }] }));
    let executors = executor_map(&[("reviews", &reviews), ("accounts", &accounts)]);

    let output = execute_plan(
        &plan,
        &supergraph,
        None,
        &executors,
        Arc::new(RequestContext::default()),
    )
    .now_or_never()
    .expect("plan should complete without suspending");

    assert_eq!(
        output.data,
        json!({ "reviews": [{ "body": "great", "author": { "name": "Ada" } }] })
    );
}

#[tokio::test]
async fn operation_variables_fall_back_to_defaults_then_null() {
    let supergraph = compose_fixtures(&["accounts"]);
    let accounts = MockSubgraphExecutor::responding(json!({ "user": { "name": "Ada" } }));
    let executors = executor_map(&[("accounts", &accounts)]);

    let with_default = plan(
        &supergraph,
        r#"query ($id: ID = "7") { user(id: $id) { name } }"#,
    );
    let without_default = plan(&supergraph, "query ($id: ID!) { user(id: $id) { name } }");

    for compiled in [&with_default, &without_default] {
        let output = execute_plan(
            compiled,
            &supergraph,
            None,
            &executors,
            Arc::new(RequestContext::default()),
        )
        .await;
        assert_eq!(output.data, json!({ "user": { "name": "Ada" } }));
    }

    let calls = accounts.calls();
    assert_eq!(calls[0].variables.get("id"), Some(&json!("7")));
    assert_eq!(calls[1].variables.get("id"), Some(&Value::Null));

    let provided = json!({ "id": "42" }).as_object().cloned().unwrap();
    execute_plan(
        &with_default,
        &supergraph,
        Some(&provided),
        &executors,
        Arc::new(RequestContext::default()),
    )
    .await;
    assert_eq!(accounts.calls()[2].variables.get("id"), Some(&json!("42")));
}

#[tokio::test]
async fn meta_fields_are_answered_by_the_gateway() {
    let supergraph = a_b_supergraph();
    let plan = plan(&supergraph, "{ kind: __typename a }");
    let a = MockSubgraphExecutor::responding(json!({ "a": "a" }));
    let executors = executor_map(&[("a", &a)]);

    let output = execute_plan(
        &plan,
        &supergraph,
        None,
        &executors,
        Arc::new(RequestContext::default()),
    )
    .await;

    assert_eq!(output.data, json!({ "kind": "Query", "a": "a" }));
}

#[tokio::test]
async fn request_context_reaches_every_call() {
    let supergraph = a_b_supergraph();
    let plan = plan(&supergraph, "{ a }");
    let a = MockSubgraphExecutor::responding(json!({ "a": "a" }));
    let mut executors = SubgraphExecutorMap::new();
    executors.insert_boxed_arc(
        "a".to_string(),
        crate::executors::common::SubgraphExecutor::to_boxed_arc(a.clone()),
    );

    let context = Arc::new(RequestContext::default().with_extension("tenant", json!("acme")));
    execute_plan(&plan, &supergraph, None, &executors, context).await;

    let calls = a.calls();
    assert_eq!(calls[0].subgraph_name, "a");
    assert_eq!(calls[0].context.extensions.get("tenant"), Some(&json!("acme")));
}
