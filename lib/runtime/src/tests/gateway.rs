use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fusion_plan_executor::{
    plugins::{
        hooks::on_subgraph_execute::{
            OnSubgraphExecuteStartHookPayload, OnSubgraphExecuteStartHookResult,
        },
        plugin_trait::{EndHookPayload, GatewayPlugin, StartHookPayload},
    },
    GatewayPlugins, RequestContext,
};
use http::{HeaderMap, HeaderValue};
use serde_json::json;

use crate::{
    gateway::{Gateway, GatewayOptions, GatewayRequest, EXPOSE_QUERY_PLAN_HEADER},
    plan_cache::PlanCache,
    tests::testkit::{
        echo_supergraph, gateway_with, init_logger, mock_transport, schema_state, MockTransport,
    },
};

#[tokio::test]
async fn identical_requests_share_one_planning_pass() {
    init_logger();
    let transport = Arc::new(MockTransport::default());
    let gateway = gateway_with(&["a", "b"], transport.clone(), GatewayOptions::default());
    let supergraph_id = gateway
        .schema_state()
        .current_supergraph()
        .unwrap()
        .supergraph
        .id();
    let key = PlanCache::key(supergraph_id, "{ a b }", None);
    let plan_cache = &gateway.schema_state().plan_cache;

    let first = gateway
        .execute(GatewayRequest::new("{ a b }"), RequestContext::default())
        .await;
    let planned = plan_cache.get(key).await.expect("plan should be cached");

    let second = gateway
        .execute(GatewayRequest::new("{ a b }"), RequestContext::default())
        .await;
    let reused = plan_cache.get(key).await.expect("plan should be cached");

    assert_eq!(first.data, json!({ "a": "a", "b": "b" }));
    assert_eq!(second.data, json!({ "a": "a", "b": "b" }));
    assert!(first.errors.is_empty() && second.errors.is_empty());
    // A second planning pass would have replaced the cached plan.
    assert!(Arc::ptr_eq(&planned, &reused));
    assert_eq!(plan_cache.entry_count().await, 1);

    // One executor per subgraph, built on first use.
    assert_eq!(transport.created(), 2);
    assert_eq!(transport.calls().len(), 4);
}

#[tokio::test]
async fn failing_subgraph_only_nulls_its_field() {
    let transport = Arc::new(MockTransport::failing(&["b"]));
    let gateway = gateway_with(&["a", "b"], transport, GatewayOptions::default());

    let response = gateway
        .execute(GatewayRequest::new("{ a b }"), RequestContext::default())
        .await;

    assert_eq!(response.data, json!({ "a": "a", "b": null }));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].path, Some(vec!["b".into()]));
    assert_eq!(response.errors[0].code(), Some("SUBGRAPH_CALL_ERROR"));
}

#[tokio::test]
async fn introspection_is_answered_without_planning() {
    let transport = Arc::new(MockTransport::default());
    let gateway = gateway_with(&["a", "b"], transport.clone(), GatewayOptions::default());

    let typename = gateway
        .execute(GatewayRequest::new("{ __typename }"), RequestContext::default())
        .await;
    assert_eq!(typename.data, json!({ "__typename": "Query" }));

    let named = gateway
        .execute(
            GatewayRequest::new(
                "query IntrospectionQuery { __schema { queryType { name } } }",
            ),
            RequestContext::default(),
        )
        .await;
    assert_eq!(
        named.data,
        json!({ "__schema": { "queryType": { "name": "Query" } } })
    );

    let by_type = gateway
        .execute(
            GatewayRequest::new(
                r#"query ($name: String = "Query") { __type(name: $name) { fields { name } } }"#,
            ),
            RequestContext::default(),
        )
        .await;
    assert_eq!(
        by_type.data,
        json!({ "__type": { "fields": [{ "name": "a" }, { "name": "b" }] } })
    );

    assert_eq!(gateway.schema_state().plan_cache.entry_count().await, 0);
    assert_eq!(transport.created(), 0);
}

#[tokio::test]
async fn disabled_introspection_is_rejected() {
    let gateway = gateway_with(
        &["a"],
        Arc::new(MockTransport::default()),
        GatewayOptions {
            introspection_enabled: false,
            ..Default::default()
        },
    );

    let response = gateway
        .execute(
            GatewayRequest::new("{ a __schema { queryType { name } } }"),
            RequestContext::default(),
        )
        .await;
    assert_eq!(response.data, json!(null));
    assert_eq!(response.errors[0].code(), Some("INTROSPECTION_DISABLED"));

    let typename = gateway
        .execute(GatewayRequest::new("{ __typename }"), RequestContext::default())
        .await;
    assert_eq!(typename.data, json!({ "__typename": "Query" }));
}

#[tokio::test]
async fn query_plan_is_exposed_only_when_allowed() {
    let transport = Arc::new(MockTransport::default());
    let allowed = gateway_with(
        &["a"],
        transport.clone(),
        GatewayOptions {
            allow_expose_query_plan: true,
            ..Default::default()
        },
    );

    let response = allowed
        .execute(
            GatewayRequest::new("{ a }").with_query_plan(),
            RequestContext::default(),
        )
        .await;
    let plan = &response.extensions.as_ref().unwrap()["queryPlan"];
    assert_eq!(plan["nodes"][0]["subgraph"], json!("a"));

    let mut headers = HeaderMap::new();
    headers.insert(EXPOSE_QUERY_PLAN_HEADER, HeaderValue::from_static("true"));
    let response = allowed
        .execute(GatewayRequest::new("{ a }"), RequestContext::new(headers.clone()))
        .await;
    assert!(response.extensions.is_some());

    let denied = gateway_with(&["a"], transport, GatewayOptions::default());
    let response = denied
        .execute(
            GatewayRequest::new("{ a }").with_query_plan(),
            RequestContext::new(headers),
        )
        .await;
    assert_eq!(response.data, json!({ "a": "a" }));
    assert!(response.extensions.is_none());
}

#[tokio::test]
async fn request_level_errors_carry_codes() {
    let gateway = gateway_with(
        &["a"],
        Arc::new(MockTransport::default()),
        GatewayOptions::default(),
    );

    let cases = [
        (GatewayRequest::new("{ a "), "GRAPHQL_PARSE_FAILED"),
        (GatewayRequest::new("{ nope }"), "GRAPHQL_VALIDATION_FAILED"),
        (
            GatewayRequest::new("query A { a } query B { a }"),
            "OPERATION_RESOLUTION_FAILURE",
        ),
        (
            GatewayRequest::new("query A { a }").with_operation_name("C"),
            "OPERATION_RESOLUTION_FAILURE",
        ),
    ];

    for (request, code) in cases {
        let response = gateway.execute(request, RequestContext::default()).await;
        assert_eq!(response.data, json!(null));
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].code(), Some(code));
    }

    let not_ready = Gateway::new(
        schema_state(Arc::new(MockTransport::default()), Arc::new(vec![])),
        GatewayOptions::default(),
    );
    let response = not_ready
        .execute(GatewayRequest::new("{ a }"), RequestContext::default())
        .await;
    assert_eq!(response.errors[0].code(), Some("SUPERGRAPH_NOT_READY"));
}

#[tokio::test]
async fn operation_name_and_variables_are_honoured() {
    let transport = Arc::new(MockTransport::default());
    let gateway = gateway_with(&["a", "b"], transport, GatewayOptions::default());

    let response = gateway
        .execute(
            serde_json::from_value::<GatewayRequest>(json!({
                "query": "query A { a } query B { b }",
                "operationName": "B",
                "variables": {}
            }))
            .unwrap(),
            RequestContext::default(),
        )
        .await;

    assert_eq!(response.data, json!({ "b": "b" }));
}

#[tokio::test]
async fn unknown_transport_kind_fails_the_field() {
    let transport = Arc::new(MockTransport::default());
    let state = schema_state(transport, Arc::new(vec![]));
    let supergraph = fusion_composition::compose_subgraphs(vec![
        fusion_composition::SubgraphConfig::new(
            "a",
            fusion_supergraph::ast::parse_schema("type Query { a: String }").unwrap(),
        )
        .with_transport(mock_transport("a", "carrier-pigeon")),
    ])
    .unwrap();
    state.set_supergraph(supergraph);
    let gateway = Gateway::new(state, GatewayOptions::default());

    let response = gateway
        .execute(GatewayRequest::new("{ a }"), RequestContext::default())
        .await;

    assert_eq!(response.data, json!({ "a": null }));
    assert_eq!(
        response.errors[0].message,
        "Subgraph \"a\" uses transport \"carrier-pigeon\" which has no registered factory"
    );
    assert_eq!(response.errors[0].code(), Some("SUBGRAPH_EXECUTOR_UNAVAILABLE"));
}

struct TenantHeaderPlugin {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl GatewayPlugin for TenantHeaderPlugin {
    fn plugin_name(&self) -> &'static str {
        "tenant-header"
    }

    async fn on_subgraph_execute<'exec>(
        &'exec self,
        mut payload: OnSubgraphExecuteStartHookPayload<'exec>,
    ) -> OnSubgraphExecuteStartHookResult<'exec> {
        let tenant = payload
            .execution_request
            .context
            .extensions
            .get("tenant")
            .and_then(|value| value.as_str())
            .unwrap_or("none")
            .to_string();
        payload.execution_request.headers.insert(
            "x-tenant",
            HeaderValue::from_str(&tenant).unwrap_or(HeaderValue::from_static("invalid")),
        );

        let seen = self.seen.clone();
        let subgraph_name = payload.subgraph_name.to_string();
        payload.on_end(move |payload| {
            seen.lock().unwrap().push(subgraph_name);
            payload.proceed()
        })
    }
}

#[tokio::test]
async fn registered_hooks_wrap_every_executor() {
    let transport = Arc::new(MockTransport::default());
    let seen = Arc::new(Mutex::new(vec![]));
    let plugins: GatewayPlugins = Arc::new(vec![Arc::new(TenantHeaderPlugin {
        seen: seen.clone(),
    })]);
    let state = schema_state(transport.clone(), plugins);
    state.set_supergraph(echo_supergraph(&["a", "b"]));
    let gateway = Gateway::new(state, GatewayOptions::default());

    let response = gateway
        .execute(
            GatewayRequest::new("{ a b }"),
            RequestContext::default().with_extension("tenant", json!("acme")),
        )
        .await;
    assert_eq!(response.data, json!({ "a": "a", "b": "b" }));

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls
        .iter()
        .all(|call| call.headers.get("x-tenant") == Some(&HeaderValue::from_static("acme"))));

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec!["a", "b"]);
}
