use std::hint::black_box;
use std::sync::Arc;

use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, Criterion};
use fusion_composition::{compose_subgraphs, SubgraphConfig};
use fusion_plan_executor::{
    execute_plan,
    executors::{
        common::{SubgraphExecutionRequest, SubgraphExecutor},
        error::SubgraphExecutorError,
    },
    response::subgraph_response::SubgraphResponse,
    RequestContext, SubgraphExecutorMap,
};
use fusion_query_planner::build_plan;
use fusion_supergraph::{
    ast::{parse_operation, parse_schema},
    Supergraph,
};
use serde_json::{json, Value};

const REVIEWS: usize = 200;

struct StaticExecutor {
    respond: fn(&SubgraphExecutionRequest) -> Value,
}

#[async_trait]
impl SubgraphExecutor for StaticExecutor {
    async fn execute(
        &self,
        execution_request: SubgraphExecutionRequest,
    ) -> Result<SubgraphResponse, SubgraphExecutorError> {
        Ok(SubgraphResponse::with_data((self.respond)(
            &execution_request,
        )))
    }
}

fn fixture_supergraph() -> Supergraph {
    let subgraphs = ["accounts", "reviews"]
        .iter()
        .map(|name| {
            let sdl = std::fs::read_to_string(format!("../query-planner/fixtures/{}.graphql", name))
                .expect("Unable to read input file");
            SubgraphConfig::new(*name, parse_schema(&sdl).expect("fixture should parse"))
        })
        .collect();

    compose_subgraphs(subgraphs).expect("fixtures should compose")
}

fn users(request: &SubgraphExecutionRequest) -> Value {
    let users = request
        .variables
        .get("User_id")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .map(|id| json!({ "name": id }))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    json!({ "users": users })
}

fn reviews(request: &SubgraphExecutionRequest) -> Value {
    // The export alias is the only aliased field in the reviews operation.
    let alias = request
        .query
        .split_whitespace()
        .find(|token| token.starts_with("__variable_"))
        .and_then(|token| token.split(':').next())
        .map(str::to_string)
        .unwrap_or_default();
    let reviews = (0..REVIEWS)
        .map(|index| {
            json!({
                "body": format!("review {}", index),
                "author": { alias.as_str(): (index % 20).to_string() }
            })
        })
        .collect::<Vec<_>>();
    json!({ "reviews": reviews })
}

fn batched_execution(c: &mut Criterion) {
    let supergraph = fixture_supergraph();
    let document = parse_operation("{ reviews { body author { name } } }")
        .expect("operation should parse");
    let plan = build_plan(&supergraph, &document, None).expect("operation should plan");

    let mut executors = SubgraphExecutorMap::new();
    executors.insert_boxed_arc(
        "reviews".to_string(),
        StaticExecutor { respond: reviews }.to_boxed_arc(),
    );
    executors.insert_boxed_arc(
        "accounts".to_string(),
        StaticExecutor { respond: users }.to_boxed_arc(),
    );

    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    c.bench_function("execute_batched_plan", |b| {
        b.to_async(&runtime).iter(|| async {
            let output = execute_plan(
                black_box(&plan),
                black_box(&supergraph),
                None,
                &executors,
                Arc::new(RequestContext::default()),
            )
            .await;
            black_box(output);
        })
    });
}

criterion_group!(benches, batched_execution);
criterion_main!(benches);
