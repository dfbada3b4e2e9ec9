use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, SystemTime},
};

use fusion_gateway_config::{parse_yaml_config, FusionGatewayConfig};
use fusion_gateway_internal::background_tasks::BackgroundTasksManager;
use fusion_plan_executor::executors::common::SubgraphExecutorResolver;

use crate::{
    plan_cache::PlanCache,
    schema_state::SchemaState,
    supergraph::base::LoadSupergraphError,
    tests::testkit::{echo_supergraph, init_logger, schema_state, MockTransport},
};

fn temp_supergraph(name: &str, sdl: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "fusion-runtime-{}-{}.graphql",
        name,
        std::process::id()
    ));
    std::fs::write(&path, sdl).unwrap();
    path
}

fn file_source_config(path: &str, poll_interval: Option<&str>) -> FusionGatewayConfig {
    let mut raw = format!("supergraph:\n  source: file\n  path: {:?}\n", path);
    if let Some(poll_interval) = poll_interval {
        raw.push_str(&format!("  poll_interval: {}\n", poll_interval));
    }

    parse_yaml_config(&raw).unwrap()
}

#[tokio::test]
async fn swapping_keeps_in_flight_data_and_drops_plans() {
    init_logger();
    let transport = Arc::new(MockTransport::default());
    let state = schema_state(transport.clone(), Arc::new(vec![]));
    assert!(!state.is_ready());

    let first = state.set_supergraph(echo_supergraph(&["a"]));
    assert!(state.is_ready());
    first.executors.get_executor("a").await.unwrap();
    assert_eq!(first.executors.len(), 1);

    let key = PlanCache::key(first.supergraph.id(), "{ a }", None);
    let plan = fusion_query_planner::build_plan(
        &first.supergraph,
        &fusion_supergraph::ast::parse_operation("{ a }").unwrap(),
        None,
    )
    .unwrap();
    state.plan_cache.insert(key, Arc::new(plan)).await;
    assert_eq!(state.plan_cache.entry_count().await, 1);

    // Same schema: nothing is rebuilt.
    let same = state.set_supergraph(echo_supergraph(&["a"]));
    assert!(Arc::ptr_eq(&first, &same));
    assert!(Arc::ptr_eq(&first.executors, &same.executors));
    assert_eq!(state.plan_cache.entry_count().await, 1);

    let second = state.set_supergraph(echo_supergraph(&["a", "b"]));
    assert_ne!(first.supergraph.id(), second.supergraph.id());
    assert!(second.executors.is_empty());
    assert_eq!(state.plan_cache.entry_count().await, 0);

    // Work that loaded the first version still sees it.
    assert_eq!(first.executors.len(), 1);
    assert!(first.supergraph.transport_entries().get("b").is_none());
    assert_eq!(
        state
            .current_supergraph()
            .unwrap()
            .supergraph
            .transport_entries()
            .len(),
        2
    );
}

#[tokio::test]
async fn broken_sdl_keeps_the_active_supergraph() {
    let state = schema_state(Arc::new(MockTransport::default()), Arc::new(vec![]));
    let active = state.set_supergraph(echo_supergraph(&["a"]));

    let result = state.reload_from_sdl("type Query {");

    assert!(matches!(result, Err(LoadSupergraphError::ParseError(_))));
    assert_eq!(
        state.current_supergraph().unwrap().supergraph.id(),
        active.supergraph.id()
    );
}

#[tokio::test]
async fn polling_picks_up_file_changes() {
    init_logger();
    let path = temp_supergraph("polling", &echo_supergraph(&["a"]).print());
    let config = file_source_config(&path.to_string_lossy(), Some("50ms"));
    let mut bg_tasks_manager = BackgroundTasksManager::new();

    let state = SchemaState::new_from_config(
        &mut bg_tasks_manager,
        &config,
        Arc::new(MockTransport::default()),
        Arc::new(vec![]),
    )
    .await
    .unwrap();
    let initial_id = state.current_supergraph().unwrap().supergraph.id();
    assert_eq!(bg_tasks_manager.len(), 1);

    std::fs::write(&path, echo_supergraph(&["a", "b"]).print()).unwrap();
    std::fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(5))
        .unwrap();

    let changed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let id = state.current_supergraph().unwrap().supergraph.id();
            if id != initial_id {
                return id;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    bg_tasks_manager.shutdown().await;
    std::fs::remove_file(&path).ok();

    assert!(changed.is_ok(), "supergraph was not reloaded");
    assert_eq!(
        state
            .current_supergraph()
            .unwrap()
            .supergraph
            .transport_entries()
            .len(),
        2
    );
}

#[tokio::test]
async fn missing_supergraph_file_fails_startup() {
    let config = file_source_config("/definitely/not/here/supergraph.graphql", None);
    let mut bg_tasks_manager = BackgroundTasksManager::new();

    let result = SchemaState::new_from_config(
        &mut bg_tasks_manager,
        &config,
        Arc::new(MockTransport::default()),
        Arc::new(vec![]),
    )
    .await;

    assert!(matches!(result, Err(LoadSupergraphError::ReadFileError(_))));
    assert!(bg_tasks_manager.is_empty());
}
