use fusion_supergraph::Supergraph;

use crate::{
    error::PlanningError,
    tests::testkit::{compose_fixtures, init_logger, plan},
};

#[test]
fn operation_selection_errors() {
    init_logger();
    let supergraph = compose_fixtures(&["accounts", "reviews"]);
    let operations = "query A { me { id } } query B { reviews { id } }";

    assert_eq!(
        plan(&supergraph, operations, None).unwrap_err(),
        PlanningError::AmbiguousOperation
    );
    assert_eq!(
        plan(&supergraph, operations, Some("C")).unwrap_err(),
        PlanningError::OperationNotFound("C".to_string())
    );
    assert!(plan(&supergraph, operations, Some("B")).is_ok());
}

#[test]
fn missing_root_type_fails() {
    init_logger();
    let supergraph = compose_fixtures(&["reviews"]);
    let error = plan(&supergraph, "mutation { rename(id: 1, name: \"x\") { id } }", None).unwrap_err();

    assert_eq!(error, PlanningError::UnresolvedRootType("mutation".to_string()));
    assert_eq!(error.code(), "QUERY_PLAN_BUILD_FAILED");
}

#[test]
fn unknown_fields_fail_validation() {
    init_logger();
    let supergraph = compose_fixtures(&["accounts", "reviews"]);
    let error = plan(&supergraph, "{ reviews { nope } }", None).unwrap_err();

    assert_eq!(
        error.to_string(),
        "Cannot query field \"nope\" on type \"Review\""
    );
}

#[test]
fn fields_without_a_reachable_resolver_fail() {
    init_logger();
    let supergraph = compose_fixtures(&["accounts", "reviews"]);
    let error = plan(&supergraph, "{ reviews { rating } }", None).unwrap_err();

    assert_eq!(
        error,
        PlanningError::UnresolvableField {
            type_name: "Review".to_string(),
            field: "rating".to_string(),
            subgraph: "reviews".to_string(),
        }
    );
}

#[test]
fn root_fields_without_resolver_fail() {
    init_logger();
    let (document, mut metadata) = compose_fixtures(&["accounts"]).into_parts();
    metadata.retain(|_, tag| !matches!(tag, fusion_supergraph::fusion_spec::FusionDirective::Resolver(_)));
    let supergraph = Supergraph::from_parts(document, metadata);

    assert_eq!(
        plan(&supergraph, "{ me { id } }", None).unwrap_err(),
        PlanningError::MissingRootResolver {
            type_name: "Query".to_string(),
            field: "me".to_string(),
        }
    );
}
