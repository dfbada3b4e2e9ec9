use crate::{
    compile_plan,
    plan_nodes::{BindingSource, VariableBinding},
    planner::plan_operation,
    tests::testkit::{init_logger, plan, supergraph_with_stats},
    PlanningError,
};

#[test]
fn field_resolver_merges_under_the_field_key() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let supergraph = supergraph_with_stats();
    let plan = plan(&supergraph, "{ topReview { body stats { likes } } }", None)?;

    insta::assert_snapshot!(format!("{}", plan), @r#"
    Plan {
      Resolve(id: 0, subgraph: "reviews", kind: FETCH) {
        at: "topReview"
        {
          query topReview {
            topReview {
              body
              __variable_0: id
            }
          }
        }
      },
      Resolve(id: 1, subgraph: "stats", kind: FETCH, after: [0]) {
        at: "topReview.stats"
        $reviewId <- export __variable_0
        {
          query reviewStats($reviewId: ID!) {
            stats(reviewId: $reviewId) {
              likes
            }
          }
        }
      },
    },
    "#);
    assert_eq!(plan.nodes[1].path, vec!["topReview"]);
    assert_eq!(plan.nodes[1].merge_key.as_deref(), Some("stats"));
    assert_eq!(plan.nodes[0].exports[0].path, vec!["topReview"]);

    Ok(())
}

#[test]
fn exports_are_shared_by_resolvers_of_one_level() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let supergraph = supergraph_with_stats();
    let plan = plan(
        &supergraph,
        "{ topReview { first: stats { likes } second: stats { likes } } }",
        None,
    )?;

    assert_eq!(plan.nodes.len(), 3);
    assert_eq!(plan.nodes[0].exports.len(), 1);
    assert_eq!(plan.consumers["__variable_0"], vec![1, 2]);

    Ok(())
}

#[test]
fn compiler_rejects_unbound_and_duplicated_variables() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let supergraph = supergraph_with_stats();
    let document = fusion_supergraph::ast::parse_operation("{ topReview { stats { likes } } }")?;

    let mut unbound = plan_operation(&supergraph, &document, None)?;
    unbound.nodes[1].bindings = vec![VariableBinding {
        variable: "reviewId".to_string(),
        source: BindingSource::Export("__variable_9".to_string()),
    }];
    unbound.nodes[1].dependencies = vec!["__variable_9".to_string()];
    assert_eq!(
        compile_plan(unbound).unwrap_err(),
        PlanningError::UnboundVariable {
            variable: "__variable_9".to_string(),
            node: 1,
        }
    );

    let mut duplicated = plan_operation(&supergraph, &document, None)?;
    duplicated.operation_variables.push("__variable_0".to_string());
    assert_eq!(
        compile_plan(duplicated).unwrap_err(),
        PlanningError::DuplicateVariableProducer {
            variable: "__variable_0".to_string(),
            node: 1,
        }
    );

    Ok(())
}

#[test]
fn compiler_detects_cycles() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let supergraph = supergraph_with_stats();
    let document = fusion_supergraph::ast::parse_operation("{ topReview { stats { likes } } }")?;

    let mut cyclic = plan_operation(&supergraph, &document, None)?;
    cyclic.nodes[0].parent = Some(1);
    assert_eq!(compile_plan(cyclic).unwrap_err(), PlanningError::PlanCycle);

    Ok(())
}
