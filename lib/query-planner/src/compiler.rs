use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter as FmtFormatter, Result as FmtResult},
};

use fusion_supergraph::{
    ast::{OperationKind, QueryDocument},
    fusion_spec::ResolverKind,
    Supergraph,
};
use petgraph::{algo::toposort, graph::DiGraph};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::{
    error::PlanningError,
    plan_nodes::{BindingSource, ExportedVariable, MetaField, Plan, VariableBinding},
    planner::plan_operation,
    utils::pretty_display::{get_indent, PrettyDisplay},
};

/// A resolver operation with its dependencies resolved to node indices and its operation
/// printed once.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableResolverOperationNode {
    pub id: usize,
    pub subgraph: String,
    pub kind: ResolverKind,
    pub operation: String,
    pub operation_name: Option<String>,
    pub path: Vec<String>,
    pub merge_key: Option<String>,
    pub result_path: Vec<String>,
    pub response_keys: Vec<String>,
    pub bindings: Vec<VariableBinding>,
    pub exports: Vec<ExportedVariable>,
    pub dependencies: Vec<String>,
    pub parent: Option<usize>,
    /// Nodes that must complete before this one starts.
    pub waits_for: Vec<usize>,
    /// Nodes waiting on this one.
    pub children: Vec<usize>,
}

/// Frozen plan for one (schema, operation text, operation name). Reusable across executions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPlan {
    pub operation_kind: OperationKind,
    pub operation_name: Option<String>,
    pub nodes: Vec<ExecutableResolverOperationNode>,
    /// Nodes ready as soon as execution starts.
    pub roots: Vec<usize>,
    /// Captured-output name to the nodes consuming it.
    pub consumers: BTreeMap<String, Vec<usize>>,
    pub default_variables: Map<String, Value>,
    pub operation_variables: Vec<String>,
    pub meta_fields: Vec<MetaField>,
    pub root_response_keys: Vec<String>,
}

impl CompiledPlan {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.meta_fields.is_empty()
    }
}

/// Plans and compiles in one step.
pub fn build_plan(
    supergraph: &Supergraph,
    document: &QueryDocument,
    operation_name: Option<&str>,
) -> Result<CompiledPlan, PlanningError> {
    let plan = plan_operation(supergraph, document, operation_name)?;
    compile_plan(plan)
}

fn is_ancestor(plan: &Plan, ancestor: usize, mut node: usize) -> bool {
    // Bounded so a corrupted parent chain ends in the cycle check instead of looping.
    for _ in 0..plan.nodes.len() {
        match plan.nodes[node].parent {
            Some(parent) if parent == ancestor => return true,
            Some(parent) => node = parent,
            None => return false,
        }
    }
    false
}

#[instrument(level = "debug", skip_all)]
pub fn compile_plan(plan: Plan) -> Result<CompiledPlan, PlanningError> {
    let mut graph = DiGraph::<usize, ()>::with_capacity(plan.nodes.len(), plan.nodes.len());
    let indices = plan
        .nodes
        .iter()
        .map(|node| graph.add_node(node.id))
        .collect::<Vec<_>>();

    let mut waits_for: Vec<Vec<usize>> = vec![vec![]; plan.nodes.len()];

    for node in &plan.nodes {
        if let Some(parent) = node.parent {
            waits_for[node.id].push(parent);
        }

        for dependency in &node.dependencies {
            let from_operation = plan.operation_variables.contains(dependency);
            let producers = plan
                .nodes
                .iter()
                .filter(|candidate| {
                    candidate
                        .exports
                        .iter()
                        .any(|export| &export.name == dependency)
                })
                .map(|candidate| candidate.id)
                .collect::<Vec<_>>();

            match (from_operation, producers.as_slice()) {
                (true, []) => {}
                (false, [producer]) if is_ancestor(&plan, *producer, node.id) => {
                    if !waits_for[node.id].contains(producer) {
                        waits_for[node.id].push(*producer);
                    }
                }
                (false, []) | (false, [_]) => {
                    return Err(PlanningError::UnboundVariable {
                        variable: dependency.clone(),
                        node: node.id,
                    })
                }
                _ => {
                    return Err(PlanningError::DuplicateVariableProducer {
                        variable: dependency.clone(),
                        node: node.id,
                    })
                }
            }
        }
    }

    for (node, producers) in waits_for.iter().enumerate() {
        for producer in producers {
            graph.add_edge(indices[*producer], indices[node], ());
        }
    }

    toposort(&graph, None).map_err(|_| PlanningError::PlanCycle)?;

    let mut children: Vec<Vec<usize>> = vec![vec![]; plan.nodes.len()];
    for (node, producers) in waits_for.iter().enumerate() {
        for producer in producers {
            children[*producer].push(node);
        }
    }

    let roots = waits_for
        .iter()
        .enumerate()
        .filter(|(_, producers)| producers.is_empty())
        .map(|(node, _)| node)
        .collect();

    let nodes = plan
        .nodes
        .into_iter()
        .zip(waits_for.into_iter().zip(children))
        .map(|(node, (waits_for, children))| ExecutableResolverOperationNode {
            id: node.id,
            subgraph: node.subgraph,
            kind: node.kind,
            operation: node.operation.to_string().trim_end().to_string(),
            operation_name: node.operation_name,
            path: node.path,
            merge_key: node.merge_key,
            result_path: node.result_path,
            response_keys: node.response_keys,
            bindings: node.bindings,
            exports: node.exports,
            dependencies: node.dependencies,
            parent: node.parent,
            waits_for,
            children,
        })
        .collect();

    Ok(CompiledPlan {
        operation_kind: plan.operation_kind,
        operation_name: plan.operation_name,
        nodes,
        roots,
        consumers: plan.dependency_map,
        default_variables: plan.default_variables,
        operation_variables: plan.operation_variables,
        meta_fields: plan.meta_fields,
        root_response_keys: plan.root_response_keys,
    })
}

impl Display for CompiledPlan {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        self.pretty_fmt(f, 0)
    }
}

impl Display for ExecutableResolverOperationNode {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        self.pretty_fmt(f, 0)
    }
}

impl PrettyDisplay for CompiledPlan {
    fn pretty_fmt(&self, f: &mut FmtFormatter<'_>, depth: usize) -> FmtResult {
        let indent = get_indent(depth);
        writeln!(f, "{indent}Plan {{")?;
        for meta_field in &self.meta_fields {
            writeln!(f, "{indent}  Meta(\"{}\"),", meta_field.response_key)?;
        }
        for node in &self.nodes {
            node.pretty_fmt(f, depth + 1)?;
        }
        writeln!(f, "{indent}}},")?;
        Ok(())
    }
}

impl PrettyDisplay for ExecutableResolverOperationNode {
    fn pretty_fmt(&self, f: &mut FmtFormatter<'_>, depth: usize) -> FmtResult {
        let indent = get_indent(depth);
        write!(
            f,
            "{indent}Resolve(id: {}, subgraph: \"{}\", kind: {}",
            self.id, self.subgraph, self.kind
        )?;
        if !self.waits_for.is_empty() {
            write!(
                f,
                ", after: [{}]",
                self.waits_for
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
        }
        writeln!(f, ") {{")?;

        let target = self.path.iter().chain(self.merge_key.as_ref());
        writeln!(
            f,
            "{indent}  at: \"{}\"",
            target.map(String::as_str).collect::<Vec<_>>().join(".")
        )?;

        for binding in &self.bindings {
            let source = match &binding.source {
                BindingSource::Value(value) => value.to_string(),
                BindingSource::Export(name) => format!("export {}", name),
            };
            writeln!(f, "{indent}  ${} <- {}", binding.variable, source)?;
        }

        writeln!(f, "{indent}  {{")?;
        for line in self.operation.lines() {
            writeln!(f, "{indent}    {line}")?;
        }
        writeln!(f, "{indent}  }}")?;
        writeln!(f, "{indent}}},")?;

        Ok(())
    }
}
