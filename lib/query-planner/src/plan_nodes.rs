use std::collections::BTreeMap;

use fusion_supergraph::{
    ast::{collect_variables, GraphQLValue, OperationKind, QueryDocument},
    fusion_spec::ResolverKind,
};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::flatten::FlattenedField;

/// Where the value of a resolver variable comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingSource {
    /// A literal, possibly referencing operation variables.
    Value(GraphQLValue),
    /// A value the parent resolver exported next to every item this resolver merges into.
    Export(String),
}

impl Serialize for BindingSource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            BindingSource::Value(value) => serializer.serialize_str(&value.to_string()),
            BindingSource::Export(name) => serializer.serialize_str(&format!("${}", name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableBinding {
    /// Variable name in the resolver operation.
    pub variable: String,
    pub source: BindingSource,
}

impl VariableBinding {
    /// Names this binding reads from the captured outputs of the plan.
    pub fn dependencies(&self) -> Vec<String> {
        match &self.source {
            BindingSource::Value(value) => {
                let mut names = vec![];
                collect_variables(value, &mut names);
                names
            }
            BindingSource::Export(name) => vec![name.clone()],
        }
    }
}

/// A value selected under an internal alias so a child resolver can consume it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedVariable {
    pub name: String,
    /// Response path of the objects holding the alias.
    pub path: Vec<String>,
}

/// One call to a subgraph, before dependencies are resolved.
#[derive(Debug, Clone)]
pub struct ResolverOperationNode {
    pub id: usize,
    pub subgraph: String,
    pub kind: ResolverKind,
    pub operation: QueryDocument,
    pub operation_name: Option<String>,
    /// Response path of the objects this node writes into.
    pub path: Vec<String>,
    /// Key under which the result is stored on each target object. Without a key, the
    /// result's fields are merged into the object itself.
    pub merge_key: Option<String>,
    /// Response keys leading from the subgraph's `data` to the resolved value.
    pub result_path: Vec<String>,
    /// Response keys this node provides, nulled when the call fails.
    pub response_keys: Vec<String>,
    pub bindings: Vec<VariableBinding>,
    pub exports: Vec<ExportedVariable>,
    pub dependencies: Vec<String>,
    pub parent: Option<usize>,
}

/// A root field answered by the gateway itself (`__typename`, `__schema`, `__type`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaField {
    pub response_key: String,
    pub field: FlattenedField,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub operation_kind: OperationKind,
    pub operation_name: Option<String>,
    pub nodes: Vec<ResolverOperationNode>,
    /// Captured-output name to the nodes waiting for it.
    pub dependency_map: BTreeMap<String, Vec<usize>>,
    pub default_variables: Map<String, Value>,
    pub operation_variables: Vec<String>,
    pub meta_fields: Vec<MetaField>,
    /// Root response keys in operation order.
    pub root_response_keys: Vec<String>,
}
