use graphql_parser::query::Value;
use serde::Serialize;

use crate::ast::{string_argument, Directive};

/// When the annotated element is fetched from `subgraph`, the field `select` is exported
/// under `name` so resolvers of other subgraphs can consume it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VariableDirective {
    pub subgraph: String,
    pub name: String,
    pub select: String,
}

impl VariableDirective {
    pub const NAME: &str = "variable";

    pub fn new(
        subgraph: impl Into<String>,
        name: impl Into<String>,
        select: impl Into<String>,
    ) -> Self {
        Self {
            subgraph: subgraph.into(),
            name: name.into(),
            select: select.into(),
        }
    }

    pub fn is(directive: &Directive) -> bool {
        directive.name == Self::NAME
    }

    pub fn to_directive(&self) -> Directive {
        Directive {
            position: Default::default(),
            name: Self::NAME.to_string(),
            arguments: vec![
                ("subgraph".to_string(), Value::String(self.subgraph.clone())),
                ("name".to_string(), Value::String(self.name.clone())),
                ("select".to_string(), Value::String(self.select.clone())),
            ],
        }
    }
}

impl From<&Directive> for VariableDirective {
    fn from(directive: &Directive) -> Self {
        Self {
            subgraph: string_argument(directive, "subgraph").unwrap_or_default(),
            name: string_argument(directive, "name").unwrap_or_default(),
            select: string_argument(directive, "select").unwrap_or_default(),
        }
    }
}
