use graphql_parser::query::Value;
use serde::Serialize;

use crate::ast::{string_argument, Directive};

/// Origin subgraph of a schema element and its name before composition.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceDirective {
    pub subgraph: String,
    pub name: String,
}

impl SourceDirective {
    pub const NAME: &str = "source";

    pub fn new(subgraph: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            subgraph: subgraph.into(),
            name: name.into(),
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
            ],
        }
    }
}

impl From<&Directive> for SourceDirective {
    fn from(directive: &Directive) -> Self {
        Self {
            subgraph: string_argument(directive, "subgraph").unwrap_or_default(),
            name: string_argument(directive, "name").unwrap_or_default(),
        }
    }
}
