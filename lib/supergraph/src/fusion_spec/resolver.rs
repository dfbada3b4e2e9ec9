use graphql_parser::query::Value;
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

use crate::ast::{string_argument, Directive};

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolverKind {
    /// One call per parent item.
    #[default]
    Fetch,
    /// One call for every parent item, with list-valued variables.
    Batch,
}

/// A literal sub-operation that resolves the annotated element from `subgraph`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolverDirective {
    pub subgraph: String,
    pub operation: String,
    pub kind: ResolverKind,
}

impl ResolverDirective {
    pub const NAME: &str = "resolver";

    pub fn new(subgraph: impl Into<String>, operation: impl Into<String>, kind: ResolverKind) -> Self {
        Self {
            subgraph: subgraph.into(),
            operation: operation.into(),
            kind,
        }
    }

    pub fn is(directive: &Directive) -> bool {
        directive.name == Self::NAME
    }

    pub fn to_directive(&self) -> Directive {
        let mut arguments = vec![
            ("subgraph".to_string(), Value::String(self.subgraph.clone())),
            ("operation".to_string(), Value::String(self.operation.clone())),
        ];

        if self.kind != ResolverKind::Fetch {
            arguments.push(("kind".to_string(), Value::Enum(self.kind.to_string())));
        }

        Directive {
            position: Default::default(),
            name: Self::NAME.to_string(),
            arguments,
        }
    }
}

impl From<&Directive> for ResolverDirective {
    fn from(directive: &Directive) -> Self {
        Self {
            subgraph: string_argument(directive, "subgraph").unwrap_or_default(),
            operation: string_argument(directive, "operation").unwrap_or_default(),
            kind: string_argument(directive, "kind")
                .and_then(|kind| kind.parse().ok())
                .unwrap_or_default(),
        }
    }
}
