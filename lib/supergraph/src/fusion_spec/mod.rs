pub mod resolver;
pub mod source;
pub mod transport;
pub mod variable;

use serde::Serialize;

use crate::ast::Directive;

pub use resolver::{ResolverDirective, ResolverKind};
pub use source::SourceDirective;
pub use transport::TransportDirective;
pub use variable::VariableDirective;

pub const RESOLVER_KIND_ENUM: &str = "_ResolverKind";
pub const TRANSPORT_OPTIONS_SCALAR: &str = "_TransportOptions";

/// Definitions printed ahead of every supergraph so the text form is a self-describing schema.
pub const FUSION_DEFINITIONS: &str = r#"scalar _TransportOptions

enum _ResolverKind {
  FETCH
  BATCH
}

directive @source(subgraph: String!, name: String!) repeatable on SCALAR | OBJECT | INTERFACE | UNION | ENUM | ENUM_VALUE | INPUT_OBJECT | FIELD_DEFINITION | INPUT_FIELD_DEFINITION

directive @resolver(subgraph: String!, operation: String!, kind: _ResolverKind = FETCH) repeatable on OBJECT | INTERFACE | FIELD_DEFINITION

directive @variable(subgraph: String!, name: String!, select: String!) repeatable on OBJECT | FIELD_DEFINITION

directive @transport(subgraph: String!, kind: String!, location: String!, headers: _TransportOptions, options: _TransportOptions) repeatable on SCHEMA
"#;

pub fn is_fusion_directive_name(name: &str) -> bool {
    matches!(
        name,
        SourceDirective::NAME
            | ResolverDirective::NAME
            | VariableDirective::NAME
            | TransportDirective::NAME
    )
}

pub fn is_fusion_type_name(name: &str) -> bool {
    name == RESOLVER_KIND_ENUM || name == TRANSPORT_OPTIONS_SCALAR
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "directive", rename_all = "camelCase")]
pub enum FusionDirective {
    Source(SourceDirective),
    Resolver(ResolverDirective),
    Variable(VariableDirective),
    Transport(TransportDirective),
}

impl FusionDirective {
    pub fn from_directive(directive: &Directive) -> Option<Self> {
        if SourceDirective::is(directive) {
            Some(FusionDirective::Source(directive.into()))
        } else if ResolverDirective::is(directive) {
            Some(FusionDirective::Resolver(directive.into()))
        } else if VariableDirective::is(directive) {
            Some(FusionDirective::Variable(directive.into()))
        } else if TransportDirective::is(directive) {
            Some(FusionDirective::Transport(directive.into()))
        } else {
            None
        }
    }

    pub fn to_directive(&self) -> Directive {
        match self {
            FusionDirective::Source(source) => source.to_directive(),
            FusionDirective::Resolver(resolver) => resolver.to_directive(),
            FusionDirective::Variable(variable) => variable.to_directive(),
            FusionDirective::Transport(transport) => transport.to_directive(),
        }
    }

    /// The subgraph this tag belongs to.
    pub fn subgraph(&self) -> &str {
        match self {
            FusionDirective::Source(source) => &source.subgraph,
            FusionDirective::Resolver(resolver) => &resolver.subgraph,
            FusionDirective::Variable(variable) => &variable.subgraph,
            FusionDirective::Transport(transport) => &transport.subgraph,
        }
    }
}

impl From<SourceDirective> for FusionDirective {
    fn from(value: SourceDirective) -> Self {
        FusionDirective::Source(value)
    }
}

impl From<ResolverDirective> for FusionDirective {
    fn from(value: ResolverDirective) -> Self {
        FusionDirective::Resolver(value)
    }
}

impl From<VariableDirective> for FusionDirective {
    fn from(value: VariableDirective) -> Self {
        FusionDirective::Variable(value)
    }
}

impl From<TransportDirective> for FusionDirective {
    fn from(value: TransportDirective) -> Self {
        FusionDirective::Transport(value)
    }
}
