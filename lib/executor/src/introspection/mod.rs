mod builtins;
pub mod resolve;

pub use resolve::{is_introspection_only, resolve_introspection, resolve_meta_field, IntrospectionContext};
