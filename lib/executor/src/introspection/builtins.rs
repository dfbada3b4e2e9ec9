use fusion_supergraph::ast::{parse_schema, SchemaDocument};
use tracing::error;

const BUILTIN_DEFINITIONS: &str = r#"
"The `String` scalar type represents textual data, represented as UTF-8 character sequences."
scalar String

"The `Int` scalar type represents non-fractional signed whole numeric values."
scalar Int

"The `Float` scalar type represents signed double-precision fractional values."
scalar Float

"The `Boolean` scalar type represents `true` or `false`."
scalar Boolean

"The `ID` scalar type represents a unique identifier."
scalar ID

"Directs the executor to include this field or fragment only when the `if` argument is true."
directive @include(if: Boolean!) on FIELD | FRAGMENT_SPREAD | INLINE_FRAGMENT

"Directs the executor to skip this field or fragment when the `if` argument is true."
directive @skip(if: Boolean!) on FIELD | FRAGMENT_SPREAD | INLINE_FRAGMENT

"Marks an element of a GraphQL schema as no longer supported."
directive @deprecated(reason: String = "No longer supported") on FIELD_DEFINITION | ARGUMENT_DEFINITION | INPUT_FIELD_DEFINITION | ENUM_VALUE
"#;

/// Scalars and directives every schema has even when its document does not define them.
pub(crate) fn builtin_definitions() -> SchemaDocument {
    match parse_schema(BUILTIN_DEFINITIONS) {
        Ok(document) => document,
        Err(err) => {
            error!(error = %err, "failed to parse built-in definitions");
            SchemaDocument {
                definitions: vec![],
            }
        }
    }
}
