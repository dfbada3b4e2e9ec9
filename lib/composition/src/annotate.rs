use std::collections::HashMap;

use fusion_supergraph::{
    ast::{is_builtin_scalar, OperationKind},
    fusion_spec::{ResolverDirective, ResolverKind, SourceDirective, TransportDirective},
    supergraph::type_def_name,
    MetadataTable, SchemaElement,
};
use graphql_parser::schema::{Definition, Field, TypeDefinition};
use strum::IntoEnumIterator;
use tracing::trace;

use crate::{schema_utils::rename_types, AnnotatedSubgraph, SubgraphConfig};

/// Root type names a subgraph uses, per operation kind.
pub fn root_type_mapping(subgraph: &SubgraphConfig) -> HashMap<OperationKind, String> {
    let mut mapping = HashMap::new();

    for definition in &subgraph.schema.definitions {
        if let Definition::SchemaDefinition(schema) = definition {
            for (kind, name) in [
                (OperationKind::Query, &schema.query),
                (OperationKind::Mutation, &schema.mutation),
                (OperationKind::Subscription, &schema.subscription),
            ] {
                if let Some(name) = name {
                    mapping.insert(kind, name.clone());
                }
            }
        }
    }

    for kind in OperationKind::iter() {
        if mapping.contains_key(&kind) {
            continue;
        }

        let canonical = kind.root_type_name();
        let defined = subgraph.schema.definitions.iter().any(|definition| {
            matches!(definition, Definition::TypeDefinition(type_def) if type_def_name(type_def) == canonical)
        });

        if defined {
            mapping.insert(kind, canonical.to_string());
        }
    }

    mapping
}

/// Single-field operation that forwards a root field, with one variable per argument.
pub fn root_field_operation(kind: OperationKind, field: &Field<'static, String>) -> String {
    let operation_name = match kind {
        OperationKind::Query => field.name.clone(),
        _ => format!("{}{}", kind, field.name),
    };

    if field.arguments.is_empty() {
        return format!("{} {} {{ {} }}", kind, operation_name, field.name);
    }

    let variable_definitions = field
        .arguments
        .iter()
        .map(|argument| match &argument.default_value {
            Some(default_value) => format!(
                "${}: {} = {}",
                argument.name, argument.value_type, default_value
            ),
            None => format!("${}: {}", argument.name, argument.value_type),
        })
        .collect::<Vec<_>>()
        .join(", ");

    let arguments = field
        .arguments
        .iter()
        .map(|argument| format!("{}: ${}", argument.name, argument.name))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{} {}({}) {{ {}({}) }}",
        kind, operation_name, variable_definitions, field.name, arguments
    )
}

/// Tags every element of a subgraph with its origin and gives every root field a resolver.
/// Root types are renamed to `Query`, `Mutation` and `Subscription`.
pub fn annotate_subgraph(subgraph: &SubgraphConfig) -> AnnotatedSubgraph {
    let subgraph_name = subgraph.name.as_str();
    let roots = root_type_mapping(subgraph);
    let mut metadata = MetadataTable::new();

    let mut document = subgraph.schema.clone();
    document
        .definitions
        .retain(|definition| !matches!(definition, Definition::SchemaDefinition(_)));

    let original_names = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::TypeDefinition(type_def) => Some(type_def_name(type_def).to_string()),
            _ => None,
        })
        .collect::<Vec<_>>();

    let renames = roots
        .iter()
        .filter(|(kind, name)| kind.root_type_name() != name.as_str())
        .map(|(kind, name)| (name.clone(), kind.root_type_name().to_string()))
        .collect::<HashMap<_, _>>();
    rename_types(&mut document, &renames);

    for (definition, original_name) in document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::TypeDefinition(type_def) => Some(type_def),
            _ => None,
        })
        .zip(original_names)
    {
        let type_name = type_def_name(definition);
        if is_builtin_scalar(type_name) {
            continue;
        }

        metadata.push(
            SchemaElement::type_(type_name),
            SourceDirective::new(subgraph_name, original_name),
        );

        match definition {
            TypeDefinition::Object(object) => {
                let root_kind = OperationKind::iter().find(|kind| {
                    roots.contains_key(kind) && kind.root_type_name() == object.name
                });

                for field in &object.fields {
                    let element = SchemaElement::field(type_name, &field.name);
                    metadata.push(element.clone(), SourceDirective::new(subgraph_name, &field.name));

                    if let Some(kind) = root_kind {
                        let operation = root_field_operation(kind, field);
                        trace!(
                            subgraph = subgraph_name,
                            operation = operation.as_str(),
                            "root field resolver"
                        );
                        metadata.push(
                            element,
                            ResolverDirective::new(subgraph_name, operation, ResolverKind::Fetch),
                        );
                    }
                }
            }
            TypeDefinition::Interface(interface) => {
                for field in &interface.fields {
                    metadata.push(
                        SchemaElement::field(type_name, &field.name),
                        SourceDirective::new(subgraph_name, &field.name),
                    );
                }
            }
            TypeDefinition::InputObject(input) => {
                for field in &input.fields {
                    metadata.push(
                        SchemaElement::field(type_name, &field.name),
                        SourceDirective::new(subgraph_name, &field.name),
                    );
                }
            }
            TypeDefinition::Enum(enum_type) => {
                for value in &enum_type.values {
                    metadata.push(
                        SchemaElement::enum_value(type_name, &value.name),
                        SourceDirective::new(subgraph_name, &value.name),
                    );
                }
            }
            TypeDefinition::Scalar(_) | TypeDefinition::Union(_) => {}
        }
    }

    if let Some(transport) = &subgraph.transport {
        metadata.push(
            SchemaElement::Schema,
            TransportDirective {
                subgraph: subgraph_name.to_string(),
                kind: transport.kind.clone(),
                location: transport.location.clone(),
                headers: transport.headers.clone(),
                options: transport.options.clone(),
            },
        );
    }

    AnnotatedSubgraph {
        name: subgraph.name.clone(),
        document,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_supergraph::{ast::parse_schema, Supergraph};

    fn annotate(sdl: &str) -> AnnotatedSubgraph {
        annotate_subgraph(&SubgraphConfig::new("a", parse_schema(sdl).unwrap()))
    }

    #[test]
    fn root_fields_get_forwarding_resolvers() {
        let annotated = annotate(
            r#"
            type Query {
              hello: String
              user(id: ID!, first: Int = 10): User
            }
            type Mutation {
              rename(id: ID!): User
            }
            type User { id: ID! }
            "#,
        );

        let resolver = |field: &str, type_name: &str| {
            annotated
                .metadata
                .resolvers(&SchemaElement::field(type_name, field))
                .next()
                .map(|resolver| resolver.operation.clone())
                .unwrap()
        };

        assert_eq!(resolver("hello", "Query"), "query hello { hello }");
        assert_eq!(
            resolver("user", "Query"),
            "query user($id: ID!, $first: Int = 10) { user(id: $id, first: $first) }"
        );
        assert_eq!(
            resolver("rename", "Mutation"),
            "mutation mutationrename($id: ID!) { rename(id: $id) }"
        );
        assert!(annotated
            .metadata
            .resolvers(&SchemaElement::field("User", "id"))
            .next()
            .is_none());
    }

    #[test]
    fn custom_root_types_are_renamed() {
        let annotated = annotate(
            r#"
            schema { query: RootQuery }
            type RootQuery { me: Account }
            type Account { id: ID! role: Role }
            enum Role { ADMIN }
            "#,
        );

        let supergraph =
            Supergraph::from_parts(annotated.document.clone(), annotated.metadata.clone());

        insta::assert_snapshot!(supergraph.document().to_string(), @r"
        type Query {
          me: Account
        }

        type Account {
          id: ID!
          role: Role
        }

        enum Role {
          ADMIN
        }
        ");

        let query_source = annotated
            .metadata
            .source_in(&SchemaElement::type_("Query"), "a")
            .unwrap();
        assert_eq!(query_source.name, "RootQuery");
        assert!(annotated
            .metadata
            .source_in(&SchemaElement::enum_value("Role", "ADMIN"), "a")
            .is_some());
    }
}
