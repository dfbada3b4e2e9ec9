use fusion_supergraph::{
    ast::{is_list_type, map_named_type, named_type, GraphQLType},
    fusion_spec::{ResolverDirective, ResolverKind, VariableDirective},
    MetadataTable, SchemaElement,
};
use graphql_parser::schema::{Field, InputValue, TypeDefinition};
use tracing::debug;

use crate::{
    conventions::{match_resolver_convention, normalize_name, pluralize},
    schema_utils::{find_type, object_fields},
    AnnotatedSubgraph,
};

struct EntityResolver {
    subgraph: String,
    type_name: String,
    field_name: String,
    kind: ResolverKind,
    operation: String,
}

fn original_name(metadata: &MetadataTable, subgraph: &str, element: &SchemaElement, fallback: &str) -> String {
    metadata
        .source_in(element, subgraph)
        .map(|source| source.name.clone())
        .unwrap_or_else(|| fallback.to_string())
}

/// Argument type as the subgraph itself spells it.
fn original_type(subgraph: &AnnotatedSubgraph, value_type: &GraphQLType) -> GraphQLType {
    map_named_type(value_type, &|name: &str| {
        subgraph
            .metadata
            .source_in(&SchemaElement::type_(name), &subgraph.name)
            .map(|source| source.name.clone())
    })
}

fn matching_argument<'a>(
    query_field: &'a Field<'static, String>,
    key_field: &Field<'static, String>,
    key_field_name: &str,
    kind: ResolverKind,
) -> Option<&'a InputValue<'static, String>> {
    let accepted_names = match kind {
        ResolverKind::Fetch => vec![normalize_name(key_field_name)],
        ResolverKind::Batch => vec![
            normalize_name(key_field_name),
            normalize_name(&pluralize(key_field_name)),
        ],
    };

    query_field.arguments.iter().find(|argument| {
        accepted_names.contains(&normalize_name(&argument.name))
            && named_type(&argument.value_type) == named_type(&key_field.field_type)
            && is_list_type(&argument.value_type) == (kind == ResolverKind::Batch)
    })
}

fn find_entity_resolvers(subgraph: &AnnotatedSubgraph) -> Vec<EntityResolver> {
    let mut found = vec![];
    let Some(query_fields) = object_fields(&subgraph.document, "Query") else {
        return found;
    };

    for query_field in query_fields {
        let type_name = named_type(&query_field.field_type);
        let Some(entity_fields) = object_fields(&subgraph.document, type_name) else {
            continue;
        };
        let returns_list = is_list_type(&query_field.field_type);

        let query_field_name = original_name(
            &subgraph.metadata,
            &subgraph.name,
            &SchemaElement::field("Query", &query_field.name),
            &query_field.name,
        );
        let type_original = original_name(
            &subgraph.metadata,
            &subgraph.name,
            &SchemaElement::type_(type_name),
            type_name,
        );

        for key_field in entity_fields {
            let key_original = original_name(
                &subgraph.metadata,
                &subgraph.name,
                &SchemaElement::field(type_name, &key_field.name),
                &key_field.name,
            );

            let Some(kind) = match_resolver_convention(&type_original, &key_original, &query_field_name)
            else {
                continue;
            };

            if returns_list != (kind == ResolverKind::Batch) {
                continue;
            }

            let Some(argument) = matching_argument(query_field, key_field, &key_original, kind) else {
                continue;
            };

            let variable = format!("{}_{}", type_name, key_field.name);
            let operation = format!(
                "query {}By{}(${}: {}) {{ {}({}: ${}) }}",
                type_name,
                key_field.name,
                variable,
                original_type(subgraph, &argument.value_type),
                query_field_name,
                argument.name,
                variable
            );

            found.push(EntityResolver {
                subgraph: subgraph.name.clone(),
                type_name: type_name.to_string(),
                field_name: key_field.name.clone(),
                kind,
                operation,
            });
        }
    }

    found
}

/// Connects subgraphs that share an object type: a root query field following a naming
/// convention becomes a resolver for the type, and every other subgraph defining the key
/// field exports it as a variable.
pub fn wire_entity_resolvers(subgraphs: &mut [AnnotatedSubgraph]) {
    let resolvers = subgraphs
        .iter()
        .flat_map(find_entity_resolvers)
        .collect::<Vec<_>>();

    for resolver in resolvers {
        debug!(
            subgraph = resolver.subgraph,
            type_name = resolver.type_name,
            key = resolver.field_name,
            kind = resolver.kind.as_ref(),
            "wiring entity resolver"
        );

        let variable_name = format!("{}_{}", resolver.type_name, resolver.field_name);

        for subgraph in subgraphs.iter_mut() {
            if subgraph.name == resolver.subgraph {
                subgraph.metadata.push(
                    SchemaElement::type_(&resolver.type_name),
                    ResolverDirective::new(
                        &resolver.subgraph,
                        &resolver.operation,
                        resolver.kind,
                    ),
                );
                continue;
            }

            let defines_key = matches!(
                find_type(&subgraph.document, &resolver.type_name),
                Some(TypeDefinition::Object(object))
                    if object.fields.iter().any(|field| field.name == resolver.field_name)
            );
            if !defines_key {
                continue;
            }

            let select = original_name(
                &subgraph.metadata,
                &subgraph.name,
                &SchemaElement::field(&resolver.type_name, &resolver.field_name),
                &resolver.field_name,
            );
            subgraph.metadata.push(
                SchemaElement::field(&resolver.type_name, &resolver.field_name),
                VariableDirective::new(&subgraph.name, &variable_name, select),
            );
        }
    }
}
