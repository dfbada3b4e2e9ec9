use std::collections::HashMap;

use fusion_supergraph::{
    ast::SchemaDocument,
    fusion_spec::is_fusion_directive_name,
    supergraph::type_def_name,
    MetadataTable, Supergraph,
};
use graphql_parser::schema::{Definition, TypeDefinition};
use tracing::warn;

use crate::{error::CompositionError, schema_utils::TypeKind, AnnotatedSubgraph};

fn union_by_name<T, F>(existing: &mut Vec<T>, incoming: &[T], name: F)
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    for item in incoming {
        if !existing.iter().any(|current| name(current) == name(item)) {
            existing.push(item.clone());
        }
    }
}

fn union_names(existing: &mut Vec<String>, incoming: &[String]) {
    for name in incoming {
        if !existing.contains(name) {
            existing.push(name.clone());
        }
    }
}

fn merge_type(
    existing: &mut TypeDefinition<'static, String>,
    incoming: &TypeDefinition<'static, String>,
    subgraph: &str,
) -> Result<(), CompositionError> {
    match (existing, incoming) {
        (TypeDefinition::Scalar(existing), TypeDefinition::Scalar(incoming)) => {
            if existing.description.is_none() {
                existing.description = incoming.description.clone();
            }
        }
        (TypeDefinition::Object(existing), TypeDefinition::Object(incoming)) => {
            if existing.description.is_none() {
                existing.description = incoming.description.clone();
            }
            union_names(&mut existing.implements_interfaces, &incoming.implements_interfaces);
            union_by_name(&mut existing.fields, &incoming.fields, |field| field.name.as_str());
        }
        (TypeDefinition::Interface(existing), TypeDefinition::Interface(incoming)) => {
            if existing.description.is_none() {
                existing.description = incoming.description.clone();
            }
            union_names(&mut existing.implements_interfaces, &incoming.implements_interfaces);
            union_by_name(&mut existing.fields, &incoming.fields, |field| field.name.as_str());
        }
        (TypeDefinition::Union(existing), TypeDefinition::Union(incoming)) => {
            union_names(&mut existing.types, &incoming.types);
        }
        (TypeDefinition::Enum(existing), TypeDefinition::Enum(incoming)) => {
            if existing.description.is_none() {
                existing.description = incoming.description.clone();
            }
            union_by_name(&mut existing.values, &incoming.values, |value| value.name.as_str());
        }
        (TypeDefinition::InputObject(existing), TypeDefinition::InputObject(incoming)) => {
            if existing.description.is_none() {
                existing.description = incoming.description.clone();
            }
            union_by_name(&mut existing.fields, &incoming.fields, |field| field.name.as_str());
        }
        (existing, incoming) => {
            return Err(CompositionError::TypeKindConflict {
                type_name: type_def_name(incoming).to_string(),
                existing: TypeKind::of(existing).to_string(),
                incoming: TypeKind::of(incoming).to_string(),
                subgraph: subgraph.to_string(),
            });
        }
    }

    Ok(())
}

/// Structural union of annotated subgraphs. Types merge by name, the first definition of
/// a field wins and metadata tables are concatenated.
pub fn merge_subgraphs(subgraphs: Vec<AnnotatedSubgraph>) -> Result<Supergraph, CompositionError> {
    let mut definitions: Vec<Definition<'static, String>> = vec![];
    let mut type_positions: HashMap<String, usize> = HashMap::new();
    let mut metadata = MetadataTable::new();

    for subgraph in subgraphs {
        for definition in subgraph.document.definitions {
            match definition {
                Definition::TypeDefinition(type_def) => {
                    let name = type_def_name(&type_def).to_string();
                    match type_positions.get(&name) {
                        Some(position) => {
                            if let Definition::TypeDefinition(existing) = &mut definitions[*position] {
                                merge_type(existing, &type_def, &subgraph.name)?;
                            }
                        }
                        None => {
                            type_positions.insert(name, definitions.len());
                            definitions.push(Definition::TypeDefinition(type_def));
                        }
                    }
                }
                Definition::DirectiveDefinition(directive) => {
                    if is_fusion_directive_name(&directive.name) {
                        continue;
                    }
                    let already_defined = definitions.iter().any(|definition| {
                        matches!(definition, Definition::DirectiveDefinition(current) if current.name == directive.name)
                    });
                    if !already_defined {
                        definitions.push(Definition::DirectiveDefinition(directive));
                    }
                }
                Definition::SchemaDefinition(_) => {}
                Definition::TypeExtension(_) => {
                    warn!(
                        subgraph = subgraph.name,
                        "type extensions are not supported by composition and were skipped"
                    );
                }
            }
        }

        metadata.merge(subgraph.metadata);
    }

    Ok(Supergraph::from_parts(
        SchemaDocument { definitions },
        metadata,
    ))
}
