use std::collections::HashMap;

use graphql_parser::schema::{Definition, Field, InputValue, SchemaDefinition, TypeDefinition};
use tracing::debug;

use crate::{
    ast::{map_named_type, OperationKind, SchemaDocument},
    error::SupergraphError,
    metadata::{MetadataTable, SchemaElement},
    supergraph::{type_def_name, Supergraph},
};

enum Keep {
    Untagged,
    As(String),
    Drop,
}

fn decide(all: &MetadataTable, own: &MetadataTable, element: &SchemaElement) -> Keep {
    if let Some(source) = own.sources(element).next() {
        Keep::As(source.name.clone())
    } else if all.has_sources(element) {
        Keep::Drop
    } else {
        Keep::Untagged
    }
}

/// Rebuilds the standalone schema of one subgraph from a supergraph.
///
/// Tags that name other subgraphs are discarded first. Elements tagged for the target keep
/// their pre-composition names, elements tagged only for other subgraphs are removed and
/// untagged elements are kept as they are.
pub fn extract_subgraph(
    supergraph: &Supergraph,
    subgraph_name: &str,
) -> Result<SchemaDocument, SupergraphError> {
    if !supergraph.subgraph_names().contains(subgraph_name) {
        return Err(SupergraphError::UnknownSubgraph(subgraph_name.to_string()));
    }

    debug!(subgraph = subgraph_name, "extracting subgraph from supergraph");

    let all = supergraph.metadata();
    let mut own = all.clone();
    own.retain(|_, tag| tag.subgraph() == subgraph_name);

    let mut type_names: HashMap<String, String> = HashMap::new();
    for definition in &supergraph.document().definitions {
        if let Definition::TypeDefinition(type_def) = definition {
            let name = type_def_name(type_def);
            match decide(all, &own, &SchemaElement::type_(name)) {
                Keep::Untagged => {
                    type_names.insert(name.to_string(), name.to_string());
                }
                Keep::As(original) => {
                    type_names.insert(name.to_string(), original);
                }
                Keep::Drop => {}
            }
        }
    }

    let rename = |name: &str| type_names.get(name).cloned();

    let mut definitions = vec![];
    for definition in &supergraph.document().definitions {
        match definition {
            Definition::TypeDefinition(type_def) => {
                let Some(new_name) = type_names.get(type_def_name(type_def)) else {
                    continue;
                };

                if let Some(type_def) = extract_type(type_def, new_name, all, &own, &rename) {
                    definitions.push(Definition::TypeDefinition(type_def));
                }
            }
            Definition::SchemaDefinition(_) => {}
            other => definitions.push(other.clone()),
        }
    }

    let mut document = SchemaDocument { definitions };

    if let Some(schema) = extracted_schema_definition(supergraph, &document, &type_names) {
        document
            .definitions
            .insert(0, Definition::SchemaDefinition(schema));
    }

    Ok(document)
}

fn extract_fields<F>(
    fields: &[Field<'static, String>],
    type_name: &str,
    all: &MetadataTable,
    own: &MetadataTable,
    rename: &F,
) -> Vec<Field<'static, String>>
where
    F: Fn(&str) -> Option<String>,
{
    fields
        .iter()
        .filter_map(|field| {
            let name = match decide(all, own, &SchemaElement::field(type_name, &field.name)) {
                Keep::Untagged => field.name.clone(),
                Keep::As(original) => original,
                Keep::Drop => return None,
            };

            let mut field = field.clone();
            field.name = name;
            field.field_type = map_named_type(&field.field_type, rename);
            field.arguments = rename_input_values(&field.arguments, rename);
            Some(field)
        })
        .collect()
}

fn rename_input_values<F>(
    values: &[InputValue<'static, String>],
    rename: &F,
) -> Vec<InputValue<'static, String>>
where
    F: Fn(&str) -> Option<String>,
{
    values
        .iter()
        .map(|value| {
            let mut value = value.clone();
            value.value_type = map_named_type(&value.value_type, rename);
            value
        })
        .collect()
}

fn retain_known_types<F>(names: &[String], rename: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    names.iter().filter_map(|name| rename(name)).collect()
}

fn extract_type<F>(
    type_def: &TypeDefinition<'static, String>,
    new_name: &str,
    all: &MetadataTable,
    own: &MetadataTable,
    rename: &F,
) -> Option<TypeDefinition<'static, String>>
where
    F: Fn(&str) -> Option<String>,
{
    let type_name = type_def_name(type_def);

    match type_def {
        TypeDefinition::Scalar(scalar) => {
            let mut scalar = scalar.clone();
            scalar.name = new_name.to_string();
            Some(TypeDefinition::Scalar(scalar))
        }
        TypeDefinition::Object(object) => {
            let fields = extract_fields(&object.fields, type_name, all, own, rename);
            if fields.is_empty() {
                return None;
            }

            let mut object = object.clone();
            object.name = new_name.to_string();
            object.fields = fields;
            object.implements_interfaces = retain_known_types(&object.implements_interfaces, rename);
            Some(TypeDefinition::Object(object))
        }
        TypeDefinition::Interface(interface) => {
            let fields = extract_fields(&interface.fields, type_name, all, own, rename);
            if fields.is_empty() {
                return None;
            }

            let mut interface = interface.clone();
            interface.name = new_name.to_string();
            interface.fields = fields;
            interface.implements_interfaces =
                retain_known_types(&interface.implements_interfaces, rename);
            Some(TypeDefinition::Interface(interface))
        }
        TypeDefinition::Union(union) => {
            let types = retain_known_types(&union.types, rename);
            if types.is_empty() {
                return None;
            }

            let mut union = union.clone();
            union.name = new_name.to_string();
            union.types = types;
            Some(TypeDefinition::Union(union))
        }
        TypeDefinition::Enum(enum_type) => {
            let values = enum_type
                .values
                .iter()
                .filter_map(|value| {
                    let element = SchemaElement::enum_value(type_name, &value.name);
                    let name = match decide(all, own, &element) {
                        Keep::Untagged => value.name.clone(),
                        Keep::As(original) => original,
                        Keep::Drop => return None,
                    };
                    let mut value = value.clone();
                    value.name = name;
                    Some(value)
                })
                .collect::<Vec<_>>();
            if values.is_empty() {
                return None;
            }

            let mut enum_type = enum_type.clone();
            enum_type.name = new_name.to_string();
            enum_type.values = values;
            Some(TypeDefinition::Enum(enum_type))
        }
        TypeDefinition::InputObject(input) => {
            let fields = input
                .fields
                .iter()
                .filter_map(|field| {
                    let element = SchemaElement::field(type_name, &field.name);
                    let name = match decide(all, own, &element) {
                        Keep::Untagged => field.name.clone(),
                        Keep::As(original) => original,
                        Keep::Drop => return None,
                    };
                    let mut field = field.clone();
                    field.name = name;
                    field.value_type = map_named_type(&field.value_type, rename);
                    Some(field)
                })
                .collect::<Vec<_>>();
            if fields.is_empty() {
                return None;
            }

            let mut input = input.clone();
            input.name = new_name.to_string();
            input.fields = fields;
            Some(TypeDefinition::InputObject(input))
        }
    }
}

/// Only emitted when a root type does not use its canonical name.
fn extracted_schema_definition(
    supergraph: &Supergraph,
    document: &SchemaDocument,
    type_names: &HashMap<String, String>,
) -> Option<SchemaDefinition<'static, String>> {
    let defines = |name: &str| {
        document.definitions.iter().any(|definition| {
            matches!(definition, Definition::TypeDefinition(type_def) if type_def_name(type_def) == name)
        })
    };

    let root = |kind: OperationKind| {
        supergraph
            .root_type_name(kind)
            .and_then(|name| type_names.get(name))
            .filter(|name| defines(name))
            .cloned()
    };

    let query = root(OperationKind::Query);
    let mutation = root(OperationKind::Mutation);
    let subscription = root(OperationKind::Subscription);

    let is_canonical = |kind: OperationKind, name: &Option<String>| {
        name.as_deref().is_none_or(|name| name == kind.root_type_name())
    };

    if is_canonical(OperationKind::Query, &query)
        && is_canonical(OperationKind::Mutation, &mutation)
        && is_canonical(OperationKind::Subscription, &subscription)
    {
        return None;
    }

    Some(SchemaDefinition {
        position: Default::default(),
        directives: vec![],
        query,
        mutation,
        subscription,
    })
}
