use std::collections::HashMap;

use fusion_supergraph::{
    ast::{map_named_type, SchemaDocument},
    supergraph::type_def_name,
};
use graphql_parser::schema::{Definition, Field, InputValue, TypeDefinition};
use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    pub fn of(type_def: &TypeDefinition<'static, String>) -> Self {
        match type_def {
            TypeDefinition::Scalar(_) => TypeKind::Scalar,
            TypeDefinition::Object(_) => TypeKind::Object,
            TypeDefinition::Interface(_) => TypeKind::Interface,
            TypeDefinition::Union(_) => TypeKind::Union,
            TypeDefinition::Enum(_) => TypeKind::Enum,
            TypeDefinition::InputObject(_) => TypeKind::InputObject,
        }
    }
}

pub fn type_definitions(
    document: &SchemaDocument,
) -> impl Iterator<Item = &TypeDefinition<'static, String>> {
    document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::TypeDefinition(type_def) => Some(type_def),
            _ => None,
        })
}

pub fn find_type<'a>(
    document: &'a SchemaDocument,
    name: &str,
) -> Option<&'a TypeDefinition<'static, String>> {
    type_definitions(document).find(|type_def| type_def_name(type_def) == name)
}

pub fn object_fields<'a>(
    document: &'a SchemaDocument,
    name: &str,
) -> Option<&'a [Field<'static, String>]> {
    match find_type(document, name)? {
        TypeDefinition::Object(object) => Some(&object.fields),
        _ => None,
    }
}

fn rename_input_values(values: &mut [InputValue<'static, String>], renames: &HashMap<String, String>) {
    let rename = |name: &str| renames.get(name).cloned();
    for value in values.iter_mut() {
        value.value_type = map_named_type(&value.value_type, &rename);
    }
}

fn rename_fields(fields: &mut [Field<'static, String>], renames: &HashMap<String, String>) {
    let rename = |name: &str| renames.get(name).cloned();
    for field in fields.iter_mut() {
        field.field_type = map_named_type(&field.field_type, &rename);
        rename_input_values(&mut field.arguments, renames);
    }
}

fn rename_list(names: &mut [String], renames: &HashMap<String, String>) {
    for name in names.iter_mut() {
        if let Some(new_name) = renames.get(name.as_str()) {
            *name = new_name.clone();
        }
    }
}

/// Renames type definitions and every reference to them: field, argument and input field
/// types, union members, implemented interfaces and schema roots.
pub fn rename_types(document: &mut SchemaDocument, renames: &HashMap<String, String>) {
    if renames.is_empty() {
        return;
    }

    for definition in document.definitions.iter_mut() {
        match definition {
            Definition::SchemaDefinition(schema) => {
                for root in [&mut schema.query, &mut schema.mutation, &mut schema.subscription] {
                    if let Some(name) = root {
                        if let Some(new_name) = renames.get(name.as_str()) {
                            *name = new_name.clone();
                        }
                    }
                }
            }
            Definition::TypeDefinition(type_def) => {
                let new_name = renames.get(type_def_name(type_def)).cloned();
                match type_def {
                    TypeDefinition::Scalar(scalar) => {
                        if let Some(new_name) = new_name {
                            scalar.name = new_name;
                        }
                    }
                    TypeDefinition::Object(object) => {
                        if let Some(new_name) = new_name {
                            object.name = new_name;
                        }
                        rename_list(&mut object.implements_interfaces, renames);
                        rename_fields(&mut object.fields, renames);
                    }
                    TypeDefinition::Interface(interface) => {
                        if let Some(new_name) = new_name {
                            interface.name = new_name;
                        }
                        rename_list(&mut interface.implements_interfaces, renames);
                        rename_fields(&mut interface.fields, renames);
                    }
                    TypeDefinition::Union(union) => {
                        if let Some(new_name) = new_name {
                            union.name = new_name;
                        }
                        rename_list(&mut union.types, renames);
                    }
                    TypeDefinition::Enum(enum_type) => {
                        if let Some(new_name) = new_name {
                            enum_type.name = new_name;
                        }
                    }
                    TypeDefinition::InputObject(input) => {
                        if let Some(new_name) = new_name {
                            input.name = new_name;
                        }
                        rename_input_values(&mut input.fields, renames);
                    }
                }
            }
            Definition::DirectiveDefinition(directive) => {
                rename_input_values(&mut directive.arguments, renames);
            }
            Definition::TypeExtension(_) => {}
        }
    }
}
