use std::collections::HashMap;

use fusion_supergraph::{
    ast::{is_builtin_scalar, OperationKind},
    supergraph::type_def_name,
};
use graphql_parser::schema::{Definition, TypeDefinition};
use strum::IntoEnumIterator;
use tracing::trace;

use crate::{
    schema_utils::{rename_types, TypeKind},
    AnnotatedSubgraph,
};

/// A pure rewrite of an annotated subgraph. Implementations must keep the metadata
/// keyed by the names they produce.
pub trait SubgraphTransform: Send + Sync {
    fn transform(&self, subgraph: AnnotatedSubgraph) -> AnnotatedSubgraph;
}

type TypeRenameFn = dyn Fn(&str) -> String + Send + Sync;
type FieldRenameFn = dyn Fn(&str, &str) -> String + Send + Sync;

fn is_root_type(name: &str) -> bool {
    OperationKind::iter().any(|kind| kind.root_type_name() == name)
}

/// Renames types. Root types and built-in scalars are never renamed.
pub struct RenameTypeTransform {
    rename: Box<TypeRenameFn>,
    kinds: Option<Vec<TypeKind>>,
}

impl RenameTypeTransform {
    pub fn new<F>(rename: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            rename: Box::new(rename),
            kinds: None,
        }
    }

    /// Restricts the transform to the given kinds of types.
    pub fn only(mut self, kinds: impl IntoIterator<Item = TypeKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::new(move |name| format!("{}{}", prefix, name))
    }

    fn applies_to(&self, type_def: &TypeDefinition<'static, String>) -> bool {
        let name = type_def_name(type_def);
        if is_root_type(name) || is_builtin_scalar(name) {
            return false;
        }

        self.kinds
            .as_ref()
            .is_none_or(|kinds| kinds.contains(&TypeKind::of(type_def)))
    }
}

impl SubgraphTransform for RenameTypeTransform {
    fn transform(&self, mut subgraph: AnnotatedSubgraph) -> AnnotatedSubgraph {
        let renames = subgraph
            .document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                Definition::TypeDefinition(type_def) if self.applies_to(type_def) => {
                    let name = type_def_name(type_def);
                    let new_name = (self.rename)(name);
                    (new_name != name).then(|| (name.to_string(), new_name))
                }
                _ => None,
            })
            .collect::<HashMap<_, _>>();

        for (from, to) in &renames {
            trace!(subgraph = subgraph.name, from, to, "renaming type");
            subgraph.metadata.rename_type(from, to);
        }
        rename_types(&mut subgraph.document, &renames);

        subgraph
    }
}

/// Renames fields of object, interface and input object types. The rename function
/// receives the type name and the field name.
pub struct RenameFieldTransform {
    rename: Box<FieldRenameFn>,
    kinds: Option<Vec<TypeKind>>,
}

impl RenameFieldTransform {
    pub fn new<F>(rename: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        Self {
            rename: Box::new(rename),
            kinds: None,
        }
    }

    pub fn only(mut self, kinds: impl IntoIterator<Item = TypeKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    fn applies_to(&self, kind: TypeKind) -> bool {
        self.kinds.as_ref().is_none_or(|kinds| kinds.contains(&kind))
    }
}

impl SubgraphTransform for RenameFieldTransform {
    fn transform(&self, mut subgraph: AnnotatedSubgraph) -> AnnotatedSubgraph {
        let mut renamed = vec![];

        for definition in subgraph.document.definitions.iter_mut() {
            let Definition::TypeDefinition(type_def) = definition else {
                continue;
            };
            if !self.applies_to(TypeKind::of(type_def)) {
                continue;
            }

            let type_name = type_def_name(type_def).to_string();
            let mut rename = |name: &mut String| {
                let new_name = (self.rename)(&type_name, name.as_str());
                if new_name != *name {
                    renamed.push((type_name.clone(), name.clone(), new_name.clone()));
                    *name = new_name;
                }
            };

            match type_def {
                TypeDefinition::Object(object) => {
                    object.fields.iter_mut().for_each(|field| rename(&mut field.name))
                }
                TypeDefinition::Interface(interface) => interface
                    .fields
                    .iter_mut()
                    .for_each(|field| rename(&mut field.name)),
                TypeDefinition::InputObject(input) => {
                    input.fields.iter_mut().for_each(|field| rename(&mut field.name))
                }
                _ => {}
            }
        }

        for (type_name, from, to) in renamed {
            trace!(subgraph = subgraph.name, type_name, from, to, "renaming field");
            subgraph.metadata.rename_field(&type_name, &from, &to);
        }

        subgraph
    }
}
