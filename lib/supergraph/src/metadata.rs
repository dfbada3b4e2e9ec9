use std::{collections::BTreeMap, fmt::Display};

use crate::fusion_spec::{
    FusionDirective, ResolverDirective, SourceDirective, TransportDirective, VariableDirective,
};

/// Stable identity of a schema element that can carry fusion metadata.
/// Input object fields are addressed as fields of their input type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaElement {
    Schema,
    Type(String),
    Field {
        type_name: String,
        field_name: String,
    },
    EnumValue {
        type_name: String,
        value: String,
    },
}

impl SchemaElement {
    pub fn type_(name: impl Into<String>) -> Self {
        SchemaElement::Type(name.into())
    }

    pub fn field(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        SchemaElement::Field {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }

    pub fn enum_value(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        SchemaElement::EnumValue {
            type_name: type_name.into(),
            value: value.into(),
        }
    }

    /// Name of the type this element belongs to.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            SchemaElement::Schema => None,
            SchemaElement::Type(name) => Some(name),
            SchemaElement::Field { type_name, .. } => Some(type_name),
            SchemaElement::EnumValue { type_name, .. } => Some(type_name),
        }
    }

    fn with_type_name(&self, new_type_name: &str) -> Self {
        match self {
            SchemaElement::Schema => SchemaElement::Schema,
            SchemaElement::Type(_) => SchemaElement::Type(new_type_name.to_string()),
            SchemaElement::Field { field_name, .. } => SchemaElement::field(new_type_name, field_name),
            SchemaElement::EnumValue { value, .. } => SchemaElement::enum_value(new_type_name, value),
        }
    }
}

impl Display for SchemaElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaElement::Schema => write!(f, "schema"),
            SchemaElement::Type(name) => write!(f, "{}", name),
            SchemaElement::Field {
                type_name,
                field_name,
            } => write!(f, "{}.{}", type_name, field_name),
            SchemaElement::EnumValue { type_name, value } => write!(f, "{}.{}", type_name, value),
        }
    }
}

/// Fusion metadata of a schema, kept next to the document instead of inside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    entries: BTreeMap<SchemaElement, Vec<FusionDirective>>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, element: &SchemaElement) -> &[FusionDirective] {
        self.entries
            .get(element)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Adds a tag to an element. Identical tags are stored once.
    pub fn push(&mut self, element: SchemaElement, directive: impl Into<FusionDirective>) {
        let directive = directive.into();
        let tags = self.entries.entry(element).or_default();

        if !tags.contains(&directive) {
            tags.push(directive);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SchemaElement, &Vec<FusionDirective>)> {
        self.entries.iter()
    }

    pub fn sources<'a>(
        &'a self,
        element: &SchemaElement,
    ) -> impl Iterator<Item = &'a SourceDirective> + 'a {
        self.get(element).iter().filter_map(|tag| match tag {
            FusionDirective::Source(source) => Some(source),
            _ => None,
        })
    }

    pub fn resolvers<'a>(
        &'a self,
        element: &SchemaElement,
    ) -> impl Iterator<Item = &'a ResolverDirective> + 'a {
        self.get(element).iter().filter_map(|tag| match tag {
            FusionDirective::Resolver(resolver) => Some(resolver),
            _ => None,
        })
    }

    pub fn variables<'a>(
        &'a self,
        element: &SchemaElement,
    ) -> impl Iterator<Item = &'a VariableDirective> + 'a {
        self.get(element).iter().filter_map(|tag| match tag {
            FusionDirective::Variable(variable) => Some(variable),
            _ => None,
        })
    }

    pub fn transports(&self) -> impl Iterator<Item = &TransportDirective> {
        self.get(&SchemaElement::Schema)
            .iter()
            .filter_map(|tag| match tag {
                FusionDirective::Transport(transport) => Some(transport),
                _ => None,
            })
    }

    /// Source tag of an element for one subgraph.
    pub fn source_in(&self, element: &SchemaElement, subgraph: &str) -> Option<&SourceDirective> {
        self.sources(element).find(|source| source.subgraph == subgraph)
    }

    pub fn has_sources(&self, element: &SchemaElement) -> bool {
        self.sources(element).next().is_some()
    }

    /// Moves every entry of a type (the type itself, its fields and enum values) to a new name.
    pub fn rename_type(&mut self, from: &str, to: &str) {
        let moved = self
            .entries
            .keys()
            .filter(|element| element.type_name() == Some(from))
            .cloned()
            .collect::<Vec<_>>();

        for element in moved {
            if let Some(tags) = self.entries.remove(&element) {
                let target = self.entries.entry(element.with_type_name(to)).or_default();
                for tag in tags {
                    if !target.contains(&tag) {
                        target.push(tag);
                    }
                }
            }
        }
    }

    pub fn rename_field(&mut self, type_name: &str, from: &str, to: &str) {
        if let Some(tags) = self
            .entries
            .remove(&SchemaElement::field(type_name, from))
        {
            self.entries
                .entry(SchemaElement::field(type_name, to))
                .or_default()
                .extend(tags);
        }
    }

    pub fn rename_enum_value(&mut self, type_name: &str, from: &str, to: &str) {
        if let Some(tags) = self
            .entries
            .remove(&SchemaElement::enum_value(type_name, from))
        {
            self.entries
                .entry(SchemaElement::enum_value(type_name, to))
                .or_default()
                .extend(tags);
        }
    }

    /// Keeps only the tags for which `keep` returns true. Elements left without tags are removed.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&SchemaElement, &FusionDirective) -> bool,
    {
        self.entries.retain(|element, tags| {
            tags.retain(|tag| keep(element, tag));
            !tags.is_empty()
        });
    }

    /// Concatenates another table into this one, skipping tags already present.
    pub fn merge(&mut self, other: MetadataTable) {
        for (element, tags) in other.entries {
            for tag in tags {
                self.push(element.clone(), tag);
            }
        }
    }
}
