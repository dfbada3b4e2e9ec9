use std::collections::HashMap;

use fusion_supergraph::ast::{GraphQLValue, QueryDocument};
use graphql_parser::query::{self, Definition, FragmentDefinition, Selection, SelectionSet};
use serde::Serialize;

use crate::error::PlanningError;

/// A field of a selection tree with every fragment inlined.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedField {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<(String, GraphQLValue)>,
    pub selections: Vec<FlattenedField>,
}

impl FlattenedField {
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_meta_field(&self) -> bool {
        self.name.starts_with("__")
    }
}

impl Serialize for FlattenedField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&to_field(self).to_string())
    }
}

pub type FragmentMap<'a> = HashMap<&'a str, &'a FragmentDefinition<'static, String>>;

pub fn fragments_of(document: &QueryDocument) -> FragmentMap<'_> {
    document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
            _ => None,
        })
        .collect()
}

/// Inlines fragment spreads and inline fragments, merging fields that share a response key.
/// Flattening an already flat tree returns it unchanged.
pub fn flatten_selection_set(
    selection_set: &SelectionSet<'static, String>,
    fragments: &FragmentMap<'_>,
) -> Result<Vec<FlattenedField>, PlanningError> {
    let mut active = vec![];
    let mut fields = vec![];
    collect(selection_set, fragments, &mut active, &mut fields)?;
    Ok(fields)
}

fn collect<'a>(
    selection_set: &'a SelectionSet<'static, String>,
    fragments: &FragmentMap<'a>,
    active: &mut Vec<&'a str>,
    into: &mut Vec<FlattenedField>,
) -> Result<(), PlanningError> {
    for selection in &selection_set.items {
        match selection {
            Selection::Field(field) => {
                let mut selections = vec![];
                collect(&field.selection_set, fragments, active, &mut selections)?;

                merge_field(
                    into,
                    FlattenedField {
                        alias: field.alias.clone(),
                        name: field.name.clone(),
                        arguments: field.arguments.clone(),
                        selections,
                    },
                );
            }
            Selection::InlineFragment(fragment) => {
                collect(&fragment.selection_set, fragments, active, into)?;
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.fragment_name.as_str();
                let fragment = fragments
                    .get(name)
                    .ok_or_else(|| PlanningError::UnknownFragment(name.to_string()))?;

                // A spread inside its own expansion adds nothing new.
                if active.contains(&name) {
                    continue;
                }

                active.push(name);
                collect(&fragment.selection_set, fragments, active, into)?;
                active.pop();
            }
        }
    }

    Ok(())
}

fn merge_field(into: &mut Vec<FlattenedField>, field: FlattenedField) {
    match into
        .iter_mut()
        .find(|existing| existing.response_key() == field.response_key())
    {
        Some(existing) => {
            for selection in field.selections {
                merge_field(&mut existing.selections, selection);
            }
        }
        None => into.push(field),
    }
}

pub fn to_field(field: &FlattenedField) -> query::Field<'static, String> {
    query::Field {
        position: Default::default(),
        alias: field.alias.clone(),
        name: field.name.clone(),
        arguments: field.arguments.clone(),
        directives: vec![],
        selection_set: to_selection_set(&field.selections),
    }
}

pub fn to_selection(field: &FlattenedField) -> Selection<'static, String> {
    Selection::Field(to_field(field))
}

pub fn to_selection_set(fields: &[FlattenedField]) -> SelectionSet<'static, String> {
    SelectionSet {
        span: Default::default(),
        items: fields.iter().map(to_selection).collect(),
    }
}
