use std::collections::{BTreeMap, BTreeSet};

use graphql_parser::schema::{
    Definition, Field, InputValue, ObjectType, SchemaDefinition, TypeDefinition,
};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::{
    ast::{parse_schema, Directive, OperationKind, SchemaDocument},
    error::SupergraphError,
    fusion_spec::{
        is_fusion_directive_name, is_fusion_type_name, FusionDirective, ResolverDirective,
        SourceDirective, VariableDirective, FUSION_DEFINITIONS,
    },
    metadata::{MetadataTable, SchemaElement},
};

/// Transport settings of one subgraph, as read from its `@transport` tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransportEntry {
    pub subgraph: String,
    pub kind: String,
    pub location: String,
    pub headers: BTreeMap<String, String>,
    pub options: Map<String, JsonValue>,
}

/// A composed schema: a clean document plus its fusion metadata.
///
/// The identity is a hash of the printed form, so two supergraphs that print the same
/// text share plans.
#[derive(Debug, Clone)]
pub struct Supergraph {
    document: SchemaDocument,
    metadata: MetadataTable,
    id: u64,
}

impl Supergraph {
    pub fn parse(sdl: &str) -> Result<Self, SupergraphError> {
        let document = parse_schema(sdl)?;
        let (document, metadata) = split_metadata(document);

        Ok(Self::from_parts(document, metadata))
    }

    pub fn from_parts(document: SchemaDocument, metadata: MetadataTable) -> Self {
        let printed = print_with_metadata(&document, &metadata);
        let id = xxh3_64(printed.as_bytes());
        debug!(id, "supergraph built");

        Self {
            document,
            metadata,
            id,
        }
    }

    pub fn into_parts(self) -> (SchemaDocument, MetadataTable) {
        (self.document, self.metadata)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn document(&self) -> &SchemaDocument {
        &self.document
    }

    pub fn metadata(&self) -> &MetadataTable {
        &self.metadata
    }

    /// Supergraph text: the fusion definitions followed by the schema with every tag attached.
    pub fn print(&self) -> String {
        print_with_metadata(&self.document, &self.metadata)
    }

    pub fn schema_definition(&self) -> Option<&SchemaDefinition<'static, String>> {
        self.document
            .definitions
            .iter()
            .find_map(|definition| match definition {
                Definition::SchemaDefinition(schema) => Some(schema),
                _ => None,
            })
    }

    /// Name of the root type for an operation kind, if the schema defines one.
    pub fn root_type_name(&self, kind: OperationKind) -> Option<&str> {
        if let Some(schema) = self.schema_definition() {
            let declared = match kind {
                OperationKind::Query => schema.query.as_deref(),
                OperationKind::Mutation => schema.mutation.as_deref(),
                OperationKind::Subscription => schema.subscription.as_deref(),
            };

            if declared.is_some() {
                return declared;
            }
        }

        let name = kind.root_type_name();
        self.type_definition(name).map(|_| name)
    }

    pub fn is_root_type(&self, type_name: &str) -> bool {
        [
            OperationKind::Query,
            OperationKind::Mutation,
            OperationKind::Subscription,
        ]
        .iter()
        .any(|kind| self.root_type_name(*kind) == Some(type_name))
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition<'static, String>> {
        self.document
            .definitions
            .iter()
            .find_map(|definition| match definition {
                Definition::TypeDefinition(type_def) if type_def_name(type_def) == name => {
                    Some(type_def)
                }
                _ => None,
            })
    }

    /// Output fields of an object or interface type.
    pub fn fields_of(&self, type_name: &str) -> Option<&[Field<'static, String>]> {
        match self.type_definition(type_name)? {
            TypeDefinition::Object(object) => Some(&object.fields),
            TypeDefinition::Interface(interface) => Some(&interface.fields),
            _ => None,
        }
    }

    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&Field<'static, String>> {
        self.fields_of(type_name)?
            .iter()
            .find(|field| field.name == field_name)
    }

    pub fn field_argument(
        &self,
        type_name: &str,
        field_name: &str,
        argument_name: &str,
    ) -> Option<&InputValue<'static, String>> {
        self.field(type_name, field_name)?
            .arguments
            .iter()
            .find(|argument| argument.name == argument_name)
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType<'static, String>> {
        match self.type_definition(name)? {
            TypeDefinition::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn sources<'a>(
        &'a self,
        element: &SchemaElement,
    ) -> impl Iterator<Item = &'a SourceDirective> + 'a {
        self.metadata.sources(element)
    }

    pub fn resolvers<'a>(
        &'a self,
        element: &SchemaElement,
    ) -> impl Iterator<Item = &'a ResolverDirective> + 'a {
        self.metadata.resolvers(element)
    }

    pub fn variables<'a>(
        &'a self,
        element: &SchemaElement,
    ) -> impl Iterator<Item = &'a VariableDirective> + 'a {
        self.metadata.variables(element)
    }

    /// Every subgraph mentioned by any tag.
    pub fn subgraph_names(&self) -> BTreeSet<String> {
        self.metadata
            .iter()
            .flat_map(|(_, tags)| tags.iter().map(|tag| tag.subgraph().to_string()))
            .collect()
    }

    pub fn transport_entries(&self) -> BTreeMap<String, TransportEntry> {
        self.metadata
            .transports()
            .map(|transport| {
                (
                    transport.subgraph.clone(),
                    TransportEntry {
                        subgraph: transport.subgraph.clone(),
                        kind: transport.kind.clone(),
                        location: transport.location.clone(),
                        headers: transport.headers.clone(),
                        options: transport.options.clone(),
                    },
                )
            })
            .collect()
    }
}

pub fn type_def_name<'a>(type_def: &'a TypeDefinition<'static, String>) -> &'a str {
    match type_def {
        TypeDefinition::Scalar(scalar) => &scalar.name,
        TypeDefinition::Object(object) => &object.name,
        TypeDefinition::Interface(interface) => &interface.name,
        TypeDefinition::Union(union) => &union.name,
        TypeDefinition::Enum(enum_type) => &enum_type.name,
        TypeDefinition::InputObject(input) => &input.name,
    }
}

fn take_fusion_directives(
    directives: &mut Vec<Directive>,
    element: SchemaElement,
    metadata: &mut MetadataTable,
) {
    directives.retain(|directive| match FusionDirective::from_directive(directive) {
        Some(tag) => {
            metadata.push(element.clone(), tag);
            false
        }
        None => true,
    });
}

/// Moves every fusion directive of a document into a side table and drops the fusion
/// definitions themselves.
pub fn split_metadata(document: SchemaDocument) -> (SchemaDocument, MetadataTable) {
    let mut metadata = MetadataTable::new();
    let mut definitions = Vec::with_capacity(document.definitions.len());

    for mut definition in document.definitions {
        match &mut definition {
            Definition::DirectiveDefinition(directive) if is_fusion_directive_name(&directive.name) => {
                continue;
            }
            Definition::TypeDefinition(type_def) if is_fusion_type_name(type_def_name(type_def)) => {
                continue;
            }
            Definition::SchemaDefinition(schema) => {
                take_fusion_directives(&mut schema.directives, SchemaElement::Schema, &mut metadata);
            }
            Definition::TypeDefinition(type_def) => {
                split_type_metadata(type_def, &mut metadata);
            }
            Definition::TypeExtension(_) => {
                warn!("type extensions are kept as-is and never carry fusion metadata");
            }
            Definition::DirectiveDefinition(_) => {}
        }

        definitions.push(definition);
    }

    (SchemaDocument { definitions }, metadata)
}

fn split_type_metadata(type_def: &mut TypeDefinition<'static, String>, metadata: &mut MetadataTable) {
    let type_name = type_def_name(type_def).to_string();

    match type_def {
        TypeDefinition::Scalar(scalar) => {
            take_fusion_directives(&mut scalar.directives, SchemaElement::type_(&type_name), metadata);
        }
        TypeDefinition::Object(object) => {
            take_fusion_directives(&mut object.directives, SchemaElement::type_(&type_name), metadata);
            for field in object.fields.iter_mut() {
                let element = SchemaElement::field(&type_name, &field.name);
                take_fusion_directives(&mut field.directives, element, metadata);
            }
        }
        TypeDefinition::Interface(interface) => {
            take_fusion_directives(
                &mut interface.directives,
                SchemaElement::type_(&type_name),
                metadata,
            );
            for field in interface.fields.iter_mut() {
                let element = SchemaElement::field(&type_name, &field.name);
                take_fusion_directives(&mut field.directives, element, metadata);
            }
        }
        TypeDefinition::Union(union) => {
            take_fusion_directives(&mut union.directives, SchemaElement::type_(&type_name), metadata);
        }
        TypeDefinition::Enum(enum_type) => {
            take_fusion_directives(
                &mut enum_type.directives,
                SchemaElement::type_(&type_name),
                metadata,
            );
            for value in enum_type.values.iter_mut() {
                let element = SchemaElement::enum_value(&type_name, &value.name);
                take_fusion_directives(&mut value.directives, element, metadata);
            }
        }
        TypeDefinition::InputObject(input) => {
            take_fusion_directives(&mut input.directives, SchemaElement::type_(&type_name), metadata);
            for field in input.fields.iter_mut() {
                let element = SchemaElement::field(&type_name, &field.name);
                take_fusion_directives(&mut field.directives, element, metadata);
            }
        }
    }
}

fn attach(directives: &mut Vec<Directive>, tags: &[FusionDirective]) {
    directives.extend(tags.iter().map(FusionDirective::to_directive));
}

/// Inverse of [`split_metadata`]: returns a document with every tag written back as a directive.
pub fn attach_metadata(document: &SchemaDocument, metadata: &MetadataTable) -> SchemaDocument {
    let mut document = document.clone();
    let schema_tags = metadata.get(&SchemaElement::Schema);

    for definition in document.definitions.iter_mut() {
        match definition {
            Definition::SchemaDefinition(schema) => attach(&mut schema.directives, schema_tags),
            Definition::TypeDefinition(type_def) => {
                let type_name = type_def_name(type_def).to_string();
                let type_tags = metadata.get(&SchemaElement::type_(&type_name));

                match type_def {
                    TypeDefinition::Scalar(scalar) => attach(&mut scalar.directives, type_tags),
                    TypeDefinition::Object(object) => {
                        attach(&mut object.directives, type_tags);
                        for field in object.fields.iter_mut() {
                            attach(
                                &mut field.directives,
                                metadata.get(&SchemaElement::field(&type_name, &field.name)),
                            );
                        }
                    }
                    TypeDefinition::Interface(interface) => {
                        attach(&mut interface.directives, type_tags);
                        for field in interface.fields.iter_mut() {
                            attach(
                                &mut field.directives,
                                metadata.get(&SchemaElement::field(&type_name, &field.name)),
                            );
                        }
                    }
                    TypeDefinition::Union(union) => attach(&mut union.directives, type_tags),
                    TypeDefinition::Enum(enum_type) => {
                        attach(&mut enum_type.directives, type_tags);
                        for value in enum_type.values.iter_mut() {
                            attach(
                                &mut value.directives,
                                metadata.get(&SchemaElement::enum_value(&type_name, &value.name)),
                            );
                        }
                    }
                    TypeDefinition::InputObject(input) => {
                        attach(&mut input.directives, type_tags);
                        for field in input.fields.iter_mut() {
                            attach(
                                &mut field.directives,
                                metadata.get(&SchemaElement::field(&type_name, &field.name)),
                            );
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let has_schema_definition = document
        .definitions
        .iter()
        .any(|definition| matches!(definition, Definition::SchemaDefinition(_)));

    if !schema_tags.is_empty() && !has_schema_definition {
        let mut schema = root_schema_definition(&document);
        attach(&mut schema.directives, schema_tags);
        document
            .definitions
            .insert(0, Definition::SchemaDefinition(schema));
    }

    document
}

/// A schema definition naming whichever canonical root types the document declares.
pub fn root_schema_definition(document: &SchemaDocument) -> SchemaDefinition<'static, String> {
    let has_type = |name: &str| {
        document.definitions.iter().any(|definition| {
            matches!(definition, Definition::TypeDefinition(type_def) if type_def_name(type_def) == name)
        })
    };
    let root = |kind: OperationKind| {
        let name = kind.root_type_name();
        has_type(name).then(|| name.to_string())
    };

    SchemaDefinition {
        position: Default::default(),
        directives: vec![],
        query: root(OperationKind::Query).or_else(|| Some("Query".to_string())),
        mutation: root(OperationKind::Mutation),
        subscription: root(OperationKind::Subscription),
    }
}

fn print_with_metadata(document: &SchemaDocument, metadata: &MetadataTable) -> String {
    format!(
        "{}\n{}",
        FUSION_DEFINITIONS,
        attach_metadata(document, metadata)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion_spec::{ResolverKind, TransportDirective};

    const SUPERGRAPH: &str = r#"
schema @transport(subgraph: "a", kind: "http", location: "http://a/graphql", headers: {authorization: "token"}, options: {timeout: 1000}) {
  query: Query
}

type Query {
  user(id: ID!): User @source(subgraph: "a", name: "user") @resolver(subgraph: "a", operation: "query user($id: ID!) { user(id: $id) }")
}

type User @source(subgraph: "a", name: "User") @source(subgraph: "b", name: "Account") @resolver(subgraph: "b", operation: "query UserById($User_id: ID!) { account(id: $User_id) }", kind: BATCH) {
  id: ID! @source(subgraph: "a", name: "id") @source(subgraph: "b", name: "id") @variable(subgraph: "a", name: "User_id", select: "id")
  name: String @source(subgraph: "b", name: "name")
}
"#;

    #[test]
    fn parse_moves_tags_into_metadata() {
        let supergraph = Supergraph::parse(SUPERGRAPH).unwrap();

        let user = SchemaElement::type_("User");
        let sources = supergraph.sources(&user).collect::<Vec<_>>();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].name, "Account");

        let resolver = supergraph.resolvers(&user).next().unwrap();
        assert_eq!(resolver.kind, ResolverKind::Batch);
        assert_eq!(resolver.subgraph, "b");

        let variable = supergraph
            .variables(&SchemaElement::field("User", "id"))
            .next()
            .unwrap();
        assert_eq!(variable.select, "id");

        let printed_document = supergraph.document().to_string();
        assert!(!printed_document.contains("@source"));
        assert!(!printed_document.contains("@transport"));
    }

    #[test]
    fn print_and_parse_keep_metadata() {
        let supergraph = Supergraph::parse(SUPERGRAPH).unwrap();
        let reparsed = Supergraph::parse(&supergraph.print()).unwrap();

        assert_eq!(reparsed.metadata(), supergraph.metadata());
        assert_eq!(reparsed.id(), supergraph.id());
        assert_eq!(reparsed.print(), supergraph.print());
    }

    #[test]
    fn transport_entries_are_keyed_by_subgraph() {
        let supergraph = Supergraph::parse(SUPERGRAPH).unwrap();
        let entries = supergraph.transport_entries();
        let entry = entries.get("a").unwrap();

        assert_eq!(entry.kind, "http");
        assert_eq!(entry.location, "http://a/graphql");
        assert_eq!(entry.headers.get("authorization").unwrap(), "token");
        assert_eq!(entry.options.get("timeout").unwrap(), 1000);
    }

    #[test]
    fn schema_definition_is_created_for_transports() {
        let document = parse_schema("type Query { a: String }").unwrap();
        let mut metadata = MetadataTable::new();
        metadata.push(
            SchemaElement::Schema,
            TransportDirective {
                subgraph: "a".to_string(),
                kind: "http".to_string(),
                location: "http://a".to_string(),
                ..Default::default()
            },
        );

        let supergraph = Supergraph::from_parts(document, metadata);
        let reparsed = Supergraph::parse(&supergraph.print()).unwrap();

        assert_eq!(reparsed.transport_entries().len(), 1);
        assert_eq!(reparsed.root_type_name(OperationKind::Query), Some("Query"));
        assert_eq!(reparsed.root_type_name(OperationKind::Mutation), None);
    }

    #[test]
    fn subgraph_names_cover_all_tags() {
        let supergraph = Supergraph::parse(SUPERGRAPH).unwrap();
        let names = supergraph.subgraph_names().into_iter().collect::<Vec<_>>();

        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
