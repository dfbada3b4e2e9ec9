use fusion_query_planner::flatten::FlattenedField;
use fusion_supergraph::{
    ast::{is_builtin_scalar, GraphQLType, SchemaDocument},
    supergraph::type_def_name,
    Supergraph,
};
use graphql_parser::schema::{
    Definition, Directive, DirectiveDefinition, EnumValue, Field, InputValue, TypeDefinition,
};
use serde_json::{Map, Value};

use crate::{introspection::builtins::builtin_definitions, variables::resolve_value};

pub struct IntrospectionContext<'exec> {
    pub supergraph: &'exec Supergraph,
    /// Operation variables, for arguments such as `__type(name: $name)`.
    pub variables: &'exec Map<String, Value>,
    builtins: SchemaDocument,
}

impl<'exec> IntrospectionContext<'exec> {
    pub fn new(supergraph: &'exec Supergraph, variables: &'exec Map<String, Value>) -> Self {
        Self {
            supergraph,
            variables,
            builtins: builtin_definitions(),
        }
    }

    fn type_by_name(&self, name: &str) -> Option<&TypeDefinition<'static, String>> {
        self.supergraph.type_definition(name).or_else(|| {
            self.builtins
                .definitions
                .iter()
                .find_map(|definition| match definition {
                    Definition::TypeDefinition(type_def) if type_def_name(type_def) == name => {
                        Some(type_def)
                    }
                    _ => None,
                })
        })
    }

    fn types(&self) -> Vec<&TypeDefinition<'static, String>> {
        let mut types = type_definitions(self.supergraph.document()).collect::<Vec<_>>();
        for builtin in type_definitions(&self.builtins) {
            if self.supergraph.type_definition(type_def_name(builtin)).is_none() {
                types.push(builtin);
            }
        }
        types
    }

    fn directives(&self) -> Vec<&DirectiveDefinition<'static, String>> {
        let mut directives = directive_definitions(self.supergraph.document()).collect::<Vec<_>>();
        for builtin in directive_definitions(&self.builtins) {
            if !directives.iter().any(|d| d.name == builtin.name) {
                directives.push(builtin);
            }
        }
        directives
    }

    fn argument(&self, field: &FlattenedField, name: &str) -> Value {
        field
            .arguments
            .iter()
            .find(|(arg_name, _)| arg_name == name)
            .map_or(Value::Null, |(_, value)| resolve_value(value, self.variables))
    }

    fn include_deprecated(&self, field: &FlattenedField) -> bool {
        self.argument(field, "includeDeprecated")
            .as_bool()
            .unwrap_or(false)
    }
}

fn type_definitions(
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

fn directive_definitions(
    document: &SchemaDocument,
) -> impl Iterator<Item = &DirectiveDefinition<'static, String>> {
    document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::DirectiveDefinition(directive) => Some(directive),
            _ => None,
        })
}

fn get_deprecation_reason<'a>(directives: &'a [Directive<'static, String>]) -> Option<&'a str> {
    directives
        .iter()
        .find(|d| d.name == "deprecated")
        .map(|d| {
            d.arguments
                .iter()
                .find(|(name, _)| name.as_str() == "reason")
                .and_then(|(_, value)| match value {
                    graphql_parser::query::Value::String(s) => Some(s.as_str()),
                    _ => None,
                })
                .unwrap_or("No longer supported")
        })
}

fn is_deprecated(directives: &[Directive<'static, String>]) -> bool {
    directives.iter().any(|d| d.name == "deprecated")
}

fn optional_string(value: Option<&String>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.clone()))
}

fn kind_to_str(type_def: &TypeDefinition<'static, String>) -> &'static str {
    match type_def {
        TypeDefinition::Scalar(_) => "SCALAR",
        TypeDefinition::Object(_) => "OBJECT",
        TypeDefinition::Interface(_) => "INTERFACE",
        TypeDefinition::Union(_) => "UNION",
        TypeDefinition::Enum(_) => "ENUM",
        TypeDefinition::InputObject(_) => "INPUT_OBJECT",
    }
}

fn description_of<'a>(type_def: &'a TypeDefinition<'static, String>) -> Option<&'a String> {
    match type_def {
        TypeDefinition::Scalar(s) => s.description.as_ref(),
        TypeDefinition::Object(o) => o.description.as_ref(),
        TypeDefinition::Interface(i) => i.description.as_ref(),
        TypeDefinition::Union(u) => u.description.as_ref(),
        TypeDefinition::Enum(e) => e.description.as_ref(),
        TypeDefinition::InputObject(io) => io.description.as_ref(),
    }
}

fn resolve_input_value(
    iv: &InputValue<'static, String>,
    selections: &[FlattenedField],
    ctx: &IntrospectionContext,
) -> Value {
    let mut iv_data = Map::with_capacity(selections.len());
    for field in selections {
        let value = match field.name.as_str() {
            "name" => Value::String(iv.name.clone()),
            "description" => optional_string(iv.description.as_ref()),
            "type" => resolve_type(&iv.value_type, &field.selections, ctx),
            "defaultValue" => iv
                .default_value
                .as_ref()
                .map_or(Value::Null, |v| Value::String(v.to_string())),
            "isDeprecated" => Value::Bool(is_deprecated(&iv.directives)),
            "deprecationReason" => get_deprecation_reason(&iv.directives)
                .map_or(Value::Null, |s| Value::String(s.to_string())),
            "__typename" => Value::String("__InputValue".into()),
            _ => Value::Null,
        };
        iv_data.insert(field.response_key().to_string(), value);
    }
    Value::Object(iv_data)
}

fn resolve_field(
    f: &Field<'static, String>,
    selections: &[FlattenedField],
    ctx: &IntrospectionContext,
) -> Value {
    let mut field_data = Map::with_capacity(selections.len());
    for field in selections {
        let value = match field.name.as_str() {
            "name" => Value::String(f.name.clone()),
            "description" => optional_string(f.description.as_ref()),
            "args" => Value::Array(
                f.arguments
                    .iter()
                    .map(|arg| resolve_input_value(arg, &field.selections, ctx))
                    .collect(),
            ),
            "type" => resolve_type(&f.field_type, &field.selections, ctx),
            "isDeprecated" => Value::Bool(is_deprecated(&f.directives)),
            "deprecationReason" => get_deprecation_reason(&f.directives)
                .map_or(Value::Null, |s| Value::String(s.to_string())),
            "__typename" => Value::String("__Field".into()),
            _ => Value::Null,
        };
        field_data.insert(field.response_key().to_string(), value);
    }
    Value::Object(field_data)
}

fn resolve_enum_value(ev: &EnumValue<'static, String>, selections: &[FlattenedField]) -> Value {
    let mut ev_data = Map::with_capacity(selections.len());
    for field in selections {
        let value = match field.name.as_str() {
            "name" => Value::String(ev.name.clone()),
            "description" => optional_string(ev.description.as_ref()),
            "isDeprecated" => Value::Bool(is_deprecated(&ev.directives)),
            "deprecationReason" => get_deprecation_reason(&ev.directives)
                .map_or(Value::Null, |s| Value::String(s.to_string())),
            "__typename" => Value::String("__EnumValue".into()),
            _ => Value::Null,
        };
        ev_data.insert(field.response_key().to_string(), value);
    }
    Value::Object(ev_data)
}

fn possible_types<'a>(
    type_def: &TypeDefinition<'static, String>,
    ctx: &'a IntrospectionContext,
) -> Option<Vec<&'a TypeDefinition<'static, String>>> {
    match type_def {
        TypeDefinition::Union(union) => Some(
            union
                .types
                .iter()
                .filter_map(|member| ctx.type_by_name(member))
                .collect(),
        ),
        TypeDefinition::Interface(interface) => Some(
            ctx.types()
                .into_iter()
                .filter(|candidate| match candidate {
                    TypeDefinition::Object(object) => {
                        object.implements_interfaces.contains(&interface.name)
                    }
                    _ => false,
                })
                .collect(),
        ),
        _ => None,
    }
}

fn resolve_type_definition(
    type_def: &TypeDefinition<'static, String>,
    selections: &[FlattenedField],
    ctx: &IntrospectionContext,
) -> Value {
    let mut type_data = Map::with_capacity(selections.len());

    for field in selections {
        let value = match field.name.as_str() {
            "kind" => Value::String(kind_to_str(type_def).into()),
            "name" => Value::String(type_def_name(type_def).to_string()),
            "description" => optional_string(description_of(type_def)),
            "fields" => {
                let fields = match type_def {
                    TypeDefinition::Object(o) => Some(&o.fields),
                    TypeDefinition::Interface(i) => Some(&i.fields),
                    _ => None,
                };
                match fields {
                    Some(fields) => {
                        let include_deprecated = ctx.include_deprecated(field);
                        Value::Array(
                            fields
                                .iter()
                                .filter(|f| {
                                    !f.name.starts_with("__")
                                        && (include_deprecated || !is_deprecated(&f.directives))
                                })
                                .map(|f| resolve_field(f, &field.selections, ctx))
                                .collect(),
                        )
                    }
                    None => Value::Null,
                }
            }
            "interfaces" => {
                let interfaces = match type_def {
                    TypeDefinition::Object(o) => Some(&o.implements_interfaces),
                    TypeDefinition::Interface(i) => Some(&i.implements_interfaces),
                    _ => None,
                };
                match interfaces {
                    Some(interfaces) => Value::Array(
                        interfaces
                            .iter()
                            .filter_map(|name| ctx.type_by_name(name))
                            .map(|t| resolve_type_definition(t, &field.selections, ctx))
                            .collect(),
                    ),
                    None => Value::Null,
                }
            }
            "possibleTypes" => match possible_types(type_def, ctx) {
                Some(types) => Value::Array(
                    types
                        .into_iter()
                        .map(|t| resolve_type_definition(t, &field.selections, ctx))
                        .collect(),
                ),
                None => Value::Null,
            },
            "enumValues" => match type_def {
                TypeDefinition::Enum(enum_type) => {
                    let include_deprecated = ctx.include_deprecated(field);
                    Value::Array(
                        enum_type
                            .values
                            .iter()
                            .filter(|v| include_deprecated || !is_deprecated(&v.directives))
                            .map(|v| resolve_enum_value(v, &field.selections))
                            .collect(),
                    )
                }
                _ => Value::Null,
            },
            "inputFields" => match type_def {
                TypeDefinition::InputObject(io) => Value::Array(
                    io.fields
                        .iter()
                        .map(|f| resolve_input_value(f, &field.selections, ctx))
                        .collect(),
                ),
                _ => Value::Null,
            },
            "ofType" => Value::Null,
            "__typename" => Value::String("__Type".into()),
            _ => Value::Null,
        };
        type_data.insert(field.response_key().to_string(), value);
    }

    Value::Object(type_data)
}

fn resolve_wrapper_type(
    kind: &str,
    inner_type: &GraphQLType,
    selections: &[FlattenedField],
    ctx: &IntrospectionContext,
) -> Value {
    let mut type_data = Map::with_capacity(selections.len());
    for field in selections {
        let value = match field.name.as_str() {
            "kind" => Value::String(kind.into()),
            "ofType" => resolve_type(inner_type, &field.selections, ctx),
            "__typename" => Value::String("__Type".into()),
            _ => Value::Null,
        };
        type_data.insert(field.response_key().to_string(), value);
    }
    Value::Object(type_data)
}

fn resolve_type(t: &GraphQLType, selections: &[FlattenedField], ctx: &IntrospectionContext) -> Value {
    match t {
        GraphQLType::NamedType(name) => ctx
            .type_by_name(name)
            .map_or(Value::Null, |type_def| {
                resolve_type_definition(type_def, selections, ctx)
            }),
        GraphQLType::ListType(inner_t) => resolve_wrapper_type("LIST", inner_t, selections, ctx),
        GraphQLType::NonNullType(inner_t) => {
            resolve_wrapper_type("NON_NULL", inner_t, selections, ctx)
        }
    }
}

fn resolve_directive(
    d: &DirectiveDefinition<'static, String>,
    selections: &[FlattenedField],
    ctx: &IntrospectionContext,
) -> Value {
    let mut directive_data = Map::with_capacity(selections.len());
    for field in selections {
        let value = match field.name.as_str() {
            "name" => Value::String(d.name.clone()),
            "description" => optional_string(d.description.as_ref()),
            "locations" => Value::Array(
                d.locations
                    .iter()
                    .map(|l| Value::String(l.as_str().into()))
                    .collect(),
            ),
            "args" => Value::Array(
                d.arguments
                    .iter()
                    .map(|arg| resolve_input_value(arg, &field.selections, ctx))
                    .collect(),
            ),
            "isRepeatable" => Value::Bool(d.repeatable),
            "__typename" => Value::String("__Directive".into()),
            _ => Value::Null,
        };
        directive_data.insert(field.response_key().to_string(), value);
    }
    Value::Object(directive_data)
}

fn resolve_root_type(
    kind: fusion_supergraph::ast::OperationKind,
    selections: &[FlattenedField],
    ctx: &IntrospectionContext,
) -> Value {
    ctx.supergraph
        .root_type_name(kind)
        .and_then(|name| ctx.type_by_name(name))
        .map_or(Value::Null, |t| resolve_type_definition(t, selections, ctx))
}

fn resolve_schema_field(field: &FlattenedField, ctx: &IntrospectionContext) -> Value {
    use fusion_supergraph::ast::OperationKind;

    let mut schema_data = Map::with_capacity(field.selections.len());

    for inner_field in &field.selections {
        let value = match inner_field.name.as_str() {
            "description" => Value::Null,
            "types" => Value::Array(
                ctx.types()
                    .into_iter()
                    .map(|t| resolve_type_definition(t, &inner_field.selections, ctx))
                    .collect(),
            ),
            "queryType" => resolve_root_type(OperationKind::Query, &inner_field.selections, ctx),
            "mutationType" => {
                resolve_root_type(OperationKind::Mutation, &inner_field.selections, ctx)
            }
            "subscriptionType" => {
                resolve_root_type(OperationKind::Subscription, &inner_field.selections, ctx)
            }
            "directives" => Value::Array(
                ctx.directives()
                    .into_iter()
                    .map(|d| resolve_directive(d, &inner_field.selections, ctx))
                    .collect(),
            ),
            "__typename" => Value::String("__Schema".into()),
            _ => Value::Null,
        };
        schema_data.insert(inner_field.response_key().to_string(), value);
    }

    Value::Object(schema_data)
}

/// Value of one root meta field: `__typename`, `__schema` or `__type(name:)`.
pub fn resolve_meta_field(
    field: &FlattenedField,
    root_type_name: &str,
    ctx: &IntrospectionContext,
) -> Value {
    match field.name.as_str() {
        "__schema" => resolve_schema_field(field, ctx),
        "__type" => match ctx.argument(field, "name") {
            Value::String(type_name) => ctx
                .type_by_name(&type_name)
                .map_or(Value::Null, |t| resolve_type_definition(t, &field.selections, ctx)),
            _ => Value::Null,
        },
        "__typename" => Value::String(root_type_name.to_string()),
        _ => Value::Null,
    }
}

/// Answers a root selection made only of meta fields.
pub fn resolve_introspection(
    fields: &[FlattenedField],
    root_type_name: &str,
    ctx: &IntrospectionContext,
) -> Value {
    let mut data = Map::with_capacity(fields.len());
    for field in fields {
        data.insert(
            field.response_key().to_string(),
            resolve_meta_field(field, root_type_name, ctx),
        );
    }
    Value::Object(data)
}

pub fn is_introspection_only(fields: &[FlattenedField]) -> bool {
    !fields.is_empty() && fields.iter().all(FlattenedField::is_meta_field)
}

#[cfg(test)]
mod tests {
    use fusion_query_planner::flatten::{flatten_selection_set, fragments_of};
    use fusion_supergraph::ast::parse_operation;
    use graphql_parser::query::{Definition as QueryDefinition, OperationDefinition};
    use serde_json::json;

    use super::*;

    const SCHEMA: &str = r#"
        type Query {
          "Looks a user up"
          user(id: ID!): User
          users(first: Int = 10): [User!]!
        }

        interface Node { id: ID! }

        type User implements Node {
          id: ID!
          name: String
          nickname: String @deprecated(reason: "Use name")
          role: Role
        }

        enum Role { ADMIN GUEST @deprecated }
    "#;

    fn root_fields(operation: &str) -> Vec<FlattenedField> {
        let document = parse_operation(operation).unwrap();
        let fragments = fragments_of(&document);
        let selection_set = document
            .definitions
            .iter()
            .find_map(|definition| match definition {
                QueryDefinition::Operation(OperationDefinition::Query(query)) => {
                    Some(&query.selection_set)
                }
                QueryDefinition::Operation(OperationDefinition::SelectionSet(set)) => Some(set),
                _ => None,
            })
            .unwrap();
        flatten_selection_set(selection_set, &fragments).unwrap()
    }

    fn introspect(operation: &str, variables: Map<String, Value>) -> Value {
        let supergraph = Supergraph::parse(SCHEMA).unwrap();
        let ctx = IntrospectionContext::new(&supergraph, &variables);
        resolve_introspection(&root_fields(operation), "Query", &ctx)
    }

    #[test]
    fn resolves_type_with_wrappers_and_deprecations() {
        let data = introspect(
            r#"query ($name: String!) {
              __typename
              user: __type(name: $name) {
                kind
                name
                interfaces { name }
                fields { name type { kind ofType { kind name } } }
                all: fields(includeDeprecated: true) { name isDeprecated deprecationReason }
              }
            }"#,
            json!({ "name": "User" }).as_object().cloned().unwrap(),
        );

        assert_eq!(
            data,
            json!({
                "__typename": "Query",
                "user": {
                    "kind": "OBJECT",
                    "name": "User",
                    "interfaces": [{ "name": "Node" }],
                    "fields": [
                        { "name": "id", "type": { "kind": "NON_NULL", "ofType": { "kind": "SCALAR", "name": "ID" } } },
                        { "name": "name", "type": { "kind": "SCALAR", "ofType": null } },
                        { "name": "role", "type": { "kind": "ENUM", "ofType": null } }
                    ],
                    "all": [
                        { "name": "id", "isDeprecated": false, "deprecationReason": null },
                        { "name": "name", "isDeprecated": false, "deprecationReason": null },
                        { "name": "nickname", "isDeprecated": true, "deprecationReason": "Use name" },
                        { "name": "role", "isDeprecated": false, "deprecationReason": null }
                    ]
                }
            })
        );
    }

    #[test]
    fn resolves_schema_roots_and_builtins() {
        let data = introspect(
            r#"{
              __schema {
                queryType { name fields { name args { name defaultValue } } }
                mutationType { name }
                directives { name }
              }
              node: __type(name: "Node") { possibleTypes { name } }
              role: __type(name: "Role") { enumValues { name } }
              string: __type(name: "String") { kind }
              missing: __type(name: "Missing") { kind }
            }"#,
            Map::new(),
        );

        assert_eq!(
            data,
            json!({
                "__schema": {
                    "queryType": {
                        "name": "Query",
                        "fields": [
                            { "name": "user", "args": [{ "name": "id", "defaultValue": null }] },
                            { "name": "users", "args": [{ "name": "first", "defaultValue": "10" }] }
                        ]
                    },
                    "mutationType": null,
                    "directives": [
                        { "name": "include" },
                        { "name": "skip" },
                        { "name": "deprecated" }
                    ]
                },
                "node": { "possibleTypes": [{ "name": "User" }] },
                "role": { "enumValues": [{ "name": "ADMIN" }] },
                "string": { "kind": "SCALAR" },
                "missing": null
            })
        );
    }

    #[test]
    fn detects_meta_only_selections() {
        assert!(is_introspection_only(&root_fields("{ __typename __schema { description } }")));
        assert!(!is_introspection_only(&root_fields("{ __typename user(id: 1) { id } }")));
        assert!(!is_introspection_only(&[]));
    }
}
