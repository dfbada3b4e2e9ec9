use graphql_parser::{
    query::{self, Number},
    schema,
};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::SupergraphError;

pub type SchemaDocument = schema::Document<'static, String>;
pub type QueryDocument = query::Document<'static, String>;
pub type Directive = schema::Directive<'static, String>;
pub type GraphQLValue = query::Value<'static, String>;
pub type GraphQLType = schema::Type<'static, String>;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    /// Canonical root type name used in the supergraph.
    pub fn root_type_name(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        }
    }
}

pub const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}

pub fn parse_schema(sdl: &str) -> Result<SchemaDocument, SupergraphError> {
    graphql_parser::parse_schema::<String>(sdl)
        .map(|doc| doc.into_static())
        .map_err(|err| SupergraphError::SchemaParseError(err.to_string()))
}

pub fn parse_operation(operation: &str) -> Result<QueryDocument, SupergraphError> {
    graphql_parser::parse_query::<String>(operation)
        .map(|doc| doc.into_static())
        .map_err(|err| SupergraphError::OperationParseError(err.to_string()))
}

/// Name of the innermost named type, stripping list and non-null wrappers.
pub fn named_type(field_type: &GraphQLType) -> &str {
    match field_type {
        schema::Type::NamedType(name) => name,
        schema::Type::ListType(inner) => named_type(inner),
        schema::Type::NonNullType(inner) => named_type(inner),
    }
}

pub fn is_list_type(field_type: &GraphQLType) -> bool {
    match field_type {
        schema::Type::NamedType(_) => false,
        schema::Type::ListType(_) => true,
        schema::Type::NonNullType(inner) => is_list_type(inner),
    }
}

/// Returns the same type shape with every named type passed through `rename`.
pub fn map_named_type<F>(field_type: &GraphQLType, rename: &F) -> GraphQLType
where
    F: Fn(&str) -> Option<String>,
{
    match field_type {
        schema::Type::NamedType(name) => {
            schema::Type::NamedType(rename(name).unwrap_or_else(|| name.clone()))
        }
        schema::Type::ListType(inner) => schema::Type::ListType(Box::new(map_named_type(inner, rename))),
        schema::Type::NonNullType(inner) => {
            schema::Type::NonNullType(Box::new(map_named_type(inner, rename)))
        }
    }
}

pub fn directive_argument<'a>(directive: &'a Directive, name: &str) -> Option<&'a GraphQLValue> {
    directive
        .arguments
        .iter()
        .find(|(arg_name, _)| arg_name == name)
        .map(|(_, value)| value)
}

pub fn string_argument(directive: &Directive, name: &str) -> Option<String> {
    match directive_argument(directive, name)? {
        query::Value::String(value) | query::Value::Enum(value) => Some(value.clone()),
        _ => None,
    }
}

/// Converts a constant GraphQL literal to JSON. Variables have no constant value and become `null`.
pub fn value_to_json(value: &GraphQLValue) -> JsonValue {
    match value {
        query::Value::Variable(_) | query::Value::Null => JsonValue::Null,
        query::Value::Int(number) => number
            .as_i64()
            .map(JsonValue::from)
            .unwrap_or(JsonValue::Null),
        query::Value::Float(number) => serde_json::Number::from_f64(*number)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        query::Value::String(value) => JsonValue::String(value.clone()),
        query::Value::Boolean(value) => JsonValue::Bool(*value),
        query::Value::Enum(value) => JsonValue::String(value.clone()),
        query::Value::List(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        query::Value::Object(fields) => JsonValue::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), value_to_json(value)))
                .collect::<Map<_, _>>(),
        ),
    }
}

pub fn json_to_value(value: &JsonValue) -> GraphQLValue {
    match value {
        JsonValue::Null => query::Value::Null,
        JsonValue::Bool(value) => query::Value::Boolean(*value),
        JsonValue::Number(number) => match number.as_i64().and_then(|n| i32::try_from(n).ok()) {
            Some(int) => query::Value::Int(Number::from(int)),
            None => query::Value::Float(number.as_f64().unwrap_or_default()),
        },
        JsonValue::String(value) => query::Value::String(value.clone()),
        JsonValue::Array(items) => query::Value::List(items.iter().map(json_to_value).collect()),
        JsonValue::Object(fields) => query::Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), json_to_value(value)))
                .collect(),
        ),
    }
}

/// Collects the names of all variables referenced by a value, in order of appearance.
pub fn collect_variables(value: &GraphQLValue, into: &mut Vec<String>) {
    match value {
        query::Value::Variable(name) => {
            if !into.contains(name) {
                into.push(name.clone());
            }
        }
        query::Value::List(items) => items.iter().for_each(|item| collect_variables(item, into)),
        query::Value::Object(fields) => fields
            .values()
            .for_each(|value| collect_variables(value, into)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn named_type_strips_wrappers() {
        let doc = parse_schema("type Query { a: [[Int!]]! b: String }").unwrap();
        let schema::Definition::TypeDefinition(schema::TypeDefinition::Object(query)) =
            &doc.definitions[0]
        else {
            panic!("expected object type");
        };

        assert_eq!(named_type(&query.fields[0].field_type), "Int");
        assert!(is_list_type(&query.fields[0].field_type));
        assert_eq!(named_type(&query.fields[1].field_type), "String");
        assert!(!is_list_type(&query.fields[1].field_type));
    }

    #[test]
    fn literal_json_conversion() {
        let json = json!({ "a": [1, 2.5, "x", true, null], "b": { "c": "d" } });
        assert_eq!(value_to_json(&json_to_value(&json)), json);
    }

    #[test]
    fn operation_kind_names() {
        assert_eq!(OperationKind::Mutation.to_string(), "mutation");
        assert_eq!(OperationKind::Subscription.root_type_name(), "Subscription");
        assert_eq!("query".parse::<OperationKind>().unwrap(), OperationKind::Query);
    }
}
