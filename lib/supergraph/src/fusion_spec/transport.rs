use std::collections::BTreeMap;

use graphql_parser::query::Value;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::ast::{directive_argument, json_to_value, string_argument, value_to_json, Directive};

/// How the gateway reaches a subgraph. Attached to the schema definition, once per subgraph.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct TransportDirective {
    pub subgraph: String,
    pub kind: String,
    pub location: String,
    pub headers: BTreeMap<String, String>,
    pub options: Map<String, JsonValue>,
}

impl TransportDirective {
    pub const NAME: &str = "transport";

    pub fn is(directive: &Directive) -> bool {
        directive.name == Self::NAME
    }

    pub fn to_directive(&self) -> Directive {
        let mut arguments = vec![
            ("subgraph".to_string(), Value::String(self.subgraph.clone())),
            ("kind".to_string(), Value::String(self.kind.clone())),
            ("location".to_string(), Value::String(self.location.clone())),
        ];

        if !self.headers.is_empty() {
            arguments.push((
                "headers".to_string(),
                Value::Object(
                    self.headers
                        .iter()
                        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                        .collect(),
                ),
            ));
        }

        if !self.options.is_empty() {
            arguments.push((
                "options".to_string(),
                json_to_value(&JsonValue::Object(self.options.clone())),
            ));
        }

        Directive {
            position: Default::default(),
            name: Self::NAME.to_string(),
            arguments,
        }
    }
}

impl From<&Directive> for TransportDirective {
    fn from(directive: &Directive) -> Self {
        let headers = match directive_argument(directive, "headers").map(value_to_json) {
            Some(JsonValue::Object(headers)) => headers
                .into_iter()
                .filter_map(|(name, value)| match value {
                    JsonValue::String(value) => Some((name, value)),
                    _ => None,
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        let options = match directive_argument(directive, "options").map(value_to_json) {
            Some(JsonValue::Object(options)) => options,
            _ => Map::new(),
        };

        Self {
            subgraph: string_argument(directive, "subgraph").unwrap_or_default(),
            kind: string_argument(directive, "kind").unwrap_or_default(),
            location: string_argument(directive, "location").unwrap_or_default(),
            headers,
            options,
        }
    }
}
