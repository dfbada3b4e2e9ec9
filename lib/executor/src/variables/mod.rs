use fusion_query_planner::{BindingSource, VariableBinding};
use fusion_supergraph::ast::GraphQLValue;
use graphql_parser::query::Value as QueryValue;
use serde_json::{Map, Number, Value};

/// Converts a GraphQL literal to JSON, reading `$variables` from the captured outputs.
/// A variable that was never captured resolves to `null`.
pub fn resolve_value(value: &GraphQLValue, captured: &Map<String, Value>) -> Value {
    match value {
        QueryValue::Variable(name) => captured.get(name).cloned().unwrap_or(Value::Null),
        QueryValue::Null => Value::Null,
        QueryValue::Int(number) => number.as_i64().map(Value::from).unwrap_or(Value::Null),
        QueryValue::Float(number) => Number::from_f64(*number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        QueryValue::String(value) | QueryValue::Enum(value) => Value::String(value.clone()),
        QueryValue::Boolean(value) => Value::Bool(*value),
        QueryValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_value(item, captured))
                .collect(),
        ),
        QueryValue::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), resolve_value(value, captured)))
                .collect(),
        ),
    }
}

/// Builds the captured-output map an execution starts from: literal defaults, then the
/// caller's values, then `null` for every declared variable still missing.
pub fn seed_variables(
    defaults: &Map<String, Value>,
    provided: Option<&Map<String, Value>>,
    declared: &[String],
) -> Map<String, Value> {
    let mut captured = defaults.clone();

    if let Some(provided) = provided {
        for (name, value) in provided {
            captured.insert(name.clone(), value.clone());
        }
    }

    for name in declared {
        if !captured.contains_key(name) {
            captured.insert(name.clone(), Value::Null);
        }
    }

    captured
}

/// Value of a binding that does not read per-item exports.
pub fn resolve_binding(binding: &VariableBinding, captured: &Map<String, Value>) -> Value {
    match &binding.source {
        BindingSource::Value(value) => resolve_value(value, captured),
        BindingSource::Export(name) => captured.get(name).cloned().unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use fusion_supergraph::ast::parse_operation;
    use graphql_parser::query::{Definition, OperationDefinition, Selection};
    use serde_json::json;

    use super::*;

    fn argument(operation: &str) -> GraphQLValue {
        let document = parse_operation(operation).unwrap();
        let Some(Definition::Operation(OperationDefinition::SelectionSet(set))) =
            document.definitions.first()
        else {
            panic!("expected a selection set");
        };
        let Some(Selection::Field(field)) = set.items.first() else {
            panic!("expected a field");
        };
        field.arguments[0].1.clone()
    }

    #[test]
    fn substitutes_captured_variables() {
        let captured = json!({ "id": "1", "n": 3 }).as_object().cloned().unwrap();
        let value = argument(r#"{ f(input: { ids: [$id, "2"], first: $n, order: ASC, missing: $nope }) }"#);

        assert_eq!(
            resolve_value(&value, &captured),
            json!({ "ids": ["1", "2"], "first": 3, "order": "ASC", "missing": null })
        );
    }

    #[test]
    fn seeds_defaults_then_caller_values_then_nulls() {
        let defaults = json!({ "first": 10, "after": "x" }).as_object().cloned().unwrap();
        let provided = json!({ "first": 2, "extra": true }).as_object().cloned().unwrap();
        let declared = vec!["first".to_string(), "after".to_string(), "id".to_string()];

        assert_eq!(
            Value::Object(seed_variables(&defaults, Some(&provided), &declared)),
            json!({ "first": 2, "after": "x", "extra": true, "id": null })
        );
    }
}
