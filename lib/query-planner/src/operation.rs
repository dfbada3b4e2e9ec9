use fusion_supergraph::ast::{value_to_json, OperationKind, QueryDocument};
use graphql_parser::query::{Definition, OperationDefinition, SelectionSet, VariableDefinition};
use serde_json::{Map, Value};

use crate::error::PlanningError;

/// The parts of an operation definition the planner needs, whatever its kind.
pub struct SelectedOperation<'a> {
    pub kind: OperationKind,
    pub name: Option<&'a str>,
    pub variable_definitions: &'a [VariableDefinition<'static, String>],
    pub selection_set: &'a SelectionSet<'static, String>,
}

fn describe<'a>(operation: &'a OperationDefinition<'static, String>) -> SelectedOperation<'a> {
    match operation {
        OperationDefinition::SelectionSet(selection_set) => SelectedOperation {
            kind: OperationKind::Query,
            name: None,
            variable_definitions: &[],
            selection_set,
        },
        OperationDefinition::Query(query) => SelectedOperation {
            kind: OperationKind::Query,
            name: query.name.as_deref(),
            variable_definitions: &query.variable_definitions,
            selection_set: &query.selection_set,
        },
        OperationDefinition::Mutation(mutation) => SelectedOperation {
            kind: OperationKind::Mutation,
            name: mutation.name.as_deref(),
            variable_definitions: &mutation.variable_definitions,
            selection_set: &mutation.selection_set,
        },
        OperationDefinition::Subscription(subscription) => SelectedOperation {
            kind: OperationKind::Subscription,
            name: subscription.name.as_deref(),
            variable_definitions: &subscription.variable_definitions,
            selection_set: &subscription.selection_set,
        },
    }
}

/// Picks the operation to run. Without a name the document must hold exactly one operation.
pub fn select_operation<'a>(
    document: &'a QueryDocument,
    operation_name: Option<&str>,
) -> Result<SelectedOperation<'a>, PlanningError> {
    let mut operations = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Operation(operation) => Some(describe(operation)),
            Definition::Fragment(_) => None,
        });

    match operation_name {
        Some(name) => operations
            .find(|operation| operation.name == Some(name))
            .ok_or_else(|| PlanningError::OperationNotFound(name.to_string())),
        None => {
            let first = operations.next().ok_or(PlanningError::MissingOperation)?;
            if operations.next().is_some() {
                return Err(PlanningError::AmbiguousOperation);
            }
            Ok(first)
        }
    }
}

/// Values of variables declared with a literal default.
pub fn default_variable_values(
    variable_definitions: &[VariableDefinition<'static, String>],
) -> Map<String, Value> {
    variable_definitions
        .iter()
        .filter_map(|definition| {
            definition
                .default_value
                .as_ref()
                .map(|value| (definition.name.clone(), value_to_json(value)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_supergraph::ast::parse_operation;
    use serde_json::json;

    #[test]
    fn single_anonymous_operation_is_selected() {
        let document = parse_operation("{ a }").unwrap();
        let operation = select_operation(&document, None).unwrap();

        assert_eq!(operation.kind, OperationKind::Query);
        assert_eq!(operation.name, None);
    }

    #[test]
    fn multiple_operations_require_a_name() {
        let document = parse_operation("query A { a } mutation B { b }").unwrap();

        assert_eq!(
            select_operation(&document, None).err(),
            Some(PlanningError::AmbiguousOperation)
        );
        assert_eq!(
            select_operation(&document, Some("B")).map(|operation| operation.kind),
            Ok(OperationKind::Mutation)
        );
        assert_eq!(
            select_operation(&document, Some("C")).err().map(|e| e.to_string()),
            Some("No operation found with name C".to_string())
        );
    }

    #[test]
    fn defaults_come_from_literals() {
        let document =
            parse_operation("query ($a: Int = 1, $b: [String] = [\"x\"], $c: Int) { a }").unwrap();
        let operation = select_operation(&document, None).unwrap();

        assert_eq!(
            Value::Object(default_variable_values(operation.variable_definitions)),
            json!({ "a": 1, "b": ["x"] })
        );
    }
}
