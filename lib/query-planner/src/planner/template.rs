use fusion_supergraph::{
    ast::{parse_operation, GraphQLType, OperationKind, QueryDocument},
    fusion_spec::ResolverDirective,
};
use graphql_parser::query::{
    Definition, OperationDefinition, Query, Selection, SelectionSet, VariableDefinition,
};

use crate::error::PlanningError;

pub struct TemplateVariable {
    pub name: String,
    pub required: bool,
}

/// A resolver operation parsed once per use. Client selections are injected into its
/// innermost field.
pub struct ResolverTemplate {
    pub document: QueryDocument,
    pub operation_name: Option<String>,
    pub kind: OperationKind,
    pub variables: Vec<TemplateVariable>,
    /// Response keys from the top-level field down to the injection point.
    pub result_path: Vec<String>,
}

impl ResolverTemplate {
    pub fn parse(resolver: &ResolverDirective) -> Result<Self, PlanningError> {
        let invalid = |reason: &str| PlanningError::InvalidResolverOperation {
            subgraph: resolver.subgraph.clone(),
            reason: reason.to_string(),
        };

        let mut document =
            parse_operation(&resolver.operation).map_err(|e| invalid(&e.to_string()))?;
        expand_shorthand(&mut document);

        let (kind, operation_name, variable_definitions, selection_set) =
            operation_parts(&document).ok_or_else(|| invalid("no operation definition"))?;

        let variables = variable_definitions
            .iter()
            .map(|definition| TemplateVariable {
                name: definition.name.clone(),
                required: matches!(definition.var_type, GraphQLType::NonNullType(_))
                    && definition.default_value.is_none(),
            })
            .collect();

        let mut result_path = vec![];
        let mut current = selection_set;
        loop {
            let [Selection::Field(field)] = current.items.as_slice() else {
                return Err(invalid("expected exactly one field at every level"));
            };
            result_path.push(field.alias.clone().unwrap_or_else(|| field.name.clone()));

            if field.selection_set.items.is_empty() {
                break;
            }
            current = &field.selection_set;
        }

        Ok(Self {
            operation_name: operation_name.cloned(),
            kind,
            variables,
            result_path,
            document,
        })
    }

    pub fn declares(&self, variable: &str) -> bool {
        self.variables.iter().any(|v| v.name == variable)
    }

    /// Places `selections` under the innermost field and declares extra variables.
    pub fn inject(
        mut self,
        selections: Vec<Selection<'static, String>>,
        extra_variables: Vec<VariableDefinition<'static, String>>,
    ) -> QueryDocument {
        if let Some((variable_definitions, selection_set)) = operation_parts_mut(&mut self.document) {
            variable_definitions.extend(extra_variables);

            let mut current = selection_set;
            while let Some(Selection::Field(field)) = current.items.first_mut() {
                if field.selection_set.items.is_empty() {
                    field.selection_set.items = selections;
                    break;
                }
                current = &mut field.selection_set;
            }
        }

        self.document
    }
}

type OperationParts<'a> = (
    OperationKind,
    Option<&'a String>,
    &'a [VariableDefinition<'static, String>],
    &'a SelectionSet<'static, String>,
);

fn operation_parts(document: &QueryDocument) -> Option<OperationParts<'_>> {
    document.definitions.iter().find_map(|definition| match definition {
        Definition::Operation(OperationDefinition::Query(query)) => Some((
            OperationKind::Query,
            query.name.as_ref(),
            &query.variable_definitions[..],
            &query.selection_set,
        )),
        Definition::Operation(OperationDefinition::Mutation(mutation)) => Some((
            OperationKind::Mutation,
            mutation.name.as_ref(),
            &mutation.variable_definitions[..],
            &mutation.selection_set,
        )),
        Definition::Operation(OperationDefinition::Subscription(subscription)) => Some((
            OperationKind::Subscription,
            subscription.name.as_ref(),
            &subscription.variable_definitions[..],
            &subscription.selection_set,
        )),
        Definition::Operation(OperationDefinition::SelectionSet(_)) | Definition::Fragment(_) => {
            None
        }
    })
}

/// Rewrites `{ ... }` as an anonymous `query { ... }` so it has variable definitions to extend.
fn expand_shorthand(document: &mut QueryDocument) {
    for definition in &mut document.definitions {
        if let Definition::Operation(OperationDefinition::SelectionSet(selection_set)) = definition {
            let span = selection_set.span;
            let selection_set =
                std::mem::replace(selection_set, SelectionSet { span, items: vec![] });
            *definition = Definition::Operation(OperationDefinition::Query(Query {
                position: selection_set.span.0,
                name: None,
                variable_definitions: vec![],
                directives: vec![],
                selection_set,
            }));
        }
    }
}

fn operation_parts_mut(
    document: &mut QueryDocument,
) -> Option<(
    &mut Vec<VariableDefinition<'static, String>>,
    &mut SelectionSet<'static, String>,
)> {
    document
        .definitions
        .iter_mut()
        .find_map(|definition| match definition {
            Definition::Operation(OperationDefinition::Query(query)) => {
                Some((&mut query.variable_definitions, &mut query.selection_set))
            }
            Definition::Operation(OperationDefinition::Mutation(mutation)) => {
                Some((&mut mutation.variable_definitions, &mut mutation.selection_set))
            }
            Definition::Operation(OperationDefinition::Subscription(subscription)) => Some((
                &mut subscription.variable_definitions,
                &mut subscription.selection_set,
            )),
            _ => None,
        })
}
