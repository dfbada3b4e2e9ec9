use std::collections::BTreeMap;

use fusion_supergraph::{
    ast::{collect_variables, is_list_type, map_named_type, named_type, GraphQLValue, QueryDocument},
    fusion_spec::{ResolverDirective, ResolverKind},
    Supergraph, SchemaElement,
};
use graphql_parser::{
    query::{self, Selection, VariableDefinition},
    schema::TypeDefinition,
};
use tracing::{debug, instrument};

use crate::{
    error::PlanningError,
    flatten::{flatten_selection_set, fragments_of, FlattenedField},
    operation::{default_variable_values, select_operation},
    plan_nodes::{
        BindingSource, ExportedVariable, MetaField, Plan, ResolverOperationNode, VariableBinding,
    },
};

use template::ResolverTemplate;

pub mod template;

/// Builds the dependency graph of subgraph calls needed to answer one operation.
#[instrument(level = "debug", skip_all, fields(operation_name = operation_name))]
pub fn plan_operation(
    supergraph: &Supergraph,
    document: &QueryDocument,
    operation_name: Option<&str>,
) -> Result<Plan, PlanningError> {
    let operation = select_operation(document, operation_name)?;
    let root_type = supergraph
        .root_type_name(operation.kind)
        .ok_or_else(|| PlanningError::UnresolvedRootType(operation.kind.to_string()))?;

    let fragments = fragments_of(document);
    let fields = flatten_selection_set(operation.selection_set, &fragments)?;

    let mut walker = PlanWalker::new(supergraph);
    walker.plan_root(root_type, &fields)?;

    let nodes = walker.finish();
    let mut dependency_map: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for node in &nodes {
        for dependency in &node.dependencies {
            dependency_map
                .entry(dependency.clone())
                .or_default()
                .push(node.id);
        }
    }

    debug!(nodes = nodes.len(), "operation planned");

    Ok(Plan {
        operation_kind: operation.kind,
        operation_name: operation.name.map(str::to_string),
        nodes,
        dependency_map,
        default_variables: default_variable_values(operation.variable_definitions),
        operation_variables: operation
            .variable_definitions
            .iter()
            .map(|definition| definition.name.clone())
            .collect(),
        meta_fields: walker.meta_fields,
        root_response_keys: walker.root_response_keys,
    })
}

struct PendingNode {
    subgraph: String,
    kind: ResolverKind,
    template: ResolverTemplate,
    selections: Vec<Selection<'static, String>>,
    extra_variables: Vec<VariableDefinition<'static, String>>,
    path: Vec<String>,
    merge_key: Option<String>,
    response_keys: Vec<String>,
    bindings: Vec<VariableBinding>,
    exports: Vec<ExportedVariable>,
    parent: Option<usize>,
}

/// Objects of one selection level: their type, the subgraph answering them and the
/// node whose operation holds the selection.
struct Level<'l> {
    type_name: &'l str,
    subgraph: &'l str,
    path: Vec<String>,
    in_list: bool,
    node: usize,
}

impl Level<'_> {
    fn child_path(&self, key: &str) -> Vec<String> {
        let mut path = self.path.clone();
        path.push(key.to_string());
        path
    }
}

/// Values already exported at one level, so a select is aliased once.
#[derive(Default)]
struct LevelExports {
    aliases: Vec<(String, String)>,
}

struct PlanWalker<'a> {
    supergraph: &'a Supergraph,
    counter: usize,
    nodes: Vec<PendingNode>,
    meta_fields: Vec<MetaField>,
    root_response_keys: Vec<String>,
}

impl<'a> PlanWalker<'a> {
    fn new(supergraph: &'a Supergraph) -> Self {
        Self {
            supergraph,
            counter: 0,
            nodes: vec![],
            meta_fields: vec![],
            root_response_keys: vec![],
        }
    }

    fn next_name(&mut self, prefix: &str) -> String {
        let name = format!("__{}_{}", prefix, self.counter);
        self.counter += 1;
        name
    }

    fn plan_root(&mut self, root_type: &str, fields: &[FlattenedField]) -> Result<(), PlanningError> {
        let supergraph = self.supergraph;
        for field in fields {
            let key = field.response_key().to_string();
            self.root_response_keys.push(key.clone());

            if field.is_meta_field() {
                self.meta_fields.push(MetaField {
                    response_key: key,
                    field: field.clone(),
                });
                continue;
            }

            let definition = supergraph
                .field(root_type, &field.name)
                .ok_or_else(|| PlanningError::UnknownField {
                    type_name: root_type.to_string(),
                    field: field.name.clone(),
                })?;

            let resolver = supergraph
                .resolvers(&SchemaElement::field(root_type, &field.name))
                .next()
                .ok_or_else(|| PlanningError::MissingRootResolver {
                    type_name: root_type.to_string(),
                    field: field.name.clone(),
                })?;

            let node = self.push_node(resolver, vec![], Some(key.clone()), vec![key.clone()], None)?;
            self.bind_arguments(node, root_type, field)?;

            let level = Level {
                type_name: named_type(&definition.field_type),
                subgraph: &resolver.subgraph,
                path: vec![key],
                in_list: is_list_type(&definition.field_type),
                node,
            };
            let selections = self.plan_selections(&level, &field.selections)?;
            self.nodes[node].selections = selections;
        }

        Ok(())
    }

    fn push_node(
        &mut self,
        resolver: &ResolverDirective,
        path: Vec<String>,
        merge_key: Option<String>,
        response_keys: Vec<String>,
        parent: Option<usize>,
    ) -> Result<usize, PlanningError> {
        let template = ResolverTemplate::parse(resolver)?;
        let id = self.nodes.len();

        self.nodes.push(PendingNode {
            subgraph: resolver.subgraph.clone(),
            kind: resolver.kind,
            template,
            selections: vec![],
            extra_variables: vec![],
            path,
            merge_key,
            response_keys,
            bindings: vec![],
            exports: vec![],
            parent,
        });

        Ok(id)
    }

    /// Binds client arguments to resolver variables of the same name.
    fn bind_arguments(
        &mut self,
        node: usize,
        type_name: &str,
        field: &FlattenedField,
    ) -> Result<(), PlanningError> {
        for (argument, value) in &field.arguments {
            self.check_argument(type_name, &field.name, argument)?;

            if self.nodes[node].template.declares(argument) {
                self.nodes[node].bindings.push(VariableBinding {
                    variable: argument.clone(),
                    source: BindingSource::Value(value.clone()),
                });
            } else {
                debug!(
                    argument = argument.as_str(),
                    field = field.name.as_str(),
                    "argument is not used by the resolver operation"
                );
            }
        }

        Ok(())
    }

    fn check_argument(&self, type_name: &str, field: &str, argument: &str) -> Result<(), PlanningError> {
        match self.supergraph.field_argument(type_name, field, argument) {
            Some(_) => Ok(()),
            None => Err(PlanningError::UnknownArgument {
                type_name: type_name.to_string(),
                field: field.to_string(),
                argument: argument.to_string(),
            }),
        }
    }

    fn plan_selections(
        &mut self,
        level: &Level<'_>,
        fields: &[FlattenedField],
    ) -> Result<Vec<Selection<'static, String>>, PlanningError> {
        let supergraph = self.supergraph;
        let mut selections = vec![];
        let mut exports = LevelExports::default();
        // Fields answered by another subgraph through a type-level resolver, grouped by
        // (subgraph, resolver) in order of first appearance.
        let mut groups: Vec<(&'a ResolverDirective, String, Vec<FlattenedField>)> = vec![];

        for field in fields {
            let key = field.response_key();

            if field.is_meta_field() {
                selections.push(leaf_selection(field.alias.clone(), &field.name));
                continue;
            }

            let owner = self.owner_type(level.type_name, &field.name).ok_or_else(|| {
                PlanningError::UnknownField {
                    type_name: level.type_name.to_string(),
                    field: field.name.clone(),
                }
            })?;
            let element = SchemaElement::field(owner, &field.name);

            let local_name = match supergraph.metadata().source_in(&element, level.subgraph) {
                Some(source) => Some(source.name.as_str()),
                None if !supergraph.metadata().has_sources(&element) => Some(field.name.as_str()),
                None => None,
            };

            if let Some(local_name) = local_name {
                let selection = self.plan_local_field(level, owner, local_name, field)?;
                selections.push(selection);
                continue;
            }

            if let Some(resolver) = supergraph
                .resolvers(&element)
                .find(|resolver| resolver.subgraph != level.subgraph)
            {
                self.plan_field_resolver(level, owner, resolver, field, &mut selections, &mut exports)?;
                continue;
            }

            let already_grouped = groups.iter().position(|(resolver, type_name, _)| {
                type_name == owner
                    && supergraph
                        .metadata()
                        .source_in(&element, &resolver.subgraph)
                        .is_some()
            });

            match already_grouped {
                Some(position) => groups[position].2.push(field.clone()),
                None => {
                    let resolver = self
                        .type_resolver(level, owner, &element)
                        .ok_or_else(|| PlanningError::UnresolvableField {
                            type_name: owner.to_string(),
                            field: field.name.clone(),
                            subgraph: level.subgraph.to_string(),
                        })?;
                    debug!(
                        field = key,
                        target = resolver.subgraph.as_str(),
                        "field resolved through type-level resolver"
                    );
                    groups.push((resolver, owner.to_string(), vec![field.clone()]));
                }
            }
        }

        for (resolver, type_name, group) in groups {
            let response_keys = group
                .iter()
                .map(|field| field.response_key().to_string())
                .collect();
            let node = self.push_node(
                resolver,
                level.path.clone(),
                None,
                response_keys,
                Some(level.node),
            )?;
            self.bind_exports(level, node, &type_name, &mut selections, &mut exports)?;

            let child = Level {
                type_name: &type_name,
                subgraph: &resolver.subgraph,
                path: level.path.clone(),
                in_list: level.in_list,
                node,
            };
            let child_selections = self.plan_selections(&child, &group)?;
            self.nodes[node].selections = child_selections;
        }

        Ok(selections)
    }

    fn plan_local_field(
        &mut self,
        level: &Level<'_>,
        owner: &str,
        local_name: &str,
        field: &FlattenedField,
    ) -> Result<Selection<'static, String>, PlanningError> {
        let supergraph = self.supergraph;
        let key = field.response_key();
        let definition = supergraph
            .field(owner, &field.name)
            .ok_or_else(|| PlanningError::UnknownField {
                type_name: owner.to_string(),
                field: field.name.clone(),
            })?;

        let mut arguments = vec![];
        for (argument, value) in &field.arguments {
            self.check_argument(owner, &field.name, argument)?;
            let value = self.rewrite_argument(level, owner, field, argument, value)?;
            arguments.push((argument.clone(), value));
        }

        let nested = Level {
            type_name: named_type(&definition.field_type),
            subgraph: level.subgraph,
            path: level.child_path(key),
            in_list: level.in_list || is_list_type(&definition.field_type),
            node: level.node,
        };
        let selections = if field.selections.is_empty() {
            vec![]
        } else {
            self.plan_selections(&nested, &field.selections)?
        };

        Ok(Selection::Field(query::Field {
            position: Default::default(),
            alias: (key != local_name).then(|| key.to_string()),
            name: local_name.to_string(),
            arguments,
            directives: vec![],
            selection_set: query::SelectionSet {
                span: Default::default(),
                items: selections,
            },
        }))
    }

    /// Values referencing operation variables are sent as a fresh variable of the
    /// subgraph operation, typed with the subgraph's own type names.
    fn rewrite_argument(
        &mut self,
        level: &Level<'_>,
        owner: &str,
        field: &FlattenedField,
        argument: &str,
        value: &GraphQLValue,
    ) -> Result<GraphQLValue, PlanningError> {
        let supergraph = self.supergraph;
        let mut variables = vec![];
        collect_variables(value, &mut variables);
        if variables.is_empty() {
            return Ok(value.clone());
        }

        let argument_type = supergraph
            .field_argument(owner, &field.name, argument)
            .map(|definition| definition.value_type.clone())
            .ok_or_else(|| PlanningError::UnknownArgument {
                type_name: owner.to_string(),
                field: field.name.clone(),
                argument: argument.to_string(),
            })?;

        let metadata = supergraph.metadata();
        let subgraph = level.subgraph;
        let var_type = map_named_type(&argument_type, &|name: &str| {
            metadata
                .source_in(&SchemaElement::type_(name), subgraph)
                .map(|source| source.name.clone())
        });

        let name = self.next_name("argument");
        let node = &mut self.nodes[level.node];
        node.extra_variables.push(VariableDefinition {
            position: Default::default(),
            name: name.clone(),
            var_type,
            default_value: None,
        });
        node.bindings.push(VariableBinding {
            variable: name.clone(),
            source: BindingSource::Value(value.clone()),
        });

        Ok(query::Value::Variable(name))
    }

    fn plan_field_resolver(
        &mut self,
        level: &Level<'_>,
        owner: &str,
        resolver: &'a ResolverDirective,
        field: &FlattenedField,
        selections: &mut Vec<Selection<'static, String>>,
        exports: &mut LevelExports,
    ) -> Result<(), PlanningError> {
        let supergraph = self.supergraph;
        let key = field.response_key().to_string();
        let definition = supergraph
            .field(owner, &field.name)
            .ok_or_else(|| PlanningError::UnknownField {
                type_name: owner.to_string(),
                field: field.name.clone(),
            })?;

        let node = self.push_node(
            resolver,
            level.path.clone(),
            Some(key.clone()),
            vec![key.clone()],
            Some(level.node),
        )?;
        self.bind_arguments(node, owner, field)?;

        if !self.exports_satisfy(level, node, owner) {
            return Err(PlanningError::UnresolvableField {
                type_name: owner.to_string(),
                field: field.name.clone(),
                subgraph: level.subgraph.to_string(),
            });
        }
        self.bind_exports(level, node, owner, selections, exports)?;

        let nested = Level {
            type_name: named_type(&definition.field_type),
            subgraph: &resolver.subgraph,
            path: level.child_path(&key),
            in_list: level.in_list || is_list_type(&definition.field_type),
            node,
        };
        let child_selections = self.plan_selections(&nested, &field.selections)?;
        self.nodes[node].selections = child_selections;

        Ok(())
    }

    /// Picks a resolver on `owner` able to fetch `element` given what the current
    /// subgraph can export. BATCH wins inside lists, FETCH otherwise.
    fn type_resolver(
        &self,
        level: &Level<'_>,
        owner: &str,
        element: &SchemaElement,
    ) -> Option<&'a ResolverDirective> {
        let supergraph = self.supergraph;
        let preferred = if level.in_list {
            [ResolverKind::Batch, ResolverKind::Fetch]
        } else {
            [ResolverKind::Fetch, ResolverKind::Batch]
        };

        let candidates = supergraph
            .sources(element)
            .filter(|source| source.subgraph != level.subgraph)
            .flat_map(|source| {
                supergraph
                    .resolvers(&SchemaElement::type_(owner))
                    .filter(move |resolver| resolver.subgraph == source.subgraph)
            })
            .filter(|resolver| self.resolver_satisfiable(level, owner, resolver))
            .collect::<Vec<_>>();

        preferred.iter().find_map(|kind| {
            candidates
                .iter()
                .find(|resolver| resolver.kind == *kind)
                .copied()
        })
    }

    fn resolver_satisfiable(&self, level: &Level<'_>, owner: &str, resolver: &ResolverDirective) -> bool {
        match ResolverTemplate::parse(resolver) {
            Ok(template) => template
                .variables
                .iter()
                .filter(|variable| variable.required)
                .all(|variable| self.find_export(owner, level.subgraph, &variable.name).is_some()),
            Err(_) => false,
        }
    }

    fn exports_satisfy(&self, level: &Level<'_>, node: usize, owner: &str) -> bool {
        let pending = &self.nodes[node];
        pending
            .template
            .variables
            .iter()
            .filter(|variable| variable.required)
            .filter(|variable| !pending.bindings.iter().any(|b| b.variable == variable.name))
            .all(|variable| self.find_export(owner, level.subgraph, &variable.name).is_some())
    }

    /// The field `subgraph` selects to provide a resolver variable for objects of `type_name`.
    fn find_export(&self, type_name: &str, subgraph: &str, variable: &str) -> Option<&'a str> {
        let supergraph = self.supergraph;
        supergraph.fields_of(type_name)?.iter().find_map(|field| {
            supergraph
                .variables(&SchemaElement::field(type_name, &field.name))
                .find(|tag| tag.subgraph == subgraph && tag.name == variable)
                .map(|tag| tag.select.as_str())
        })
    }

    /// Binds every unbound resolver variable of `node` to a value the current level exports.
    fn bind_exports(
        &mut self,
        level: &Level<'_>,
        node: usize,
        type_name: &str,
        selections: &mut Vec<Selection<'static, String>>,
        exports: &mut LevelExports,
    ) -> Result<(), PlanningError> {
        let unbound = self.nodes[node]
            .template
            .variables
            .iter()
            .filter(|variable| {
                !self.nodes[node]
                    .bindings
                    .iter()
                    .any(|binding| binding.variable == variable.name)
            })
            .map(|variable| variable.name.clone())
            .collect::<Vec<_>>();

        for variable in unbound {
            let Some(select) = self.find_export(type_name, level.subgraph, &variable) else {
                continue;
            };

            let alias = match exports.aliases.iter().find(|(existing, _)| existing == select) {
                Some((_, alias)) => alias.clone(),
                None => {
                    let alias = self.next_name("variable");
                    selections.push(leaf_selection(Some(alias.clone()), select));
                    self.nodes[level.node].exports.push(ExportedVariable {
                        name: alias.clone(),
                        path: level.path.clone(),
                    });
                    exports.aliases.push((select.to_string(), alias.clone()));
                    alias
                }
            };

            self.nodes[node].bindings.push(VariableBinding {
                variable,
                source: BindingSource::Export(alias),
            });
        }

        Ok(())
    }

    /// The object type declaring `field_name`: the type itself, or for abstract types the
    /// first member or implementation that declares it.
    fn owner_type(&self, type_name: &str, field_name: &str) -> Option<&'a str> {
        let supergraph = self.supergraph;
        let declares = |name: &str| supergraph.field(name, field_name).is_some();

        match supergraph.type_definition(type_name)? {
            TypeDefinition::Object(object) if declares(object.name.as_str()) => Some(object.name.as_str()),
            TypeDefinition::Interface(interface) if declares(interface.name.as_str()) => {
                Some(interface.name.as_str())
            }
            TypeDefinition::Union(union) => union
                .types
                .iter()
                .find(|member| declares(member.as_str()))
                .map(String::as_str),
            TypeDefinition::Interface(interface) => supergraph
                .document()
                .definitions
                .iter()
                .find_map(|definition| match definition {
                    graphql_parser::schema::Definition::TypeDefinition(TypeDefinition::Object(
                        object,
                    )) if object.implements_interfaces.contains(&interface.name)
                        && declares(object.name.as_str()) =>
                    {
                        Some(object.name.as_str())
                    }
                    _ => None,
                }),
            _ => None,
        }
    }

    fn finish(&mut self) -> Vec<ResolverOperationNode> {
        std::mem::take(&mut self.nodes)
            .into_iter()
            .enumerate()
            .map(|(id, pending)| {
                let mut dependencies: Vec<String> = vec![];
                for binding in &pending.bindings {
                    for dependency in binding.dependencies() {
                        if !dependencies.contains(&dependency) {
                            dependencies.push(dependency);
                        }
                    }
                }

                let operation_name = pending.template.operation_name.clone();
                let result_path = pending.template.result_path.clone();

                ResolverOperationNode {
                    id,
                    subgraph: pending.subgraph,
                    kind: pending.kind,
                    operation: pending
                        .template
                        .inject(pending.selections, pending.extra_variables),
                    operation_name,
                    path: pending.path,
                    merge_key: pending.merge_key,
                    result_path,
                    response_keys: pending.response_keys,
                    bindings: pending.bindings,
                    exports: pending.exports,
                    dependencies,
                    parent: pending.parent,
                }
            })
            .collect()
    }
}

fn leaf_selection(alias: Option<String>, name: &str) -> Selection<'static, String> {
    Selection::Field(query::Field {
        position: Default::default(),
        alias,
        name: name.to_string(),
        arguments: vec![],
        directives: vec![],
        selection_set: query::SelectionSet {
            span: Default::default(),
            items: vec![],
        },
    })
}
