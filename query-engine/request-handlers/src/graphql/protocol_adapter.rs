use graph_value::{Binding, Value};
use graphql_parser::query::{
    Definition, Directive, Document, FragmentDefinition, OperationDefinition,
    Selection as GqlSelection, SelectionSet, Type as GqlType, TypeCondition, Value as GqlValue,
};
use indexmap::IndexMap;
use query_core::{ElabResult, Problem, Query, UntypedOperation, UntypedVarDef};
use schema::{OperationKind, Type};
use std::collections::HashMap;

/// Protocol adapter for GraphQL -> untyped operation trees.
///
/// GraphQL is mapped as follows:
/// - Fields become `Select` nodes, aliased fields `Rename(alias, Select)`.
/// - Inline fragments and named fragment spreads become `UntypedNarrow`.
/// - `@skip`/`@include` directives become `Skip` nodes.
/// - Enum literals and variable uses arrive as the untyped value
///   variants and are resolved by the compiler.
/// - If an operation name is given, only the matching operation is
///   converted; otherwise the document must contain exactly one.
pub struct GraphQlAdapter;

impl GraphQlAdapter {
    #[tracing::instrument(name = "graphql_to_operation", skip_all)]
    pub fn convert(
        document: Document<'_, String>,
        operation_name: Option<&str>,
    ) -> ElabResult<UntypedOperation> {
        let mut fragments: HashMap<String, FragmentDefinition<'_, String>> = HashMap::new();
        let mut operations: Vec<OperationDefinition<'_, String>> = Vec::new();

        for definition in document.definitions {
            match definition {
                Definition::Fragment(fragment) => {
                    fragments.insert(fragment.name.clone(), fragment);
                }
                Definition::Operation(operation) => operations.push(operation),
            }
        }

        let operation = match operation_name {
            Some(name) => match operations.into_iter().find(|op| matches_name(op, name)) {
                Some(op) => op,
                None => {
                    return ElabResult::failure(Problem::UnknownOperation {
                        name: name.to_owned(),
                    })
                }
            },
            None => match operations.len() {
                0 => return ElabResult::failure(Problem::NoOperations),
                1 => operations.pop().expect("single operation"),
                _ => return ElabResult::failure(Problem::AmbiguousOperation),
            },
        };

        Self::convert_operation(operation, &fragments)
    }

    fn convert_operation(
        operation: OperationDefinition<'_, String>,
        fragments: &HashMap<String, FragmentDefinition<'_, String>>,
    ) -> ElabResult<UntypedOperation> {
        let (kind, selection_set, variable_definitions) = match operation {
            OperationDefinition::SelectionSet(set) => (OperationKind::Query, set, Vec::new()),
            OperationDefinition::Query(query) => (
                OperationKind::Query,
                query.selection_set,
                query.variable_definitions,
            ),
            OperationDefinition::Mutation(mutation) => (
                OperationKind::Mutation,
                mutation.selection_set,
                mutation.variable_definitions,
            ),
            OperationDefinition::Subscription(subscription) => (
                OperationKind::Subscription,
                subscription.selection_set,
                subscription.variable_definitions,
            ),
        };

        let variables: ElabResult<Vec<UntypedVarDef>> = variable_definitions
            .into_iter()
            .map(|definition| {
                let default = match definition.default_value {
                    Some(value) => match convert_value(value) {
                        Ok(value) => Some(value),
                        Err(problem) => return ElabResult::failure(problem),
                    },
                    None => None,
                };
                ElabResult::Success(UntypedVarDef::new(
                    definition.name,
                    convert_type(definition.var_type),
                    default,
                ))
            })
            .collect();

        let query = Self::convert_selection_set(selection_set, fragments, &mut Vec::new());

        variables.zip_with(query, |variables, query| UntypedOperation {
            kind,
            query,
            variables,
        })
    }

    fn convert_selection_set(
        selection_set: SelectionSet<'_, String>,
        fragments: &HashMap<String, FragmentDefinition<'_, String>>,
        visiting: &mut Vec<String>,
    ) -> ElabResult<Query> {
        selection_set
            .items
            .into_iter()
            .map(|item| match item {
                GqlSelection::Field(field) => {
                    let args: Result<Vec<Binding>, Problem> = field
                        .arguments
                        .into_iter()
                        .map(|(name, value)| convert_value(value).map(|v| Binding::new(name, v)))
                        .collect();
                    let args = match args {
                        Ok(args) => args,
                        Err(problem) => return ElabResult::failure(problem),
                    };

                    Self::convert_selection_set(field.selection_set, fragments, visiting)
                        .and_then(|child| {
                            let mut query = Query::select(field.name, args, child);
                            if let Some(alias) = field.alias {
                                query = Query::rename(alias, query);
                            }
                            apply_directives(field.directives, query)
                        })
                }

                GqlSelection::InlineFragment(fragment) => {
                    Self::convert_selection_set(fragment.selection_set, fragments, visiting)
                        .and_then(|child| {
                            let query = match fragment.type_condition {
                                Some(TypeCondition::On(tpnme)) => {
                                    Query::untyped_narrow(tpnme, child)
                                }
                                None => child,
                            };
                            apply_directives(fragment.directives, query)
                        })
                }

                GqlSelection::FragmentSpread(spread) => {
                    if visiting.contains(&spread.fragment_name) {
                        return ElabResult::failure(Problem::FragmentCycle {
                            name: spread.fragment_name,
                        });
                    }
                    let Some(fragment) = fragments.get(&spread.fragment_name) else {
                        return ElabResult::failure(Problem::UnknownFragment {
                            name: spread.fragment_name,
                        });
                    };

                    let TypeCondition::On(tpnme) = fragment.type_condition.clone();
                    visiting.push(spread.fragment_name.clone());
                    let converted = Self::convert_selection_set(
                        fragment.selection_set.clone(),
                        fragments,
                        visiting,
                    );
                    visiting.pop();

                    converted.and_then(|child| {
                        apply_directives(spread.directives, Query::untyped_narrow(tpnme, child))
                    })
                }
            })
            .collect::<ElabResult<Vec<Query>>>()
            .map(Query::group)
    }
}

fn matches_name(operation: &OperationDefinition<'_, String>, name: &str) -> bool {
    let op_name = match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => query.name.as_ref(),
        OperationDefinition::Mutation(mutation) => mutation.name.as_ref(),
        OperationDefinition::Subscription(subscription) => subscription.name.as_ref(),
    };
    op_name.map(String::as_str) == Some(name)
}

/// `@skip(if: c)` suppresses the selection when `c` is true,
/// `@include(if: c)` when `c` is false. Other directives are ignored.
fn apply_directives(
    directives: Vec<Directive<'_, String>>,
    query: Query,
) -> ElabResult<Query> {
    let mut result = query;
    for directive in directives {
        let sense = match directive.name.as_str() {
            "skip" => true,
            "include" => false,
            _ => continue,
        };
        let cond = directive
            .arguments
            .into_iter()
            .find(|(name, _)| name == "if")
            .map(|(_, value)| convert_value(value));
        let cond = match cond {
            Some(Ok(value)) => value,
            Some(Err(problem)) => return ElabResult::failure(problem),
            None => {
                return ElabResult::failure(Problem::MissingRequired {
                    argument: "if".to_owned(),
                })
            }
        };
        result = Query::skip(sense, cond, result);
    }
    ElabResult::Success(result)
}

fn convert_type(ty: GqlType<'_, String>) -> Type {
    match ty {
        GqlType::NamedType(name) => Type::named(name),
        GqlType::ListType(inner) => Type::list(convert_type(*inner)),
        GqlType::NonNullType(inner) => Type::non_null(convert_type(*inner)),
    }
}

fn convert_value(value: GqlValue<'_, String>) -> Result<Value, Problem> {
    match value {
        GqlValue::Variable(name) => Ok(Value::UntypedVariable(name)),
        GqlValue::Int(i) => i
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| Problem::type_mismatch("Int", "out-of-range integer")),
        GqlValue::Float(f) => {
            Value::float(f).ok_or_else(|| Problem::type_mismatch("Float", "non-finite float"))
        }
        GqlValue::String(s) => Ok(Value::String(s)),
        GqlValue::Boolean(b) => Ok(Value::Boolean(b)),
        GqlValue::Null => Ok(Value::Null),
        GqlValue::Enum(name) => Ok(Value::UntypedEnum(name)),
        GqlValue::List(values) => values
            .into_iter()
            .map(convert_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        GqlValue::Object(fields) => fields
            .into_iter()
            .map(|(name, value)| convert_value(value).map(|v| (name, v)))
            .collect::<Result<IndexMap<_, _>, _>>()
            .map(Value::Object),
    }
}
