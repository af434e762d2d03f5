//! The query compiler: an eight-phase, type-directed rewrite from an
//! untyped operation to a typed, executable plan.
//!
//! Phases 1 (variable binding) and 6 (component boundaries) abort the
//! pipeline on failure; every other phase accumulates problems so that
//! a single compile can report them all.

mod component_elaborator;
mod introspection;
mod select_elaborator;
mod validate;
mod variables;

pub use select_elaborator::{SelectElaborator, SelectHandler};

use crate::error::Problem;
use crate::mappings::{DelegationTable, ObjectMapping};
use crate::query_ast::{transformers, Query};
use crate::query_document::UntypedOperation;
use crate::result::ElabResult;
use graph_value::{Value, ValueObject};
use indexmap::IndexMap;
use schema::{OperationKind, SchemaRef, TypeRef};

/// A successfully compiled operation: the typed plan, the root type it
/// selects against, and the operation kind it was declared as.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub query: Query,
    pub root_type: TypeRef,
    pub kind: OperationKind,
}

/// Compiles untyped operations against one schema. Construction wires
/// in the per-type select handlers and the component mapping table;
/// compilation itself is pure and shares no state between calls.
pub struct QueryCompiler {
    schema: SchemaRef,
    elaborator: SelectElaborator,
    delegation: DelegationTable,
}

impl QueryCompiler {
    pub fn new(schema: SchemaRef) -> Self {
        QueryCompiler {
            schema,
            elaborator: SelectElaborator::new(),
            delegation: DelegationTable::default(),
        }
    }

    pub fn with_elaborator(mut self, elaborator: SelectElaborator) -> Self {
        self.elaborator = elaborator;
        self
    }

    pub fn with_mappings(mut self, mappings: &[ObjectMapping]) -> Self {
        self.delegation = DelegationTable::from_mappings(mappings);
        self
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Runs the full pipeline. `variables` supplies values for the
    /// operation's declared variables.
    #[tracing::instrument(skip_all, fields(kind = %operation.kind))]
    pub fn compile(
        &self,
        operation: UntypedOperation,
        variables: ValueObject,
    ) -> ElabResult<Operation> {
        let UntypedOperation {
            kind,
            query,
            variables: var_defs,
        } = operation;

        let Some(root) = self.schema.root_operation(kind) else {
            return ElabResult::failure(Problem::MissingRootOperation {
                kind: kind.to_string(),
            });
        };

        trace!("binding variables");
        let bound = variables::bind_variables(self.schema.as_ref(), query, &var_defs, &variables);

        let elaborated = bound
            .and_then(|q| {
                trace!("elaborating selections");
                select_elaborator::elaborate_selects(
                    self.schema.as_ref(),
                    &self.elaborator,
                    &root,
                    q,
                    true,
                )
            })
            .and_then(|q| {
                trace!("hoisting introspection");
                introspection::hoist_introspection(&self.schema, q)
            })
            .and_then(|q| {
                trace!("resolving type refinements");
                resolve_narrows(&self.schema, q)
            })
            .and_then(|q| {
                trace!("folding skip directives");
                fold_skips(q)
            })
            .and_then(|q| {
                if self.delegation.is_empty() {
                    ElabResult::Success(q)
                } else {
                    trace!("inserting component boundaries");
                    component_elaborator::elaborate_components(
                        self.schema.as_ref(),
                        &self.delegation,
                        &root,
                        q,
                    )
                }
            })
            .and_then(|q| {
                trace!("merging duplicate selections");
                merge(q)
            })
            .and_then(|q| {
                trace!("validating");
                let problems = validate::validate(self.schema.as_ref(), &root, &q);
                if problems.is_empty() {
                    ElabResult::Success(q)
                } else {
                    ElabResult::Failure(problems)
                }
            });

        elaborated.map(|query| {
            debug!(plan = %query, "compiled");
            Operation {
                query,
                root_type: root,
                kind,
            }
        })
    }
}

/// Phase 4: `UntypedNarrow` becomes `Narrow` once the target type is
/// confirmed to exist.
fn resolve_narrows(schema: &SchemaRef, query: Query) -> ElabResult<Query> {
    transformers::rewrite(query, &mut |node| match node {
        Query::UntypedNarrow(tpnme, child) => match schema.lookup_type(&tpnme) {
            Some(subtpe) => ElabResult::Success(Query::Narrow(subtpe, child)),
            None => ElabResult::failure(Problem::UnknownType { name: tpnme }),
        },
        other => ElabResult::Success(other),
    })
}

/// Phase 5: skip/include directives with constant conditions fold away;
/// variable-valued conditions survive to runtime.
fn fold_skips(query: Query) -> ElabResult<Query> {
    transformers::rewrite(query, &mut |node| match node {
        Query::Skip { sense, cond, child } => match cond {
            Value::Boolean(value) => ElabResult::Success(if value == sense {
                Query::Skipped
            } else {
                *child
            }),
            cond @ Value::Variable(_) => ElabResult::Success(Query::Skip {
                sense,
                cond,
                child,
            }),
            other => ElabResult::failure(Problem::type_mismatch("Boolean", other.type_name())),
        },
        other => ElabResult::Success(other),
    })
}

/// Phase 7: duplicate selections merge throughout the tree, and any
/// same-name/same-alias duplicates that survive did so because their
/// arguments disagree.
fn merge(query: Query) -> ElabResult<Query> {
    let merged = transformers::rewrite(query, &mut |node| match node {
        Query::Group(queries) => ElabResult::Success(transformers::merge_queries(queries)),
        other => ElabResult::Success(other),
    });

    merged.and_then(|q| {
        let mut problems = Vec::new();
        ambiguous_merges(&q, &mut problems);
        if problems.is_empty() {
            ElabResult::Success(q)
        } else {
            ElabResult::Failure(problems)
        }
    })
}

fn ambiguous_merges(query: &Query, problems: &mut Vec<Problem>) {
    if let Query::Group(queries) = query {
        let mut seen: IndexMap<(&str, Option<&str>), usize> = IndexMap::new();
        for q in queries {
            if let Some((sel, alias)) = transformers::possibly_renamed_select(q) {
                *seen.entry((sel.name.as_str(), alias)).or_default() += 1;
            }
        }
        for ((name, _), count) in seen {
            if count > 1 {
                let problem = Problem::AmbiguousMerge {
                    field: name.to_owned(),
                };
                if !problems.contains(&problem) {
                    problems.push(problem);
                }
            }
        }
    }

    match query {
        Query::Select(sel) => ambiguous_merges(&sel.child, problems),
        Query::Group(queries) => {
            for q in queries {
                ambiguous_merges(q, problems);
            }
        }
        Query::Unique(child)
        | Query::Filter(_, child)
        | Query::Component { child, .. }
        | Query::Effect(_, child)
        | Query::Introspect(_, child)
        | Query::Environment(_, child)
        | Query::Wrap(_, child)
        | Query::Rename(_, child)
        | Query::UntypedNarrow(_, child)
        | Query::Narrow(_, child)
        | Query::Skip { child, .. }
        | Query::Limit(_, child)
        | Query::Offset(_, child)
        | Query::OrderBy(_, child)
        | Query::Count(_, child)
        | Query::TransformCursor(_, child) => ambiguous_merges(child, problems),
        Query::Skipped | Query::Empty => {}
    }
}
