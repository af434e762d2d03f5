//! Phase 8: structural validation of the elaborated plan.
//!
//! Checks the algebra's node invariants, the absence of anything
//! untyped, and the resolvability of every predicate term in its focus
//! type. Violations that survive to this point are compiler bugs, so
//! most report as internal invariants.

use crate::error::Problem;
use crate::filter::Predicate;
use crate::query_ast::{Query, Select};
use crate::result::Problems;
use graph_value::{Binding, Value};
use schema::{introspection_schema, OperationKind, Schema, TypeRef};

pub(crate) fn validate(schema: &Schema, tpe: &TypeRef, query: &Query) -> Problems {
    let mut problems = Problems::new();
    walk(schema, tpe, query, &mut problems);
    problems
}

fn push(problems: &mut Problems, problem: Problem) {
    if !problems.contains(&problem) {
        problems.push(problem);
    }
}

fn walk(schema: &Schema, tpe: &TypeRef, query: &Query, problems: &mut Problems) {
    match query {
        Query::Select(sel) => validate_select(schema, tpe, sel, problems),
        Query::Group(queries) => {
            if queries.len() < 2 {
                push(problems, Problem::internal("group of fewer than two queries"));
            }
            for q in queries {
                match q {
                    Query::Group(_) => push(problems, Problem::internal("directly nested group")),
                    Query::Empty => push(problems, Problem::internal("empty query in group")),
                    q => walk(schema, tpe, q, problems),
                }
            }
        }
        Query::Unique(child) => walk(schema, tpe, child, problems),
        Query::Filter(pred, child) => {
            validate_predicate(schema, tpe, pred, problems);
            walk(schema, tpe, child, problems);
        }
        Query::Component { child, .. } => walk(schema, tpe, child, problems),
        Query::Effect(_, child) => walk(schema, tpe, child, problems),
        Query::Introspect(_, child) => {
            let meta = introspection_schema();
            let root = meta
                .root_operation(OperationKind::Query)
                .expect("meta-schema has a query root");
            walk(meta.as_ref(), &root, child, problems);
        }
        Query::Environment(_, child) => walk(schema, tpe, child, problems),
        Query::Wrap(_, child) => walk(schema, tpe, child, problems),
        Query::Rename(name, child) => {
            if name.is_empty() {
                push(problems, Problem::internal("empty rename alias"));
            }
            walk(schema, tpe, child, problems);
        }
        Query::UntypedNarrow(tpnme, _) => {
            push(
                problems,
                Problem::internal(format!("unresolved type refinement to '{tpnme}'")),
            );
        }
        Query::Narrow(subtpe, child) => {
            if schema.lookup_type(subtpe.name()).is_none() {
                push(
                    problems,
                    Problem::UnknownType {
                        name: subtpe.name().to_owned(),
                    },
                );
            } else if !schema.is_subtype(subtpe, tpe) {
                push(
                    problems,
                    Problem::internal(format!("'{subtpe}' does not refine '{tpe}'")),
                );
            } else {
                walk(schema, subtpe, child, problems);
            }
        }
        Query::Skip { cond, child, .. } => {
            if !matches!(cond, Value::Boolean(_) | Value::Variable(_)) {
                push(
                    problems,
                    Problem::type_mismatch("Boolean", cond.type_name()),
                );
            }
            walk(schema, tpe, child, problems);
        }
        Query::Limit(_, child) | Query::Offset(_, child) => walk(schema, tpe, child, problems),
        Query::OrderBy(selections, child) => {
            if selections.is_empty() {
                push(problems, Problem::internal("order-by without selections"));
            }
            for selection in selections {
                for path in selection.term.paths() {
                    validate_path(schema, tpe, &path, problems);
                }
            }
            walk(schema, tpe, child, problems);
        }
        Query::Count(_, child) => walk(schema, tpe, child, problems),
        Query::TransformCursor(_, child) => walk(schema, tpe, child, problems),
        Query::Skipped | Query::Empty => {}
    }
}

fn validate_select(schema: &Schema, tpe: &TypeRef, sel: &Select, problems: &mut Problems) {
    if sel.name.is_empty() {
        push(problems, Problem::internal("selection without a field name"));
        return;
    }

    let Some(field) = schema.field(tpe, &sel.name) else {
        push(problems, Problem::unknown_field(tpe, sel.name.as_str()));
        return;
    };

    if let Some(duplicate) = Binding::duplicate(&sel.args) {
        push(
            problems,
            Problem::DuplicateArgument {
                field: sel.name.clone(),
                argument: duplicate.to_owned(),
            },
        );
    }
    for binding in &sel.args {
        if binding.value.has_untyped() {
            push(
                problems,
                Problem::internal(format!(
                    "untyped value in argument '{}' of '{}'",
                    binding.name, sel.name
                )),
            );
        }
        if binding.value.is_absent() {
            push(
                problems,
                Problem::internal(format!(
                    "absent value in argument '{}' of '{}'",
                    binding.name, sel.name
                )),
            );
        }
    }

    let field_tpe = field.ty.underlying();
    match (schema.is_leaf(field_tpe), sel.is_leaf()) {
        (true, false) => push(
            problems,
            Problem::LeafSubselection {
                field: sel.name.clone(),
                tpe: tpe.name().to_owned(),
            },
        ),
        (false, true) => push(
            problems,
            Problem::NonLeafSubselection {
                field: sel.name.clone(),
                tpe: tpe.name().to_owned(),
            },
        ),
        _ => walk(schema, field_tpe, &sel.child, problems),
    }
}

fn validate_predicate(schema: &Schema, tpe: &TypeRef, pred: &Predicate, problems: &mut Problems) {
    for path in pred.paths() {
        validate_path(schema, tpe, &path, problems);
    }
}

fn validate_path(schema: &Schema, tpe: &TypeRef, path: &[String], problems: &mut Problems) {
    let mut current = tpe.clone();
    for segment in path {
        match schema.field_type(&current, segment) {
            Some(ty) => current = ty.underlying().clone(),
            None => {
                push(problems, Problem::unknown_field(&current, segment.as_str()));
                return;
            }
        }
    }
}
