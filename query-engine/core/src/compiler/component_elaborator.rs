//! Phase 6: component boundary elaboration.
//!
//! Selections of fields whose mapping delegates to another interpreter
//! are wrapped in `Wrap(resultName, Component(target, join, select))`.
//! The default join passes the cursor through unchanged.

use crate::error::Problem;
use crate::mappings::DelegationTable;
use crate::query_ast::{ComponentJoin, Query, Select};
use crate::result::ElabResult;
use schema::{Schema, TypeRef};

pub(crate) fn elaborate_components(
    schema: &Schema,
    table: &DelegationTable,
    tpe: &TypeRef,
    query: Query,
) -> ElabResult<Query> {
    match query {
        Query::Select(sel) => elaborate_field(schema, table, tpe, sel, None),
        Query::Rename(alias, child) => match *child {
            Query::Select(sel) => elaborate_field(schema, table, tpe, sel, Some(alias)),
            other => elaborate_components(schema, table, tpe, other)
                .map(|c| Query::Rename(alias, Box::new(c))),
        },
        Query::Group(queries) => queries
            .into_iter()
            .map(|q| elaborate_components(schema, table, tpe, q))
            .collect::<ElabResult<Vec<_>>>()
            .map(Query::group),
        Query::Narrow(subtpe, child) => {
            elaborate_components(schema, table, &subtpe.clone(), *child)
                .map(|c| Query::Narrow(subtpe, Box::new(c)))
        }
        Query::Unique(child) => elaborate_components(schema, table, tpe, *child).map(Query::unique),
        Query::Filter(pred, child) => {
            elaborate_components(schema, table, tpe, *child).map(|c| Query::filter(pred, c))
        }
        Query::Environment(env, child) => elaborate_components(schema, table, tpe, *child)
            .map(|c| Query::Environment(env, Box::new(c))),
        Query::TransformCursor(transform, child) => {
            elaborate_components(schema, table, tpe, *child)
                .map(|c| Query::TransformCursor(transform, Box::new(c)))
        }
        Query::Wrap(name, child) => {
            elaborate_components(schema, table, tpe, *child).map(|c| Query::wrap(name, c))
        }
        Query::Skip { sense, cond, child } => {
            elaborate_components(schema, table, tpe, *child).map(|c| Query::Skip {
                sense,
                cond,
                child: Box::new(c),
            })
        }
        Query::Limit(n, child) => {
            elaborate_components(schema, table, tpe, *child).map(|c| Query::limit(n, c))
        }
        Query::Offset(n, child) => {
            elaborate_components(schema, table, tpe, *child).map(|c| Query::offset(n, c))
        }
        Query::OrderBy(selections, child) => {
            elaborate_components(schema, table, tpe, *child).map(|c| Query::order_by(selections, c))
        }
        Query::Count(name, child) => {
            elaborate_components(schema, table, tpe, *child).map(|c| Query::count(name, c))
        }
        Query::Effect(handler, child) => elaborate_components(schema, table, tpe, *child)
            .map(|c| Query::Effect(handler, Box::new(c))),
        // Introspection subtrees evaluate against schema metadata and
        // never cross interpreter boundaries.
        passthrough @ (Query::Introspect(..)
        | Query::Component { .. }
        | Query::UntypedNarrow(..)
        | Query::Skipped
        | Query::Empty) => ElabResult::Success(passthrough),
    }
}

fn elaborate_field(
    schema: &Schema,
    table: &DelegationTable,
    tpe: &TypeRef,
    sel: Select,
    alias: Option<String>,
) -> ElabResult<Query> {
    let delegate = table.delegate_for(tpe, &sel.name).cloned();

    let Some(field_tpe) = schema.field_type(tpe, &sel.name).map(|t| t.underlying().clone())
    else {
        return ElabResult::failure(Problem::internal(format!(
            "field '{}' on type '{tpe}' lost during elaboration",
            sel.name
        )));
    };

    let Select { name, args, child } = sel;
    elaborate_components(schema, table, &field_tpe, *child).and_then(|child| {
        let rebuilt = Select::new(name.clone(), args, child);
        let inner = match alias.clone() {
            Some(alias) => Query::Rename(alias, Box::new(Query::Select(rebuilt))),
            None => Query::Select(rebuilt),
        };
        match delegate {
            Some(mapping) => {
                let result_name = alias.unwrap_or(name);
                ElabResult::Success(Query::wrap(
                    result_name,
                    Query::Component {
                        mapping,
                        join: ComponentJoin::trivial(),
                        child: Box::new(inner),
                    },
                ))
            }
            None => ElabResult::Success(inner),
        }
    })
}
