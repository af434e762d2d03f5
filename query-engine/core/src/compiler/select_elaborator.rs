//! Phase 2: type-directed select elaboration.
//!
//! Walks the tree keeping track of the focus type, verifies every
//! selection and argument against the schema, coerces argument values,
//! and hands each verified selection to the per-type rewrite handler.

use super::variables::coerce;
use crate::error::Problem;
use crate::query_ast::{Query, Select};
use crate::result::ElabResult;
use graph_value::Binding;
use schema::{Schema, TypeRef, SCHEMA_FIELD, TYPE_FIELD};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A domain-specific rewrite applied to a fully verified selection,
/// e.g. turning `character(id: …)` into a filtered unique lookup.
pub type SelectHandler = Arc<dyn Fn(Select) -> ElabResult<Query> + Send + Sync>;

/// The per-type dispatch table for select rewriting. Lookup is by the
/// nominal type owning the field; types without a handler elaborate
/// under the identity rewrite.
#[derive(Clone, Default)]
pub struct SelectElaborator {
    handlers: HashMap<TypeRef, SelectHandler>,
}

impl SelectElaborator {
    pub fn new() -> Self {
        SelectElaborator::default()
    }

    /// Registers a handler for selections owned by `tpe`, chaining.
    pub fn on(
        mut self,
        tpe: impl Into<TypeRef>,
        handler: impl Fn(Select) -> ElabResult<Query> + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(tpe.into(), Arc::new(handler));
        self
    }

    fn handler_for(&self, tpe: &TypeRef) -> Option<&SelectHandler> {
        self.handlers.get(tpe)
    }
}

impl fmt::Debug for SelectElaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Elaborates `query` with `tpe` as the focus type. `defer_meta` is set
/// while still at the operation root, where the reserved introspection
/// fields are legal and left for the hoisting phase.
pub(crate) fn elaborate_selects(
    schema: &Schema,
    elaborator: &SelectElaborator,
    tpe: &TypeRef,
    query: Query,
    defer_meta: bool,
) -> ElabResult<Query> {
    match query {
        Query::Select(sel) => elaborate_select(schema, elaborator, tpe, sel, defer_meta),
        Query::Group(queries) => queries
            .into_iter()
            .map(|q| elaborate_selects(schema, elaborator, tpe, q, defer_meta))
            .collect::<ElabResult<Vec<_>>>()
            .map(Query::group),
        Query::Rename(name, child) => {
            elaborate_selects(schema, elaborator, tpe, *child, defer_meta)
                .map(|c| Query::Rename(name, Box::new(c)))
        }
        Query::Skip { sense, cond, child } => {
            elaborate_selects(schema, elaborator, tpe, *child, defer_meta).map(|c| Query::Skip {
                sense,
                cond,
                child: Box::new(c),
            })
        }
        Query::UntypedNarrow(tpnme, child) => match schema.lookup_type(&tpnme) {
            Some(subtpe) => elaborate_selects(schema, elaborator, &subtpe, *child, false)
                .map(|c| Query::UntypedNarrow(tpnme, Box::new(c))),
            None => ElabResult::failure(Problem::UnknownType { name: tpnme }),
        },
        Query::Narrow(subtpe, child) => {
            elaborate_selects(schema, elaborator, &subtpe.clone(), *child, false)
                .map(|c| Query::Narrow(subtpe, Box::new(c)))
        }
        Query::Environment(env, child) => elaborate_selects(schema, elaborator, tpe, *child, false)
            .map(|c| Query::Environment(env, Box::new(c))),
        Query::TransformCursor(transform, child) => {
            elaborate_selects(schema, elaborator, tpe, *child, false)
                .map(|c| Query::TransformCursor(transform, Box::new(c)))
        }
        Query::Unique(child) => {
            elaborate_selects(schema, elaborator, tpe, *child, false).map(Query::unique)
        }
        Query::Filter(pred, child) => elaborate_selects(schema, elaborator, tpe, *child, false)
            .map(|c| Query::filter(pred, c)),
        Query::Limit(n, child) => {
            elaborate_selects(schema, elaborator, tpe, *child, false).map(|c| Query::limit(n, c))
        }
        Query::Offset(n, child) => {
            elaborate_selects(schema, elaborator, tpe, *child, false).map(|c| Query::offset(n, c))
        }
        Query::OrderBy(selections, child) => {
            elaborate_selects(schema, elaborator, tpe, *child, false)
                .map(|c| Query::order_by(selections, c))
        }
        Query::Count(name, child) => {
            elaborate_selects(schema, elaborator, tpe, *child, false).map(|c| Query::count(name, c))
        }
        Query::Wrap(name, child) => {
            elaborate_selects(schema, elaborator, tpe, *child, false).map(|c| Query::wrap(name, c))
        }
        Query::Effect(handler, child) => elaborate_selects(schema, elaborator, tpe, *child, false)
            .map(|c| Query::Effect(handler, Box::new(c))),
        // Introspection subtrees are elaborated against the meta-schema
        // by the hoisting phase and component boundaries do not exist
        // before phase 6; both pass through untouched here.
        passthrough @ (Query::Introspect(..) | Query::Component { .. }) => {
            ElabResult::Success(passthrough)
        }
        leaf @ (Query::Skipped | Query::Empty) => ElabResult::Success(leaf),
    }
}

fn elaborate_select(
    schema: &Schema,
    elaborator: &SelectElaborator,
    parent: &TypeRef,
    sel: Select,
    defer_meta: bool,
) -> ElabResult<Query> {
    if defer_meta && (sel.name == SCHEMA_FIELD || sel.name == TYPE_FIELD) {
        return ElabResult::Success(Query::Select(sel));
    }

    let Select { name, args, child } = sel;

    let Some(field) = schema.field(parent, &name) else {
        return ElabResult::failure(Problem::unknown_field(parent, name));
    };

    if let Some(duplicate) = Binding::duplicate(&args) {
        return ElabResult::failure(Problem::DuplicateArgument {
            field: name,
            argument: duplicate.to_owned(),
        });
    }

    // Verify and coerce the provided arguments, then fill in defaults
    // for the declared ones that were not supplied.
    let mut arg_results: Vec<ElabResult<Option<Binding>>> = Vec::new();
    let mut provided: Vec<&str> = Vec::new();

    for binding in &args {
        let Some(declared) = field.arguments.iter().find(|a| a.name == binding.name) else {
            arg_results.push(ElabResult::failure(Problem::UnknownArgument {
                field: name.clone(),
                argument: binding.name.clone(),
            }));
            continue;
        };
        if binding.value.is_absent() {
            continue;
        }
        provided.push(&binding.name);
        arg_results.push(
            coerce(schema, binding.value.clone(), &declared.ty)
                .map(|value| Some(Binding::new(declared.name.clone(), value)))
                .into(),
        );
    }

    for declared in &field.arguments {
        if provided.contains(&declared.name.as_str()) {
            continue;
        }
        match &declared.default {
            Some(default) => arg_results.push(
                coerce(schema, default.clone(), &declared.ty)
                    .map(|value| Some(Binding::new(declared.name.clone(), value)))
                    .into(),
            ),
            None if declared.is_required() => {
                arg_results.push(ElabResult::failure(Problem::MissingRequired {
                    argument: declared.name.clone(),
                }))
            }
            None => {}
        }
    }

    let args_result: ElabResult<Vec<Binding>> = arg_results
        .into_iter()
        .collect::<ElabResult<Vec<Option<Binding>>>>()
        .map(|args| args.into_iter().flatten().collect());

    // Leaf fields must not carry a subselection; composite fields must.
    let field_tpe = field.ty.underlying().clone();
    let is_leaf = schema.is_leaf(&field_tpe);

    let child_result = match (is_leaf, child.is_empty()) {
        (true, false) => ElabResult::failure(Problem::LeafSubselection {
            field: name.clone(),
            tpe: parent.name().to_owned(),
        }),
        (false, true) => ElabResult::failure(Problem::NonLeafSubselection {
            field: name.clone(),
            tpe: parent.name().to_owned(),
        }),
        (true, true) => ElabResult::Success(Query::Empty),
        (false, false) => elaborate_selects(schema, elaborator, &field_tpe, *child, false),
    };

    args_result
        .zip_with(child_result, {
            let name = name.clone();
            move |args, child| Select::new(name, args, child)
        })
        .and_then(|sel| match elaborator.handler_for(parent) {
            Some(handler) => handler(sel),
            None => ElabResult::Success(Query::Select(sel)),
        })
}
