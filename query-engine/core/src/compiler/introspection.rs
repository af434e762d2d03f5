//! Phase 3: introspection hoisting.
//!
//! Top-level selections of the reserved `__schema`/`__type` fields are
//! wrapped in an `Introspect` node carrying the schema whose metadata
//! becomes the evaluation focus, and their subtrees are elaborated
//! against the built-in introspection meta-schema.

use super::select_elaborator::{elaborate_selects, SelectElaborator};
use crate::query_ast::Query;
use crate::result::ElabResult;
use schema::{introspection_schema, OperationKind, SchemaRef, SCHEMA_FIELD, TYPE_FIELD};
use std::sync::Arc;

pub(crate) fn hoist_introspection(schema: &SchemaRef, query: Query) -> ElabResult<Query> {
    match query {
        Query::Group(queries) => queries
            .into_iter()
            .map(|q| hoist_introspection(schema, q))
            .collect::<ElabResult<Vec<_>>>()
            .map(Query::group),
        Query::Rename(name, child) => {
            hoist_introspection(schema, *child).map(|c| Query::Rename(name, Box::new(c)))
        }
        Query::Skip { sense, cond, child } => {
            hoist_introspection(schema, *child).map(|c| Query::Skip {
                sense,
                cond,
                child: Box::new(c),
            })
        }
        Query::Select(sel) if sel.name == SCHEMA_FIELD || sel.name == TYPE_FIELD => {
            let meta = introspection_schema();
            let root = meta
                .root_operation(OperationKind::Query)
                .expect("meta-schema has a query root");
            elaborate_selects(
                meta.as_ref(),
                &SelectElaborator::new(),
                &root,
                Query::Select(sel),
                false,
            )
            .map(|elaborated| Query::introspect(Arc::clone(schema), elaborated))
        }
        other => ElabResult::Success(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_ast::SchemaHandle;
    use schema::{ObjectType, SchemaBuilder};

    fn user_schema() -> SchemaRef {
        Arc::new(
            SchemaBuilder::new()
                .object(ObjectType::new("Query"))
                .query_root("Query")
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn hoists_and_elaborates_schema_selection() {
        let schema = user_schema();
        let query = Query::select(
            "__schema",
            Vec::new(),
            Query::select("queryType", Vec::new(), Query::leaf("name")),
        );

        let hoisted = hoist_introspection(&schema, query.clone()).ok().unwrap();
        assert_eq!(
            hoisted,
            Query::Introspect(SchemaHandle(Arc::clone(&schema)), Box::new(query))
        );
    }

    #[test]
    fn unknown_meta_subfields_fail() {
        let schema = user_schema();
        let query = Query::select("__schema", Vec::new(), Query::leaf("nope"));

        assert!(hoist_introspection(&schema, query).is_failure());
    }

    #[test]
    fn ordinary_selections_pass_through() {
        let schema = user_schema();
        let query = Query::leaf("plain");
        assert_eq!(
            hoist_introspection(&schema, query.clone()),
            ElabResult::Success(query)
        );
    }
}
