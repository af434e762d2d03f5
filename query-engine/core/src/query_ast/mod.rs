//! The query algebra: the plan tree produced by the compiler and
//! consumed by interpreters.
//!
//! Trees are immutable once constructed; every rewrite produces a new
//! tree. Nodes own their children exclusively.

pub mod transformers;

use crate::effects::EffectRef;
use crate::env::Env;
use crate::error::Problem;
use crate::filter::{Cursor, OrderSelection, Predicate};
use crate::mappings::MappingRef;
use graph_value::{Binding, Value};
use itertools::Itertools;
use schema::{SchemaRef, TypeRef};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A field selection: the workhorse node of the algebra. `child` is
/// `Empty` exactly when the selected field is a leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub name: String,
    pub args: Vec<Binding>,
    pub child: Box<Query>,
}

impl Select {
    pub fn new(name: impl Into<String>, args: Vec<Binding>, child: Query) -> Self {
        Select {
            name: name.into(),
            args,
            child: Box::new(child),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(*self.child, Query::Empty)
    }
}

/// A cursor rewrite applied before a subtree executes. Compared by
/// identity so plan trees stay comparable.
#[derive(Clone)]
pub struct CursorTransform {
    f: Arc<dyn Fn(Box<dyn Cursor>) -> Result<Box<dyn Cursor>, Problem> + Send + Sync>,
}

impl CursorTransform {
    pub fn new(
        f: impl Fn(Box<dyn Cursor>) -> Result<Box<dyn Cursor>, Problem> + Send + Sync + 'static,
    ) -> Self {
        CursorTransform { f: Arc::new(f) }
    }

    pub fn apply(&self, cursor: Box<dyn Cursor>) -> Result<Box<dyn Cursor>, Problem> {
        (self.f)(cursor)
    }
}

impl PartialEq for CursorTransform {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for CursorTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CursorTransform(<fn>)")
    }
}

/// How a `Component` boundary joins the parent interpreter's cursor to
/// the child query. The trivial join passes the child query through
/// unchanged.
#[derive(Clone)]
pub struct ComponentJoin {
    label: &'static str,
    f: Arc<dyn Fn(&Query, &dyn Cursor) -> Result<Query, Problem> + Send + Sync>,
}

impl ComponentJoin {
    pub fn new(
        label: &'static str,
        f: impl Fn(&Query, &dyn Cursor) -> Result<Query, Problem> + Send + Sync + 'static,
    ) -> Self {
        ComponentJoin {
            label,
            f: Arc::new(f),
        }
    }

    /// The default join: the child query continues against the child
    /// interpreter with the cursor passed through.
    pub fn trivial() -> Self {
        static TRIVIAL: OnceLock<ComponentJoin> = OnceLock::new();
        TRIVIAL
            .get_or_init(|| ComponentJoin::new("trivial", |query, _| Ok(query.clone())))
            .clone()
    }

    pub fn apply(&self, query: &Query, cursor: &dyn Cursor) -> Result<Query, Problem> {
        (self.f)(query, cursor)
    }
}

impl PartialEq for ComponentJoin {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for ComponentJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentJoin({})", self.label)
    }
}

/// A schema reference held inside a plan node, compared by identity.
#[derive(Clone)]
pub struct SchemaHandle(pub SchemaRef);

impl SchemaHandle {
    pub fn schema(&self) -> &SchemaRef {
        &self.0
    }
}

impl PartialEq for SchemaHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SchemaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SchemaHandle(<schema>)")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// A field selection.
    Select(Select),
    /// Two or more sibling queries. Never nests directly and never
    /// contains `Empty` after merging.
    Group(Vec<Query>),
    /// Asserts that the child produces a single-element list and
    /// focuses that element.
    Unique(Box<Query>),
    /// Restricts the child's list to elements satisfying the predicate.
    Filter(Predicate, Box<Query>),
    /// An inter-interpreter boundary: the child runs under the named
    /// mapping, joined to the parent cursor.
    Component {
        mapping: MappingRef,
        join: ComponentJoin,
        child: Box<Query>,
    },
    /// A possibly-batched effectful continuation.
    Effect(EffectRef, Box<Query>),
    /// Evaluates the child against the metadata of the given schema.
    Introspect(SchemaHandle, Box<Query>),
    /// Extends the ambient environment for the child.
    Environment(Env, Box<Query>),
    /// Wraps the child's result as a field named `name`.
    Wrap(String, Box<Query>),
    /// Aliases the topmost field of the child.
    Rename(String, Box<Query>),
    /// A type refinement whose target has not been resolved against the
    /// schema yet. Eliminated by the compiler.
    UntypedNarrow(String, Box<Query>),
    /// The child is only produced when the focus is of the subtype.
    Narrow(TypeRef, Box<Query>),
    /// Conditional inclusion: the child is suppressed when `cond`
    /// evaluates equal to `sense`.
    Skip {
        sense: bool,
        cond: Value,
        child: Box<Query>,
    },
    /// Truncates a list-producing child to the first `n` elements.
    Limit(usize, Box<Query>),
    /// Drops the first `n` elements of a list-producing child.
    Offset(usize, Box<Query>),
    /// Sorts a list-producing child. Selections must be non-empty.
    OrderBy(Vec<OrderSelection>, Box<Query>),
    /// Emits the cardinality of the child as a field named `name`.
    Count(String, Box<Query>),
    /// Rewrites the cursor before the child executes.
    TransformCursor(CursorTransform, Box<Query>),
    /// Placeholder for a subtree suppressed by a skip directive.
    Skipped,
    /// The identity under merging.
    Empty,
}

impl Query {
    pub fn select(name: impl Into<String>, args: Vec<Binding>, child: Query) -> Query {
        Query::Select(Select::new(name, args, child))
    }

    /// A leaf selection: no arguments, no subselection.
    pub fn leaf(name: impl Into<String>) -> Query {
        Query::select(name, Vec::new(), Query::Empty)
    }

    /// Groups sibling queries, flattening nested groups and collapsing
    /// the degenerate arities.
    pub fn group(queries: Vec<Query>) -> Query {
        let mut flat = Vec::new();
        for query in queries {
            match query {
                Query::Group(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Query::Empty,
            1 => flat.pop().expect("non-empty"),
            _ => Query::Group(flat),
        }
    }

    /// Sibling composition: `Group(a) ~ Group(b) = Group(a ++ b)`.
    /// `Empty` elements are not removed here; merging handles those.
    pub fn compose(self, other: Query) -> Query {
        match (self, other) {
            (Query::Group(mut a), Query::Group(b)) => {
                a.extend(b);
                Query::Group(a)
            }
            (Query::Group(mut a), b) => {
                a.push(b);
                Query::Group(a)
            }
            (a, Query::Group(b)) => {
                let mut queries = vec![a];
                queries.extend(b);
                Query::Group(queries)
            }
            (a, b) => Query::Group(vec![a, b]),
        }
    }

    pub fn wrap(name: impl Into<String>, child: Query) -> Query {
        Query::Wrap(name.into(), Box::new(child))
    }

    pub fn rename(name: impl Into<String>, child: Query) -> Query {
        Query::Rename(name.into(), Box::new(child))
    }

    pub fn unique(child: Query) -> Query {
        Query::Unique(Box::new(child))
    }

    pub fn filter(predicate: Predicate, child: Query) -> Query {
        Query::Filter(predicate, Box::new(child))
    }

    pub fn narrow(subtpe: impl Into<TypeRef>, child: Query) -> Query {
        Query::Narrow(subtpe.into(), Box::new(child))
    }

    pub fn untyped_narrow(tpnme: impl Into<String>, child: Query) -> Query {
        Query::UntypedNarrow(tpnme.into(), Box::new(child))
    }

    pub fn environment<K: Into<String>>(
        bindings: impl IntoIterator<Item = (K, Value)>,
        child: Query,
    ) -> Query {
        Query::Environment(Env::of(bindings), Box::new(child))
    }

    pub fn skip(sense: bool, cond: Value, child: Query) -> Query {
        Query::Skip {
            sense,
            cond,
            child: Box::new(child),
        }
    }

    pub fn limit(n: usize, child: Query) -> Query {
        Query::Limit(n, Box::new(child))
    }

    pub fn offset(n: usize, child: Query) -> Query {
        Query::Offset(n, Box::new(child))
    }

    pub fn order_by(selections: Vec<OrderSelection>, child: Query) -> Query {
        Query::OrderBy(selections, Box::new(child))
    }

    pub fn count(name: impl Into<String>, child: Query) -> Query {
        Query::Count(name.into(), Box::new(child))
    }

    pub fn component(mapping: impl Into<MappingRef>, join: ComponentJoin, child: Query) -> Query {
        Query::Component {
            mapping: mapping.into(),
            join,
            child: Box::new(child),
        }
    }

    pub fn introspect(schema: SchemaRef, child: Query) -> Query {
        Query::Introspect(SchemaHandle(schema), Box::new(child))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Query::Empty)
    }

    /// The canonical debug rendering used in logs and test assertions.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A select's braces already delimit its children, so a group
        // directly under a select contributes only its elements.
        fn children_of(query: &Query) -> String {
            match query {
                Query::Group(queries) => queries.iter().join(", "),
                other => other.to_string(),
            }
        }

        match self {
            Query::Select(sel) => {
                f.write_str(&sel.name)?;
                if !sel.args.is_empty() {
                    write!(f, "({})", sel.args.iter().join(", "))?;
                }
                if !sel.is_leaf() {
                    write!(f, " {{ {} }}", children_of(&sel.child))?;
                }
                Ok(())
            }
            Query::Group(queries) => write!(f, "{{ {} }}", queries.iter().join(", ")),
            Query::Unique(child) => write!(f, "<unique: {child}>"),
            Query::Filter(pred, child) => write!(f, "<filter: {pred} {child}>"),
            Query::Component { mapping, child, .. } => {
                write!(f, "<component: {mapping} {child}>")
            }
            Query::Effect(_, child) => write!(f, "<effect: {child}>"),
            Query::Introspect(_, child) => write!(f, "<introspect: {child}>"),
            Query::Environment(env, child) => write!(f, "<env: {env} {child}>"),
            Query::Wrap(name, child) => write!(f, "<wrap: {name} {child}>"),
            Query::Rename(name, child) => write!(f, "<rename: {name} {child}>"),
            Query::UntypedNarrow(tpnme, child) => write!(f, "<untyped-narrow: {tpnme} {child}>"),
            Query::Narrow(subtpe, child) => write!(f, "<narrow: {subtpe} {child}>"),
            Query::Skip { sense, cond, child } => write!(f, "<skip: {sense} {cond} {child}>"),
            Query::Limit(n, child) => write!(f, "<limit: {n} {child}>"),
            Query::Offset(n, child) => write!(f, "<offset: {n} {child}>"),
            Query::OrderBy(selections, child) => {
                write!(f, "<order-by: [{}] {child}>", selections.iter().join(", "))
            }
            Query::Count(name, child) => write!(f, "<count: {name} {child}>"),
            Query::TransformCursor(_, child) => write!(f, "<transform-cursor: {child}>"),
            Query::Skipped => f.write_str("<skipped>"),
            Query::Empty => f.write_str("<empty>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Term;

    #[test]
    fn compose_flattens_adjacent_groups() {
        let a = Query::leaf("a").compose(Query::leaf("b"));
        let b = Query::leaf("c").compose(Query::leaf("d"));

        let composed = a.compose(b);
        assert_eq!(
            composed,
            Query::Group(vec![
                Query::leaf("a"),
                Query::leaf("b"),
                Query::leaf("c"),
                Query::leaf("d"),
            ])
        );
    }

    #[test]
    fn compose_keeps_empty() {
        let composed = Query::leaf("a").compose(Query::Empty);
        assert_eq!(composed, Query::Group(vec![Query::leaf("a"), Query::Empty]));
    }

    #[test]
    fn group_collapses_degenerate_arities() {
        assert_eq!(Query::group(vec![]), Query::Empty);
        assert_eq!(Query::group(vec![Query::leaf("a")]), Query::leaf("a"));
        assert_eq!(
            Query::group(vec![Query::group(vec![Query::leaf("a"), Query::leaf("b")])]),
            Query::Group(vec![Query::leaf("a"), Query::leaf("b")])
        );
    }

    #[test]
    fn render_selects_and_wrappers() {
        let q = Query::select(
            "character",
            vec![Binding::new("id", Value::id("1000"))],
            Query::leaf("name").compose(Query::leaf("id")),
        );
        assert_eq!(q.render(), r#"character(id: "1000") { name, id }"#);

        let renamed = Query::rename("hero", Query::leaf("name"));
        assert_eq!(renamed.render(), "<rename: hero name>");

        let narrowed = Query::narrow("Human", Query::leaf("homePlanet"));
        assert_eq!(narrowed.render(), "<narrow: Human homePlanet>");
    }

    #[test]
    fn render_filter_stack() {
        let q = Query::limit(
            10,
            Query::order_by(
                vec![crate::filter::OrderSelection::asc(Term::path(["name"]))],
                Query::leaf("name"),
            ),
        );
        assert_eq!(q.render(), "<limit: 10 <order-by: [name asc] name>>");
    }

    #[test]
    fn trivial_joins_are_equal() {
        assert_eq!(ComponentJoin::trivial(), ComponentJoin::trivial());
    }
}
