//! Plan tree rewriting utilities: flattening, root inspection, merging,
//! path-query synthesis, and the extractor/constructor pairs downstream
//! interpreters match plans against.

use super::{Query, Select};
use crate::filter::{OrderSelection, Predicate};
use crate::result::ElabResult;
use graph_value::Binding;
use indexmap::IndexMap;
use schema::TypeRef;

/// Flattens top-level `Group`s transitively into a list.
pub fn ungroup(query: Query) -> Vec<Query> {
    match query {
        Query::Group(queries) => queries.into_iter().flat_map(ungroup).collect(),
        other => vec![other],
    }
}

fn ungroup_ref(query: &Query) -> Vec<&Query> {
    match query {
        Query::Group(queries) => queries.iter().flat_map(ungroup_ref).collect(),
        other => vec![other],
    }
}

/// The ungrouped children of the underlying `Select`/`Wrap`/`Count`,
/// looking through `Rename`, `Environment` and `TransformCursor`.
/// Other node kinds have no children in this sense.
pub fn children(query: &Query) -> Vec<&Query> {
    match query {
        Query::Rename(_, child)
        | Query::Environment(_, child)
        | Query::TransformCursor(_, child) => children(child),
        Query::Select(sel) => ungroup_ref(&sel.child),
        Query::Wrap(_, child) | Query::Count(_, child) => ungroup_ref(child),
        _ => Vec::new(),
    }
}

/// Recognizes a top-level selection of `field`, looking through
/// `Rename`, `Environment` and `TransformCursor` and into sibling
/// groups.
pub fn has_field(query: &Query, field: &str) -> bool {
    match query {
        Query::Select(sel) => sel.name == field,
        Query::Rename(_, child)
        | Query::Environment(_, child)
        | Query::TransformCursor(_, child) => has_field(child, field),
        Query::Group(queries) => queries.iter().any(|q| has_field(q, field)),
        _ => false,
    }
}

/// The outermost `Rename` encountered on the way to a selection of
/// `field`, if any.
pub fn field_alias(query: &Query, field: &str) -> Option<String> {
    fn walk(query: &Query, field: &str, alias: Option<&str>) -> Option<String> {
        match query {
            Query::Rename(name, child) => walk(child, field, alias.or(Some(name))),
            Query::Environment(_, child) | Query::TransformCursor(_, child) => {
                walk(child, field, alias)
            }
            Query::Group(queries) => queries.iter().find_map(|q| walk(q, field, alias)),
            Query::Select(sel) if sel.name == field => alias.map(str::to_owned),
            _ => None,
        }
    }
    walk(query, field, None)
}

/// The canonical root field name (and alias, if renamed) of a query
/// with a unique root selection.
pub fn root_name(query: &Query) -> Option<(&str, Option<&str>)> {
    fn walk<'a>(query: &'a Query, alias: Option<&'a str>) -> Option<(&'a str, Option<&'a str>)> {
        match query {
            Query::Select(sel) => Some((&sel.name, alias)),
            Query::Wrap(name, _) | Query::Count(name, _) => Some((name, alias)),
            Query::Rename(name, child) => walk(child, Some(name)),
            Query::Environment(_, child) | Query::TransformCursor(_, child) => walk(child, alias),
            _ => None,
        }
    }
    walk(query, None)
}

/// Aliases the root selection of `query` to `name`. `None` when the
/// query has no unique root.
pub fn rename_root(query: Query, name: impl Into<String>) -> Option<Query> {
    fn walk(query: Query, name: String) -> Option<Query> {
        match query {
            Query::Rename(_, child) => Some(Query::Rename(name, child)),
            select @ Query::Select(_) => Some(Query::Rename(name, Box::new(select))),
            Query::Wrap(_, child) => Some(Query::Wrap(name, child)),
            Query::Count(_, child) => Some(Query::Count(name, child)),
            Query::Environment(env, child) => {
                walk(*child, name).map(|c| Query::Environment(env, Box::new(c)))
            }
            Query::TransformCursor(transform, child) => {
                walk(*child, name).map(|c| Query::TransformCursor(transform, Box::new(c)))
            }
            _ => None,
        }
    }
    walk(query, name.into())
}

/// Applies `f` to every top-level selection node (`Select`, `Wrap`,
/// `Count`) in order, rebuilding the tree around the results and
/// accumulating problems.
pub fn map_fields<F>(query: Query, f: &mut F) -> ElabResult<Query>
where
    F: FnMut(Query) -> ElabResult<Query>,
{
    match query {
        Query::Group(queries) => queries
            .into_iter()
            .map(|q| map_fields(q, f))
            .collect::<ElabResult<Vec<_>>>()
            .map(Query::group),
        Query::Rename(name, child) => {
            map_fields(*child, f).map(|c| Query::Rename(name, Box::new(c)))
        }
        Query::Environment(env, child) => {
            map_fields(*child, f).map(|c| Query::Environment(env, Box::new(c)))
        }
        Query::TransformCursor(transform, child) => {
            map_fields(*child, f).map(|c| Query::TransformCursor(transform, Box::new(c)))
        }
        field @ (Query::Select(_) | Query::Wrap(..) | Query::Count(..)) => f(field),
        other => ElabResult::Success(other),
    }
}

/// Bottom-up structural rewrite: children are rebuilt first, then `f`
/// is applied to the rebuilt node. Problems accumulate across siblings.
pub(crate) fn rewrite<F>(query: Query, f: &mut F) -> ElabResult<Query>
where
    F: FnMut(Query) -> ElabResult<Query>,
{
    let rebuilt = match query {
        Query::Select(Select { name, args, child }) => {
            rewrite(*child, f).map(|c| Query::select(name, args, c))
        }
        Query::Group(queries) => queries
            .into_iter()
            .map(|q| rewrite(q, f))
            .collect::<ElabResult<Vec<_>>>()
            .map(Query::Group),
        Query::Unique(child) => rewrite(*child, f).map(Query::unique),
        Query::Filter(pred, child) => rewrite(*child, f).map(|c| Query::filter(pred, c)),
        Query::Component {
            mapping,
            join,
            child,
        } => rewrite(*child, f).map(|c| Query::Component {
            mapping,
            join,
            child: Box::new(c),
        }),
        Query::Effect(handler, child) => {
            rewrite(*child, f).map(|c| Query::Effect(handler, Box::new(c)))
        }
        Query::Introspect(schema, child) => {
            rewrite(*child, f).map(|c| Query::Introspect(schema, Box::new(c)))
        }
        Query::Environment(env, child) => {
            rewrite(*child, f).map(|c| Query::Environment(env, Box::new(c)))
        }
        Query::Wrap(name, child) => rewrite(*child, f).map(|c| Query::Wrap(name, Box::new(c))),
        Query::Rename(name, child) => rewrite(*child, f).map(|c| Query::Rename(name, Box::new(c))),
        Query::UntypedNarrow(tpnme, child) => {
            rewrite(*child, f).map(|c| Query::UntypedNarrow(tpnme, Box::new(c)))
        }
        Query::Narrow(subtpe, child) => {
            rewrite(*child, f).map(|c| Query::Narrow(subtpe, Box::new(c)))
        }
        Query::Skip { sense, cond, child } => rewrite(*child, f).map(|c| Query::Skip {
            sense,
            cond,
            child: Box::new(c),
        }),
        Query::Limit(n, child) => rewrite(*child, f).map(|c| Query::limit(n, c)),
        Query::Offset(n, child) => rewrite(*child, f).map(|c| Query::offset(n, c)),
        Query::OrderBy(selections, child) => {
            rewrite(*child, f).map(|c| Query::order_by(selections, c))
        }
        Query::Count(name, child) => rewrite(*child, f).map(|c| Query::count(name, c)),
        Query::TransformCursor(transform, child) => {
            rewrite(*child, f).map(|c| Query::TransformCursor(transform, Box::new(c)))
        }
        leaf @ (Query::Skipped | Query::Empty) => ElabResult::Success(leaf),
    };
    rebuilt.and_then(f)
}

/// Builds the minimal query selecting every given field-name path,
/// sharing common prefixes. Duplicate one-element paths collapse.
pub fn mk_path_query(paths: Vec<Vec<String>>) -> Query {
    merge_queries(path_queries(paths))
}

fn path_queries(paths: Vec<Vec<String>>) -> Vec<Query> {
    let mut leaves: Vec<String> = Vec::new();
    let mut nested: IndexMap<String, Vec<Vec<String>>> = IndexMap::new();

    for mut path in paths {
        match path.len() {
            0 => {}
            1 => {
                let head = path.pop().expect("non-empty");
                if !leaves.contains(&head) {
                    leaves.push(head);
                }
            }
            _ => {
                let tail = path.split_off(1);
                let head = path.pop().expect("non-empty");
                nested.entry(head).or_default().push(tail);
            }
        }
    }

    let mut queries: Vec<Query> = leaves.into_iter().map(Query::leaf).collect();
    queries.extend(
        nested
            .into_iter()
            .map(|(head, tails)| Query::select(head, Vec::new(), mk_path_query(tails))),
    );
    queries
}

/// Matches a `Select` possibly wrapped in a single `Rename`.
pub fn possibly_renamed_select(query: &Query) -> Option<(&Select, Option<&str>)> {
    match query {
        Query::Select(sel) => Some((sel, None)),
        Query::Rename(alias, child) => match child.as_ref() {
            Query::Select(sel) => Some((sel, Some(alias))),
            _ => None,
        },
        _ => None,
    }
}

fn into_possibly_renamed_select(query: Query) -> Result<(Select, Option<String>), Query> {
    match query {
        Query::Select(sel) => Ok((sel, None)),
        Query::Rename(alias, child) => match *child {
            Query::Select(sel) => Ok((sel, Some(alias))),
            other => Err(Query::Rename(alias, Box::new(other))),
        },
        other => Err(other),
    }
}

fn rewrap_select(sel: Select, alias: Option<String>) -> Query {
    let select = Query::Select(sel);
    match alias {
        Some(alias) => Query::Rename(alias, Box::new(select)),
        None => select,
    }
}

/// Binding lists compare as sets: argument order carries no meaning.
fn same_args(a: &[Binding], b: &[Binding]) -> bool {
    a.len() == b.len() && a.iter().all(|binding| b.contains(binding))
}

/// Fuses sibling selections of the same field under the same alias into
/// a single selection over the merged children.
///
/// `Empty` siblings are dropped and one level of `Group` is flattened
/// first. Selections sharing `(field, alias)` merge only when their
/// argument lists agree; disagreeing selections all survive unmerged,
/// and the compiler reports them. `Environment` and `TransformCursor`
/// wrappers are never merged across.
pub fn merge_queries(queries: Vec<Query>) -> Query {
    let flattened: Vec<Query> = queries
        .into_iter()
        .flat_map(|q| match q {
            Query::Group(inner) => inner,
            other => vec![other],
        })
        .filter(|q| !q.is_empty())
        .collect();

    let mut rest: Vec<Query> = Vec::new();
    let mut buckets: IndexMap<(String, Option<String>), Vec<Select>> = IndexMap::new();

    for query in flattened {
        match into_possibly_renamed_select(query) {
            Ok((sel, alias)) => buckets
                .entry((sel.name.clone(), alias))
                .or_default()
                .push(sel),
            Err(other) => rest.push(other),
        }
    }

    let mut merged: Vec<Query> = Vec::new();
    for ((name, alias), mut bucket) in buckets {
        if bucket.len() == 1 {
            let sel = bucket.pop().expect("non-empty bucket");
            merged.push(rewrap_select(sel, alias));
        } else if bucket.iter().skip(1).all(|sel| same_args(&sel.args, &bucket[0].args)) {
            // The fused selection carries no arguments; by the time
            // selections are mergeable their arguments have been
            // consumed into the tree.
            let child = merge_queries(bucket.into_iter().map(|sel| *sel.child).collect());
            merged.push(rewrap_select(Select::new(name, Vec::new(), child), alias));
        } else {
            // Conflicting arguments: preserve every selection.
            for sel in bucket {
                merged.push(rewrap_select(sel, alias.clone()));
            }
        }
    }

    rest.extend(merged);
    Query::group(rest)
}

/// Partitions the (possibly grouped) children into type refinements and
/// the unrefined default, fusing refinements of the same subtype.
/// `None` when no `Narrow` child exists.
pub fn type_case(query: Query) -> Option<(Vec<Query>, Vec<(TypeRef, Query)>)> {
    let mut default: Vec<Query> = Vec::new();
    let mut narrows: IndexMap<TypeRef, Vec<Query>> = IndexMap::new();

    for child in ungroup(query) {
        match child {
            Query::Narrow(subtpe, body) => narrows.entry(subtpe).or_default().push(*body),
            other => default.push(other),
        }
    }

    if narrows.is_empty() {
        return None;
    }

    let narrowed = narrows
        .into_iter()
        .map(|(subtpe, bodies)| (subtpe, merge_queries(bodies)))
        .collect();

    Some((default, narrowed))
}

/// Builds the canonical `Limit(Offset(OrderBy(Filter(child))))` stack,
/// omitting absent layers.
pub fn mk_filter_order_by_offset_limit(
    pred: Option<Predicate>,
    order: Option<Vec<OrderSelection>>,
    offset: Option<usize>,
    limit: Option<usize>,
    child: Query,
) -> Query {
    let mut query = match pred {
        Some(pred) => Query::filter(pred, child),
        None => child,
    };
    if let Some(selections) = order {
        if !selections.is_empty() {
            query = Query::order_by(selections, query);
        }
    }
    if let Some(n) = offset {
        query = Query::offset(n, query);
    }
    if let Some(n) = limit {
        query = Query::limit(n, query);
    }
    query
}

/// Recognizes the canonical filter stack, any subset of layers present,
/// in `Limit(Offset(OrderBy(Filter(…))))` nesting order. `None` when no
/// layer is present.
#[allow(clippy::type_complexity)]
pub fn filter_order_by_offset_limit(
    query: &Query,
) -> Option<(
    Option<&Predicate>,
    Option<&[OrderSelection]>,
    Option<usize>,
    Option<usize>,
    &Query,
)> {
    let mut current = query;

    let limit = match current {
        Query::Limit(n, child) => {
            current = child;
            Some(*n)
        }
        _ => None,
    };
    let offset = match current {
        Query::Offset(n, child) => {
            current = child;
            Some(*n)
        }
        _ => None,
    };
    let order = match current {
        Query::OrderBy(selections, child) => {
            current = child;
            Some(selections.as_slice())
        }
        _ => None,
    };
    let pred = match current {
        Query::Filter(pred, child) => {
            current = child;
            Some(pred)
        }
        _ => None,
    };

    if limit.is_none() && offset.is_none() && order.is_none() && pred.is_none() {
        None
    } else {
        Some((pred, order, offset, limit, current))
    }
}
