//! Typed boolean predicates and projection terms used by `Filter` and
//! `OrderBy` nodes.
//!
//! Terms are pure projections evaluated against a [`Cursor`], the
//! iterator-like handle an interpreter supplies at runtime. The
//! predicate algebra is closed under Boolean composition.

use crate::error::Problem;
use graph_value::{cmp_values, Value};
use itertools::Itertools;
use regex::Regex;
use schema::TypeRef;
use std::cmp::Ordering;
use std::fmt;

/// Runtime handle into the current result context, supplied by the
/// interpreter that walks a compiled plan. The compiler never constructs
/// cursors; it only emits terms that read through this interface.
pub trait Cursor: Send + Sync {
    /// The focus type of this cursor position.
    fn tpe(&self) -> TypeRef;

    /// Descends into a named field of the focused value.
    fn field(&self, name: &str) -> Option<Box<dyn Cursor>>;

    /// The focused value, if the focus is a leaf.
    fn as_leaf(&self) -> Option<Value>;

    /// Ambient environment lookup, populated by `Environment` nodes.
    fn env(&self, _name: &str) -> Option<Value> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// A constant, independent of the cursor.
    Const(Value),
    /// A projection along a field path from the current focus.
    Path(Vec<String>),
}

impl Term {
    pub fn constant(value: impl Into<Value>) -> Self {
        Term::Const(value.into())
    }

    pub fn path<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Term::Path(segments.into_iter().map(Into::into).collect())
    }

    /// Lazily projects this term out of the given cursor position.
    pub fn eval(&self, cursor: &dyn Cursor) -> Result<Value, Problem> {
        match self {
            Term::Const(value) => Ok(value.clone()),
            Term::Path(segments) => {
                let position = descend(cursor, segments)?;
                let here: &dyn Cursor = position.as_deref().unwrap_or(cursor);
                here.as_leaf().ok_or_else(|| {
                    Problem::internal(format!("term path '{}' does not focus a leaf", self))
                })
            }
        }
    }

    /// The field paths this term reads, for static resolvability checks.
    pub fn paths(&self) -> Vec<Vec<String>> {
        match self {
            Term::Const(_) => Vec::new(),
            Term::Path(segments) => vec![segments.clone()],
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Const(v) => write!(f, "{v}"),
            Term::Path(segments) => f.write_str(&segments.join(".")),
        }
    }
}

/// A compiled match pattern. Equality is by pattern text so that plan
/// trees carrying patterns remain comparable.
#[derive(Debug, Clone)]
pub struct MatchPattern(Regex);

impl MatchPattern {
    pub fn new(regex: Regex) -> Self {
        MatchPattern(regex)
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for MatchPattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    False,
    Eql(Term, Term),
    NEql(Term, Term),
    Lt(Term, Term),
    LtEql(Term, Term),
    Gt(Term, Term),
    GtEql(Term, Term),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// List membership or substring containment, depending on the shape
    /// of the left-hand value.
    Contains(Term, Term),
    Matches(Term, MatchPattern),
    In(Term, Vec<Value>),
    /// Evaluates the inner predicate within the subcursor at `path`.
    Project(Vec<String>, Box<Predicate>),
}

impl Predicate {
    pub fn and(preds: Vec<Predicate>) -> Self {
        Predicate::And(preds)
    }

    pub fn or(preds: Vec<Predicate>) -> Self {
        Predicate::Or(preds)
    }

    pub fn not(pred: Predicate) -> Self {
        Predicate::Not(Box::new(pred))
    }

    pub fn eql(a: Term, b: Term) -> Self {
        Predicate::Eql(a, b)
    }

    pub fn project<S: Into<String>>(path: impl IntoIterator<Item = S>, inner: Predicate) -> Self {
        Predicate::Project(path.into_iter().map(Into::into).collect(), Box::new(inner))
    }

    pub fn eval(&self, cursor: &dyn Cursor) -> Result<bool, Problem> {
        match self {
            Predicate::True => Ok(true),
            Predicate::False => Ok(false),
            Predicate::Eql(a, b) => Ok(a.eval(cursor)? == b.eval(cursor)?),
            Predicate::NEql(a, b) => Ok(a.eval(cursor)? != b.eval(cursor)?),
            Predicate::Lt(a, b) => Ok(compare(a, b, cursor)? == Ordering::Less),
            Predicate::LtEql(a, b) => Ok(compare(a, b, cursor)? != Ordering::Greater),
            Predicate::Gt(a, b) => Ok(compare(a, b, cursor)? == Ordering::Greater),
            Predicate::GtEql(a, b) => Ok(compare(a, b, cursor)? != Ordering::Less),
            Predicate::And(preds) => {
                for pred in preds {
                    if !pred.eval(cursor)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(preds) => {
                for pred in preds {
                    if pred.eval(cursor)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(pred) => pred.eval(cursor).map(|b| !b),
            Predicate::Contains(a, b) => {
                let haystack = a.eval(cursor)?;
                let needle = b.eval(cursor)?;
                match (&haystack, &needle) {
                    (Value::List(values), needle) => Ok(values.contains(needle)),
                    (Value::String(s), Value::String(sub)) => Ok(s.contains(sub.as_str())),
                    _ => Err(Problem::type_mismatch("List or String", haystack.type_name())),
                }
            }
            Predicate::Matches(term, pattern) => {
                let value = term.eval(cursor)?;
                value
                    .as_str()
                    .map(|s| pattern.is_match(s))
                    .ok_or_else(|| Problem::type_mismatch("String", value.type_name()))
            }
            Predicate::In(term, values) => {
                let value = term.eval(cursor)?;
                Ok(values.contains(&value))
            }
            Predicate::Project(path, inner) => match descend(cursor, path)? {
                Some(sub) => inner.eval(sub.as_ref()),
                None => inner.eval(cursor),
            },
        }
    }

    /// All field paths read by this predicate, with `Project` prefixes
    /// applied. Used to check that filter terms are resolvable in their
    /// child's focus type.
    pub fn paths(&self) -> Vec<Vec<String>> {
        fn prefixed(prefix: &[String], paths: Vec<Vec<String>>) -> Vec<Vec<String>> {
            paths
                .into_iter()
                .map(|mut path| {
                    let mut full = prefix.to_vec();
                    full.append(&mut path);
                    full
                })
                .collect()
        }

        match self {
            Predicate::True | Predicate::False => Vec::new(),
            Predicate::Eql(a, b)
            | Predicate::NEql(a, b)
            | Predicate::Lt(a, b)
            | Predicate::LtEql(a, b)
            | Predicate::Gt(a, b)
            | Predicate::GtEql(a, b)
            | Predicate::Contains(a, b) => {
                let mut paths = a.paths();
                paths.extend(b.paths());
                paths
            }
            Predicate::And(preds) | Predicate::Or(preds) => {
                preds.iter().flat_map(Predicate::paths).collect()
            }
            Predicate::Not(pred) => pred.paths(),
            Predicate::Matches(term, _) | Predicate::In(term, _) => term.paths(),
            Predicate::Project(path, inner) => prefixed(path, inner.paths()),
        }
    }
}

/// Walks a field path down from `cursor`, returning the final subcursor
/// (`None` when the path is empty).
fn descend(cursor: &dyn Cursor, path: &[String]) -> Result<Option<Box<dyn Cursor>>, Problem> {
    let mut position: Option<Box<dyn Cursor>> = None;
    for segment in path {
        let next = {
            let here: &dyn Cursor = position.as_deref().unwrap_or(cursor);
            match here.field(segment) {
                Some(sub) => sub,
                None => return Err(Problem::unknown_field(here.tpe(), segment.as_str())),
            }
        };
        position = Some(next);
    }
    Ok(position)
}

fn compare(a: &Term, b: &Term, cursor: &dyn Cursor) -> Result<Ordering, Problem> {
    let x = a.eval(cursor)?;
    let y = b.eval(cursor)?;
    cmp_values(&x, &y).ok_or_else(|| Problem::type_mismatch(x.type_name(), y.type_name()))
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn infix(f: &mut fmt::Formatter<'_>, preds: &[Predicate], op: &str) -> fmt::Result {
            write!(f, "({})", preds.iter().join(&format!(" {op} ")))
        }

        match self {
            Predicate::True => f.write_str("true"),
            Predicate::False => f.write_str("false"),
            Predicate::Eql(a, b) => write!(f, "{a} = {b}"),
            Predicate::NEql(a, b) => write!(f, "{a} != {b}"),
            Predicate::Lt(a, b) => write!(f, "{a} < {b}"),
            Predicate::LtEql(a, b) => write!(f, "{a} <= {b}"),
            Predicate::Gt(a, b) => write!(f, "{a} > {b}"),
            Predicate::GtEql(a, b) => write!(f, "{a} >= {b}"),
            Predicate::And(preds) => infix(f, preds, "&"),
            Predicate::Or(preds) => infix(f, preds, "|"),
            Predicate::Not(pred) => write!(f, "!{pred}"),
            Predicate::Contains(a, b) => write!(f, "contains({a}, {b})"),
            Predicate::Matches(term, pattern) => write!(f, "matches({term}, /{}/)", pattern.as_str()),
            Predicate::In(term, values) => {
                write!(f, "{term} in [{}]", values.iter().join(", "))
            }
            Predicate::Project(path, inner) => write!(f, "project({}, {inner})", path.join(".")),
        }
    }
}

/// One component of an `OrderBy`. A sequence of selections composes
/// lexicographically: the first non-equal comparison wins.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSelection {
    pub term: Term,
    pub ascending: bool,
    pub nulls_last: bool,
}

impl OrderSelection {
    pub fn asc(term: Term) -> Self {
        OrderSelection {
            term,
            ascending: true,
            nulls_last: true,
        }
    }

    pub fn desc(term: Term) -> Self {
        OrderSelection {
            term,
            ascending: false,
            nulls_last: true,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls_last = false;
        self
    }

    /// Null-aware comparison of two projected values. Direction negates
    /// the value/value comparison only; null positioning is fixed by
    /// `nulls_last` regardless of direction.
    pub fn compare_values(&self, x: &Value, y: &Value) -> Ordering {
        match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => {
                if self.nulls_last {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (false, true) => {
                if self.nulls_last {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (false, false) => {
                let ordering = cmp_values(x, y).unwrap_or(Ordering::Equal);
                if self.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            }
        }
    }

    /// Projects the term out of both cursors and compares. Evaluation
    /// errors order as equal.
    pub fn compare(&self, a: &dyn Cursor, b: &dyn Cursor) -> Ordering {
        match (self.term.eval(a), self.term.eval(b)) {
            (Ok(x), Ok(y)) => self.compare_values(&x, &y),
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for OrderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.term, if self.ascending { "asc" } else { "desc" })?;
        if !self.nulls_last {
            f.write_str(" nulls-first")?;
        }
        Ok(())
    }
}

/// Lexicographic comparison over a full selection list.
pub fn compare_all(selections: &[OrderSelection], a: &dyn Cursor, b: &dyn Cursor) -> Ordering {
    for selection in selections {
        match selection.compare(a, b) {
            Ordering::Equal => continue,
            decided => return decided,
        }
    }
    Ordering::Equal
}
