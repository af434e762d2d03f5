use crate::error::Problem;

/// Problems attached to a result. Non-empty by construction on the
/// `Warning`/`Failure` sides, de-duplicated preserving first occurrence.
pub type Problems = Vec<Problem>;

fn merge_problems(into: &mut Problems, from: Problems) {
    for problem in from {
        if !into.contains(&problem) {
            into.push(problem);
        }
    }
}

/// The accumulating result carrier threaded through every compiler
/// phase.
///
/// Monadic composition (`and_then`) short-circuits on `Failure`;
/// applicative composition (`zip_with`, `FromIterator`) runs both sides
/// and accumulates their problems.
#[derive(Debug, Clone, PartialEq)]
pub enum ElabResult<T> {
    Success(T),
    Warning(Problems, T),
    Failure(Problems),
}

impl<T> ElabResult<T> {
    pub fn failure(problem: Problem) -> Self {
        ElabResult::Failure(vec![problem])
    }

    pub fn failures(problems: Problems) -> Self {
        debug_assert!(!problems.is_empty());
        ElabResult::Failure(problems)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ElabResult<U> {
        match self {
            ElabResult::Success(v) => ElabResult::Success(f(v)),
            ElabResult::Warning(ps, v) => ElabResult::Warning(ps, f(v)),
            ElabResult::Failure(ps) => ElabResult::Failure(ps),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> ElabResult<U>) -> ElabResult<U> {
        match self {
            ElabResult::Success(v) => f(v),
            ElabResult::Warning(mut ps, v) => match f(v) {
                ElabResult::Success(u) => ElabResult::Warning(ps, u),
                ElabResult::Warning(qs, u) => {
                    merge_problems(&mut ps, qs);
                    ElabResult::Warning(ps, u)
                }
                ElabResult::Failure(qs) => {
                    merge_problems(&mut ps, qs);
                    ElabResult::Failure(ps)
                }
            },
            ElabResult::Failure(ps) => ElabResult::Failure(ps),
        }
    }

    /// Applicative composition: both sides run, problems accumulate.
    pub fn zip_with<U, V>(self, other: ElabResult<U>, f: impl FnOnce(T, U) -> V) -> ElabResult<V> {
        let (mut ps, a) = self.into_parts();
        let (qs, b) = other.into_parts();
        merge_problems(&mut ps, qs);

        match (a, b) {
            (Some(a), Some(b)) if ps.is_empty() => ElabResult::Success(f(a, b)),
            (Some(a), Some(b)) => ElabResult::Warning(ps, f(a, b)),
            _ => ElabResult::Failure(ps),
        }
    }

    pub fn or_else(self, f: impl FnOnce(Problems) -> ElabResult<T>) -> ElabResult<T> {
        match self {
            ElabResult::Failure(ps) => f(ps),
            other => other,
        }
    }

    /// Demotes a problem to a warning attached to this result.
    pub fn with_warning(self, problem: Problem) -> Self {
        match self {
            ElabResult::Success(v) => ElabResult::Warning(vec![problem], v),
            ElabResult::Warning(mut ps, v) => {
                merge_problems(&mut ps, vec![problem]);
                ElabResult::Warning(ps, v)
            }
            ElabResult::Failure(mut ps) => {
                merge_problems(&mut ps, vec![problem]);
                ElabResult::Failure(ps)
            }
        }
    }

    pub fn problems(&self) -> &[Problem] {
        match self {
            ElabResult::Success(_) => &[],
            ElabResult::Warning(ps, _) | ElabResult::Failure(ps) => ps,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ElabResult::Failure(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            ElabResult::Success(v) | ElabResult::Warning(_, v) => Some(v),
            ElabResult::Failure(_) => None,
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ElabResult::Success(v) | ElabResult::Warning(_, v) => Some(v),
            ElabResult::Failure(_) => None,
        }
    }

    /// Collapses into a plain `Result`, keeping the value on warnings.
    pub fn into_result(self) -> Result<T, Problems> {
        match self {
            ElabResult::Success(v) | ElabResult::Warning(_, v) => Ok(v),
            ElabResult::Failure(ps) => Err(ps),
        }
    }

    fn into_parts(self) -> (Problems, Option<T>) {
        match self {
            ElabResult::Success(v) => (Vec::new(), Some(v)),
            ElabResult::Warning(ps, v) => (ps, Some(v)),
            ElabResult::Failure(ps) => (ps, None),
        }
    }
}

impl<T> From<Result<T, Problem>> for ElabResult<T> {
    fn from(result: Result<T, Problem>) -> Self {
        match result {
            Ok(v) => ElabResult::Success(v),
            Err(p) => ElabResult::failure(p),
        }
    }
}

/// Accumulating traversal: every element is visited, problems from all
/// of them are collected, and the whole collection fails if any element
/// failed.
impl<T> FromIterator<ElabResult<T>> for ElabResult<Vec<T>> {
    fn from_iter<I: IntoIterator<Item = ElabResult<T>>>(iter: I) -> Self {
        let mut problems = Problems::new();
        let mut values = Vec::new();
        let mut failed = false;

        for result in iter {
            match result {
                ElabResult::Success(v) => values.push(v),
                ElabResult::Warning(ps, v) => {
                    merge_problems(&mut problems, ps);
                    values.push(v);
                }
                ElabResult::Failure(ps) => {
                    merge_problems(&mut problems, ps);
                    failed = true;
                }
            }
        }

        if failed {
            ElabResult::Failure(problems)
        } else if problems.is_empty() {
            ElabResult::Success(values)
        } else {
            ElabResult::Warning(problems, values)
        }
    }
}
