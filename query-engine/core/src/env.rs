use graph_value::Value;
use indexmap::IndexMap;
use std::fmt;

/// An ordered stack of name/value frames carried by `Environment` nodes.
///
/// Lookup walks from the innermost frame outward; extension clones the
/// stack and pushes a new frame, leaving the original untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Env {
    frames: Vec<IndexMap<String, Value>>,
}

impl Env {
    pub fn new() -> Self {
        Env::default()
    }

    pub fn of<K>(bindings: impl IntoIterator<Item = (K, Value)>) -> Self
    where
        K: Into<String>,
    {
        Env::new().extend(bindings)
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    #[must_use]
    pub fn extend<K>(&self, bindings: impl IntoIterator<Item = (K, Value)>) -> Self
    where
        K: Into<String>,
    {
        let mut extended = self.clone();
        extended
            .frames
            .push(bindings.into_iter().map(|(k, v)| (k.into(), v)).collect());
        extended
    }

    pub fn is_empty(&self) -> bool {
        self.frames.iter().all(|frame| frame.is_empty())
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut first = true;
        for frame in self.frames.iter().rev() {
            for (name, value) in frame {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{name}: {value}")?;
                first = false;
            }
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_prefers_the_innermost_frame() {
        let outer = Env::of([("x", Value::Int(1)), ("y", Value::Int(2))]);
        let inner = outer.extend([("x", Value::Int(10))]);

        assert_eq!(inner.lookup("x"), Some(&Value::Int(10)));
        assert_eq!(inner.lookup("y"), Some(&Value::Int(2)));
        assert_eq!(inner.lookup("z"), None);

        // Extension does not disturb the original.
        assert_eq!(outer.lookup("x"), Some(&Value::Int(1)));
    }
}
