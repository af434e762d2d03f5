use crate::Value;
use std::fmt;

/// A named argument of a field selection. Order of bindings in a list
/// carries no meaning; duplicate names are rejected during elaboration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub value: Value,
}

impl Binding {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Binding {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Finds a binding by name.
    pub fn lookup<'a>(bindings: &'a [Binding], name: &str) -> Option<&'a Value> {
        bindings.iter().find(|b| b.name == name).map(|b| &b.value)
    }

    /// Returns the first duplicated binding name, if any.
    pub fn duplicate<'a>(bindings: &'a [Binding]) -> Option<&'a str> {
        bindings.iter().enumerate().find_map(|(i, b)| {
            bindings[..i]
                .iter()
                .any(|prev| prev.name == b.name)
                .then_some(b.name.as_str())
        })
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_detection() {
        let bindings = vec![
            Binding::new("id", Value::Int(1)),
            Binding::new("size", Value::Int(64)),
            Binding::new("id", Value::Int(2)),
        ];

        assert_eq!(Binding::duplicate(&bindings), Some("id"));
        assert_eq!(Binding::lookup(&bindings, "size"), Some(&Value::Int(64)));
    }
}
