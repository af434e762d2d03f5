use crate::Value;
use std::error::Error;
use std::fmt;

/// Failure to read a [`Value`] as a host scalar: records the kind of
/// value actually encountered and the requested target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionFailure {
    kind: &'static str,
    target: &'static str,
}

impl ConversionFailure {
    pub(crate) fn new(value: &Value, target: &'static str) -> ConversionFailure {
        ConversionFailure {
            kind: value.type_name(),
            target,
        }
    }

    /// The kind of the value that failed to convert, e.g. `"Enum"`.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// The requested host type, e.g. `"i64"`.
    pub fn target(&self) -> &'static str {
        self.target
    }
}

impl Error for ConversionFailure {}

impl fmt::Display for ConversionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} value cannot be read as {}", self.kind, self.target)
    }
}
