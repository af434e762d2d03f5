use thiserror::Error;

/// Everything that can go wrong between a source string and a compiled
/// plan. Every kind renders as a single line; parse errors additionally
/// carry the offending source line and a caret marker.
///
/// Problems never escape as panics; they travel in the accumulating
/// [`ElabResult`](crate::ElabResult) carrier.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Problem {
    #[error("Parse error at line {line} column {column}\n{snippet}")]
    ParseError {
        line: usize,
        column: usize,
        /// The offending source line followed by a caret line.
        snippet: String,
    },

    #[error("At least one operation required")]
    NoOperations,

    #[error("Document defines multiple operations, but no operation name was given")]
    AmbiguousOperation,

    #[error("Operation '{name}' does not match any operation in the document")]
    UnknownOperation { name: String },

    #[error("Fragment cycle through '{name}'")]
    FragmentCycle { name: String },

    #[error("Unknown field '{field}' on type '{tpe}'")]
    UnknownField { tpe: String, field: String },

    #[error("Unknown argument '{argument}' on field '{field}'")]
    UnknownArgument { field: String, argument: String },

    #[error("Duplicate argument '{argument}' on field '{field}'")]
    DuplicateArgument { field: String, argument: String },

    #[error("Unknown type '{name}'")]
    UnknownType { name: String },

    #[error("Unknown variable '${name}'")]
    UnknownVariable { name: String },

    #[error("Unknown fragment '{name}'")]
    UnknownFragment { name: String },

    #[error("Value of type {actual} is not valid for type {expected}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Required argument '{argument}' is missing")]
    MissingRequired { argument: String },

    #[error("Leaf field '{field}' of type '{tpe}' must not have a subselection")]
    LeafSubselection { field: String, tpe: String },

    #[error("Field '{field}' of type '{tpe}' must have a subselection")]
    NonLeafSubselection { field: String, tpe: String },

    #[error("Cannot merge selections of '{field}' with conflicting arguments")]
    AmbiguousMerge { field: String },

    #[error("Schema exposes no {kind} root operation")]
    MissingRootOperation { kind: String },

    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl Problem {
    pub fn unknown_field(tpe: impl ToString, field: impl Into<String>) -> Self {
        Problem::UnknownField {
            tpe: tpe.to_string(),
            field: field.into(),
        }
    }

    pub fn type_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        Problem::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Problem::InternalInvariant(details.into())
    }
}
