//! Parser output consumed by the compiler: an untyped operation whose
//! plan tree only contains pre-elaboration node kinds, plus the
//! operation's variable definitions.

use crate::query_ast::Query;
use graph_value::Value;
use schema::{OperationKind, Type};

/// A variable declared in the operation header, e.g. `$size: Int = 64`.
#[derive(Debug, Clone, PartialEq)]
pub struct UntypedVarDef {
    pub name: String,
    pub ty: Type,
    pub default: Option<Value>,
}

impl UntypedVarDef {
    pub fn new(name: impl Into<String>, ty: Type, default: Option<Value>) -> Self {
        UntypedVarDef {
            name: name.into(),
            ty,
            default,
        }
    }
}

/// An operation as delivered by the protocol adapter, before any
/// schema-directed rewriting.
#[derive(Debug, Clone, PartialEq)]
pub struct UntypedOperation {
    pub kind: OperationKind,
    pub query: Query,
    pub variables: Vec<UntypedVarDef>,
}

impl UntypedOperation {
    pub fn query(query: Query) -> Self {
        UntypedOperation {
            kind: OperationKind::Query,
            query,
            variables: Vec::new(),
        }
    }

    pub fn mutation(query: Query) -> Self {
        UntypedOperation {
            kind: OperationKind::Mutation,
            query,
            variables: Vec::new(),
        }
    }

    pub fn subscription(query: Query) -> Self {
        UntypedOperation {
            kind: OperationKind::Subscription,
            query,
            variables: Vec::new(),
        }
    }

    pub fn with_variables(mut self, variables: Vec<UntypedVarDef>) -> Self {
        self.variables = variables;
        self
    }
}
