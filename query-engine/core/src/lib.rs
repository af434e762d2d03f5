#![deny(unsafe_code, rust_2018_idioms)]

//! The core of the query engine: the query algebra, the predicate and
//! term model, the plan rewriting utilities, and the multi-phase
//! compiler that turns an untyped operation into a typed plan tree.
//!
//! The whole pipeline is pure and synchronous; [`EffectHandler`] is the
//! single seam through which an embedding runtime schedules effectful
//! continuations of a compiled plan.

#[macro_use]
extern crate tracing;

pub mod compiler;
pub mod query_ast;
pub mod query_document;

mod effects;
mod env;
mod error;
mod filter;
mod mappings;
mod result;

pub use self::{
    compiler::{Operation, QueryCompiler, SelectElaborator, SelectHandler},
    effects::{EffectHandler, EffectRef},
    env::Env,
    error::Problem,
    filter::{compare_all, Cursor, MatchPattern, OrderSelection, Predicate, Term},
    mappings::{FieldMapping, MappingRef, ObjectMapping},
    query_ast::{ComponentJoin, CursorTransform, Query, SchemaHandle, Select},
    query_document::{UntypedOperation, UntypedVarDef},
    result::{ElabResult, Problems},
};
