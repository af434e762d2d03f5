#![deny(unsafe_code, rust_2018_idioms)]

//! Protocol front end for the query engine: converts textual GraphQL
//! operations into the untyped operation trees the compiler consumes.

mod graphql;

pub use graphql::{GraphQlAdapter, GraphQlHandler};
