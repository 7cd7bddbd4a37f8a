//! BINDERY - Injection-safe SQL text assembly for Rust
//!
//! Fragments carry `?` markers, values travel separately, and the builder
//! emits the placeholder tokens the target dialect expects.

#![deny(warnings, clippy::all)]
//#![deny(missing_docs)]

pub mod query_builder;
pub mod param;

pub use query_builder::{
    bind_fragment, dynamic_where, placeholder_list, placeholder_list_from, Builder, Dialect,
    Param, ParseDialectError, QueryBuildError, Value,
};
