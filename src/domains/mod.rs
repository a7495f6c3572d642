//! Domains module containing business logic organized by bounded contexts.
//!
//! The only context is **tools**: typed, named operations that clients
//! discover with `tools/list` and invoke with `tools/call`.

pub mod tools;
