//! Domains module containing business logic organized by bounded contexts.
//!
//! The tool servers only expose tools; every toolset lives under `tools`.

pub mod tools;
