//! Domains module containing business logic organized by bounded contexts.
//!
//! - **auth**: service and user credential lifecycle
//! - **api**: the Apple Music request pipeline and response cache
//! - **tools**: MCP tools built on top of the pipeline

pub mod api;
pub mod auth;
pub mod tools;
