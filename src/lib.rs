//! Apple Music MCP Server Library
//!
//! This crate exposes Apple Music catalog search and personal library
//! management as Model Context Protocol (MCP) tools.
//!
//! # Architecture
//!
//! - **core**: Configuration, error handling, the MCP server and its transports
//! - **domains**: Business logic organized by bounded contexts
//!   - **auth**: Developer token signing, the Music User Token and their persistence
//!   - **api**: Authenticated request pipeline with retry and a TTL response cache
//!   - **tools**: MCP tools that call the pipeline and render results
//!
//! # Example
//!
//! ```rust,no_run
//! use apple_music_mcp_server::{core::Config, core::McpServer, core::TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config.clone())?;
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
