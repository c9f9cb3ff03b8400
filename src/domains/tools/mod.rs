//! Tools domain module.
//!
//! Tools are the MCP-facing surface of the server. Each one turns its
//! parameters into a call on [`AppleMusicClient`](crate::domains::api::AppleMusicClient)
//! and renders the outcome as a tool result.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations (one file per tool)
//! - `router.rs` - Dynamic ToolRouter builder for STDIO transport
//! - `registry.rs` - Central tool registry and HTTP dispatch (feature `http`)
//! - `error.rs` - Tool dispatch error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/` (e.g., `my_tool.rs`)
//! 2. Define params, execute(), and http_handler()
//! 3. Export in `definitions/mod.rs`
//! 4. Add route in `router.rs` using `with_route()`
//! 5. Register in `registry.rs` for HTTP support

pub mod definitions;
mod error;
#[cfg(feature = "http")]
mod registry;
pub mod router;

pub use error::ToolError;
#[cfg(feature = "http")]
pub use registry::ToolRegistry;
pub use router::build_tool_router;
