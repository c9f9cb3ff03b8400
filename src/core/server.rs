//! MCP Server implementation and lifecycle management.
//!
//! This module contains the main server handler that implements the MCP
//! protocol by delegating to the tools domain.
//!
//! ## Tool Architecture
//!
//! Tools are defined in `domains/tools/definitions/`, grouped by area
//! (catalog, library, playlists). Each tool defines:
//! - Parameters struct (for rmcp)
//! - `execute()` method (core logic, against the shared [`AppleMusicClient`])
//! - `http_handler()` method (called via ToolRegistry for HTTP transport)
//!
//! The ToolRouter is built dynamically in `domains/tools/router.rs`.

use rmcp::{ServerHandler, handler::server::tool::ToolRouter, model::*, tool_handler};
use std::sync::Arc;
use tracing::info;

use super::config::Config;
use crate::domains::api::AppleMusicClient;
use crate::domains::tools::build_tool_router;

#[cfg(feature = "http")]
use crate::domains::tools::{ToolError, ToolRegistry};

const INSTRUCTIONS: &str = "Apple Music tools. search_music works with the developer \
credentials alone. Library, playlist, history and recommendation tools also need a \
Music User Token; when one is missing or expired they report an authentication error \
explaining how to provide a new one.";

/// The main MCP server handler.
///
/// Every clone shares one [`AppleMusicClient`], so the credential manager and
/// the response cache are process-wide.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Authenticated Apple Music request pipeline.
    client: Arc<AppleMusicClient>,

    /// Tool router for handling tool calls.
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    ///
    /// Fails before any network activity when the signing credentials are
    /// missing or unusable.
    pub fn new(config: Config) -> super::error::Result<Self> {
        let client = Arc::new(AppleMusicClient::from_config(&config.apple_music)?);
        info!(
            "Apple Music client ready (storefront: {})",
            client.storefront()
        );
        Ok(Self::with_client(config, client))
    }

    /// Create a server around an already-built client.
    pub fn with_client(config: Config, client: Arc<AppleMusicClient>) -> Self {
        Self {
            tool_router: build_tool_router::<Self>(client.clone()),
            config: Arc::new(config),
            client,
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The shared Apple Music client.
    pub fn client(&self) -> &Arc<AppleMusicClient> {
        &self.client
    }

    /// Instructions advertised to clients on initialize.
    pub fn instructions(&self) -> &'static str {
        INSTRUCTIONS
    }

    // ========================================================================
    // HTTP Transport Support Methods
    // ========================================================================

    /// List all available tools (for HTTP transport).
    pub fn list_tools(&self) -> Vec<serde_json::Value> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect()
    }

    /// Call a tool by name (for HTTP transport).
    #[cfg(feature = "http")]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        ToolRegistry::new(self.client.clone())
            .call_tool(name, arguments)
            .await
    }
}

/// ServerHandler implementation with tool_handler macro for automatic tool routing.
#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
