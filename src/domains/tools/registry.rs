//! Tool Registry - central registration and dispatch for all tools.
//!
//! Only compiled with the `http` feature: the STDIO transport dispatches
//! through the rmcp `ToolRouter` instead.
//!
//! This module provides:
//! - A registry of all available tools
//! - HTTP dispatch for tool calls
//! - Tool metadata for listing

use std::sync::Arc;
use tracing::warn;

use rmcp::model::Tool;

use super::error::ToolError;
use crate::domains::api::AppleMusicClient;

use super::definitions::{
    AddTracksTool, CreatePlaylistTool, GetLibrarySongsTool, GetPlaylistTracksTool,
    GetRecentlyPlayedTool, GetRecommendationsTool, GetUserPlaylistsTool, RemoveTracksTool,
    SearchMusicTool,
};

/// Tool registry - lists every tool and dispatches HTTP calls.
pub struct ToolRegistry {
    client: Arc<AppleMusicClient>,
}

impl ToolRegistry {
    /// Create a new tool registry.
    pub fn new(client: Arc<AppleMusicClient>) -> Self {
        Self { client }
    }

    /// Get all tool names.
    pub fn tool_names(&self) -> Vec<&'static str> {
        vec![
            SearchMusicTool::NAME,
            GetUserPlaylistsTool::NAME,
            GetPlaylistTracksTool::NAME,
            CreatePlaylistTool::NAME,
            AddTracksTool::NAME,
            RemoveTracksTool::NAME,
            GetLibrarySongsTool::NAME,
            GetRecentlyPlayedTool::NAME,
            GetRecommendationsTool::NAME,
        ]
    }

    /// Get all tools as Tool models (metadata).
    pub fn get_all_tools() -> Vec<Tool> {
        vec![
            SearchMusicTool::to_tool(),
            GetUserPlaylistsTool::to_tool(),
            GetPlaylistTracksTool::to_tool(),
            CreatePlaylistTool::to_tool(),
            AddTracksTool::to_tool(),
            RemoveTracksTool::to_tool(),
            GetLibrarySongsTool::to_tool(),
            GetRecentlyPlayedTool::to_tool(),
            GetRecommendationsTool::to_tool(),
        ]
    }

    /// Dispatch an HTTP tool call to the appropriate handler.
    ///
    /// Upstream failures come back as an error *result*; only unknown tools
    /// and malformed arguments are errors here.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let client = self.client.clone();
        let result = match name {
            SearchMusicTool::NAME => SearchMusicTool::http_handler(arguments, client).await,
            GetUserPlaylistsTool::NAME => {
                GetUserPlaylistsTool::http_handler(arguments, client).await
            }
            GetPlaylistTracksTool::NAME => {
                GetPlaylistTracksTool::http_handler(arguments, client).await
            }
            CreatePlaylistTool::NAME => CreatePlaylistTool::http_handler(arguments, client).await,
            AddTracksTool::NAME => AddTracksTool::http_handler(arguments, client).await,
            RemoveTracksTool::NAME => RemoveTracksTool::http_handler(arguments, client).await,
            GetLibrarySongsTool::NAME => GetLibrarySongsTool::http_handler(arguments, client).await,
            GetRecentlyPlayedTool::NAME => {
                GetRecentlyPlayedTool::http_handler(arguments, client).await
            }
            GetRecommendationsTool::NAME => {
                GetRecommendationsTool::http_handler(arguments, client).await
            }
            _ => {
                warn!("Unknown tool requested: {}", name);
                return Err(ToolError::not_found(name));
            }
        };
        result.map_err(ToolError::invalid_arguments)
    }
}
