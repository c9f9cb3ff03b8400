//! Removes tracks from a library playlist.
//!
//! The REST API refuses track removal for many playlists. Those refusals
//! (404/405) are answered with a workaround instead of a bare API error.

use std::sync::Arc;

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, info};

use super::super::common::{
    api_error_result, error_result, playlist_pattern, song_references, success_result,
};
use crate::domains::api::{AppleMusicClient, RequestOptions, endpoints};

/// Shown when the API does not allow removing tracks from this playlist.
pub const UNSUPPORTED_REMOVAL: &str = "Apple Music API does not support removing individual tracks from this playlist via the REST API. This is a known limitation.\n\n**Workaround:** Create a new playlist with only the tracks you want to keep:\n1. Use `get_playlist_tracks` to list all current tracks\n2. Use `create_playlist` with the desired track IDs";

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveTracksParams {
    #[schemars(description = "The playlist ID (from get_user_playlists)")]
    pub playlist_id: String,

    #[schemars(description = "Array of song IDs to remove from the playlist")]
    pub track_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RemoveTracksTool;

impl RemoveTracksTool {
    pub const NAME: &'static str = "remove_tracks_from_playlist";

    pub const DESCRIPTION: &'static str = "Remove tracks from a playlist. Note: Apple Music API has limited support for track removal - this may not work for all playlist types.";

    pub async fn execute(params: &RemoveTracksParams, client: &AppleMusicClient) -> CallToolResult {
        if params.playlist_id.trim().is_empty() {
            return error_result("playlist_id must not be empty");
        }
        let Some(url) = endpoints::library_playlist_tracks(&params.playlist_id) else {
            return error_result(&format!(
                "Invalid playlist_id '{}': expected an ID from get_user_playlists",
                params.playlist_id
            ));
        };
        if params.track_ids.is_empty() {
            return error_result("track_ids must contain at least one song ID");
        }

        info!(
            "Removing {} track(s) from playlist {}",
            params.track_ids.len(),
            params.playlist_id
        );

        let options =
            RequestOptions::delete(Some(song_references(&params.track_ids))).with_user_token();
        if let Err(e) = client.execute_value(&url, options).await {
            return match e.status_code() {
                Some(404 | 405) => error_result(UNSUPPORTED_REMOVAL),
                _ => api_error_result(&e),
            };
        }

        if let Some(pattern) = playlist_pattern(&params.playlist_id) {
            let dropped = client.cache().invalidate_pattern(&pattern);
            debug!("Invalidated {} cached read(s) of {}", dropped, params.playlist_id);
        }

        success_result(format!(
            "Successfully removed {} track(s) from playlist {}.",
            params.track_ids.len(),
            params.playlist_id
        ))
    }

    #[cfg(feature = "http")]
    pub async fn http_handler(
        arguments: serde_json::Value,
        client: Arc<AppleMusicClient>,
    ) -> Result<serde_json::Value, String> {
        let params: RemoveTracksParams = serde_json::from_value(arguments)
            .map_err(|e| format!("Invalid arguments for {}: {}", Self::NAME, e))?;
        let result = Self::execute(&params, &client).await;
        Ok(super::super::common::http_response(result))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<RemoveTracksParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    pub fn create_route<S>(client: Arc<AppleMusicClient>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let client = client.clone();
            async move {
                let params: RemoveTracksParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &client).await)
            }
            .boxed()
        })
    }
}
