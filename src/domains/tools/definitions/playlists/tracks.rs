//! Lists the tracks of one library playlist.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use super::super::common::{
    SongListResult, SongSummary, api_error_result, clamp_limit, error_result,
    numbered_song_lines, structured_result,
};
use crate::domains::api::types::{ResourceList, SongAttributes};
use crate::domains::api::{AppleMusicClient, RequestOptions, endpoints};

const MAX_LIMIT: u32 = 100;
const CACHE_TTL: Duration = Duration::from_secs(2 * 60);

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetPlaylistTracksParams {
    #[schemars(description = "The playlist ID (from get_user_playlists)")]
    pub playlist_id: String,

    #[schemars(description = "Maximum number of tracks to return (1-100, default: 100)")]
    #[serde(default = "default_limit")]
    pub limit: u32,

    #[schemars(description = "Offset for pagination")]
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct GetPlaylistTracksTool;

impl GetPlaylistTracksTool {
    pub const NAME: &'static str = "get_playlist_tracks";

    pub const DESCRIPTION: &'static str =
        "Get the tracks in a specific playlist from the user's library";

    pub async fn execute(
        params: &GetPlaylistTracksParams,
        client: &AppleMusicClient,
    ) -> CallToolResult {
        if params.playlist_id.trim().is_empty() {
            return error_result("playlist_id must not be empty");
        }
        let Some(url) = endpoints::library_playlist_tracks(&params.playlist_id) else {
            return error_result(&format!(
                "Invalid playlist_id '{}': expected an ID from get_user_playlists",
                params.playlist_id
            ));
        };

        let limit = clamp_limit(params.limit, MAX_LIMIT);
        info!(
            "Listing tracks of playlist {} (limit {}, offset {})",
            params.playlist_id, limit, params.offset
        );

        let options = RequestOptions::get()
            .param("limit", limit)
            .param("offset", params.offset)
            .with_user_token()
            .cache_for(CACHE_TTL);

        let response: ResourceList<SongAttributes> = match client.execute(&url, options).await {
            Ok(response) => response,
            Err(e) => return api_error_result(&e),
        };

        let songs: Vec<SongSummary> = response.data.iter().map(SongSummary::from).collect();
        if songs.is_empty() {
            return structured_result(
                "This playlist has no tracks.".to_string(),
                SongListResult {
                    songs,
                    next_offset: None,
                },
            );
        }

        let mut lines = numbered_song_lines("Playlist Tracks", &songs, params.offset);
        let next_offset = response.has_more().then(|| params.offset + limit);
        if let Some(next) = next_offset {
            lines.push(format!(
                "\n*More tracks available. Use offset={} to see the next page.*",
                next
            ));
        }

        structured_result(lines.join("\n"), SongListResult { songs, next_offset })
    }

    #[cfg(feature = "http")]
    pub async fn http_handler(
        arguments: serde_json::Value,
        client: Arc<AppleMusicClient>,
    ) -> Result<serde_json::Value, String> {
        let params: GetPlaylistTracksParams = serde_json::from_value(arguments)
            .map_err(|e| format!("Invalid arguments for {}: {}", Self::NAME, e))?;
        let result = Self::execute(&params, &client).await;
        Ok(super::super::common::http_response(result))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<GetPlaylistTracksParams>(),
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
                let params: GetPlaylistTracksParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &client).await)
            }
            .boxed()
        })
    }
}
