//! Recently played tracks.
//!
//! The API serves at most 10 tracks per request and 50 in total, and the
//! history changes often, so responses are only cached for a minute.

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
    SongListResult, SongSummary, api_error_result, clamp_limit, numbered_song_lines,
    structured_result,
};
use crate::domains::api::types::{ResourceList, SongAttributes};
use crate::domains::api::{AppleMusicClient, RequestOptions, endpoints};

const MAX_LIMIT: u32 = 10;
const CACHE_TTL: Duration = Duration::from_secs(60);

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetRecentlyPlayedParams {
    #[schemars(
        description = "Maximum number of tracks to return (1-10, API maximum is 10 per request)"
    )]
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct GetRecentlyPlayedTool;

impl GetRecentlyPlayedTool {
    pub const NAME: &'static str = "get_recently_played";

    pub const DESCRIPTION: &'static str = "Get the user's recently played tracks on Apple Music (up to 10 per request, 50 total with pagination)";

    pub async fn execute(
        params: &GetRecentlyPlayedParams,
        client: &AppleMusicClient,
    ) -> CallToolResult {
        let limit = clamp_limit(params.limit, MAX_LIMIT);
        info!("Fetching recently played tracks (limit {})", limit);

        let options = RequestOptions::get()
            .param("limit", limit)
            .with_user_token()
            .cache_for(CACHE_TTL);

        let response: ResourceList<SongAttributes> =
            match client.execute(&endpoints::recently_played(), options).await {
                Ok(response) => response,
                Err(e) => return api_error_result(&e),
            };

        let songs: Vec<SongSummary> = response.data.iter().map(SongSummary::from).collect();
        if songs.is_empty() {
            return structured_result(
                "No recently played tracks found.".to_string(),
                SongListResult {
                    songs,
                    next_offset: None,
                },
            );
        }

        let mut lines = numbered_song_lines("Recently Played", &songs, 0);
        if response.has_more() {
            lines.push(
                "\n*Note: Apple Music API provides up to 50 recently played tracks total.*"
                    .to_string(),
            );
        }

        structured_result(
            lines.join("\n"),
            SongListResult {
                songs,
                next_offset: None,
            },
        )
    }

    #[cfg(feature = "http")]
    pub async fn http_handler(
        arguments: serde_json::Value,
        client: Arc<AppleMusicClient>,
    ) -> Result<serde_json::Value, String> {
        let params: GetRecentlyPlayedParams = serde_json::from_value(arguments)
            .map_err(|e| format!("Invalid arguments for {}: {}", Self::NAME, e))?;
        let result = Self::execute(&params, &client).await;
        Ok(super::super::common::http_response(result))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<GetRecentlyPlayedParams>(),
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
                let params: GetRecentlyPlayedParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &client).await)
            }
            .boxed()
        })
    }
}
