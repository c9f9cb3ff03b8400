//! Lists songs saved in the user's library.

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

const MAX_LIMIT: u32 = 100;
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

fn default_limit() -> u32 {
    25
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetLibrarySongsParams {
    #[schemars(description = "Maximum number of songs to return (1-100, default: 25)")]
    #[serde(default = "default_limit")]
    pub limit: u32,

    #[schemars(description = "Offset for pagination")]
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct GetLibrarySongsTool;

impl GetLibrarySongsTool {
    pub const NAME: &'static str = "get_library_songs";

    pub const DESCRIPTION: &'static str = "Get songs from the user's Apple Music library";

    pub async fn execute(params: &GetLibrarySongsParams, client: &AppleMusicClient) -> CallToolResult {
        let limit = clamp_limit(params.limit, MAX_LIMIT);
        info!("Listing library songs (limit {}, offset {})", limit, params.offset);

        let options = RequestOptions::get()
            .param("limit", limit)
            .param("offset", params.offset)
            .with_user_token()
            .cache_for(CACHE_TTL);

        let response: ResourceList<SongAttributes> =
            match client.execute(&endpoints::library_songs(), options).await {
                Ok(response) => response,
                Err(e) => return api_error_result(&e),
            };

        let songs: Vec<SongSummary> = response.data.iter().map(SongSummary::from).collect();
        if songs.is_empty() {
            return structured_result(
                "No songs found in your library.".to_string(),
                SongListResult {
                    songs,
                    next_offset: None,
                },
            );
        }

        let mut lines = numbered_song_lines("Library Songs", &songs, params.offset);
        let next_offset = response.has_more().then(|| params.offset + limit);
        if let Some(next) = next_offset {
            lines.push(format!(
                "\n*More songs available. Use offset={} to see the next page.*",
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
        let params: GetLibrarySongsParams = serde_json::from_value(arguments)
            .map_err(|e| format!("Invalid arguments for {}: {}", Self::NAME, e))?;
        let result = Self::execute(&params, &client).await;
        Ok(super::super::common::http_response(result))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<GetLibrarySongsParams>(),
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
                let params: GetLibrarySongsParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &client).await)
            }
            .boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::api::UpstreamResponse;
    use crate::domains::api::testing::scripted_client;
    use crate::domains::tools::definitions::common::result_text;
    use serde_json::json;

    #[tokio::test]
    async fn test_numbering_follows_offset() {
        let body = json!({
            "data": [{ "id": "i.9", "type": "library-songs", "attributes": {
                "name": "Around the World", "artistName": "Daft Punk",
                "albumName": "Homework", "durationInMillis": 429000 } }]
        });
        let (client, upstream) =
            scripted_client(vec![UpstreamResponse::new(200).with_json(&body)], Some("user"));
        let params = GetLibrarySongsParams { limit: 25, offset: 50 };

        let result = GetLibrarySongsTool::execute(&params, &client).await;
        let text = result_text(&result);

        assert!(text.starts_with("## Library Songs"));
        assert!(text.contains(
            "51. **Around the World** by Daft Punk (Homework, 7:09) [ID: i.9]"
        ));
        assert!(!text.contains("More songs available"));
        assert_eq!(upstream.requests()[0].header("Music-User-Token"), Some("user"));
    }

    #[tokio::test]
    async fn test_empty_library() {
        let (client, _) = scripted_client(
            vec![UpstreamResponse::new(200).with_json(&json!({ "data": [] }))],
            Some("user"),
        );
        let params = GetLibrarySongsParams { limit: 500, offset: 0 };

        let result = GetLibrarySongsTool::execute(&params, &client).await;
        assert_eq!(result_text(&result), "No songs found in your library.");
    }
}
