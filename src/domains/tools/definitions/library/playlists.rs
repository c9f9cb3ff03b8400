//! Lists playlists in the user's library.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::super::common::{api_error_result, clamp_limit, structured_result};
use crate::domains::api::types::{PlaylistAttributes, ResourceList};
use crate::domains::api::{AppleMusicClient, RequestOptions, endpoints};

const MAX_LIMIT: u32 = 100;
const CACHE_TTL: Duration = Duration::from_secs(2 * 60);

fn default_limit() -> u32 {
    25
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetUserPlaylistsParams {
    #[schemars(description = "Maximum number of playlists to return (1-100, default: 25)")]
    #[serde(default = "default_limit")]
    pub limit: u32,

    #[schemars(description = "Offset for pagination")]
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PlaylistInfo {
    pub id: String,
    pub name: String,
    pub editable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct UserPlaylistsResult {
    pub playlists: Vec<PlaylistInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct GetUserPlaylistsTool;

impl GetUserPlaylistsTool {
    pub const NAME: &'static str = "get_user_playlists";

    pub const DESCRIPTION: &'static str = "List all playlists from the user's Apple Music library";

    pub async fn execute(
        params: &GetUserPlaylistsParams,
        client: &AppleMusicClient,
    ) -> CallToolResult {
        let limit = clamp_limit(params.limit, MAX_LIMIT);
        info!("Listing library playlists (limit {}, offset {})", limit, params.offset);

        let options = RequestOptions::get()
            .param("limit", limit)
            .param("offset", params.offset)
            .with_user_token()
            .cache_for(CACHE_TTL);

        let response: ResourceList<PlaylistAttributes> =
            match client.execute(&endpoints::library_playlists(), options).await {
                Ok(response) => response,
                Err(e) => return api_error_result(&e),
            };

        let playlists: Vec<PlaylistInfo> = response
            .data
            .iter()
            .map(|playlist| {
                let attrs = playlist.attributes.clone().unwrap_or_default();
                PlaylistInfo {
                    id: playlist.id.clone(),
                    name: attrs.name,
                    editable: attrs.can_edit.unwrap_or(false),
                    description: attrs
                        .description
                        .and_then(|d| d.standard)
                        .filter(|d| !d.is_empty()),
                }
            })
            .collect();

        if playlists.is_empty() {
            return structured_result(
                "No playlists found in your library.".to_string(),
                UserPlaylistsResult {
                    playlists,
                    next_offset: None,
                },
            );
        }

        let mut lines = vec!["## Your Playlists\n".to_string()];
        for p in &playlists {
            let editable = if p.editable { "editable" } else { "read-only" };
            let desc = p
                .description
                .as_ref()
                .map(|d| format!(" - {}", d))
                .unwrap_or_default();
            lines.push(format!("- **{}** ({}){} [ID: {}]", p.name, editable, desc, p.id));
        }

        let next_offset = response.has_more().then(|| params.offset + limit);
        if let Some(next) = next_offset {
            lines.push(format!(
                "\n*More playlists available. Use offset={} to see the next page.*",
                next
            ));
        }

        structured_result(
            lines.join("\n"),
            UserPlaylistsResult {
                playlists,
                next_offset,
            },
        )
    }

    #[cfg(feature = "http")]
    pub async fn http_handler(
        arguments: serde_json::Value,
        client: Arc<AppleMusicClient>,
    ) -> Result<serde_json::Value, String> {
        let params: GetUserPlaylistsParams = serde_json::from_value(arguments)
            .map_err(|e| format!("Invalid arguments for {}: {}", Self::NAME, e))?;
        let result = Self::execute(&params, &client).await;
        Ok(super::super::common::http_response(result))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<GetUserPlaylistsParams>(),
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
                let params: GetUserPlaylistsParams =
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
    async fn test_lists_playlists_with_next_page_hint() {
        let body = json!({
            "data": [
                { "id": "p.A", "type": "library-playlists", "attributes": {
                    "name": "Road Trip", "canEdit": true,
                    "description": { "standard": "Long drives" } } },
                { "id": "p.B", "type": "library-playlists", "attributes": {
                    "name": "Favourites", "canEdit": false } }
            ],
            "next": "/v1/me/library/playlists?offset=2"
        });
        let (client, upstream) =
            scripted_client(vec![UpstreamResponse::new(200).with_json(&body)], Some("user"));
        let params = GetUserPlaylistsParams { limit: 2, offset: 0 };

        let result = GetUserPlaylistsTool::execute(&params, &client).await;
        let text = result_text(&result);

        assert!(text.contains("- **Road Trip** (editable) - Long drives [ID: p.A]"));
        assert!(text.contains("- **Favourites** (read-only) [ID: p.B]"));
        assert!(text.contains("Use offset=2 to see the next page"));
        assert_eq!(result.structured_content.unwrap()["next_offset"], 2);
        assert!(upstream.requests()[0].url.ends_with("/me/library/playlists?limit=2&offset=0"));
    }

    #[tokio::test]
    async fn test_empty_library() {
        let (client, _) = scripted_client(
            vec![UpstreamResponse::new(200).with_json(&json!({ "data": [] }))],
            Some("user"),
        );
        let params: GetUserPlaylistsParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.limit, 25);

        let result = GetUserPlaylistsTool::execute(&params, &client).await;
        assert_eq!(result_text(&result), "No playlists found in your library.");
    }

    #[tokio::test]
    async fn test_requires_user_token() {
        let (client, upstream) = scripted_client(vec![], None);
        let params = GetUserPlaylistsParams { limit: 25, offset: 0 };

        let result = GetUserPlaylistsTool::execute(&params, &client).await;
        assert_eq!(result.is_error, Some(true));
        assert!(result_text(&result).starts_with("Authentication Error:"));
        assert_eq!(upstream.calls(), 0);
    }
}
