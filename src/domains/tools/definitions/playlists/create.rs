//! Creates a playlist in the user's library.

use std::sync::Arc;

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::super::common::{
    api_error_result, error_result, library_playlists_pattern, song_references, structured_result,
};
use crate::domains::api::types::{PlaylistAttributes, ResourceList};
use crate::domains::api::{AppleMusicClient, RequestOptions, endpoints};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreatePlaylistParams {
    #[schemars(description = "Name of the playlist")]
    pub name: String,

    #[schemars(description = "Description of the playlist")]
    #[serde(default)]
    pub description: Option<String>,

    #[schemars(
        description = "Array of catalog song IDs to add to the new playlist (from search_music)"
    )]
    #[serde(default)]
    pub track_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CreatePlaylistResult {
    pub id: String,
    pub name: String,
    pub tracks_added: usize,
}

#[derive(Debug, Clone)]
pub struct CreatePlaylistTool;

impl CreatePlaylistTool {
    pub const NAME: &'static str = "create_playlist";

    pub const DESCRIPTION: &'static str = "Create a new playlist in the user's Apple Music library";

    fn request_body(params: &CreatePlaylistParams) -> serde_json::Value {
        let mut attributes = json!({ "name": params.name });
        if let Some(description) = params.description.as_deref().filter(|d| !d.is_empty()) {
            attributes["description"] = json!(description);
        }

        let mut body = json!({ "attributes": attributes });
        if !params.track_ids.is_empty() {
            body["relationships"] = json!({ "tracks": song_references(&params.track_ids) });
        }
        body
    }

    pub async fn execute(params: &CreatePlaylistParams, client: &AppleMusicClient) -> CallToolResult {
        if params.name.trim().is_empty() {
            return error_result("Playlist name must not be empty");
        }

        info!("Creating playlist '{}'", params.name);

        let options = RequestOptions::post(Self::request_body(params)).with_user_token();
        let response: ResourceList<PlaylistAttributes> =
            match client.execute(&endpoints::library_playlists(), options).await {
                Ok(response) => response,
                Err(e) => return api_error_result(&e),
            };

        if let Some(pattern) = library_playlists_pattern() {
            let dropped = client.cache().invalidate_pattern(&pattern);
            debug!("Invalidated {} cached playlist read(s)", dropped);
        }

        let Some(created) = response.data.into_iter().next() else {
            return error_result("Playlist was created but the response did not include it");
        };

        let result = CreatePlaylistResult {
            name: created
                .attributes
                .map(|a| a.name)
                .unwrap_or_else(|| params.name.clone()),
            id: created.id,
            tracks_added: params.track_ids.len(),
        };

        let mut lines = vec![
            "Playlist created successfully!".to_string(),
            format!("- **Name:** {}", result.name),
            format!("- **ID:** {}", result.id),
        ];
        if result.tracks_added > 0 {
            lines.push(format!("- **Tracks added:** {}", result.tracks_added));
        }
        lines.push(format!(
            "\nYou can add more tracks with the add_tracks_to_playlist tool using playlist ID: {}",
            result.id
        ));

        structured_result(lines.join("\n"), result)
    }

    #[cfg(feature = "http")]
    pub async fn http_handler(
        arguments: serde_json::Value,
        client: Arc<AppleMusicClient>,
    ) -> Result<serde_json::Value, String> {
        let params: CreatePlaylistParams = serde_json::from_value(arguments)
            .map_err(|e| format!("Invalid arguments for {}: {}", Self::NAME, e))?;
        let result = Self::execute(&params, &client).await;
        Ok(super::super::common::http_response(result))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<CreatePlaylistParams>(),
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
                let params: CreatePlaylistParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &client).await)
            }
            .boxed()
        })
    }
}
