//! Adds catalog songs to a library playlist.

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

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddTracksParams {
    #[schemars(description = "The playlist ID (from get_user_playlists)")]
    pub playlist_id: String,

    #[schemars(
        description = "Array of catalog song IDs to add (from search_music). Max 100 per request."
    )]
    pub track_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AddTracksTool;

impl AddTracksTool {
    pub const NAME: &'static str = "add_tracks_to_playlist";

    pub const DESCRIPTION: &'static str =
        "Add tracks to an existing playlist in the user's Apple Music library";

    pub async fn execute(params: &AddTracksParams, client: &AppleMusicClient) -> CallToolResult {
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
            "Adding {} track(s) to playlist {}",
            params.track_ids.len(),
            params.playlist_id
        );

        let options = RequestOptions::post(song_references(&params.track_ids)).with_user_token();
        if let Err(e) = client.execute_value(&url, options).await {
            return api_error_result(&e);
        }

        if let Some(pattern) = playlist_pattern(&params.playlist_id) {
            let dropped = client.cache().invalidate_pattern(&pattern);
            debug!("Invalidated {} cached read(s) of {}", dropped, params.playlist_id);
        }

        success_result(format!(
            "Successfully added {} track(s) to playlist {}.",
            params.track_ids.len(),
            params.playlist_id
        ))
    }

    #[cfg(feature = "http")]
    pub async fn http_handler(
        arguments: serde_json::Value,
        client: Arc<AppleMusicClient>,
    ) -> Result<serde_json::Value, String> {
        let params: AddTracksParams = serde_json::from_value(arguments)
            .map_err(|e| format!("Invalid arguments for {}: {}", Self::NAME, e))?;
        let result = Self::execute(&params, &client).await;
        Ok(super::super::common::http_response(result))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<AddTracksParams>(),
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
                let params: AddTracksParams =
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
    use crate::domains::api::{Method, UpstreamResponse};
    use crate::domains::api::testing::scripted_client;
    use crate::domains::tools::definitions::common::result_text;
    use serde_json::json;
    use std::time::Duration;

    const PLAYLISTS: &str = "https://api.music.apple.com/v1/me/library/playlists";

    #[tokio::test]
    async fn test_add_invalidates_only_that_playlist() {
        let (client, upstream) = scripted_client(vec![UpstreamResponse::new(204)], Some("user"));
        let ttl = Duration::from_secs(60);
        client.cache().set(format!("{PLAYLISTS}/p.1/tracks?limit=100&offset=0"), json!({}), ttl);
        client.cache().set(format!("{PLAYLISTS}/p.1/tracks?limit=100&offset=100"), json!({}), ttl);
        client.cache().set(format!("{PLAYLISTS}/p.2/tracks?limit=100&offset=0"), json!({}), ttl);

        let params = AddTracksParams {
            playlist_id: "p.1".into(),
            track_ids: vec!["1440857781".into()],
        };
        let result = AddTracksTool::execute(&params, &client).await;

        assert_eq!(
            result_text(&result),
            "Successfully added 1 track(s) to playlist p.1."
        );
        assert_eq!(client.cache().len(), 1);
        assert!(client
            .cache()
            .get(&format!("{PLAYLISTS}/p.2/tracks?limit=100&offset=0"))
            .is_some());

        let request = &upstream.requests()[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, format!("{PLAYLISTS}/p.1/tracks"));
        assert_eq!(
            request.body,
            Some(json!({ "data": [{ "id": "1440857781", "type": "songs" }] }))
        );
    }

    #[tokio::test]
    async fn test_empty_track_list_is_rejected() {
        let (client, upstream) = scripted_client(vec![], Some("user"));
        let params = AddTracksParams {
            playlist_id: "p.1".into(),
            track_ids: vec![],
        };
        let result = AddTracksTool::execute(&params, &client).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_add_invalidates_id_that_needs_encoding() {
        let (client, upstream) = scripted_client(vec![UpstreamResponse::new(204)], Some("user"));
        let ttl = Duration::from_secs(60);
        client.cache().set(format!("{PLAYLISTS}/my%20list/tracks?limit=100&offset=0"), json!({}), ttl);

        let params = AddTracksParams {
            playlist_id: "my list".into(),
            track_ids: vec!["1".into()],
        };
        let result = AddTracksTool::execute(&params, &client).await;

        assert_ne!(result.is_error, Some(true));
        assert!(client.cache().is_empty());
        assert_eq!(upstream.requests()[0].url, format!("{PLAYLISTS}/my%20list/tracks"));
    }

    #[tokio::test]
    async fn test_path_traversal_id_is_rejected() {
        let (client, upstream) = scripted_client(vec![UpstreamResponse::new(204)], Some("user"));
        let params = AddTracksParams {
            playlist_id: "../../songs".into(),
            track_ids: vec!["1".into()],
        };
        let result = AddTracksTool::execute(&params, &client).await;

        assert_eq!(result.is_error, Some(true));
        assert!(result_text(&result).contains("Invalid playlist_id"));
        assert_eq!(upstream.calls(), 0);
    }
}
