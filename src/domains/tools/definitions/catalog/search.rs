//! Apple Music catalog search tool.
//!
//! Searches one storefront for songs, albums, artists and playlists. Needs
//! only the developer token; results are cached for five minutes.

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

use super::super::common::{SongSummary, api_error_result, clamp_limit, structured_result};
use crate::domains::api::types::SearchResponse;
use crate::domains::api::{AppleMusicClient, RequestOptions, endpoints};

const MAX_LIMIT: u32 = 25;
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Resource types accepted by catalog search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Songs,
    Albums,
    Artists,
    Playlists,
}

impl SearchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Songs => "songs",
            Self::Albums => "albums",
            Self::Artists => "artists",
            Self::Playlists => "playlists",
        }
    }
}

fn default_types() -> Vec<SearchType> {
    vec![SearchType::Songs, SearchType::Albums, SearchType::Artists]
}

fn default_limit() -> u32 {
    10
}

/// Parameters for catalog search.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchMusicParams {
    #[schemars(description = "Search term (artist name, song title, album name, etc.)")]
    pub query: String,

    #[schemars(description = "Types of results to return (default: songs, albums, artists)")]
    #[serde(default = "default_types")]
    pub types: Vec<SearchType>,

    #[schemars(description = "Maximum results per type (1-25, default: 10)")]
    #[serde(default = "default_limit")]
    pub limit: u32,

    #[schemars(description = "ISO 3166 alpha-2 country code (default: configured storefront)")]
    #[serde(default)]
    pub storefront: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Structured output for catalog search.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct SearchMusicResult {
    pub query: String,
    pub storefront: String,
    pub songs: Vec<SongSummary>,
    pub albums: Vec<CatalogItem>,
    pub artists: Vec<CatalogItem>,
    pub playlists: Vec<CatalogItem>,
}

impl SearchMusicResult {
    fn is_empty(&self) -> bool {
        self.songs.is_empty()
            && self.albums.is_empty()
            && self.artists.is_empty()
            && self.playlists.is_empty()
    }
}

/// Catalog search tool implementation.
#[derive(Debug, Clone)]
pub struct SearchMusicTool;

impl SearchMusicTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "search_music";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str =
        "Search the Apple Music catalog for songs, albums, artists, and playlists";

    /// Execute the tool logic.
    pub async fn execute(params: &SearchMusicParams, client: &AppleMusicClient) -> CallToolResult {
        let storefront = params
            .storefront
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(client.storefront())
            .to_lowercase();
        let types = if params.types.is_empty() {
            default_types()
        } else {
            params.types.clone()
        };
        let types: Vec<&str> = types.iter().map(|t| t.as_str()).collect();

        info!("Searching catalog ({}) for: {}", storefront, params.query);

        let options = RequestOptions::get()
            .param("term", &params.query)
            .param("types", types.join(","))
            .param("limit", clamp_limit(params.limit, MAX_LIMIT))
            .cache_for(CACHE_TTL);

        let response: SearchResponse = match client
            .execute(&endpoints::catalog_search(&storefront), options)
            .await
        {
            Ok(response) => response,
            Err(e) => return api_error_result(&e),
        };

        let result = Self::collect(&params.query, &storefront, response);
        structured_result(Self::render(&result), result)
    }

    fn collect(query: &str, storefront: &str, response: SearchResponse) -> SearchMusicResult {
        let results = response.results;
        let mut out = SearchMusicResult {
            query: query.to_string(),
            storefront: storefront.to_string(),
            ..Default::default()
        };

        if let Some(songs) = results.songs {
            out.songs = songs.data.iter().map(SongSummary::from).collect();
        }
        if let Some(albums) = results.albums {
            out.albums = albums
                .data
                .into_iter()
                .map(|album| {
                    let attrs = album.attributes.unwrap_or_default();
                    let mut detail = format!("{} tracks", attrs.track_count);
                    if let Some(date) = attrs.release_date {
                        detail.push_str(&format!(", {}", date));
                    }
                    CatalogItem {
                        id: album.id,
                        name: format!("{} by {}", attrs.name, attrs.artist_name),
                        detail: Some(detail),
                    }
                })
                .collect();
        }
        if let Some(artists) = results.artists {
            out.artists = artists
                .data
                .into_iter()
                .map(|artist| {
                    let attrs = artist.attributes.unwrap_or_default();
                    CatalogItem {
                        id: artist.id,
                        name: attrs.name,
                        detail: (!attrs.genre_names.is_empty())
                            .then(|| attrs.genre_names.join(", ")),
                    }
                })
                .collect();
        }
        if let Some(playlists) = results.playlists {
            out.playlists = playlists
                .data
                .into_iter()
                .map(|playlist| CatalogItem {
                    id: playlist.id,
                    name: playlist.attributes.unwrap_or_default().name,
                    detail: None,
                })
                .collect();
        }
        out
    }

    fn render(result: &SearchMusicResult) -> String {
        if result.is_empty() {
            return "No results found.".to_string();
        }

        let mut sections: Vec<String> = Vec::new();
        if !result.songs.is_empty() {
            let mut lines = vec!["## Songs".to_string()];
            lines.extend(result.songs.iter().map(|s| {
                format!(
                    "- **{}** by {} ({}, {}) [ID: {}]",
                    s.name, s.artist, s.album, s.duration, s.id
                )
            }));
            sections.push(lines.join("\n"));
        }
        for (title, items) in [
            ("Albums", &result.albums),
            ("Artists", &result.artists),
            ("Playlists", &result.playlists),
        ] {
            if items.is_empty() {
                continue;
            }
            let mut lines = vec![format!("## {}", title)];
            lines.extend(items.iter().map(|item| match &item.detail {
                Some(detail) => format!("- **{}** ({}) [ID: {}]", item.name, detail, item.id),
                None => format!("- **{}** [ID: {}]", item.name, item.id),
            }));
            sections.push(lines.join("\n"));
        }
        sections.join("\n\n")
    }

    /// HTTP handler for this tool (for HTTP transport).
    #[cfg(feature = "http")]
    pub async fn http_handler(
        arguments: serde_json::Value,
        client: Arc<AppleMusicClient>,
    ) -> Result<serde_json::Value, String> {
        let params: SearchMusicParams = serde_json::from_value(arguments)
            .map_err(|e| format!("Invalid arguments for {}: {}", Self::NAME, e))?;
        let result = Self::execute(&params, &client).await;
        Ok(super::super::common::http_response(result))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<SearchMusicParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Create a ToolRoute for STDIO transport.
    pub fn create_route<S>(client: Arc<AppleMusicClient>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let client = client.clone();
            async move {
                let params: SearchMusicParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &client).await)
            }
            .boxed()
        })
    }
}
