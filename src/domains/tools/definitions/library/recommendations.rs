//! Personalized recommendations.

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
use serde_json::Value;
use tracing::info;

use super::super::common::{api_error_result, clamp_limit, structured_result};
use crate::domains::api::types::{Recommendation, RecommendationList, Resource};
use crate::domains::api::{AppleMusicClient, RequestOptions, endpoints};

const MAX_LIMIT: u32 = 30;
const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetRecommendationsParams {
    #[schemars(description = "Maximum number of recommendation groups to return (1-30)")]
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RecommendedItem {
    pub id: String,
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RecommendationGroup {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub items: Vec<RecommendedItem>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RecommendationsResult {
    pub groups: Vec<RecommendationGroup>,
}

#[derive(Debug, Clone)]
pub struct GetRecommendationsTool;

impl GetRecommendationsTool {
    pub const NAME: &'static str = "get_recommendations";

    pub const DESCRIPTION: &'static str =
        "Get personalized music recommendations from Apple Music based on listening history";

    pub async fn execute(
        params: &GetRecommendationsParams,
        client: &AppleMusicClient,
    ) -> CallToolResult {
        let limit = clamp_limit(params.limit, MAX_LIMIT);
        info!("Fetching recommendations (limit {})", limit);

        let options = RequestOptions::get()
            .param("limit", limit)
            .with_user_token()
            .cache_for(CACHE_TTL);

        let response: RecommendationList =
            match client.execute(&endpoints::recommendations(), options).await {
                Ok(response) => response,
                Err(e) => return api_error_result(&e),
            };

        let groups: Vec<RecommendationGroup> = response.data.iter().map(Self::group).collect();
        if groups.is_empty() {
            return structured_result(
                "No recommendations available.".to_string(),
                RecommendationsResult { groups },
            );
        }

        let mut lines = vec!["## Personalized Recommendations\n".to_string()];
        for group in &groups {
            lines.push(format!("### {}", group.title));
            if let Some(reason) = &group.reason {
                lines.push(format!("*{}*\n", reason));
            }
            lines.extend(group.items.iter().map(Self::item_line));
            lines.push(String::new());
        }

        structured_result(lines.join("\n"), RecommendationsResult { groups })
    }

    fn group(rec: &Recommendation) -> RecommendationGroup {
        let attrs = rec.attributes.clone().unwrap_or_default();
        let items = rec
            .relationships
            .as_ref()
            .and_then(|r| r.contents.as_ref())
            .map(|contents| contents.data.iter().map(Self::item).collect())
            .unwrap_or_default();

        RecommendationGroup {
            title: attrs
                .title
                .map(|t| t.string_for_display)
                .unwrap_or_else(|| "Recommended".to_string()),
            reason: attrs
                .reason
                .map(|r| r.string_for_display)
                .filter(|r| !r.is_empty()),
            items,
        }
    }

    fn item(resource: &Resource<Value>) -> RecommendedItem {
        let field = |name: &str| {
            resource
                .attributes
                .as_ref()
                .and_then(|a| a.get(name))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        RecommendedItem {
            id: resource.id.clone(),
            kind: resource.kind.clone(),
            name: field("name").unwrap_or_else(|| "Unknown".to_string()),
            artist: field("artistName"),
        }
    }

    fn item_line(item: &RecommendedItem) -> String {
        let artist = item.artist.as_deref().unwrap_or("Unknown Artist");
        match item.kind.as_str() {
            "albums" | "library-albums" => {
                format!("- Album: **{}** by {} [ID: {}]", item.name, artist, item.id)
            }
            "playlists" | "library-playlists" => {
                format!("- Playlist: **{}** [ID: {}]", item.name, item.id)
            }
            "songs" | "library-songs" => {
                format!("- Song: **{}** by {} [ID: {}]", item.name, artist, item.id)
            }
            other => format!("- {}: **{}** [ID: {}]", other, item.name, item.id),
        }
    }

    #[cfg(feature = "http")]
    pub async fn http_handler(
        arguments: serde_json::Value,
        client: Arc<AppleMusicClient>,
    ) -> Result<serde_json::Value, String> {
        let params: GetRecommendationsParams = serde_json::from_value(arguments)
            .map_err(|e| format!("Invalid arguments for {}: {}", Self::NAME, e))?;
        let result = Self::execute(&params, &client).await;
        Ok(super::super::common::http_response(result))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<GetRecommendationsParams>(),
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
                let params: GetRecommendationsParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &client).await)
            }
            .boxed()
        })
    }
}
