//! Tool Router - builds the rmcp ToolRouter.
//!
//! Each tool knows how to create its own route; this module only lists them.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;

use crate::domains::api::AppleMusicClient;

use super::definitions::{
    AddTracksTool, CreatePlaylistTool, GetLibrarySongsTool, GetPlaylistTracksTool,
    GetRecentlyPlayedTool, GetRecommendationsTool, GetUserPlaylistsTool, RemoveTracksTool,
    SearchMusicTool,
};

/// Build the tool router with all registered tools.
pub fn build_tool_router<S>(client: Arc<AppleMusicClient>) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    ToolRouter::new()
        .with_route(SearchMusicTool::create_route(client.clone()))
        .with_route(GetUserPlaylistsTool::create_route(client.clone()))
        .with_route(GetPlaylistTracksTool::create_route(client.clone()))
        .with_route(CreatePlaylistTool::create_route(client.clone()))
        .with_route(AddTracksTool::create_route(client.clone()))
        .with_route(RemoveTracksTool::create_route(client.clone()))
        .with_route(GetLibrarySongsTool::create_route(client.clone()))
        .with_route(GetRecentlyPlayedTool::create_route(client.clone()))
        .with_route(GetRecommendationsTool::create_route(client))
}
