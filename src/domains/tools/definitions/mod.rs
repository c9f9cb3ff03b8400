//! Tool definitions module.
//!
//! Each tool is defined in its own file, grouped by the part of Apple Music
//! it touches.

pub mod catalog;
pub mod common;
pub mod library;
pub mod playlists;

pub use catalog::{SearchMusicParams, SearchMusicTool, SearchType};
pub use library::{
    GetLibrarySongsParams, GetLibrarySongsTool, GetRecentlyPlayedParams, GetRecentlyPlayedTool,
    GetRecommendationsParams, GetRecommendationsTool, GetUserPlaylistsParams,
    GetUserPlaylistsTool,
};
pub use playlists::{
    AddTracksParams, AddTracksTool, CreatePlaylistParams, CreatePlaylistTool,
    GetPlaylistTracksParams, GetPlaylistTracksTool, RemoveTracksParams, RemoveTracksTool,
};
