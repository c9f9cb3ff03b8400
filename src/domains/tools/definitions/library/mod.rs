//! Library tools: read the user's playlists, songs, history and recommendations.
//!
//! Every tool here requires the Music User Token.

pub mod playlists;
pub mod recently_played;
pub mod recommendations;
pub mod songs;

pub use playlists::{GetUserPlaylistsParams, GetUserPlaylistsTool};
pub use recently_played::{GetRecentlyPlayedParams, GetRecentlyPlayedTool};
pub use recommendations::{GetRecommendationsParams, GetRecommendationsTool};
pub use songs::{GetLibrarySongsParams, GetLibrarySongsTool};
