//! Playlist tools: read and modify playlists in the user's library.
//!
//! Mutations invalidate cached reads of the affected playlist family.

pub mod add_tracks;
pub mod create;
pub mod remove_tracks;
pub mod tracks;

pub use add_tracks::{AddTracksParams, AddTracksTool};
pub use create::{CreatePlaylistParams, CreatePlaylistTool};
pub use remove_tracks::{RemoveTracksParams, RemoveTracksTool};
pub use tracks::{GetPlaylistTracksParams, GetPlaylistTracksTool};
