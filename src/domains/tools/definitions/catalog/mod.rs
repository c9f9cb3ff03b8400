//! Catalog tools (developer token only).

pub mod search;

pub use search::{SearchMusicParams, SearchMusicTool, SearchType};
