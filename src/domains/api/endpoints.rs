//! Apple Music API endpoint URLs.
//!
//! Catalog endpoints need only the developer token; everything under `/me`
//! also needs the Music User Token.

use reqwest::Url;

/// API root.
pub const BASE_URL: &str = "https://api.music.apple.com/v1";

/// Percent-encode a caller-supplied id as a single path segment.
///
/// Returns `None` for ids that could address another resource: empty,
/// `.`/`..`, or containing a path, query or fragment delimiter.
pub fn path_segment(id: &str) -> Option<String> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '?', '#']) {
        return None;
    }
    let mut url = Url::parse(BASE_URL).ok()?;
    url.path_segments_mut().ok()?.clear().push(id);
    url.path().strip_prefix('/').map(str::to_string)
}

pub fn catalog_search(storefront: &str) -> String {
    format!("{BASE_URL}/catalog/{storefront}/search")
}

pub fn library_playlists() -> String {
    format!("{BASE_URL}/me/library/playlists")
}

/// Tracks of one library playlist, or `None` when the id is not a valid segment.
pub fn library_playlist_tracks(id: &str) -> Option<String> {
    let segment = path_segment(id)?;
    Some(format!("{BASE_URL}/me/library/playlists/{segment}/tracks"))
}

pub fn library_songs() -> String {
    format!("{BASE_URL}/me/library/songs")
}

pub fn recently_played() -> String {
    format!("{BASE_URL}/me/recent/played/tracks")
}

pub fn recommendations() -> String {
    format!("{BASE_URL}/me/recommendations")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_urls() {
        assert_eq!(
            catalog_search("us"),
            "https://api.music.apple.com/v1/catalog/us/search"
        );
    }

    #[test]
    fn test_library_urls() {
        assert_eq!(
            library_playlist_tracks("p.abc").unwrap(),
            "https://api.music.apple.com/v1/me/library/playlists/p.abc/tracks"
        );
        assert!(library_playlist_tracks("p.abc").unwrap().starts_with(&library_playlists()));
        assert!(library_songs().ends_with("/me/library/songs"));
        assert!(recently_played().ends_with("/me/recent/played/tracks"));
        assert!(recommendations().ends_with("/me/recommendations"));
    }

    #[test]
    fn test_path_segment_encoding() {
        assert_eq!(path_segment("p.abc").as_deref(), Some("p.abc"));
        assert_eq!(path_segment("my list").as_deref(), Some("my%20list"));
        assert_eq!(path_segment("100%").as_deref(), Some("100%25"));
        assert_eq!(
            library_playlist_tracks("my list").unwrap(),
            "https://api.music.apple.com/v1/me/library/playlists/my%20list/tracks"
        );
    }

    #[test]
    fn test_path_segment_rejects_traversal() {
        for id in ["", ".", "..", "../../songs", "a/b", "a\\b", "p.1?x=1", "p.1#f"] {
            assert!(path_segment(id).is_none(), "accepted {id:?}");
            assert!(library_playlist_tracks(id).is_none());
        }
    }
}
