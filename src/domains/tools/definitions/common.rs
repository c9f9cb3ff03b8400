//! Common utilities shared across Apple Music tools.
//!
//! Result builders, limit handling, song formatting and the cache
//! invalidation patterns used after playlist mutations.

use regex::Regex;
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::warn;

use crate::domains::api::types::Song;
use crate::domains::api::{ApiError, endpoints};

/// Format a duration in milliseconds to M:SS format.
pub fn format_duration(length_ms: u64) -> String {
    let duration_secs = length_ms / 1000;
    let minutes = duration_secs / 60;
    let seconds = duration_secs % 60;
    format!("{}:{:02}", minutes, seconds)
}

/// Clamp a requested page size to `1..=max`.
pub fn clamp_limit(limit: u32, max: u32) -> u32 {
    limit.clamp(1, max)
}

/// Create an error result with a formatted message.
pub fn error_result(message: &str) -> CallToolResult {
    warn!("{}", message);
    CallToolResult::error(vec![Content::text(message.to_string())])
}

/// Create a success result with text content.
pub fn success_result(content: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(content)])
}

/// Render a pipeline failure as a tool error result.
pub fn api_error_result(err: &ApiError) -> CallToolResult {
    error_result(&err.render())
}

/// Text summary plus structured content. Falls back to text only if the
/// data cannot be serialized.
pub fn structured_result<T: Serialize>(summary: String, data: T) -> CallToolResult {
    match serde_json::to_value(&data) {
        Ok(structured) => CallToolResult {
            content: vec![Content::text(summary)],
            structured_content: Some(structured),
            is_error: Some(false),
            meta: None,
        },
        Err(e) => {
            warn!("Failed to serialize structured content: {}", e);
            success_result(summary)
        }
    }
}

/// JSON shape returned by the HTTP transport for a tool call.
#[cfg(feature = "http")]
pub fn http_response(result: CallToolResult) -> serde_json::Value {
    let mut response = serde_json::json!({
        "content": result.content,
        "isError": result.is_error.unwrap_or(false)
    });
    if let (Some(structured), Some(object)) =
        (result.structured_content, response.as_object_mut())
    {
        object.insert("structuredContent".to_string(), structured);
    }
    response
}

/// Pattern matching every cached read of the library playlist collection.
pub fn library_playlists_pattern() -> Option<Regex> {
    compile_pattern("/me/library/playlists")
}

/// Pattern matching cached reads of one library playlist and its tracks.
///
/// Built from the same percent-encoded segment the request URL uses. The
/// segment must be followed by a path or query boundary, so `p.1` does not
/// also drop `p.10`.
pub fn playlist_pattern(playlist_id: &str) -> Option<Regex> {
    let segment = endpoints::path_segment(playlist_id)?;
    compile_pattern(&format!(
        "/me/library/playlists/{}(?:[/?]|$)",
        regex::escape(&segment)
    ))
}

fn compile_pattern(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| warn!("Invalid cache pattern '{}': {}", pattern, e))
        .ok()
}

/// Request body referencing catalog songs by id.
pub fn song_references(track_ids: &[String]) -> serde_json::Value {
    let data: Vec<_> = track_ids
        .iter()
        .map(|id| serde_json::json!({ "id": id, "type": "songs" }))
        .collect();
    serde_json::json!({ "data": data })
}

/// Compact song record used in structured output.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SongSummary {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
}

impl From<&Song> for SongSummary {
    fn from(song: &Song) -> Self {
        let attrs = song.attributes.clone().unwrap_or_default();
        Self {
            id: song.id.clone(),
            name: attrs.name,
            artist: attrs.artist_name,
            album: attrs.album_name,
            duration: format_duration(attrs.duration_in_millis),
        }
    }
}

impl SongSummary {
    /// `N. **Name** by Artist (Album, M:SS) [ID: x]`
    pub fn numbered_line(&self, number: usize) -> String {
        format!(
            "{}. **{}** by {} ({}, {}) [ID: {}]",
            number, self.name, self.artist, self.album, self.duration, self.id
        )
    }
}

/// Structured output for paged song lists.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SongListResult {
    pub songs: Vec<SongSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u32>,
}

/// `## heading` followed by one numbered line per song, counting from `offset + 1`.
pub fn numbered_song_lines(heading: &str, songs: &[SongSummary], offset: u32) -> Vec<String> {
    let mut lines = vec![format!("## {}\n", heading)];
    lines.extend(
        songs
            .iter()
            .enumerate()
            .map(|(i, song)| song.numbered_line(offset as usize + i + 1)),
    );
    lines
}

/// Extract the text of the first content item.
#[cfg(test)]
pub(crate) fn result_text(result: &CallToolResult) -> String {
    use rmcp::model::RawContent;

    match result.content.first().map(|c| &c.raw) {
        Some(RawContent::Text(text)) => text.text.clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::api::types::SongAttributes;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(180000), "3:00");
        assert_eq!(format_duration(245000), "4:05");
        assert_eq!(format_duration(61000), "1:01");
        assert_eq!(format_duration(59999), "0:59");
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(10, 25), 10);
        assert_eq!(clamp_limit(0, 25), 1);
        assert_eq!(clamp_limit(200, 100), 100);
    }

    #[test]
    fn test_playlist_pattern_is_scoped_to_one_playlist() {
        let pattern = playlist_pattern("p.1").unwrap();
        let base = "https://api.music.apple.com/v1/me/library/playlists";
        assert!(pattern.is_match(&format!("{base}/p.1/tracks?limit=100&offset=0")));
        assert!(pattern.is_match(&format!("{base}/p.1")));
        assert!(!pattern.is_match(&format!("{base}/p.10/tracks")));
        assert!(!pattern.is_match(&format!("{base}/pX1/tracks")));
        assert!(!pattern.is_match(&format!("{base}?limit=25")));
    }

    #[test]
    fn test_playlist_pattern_matches_encoded_key() {
        let pattern = playlist_pattern("my list").unwrap();
        let key = endpoints::library_playlist_tracks("my list").unwrap();
        assert!(pattern.is_match(&format!("{key}?limit=100&offset=0")));
        assert!(!pattern.is_match("https://api.music.apple.com/v1/me/library/playlists/my/tracks"));
        assert!(playlist_pattern("../../songs").is_none());
    }

    #[test]
    fn test_library_playlists_pattern() {
        let pattern = library_playlists_pattern().unwrap();
        assert!(pattern.is_match("https://api.music.apple.com/v1/me/library/playlists?limit=25"));
        assert!(!pattern.is_match("https://api.music.apple.com/v1/me/library/songs"));
    }

    #[test]
    fn test_song_references() {
        let body = song_references(&["1".to_string(), "2".to_string()]);
        assert_eq!(
            body,
            serde_json::json!({ "data": [
                { "id": "1", "type": "songs" },
                { "id": "2", "type": "songs" }
            ] })
        );
    }

    #[test]
    fn test_song_summary_line() {
        let song = Song {
            id: "i.1".into(),
            kind: "library-songs".into(),
            href: None,
            attributes: Some(SongAttributes {
                name: "One More Time".into(),
                artist_name: "Daft Punk".into(),
                album_name: "Discovery".into(),
                duration_in_millis: 320_000,
                ..Default::default()
            }),
        };
        let summary = SongSummary::from(&song);
        assert_eq!(
            summary.numbered_line(3),
            "3. **One More Time** by Daft Punk (Discovery, 5:20) [ID: i.1]"
        );
    }

    #[test]
    fn test_numbered_song_lines_start_after_offset() {
        let song = SongSummary {
            id: "1".into(),
            name: "A".into(),
            artist: "B".into(),
            album: "C".into(),
            duration: "1:00".into(),
        };
        let lines = numbered_song_lines("Songs", &[song.clone(), song], 25);
        assert_eq!(lines[0], "## Songs\n");
        assert!(lines[1].starts_with("26. **A**"));
        assert!(lines[2].starts_with("27. **A**"));
    }

    #[test]
    fn test_error_results_are_flagged() {
        let result = api_error_result(&ApiError::authentication("nope"));
        assert_eq!(result.is_error, Some(true));
        assert_eq!(result_text(&result), "Authentication Error: nope");
    }

    #[test]
    fn test_structured_result() {
        let result = structured_result("ok".into(), serde_json::json!({ "n": 1 }));
        assert_eq!(result.is_error, Some(false));
        assert_eq!(result.structured_content.unwrap()["n"], 1);
    }
}
