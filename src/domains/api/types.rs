//! Response shapes of the Apple Music API.
//!
//! Only the fields the tools read are modelled; everything is optional or
//! defaulted so partial payloads still decode.

use serde::{Deserialize, Serialize};

/// A generic resource object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource<A> {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<A>,
}

/// A page of resources. `next` is set when more pages exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceList<A> {
    #[serde(default = "Vec::new")]
    pub data: Vec<Resource<A>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl<A> Default for ResourceList<A> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            next: None,
        }
    }
}

impl<A> ResourceList<A> {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artwork {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub album_name: String,
    #[serde(default)]
    pub duration_in_millis: u64,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub genre_names: Vec<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub isrc: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub track_count: u32,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_names: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub genre_names: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistDescription {
    #[serde(default)]
    pub standard: Option<String>,
    #[serde(default)]
    pub short: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<PlaylistDescription>,
    #[serde(default)]
    pub last_modified_date: Option<String>,
    #[serde(default)]
    pub can_edit: Option<bool>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayString {
    #[serde(default)]
    pub string_for_display: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationAttributes {
    #[serde(default)]
    pub title: Option<DisplayString>,
    #[serde(default)]
    pub reason: Option<DisplayString>,
    #[serde(default)]
    pub resource_types: Vec<String>,
}

/// Contents attached to a recommendation, with loosely typed attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationRelationships {
    #[serde(default)]
    pub contents: Option<ResourceList<serde_json::Value>>,
}

/// A recommendation carries its contents as a relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    #[serde(default)]
    pub attributes: Option<RecommendationAttributes>,
    #[serde(default)]
    pub relationships: Option<RecommendationRelationships>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationList {
    #[serde(default)]
    pub data: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub songs: Option<ResourceList<SongAttributes>>,
    #[serde(default)]
    pub albums: Option<ResourceList<AlbumAttributes>>,
    #[serde(default)]
    pub artists: Option<ResourceList<ArtistAttributes>>,
    #[serde(default)]
    pub playlists: Option<ResourceList<PlaylistAttributes>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: SearchResults,
}

pub type Song = Resource<SongAttributes>;
pub type Album = Resource<AlbumAttributes>;
pub type Artist = Resource<ArtistAttributes>;
pub type Playlist = Resource<PlaylistAttributes>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_song_list_decodes_with_next() {
        let body = json!({
            "data": [{
                "id": "i.abc",
                "type": "library-songs",
                "attributes": {
                    "name": "Get Lucky",
                    "artistName": "Daft Punk",
                    "albumName": "Random Access Memories",
                    "durationInMillis": 369000
                }
            }],
            "next": "/v1/me/library/songs?offset=25"
        });
        let list: ResourceList<SongAttributes> = serde_json::from_value(body).unwrap();
        assert!(list.has_more());
        let song = list.data[0].attributes.as_ref().unwrap();
        assert_eq!(song.artist_name, "Daft Punk");
        assert_eq!(song.duration_in_millis, 369000);
        assert_eq!(list.data[0].kind, "library-songs");
    }

    #[test]
    fn test_resource_without_attributes_or_href() {
        #[derive(Debug, Deserialize)]
        struct Named {
            name: String,
        }

        let body = json!({ "data": [
            { "id": "p.1", "type": "library-playlists" },
            { "id": "p.2", "type": "library-playlists", "attributes": { "name": "Mix" } }
        ] });
        let list: ResourceList<Named> = serde_json::from_value(body).unwrap();
        assert!(!list.has_more());
        assert!(list.data[0].attributes.is_none());
        assert!(list.data[0].href.is_none());
        assert_eq!(list.data[1].attributes.as_ref().unwrap().name, "Mix");
    }

    #[test]
    fn test_search_response_with_missing_sections() {
        let body = json!({ "results": { "albums": { "data": [] } } });
        let response: SearchResponse = serde_json::from_value(body).unwrap();
        assert!(response.results.songs.is_none());
        assert!(response.results.albums.unwrap().data.is_empty());
    }

    #[test]
    fn test_recommendation_decodes_contents() {
        let body = json!({
            "data": [{
                "id": "6-27s5hU6azhJY",
                "type": "personal-recommendation",
                "attributes": {
                    "title": { "stringForDisplay": "Made for You" },
                    "resourceTypes": ["playlists"]
                },
                "relationships": {
                    "contents": { "data": [
                        { "id": "pl.1", "type": "playlists", "attributes": { "name": "Chill Mix" } }
                    ] }
                }
            }]
        });
        let list: RecommendationList = serde_json::from_value(body).unwrap();
        let rec = &list.data[0];
        assert_eq!(
            rec.attributes.as_ref().unwrap().title.as_ref().unwrap().string_for_display,
            "Made for You"
        );
        let contents = rec.relationships.as_ref().unwrap().contents.as_ref().unwrap();
        assert_eq!(contents.data[0].id, "pl.1");
    }

    #[test]
    fn test_resource_without_attributes() {
        let resource: Playlist =
            serde_json::from_value(json!({ "id": "p.1", "type": "library-playlists" })).unwrap();
        assert!(resource.attributes.is_none());
    }
}
