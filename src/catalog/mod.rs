//! Data structures for the series catalog.
//!
//! This module provides structures to represent series, seasons and episodes
//! with their localized metadata and media references, the validation rules
//! applied before anything is persisted, and the client that keeps the
//! in-memory catalog tree in sync with a backend.
mod browse;
mod client;
mod tree;

pub use browse::{ViewerSelection, search};
pub use client::{CatalogAdmin, CatalogClient, CatalogSnapshot};

use crate::backend::BackendError;
use crate::localized::{LocalizedText, nullable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Required fields are missing or malformed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An explicit season number is already used in the series
    #[error("Season {number} already exists in series {series_id}")]
    DuplicateSeason { series_id: String, number: u32 },

    /// An explicit episode number is already used in the season
    #[error("Episode {number} already exists in season {season_id}")]
    DuplicateEpisode { season_id: String, number: u32 },

    /// Admin operations require a signed-in user
    #[error("Admin operations require a signed-in user")]
    Unauthorized,

    /// The backend failed to load or persist the catalog
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// An alternate full audio track (dub) for an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Label shown in the audio picker
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,
    /// Location of the audio resource
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
}

/// A subtitle track for an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    /// Language code of the subtitles
    #[serde(default, deserialize_with = "nullable")]
    pub lang: String,
    /// Location of the subtitle file
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
}

/// Represents a single playable episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    /// Stable identifier
    pub id: String,
    /// Episode number within the season
    pub number: u32,
    /// The episode title
    #[serde(default, deserialize_with = "nullable")]
    pub title: LocalizedText,
    /// A brief description of the episode
    #[serde(default, deserialize_with = "nullable")]
    pub description: LocalizedText,
    /// Location of the primary video resource
    #[serde(default, deserialize_with = "nullable")]
    pub video_url: String,
    /// Alternate audio tracks
    #[serde(default, deserialize_with = "nullable")]
    pub audios: Vec<AudioTrack>,
    /// Subtitle tracks
    #[serde(default, deserialize_with = "nullable")]
    pub subtitles: Vec<SubtitleTrack>,
}

/// Represents a numbered season of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    /// Stable identifier
    pub id: String,
    /// The season number
    pub number: u32,
    /// Episodes in this season, ordered by number
    #[serde(default, deserialize_with = "nullable")]
    pub episodes: Vec<Episode>,
}

/// Represents a series with all seasons and episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    /// Stable identifier
    pub id: String,
    /// The series title
    #[serde(default, deserialize_with = "nullable")]
    pub title: LocalizedText,
    /// Series synopsis
    #[serde(default, deserialize_with = "nullable")]
    pub description: LocalizedText,
    /// Poster image
    #[serde(default, deserialize_with = "nullable", alias = "coverUrl")]
    pub poster_url: String,
    /// Wide backdrop image
    #[serde(default, deserialize_with = "nullable")]
    pub backdrop_url: String,
    /// Seasons, ordered by number
    #[serde(default, deserialize_with = "nullable")]
    pub seasons: Vec<Season>,
}

impl Series {
    /// Finds a season by id
    pub fn season(&self, season_id: &str) -> Option<&Season> {
        self.seasons.iter().find(|s| s.id == season_id)
    }

    /// Sorts seasons and their episodes ascending by number
    pub fn normalize(&mut self) {
        self.seasons.sort_by_key(|s| s.number);
        for season in &mut self.seasons {
            season.episodes.sort_by_key(|e| e.number);
        }
    }

    /// Checks the fields required before the series can be saved
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.id.trim().is_empty() {
            return Err(CatalogError::Validation("series id is required".to_string()));
        }
        if self.title.is_blank() {
            return Err(CatalogError::Validation("series title is required".to_string()));
        }
        for season in &self.seasons {
            if season.number == 0 {
                return Err(CatalogError::Validation(
                    "season numbers must be positive".to_string(),
                ));
            }
            if self.seasons.iter().filter(|s| s.number == season.number).count() > 1 {
                return Err(CatalogError::DuplicateSeason {
                    series_id: self.id.clone(),
                    number: season.number,
                });
            }
            for episode in &season.episodes {
                episode.validate()?;
                if season.episodes.iter().filter(|e| e.number == episode.number).count() > 1 {
                    return Err(CatalogError::DuplicateEpisode {
                        season_id: season.id.clone(),
                        number: episode.number,
                    });
                }
            }
        }
        Ok(())
    }

    /// Drops incomplete track entries from every episode
    pub fn sanitize(&mut self) {
        for season in &mut self.seasons {
            for episode in &mut season.episodes {
                episode.sanitize();
            }
        }
    }
}

impl Episode {
    /// Checks the fields required before the episode can be saved
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.number == 0 {
            return Err(CatalogError::Validation(
                "episode numbers must be positive".to_string(),
            ));
        }
        if self.title.is_blank() {
            return Err(CatalogError::Validation("episode title is required".to_string()));
        }
        if self.video_url.trim().is_empty() {
            return Err(CatalogError::Validation("episode video URL is required".to_string()));
        }
        Ok(())
    }

    /// Drops audio and subtitle entries with a blank field
    pub fn sanitize(&mut self) {
        self.audios
            .retain(|a| !a.label.trim().is_empty() && !a.url.trim().is_empty());
        self.subtitles
            .retain(|s| !s.lang.trim().is_empty() && !s.url.trim().is_empty());
    }
}

/// Fields for a series that is about to be created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSeries {
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub poster_url: String,
    pub backdrop_url: String,
}

impl NewSeries {
    /// Fields for a series with only a title
    pub fn titled(title: impl Into<LocalizedText>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Edits to the top-level fields of a series; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesPatch {
    pub title: Option<LocalizedText>,
    pub description: Option<LocalizedText>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
}

/// Fields for an episode that is about to be added.
///
/// A missing number is assigned as one past the highest in the season.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeDraft {
    pub number: Option<u32>,
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub video_url: String,
    pub audios: Vec<AudioTrack>,
    pub subtitles: Vec<SubtitleTrack>,
}

/// Edits to an existing episode; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodePatch {
    pub number: Option<u32>,
    pub title: Option<LocalizedText>,
    pub description: Option<LocalizedText>,
    pub video_url: Option<String>,
    pub audios: Option<Vec<AudioTrack>>,
    pub subtitles: Option<Vec<SubtitleTrack>>,
}

/// Allocates a new random identifier
pub(crate) fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn episode(number: u32) -> Episode {
        Episode {
            id: format!("e{number}"),
            number,
            title: "Pilot".into(),
            description: LocalizedText::default(),
            video_url: "https://x/p.mp4".to_string(),
            audios: Vec::new(),
            subtitles: Vec::new(),
        }
    }

    fn season(id: &str, number: u32, episodes: Vec<Episode>) -> Season {
        Season {
            id: id.to_string(),
            number,
            episodes,
        }
    }

    fn audio(label: &str, url: &str) -> AudioTrack {
        AudioTrack {
            label: label.to_string(),
            url: url.to_string(),
        }
    }

    fn subtitle(lang: &str, url: &str) -> SubtitleTrack {
        SubtitleTrack {
            lang: lang.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_deserialize_defaults_missing_fields() {
        let series: Series = serde_json::from_value(json!({
            "id": "s1",
            "title": "Demo",
            "coverUrl": "https://x/poster.jpg",
            "backdropUrl": null,
            "seasons": [{"id": "season-1", "number": 1}]
        }))
        .unwrap();

        assert_eq!(series.poster_url, "https://x/poster.jpg");
        assert_eq!(series.backdrop_url, "");
        assert_eq!(series.description, LocalizedText::default());
        assert!(series.seasons[0].episodes.is_empty());
    }

    #[test]
    fn test_serialize_uses_camel_case() {
        let value = serde_json::to_value(episode(1)).unwrap();
        assert_eq!(value["videoUrl"], "https://x/p.mp4");
        assert!(value.get("video_url").is_none());
    }

    #[test]
    fn test_sanitize_drops_incomplete_tracks() {
        let mut ep = episode(1);
        ep.audios = vec![audio("", "http://x"), audio("FR", "http://x/fr.m4a")];
        ep.subtitles = vec![subtitle("de", " "), subtitle("en", "http://x/en.vtt")];
        ep.sanitize();

        assert_eq!(ep.audios.len(), 1);
        assert_eq!(ep.audios[0].label, "FR");
        assert_eq!(ep.subtitles.len(), 1);
        assert_eq!(ep.subtitles[0].lang, "en");
    }

    #[test]
    fn test_episode_validation() {
        assert!(episode(1).validate().is_ok());

        let mut no_video = episode(1);
        no_video.video_url = "  ".to_string();
        assert!(matches!(no_video.validate(), Err(CatalogError::Validation(_))));

        let mut no_title = episode(1);
        no_title.title = LocalizedText::default();
        assert!(matches!(no_title.validate(), Err(CatalogError::Validation(_))));
    }

    #[test]
    fn test_series_validation_rejects_duplicate_numbers() {
        let series = Series {
            id: "s1".to_string(),
            title: "Demo".into(),
            description: LocalizedText::default(),
            poster_url: String::new(),
            backdrop_url: String::new(),
            seasons: vec![season("a", 1, vec![]), season("b", 1, vec![])],
        };
        assert!(matches!(
            series.validate(),
            Err(CatalogError::DuplicateSeason { number: 1, .. })
        ));
    }

    #[test]
    fn test_normalize_sorts_by_number() {
        let mut series = Series {
            id: "s1".to_string(),
            title: "Demo".into(),
            description: LocalizedText::default(),
            poster_url: String::new(),
            backdrop_url: String::new(),
            seasons: vec![
                season("b", 2, vec![]),
                season("a", 1, vec![episode(3), episode(1)]),
            ],
        };
        series.normalize();

        let numbers: Vec<u32> = series.seasons.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        let episodes: Vec<u32> = series.seasons[0].episodes.iter().map(|e| e.number).collect();
        assert_eq!(episodes, vec![1, 3]);
    }
}
