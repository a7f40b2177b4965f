//! Viewer-side helpers over a catalog snapshot.

use super::{Episode, Series};

/// Filters series whose title or description contains `query`
///
/// Matching is case-insensitive on the text resolved for `lang`. A blank
/// query returns every series.
pub fn search<'a>(series: &'a [Series], query: &str, lang: &str) -> Vec<&'a Series> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return series.iter().collect();
    }
    series
        .iter()
        .filter(|s| s.title.contains(lang, &needle) || s.description.contains(lang, &needle))
        .collect()
}

/// What a viewer has selected, stored by id
///
/// Holding ids instead of copies means the selection always resolves
/// against the latest snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerSelection {
    series_id: Option<String>,
    episode_id: Option<String>,
}

impl ViewerSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a series and clears the episode
    pub fn select_series(&mut self, series_id: impl Into<String>) {
        self.series_id = Some(series_id.into());
        self.episode_id = None;
    }

    /// Selects an episode of the selected series
    pub fn select_episode(&mut self, episode_id: impl Into<String>) {
        if self.series_id.is_some() {
            self.episode_id = Some(episode_id.into());
        }
    }

    pub fn clear(&mut self) {
        self.series_id = None;
        self.episode_id = None;
    }

    pub fn series_id(&self) -> Option<&str> {
        self.series_id.as_deref()
    }

    pub fn episode_id(&self) -> Option<&str> {
        self.episode_id.as_deref()
    }

    /// Re-checks the selection against a newer catalog
    ///
    /// Ids that no longer exist are dropped.
    pub fn refresh(&mut self, catalog: &[Series]) {
        if self.selected_series(catalog).is_none() {
            self.clear();
        } else if self.episode_id.is_some() && self.selected_episode(catalog).is_none() {
            self.episode_id = None;
        }
    }

    pub fn selected_series<'a>(&self, catalog: &'a [Series]) -> Option<&'a Series> {
        let id = self.series_id.as_deref()?;
        catalog.iter().find(|s| s.id == id)
    }

    pub fn selected_episode<'a>(&self, catalog: &'a [Series]) -> Option<&'a Episode> {
        let id = self.episode_id.as_deref()?;
        self.selected_series(catalog)?
            .seasons
            .iter()
            .flat_map(|season| season.episodes.iter())
            .find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Season;
    use crate::localized::LocalizedText;

    fn series(id: &str, title: LocalizedText, description: &str) -> Series {
        Series {
            id: id.to_string(),
            title,
            description: description.into(),
            poster_url: String::new(),
            backdrop_url: String::new(),
            seasons: vec![Season {
                id: format!("{id}-s1"),
                number: 1,
                episodes: vec![Episode {
                    id: format!("{id}-e1"),
                    number: 1,
                    title: "Pilot".into(),
                    description: LocalizedText::default(),
                    video_url: "https://x/p.mp4".to_string(),
                    audios: Vec::new(),
                    subtitles: Vec::new(),
                }],
            }],
        }
    }

    fn catalog() -> Vec<Series> {
        vec![
            series(
                "a",
                LocalizedText::localized([("en", "The Farm"), ("fr", "La Ferme")]),
                "Animals",
            ),
            series("b", "Space Trip".into(), "A journey to the farthest stars"),
        ]
    }

    #[test]
    fn test_search_matches_title_and_description() {
        let catalog = catalog();
        let ids = |hits: Vec<&Series>| hits.iter().map(|s| s.id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(search(&catalog, "  FARM ", "en")), vec!["a"]);
        // "far" hits series b through its description only
        assert_eq!(ids(search(&catalog, "FAR", "en")), vec!["a", "b"]);
        assert_eq!(ids(search(&catalog, "journey", "en")), vec!["b"]);
        assert_eq!(ids(search(&catalog, "ferme", "fr")), vec!["a"]);
        assert!(search(&catalog, "ferme", "en").is_empty());
        assert_eq!(search(&catalog, "", "en").len(), 2);
    }

    #[test]
    fn test_selection_resolves_against_catalog() {
        let catalog = catalog();
        let mut selection = ViewerSelection::new();
        selection.select_episode("a-e1");
        assert!(selection.episode_id().is_none());

        selection.select_series("a");
        selection.select_episode("a-e1");
        assert_eq!(selection.selected_episode(&catalog).unwrap().title.resolve("en"), "Pilot");
    }

    #[test]
    fn test_refresh_drops_missing_ids() {
        let mut catalog = catalog();
        let mut selection = ViewerSelection::new();
        selection.select_series("a");
        selection.select_episode("a-e1");

        catalog[0].seasons.clear();
        selection.refresh(&catalog);
        assert_eq!(selection.series_id(), Some("a"));
        assert!(selection.episode_id().is_none());

        catalog.remove(0);
        selection.refresh(&catalog);
        assert_eq!(selection, ViewerSelection::default());
    }
}
