//! Structural edits on an owned catalog tree.
//!
//! Every function here works on a tree the caller has already cloned from
//! the shared snapshot. Unknown ids yield `Ok(None)` so stale references
//! from the UI are harmless.

use super::{
    CatalogError, Episode, EpisodeDraft, EpisodePatch, Season, Series, SeriesPatch, new_id,
};

/// Index of the series with `series_id`
pub(super) fn series_index(tree: &[Series], series_id: &str) -> Option<usize> {
    tree.iter().position(|s| s.id == series_id)
}

fn next_number<I: Iterator<Item = u32>>(numbers: I, kind: &str) -> Result<u32, CatalogError> {
    numbers
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| CatalogError::Validation(format!("no {kind} number left")))
}

/// Applies a top-level patch to a series
pub(super) fn update_series(series: &mut Series, patch: SeriesPatch) -> Result<(), CatalogError> {
    if let Some(title) = patch.title {
        if title.is_blank() {
            return Err(CatalogError::Validation("series title is required".to_string()));
        }
        series.title = title;
    }
    if let Some(description) = patch.description {
        series.description = description;
    }
    if let Some(poster_url) = patch.poster_url {
        series.poster_url = poster_url;
    }
    if let Some(backdrop_url) = patch.backdrop_url {
        series.backdrop_url = backdrop_url;
    }
    Ok(())
}

/// Adds a season, numbered `max + 1` unless `number` is given
pub(super) fn add_season(series: &mut Series, number: Option<u32>) -> Result<Season, CatalogError> {
    let number = match number {
        Some(0) => {
            return Err(CatalogError::Validation(
                "season numbers must be positive".to_string(),
            ));
        }
        Some(n) if series.seasons.iter().any(|s| s.number == n) => {
            return Err(CatalogError::DuplicateSeason {
                series_id: series.id.clone(),
                number: n,
            });
        }
        Some(n) => n,
        None => next_number(series.seasons.iter().map(|s| s.number), "season")?,
    };

    let season = Season {
        id: new_id(),
        number,
        episodes: Vec::new(),
    };
    series.seasons.push(season.clone());
    series.normalize();
    Ok(season)
}

/// Removes a season and all of its episodes
pub(super) fn delete_season(series: &mut Series, season_id: &str) -> bool {
    let before = series.seasons.len();
    series.seasons.retain(|s| s.id != season_id);
    series.seasons.len() != before
}

/// Adds an episode to a season
pub(super) fn add_episode(
    series: &mut Series,
    season_id: &str,
    draft: EpisodeDraft,
) -> Result<Option<Episode>, CatalogError> {
    let Some(season) = series.seasons.iter_mut().find(|s| s.id == season_id) else {
        return Ok(None);
    };

    let number = match draft.number {
        Some(n) if n != 0 && season.episodes.iter().any(|e| e.number == n) => {
            return Err(CatalogError::DuplicateEpisode {
                season_id: season.id.clone(),
                number: n,
            });
        }
        Some(n) => n,
        None => next_number(season.episodes.iter().map(|e| e.number), "episode")?,
    };

    let mut episode = Episode {
        id: new_id(),
        number,
        title: draft.title,
        description: draft.description,
        video_url: draft.video_url.trim().to_string(),
        audios: draft.audios,
        subtitles: draft.subtitles,
    };
    episode.sanitize();
    episode.validate()?;

    season.episodes.push(episode.clone());
    season.episodes.sort_by_key(|e| e.number);
    Ok(Some(episode))
}

/// Applies a patch to an episode
pub(super) fn patch_episode(
    series: &mut Series,
    season_id: &str,
    episode_id: &str,
    patch: EpisodePatch,
) -> Result<Option<Episode>, CatalogError> {
    let Some(season) = series.seasons.iter_mut().find(|s| s.id == season_id) else {
        return Ok(None);
    };
    if !season.episodes.iter().any(|e| e.id == episode_id) {
        return Ok(None);
    }

    if let Some(n) = patch.number {
        if season
            .episodes
            .iter()
            .any(|e| e.number == n && e.id != episode_id)
        {
            return Err(CatalogError::DuplicateEpisode {
                season_id: season.id.clone(),
                number: n,
            });
        }
    }

    let Some(episode) = season.episodes.iter_mut().find(|e| e.id == episode_id) else {
        return Ok(None);
    };

    if let Some(number) = patch.number {
        episode.number = number;
    }
    if let Some(title) = patch.title {
        episode.title = title;
    }
    if let Some(description) = patch.description {
        episode.description = description;
    }
    if let Some(video_url) = patch.video_url {
        episode.video_url = video_url.trim().to_string();
    }
    if let Some(audios) = patch.audios {
        episode.audios = audios;
    }
    if let Some(subtitles) = patch.subtitles {
        episode.subtitles = subtitles;
    }
    episode.sanitize();
    episode.validate()?;

    let patched = episode.clone();
    season.episodes.sort_by_key(|e| e.number);
    Ok(Some(patched))
}

/// Removes an episode
pub(super) fn delete_episode(series: &mut Series, season_id: &str, episode_id: &str) -> bool {
    let Some(season) = series.seasons.iter_mut().find(|s| s.id == season_id) else {
        return false;
    };
    let before = season.episodes.len();
    season.episodes.retain(|e| e.id != episode_id);
    season.episodes.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AudioTrack;
    use crate::localized::LocalizedText;

    fn series() -> Series {
        Series {
            id: "s1".to_string(),
            title: "Demo".into(),
            description: LocalizedText::default(),
            poster_url: String::new(),
            backdrop_url: String::new(),
            seasons: Vec::new(),
        }
    }

    fn draft(title: &str) -> EpisodeDraft {
        EpisodeDraft {
            title: title.into(),
            video_url: "https://x/p.mp4".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_season_numbers_sequentially() {
        let mut s = series();
        assert_eq!(add_season(&mut s, None).unwrap().number, 1);
        assert_eq!(add_season(&mut s, None).unwrap().number, 2);
        assert_eq!(add_season(&mut s, Some(5)).unwrap().number, 5);
        assert_eq!(add_season(&mut s, None).unwrap().number, 6);
    }

    #[test]
    fn test_add_season_rejects_collision_and_zero() {
        let mut s = series();
        add_season(&mut s, Some(2)).unwrap();
        assert!(matches!(
            add_season(&mut s, Some(2)),
            Err(CatalogError::DuplicateSeason { number: 2, .. })
        ));
        assert!(matches!(add_season(&mut s, Some(0)), Err(CatalogError::Validation(_))));
        assert_eq!(s.seasons.len(), 1);
    }

    #[test]
    fn test_add_season_keeps_existing_ids_and_order() {
        let mut s = series();
        let second = add_season(&mut s, Some(2)).unwrap();
        let first = add_season(&mut s, Some(1)).unwrap();

        assert_eq!(s.seasons[0].id, first.id);
        assert_eq!(s.seasons[1].id, second.id);
    }

    #[test]
    fn test_add_episode_defaults_number() {
        let mut s = series();
        let season = add_season(&mut s, None).unwrap();

        let pilot = add_episode(&mut s, &season.id, draft("Pilot")).unwrap().unwrap();
        let second = add_episode(&mut s, &season.id, draft("Second")).unwrap().unwrap();
        assert_eq!(pilot.number, 1);
        assert_eq!(second.number, 2);
    }

    #[test]
    fn test_add_episode_unknown_season_is_noop() {
        let mut s = series();
        assert!(add_episode(&mut s, "missing", draft("Pilot")).unwrap().is_none());
    }

    #[test]
    fn test_add_episode_validates_and_sanitizes() {
        let mut s = series();
        let season = add_season(&mut s, None).unwrap();

        let mut invalid = draft("Pilot");
        invalid.video_url.clear();
        assert!(matches!(
            add_episode(&mut s, &season.id, invalid),
            Err(CatalogError::Validation(_))
        ));

        let mut with_tracks = draft("Pilot");
        with_tracks.audios = vec![AudioTrack {
            label: "".into(),
            url: "http://x".into(),
        }];
        let episode = add_episode(&mut s, &season.id, with_tracks).unwrap().unwrap();
        assert!(episode.audios.is_empty());
        assert_eq!(s.seasons[0].episodes.len(), 1);
    }

    #[test]
    fn test_patch_episode() {
        let mut s = series();
        let season = add_season(&mut s, None).unwrap();
        let one = add_episode(&mut s, &season.id, draft("One")).unwrap().unwrap();
        let two = add_episode(&mut s, &season.id, draft("Two")).unwrap().unwrap();

        let collision = EpisodePatch {
            number: Some(2),
            ..Default::default()
        };
        assert!(matches!(
            patch_episode(&mut s, &season.id, &one.id, collision),
            Err(CatalogError::DuplicateEpisode { number: 2, .. })
        ));

        let renumber = EpisodePatch {
            number: Some(3),
            title: Some("Uno".into()),
            ..Default::default()
        };
        let patched = patch_episode(&mut s, &season.id, &one.id, renumber).unwrap().unwrap();
        assert_eq!(patched.number, 3);
        assert_eq!(patched.title.resolve("en"), "Uno");

        let ids: Vec<&str> = s.seasons[0].episodes.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec![two.id.as_str(), one.id.as_str()]);

        assert!(
            patch_episode(&mut s, &season.id, "missing", EpisodePatch::default())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_patch_stale_episode_is_noop() {
        let mut s = series();
        let season = add_season(&mut s, None).unwrap();
        add_episode(&mut s, &season.id, draft("One")).unwrap().unwrap();

        let colliding = EpisodePatch {
            number: Some(1),
            ..Default::default()
        };
        assert!(
            patch_episode(&mut s, &season.id, "stale-id", colliding)
                .unwrap()
                .is_none()
        );
        assert_eq!(s.seasons[0].episodes.len(), 1);
    }

    #[test]
    fn test_quick_add_after_highest_number_fails() {
        let mut s = series();
        let last = add_season(&mut s, Some(u32::MAX)).unwrap();
        assert!(matches!(add_season(&mut s, None), Err(CatalogError::Validation(_))));
        assert_eq!(s.seasons.len(), 1);

        let mut highest = draft("Last");
        highest.number = Some(u32::MAX);
        add_episode(&mut s, &last.id, highest).unwrap().unwrap();
        assert!(matches!(
            add_episode(&mut s, &last.id, draft("Overflow")),
            Err(CatalogError::Validation(_))
        ));
        assert_eq!(s.seasons[0].episodes.len(), 1);
        assert!(s.seasons.iter().all(|season| season.number > 0));
    }

    #[test]
    fn test_delete_episode_and_season() {
        let mut s = series();
        let season = add_season(&mut s, None).unwrap();
        let ep = add_episode(&mut s, &season.id, draft("One")).unwrap().unwrap();

        assert!(!delete_episode(&mut s, &season.id, "missing"));
        assert!(delete_episode(&mut s, &season.id, &ep.id));
        assert!(s.seasons[0].episodes.is_empty());

        assert!(delete_season(&mut s, &season.id));
        assert!(!delete_season(&mut s, &season.id));
    }

    #[test]
    fn test_update_series_rejects_blank_title() {
        let mut s = series();
        let patch = SeriesPatch {
            title: Some("".into()),
            ..Default::default()
        };
        assert!(update_series(&mut s, patch).is_err());

        let patch = SeriesPatch {
            poster_url: Some("https://x/p.jpg".into()),
            ..Default::default()
        };
        update_series(&mut s, patch).unwrap();
        assert_eq!(s.poster_url, "https://x/p.jpg");
    }
}
