//! Catalog store client
//!
//! Holds the in-memory catalog tree and routes every read and admin
//! mutation through it. Mutations follow one sequence: clone the current
//! tree, edit the clone, persist the affected series, then swap the clone
//! in. A failed persist leaves the published tree untouched.

use super::tree;
use super::{
    CatalogError, Episode, EpisodeDraft, EpisodePatch, NewSeries, Season, Series, SeriesPatch,
    new_id,
};
use crate::auth::{AuthProvider, User};
use crate::backend::CatalogBackend;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

/// An immutable view of the whole catalog at one point in time
pub type CatalogSnapshot = Arc<Vec<Series>>;

/// Single source of truth for the catalog tree
///
/// Readers get [`CatalogSnapshot`]s, which never change after publication.
/// Admin mutations are only reachable through [`CatalogClient::admin`].
pub struct CatalogClient<B> {
    backend: B,
    tree: RwLock<CatalogSnapshot>,
    // Held across clone -> persist -> commit so sequential callers observe
    // each other's results
    writer: Mutex<()>,
}

impl<B: CatalogBackend> CatalogClient<B> {
    /// Creates a client with an empty tree; call [`fetch_catalog`](Self::fetch_catalog) to load
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            tree: RwLock::new(Arc::new(Vec::new())),
            writer: Mutex::new(()),
        }
    }

    /// Returns the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the current tree without touching the backend
    pub fn catalog(&self) -> CatalogSnapshot {
        Arc::clone(&self.tree.read())
    }

    /// Finds a series in the current tree
    pub fn find_series(&self, series_id: &str) -> Option<Series> {
        self.catalog().iter().find(|s| s.id == series_id).cloned()
    }

    /// Loads the full catalog from the backend and publishes it
    ///
    /// Seasons and episodes are normalized to ascending number order. Series
    /// order is whatever the backend yields.
    ///
    /// # Returns
    ///
    /// The published snapshot. A store without any catalog yields an empty
    /// snapshot rather than an error.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let catalog = client.fetch_catalog().await?;
    /// for series in catalog.iter() {
    ///     println!("{}", series.title.resolve("en"));
    /// }
    /// ```
    pub async fn fetch_catalog(&self) -> Result<CatalogSnapshot, CatalogError> {
        let _writer = self.writer.lock().await;

        let mut series = self.backend.load_all().await?;
        for s in &mut series {
            s.normalize();
        }
        tracing::debug!(count = series.len(), "Fetched catalog");

        Ok(self.commit(series))
    }

    /// Opens the admin surface for the signed-in user
    ///
    /// The handle follows the provider's sign-in state: once the user signs
    /// out, every further mutation fails with [`CatalogError::Unauthorized`].
    ///
    /// # Arguments
    ///
    /// * `auth` - The provider deciding who is signed in
    ///
    /// # Returns
    ///
    /// The admin handle, or `Unauthorized` when nobody is signed in
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let admin = client.admin(&auth)?;
    /// let id = admin.create_series(NewSeries::titled("Demo")).await?;
    /// ```
    pub fn admin<A>(&self, auth: &A) -> Result<CatalogAdmin<'_, B>, CatalogError>
    where
        A: AuthProvider + ?Sized,
    {
        let session = auth.observe_auth();
        if session.borrow().is_none() {
            return Err(CatalogError::Unauthorized);
        }
        Ok(CatalogAdmin {
            client: self,
            session,
        })
    }

    fn commit(&self, next: Vec<Series>) -> CatalogSnapshot {
        let snapshot = Arc::new(next);
        *self.tree.write() = Arc::clone(&snapshot);
        snapshot
    }

    /// Clones the tree, edits one series, persists it and commits
    ///
    /// `edit` returns `Ok(None)` when its target does not exist; nothing is
    /// persisted in that case.
    async fn mutate_series<T, F>(
        &self,
        series_id: &str,
        edit: F,
    ) -> Result<Option<T>, CatalogError>
    where
        F: FnOnce(&mut Series) -> Result<Option<T>, CatalogError>,
    {
        let _writer = self.writer.lock().await;

        let mut next: Vec<Series> = self.catalog().as_ref().clone();
        let Some(index) = tree::series_index(&next, series_id) else {
            tracing::debug!(series_id, "Series not found, skipping mutation");
            return Ok(None);
        };

        let Some(value) = edit(&mut next[index])? else {
            tracing::debug!(series_id, "Mutation target not found, skipping");
            return Ok(None);
        };
        next[index].normalize();

        self.backend.put_series(&next[index]).await?;
        self.commit(next);
        Ok(Some(value))
    }
}

/// Admin mutations on the catalog, gated on the sign-in state
pub struct CatalogAdmin<'a, B> {
    client: &'a CatalogClient<B>,
    session: watch::Receiver<Option<User>>,
}

impl<B: CatalogBackend> CatalogAdmin<'_, B> {
    /// The user currently performing the mutations, if still signed in
    pub fn user(&self) -> Option<User> {
        self.session.borrow().clone()
    }

    fn authorize(&self) -> Result<User, CatalogError> {
        self.user().ok_or_else(|| {
            tracing::warn!("Rejected catalog mutation after sign-out");
            CatalogError::Unauthorized
        })
    }

    /// Upserts a whole series by id
    ///
    /// Incomplete audio/subtitle entries are dropped and order is normalized
    /// before the series is validated and persisted. Saving the same series
    /// twice leaves the store unchanged.
    ///
    /// # Arguments
    ///
    /// * `series` - The complete series, replacing any stored series with the same id
    ///
    /// # Returns
    ///
    /// `Ok(())` once the series is persisted and published
    pub async fn save_series(&self, mut series: Series) -> Result<(), CatalogError> {
        let user = self.authorize()?;
        series.sanitize();
        series.normalize();
        series.validate()?;

        let _writer = self.client.writer.lock().await;
        let mut next: Vec<Series> = self.client.catalog().as_ref().clone();

        self.client.backend.put_series(&series).await?;

        tracing::info!(series_id = %series.id, user = %user.email, "Saved series");
        match next.iter_mut().find(|s| s.id == series.id) {
            Some(existing) => *existing = series,
            None => next.push(series),
        }
        self.client.commit(next);
        Ok(())
    }

    /// Creates a series
    ///
    /// # Arguments
    ///
    /// * `fields` - Title (required), description and image URLs
    ///
    /// # Returns
    ///
    /// The newly allocated series id
    pub async fn create_series(&self, fields: NewSeries) -> Result<String, CatalogError> {
        let user = self.authorize()?;
        let series = Series {
            id: new_id(),
            title: fields.title,
            description: fields.description,
            poster_url: fields.poster_url.trim().to_string(),
            backdrop_url: fields.backdrop_url.trim().to_string(),
            seasons: Vec::new(),
        };
        series.validate()?;

        let _writer = self.client.writer.lock().await;
        let mut next: Vec<Series> = self.client.catalog().as_ref().clone();

        self.client.backend.put_series(&series).await?;

        let id = series.id.clone();
        tracing::info!(series_id = %id, user = %user.email, "Created series");
        next.push(series);
        self.client.commit(next);
        Ok(id)
    }

    /// Edits the title, description or images of a series
    ///
    /// # Returns
    ///
    /// The updated series, or `None` when `series_id` is unknown
    pub async fn update_series(
        &self,
        series_id: &str,
        patch: SeriesPatch,
    ) -> Result<Option<Series>, CatalogError> {
        let user = self.authorize()?;
        let updated = self
            .client
            .mutate_series(series_id, |series| {
                tree::update_series(series, patch)?;
                Ok(Some(series.clone()))
            })
            .await?;
        if updated.is_some() {
            tracing::info!(series_id, user = %user.email, "Updated series");
        }
        Ok(updated)
    }

    /// Adds a season
    ///
    /// # Arguments
    ///
    /// * `series_id` - The series receiving the season
    /// * `number` - Explicit season number; `None` picks one past the highest
    ///
    /// # Returns
    ///
    /// The new season, or `None` when `series_id` is unknown. An explicit
    /// number already in use fails with `DuplicateSeason`.
    pub async fn add_season(
        &self,
        series_id: &str,
        number: Option<u32>,
    ) -> Result<Option<Season>, CatalogError> {
        self.authorize()?;
        let season = self
            .client
            .mutate_series(series_id, |series| tree::add_season(series, number).map(Some))
            .await?;
        if let Some(season) = &season {
            tracing::info!(series_id, number = season.number, "Added season");
        }
        Ok(season)
    }

    /// Deletes a season with all of its episodes
    ///
    /// # Returns
    ///
    /// Whether a season was removed
    pub async fn delete_season(
        &self,
        series_id: &str,
        season_id: &str,
    ) -> Result<bool, CatalogError> {
        self.authorize()?;
        let deleted = self
            .client
            .mutate_series(series_id, |series| {
                Ok(tree::delete_season(series, season_id).then_some(()))
            })
            .await?
            .is_some();
        if deleted {
            tracing::info!(series_id, season_id, "Deleted season");
        }
        Ok(deleted)
    }

    /// Adds an episode to a season
    ///
    /// # Arguments
    ///
    /// * `series_id` - The series holding the season
    /// * `season_id` - The season receiving the episode
    /// * `draft` - Episode fields; a missing number becomes one past the highest
    ///
    /// # Returns
    ///
    /// The new episode, or `None` when either id is unknown
    pub async fn add_episode(
        &self,
        series_id: &str,
        season_id: &str,
        draft: EpisodeDraft,
    ) -> Result<Option<Episode>, CatalogError> {
        self.authorize()?;
        let episode = self
            .client
            .mutate_series(series_id, |series| tree::add_episode(series, season_id, draft))
            .await?;
        if let Some(episode) = &episode {
            tracing::info!(series_id, season_id, number = episode.number, "Added episode");
        }
        Ok(episode)
    }

    /// Edits an episode
    ///
    /// # Returns
    ///
    /// The patched episode, or `None` when any of the ids is unknown
    pub async fn patch_episode(
        &self,
        series_id: &str,
        season_id: &str,
        episode_id: &str,
        patch: EpisodePatch,
    ) -> Result<Option<Episode>, CatalogError> {
        self.authorize()?;
        self.client
            .mutate_series(series_id, |series| {
                tree::patch_episode(series, season_id, episode_id, patch)
            })
            .await
    }

    /// Deletes an episode
    ///
    /// # Returns
    ///
    /// Whether an episode was removed
    pub async fn delete_episode(
        &self,
        series_id: &str,
        season_id: &str,
        episode_id: &str,
    ) -> Result<bool, CatalogError> {
        self.authorize()?;
        Ok(self
            .client
            .mutate_series(series_id, |series| {
                Ok(tree::delete_episode(series, season_id, episode_id).then_some(()))
            })
            .await?
            .is_some())
    }

    /// Deletes a series with everything below it
    ///
    /// # Returns
    ///
    /// Whether a series was removed
    pub async fn delete_series(&self, series_id: &str) -> Result<bool, CatalogError> {
        let user = self.authorize()?;
        let _writer = self.client.writer.lock().await;
        let mut next: Vec<Series> = self.client.catalog().as_ref().clone();
        let Some(index) = tree::series_index(&next, series_id) else {
            return Ok(false);
        };

        self.client.backend.remove_series(series_id).await?;

        tracing::info!(series_id, user = %user.email, "Deleted series");
        next.remove(index);
        self.client.commit(next);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AdminCredentialsProvider, Credentials};
    use crate::backend::{
        BackendError, DocumentCatalogBackend, MemoryDocumentStore, StorageLayout,
    };
    use crate::catalog::AudioTrack;
    use crate::localized::LocalizedText;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory backend whose writes can be made to fail
    struct FlakyBackend {
        inner: DocumentCatalogBackend<MemoryDocumentStore>,
        fail_writes: AtomicBool,
    }

    impl FlakyBackend {
        fn new(store: MemoryDocumentStore) -> Self {
            Self {
                inner: DocumentCatalogBackend::new(store, StorageLayout::Embedded),
                fail_writes: AtomicBool::new(false),
            }
        }

        fn check(&self) -> Result<(), BackendError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(BackendError::Request("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CatalogBackend for FlakyBackend {
        async fn load_all(&self) -> Result<Vec<Series>, BackendError> {
            self.inner.load_all().await
        }

        async fn put_series(&self, series: &Series) -> Result<(), BackendError> {
            self.check()?;
            self.inner.put_series(series).await
        }

        async fn remove_series(&self, series_id: &str) -> Result<(), BackendError> {
            self.check()?;
            self.inner.remove_series(series_id).await
        }
    }

    async fn signed_in() -> AdminCredentialsProvider {
        let auth = AdminCredentialsProvider::new("admin@letzview.lu", "secret");
        auth.login(&Credentials::new("admin@letzview.lu", "secret"))
            .await
            .unwrap();
        auth
    }

    fn new_client() -> (CatalogClient<FlakyBackend>, MemoryDocumentStore) {
        let store = MemoryDocumentStore::new();
        (CatalogClient::new(FlakyBackend::new(store.clone())), store)
    }

    fn pilot() -> EpisodeDraft {
        EpisodeDraft {
            title: "Pilot".into(),
            video_url: "https://x/p.mp4".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_demo_scenario() {
        let (client, _) = new_client();
        let auth = signed_in().await;
        let admin = client.admin(&auth).unwrap();

        let id = admin
            .create_series(NewSeries::titled("Demo"))
            .await
            .unwrap();
        let season1 = admin.add_season(&id, None).await.unwrap().unwrap();
        let season2 = admin.add_season(&id, None).await.unwrap().unwrap();
        assert_eq!(season1.number, 1);
        assert_eq!(season2.number, 2);

        let episode = admin.add_episode(&id, &season1.id, pilot()).await.unwrap().unwrap();
        assert_eq!(episode.number, 1);

        // A fresh client sees the persisted state
        let fresh = CatalogClient::new(FlakyBackend::new(client.backend().inner.store().clone()));
        let catalog = fresh.fetch_catalog().await.unwrap();
        assert_eq!(catalog.len(), 1);
        let numbers: Vec<u32> = catalog[0].seasons.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(catalog[0].seasons[0].episodes.len(), 1);
        assert_eq!(catalog[0].seasons[0].episodes[0].title.resolve("en"), "Pilot");
    }

    #[tokio::test]
    async fn test_admin_requires_signed_in_user() {
        let (client, _) = new_client();
        let auth = AdminCredentialsProvider::new("admin@letzview.lu", "secret");
        assert!(matches!(client.admin(&auth), Err(CatalogError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_admin_rejected_after_logout() {
        let (client, store) = new_client();
        let auth = signed_in().await;
        let admin = client.admin(&auth).unwrap();
        let id = admin.create_series(NewSeries::titled("Demo")).await.unwrap();
        assert_eq!(admin.user().map(|u| u.email), Some("admin@letzview.lu".to_string()));

        auth.logout().await.unwrap();
        assert!(admin.user().is_none());
        assert!(matches!(
            admin.create_series(NewSeries::titled("Other")).await,
            Err(CatalogError::Unauthorized)
        ));
        assert!(matches!(
            admin.add_season(&id, None).await,
            Err(CatalogError::Unauthorized)
        ));
        assert!(matches!(
            admin.delete_series(&id).await,
            Err(CatalogError::Unauthorized)
        ));
        assert_eq!(client.catalog().len(), 1);
        assert!(client.catalog()[0].seasons.is_empty());
        assert_eq!(store.len(), 1);

        // Signing back in revives the same handle
        auth.login(&Credentials::new("admin@letzview.lu", "secret"))
            .await
            .unwrap();
        assert!(admin.add_season(&id, None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fetch_empty_catalog() {
        let (client, _) = new_client();
        assert!(client.fetch_catalog().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_series_round_trip() {
        let (client, _) = new_client();
        let auth = signed_in().await;
        let admin = client.admin(&auth).unwrap();

        let series = Series {
            id: "s1".to_string(),
            title: LocalizedText::localized([("en", "Demo"), ("fr", "Démo")]),
            description: "About".into(),
            poster_url: "https://x/poster.jpg".to_string(),
            backdrop_url: String::new(),
            seasons: vec![Season {
                id: "season-1".to_string(),
                number: 1,
                episodes: vec![Episode {
                    id: "e1".to_string(),
                    number: 1,
                    title: "Pilot".into(),
                    description: LocalizedText::default(),
                    video_url: "https://x/p.mp4".to_string(),
                    audios: vec![
                        AudioTrack {
                            label: "".into(),
                            url: "http://x".into(),
                        },
                        AudioTrack {
                            label: "FR".into(),
                            url: "https://x/fr.m4a".into(),
                        },
                    ],
                    subtitles: Vec::new(),
                }],
            }],
        };
        admin.save_series(series.clone()).await.unwrap();
        admin.save_series(series.clone()).await.unwrap();

        let fetched = client.fetch_catalog().await.unwrap();
        assert_eq!(fetched.len(), 1);
        let stored = &fetched[0];
        assert_eq!(stored.id, series.id);
        assert_eq!(stored.title, series.title);
        assert_eq!(stored.poster_url, series.poster_url);
        // The incomplete audio entry never survives a save
        let audios = &stored.seasons[0].episodes[0].audios;
        assert_eq!(audios.len(), 1);
        assert_eq!(audios[0].label, "FR");
    }

    #[tokio::test]
    async fn test_failed_write_leaves_tree_untouched() {
        let (client, store) = new_client();
        let auth = signed_in().await;
        let admin = client.admin(&auth).unwrap();

        let id = admin
            .create_series(NewSeries::titled("Demo"))
            .await
            .unwrap();
        let before = client.catalog();

        client.backend().fail_writes.store(true, Ordering::SeqCst);
        let result = admin.add_season(&id, None).await;
        assert!(matches!(result, Err(CatalogError::Backend(_))));
        assert!(admin.delete_series(&id).await.is_err());

        assert_eq!(client.catalog(), before);
        assert!(client.catalog()[0].seasons.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_noops() {
        let (client, store) = new_client();
        let auth = signed_in().await;
        let admin = client.admin(&auth).unwrap();

        assert!(admin.add_season("missing", None).await.unwrap().is_none());
        assert!(!admin.delete_series("missing").await.unwrap());

        let id = admin
            .create_series(NewSeries::titled("Demo"))
            .await
            .unwrap();
        assert!(admin.add_episode(&id, "missing", pilot()).await.unwrap().is_none());
        assert!(!admin.delete_episode(&id, "missing", "missing").await.unwrap());
        assert!(
            admin
                .patch_episode(&id, "missing", "missing", EpisodePatch::default())
                .await
                .unwrap()
                .is_none()
        );

        // A stale episode id stays a no-op even when its number would collide
        let season = admin.add_season(&id, None).await.unwrap().unwrap();
        admin.add_episode(&id, &season.id, pilot()).await.unwrap().unwrap();
        let colliding = EpisodePatch {
            number: Some(1),
            ..Default::default()
        };
        assert!(
            admin
                .patch_episode(&id, &season.id, "stale-id", colliding)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(client.catalog()[0].seasons[0].episodes.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_validation_before_persistence() {
        let (client, store) = new_client();
        let auth = signed_in().await;
        let admin = client.admin(&auth).unwrap();

        let result = admin
            .create_series(NewSeries::titled("  "))
            .await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
        assert!(store.is_empty());
        assert!(client.catalog().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_season_rejected() {
        let (client, _) = new_client();
        let auth = signed_in().await;
        let admin = client.admin(&auth).unwrap();

        let id = admin
            .create_series(NewSeries::titled("Demo"))
            .await
            .unwrap();
        admin.add_season(&id, Some(1)).await.unwrap();
        assert!(matches!(
            admin.add_season(&id, Some(1)).await,
            Err(CatalogError::DuplicateSeason { number: 1, .. })
        ));
        assert_eq!(client.catalog()[0].seasons.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_quick_adds_get_distinct_numbers() {
        let (client, _) = new_client();
        let auth = signed_in().await;
        let admin = client.admin(&auth).unwrap();

        let id = admin
            .create_series(NewSeries::titled("Demo"))
            .await
            .unwrap();
        let (a, b) = tokio::join!(admin.add_season(&id, None), admin.add_season(&id, None));
        let mut numbers = vec![a.unwrap().unwrap().number, b.unwrap().unwrap().number];
        numbers.sort();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_snapshots_are_immutable() {
        let (client, _) = new_client();
        let auth = signed_in().await;
        let admin = client.admin(&auth).unwrap();

        let id = admin
            .create_series(NewSeries::titled("Demo"))
            .await
            .unwrap();
        let old = client.catalog();
        admin.add_season(&id, None).await.unwrap();

        assert!(old[0].seasons.is_empty());
        assert_eq!(client.catalog()[0].seasons.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_series() {
        let (client, _) = new_client();
        let auth = signed_in().await;
        let admin = client.admin(&auth).unwrap();

        let id = admin
            .create_series(NewSeries::titled("Demo"))
            .await
            .unwrap();
        let patch = SeriesPatch {
            backdrop_url: Some("https://x/b.jpg".to_string()),
            ..Default::default()
        };
        let updated = admin.update_series(&id, patch).await.unwrap().unwrap();
        assert_eq!(updated.backdrop_url, "https://x/b.jpg");

        assert!(admin.delete_series(&id).await.unwrap());
        assert!(client.catalog().is_empty());
        assert!(client.fetch_catalog().await.unwrap().is_empty());
    }
}
