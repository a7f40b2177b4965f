//! Synchronized dual-track playback
//!
//! An episode plays from its primary video. Choosing an alternate audio
//! track mutes the video and plays the dub on a secondary element, which
//! follows the primary: every play, pause, seek and rate change is mirrored
//! onto it, and a background task corrects any drift that still builds up.
//! The secondary is never the source of truth.

mod drift;

use crate::catalog::{Episode, SubtitleTrack};
use drift::DriftTask;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;

/// Errors reported by a media element.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The element refused to start, e.g. because autoplay is blocked
    #[error("Playback refused: {0}")]
    PlaybackRefused(String),
}

/// Errors that can occur while controlling playback.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The primary element failed
    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

/// A playable media element, such as a video or audio output
///
/// Positions and rates are in seconds and multiples of normal speed.
pub trait MediaElement: Send {
    fn position(&self) -> f64;
    fn seek(&mut self, position: f64);
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);

    /// Points the element at a new resource; `None` unloads it
    fn set_source(&mut self, url: Option<&str>);

    /// Frees the underlying resources
    fn release(&mut self) {}
}

/// Which audio the viewer hears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSelection {
    /// The audio embedded in the video
    Primary,
    /// An alternate track, by index into the episode's audios
    Track(usize),
}

/// Which subtitles are shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleSelection {
    Off,
    Language(String),
}

/// Events raised by the primary element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryEvent {
    Play,
    Pause,
    Seeked,
    RateChanged,
}

/// Drift correction settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerConfig {
    /// How often the secondary track is checked
    pub drift_check_interval: Duration,
    /// Largest tolerated position difference, in seconds
    pub drift_tolerance: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            drift_check_interval: Duration::from_millis(500),
            drift_tolerance: 0.3,
        }
    }
}

/// Both elements and the current audio mode, shared with the drift task
pub(crate) struct Tracks<V, A> {
    pub(crate) primary: V,
    pub(crate) secondary: A,
    pub(crate) audio: AudioSelection,
}

/// Plays one episode on a primary video and a secondary audio element
pub struct Player<V, A> {
    episode: Episode,
    config: PlayerConfig,
    runtime: Handle,
    tracks: Arc<Mutex<Tracks<V, A>>>,
    subtitle: SubtitleSelection,
    drift: Option<DriftTask>,
}

impl<V, A> Player<V, A>
where
    V: MediaElement + 'static,
    A: MediaElement + 'static,
{
    /// Loads `episode` into the elements with the embedded audio selected
    ///
    /// The drift task is spawned on `runtime` once an alternate track is
    /// chosen.
    ///
    /// # Arguments
    ///
    /// * `episode` - The episode to play; its `video_url` becomes the primary source
    /// * `primary` - Video element carrying the embedded audio
    /// * `secondary` - Audio element for alternate tracks; starts muted with no source
    /// * `config` - Drift correction interval and tolerance
    /// * `runtime` - Runtime the drift task is spawned on
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = PlayerConfig::default();
    /// let mut player = Player::open(&episode, video, audio, config, Handle::current());
    /// player.select_audio(AudioSelection::Track(0));
    /// ```
    pub fn open(
        episode: &Episode,
        mut primary: V,
        mut secondary: A,
        config: PlayerConfig,
        runtime: Handle,
    ) -> Self {
        primary.set_source(Some(&episode.video_url));
        primary.set_muted(false);
        secondary.set_source(None);
        secondary.set_muted(true);
        tracing::debug!(episode_id = %episode.id, "Opened player");

        Self {
            episode: episode.clone(),
            config,
            runtime,
            tracks: Arc::new(Mutex::new(Tracks {
                primary,
                secondary,
                audio: AudioSelection::Primary,
            })),
            subtitle: SubtitleSelection::Off,
            drift: None,
        }
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    pub fn audio(&self) -> AudioSelection {
        self.tracks.lock().audio
    }

    pub fn subtitle(&self) -> &SubtitleSelection {
        &self.subtitle
    }

    /// The subtitle track currently shown, if any
    pub fn active_subtitle(&self) -> Option<&SubtitleTrack> {
        match &self.subtitle {
            SubtitleSelection::Off => None,
            SubtitleSelection::Language(lang) => {
                self.episode.subtitles.iter().find(|s| &s.lang == lang)
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        !self.tracks.lock().primary.is_paused()
    }

    /// Whether drift correction is currently running
    pub fn is_drift_active(&self) -> bool {
        self.drift.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Switches the audio the viewer hears
    ///
    /// The old source is muted before the new one is positioned and started.
    /// Returns `false` without changing anything for an out-of-range track.
    pub fn select_audio(&mut self, selection: AudioSelection) -> bool {
        match selection {
            AudioSelection::Primary => {
                self.drift = None;
                let mut tracks = self.tracks.lock();
                tracks.secondary.pause();
                tracks.secondary.set_muted(true);
                tracks.primary.set_muted(false);
                tracks.audio = AudioSelection::Primary;
            }
            AudioSelection::Track(index) => {
                let Some(track) = self.episode.audios.get(index) else {
                    tracing::debug!(index, "No such audio track");
                    return false;
                };

                let mut tracks = self.tracks.lock();
                tracks.primary.set_muted(true);
                tracks.secondary.pause();
                tracks.secondary.set_source(Some(&track.url));
                let position = tracks.primary.position();
                let rate = tracks.primary.playback_rate();
                tracks.secondary.seek(position);
                tracks.secondary.set_playback_rate(rate);
                tracks.secondary.set_muted(false);
                if !tracks.primary.is_paused() {
                    if let Err(e) = tracks.secondary.play() {
                        tracing::debug!(error = %e, "Secondary track refused to start");
                    }
                }
                tracks.audio = selection;
                drop(tracks);

                if !self.is_drift_active() {
                    self.drift = Some(DriftTask::spawn(
                        &self.runtime,
                        Arc::downgrade(&self.tracks),
                        self.config,
                    ));
                }
                tracing::debug!(label = %track.label, "Switched to alternate audio");
            }
        }
        true
    }

    /// Shows subtitles for a language, or hides them
    ///
    /// Returns `false` without changing anything for an unknown language.
    pub fn select_subtitle(&mut self, selection: SubtitleSelection) -> bool {
        if let SubtitleSelection::Language(lang) = &selection {
            if !self.episode.subtitles.iter().any(|s| &s.lang == lang) {
                tracing::debug!(%lang, "No such subtitle track");
                return false;
            }
        }
        self.subtitle = selection;
        true
    }

    /// Mirrors an event of the primary element onto the secondary
    pub fn handle(&self, event: PrimaryEvent) {
        let mut guard = self.tracks.lock();
        let tracks = &mut *guard;
        if tracks.audio == AudioSelection::Primary {
            return;
        }

        match event {
            PrimaryEvent::Play => {
                if let Err(e) = tracks.secondary.play() {
                    tracing::debug!(error = %e, "Secondary track refused to start");
                }
            }
            PrimaryEvent::Pause => tracks.secondary.pause(),
            PrimaryEvent::Seeked => tracks.secondary.seek(tracks.primary.position()),
            PrimaryEvent::RateChanged => tracks
                .secondary
                .set_playback_rate(tracks.primary.playback_rate()),
        }
    }

    /// Starts the primary and mirrors it
    pub fn play(&self) -> Result<(), PlayerError> {
        self.tracks.lock().primary.play()?;
        self.handle(PrimaryEvent::Play);
        Ok(())
    }

    pub fn pause(&self) {
        self.tracks.lock().primary.pause();
        self.handle(PrimaryEvent::Pause);
    }

    pub fn seek(&self, position: f64) {
        self.tracks.lock().primary.seek(position.max(0.0));
        self.handle(PrimaryEvent::Seeked);
    }

    pub fn set_rate(&self, rate: f64) {
        self.tracks.lock().primary.set_playback_rate(rate);
        self.handle(PrimaryEvent::RateChanged);
    }

    /// Stops drift correction and releases both elements
    pub fn close(mut self) {
        self.drift = None;
        let mut tracks = self.tracks.lock();
        tracks.primary.pause();
        tracks.secondary.pause();
        tracks.primary.release();
        tracks.secondary.release();
        tracing::debug!(episode_id = %self.episode.id, "Closed player");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{MediaElement, MediaError};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug)]
    pub(crate) struct FakeState {
        pub(crate) position: f64,
        pub(crate) paused: bool,
        pub(crate) muted: bool,
        pub(crate) rate: f64,
        pub(crate) source: Option<String>,
        pub(crate) refuse_play: bool,
        pub(crate) seeks: usize,
        pub(crate) released: bool,
        /// Calls in order, e.g. `mute`, `source`, `seek`, `play`
        pub(crate) log: Vec<&'static str>,
    }

    /// Media element whose state stays inspectable from the test
    pub(crate) struct FakeMedia {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeMedia {
        pub(crate) fn new() -> (Self, Arc<Mutex<FakeState>>) {
            let state = Arc::new(Mutex::new(FakeState {
                position: 0.0,
                paused: true,
                muted: false,
                rate: 1.0,
                source: None,
                refuse_play: false,
                seeks: 0,
                released: false,
                log: Vec::new(),
            }));
            (
                Self {
                    state: Arc::clone(&state),
                },
                state,
            )
        }
    }

    impl MediaElement for FakeMedia {
        fn position(&self) -> f64 {
            self.state.lock().position
        }

        fn seek(&mut self, position: f64) {
            let mut state = self.state.lock();
            state.position = position;
            state.seeks += 1;
            state.log.push("seek");
        }

        fn play(&mut self) -> Result<(), MediaError> {
            let mut state = self.state.lock();
            if state.refuse_play {
                return Err(MediaError::PlaybackRefused("autoplay blocked".to_string()));
            }
            state.paused = false;
            state.log.push("play");
            Ok(())
        }

        fn pause(&mut self) {
            let mut state = self.state.lock();
            state.paused = true;
            state.log.push("pause");
        }

        fn is_paused(&self) -> bool {
            self.state.lock().paused
        }

        fn set_muted(&mut self, muted: bool) {
            let mut state = self.state.lock();
            state.muted = muted;
            state.log.push(if muted { "mute" } else { "unmute" });
        }

        fn is_muted(&self) -> bool {
            self.state.lock().muted
        }

        fn playback_rate(&self) -> f64 {
            self.state.lock().rate
        }

        fn set_playback_rate(&mut self, rate: f64) {
            self.state.lock().rate = rate;
        }

        fn set_source(&mut self, url: Option<&str>) {
            let mut state = self.state.lock();
            state.source = url.map(str::to_string);
            state.log.push("source");
        }

        fn release(&mut self) {
            self.state.lock().released = true;
        }
    }
}
