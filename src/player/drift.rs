//! Periodic drift correction between the primary and secondary tracks.

use super::{AudioSelection, MediaElement, PlayerConfig, Tracks};
use parking_lot::Mutex;
use std::sync::Weak;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Brings `secondary` in line with `primary` once
///
/// Hard-seeks when the positions differ by more than `tolerance` seconds and
/// matches the paused state. Returns whether a seek was needed.
pub(crate) fn sync_tick<V, A>(primary: &V, secondary: &mut A, tolerance: f64) -> bool
where
    V: MediaElement + ?Sized,
    A: MediaElement + ?Sized,
{
    let target = primary.position();
    let drift = (secondary.position() - target).abs();
    let corrected = drift > tolerance;
    if corrected {
        tracing::trace!(drift, position = target, "Correcting secondary track drift");
        secondary.seek(target);
    }

    match (primary.is_paused(), secondary.is_paused()) {
        (true, false) => secondary.pause(),
        (false, true) => {
            if let Err(e) = secondary.play() {
                tracing::debug!(error = %e, "Secondary track refused to resume");
            }
        }
        _ => {}
    }
    corrected
}

/// Background task running [`sync_tick`] on a fixed interval
///
/// Only holds a weak reference to the tracks, so it ends by itself once the
/// player is gone. Dropping the task aborts it.
pub(crate) struct DriftTask {
    handle: JoinHandle<()>,
}

impl DriftTask {
    pub(crate) fn spawn<V, A>(
        runtime: &Handle,
        tracks: Weak<Mutex<Tracks<V, A>>>,
        config: PlayerConfig,
    ) -> Self
    where
        V: MediaElement + 'static,
        A: MediaElement + 'static,
    {
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(config.drift_check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(tracks) = tracks.upgrade() else {
                    break;
                };
                {
                    let mut guard = tracks.lock();
                    let Tracks {
                        primary,
                        secondary,
                        audio,
                    } = &mut *guard;
                    if *audio == AudioSelection::Primary {
                        break;
                    }
                    sync_tick(&*primary, secondary, config.drift_tolerance);
                }
            }
            tracing::debug!("Drift correction stopped");
        });
        Self { handle }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for DriftTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
