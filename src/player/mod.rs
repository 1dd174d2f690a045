//! Per-guild audio playback.
//!
//! Each guild gets a [PlaybackSession] from the [SessionRegistry]. A session owns a
//! [SongQueue] and a background task that drains it into an [AudioOutput].
//! Tracks are produced by a [TrackResolver].

mod output;
mod queue;
mod registry;
mod session;
mod track;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ResolveError;

pub use output::{Announcer, AudioOutput, PlaybackEvent, PlaybackSignal, PlayingTrack};
pub use queue::{QueuePage, SongQueue};
pub use registry::SessionRegistry;
pub use session::{Phase, PlaybackSession, SkipOutcome};
pub use track::{DurationParts, Origin, Track, TrackInfo};

/// Turns user input into a playable [Track].
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resolve a search phrase or url, `origin` is who asked and where to answer.
    async fn resolve(&self, query: &str, origin: Origin) -> Result<Track, ResolveError>;
}

/// Tunables shared by every session.
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    /// How long a session waits for a new track before leaving.
    pub idle_timeout: Duration,
    /// Distinct votes needed to skip someone else's track.
    pub skip_threshold: usize,
    /// Volume of new sessions, between 0.0 and 1.0.
    pub default_volume: f32,
    /// Tracks per page of the `/queue` listing.
    pub page_size: usize,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(180),
            skip_threshold: 3,
            default_volume: 0.5,
            page_size: 10,
        }
    }
}
