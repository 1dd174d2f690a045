//! The boundary between a session and the outside world.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::Track;
use crate::error::PlaybackError;
use crate::serenity::GuildId;

/// Plays tracks on a guild's voice connection.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Start playing `track`, replacing whatever is playing in the guild.
    /// The output must fire `signal` exactly once the track ends, is stopped or fails.
    async fn play(
        &self,
        guild_id: GuildId,
        track: &Track,
        volume: f32,
        signal: PlaybackSignal,
    ) -> Result<Box<dyn PlayingTrack>, PlaybackError>;

    /// Leave the guild's voice channel. Does nothing if not connected.
    async fn disconnect(&self, guild_id: GuildId);
}

/// Control over a track started by an [AudioOutput].
pub trait PlayingTrack: Send + Sync {
    fn pause(&self) -> Result<(), PlaybackError>;
    fn resume(&self) -> Result<(), PlaybackError>;
    /// Stop the track, this fires its [PlaybackSignal].
    fn stop(&self) -> Result<(), PlaybackError>;
    fn set_volume(&self, volume: f32) -> Result<(), PlaybackError>;
}

/// Sends messages about playback to the track's text channel.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn now_playing(&self, track: &Track);
    async fn playback_failed(&self, track: &Track, error: &PlaybackError);
}

/// How a track stopped playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Finished,
    Failed(String),
}

/// Single use "track is done" signal for one playback start.
///
/// Carries the generation of the start so the session can drop signals that
/// arrive after it already moved on.
#[derive(Debug, Clone)]
pub struct PlaybackSignal {
    generation: u64,
    sender: UnboundedSender<(u64, PlaybackEvent)>,
}

impl PlaybackSignal {
    pub(super) fn new(generation: u64, sender: UnboundedSender<(u64, PlaybackEvent)>) -> Self {
        Self { generation, sender }
    }

    /// The track ended or was stopped.
    pub fn finished(&self) {
        self.send(PlaybackEvent::Finished)
    }

    /// The track failed mid-playback.
    pub fn failed(&self, reason: impl Into<String>) {
        self.send(PlaybackEvent::Failed(reason.into()))
    }

    fn send(&self, event: PlaybackEvent) {
        // A closed channel means the session is gone, nobody is listening.
        if self.sender.send((self.generation, event)).is_err() {
            tracing::trace!("Dropped playback signal for a closed session.");
        }
    }
}
