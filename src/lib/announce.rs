//! Posting playback updates to text channels.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::{CreateMessage, Mentionable};

use crate::error::PlaybackError;
use crate::player::{Announcer, Track};
use crate::serenity;

/// Sends messages to the channel each track was requested from.
pub struct ChannelAnnouncer {
    http: Arc<serenity::Http>,
}

impl ChannelAnnouncer {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }

    async fn send(&self, track: &Track, message: CreateMessage) {
        // Nothing to do about it but log, the channel may be gone.
        if let Err(e) = track.channel.send_message(&self.http, message).await {
            tracing::warn!("Failed to announce in channel {}: {e}", track.channel);
        }
    }
}

#[async_trait]
impl Announcer for ChannelAnnouncer {
    async fn now_playing(&self, track: &Track) {
        let message = CreateMessage::new().embed(track.embed());
        self.send(track, message).await;
    }

    async fn playback_failed(&self, track: &Track, error: &PlaybackError) {
        tracing::debug!("Announcing failure of '{}': {error}", track.title);
        let message = CreateMessage::new().content(format!(
            "Couldn't play {track}, skipping it. {}",
            track.requester.mention()
        ));
        self.send(track, message).await;
    }
}
