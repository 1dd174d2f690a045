//! This module contains everything relating to [Data].

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::Client;
use serenity::UserId;

use crate::error::UserError;
use crate::player::{PlaybackSession, SessionRegistry, TrackResolver};
use crate::serenity;
use crate::Context;

/// The data kept between shards
pub struct Data {
    /// List of users to send bug notifications
    pub notify_list: HashSet<UserId>,
    /// Playback session of every guild, uses an [Arc] internally
    pub sessions: SessionRegistry,
    /// Turns `/play` queries into tracks
    pub resolver: Arc<dyn TrackResolver>,
}

/// Key to store a [Client] in a [TypeMapKey](serenity::prelude::TypeMapKey)
pub struct HttpKey;
impl serenity::prelude::TypeMapKey for HttpKey {
    type Value = Client;
}

/// Is able to get the invoking guild's session.
pub trait GetData {
    /// Returns the guild's session, starting one if needed. Errors if not in a guild.
    async fn session(&self) -> Result<Arc<PlaybackSession>, UserError>;
    /// Returns the guild's live session. Errors if not in a guild or there is none.
    async fn existing_session(&self) -> Result<Arc<PlaybackSession>, UserError>;
}

impl GetData for Context<'_> {
    async fn session(&self) -> Result<Arc<PlaybackSession>, UserError> {
        let guild = self.guild_id().ok_or(UserError::GuildOnly)?;
        Ok(self.data().sessions.get_or_create(guild).await)
    }

    async fn existing_session(&self) -> Result<Arc<PlaybackSession>, UserError> {
        let guild = self.guild_id().ok_or(UserError::GuildOnly)?;
        self.data()
            .sessions
            .get(guild)
            .await
            .ok_or(UserError::NothingPlaying)
    }
}
