//! Maps guilds to their [PlaybackSession].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::{Announcer, AudioOutput, PlaybackSession, PlayerSettings};
use crate::serenity::GuildId;

/// All live playback sessions.
/// Internally uses an [Arc], so it's cheap to clone.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<GuildId, Arc<PlaybackSession>>>>,
    output: Arc<dyn AudioOutput>,
    announcer: Arc<dyn Announcer>,
    settings: PlayerSettings,
}

impl SessionRegistry {
    pub fn new(
        output: Arc<dyn AudioOutput>,
        announcer: Arc<dyn Announcer>,
        settings: PlayerSettings,
    ) -> Self {
        Self {
            sessions: Default::default(),
            output,
            announcer,
            settings,
        }
    }

    /// The guild's session, if it has one that is still alive.
    pub async fn get(&self, guild_id: GuildId) -> Option<Arc<PlaybackSession>> {
        let session = self.sessions.lock().await.get(&guild_id).cloned()?;
        if session.is_terminated().await {
            None
        } else {
            Some(session)
        }
    }

    /// The guild's session, starting a new one if there is none
    /// or the old one terminated itself.
    pub async fn get_or_create(&self, guild_id: GuildId) -> Arc<PlaybackSession> {
        let mut sessions = self.sessions.lock().await;

        if let Some(session) = sessions.get(&guild_id) {
            if !session.is_terminated().await {
                return session.clone();
            }
            tracing::debug!("Replacing terminated session of guild {guild_id}.");
        }

        let session = Arc::new(PlaybackSession::start(
            guild_id,
            self.output.clone(),
            self.announcer.clone(),
            self.settings.clone(),
        ));
        sessions.insert(guild_id, session.clone());
        session
    }

    /// Terminate the guild's session and forget it.
    /// Returns `false` if there was nothing to destroy.
    pub async fn destroy(&self, guild_id: GuildId) -> bool {
        // Don't hold the map while the session disconnects.
        let removed = self.sessions.lock().await.remove(&guild_id);
        match removed {
            Some(session) => {
                session.terminate().await;
                tracing::info!("Destroyed session of guild {guild_id}.");
                true
            }
            None => false,
        }
    }
}
