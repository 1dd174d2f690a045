//! Manages [voice calls](songbird::Call).
//!
//! Joining goes through [get_call], which registers the per-call event handlers
//! the first time the bot enters a guild's voice. Playback itself goes through
//! [SongbirdOutput], the [AudioOutput] every session plays into.

use std::sync::Arc;

use async_trait::async_trait;
use songbird::input::{HttpRequest, Input};
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Event, EventContext, EventHandler, TrackEvent};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::error::{PlaybackError, UserError};
use crate::lib::events;
use crate::player::{AudioOutput, PlaybackSignal, PlayingTrack, Track};
use crate::serenity::{ChannelId, GuildId};
use crate::Context;
use crate::GramophoneError;

/// Convenience type alias for [songbird::Call].
pub type CallRef = Arc<Mutex<songbird::Call>>;
/// Convenience type alias for [songbird::Songbird].
pub type Manager = Arc<songbird::Songbird>;

/// Alias for discovery.
/// Must always use this function to initialize a call.
pub use events::init_global_events as get_call;

/// Get the [Manager] from [Context]
pub async fn get_manager(ctx: &Context<'_>) -> Result<Manager, GramophoneError> {
    songbird::get(ctx.serenity_context())
        .await
        .ok_or(GramophoneError::MissingFromSetup {
            reason: "Expecting songbird manager.".to_string(),
        })
}

/// The voice channel the author is in.
pub fn author_channel(ctx: &Context<'_>) -> Result<ChannelId, UserError> {
    let guild = ctx.guild().ok_or(UserError::NotInGuild)?;
    guild
        .voice_states
        .get(&ctx.author().id)
        .and_then(|vs| vs.channel_id)
        .ok_or(UserError::NotInVoice)
}

/// The voice channel the bot is in, if any.
pub async fn bot_channel(ctx: &Context<'_>) -> Result<Option<ChannelId>, GramophoneError> {
    let guild_id = ctx.guild_id().ok_or(UserError::GuildOnly)?;
    let manager = get_manager(ctx).await?;
    let Some(call) = manager.get(guild_id) else {
        return Ok(None);
    };
    let channel = call.lock().await.current_channel();
    // Convert songbird::ChannelId -> serenity::ChannelId
    Ok(channel.map(|c| ChannelId::from(c.0)))
}

/// Join the author's voice channel, moving if the bot is elsewhere.
#[instrument(skip(ctx), fields(author=%ctx.author(), guild=?ctx.guild_id()))]
pub async fn join_author(ctx: &Context<'_>) -> Result<ChannelId, GramophoneError> {
    let channel_id = author_channel(ctx)?;
    join_channel(ctx, channel_id).await?;
    Ok(channel_id)
}

/// Make sure the bot is in the author's voice channel before playing.
/// Joins if the bot isn't connected, refuses if it's in another channel.
#[instrument(skip(ctx), fields(author=%ctx.author(), guild=?ctx.guild_id()))]
pub async fn ensure_with_author(ctx: &Context<'_>) -> Result<ChannelId, GramophoneError> {
    let channel_id = author_channel(ctx)?;
    match bot_channel(ctx).await? {
        Some(current) if current == channel_id => Ok(channel_id),
        Some(_) => Err(UserError::AlreadyConnected)?,
        None => {
            join_channel(ctx, channel_id).await?;
            Ok(channel_id)
        }
    }
}

/// Join `channel_id` in the invoking guild and register global songbird events.
#[instrument(skip(ctx), fields(guild=?ctx.guild_id()))]
pub async fn join_channel(ctx: &Context<'_>, channel_id: ChannelId) -> Result<CallRef, GramophoneError> {
    // Initializes only once
    get_call(ctx).await?;

    let manager = get_manager(ctx).await?;
    let guild_id = ctx.guild_id().ok_or(UserError::GuildOnly)?;

    tracing::info!(
        "Joining {channel} at {guild}",
        channel = channel_id,
        guild = guild_id.name(ctx).unwrap_or("<MISSING GUILD>".to_string())
    );

    let call = manager.join(guild_id, channel_id).await?;
    Ok(call)
}

/// Plays tracks through songbird, streaming them over http.
pub struct SongbirdOutput {
    manager: Manager,
    /// Client used for [HttpRequest] inputs, uses an [Arc] internally.
    http: reqwest::Client,
}

impl SongbirdOutput {
    pub fn new(manager: Manager, http: reqwest::Client) -> Self {
        Self { manager, http }
    }
}

#[async_trait]
impl AudioOutput for SongbirdOutput {
    #[instrument(skip_all, fields(guild=%guild_id, track=%track.title))]
    async fn play(
        &self,
        guild_id: GuildId,
        track: &Track,
        volume: f32,
        signal: PlaybackSignal,
    ) -> Result<Box<dyn PlayingTrack>, PlaybackError> {
        let call = self.manager.get(guild_id).ok_or(PlaybackError::NotConnected)?;

        let input: Input = HttpRequest::new(self.http.clone(), track.stream_url.clone()).into();
        let handle = {
            let mut call = call.lock().await;
            if call.current_channel().is_none() {
                return Err(PlaybackError::NotConnected);
            }
            // Replaces (and ends) whatever was playing before.
            call.play_only(songbird::tracks::Track::new(input).volume(volume))
        };

        let forward = ForwardEnd { signal };
        handle.add_event(Event::Track(TrackEvent::End), forward.clone())?;
        handle.add_event(Event::Track(TrackEvent::Error), forward)?;

        Ok(Box::new(handle))
    }

    async fn disconnect(&self, guild_id: GuildId) {
        if self.manager.get(guild_id).is_none() {
            return;
        }
        if let Err(e) = self.manager.remove(guild_id).await {
            tracing::warn!("Failed to leave voice in guild {guild_id}: {e}");
        }
    }
}

impl PlayingTrack for TrackHandle {
    fn pause(&self) -> Result<(), PlaybackError> {
        Ok(TrackHandle::pause(self)?)
    }

    fn resume(&self) -> Result<(), PlaybackError> {
        Ok(self.play()?)
    }

    fn stop(&self) -> Result<(), PlaybackError> {
        Ok(TrackHandle::stop(self)?)
    }

    fn set_volume(&self, volume: f32) -> Result<(), PlaybackError> {
        Ok(TrackHandle::set_volume(self, volume)?)
    }
}

/// Forwards the end of a track into its [PlaybackSignal].
#[derive(Clone)]
struct ForwardEnd {
    signal: PlaybackSignal,
}

#[async_trait]
impl EventHandler for ForwardEnd {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track([(state, _), ..]) => match &state.playing {
                PlayMode::Errored(e) => Some(format!("{e:?}")),
                _ => None,
            },
            _ => None,
        };

        match error {
            Some(reason) => self.signal.failed(reason),
            None => self.signal.finished(),
        }
        // A track ends once, the handler is done.
        Some(Event::Cancel)
    }
}

/// Leave the invoking guild's call, returns `false` if there was none.
pub async fn leave(ctx: &Context<'_>) -> Result<bool, GramophoneError> {
    let guild_id = ctx.guild_id().ok_or(UserError::GuildOnly)?;
    let manager = get_manager(ctx).await?;
    if manager.get(guild_id).is_none() {
        return Ok(false);
    }
    manager.remove(guild_id).await?;
    Ok(true)
}
