//! Error types.
//!
//! [GramophoneError] is the error type given to the [poise] framework.
//! Anything a user should see as a plain reply is a [UserError], everything else
//! is treated as a bug (see [handle_framework_error](crate::log::handle_framework_error)).

use std::time::Duration;

use thiserror::Error;

use crate::serenity;

/// Top level error type of the bot.
#[derive(Debug, Error)]
pub enum GramophoneError {
    /// Errors caused by the user, shown to them as a reply.
    #[error(transparent)]
    UserError(#[from] UserError),

    /// Errors while reading the config file.
    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    /// Resolver errors that aren't the user's fault.
    #[error("Failed to resolve track: {0}")]
    Resolve(ResolveError),

    /// The audio pipeline failed.
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("Serenity error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("Failed to join voice channel: {0}")]
    Join(#[from] songbird::error::JoinError),

    /// Something that should have been initialized on startup is missing.
    #[error("Missing from setup: {reason}")]
    MissingFromSetup { reason: String },

    /// A command check returned an error.
    #[error("Command check failed: {}", reason.as_deref().unwrap_or("no reason given"))]
    CheckFailed { reason: Option<String> },

    /// A command panicked.
    #[error("Command panicked: {}", payload.as_deref().unwrap_or("no payload"))]
    Panic { payload: Option<String> },

    /// Discord's view of the commands doesn't match the bot's.
    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch { description: String },
}

/// Errors that are caused by the user and are not bugs.
/// The display string of each variant is sent as the reply.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("This command only works in a server.")]
    GuildOnly,
    #[error("This command only works in direct messages.")]
    DmOnly,
    #[error("This command only works in NSFW channels.")]
    NsfwOnly,
    #[error("You are not in a server.")]
    NotInGuild,
    #[error("Join a voice channel first.")]
    NotInVoice,
    #[error("I'm already in another voice channel.")]
    AlreadyConnected,
    #[error("I'm not connected to a voice channel.")]
    NotConnected,
    #[error("Nothing is playing right now.")]
    NothingPlaying,
    #[error("Nothing is paused right now.")]
    NotPaused,
    #[error("The player just shut down, try again.")]
    SessionEnded,
    #[error("The queue is empty.")]
    EmptyQueue,
    #[error("There is no track number {position} in the queue ({len} queued).")]
    NoSuchTrack { position: usize, len: usize },
    #[error("There is no page {page}, the queue has {pages} page(s).")]
    NoSuchPage { page: usize, pages: usize },
    #[error("Volume must be between 0 and 100, not {volume}.")]
    VolumeOutOfRange { volume: i64 },
    #[error("You already voted to skip this track.")]
    AlreadyVoted,
    #[error("Couldn't find anything that matches `{query}`.")]
    NoMatches { query: String },
    #[error("Search failed: {reason}")]
    SearchFailed { reason: String },
    #[error("Missing subcommand, try one of: {subcmds}")]
    MissingSubcommand { subcmds: String },
    #[error("Couldn't understand `{}`.", input.as_deref().unwrap_or_default())]
    BadArgs { input: Option<String> },
    #[error("Slow down! Try again in {} seconds.", remaining_cooldown.as_secs())]
    OnCooldown { remaining_cooldown: Duration },
    #[error("I'm missing permissions: {missing_permissions}")]
    MissingBotPermissions {
        missing_permissions: serenity::Permissions,
    },
    #[error("You are missing permissions: {}", missing_permissions.map(|p| p.to_string()).unwrap_or("unknown".to_string()))]
    MissingUserPermissions {
        missing_permissions: Option<serenity::Permissions>,
    },
    #[error("Only owners can use this command.")]
    NotOwner,
}

/// Errors while loading [Config](crate::setup::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found. {action_msg}")]
    MissingConfig { action_msg: String },
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },
    #[error("Config IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors from a [TrackResolver](crate::player::TrackResolver).
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Couldn't find anything that matches `{query}`.")]
    NotFound { query: String },
    #[error("Extractor failed: {reason}")]
    Extractor { reason: String },
    #[error("Metadata for `{url}` has no audio stream.")]
    NoStream { url: String },
    #[error("Malformed extractor output: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Could not run extractor: {0}")]
    Io(#[from] std::io::Error),
    #[error("Extractor task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors from the audio output.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Not connected to a voice channel.")]
    NotConnected,
    #[error("Track control failed: {0}")]
    Control(#[from] songbird::error::ControlError),
    #[error("Audio output failed: {reason}")]
    Output { reason: String },
}

/// Not finding a track or the extractor refusing the query is shown to the user,
/// other resolver failures are bugs.
impl From<ResolveError> for GramophoneError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::NotFound { query } => UserError::NoMatches { query }.into(),
            ResolveError::Extractor { reason } => UserError::SearchFailed { reason }.into(),
            other => GramophoneError::Resolve(other),
        }
    }
}
