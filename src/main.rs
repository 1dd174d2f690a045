//! A discord music bot.
//!
//! Every guild gets its own [playback session](player::PlaybackSession) that plays
//! queued tracks in the voice channel it was summoned to.

mod commands;
mod data;
mod error;
mod lib;
mod log;
mod player;
mod setup;

pub use poise::serenity_prelude as serenity;

pub use data::Data;
pub use error::GramophoneError;
pub use setup::Config;

/// Convenient type alias for [poise::Context].
pub type Context<'a> = poise::Context<'a, Data, GramophoneError>;

#[tokio::main]
async fn main() -> Result<(), GramophoneError> {
    let config = Config::read()?;

    // Keep the guard alive, dropping it stops file logging.
    let _guard = log::install_tracing(&config);

    let mut client = setup::client(config).await?;
    client.start().await?;

    Ok(())
}
