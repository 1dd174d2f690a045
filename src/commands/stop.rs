//! Implements the `/stop` command.
//!
//! This clears the queue and stops the current track, the bot stays connected.

use tracing::instrument;

use crate::data::GetData;
use crate::Context;
use crate::GramophoneError;

/// Stop playing and clear the queue.
#[instrument(skip(ctx))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn stop(ctx: Context<'_>) -> Result<(), GramophoneError> {
    ctx.existing_session().await?.halt().await?;
    ctx.reply("Stopped, the queue is empty.").await?;
    Ok(())
}
