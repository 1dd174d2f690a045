//! Implements the `/pause` and `/resume` commands.

use tracing::instrument;

use crate::data::GetData;
use crate::Context;
use crate::GramophoneError;

/// Pause the current track.
#[instrument(skip(ctx))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn pause(ctx: Context<'_>) -> Result<(), GramophoneError> {
    ctx.existing_session().await?.pause().await?;
    ctx.reply("Paused.").await?;
    Ok(())
}

/// Resume the paused track.
#[instrument(skip(ctx))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn resume(ctx: Context<'_>) -> Result<(), GramophoneError> {
    ctx.existing_session().await?.resume().await?;
    ctx.reply("Resumed.").await?;
    Ok(())
}
