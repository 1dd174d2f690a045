//! Implements the `/leave` command.
//!
//! This stops all bot actions, clears the queue, and disconnects the
//! bot from the current voice channel.

use tracing::instrument;

use crate::error::UserError;
use crate::lib;
use crate::Context;
use crate::GramophoneError;

/// Stop the bot, delete the queue, and leave the call.
#[instrument(skip(ctx))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("disconnect"),
    required_permissions = "MANAGE_GUILD"
)]
pub async fn leave(ctx: Context<'_>) -> Result<(), GramophoneError> {
    let guild_id = ctx.guild_id().ok_or(UserError::GuildOnly)?;

    // The session disconnects on its own, a call without one still has to be left.
    let destroyed = ctx.data().sessions.destroy(guild_id).await;
    let left = lib::call::leave(&ctx).await?;
    if !destroyed && !left {
        return Err(UserError::NotConnected.into());
    }

    tracing::info!("Left voice.");
    ctx.reply("Queue deleted, bye!").await?;
    Ok(())
}
