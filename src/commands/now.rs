//! Implements the `/now` command.

use poise::CreateReply;
use serenity::CreateEmbedFooter;
use tracing::instrument;

use crate::data::GetData;
use crate::error::UserError;
use crate::player::Phase;
use crate::serenity;
use crate::Context;
use crate::GramophoneError;

/// Show what's playing.
#[instrument(skip(ctx))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("current", "playing")
)]
pub async fn now(ctx: Context<'_>) -> Result<(), GramophoneError> {
    let session = ctx.existing_session().await?;
    let track = session.current().await.ok_or(UserError::NothingPlaying)?;

    let mut status = Vec::new();
    if session.phase().await == Phase::Paused {
        status.push("Paused");
    }
    if session.is_looping().await {
        status.push("Looping");
    }

    let mut embed = track.embed();
    if !status.is_empty() {
        embed = embed.footer(CreateEmbedFooter::new(status.join(" | ")));
    }

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}
