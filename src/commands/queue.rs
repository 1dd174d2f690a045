//! Implements the `/queue`, `/shuffle` and `/remove` commands.
//!
//! The bot responds to `/queue` with an embed displaying one page of the queue.

use poise::CreateReply;
use serenity::{CreateEmbed, CreateEmbedFooter};
use tracing::instrument;

use crate::data::GetData;
use crate::error::UserError;
use crate::serenity;
use crate::Context;
use crate::GramophoneError;

/// Show what's coming up
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn queue(
    ctx: Context<'_>,
    #[description = "Page to show, starts at 1"]
    #[min = 1]
    page: Option<usize>,
) -> Result<(), GramophoneError> {
    let guild = ctx.guild().ok_or(UserError::NotInGuild)?.name.clone();
    let session = ctx.existing_session().await.map_err(|_| UserError::EmptyQueue)?;
    let page = session.queue_page(page.unwrap_or(1)).await?;

    let mut embed = CreateEmbed::default()
        .description(page.to_string())
        .title(format!("{guild} Queue"))
        .footer(CreateEmbedFooter::new(format!(
            "Viewing page {}/{}",
            page.page, page.pages
        )));

    // Add thumbnail if the next track has a thumbnail.
    if let Some(url) = page.tracks.first().and_then(|t| t.thumbnail_url.clone()) {
        embed = embed.thumbnail(url)
    };

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Shuffle the queue.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn shuffle(ctx: Context<'_>) -> Result<(), GramophoneError> {
    let session = ctx.existing_session().await.map_err(|_| UserError::EmptyQueue)?;
    session.shuffle().await?;
    ctx.reply("Shuffled the queue.").await?;
    Ok(())
}

/// Remove a track from the queue.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Position in the queue, starts at 1"]
    #[min = 1]
    position: usize,
) -> Result<(), GramophoneError> {
    let session = ctx.existing_session().await.map_err(|_| UserError::EmptyQueue)?;
    let index = position.checked_sub(1).ok_or(UserError::BadArgs {
        input: Some(position.to_string()),
    })?;

    let track = session.remove_at(index).await?;
    ctx.reply(format!("Removed {track} from the queue.")).await?;
    Ok(())
}
