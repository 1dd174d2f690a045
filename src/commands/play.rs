//! Implements the `/play` command.
//!
//! The query is resolved to a single track which is added to the back of the queue.
//! The bot joins the author's voice channel if it isn't connected yet.

use tracing::instrument;

use crate::data::GetData;
use crate::error::UserError;
use crate::lib;
use crate::player::Origin;
use crate::Context;
use crate::GramophoneError;

/// Plays from the given link or does a youtube search on the query.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Youtube query or url"]
    #[rest]
    query: String,
) -> Result<(), GramophoneError> {
    lib::call::ensure_with_author(&ctx).await?;
    let session = ctx.session().await?;

    // Resolving can take a few seconds.
    ctx.defer().await?;

    let origin = Origin {
        requester: ctx.author().id,
        channel: ctx.channel_id(),
    };
    let track = ctx.data().resolver.resolve(&query, origin).await?;

    let reply = format!("Enqueued {track}.");
    let queued = match session.enqueue(track.clone()).await {
        // Left voice on idle while resolving, start over once.
        Err(UserError::SessionEnded) => {
            tracing::debug!("Session ended while resolving, starting a new one.");
            lib::call::ensure_with_author(&ctx).await?;
            ctx.session().await?.enqueue(track).await?
        }
        queued => queued?,
    };
    tracing::debug!("{queued} track(s) waiting.");

    ctx.reply(reply).await?;
    Ok(())
}
