//! Implements the `/skip` command.
//!
//! Whoever requested the track skips it right away, everyone else votes.

use tracing::instrument;

use crate::data::GetData;
use crate::player::SkipOutcome;
use crate::Context;
use crate::GramophoneError;

/// Skips the current audio track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn skip(ctx: Context<'_>) -> Result<(), GramophoneError> {
    let session = ctx.existing_session().await?;
    let title = session.current().await.map(|track| track.to_string());

    let reply = match session.skip(ctx.author().id).await? {
        SkipOutcome::Skipped => format!("Skipping {}.", title.unwrap_or_default()),
        SkipOutcome::Voted { votes, needed } => {
            format!("Skip vote added, currently at **{votes}/{needed}**.")
        }
    };
    ctx.reply(reply).await?;
    Ok(())
}
