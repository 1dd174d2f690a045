//! Implements the `/loop` command.

use tracing::instrument;

use crate::data::GetData;
use crate::Context;
use crate::GramophoneError;

/// Loop the current track, or stop looping it.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, rename = "loop")]
pub async fn repeat(ctx: Context<'_>) -> Result<(), GramophoneError> {
    let looping = ctx.existing_session().await?.toggle_loop().await?;
    let reply = if looping {
        "Looping the current track."
    } else {
        "Stopped looping."
    };
    ctx.reply(reply).await?;
    Ok(())
}
