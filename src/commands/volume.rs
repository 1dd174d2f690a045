//! Implements the `/volume` command.

use tracing::instrument;

use crate::data::GetData;
use crate::error::UserError;
use crate::Context;
use crate::GramophoneError;

/// Show or set the playback volume.
///
/// The volume stays for the following tracks.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume in percent, 0 to 100"]
    #[min = 0]
    #[max = 100]
    percent: Option<i64>,
) -> Result<(), GramophoneError> {
    let session = ctx.existing_session().await.map_err(|_| UserError::NotConnected)?;

    let reply = match percent {
        Some(percent) => {
            session.set_volume(percent).await?;
            format!("Volume set to {percent}%.")
        }
        None => {
            let current = (session.volume().await * 100.0).round();
            format!("Volume is at {current}%.")
        }
    };
    ctx.reply(reply).await?;
    Ok(())
}
