//! Implements the `/join` and `/summon` commands.

use serenity::Mentionable;
use tracing::instrument;

use crate::data::GetData;
use crate::error::UserError;
use crate::lib;
use crate::serenity;
use crate::Context;
use crate::GramophoneError;

/// Join your voice channel.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only, guild_cooldown = 2)]
pub async fn join(ctx: Context<'_>) -> Result<(), GramophoneError> {
    let channel = lib::call::join_author(&ctx).await?;
    // Starts the idle timer, an empty session leaves after a while.
    ctx.session().await?;

    ctx.reply(format!("Joined {}.", channel.mention())).await?;
    Ok(())
}

/// Summon the bot to a voice channel.
///
/// Without a channel, joins yours.
#[instrument(skip(ctx, channel), fields(channel = ?channel.as_ref().map(|c| c.id)))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn summon(
    ctx: Context<'_>,
    #[description = "Voice channel to join"]
    #[channel_types("Voice", "Stage")]
    channel: Option<serenity::GuildChannel>,
) -> Result<(), GramophoneError> {
    let channel = match channel {
        Some(channel) => {
            let is_voice = matches!(
                channel.kind,
                serenity::ChannelType::Voice | serenity::ChannelType::Stage
            );
            if !is_voice || Some(channel.guild_id) != ctx.guild_id() {
                return Err(UserError::BadArgs {
                    input: Some(channel.name),
                }
                .into());
            }
            lib::call::join_channel(&ctx, channel.id).await?;
            channel.id
        }
        None => lib::call::join_author(&ctx).await?,
    };
    ctx.session().await?;

    ctx.reply(format!("Joined {}.", channel.mention())).await?;
    Ok(())
}
