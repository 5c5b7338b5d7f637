// Discord-specific message handling - blocklist enforcement, chat memory,
// keyword chatter and the passive petal drift.

use crate::core::chatter::MemoryEntry;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::SystemTime;

/// Handle one non-command guild message.
///
/// Returns `true` if the message was removed (blocklisted author), in which
/// case nothing else should run for it.
pub async fn handle_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<bool, Error> {
    if msg.author.bot {
        return Ok(false);
    }

    let guild_id = match msg.guild_id {
        Some(id) => id.get(),
        None => return Ok(false),
    };
    let user_id = msg.author.id.get();

    // Blocklisted authors lose their message and nothing else happens
    match data.moderation.is_blocked(guild_id, user_id).await {
        Ok(true) => {
            if let Err(e) = msg.delete(&ctx.http).await {
                tracing::warn!("Failed to delete blocklisted message: {}", e);
            }
            return Ok(true);
        }
        Ok(false) => {}
        Err(e) => tracing::warn!("Blocklist check failed: {}", e),
    }

    // Remember the message for the mention counter and TTL purge
    let entry = MemoryEntry {
        guild_id,
        channel_id: msg.channel_id.get(),
        user_id,
        content: msg.content.clone(),
    };
    if let Err(e) = data.chatter.observe(entry).await {
        tracing::warn!("Failed to record chat memory: {}", e);
    }

    // A direct mention gets a direct reply; keyword rules stay quiet for it
    let bot_id = ctx.cache.current_user().id;
    if msg.mentions.iter().any(|u| u.id == bot_id) {
        match data.chatter.mention_reply(guild_id).await {
            Ok(reply) => {
                if let Err(e) = msg.reply(&ctx.http, reply).await {
                    tracing::warn!("Failed to send mention reply: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to build mention reply: {}", e),
        }
    } else {
        let seed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
            ^ user_id
            ^ guild_id;
        let mut rng = StdRng::seed_from_u64(seed);

        if let Some(reply) = data.chatter.respond_to(guild_id, &msg.content, &mut rng) {
            if let Err(e) = msg.channel_id.say(&ctx.http, reply).await {
                tracing::warn!("Failed to send chatter reply: {}", e);
            }
        }
    }

    // Small chance the message shakes a few petals loose
    match data.economy.try_message_reward(guild_id, user_id).await {
        Ok(Some(amount)) => {
            tracing::debug!(user_id, guild_id, amount, "Petal drift awarded");
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Petal drift failed: {}", e),
    }

    Ok(false)
}
