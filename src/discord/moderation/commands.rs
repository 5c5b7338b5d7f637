// Moderation slash commands.
//
// The core service validates every request (self/bot targets, reason
// length, per-command ranges) before any Discord API call is made. The
// webhook notifier mirrors each action to the staff channel.

use crate::core::moderation::{ModCommand, ModerationError};
use crate::discord::commands::economy::format_number;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

type Context<'a> = poise::Context<'a, Data, Error>;

/// Ban a member from the server.
#[poise::command(slash_command, guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "Who to ban"] user: serenity::User,
    #[description = "Why"] reason: Option<String>,
    #[description = "Days of messages to delete (0 to 7)"]
    #[min = 0]
    #[max = 7]
    delete_message_days: Option<u8>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let moderator = ctx.author();
    let bot_id = ctx.framework().bot_id.get();
    let days = delete_message_days.unwrap_or(0);

    let command = ModCommand::Ban {
        delete_message_days: days,
    };
    let reason = ctx.data().moderation.sanitize_reason(reason);

    if let Err(e) = ctx.data().moderation.validate(
        moderator.id.get(),
        Some(user.id.get()),
        bot_id,
        &command,
        &reason,
    ) {
        return send_validation_error(ctx, e).await;
    }

    // Best-effort DM before the ban lands; afterwards we can't reach them
    let dm = serenity::CreateMessage::new().embed(
        serenity::CreateEmbed::new()
            .title("🔨 You have been banned")
            .description(format!(
                "Server: **{}**\nReason: {}",
                guild_name(&ctx, guild_id),
                reason
            ))
            .color(0xFF0000),
    );
    let _ = user.dm(&ctx.http(), dm).await;

    guild_id
        .ban_with_reason(&ctx.http(), user.id, days, &reason)
        .await?;

    let case = ctx.data().moderation.build_case(
        guild_id.get(),
        moderator.id.get(),
        Some(user.id.get()),
        command,
        reason.clone(),
    );
    tracing::info!(
        guild_id = case.guild_id,
        moderator_id = case.moderator_id,
        target_id = ?case.target_id,
        command = %case.command,
        "Moderation action taken"
    );

    ctx.data()
        .notifier
        .notify(
            "🔨 Member Banned",
            &format!(
                "**{}** was banned by **{}**.\nReason: {}",
                user.name, moderator.name, reason
            ),
            0xFF0000,
        )
        .await;

    ctx.say(format!("🔨 **{}** has been banned. Reason: {}", user.name, reason))
        .await?;
    Ok(())
}

/// Kick a member from the server.
#[poise::command(slash_command, guild_only, required_permissions = "KICK_MEMBERS")]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Who to kick"] user: serenity::User,
    #[description = "Why"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let moderator = ctx.author();
    let bot_id = ctx.framework().bot_id.get();

    let command = ModCommand::Kick;
    let reason = ctx.data().moderation.sanitize_reason(reason);

    if let Err(e) = ctx.data().moderation.validate(
        moderator.id.get(),
        Some(user.id.get()),
        bot_id,
        &command,
        &reason,
    ) {
        return send_validation_error(ctx, e).await;
    }

    let dm = serenity::CreateMessage::new().embed(
        serenity::CreateEmbed::new()
            .title("👢 You have been kicked")
            .description(format!(
                "Server: **{}**\nReason: {}",
                guild_name(&ctx, guild_id),
                reason
            ))
            .color(0xFFA500),
    );
    let _ = user.dm(&ctx.http(), dm).await;

    guild_id
        .kick_with_reason(&ctx.http(), user.id, &reason)
        .await?;

    let case = ctx.data().moderation.build_case(
        guild_id.get(),
        moderator.id.get(),
        Some(user.id.get()),
        command,
        reason.clone(),
    );
    tracing::info!(
        guild_id = case.guild_id,
        moderator_id = case.moderator_id,
        target_id = ?case.target_id,
        command = %case.command,
        "Moderation action taken"
    );

    ctx.data()
        .notifier
        .notify(
            "👢 Member Kicked",
            &format!(
                "**{}** was kicked by **{}**.\nReason: {}",
                user.name, moderator.name, reason
            ),
            0xFFA500,
        )
        .await;

    ctx.say(format!("👢 **{}** has been kicked. Reason: {}", user.name, reason))
        .await?;
    Ok(())
}

/// Time a member out.
#[poise::command(slash_command, guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn timeout(
    ctx: Context<'_>,
    #[description = "Who to time out"] user: serenity::User,
    #[description = "Minutes of silence (up to 28 days)"]
    #[min = 1]
    #[max = 40320]
    minutes: u32,
    #[description = "Why"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let moderator = ctx.author();
    let bot_id = ctx.framework().bot_id.get();

    let command = ModCommand::Timeout { minutes };
    let reason = ctx.data().moderation.sanitize_reason(reason);

    if let Err(e) = ctx.data().moderation.validate(
        moderator.id.get(),
        Some(user.id.get()),
        bot_id,
        &command,
        &reason,
    ) {
        return send_validation_error(ctx, e).await;
    }

    let until = chrono::Utc::now() + chrono::Duration::minutes(i64::from(minutes));
    let timestamp = serenity::Timestamp::from_unix_timestamp(until.timestamp())?;

    guild_id
        .edit_member(
            &ctx.http(),
            user.id,
            serenity::EditMember::new()
                .disable_communication_until_datetime(timestamp)
                .audit_log_reason(&reason),
        )
        .await?;

    let case = ctx.data().moderation.build_case(
        guild_id.get(),
        moderator.id.get(),
        Some(user.id.get()),
        command,
        reason.clone(),
    );
    tracing::info!(
        guild_id = case.guild_id,
        moderator_id = case.moderator_id,
        target_id = ?case.target_id,
        command = %case.command,
        "Moderation action taken"
    );

    ctx.data()
        .notifier
        .notify(
            "🤫 Member Timed Out",
            &format!(
                "**{}** was timed out for **{}** minute(s) by **{}**.\nReason: {}",
                user.name,
                format_number(i64::from(minutes)),
                moderator.name,
                reason
            ),
            0xFFD700,
        )
        .await;

    ctx.say(format!(
        "🤫 **{}** is silenced until <t:{}:R>. Reason: {}",
        user.name,
        until.timestamp(),
        reason
    ))
    .await?;
    Ok(())
}

/// Bulk delete recent messages in this channel.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn clear(
    ctx: Context<'_>,
    #[description = "How many messages (1 to 100)"]
    #[min = 1]
    #[max = 100]
    count: u8,
    #[description = "Why"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let moderator = ctx.author();
    let bot_id = ctx.framework().bot_id.get();

    let command = ModCommand::Clear { count };
    let reason = ctx.data().moderation.sanitize_reason(reason);

    if let Err(e) =
        ctx.data()
            .moderation
            .validate(moderator.id.get(), None, bot_id, &command, &reason)
    {
        return send_validation_error(ctx, e).await;
    }

    let messages = ctx
        .channel_id()
        .messages(&ctx.http(), serenity::GetMessages::new().limit(count))
        .await?;

    // The bulk delete endpoint refuses messages older than 14 days
    let cutoff = (chrono::Utc::now()
        - chrono::Duration::days(ctx.data().moderation.config().bulk_delete_max_age_days))
    .timestamp();
    let deletable: Vec<serenity::MessageId> = messages
        .iter()
        .filter(|m| m.timestamp.unix_timestamp() > cutoff)
        .map(|m| m.id)
        .collect();

    let deleted = deletable.len();
    match deleted {
        0 => {
            ctx.send(
                poise::CreateReply::default()
                    .content("No recent messages to delete. Bulk deletion stops at 14 days.")
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
        1 => {
            ctx.channel_id()
                .delete_message(&ctx.http(), deletable[0])
                .await?;
        }
        _ => {
            ctx.channel_id()
                .delete_messages(&ctx.http(), deletable.iter().copied())
                .await?;
        }
    }

    let case = ctx.data().moderation.build_case(
        guild_id.get(),
        moderator.id.get(),
        None,
        command,
        reason.clone(),
    );
    tracing::info!(
        guild_id = case.guild_id,
        moderator_id = case.moderator_id,
        command = %case.command,
        deleted,
        "Moderation action taken"
    );

    ctx.data()
        .notifier
        .notify(
            "🧹 Messages Cleared",
            &format!(
                "**{}** message(s) removed in <#{}> by **{}**.\nReason: {}",
                deleted,
                ctx.channel_id().get(),
                moderator.name,
                reason
            ),
            0x5865F2,
        )
        .await;

    ctx.send(
        poise::CreateReply::default()
            .content(format!("🧹 Deleted **{}** message(s).", deleted))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Manage the silent blocklist.
///
/// Messages from blocklisted users are deleted as soon as they appear.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("add", "remove", "show"),
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn blocklist(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Add a user to the blocklist.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Who to blocklist"] user: serenity::User,
    #[description = "Why"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let moderator = ctx.author();
    let reason = ctx.data().moderation.sanitize_reason(reason);

    if user.id == moderator.id {
        ctx.say("You cannot blocklist yourself.").await?;
        return Ok(());
    }
    if user.bot {
        ctx.say("Bots cannot be blocklisted.").await?;
        return Ok(());
    }

    let added = match ctx
        .data()
        .moderation
        .block_user(guild_id.get(), user.id.get(), &reason, moderator.id.get())
        .await
    {
        Ok(added) => added,
        Err(e @ ModerationError::ReasonTooLong { .. }) => {
            return send_validation_error(ctx, e).await;
        }
        Err(e) => return Err(e.into()),
    };

    if added {
        ctx.data()
            .notifier
            .notify(
                "🚫 User Blocklisted",
                &format!(
                    "**{}** was blocklisted by **{}**.\nReason: {}",
                    user.name, moderator.name, reason
                ),
                0xFF0000,
            )
            .await;
        ctx.say(format!(
            "🚫 **{}**'s messages will now be silently removed.",
            user.name
        ))
        .await?;
    } else {
        ctx.say(format!("**{}** is already on the blocklist.", user.name))
            .await?;
    }
    Ok(())
}

/// Remove a user from the blocklist.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Who to unblock"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let removed = ctx
        .data()
        .moderation
        .unblock_user(guild_id.get(), user.id.get())
        .await?;

    if removed {
        ctx.say(format!("✅ **{}** may speak again.", user.name))
            .await?;
    } else {
        ctx.say(format!("**{}** was not on the blocklist.", user.name))
            .await?;
    }
    Ok(())
}

/// Show the blocklist for this server.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let entries = ctx.data().moderation.blocklist(guild_id.get()).await?;

    if entries.is_empty() {
        ctx.say("The blocklist is empty. How peaceful.").await?;
        return Ok(());
    }

    let listing = entries
        .iter()
        .map(|b| {
            format!(
                "• <@{}> — {} (added <t:{}:R> by <@{}>)",
                b.user_id,
                b.reason,
                b.added_at.timestamp(),
                b.added_by
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let embed = serenity::CreateEmbed::new()
        .title("🚫 Blocklist")
        .description(listing)
        .color(0xFF0000);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

async fn send_validation_error(ctx: Context<'_>, error: ModerationError) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(format!("❌ {}", error))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

fn guild_name(ctx: &Context<'_>, guild_id: serenity::GuildId) -> String {
    ctx.serenity_context()
        .cache
        .guild(guild_id)
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "this server".to_string())
}
