// Discord commands for the petal economy
//
// Commands follow the same three steps throughout:
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response

use crate::core::chatter::ChatterService;
use crate::core::economy::{EconomyError, EconomyService};
use crate::core::games::{FishingService, QuizService, TableRegistry};
use crate::core::moderation::ModerationService;
use crate::infra::chatter::SqliteMemoryStore;
use crate::infra::economy::JsonLedgerStore;
use crate::infra::moderation::SqliteBlocklistStore;
use crate::infra::webhook::WebhookNotifier;
use poise::serenity_prelude as serenity;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
/// This is where we store our services and configuration.
use std::sync::Arc;

pub struct Data {
    pub economy: Arc<EconomyService<JsonLedgerStore>>,
    pub tables: Arc<TableRegistry>,
    pub fishing: Arc<FishingService>,
    pub quiz: Arc<QuizService>,
    pub chatter: Arc<ChatterService<SqliteMemoryStore>>,
    pub moderation: Arc<ModerationService<SqliteBlocklistStore>>,
    pub notifier: Arc<WebhookNotifier>,
}

/// Check your petal balance
#[poise::command(slash_command, guild_only)]
pub async fn balance(
    ctx: Context<'_>,
    #[description = "User to check balance for (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target_user = user.as_ref().unwrap_or_else(|| ctx.author());
    let user_id = target_user.id.get();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    if target_user.bot {
        ctx.say("Bots carry no petals! 🤖").await?;
        return Ok(());
    }

    let summary = ctx.data().economy.account_summary(guild_id, user_id).await?;

    let transactions = ctx
        .data()
        .economy
        .recent_transactions(guild_id, user_id, 5)
        .await?;

    let transaction_text = if transactions.is_empty() {
        "No transactions yet".to_string()
    } else {
        transactions
            .iter()
            .map(|t| {
                let sign = if t.amount >= 0 { "+" } else { "" };
                format!("{}{} 🌸 — {}", sign, format_number(t.amount), t.reason)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("🌸 {}'s Petals", target_user.name))
        .color(0xFFB7C5) // Cherry blossom pink
        .thumbnail(target_user.face())
        .field(
            "Purse",
            format!("🌸 **{} petals**", format_number(summary.purse)),
            true,
        )
        .field(
            "Bank",
            format!("🏦 {} petals", format_number(summary.bank)),
            true,
        )
        .field(
            "Total Earned",
            format!("🌸 {}", format_number(summary.total_earned)),
            true,
        );

    if let Some(loan) = &summary.loan {
        let status = if loan.is_overdue() {
            format!(
                "⚠️ **{} petals** outstanding, {} day(s) overdue",
                format_number(loan.outstanding),
                loan.days_late
            )
        } else {
            format!(
                "{} petals outstanding, due <t:{}:R>",
                format_number(loan.outstanding),
                loan.due_at.timestamp()
            )
        };
        embed = embed.field("Loan", status, false);
    }

    if let Some(catch) = &summary.biggest_catch {
        embed = embed.field(
            "Biggest Catch",
            format!("🎣 {} ({} petals)", catch.name, format_number(catch.value)),
            false,
        );
    }

    embed = embed
        .field("Recent Transactions", transaction_text, false)
        .footer(serenity::CreateEmbedFooter::new(
            "Use /daily to claim your daily petals!",
        ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Claim your daily petal reward
#[poise::command(slash_command, guild_only)]
pub async fn daily(ctx: Context<'_>) -> Result<(), Error> {
    let user = ctx.author();
    if user.bot {
        ctx.say("Bots don't need petals! 🤖").await?;
        return Ok(());
    }

    let user_id = user.id.get();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    let result = ctx.data().economy.claim_daily(guild_id, user_id).await?;

    if let Some(claim) = result {
        let embed = serenity::CreateEmbed::new()
            .title("✅ Daily Petals Claimed!")
            .description(format!(
                "The blossoms drop **{} petals** into your purse.",
                format_number(claim.awarded)
            ))
            .color(0x00FF00) // Green
            .field(
                "New Purse",
                format!("🌸 {}", format_number(claim.new_purse)),
                true,
            )
            .field(
                "Next Claim",
                format!("<t:{}:R>", claim.next_claim_at.timestamp()),
                true,
            )
            .footer(serenity::CreateEmbedFooter::new(
                "Come back tomorrow for more!",
            ));

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
    } else {
        let next_claim = ctx.data().economy.next_daily_time(guild_id, user_id).await?;

        if let Some(next_time) = next_claim {
            let embed = serenity::CreateEmbed::new()
                .title("⏰ Daily Petals Already Claimed")
                .description("The tree has already shed its petals for you today.")
                .color(0xFFA500) // Orange
                .field(
                    "Next Claim",
                    format!("<t:{}:R>", next_time.timestamp()),
                    false,
                )
                .footer(serenity::CreateEmbedFooter::new("Check back later!"));

            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        } else {
            ctx.say("You can claim your daily petals now! Try again.")
                .await?;
        }
    }

    Ok(())
}

/// Send petals to another member
#[poise::command(slash_command, guild_only)]
pub async fn pay(
    ctx: Context<'_>,
    #[description = "Who receives the petals"] user: serenity::User,
    #[description = "How many petals to send"]
    #[min = 1]
    amount: i64,
) -> Result<(), Error> {
    let sender = ctx.author();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    if user.bot {
        ctx.say("Bots have no use for petals! 🤖").await?;
        return Ok(());
    }

    match ctx
        .data()
        .economy
        .transfer(guild_id, sender.id.get(), user.id.get(), amount)
        .await
    {
        Ok(receipt) => {
            let embed = serenity::CreateEmbed::new()
                .title("🌸 Petals Sent!")
                .description(format!(
                    "**{}** petals drift from {} to {}.",
                    format_number(amount),
                    sender.name,
                    user.name
                ))
                .color(0x00FF00) // Green
                .field(
                    "Your Purse",
                    format!("🌸 {}", format_number(receipt.sender_purse)),
                    true,
                );

            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e @ EconomyError::SelfTransfer)
        | Err(e @ EconomyError::NonPositiveAmount)
        | Err(e @ EconomyError::InsufficientFunds { .. }) => {
            let embed = serenity::CreateEmbed::new()
                .title("❌ Transfer Failed")
                .description(e.to_string())
                .color(0xFF0000); // Red

            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Show the wealthiest members of this server
#[poise::command(slash_command, guild_only)]
pub async fn richest(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    let entries = ctx.data().economy.richest(guild_id, 10).await?;

    if entries.is_empty() {
        ctx.say("Nobody here has gathered any petals yet.").await?;
        return Ok(());
    }

    let mut description = String::new();
    for (index, entry) in entries.iter().enumerate() {
        let rank = index + 1;
        let medal = match rank {
            1 => "🥇",
            2 => "🥈",
            3 => "🥉",
            _ => "  ",
        };

        let name = resolve_display_name_cached(&ctx, guild_id, entry.user_id);
        let is_me = entry.user_id == ctx.author().id.get();
        let name_display = if is_me {
            format!("**{}** (You)", name)
        } else {
            name
        };

        description.push_str(&format!(
            "{} **#{}** {}\n🌸 {} petals (purse {} | bank {})\n\n",
            medal,
            rank,
            name_display,
            format_number(entry.net_worth()),
            format_number(entry.purse),
            format_number(entry.bank)
        ));
    }

    let embed = serenity::CreateEmbed::new()
        .title("💐 Richest in the Garden")
        .description(description)
        .color(0xFFD700) // Gold color
        .footer(serenity::CreateEmbedFooter::new(
            "Net worth counts purse and bank together",
        ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Resolve a human-friendly display name for a user.
///
/// Cache only, no HTTP calls: leaderboards would crawl otherwise.
pub fn resolve_display_name_cached(ctx: &Context<'_>, guild_id: u64, user_id: u64) -> String {
    let guild_id_s = serenity::GuildId::from(guild_id);
    let user_id_s = serenity::UserId::from(user_id);

    if let Some(guild) = ctx.serenity_context().cache.guild(guild_id_s) {
        if let Some(member) = guild.members.get(&user_id_s) {
            // display_name() prefers nick over username
            return member.display_name().to_string();
        }
    }

    if let Some(user) = ctx.serenity_context().cache.user(user_id_s) {
        return user.name.clone();
    }

    // Fallback: a mention still identifies the entry
    format!("<@{}>", user_id)
}

/// Format a number with commas for readability
pub fn format_number(n: i64) -> String {
    let s = n.to_string();
    let negative = s.starts_with('-');
    let s = if negative { &s[1..] } else { &s };

    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }

    if negative {
        result.insert(0, '-');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(100), "100");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(-1234567), "-1,234,567");
    }
}
