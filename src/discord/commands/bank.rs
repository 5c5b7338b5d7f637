// Discord commands for the bank vault and petal loans

use crate::core::economy::EconomyError;
use crate::discord::commands::economy::{format_number, Context, Error};
use poise::serenity_prelude as serenity;

/// Move petals between your purse and the bank
#[poise::command(slash_command, guild_only, subcommands("deposit", "withdraw", "balance"))]
pub async fn bank(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Check how many petals the bank is holding for you
#[poise::command(slash_command, guild_only)]
pub async fn balance(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.get();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    let summary = ctx.data().economy.account_summary(guild_id, user_id).await?;

    let embed = serenity::CreateEmbed::new()
        .title("🏦 Bank Account")
        .color(0xFFB7C5) // Cherry blossom pink
        .field("Purse", format!("🌸 {}", format_number(summary.purse)), true)
        .field("Bank", format!("🏦 {}", format_number(summary.bank)), true)
        .footer(serenity::CreateEmbedFooter::new(
            "Banked petals are safe from the tax collector",
        ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Deposit petals into the bank, where the tax collector cannot reach
#[poise::command(slash_command, guild_only)]
pub async fn deposit(
    ctx: Context<'_>,
    #[description = "How many petals (leave empty for everything)"]
    #[min = 1]
    amount: Option<i64>,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    match ctx.data().economy.deposit(guild_id, user_id, amount).await {
        Ok(receipt) => {
            let embed = serenity::CreateEmbed::new()
                .title("🏦 Deposit Complete")
                .description(format!(
                    "Tucked **{}** petals away safely.",
                    format_number(receipt.moved)
                ))
                .color(0x00FF00) // Green
                .field("Purse", format!("🌸 {}", format_number(receipt.purse)), true)
                .field("Bank", format!("🏦 {}", format_number(receipt.bank)), true);

            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e @ EconomyError::InsufficientFunds { .. })
        | Err(e @ EconomyError::NonPositiveAmount) => {
            send_error_embed(ctx, "Deposit Failed", &e.to_string()).await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Withdraw petals from the bank back into your purse
#[poise::command(slash_command, guild_only)]
pub async fn withdraw(
    ctx: Context<'_>,
    #[description = "How many petals (leave empty for everything)"]
    #[min = 1]
    amount: Option<i64>,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    match ctx.data().economy.withdraw(guild_id, user_id, amount).await {
        Ok(receipt) => {
            let embed = serenity::CreateEmbed::new()
                .title("🏦 Withdrawal Complete")
                .description(format!(
                    "Retrieved **{}** petals from the bank.",
                    format_number(receipt.moved)
                ))
                .color(0x00FF00) // Green
                .field("Purse", format!("🌸 {}", format_number(receipt.purse)), true)
                .field("Bank", format!("🏦 {}", format_number(receipt.bank)), true);

            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e @ EconomyError::InsufficientFunds { .. })
        | Err(e @ EconomyError::NonPositiveAmount) => {
            send_error_embed(ctx, "Withdrawal Failed", &e.to_string()).await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Borrow petals from the server vault or settle your debt
#[poise::command(slash_command, guild_only, subcommands("take", "repay", "status"))]
pub async fn loan(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Take out a loan from the server vault
#[poise::command(slash_command, guild_only)]
pub async fn take(
    ctx: Context<'_>,
    #[description = "How many petals to borrow"]
    #[min = 1]
    amount: i64,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    match ctx.data().economy.take_loan(guild_id, user_id, amount).await {
        Ok(receipt) => {
            let interest = receipt.outstanding - receipt.principal;
            let embed = serenity::CreateEmbed::new()
                .title("💸 Loan Granted")
                .description(format!(
                    "The vault lends you **{}** petals. With interest you owe **{}**.",
                    format_number(receipt.principal),
                    format_number(receipt.outstanding)
                ))
                .color(0xFFB7C5) // Cherry blossom pink
                .field("Interest", format!("🌸 {}", format_number(interest)), true)
                .field("Due", format!("<t:{}:R>", receipt.due_at.timestamp()), true)
                .field(
                    "Purse",
                    format!("🌸 {}", format_number(receipt.new_purse)),
                    true,
                )
                .footer(serenity::CreateEmbedFooter::new(
                    "Late loans grow by 5% of the principal each day",
                ));

            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e @ EconomyError::LoanOutstanding)
        | Err(e @ EconomyError::VaultShort { .. })
        | Err(e @ EconomyError::NonPositiveAmount) => {
            send_error_embed(ctx, "Loan Refused", &e.to_string()).await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Repay your loan, in part or in full
#[poise::command(slash_command, guild_only)]
pub async fn repay(
    ctx: Context<'_>,
    #[description = "How many petals (leave empty to pay as much as you can)"]
    #[min = 1]
    amount: Option<i64>,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    match ctx.data().economy.repay_loan(guild_id, user_id, amount).await {
        Ok(receipt) => {
            let embed = if receipt.cleared {
                serenity::CreateEmbed::new()
                    .title("✅ Loan Cleared!")
                    .description(format!(
                        "You paid **{}** petals and your debt is settled.",
                        format_number(receipt.paid)
                    ))
                    .color(0x00FF00) // Green
            } else {
                serenity::CreateEmbed::new()
                    .title("💸 Payment Received")
                    .description(format!(
                        "You paid **{}** petals. **{}** still outstanding.",
                        format_number(receipt.paid),
                        format_number(receipt.remaining)
                    ))
                    .color(0xFFA500) // Orange
            };

            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e @ EconomyError::NoActiveLoan)
        | Err(e @ EconomyError::InsufficientFunds { .. })
        | Err(e @ EconomyError::NonPositiveAmount) => {
            send_error_embed(ctx, "Repayment Failed", &e.to_string()).await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Check your current loan
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.get();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    let loan = ctx.data().economy.loan_status(guild_id, user_id).await?;

    match loan {
        Some(loan) => {
            let mut embed = serenity::CreateEmbed::new()
                .title("💸 Loan Status")
                .color(if loan.is_overdue() { 0xFF0000 } else { 0xFFB7C5 })
                .field(
                    "Borrowed",
                    format!("🌸 {}", format_number(loan.principal)),
                    true,
                )
                .field(
                    "Outstanding",
                    format!("🌸 {}", format_number(loan.outstanding)),
                    true,
                )
                .field("Due", format!("<t:{}:R>", loan.due_at.timestamp()), true);

            if loan.is_overdue() {
                embed = embed.field(
                    "Overdue",
                    format!("⚠️ {} day(s) late, penalties applied", loan.days_late),
                    false,
                );
            }

            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        None => {
            ctx.say("You have no loan. The vault awaits your signature. 💸")
                .await?;
        }
    }

    Ok(())
}

async fn send_error_embed(ctx: Context<'_>, title: &str, message: &str) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title(format!("❌ {}", title))
        .description(message.to_string())
        .color(0xFF0000); // Red

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
