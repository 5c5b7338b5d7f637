// Discord commands for the server vault and taxation

use crate::core::economy::EconomyError;
use poise::serenity_prelude as serenity;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, crate::discord::commands::economy::Data, Error>;

/// Peek inside the server vault
#[poise::command(slash_command, guild_only)]
pub async fn vault(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    let status = ctx.data().economy.vault_status(guild_id).await?;

    let last_sweep = match status.last_tax_sweep {
        Some(at) => format!("<t:{}:R>", at.timestamp()),
        None => "Never".to_string(),
    };

    let embed = serenity::CreateEmbed::new()
        .title("🏛️ Server Vault")
        .description("The vault funds loans and swallows gambling losses.")
        .color(0xFFB7C5) // Cherry blossom pink
        .field(
            "Treasury",
            format!("🌸 **{} petals**", format_number(status.treasury)),
            true,
        )
        .field(
            "Tax Rate",
            format!("{:.0}%", status.tax_rate * 100.0),
            true,
        )
        .field(
            "Tax-Free Allowance",
            format!("🌸 {}", format_number(status.tax_exemption)),
            true,
        )
        .field("Last Tax Sweep", last_sweep, false)
        .footer(serenity::CreateEmbedFooter::new(
            "Only purse petals above the allowance are taxed",
        ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Taxation controls for server staff
#[poise::command(
    slash_command,
    guild_only,
    subcommands("collect", "rate"),
    required_permissions = "MANAGE_GUILD"
)]
pub async fn tax(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Run a tax sweep right now
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn collect(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    let report = ctx.data().economy.collect_taxes(guild_id).await?;

    let embed = if report.collected > 0 {
        serenity::CreateEmbed::new()
            .title("🏛️ Taxes Collected")
            .description(format!(
                "**{}** petals gathered from **{}** member(s).",
                format_number(report.collected),
                report.payers
            ))
            .color(0x00FF00) // Green
            .field(
                "Treasury",
                format!("🌸 {}", format_number(report.treasury)),
                true,
            )
    } else {
        serenity::CreateEmbed::new()
            .title("🏛️ Nothing to Collect")
            .description("No purse rose above the tax-free allowance.")
            .color(0xFFA500) // Orange
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Set the tax rate for this server
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn rate(
    ctx: Context<'_>,
    #[description = "Tax rate in percent (0 to 25)"]
    #[min = 0]
    #[max = 25]
    percent: u8,
) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    let rate = f64::from(percent) / 100.0;

    match ctx.data().economy.set_tax_rate(guild_id, rate).await {
        Ok(()) => {
            ctx.say(format!("✅ Tax rate set to **{}%**.", percent)).await?;
        }
        Err(EconomyError::TaxRateOutOfRange) => {
            ctx.say("❌ That rate is outside the allowed range.").await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Format a number with commas for readability
fn format_number(n: i64) -> String {
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
