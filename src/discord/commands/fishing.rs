// Discord command for the fishing minigame

use crate::core::games::FishingError;
use crate::discord::commands::economy::{format_number, Context, Error};
use poise::serenity_prelude as serenity;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::SystemTime;

/// Cast a line into the Sanzu River
#[poise::command(slash_command, guild_only)]
pub async fn fish(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.get();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    let seed = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
        ^ user_id
        ^ guild_id;
    let mut rng = StdRng::seed_from_u64(seed);

    let catch = match ctx.data().fishing.cast(guild_id, user_id, &mut rng) {
        Ok(catch) => catch,
        Err(FishingError::OnCooldown { retry_at }) => {
            let embed = serenity::CreateEmbed::new()
                .title("🎣 The Pond Needs to Settle")
                .description(format!(
                    "You just cast your line. Try again <t:{}:R>.",
                    retry_at.timestamp()
                ))
                .color(0xFFA500); // Orange
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
            return Ok(());
        }
        Err(FishingError::EmptyCatalog) => {
            ctx.say("🎣 The pond is empty. Ask an admin to stock it.")
                .await?;
            return Ok(());
        }
    };

    let outcome = ctx
        .data()
        .economy
        .record_catch(guild_id, user_id, &catch.name, catch.value)
        .await?;

    let value_line = if outcome.credited > 0 {
        format!(
            "Sold for **{}** petals. Purse: 🌸 {}",
            format_number(outcome.credited),
            format_number(outcome.new_purse)
        )
    } else {
        "Worth nothing. The river keeps its secrets.".to_string()
    };

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("{} You caught: {}!", catch.emoji, catch.name))
        .description(value_line)
        .color(0xFFB7C5); // Cherry blossom pink

    if let Some(flavor) = &catch.flavor {
        embed = embed.footer(serenity::CreateEmbedFooter::new(flavor.clone()));
    }

    if outcome.new_personal_best {
        embed = embed.field("🏅 New Personal Best!", "Your finest catch yet.", false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}
