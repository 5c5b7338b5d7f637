use crate::discord::commands::economy::{Context, Error};
use poise::serenity_prelude as serenity;

/// Learn about Yuyuko and what she can do.
#[poise::command(slash_command, prefix_command)]
pub async fn about(ctx: Context<'_>) -> Result<(), Error> {
    let mut embed = serenity::CreateEmbed::new()
        .title("Yuyuko — Ghost Princess of Hakugyokurou")
        .description(
            "A hungry phantom who keeps the petals flowing: an economy to grow, \
            games to gamble on, and a watchful eye over the garden.",
        )
        .color(0xFFB7C5) // Cherry blossom pink
        .timestamp(serenity::Timestamp::now());

    if let Ok(bot_user) = ctx.http().get_current_user().await {
        if let Some(avatar_url) = bot_user.avatar_url() {
            embed = embed.thumbnail(avatar_url);
        }
    }

    embed = embed
        .field(
            "🌸 Petals",
            "Earn petals by chatting, claiming `/daily`, fishing and winning games. \
            Bank them with `/bank deposit` before the tax sweep comes around.",
            false,
        )
        .field(
            "🎴 Games",
            "`/blackjack` against the dealer, `/duel` against each other, \
            `/fish` on a cooldown, `/quiz` for the whole channel.",
            false,
        )
        .field(
            "💸 Loans & Taxes",
            "The server vault lends at 10% interest and collects taxes on idle \
            purses. Late repayments grow by 5% of the principal per day.",
            false,
        )
        .field(
            "🧾 Full List",
            "Use `/help` for every command, grouped by category.",
            false,
        )
        .footer(serenity::CreateEmbedFooter::new(
            "Born from the code of the Netherworld. Feed her regularly.",
        ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
