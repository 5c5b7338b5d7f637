// Discord command for the quiz minigame
//
// One question per channel at a time. Everyone gets a single guess; the
// first correct answer takes the prize.

use crate::core::games::{TableError, TableKind};
use crate::discord::commands::economy::{format_number, Context, Error};
use poise::serenity_prelude as serenity;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::time::{Duration, Instant, SystemTime};

const ANSWER_WINDOW_SECS: u64 = 30;
const CHOICE_BADGES: &[&str] = &["🇦", "🇧", "🇨", "🇩"];

/// Start a quiz question for the whole channel
#[poise::command(slash_command, guild_only)]
pub async fn quiz(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();
    let channel_id = ctx.channel_id().get();

    // Quizzes carry no stakes but still claim the channel
    if let Err(TableError::ChannelBusy) =
        ctx.data()
            .tables
            .open(channel_id, guild_id, TableKind::Quiz, vec![])
    {
        ctx.say("🎴 A game is already running in this channel. Wait for it to finish.")
            .await?;
        return Ok(());
    }

    let seed = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
        ^ channel_id;
    let mut rng = StdRng::seed_from_u64(seed);
    let question = ctx.data().quiz.draw(&mut rng).clone();

    let closes_at = chrono::Utc::now() + chrono::Duration::seconds(ANSWER_WINDOW_SECS as i64);
    let mut choice_list = String::new();
    for (index, choice) in question.choices.iter().enumerate() {
        choice_list.push_str(&format!("{} {}\n", CHOICE_BADGES[index], choice));
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("❓ Quiz Time!")
        .description(format!(
            "{}\n\n{}\nAnswers close <t:{}:R>.",
            question.prompt,
            choice_list,
            closes_at.timestamp()
        ))
        .color(0xFFB7C5) // Cherry blossom pink
        .field(
            "Prize",
            format!("🌸 {} petals", format_number(question.prize)),
            true,
        );
    if let Some(category) = &question.category {
        embed = embed.field("Category", category.clone(), true);
    }

    let buttons = question
        .choices
        .iter()
        .enumerate()
        .map(|(index, _)| {
            serenity::CreateButton::new(format!("quiz_{}", index))
                .label(CHOICE_BADGES[index])
                .style(serenity::ButtonStyle::Primary)
        })
        .collect::<Vec<_>>();
    let components = vec![serenity::CreateActionRow::Buttons(buttons)];

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .embed(embed)
                .components(components),
        )
        .await?;
    let msg_id = reply.message().await?.id;

    // One guess per user, first correct answer wins
    let mut guessed: HashSet<u64> = HashSet::new();
    let mut winner: Option<u64> = None;
    let deadline = Instant::now() + Duration::from_secs(ANSWER_WINDOW_SECS);

    while winner.is_none() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let Some(mci) = serenity::ComponentInteractionCollector::new(ctx)
            .channel_id(ctx.channel_id())
            .timeout(remaining)
            .filter(move |mci| mci.message.id == msg_id)
            .await
        else {
            break;
        };

        let user_id = mci.user.id.get();
        if !guessed.insert(user_id) {
            let _ = mci
                .create_response(
                    &ctx,
                    serenity::CreateInteractionResponse::Message(
                        serenity::CreateInteractionResponseMessage::new()
                            .content("You already used your guess!")
                            .ephemeral(true),
                    ),
                )
                .await;
            continue;
        }

        let picked = mci
            .data
            .custom_id
            .strip_prefix("quiz_")
            .and_then(|s| s.parse::<usize>().ok());

        if picked == Some(question.answer) {
            winner = Some(user_id);
            if let Err(e) = mci.defer(&ctx.http()).await {
                tracing::warn!("Failed to defer quiz interaction: {e:?}");
            }
        } else {
            let _ = mci
                .create_response(
                    &ctx,
                    serenity::CreateInteractionResponse::Message(
                        serenity::CreateInteractionResponseMessage::new()
                            .content("Not quite. The petals drift past you.")
                            .ephemeral(true),
                    ),
                )
                .await;
        }
    }

    // Close the table; no stakes to refund on a quiz
    let _ = ctx.data().tables.close(channel_id);

    let correct = format!(
        "{} {}",
        CHOICE_BADGES[question.answer],
        question.correct_choice()
    );
    let final_embed = match winner {
        Some(user_id) => {
            ctx.data()
                .economy
                .award(guild_id, user_id, question.prize, "Quiz prize")
                .await?;
            serenity::CreateEmbed::new()
                .title("🏆 We Have a Winner!")
                .description(format!(
                    "<@{}> answered first and wins **{}** petals!\n\nThe answer was: {}",
                    user_id,
                    format_number(question.prize),
                    correct
                ))
                .color(0x00FF00) // Green
        }
        None => serenity::CreateEmbed::new()
            .title("⏰ Time's Up!")
            .description(format!("Nobody got it. The answer was: {}", correct))
            .color(0xFFA500), // Orange
    };

    let _ = reply
        .edit(
            ctx,
            poise::CreateReply::default()
                .embed(final_embed)
                .components(vec![]),
        )
        .await;

    Ok(())
}
