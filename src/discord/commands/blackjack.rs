// Discord commands for blackjack: a solo round against the dealer and a
// head-to-head duel.
//
// Petals are escrowed up front and the channel is claimed in the table
// registry before any cards move. Whoever removes the ticket afterwards
// (this command, or the stale-table sweep) settles the stakes, so a bet is
// paid out exactly once even if the command task dies mid-game.

use crate::core::economy::EconomyError;
use crate::core::games::{
    BlackjackDuel, BlackjackRound, DuelError, DuelOutcome, DuelPhase, Hand, PlayerMove,
    RoundOutcome, RoundPhase, Seat, TableError, TableKind,
};
use crate::discord::commands::economy::{format_number, Context, Error};
use poise::serenity_prelude as serenity;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::SystemTime;

/// Play a round of blackjack against the dealer
#[poise::command(slash_command, guild_only)]
pub async fn blackjack(
    ctx: Context<'_>,
    #[description = "How many petals to bet"]
    #[min = 1]
    bet: i64,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();
    let channel_id = ctx.channel_id().get();

    // Escrow the bet before anything else
    match ctx
        .data()
        .economy
        .charge(guild_id, user_id, bet, "Blackjack bet")
        .await
    {
        Ok(_) => {}
        Err(e @ EconomyError::InsufficientFunds { .. }) => {
            ctx.say(format!("❌ {}", e)).await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    // Claim the channel; refund immediately if a game is already running
    if let Err(TableError::ChannelBusy) = ctx.data().tables.open(
        channel_id,
        guild_id,
        TableKind::Blackjack,
        vec![(user_id, bet)],
    ) {
        ctx.data()
            .economy
            .award(guild_id, user_id, bet, "Blackjack refund")
            .await?;
        ctx.say("🎴 A game is already running in this channel. Wait for it to finish.")
            .await?;
        return Ok(());
    }

    let mut rng = StdRng::seed_from_u64(table_seed(user_id, channel_id));
    let mut round = BlackjackRound::deal(&mut rng, bet);

    // Naturals resolve on the deal; skip straight to settlement
    if matches!(round.phase(), RoundPhase::PlayerTurn) {
        let embed = play_embed(ctx.author().name.as_str(), &round);
        let components = play_buttons(&round);
        let reply = ctx
            .send(
                poise::CreateReply::default()
                    .embed(embed)
                    .components(components),
            )
            .await?;
        let msg_id = reply.message().await?.id;

        while matches!(round.phase(), RoundPhase::PlayerTurn) {
            let Some(mci) = serenity::ComponentInteractionCollector::new(ctx)
                .author_id(ctx.author().id)
                .channel_id(ctx.channel_id())
                .timeout(std::time::Duration::from_secs(120))
                .filter(move |mci| mci.message.id == msg_id)
                .await
            else {
                // Walked away from the table: stand on what they have
                round.apply(PlayerMove::Stand);
                break;
            };

            match mci.data.custom_id.as_str() {
                "bj_hit" => {
                    round.apply(PlayerMove::Hit);
                }
                "bj_stand" => {
                    round.apply(PlayerMove::Stand);
                }
                "bj_double" => {
                    if !round.can_double() {
                        // Stale press on a button that has since disappeared
                        let _ = mci
                            .create_response(
                                &ctx,
                                serenity::CreateInteractionResponse::Message(
                                    serenity::CreateInteractionResponseMessage::new()
                                        .content("Doubling down is only possible on your first move.")
                                        .ephemeral(true),
                                ),
                            )
                            .await;
                        continue;
                    }
                    // The double down doubles the escrow too
                    match ctx
                        .data()
                        .economy
                        .charge(guild_id, user_id, bet, "Blackjack double down")
                        .await
                    {
                        Ok(_) => {
                            ctx.data().tables.add_stake(channel_id, user_id, bet);
                            round.apply(PlayerMove::DoubleDown);
                        }
                        Err(EconomyError::InsufficientFunds { .. }) => {
                            let _ = mci
                                .create_response(
                                    &ctx,
                                    serenity::CreateInteractionResponse::Message(
                                        serenity::CreateInteractionResponseMessage::new()
                                            .content(
                                                "You don't have enough petals to double down.",
                                            )
                                            .ephemeral(true),
                                    ),
                                )
                                .await;
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                _ => {}
            }

            ctx.data().tables.touch(channel_id);

            if let Err(e) = mci.defer(&ctx.http()).await {
                tracing::warn!("Failed to defer blackjack interaction: {e:?}");
                continue;
            }

            if matches!(round.phase(), RoundPhase::PlayerTurn) {
                let embed = play_embed(ctx.author().name.as_str(), &round);
                let components = play_buttons(&round);
                if let Err(e) = reply
                    .edit(
                        ctx,
                        poise::CreateReply::default()
                            .embed(embed)
                            .components(components),
                    )
                    .await
                {
                    tracing::warn!("Failed to update blackjack table: {e:?}");
                }
            }
        }

        // Settle: only the holder of the ticket pays out
        let Some(ticket) = ctx.data().tables.close(channel_id) else {
            ctx.say("The table was cleared for inactivity and your stake refunded.")
                .await?;
            return Ok(());
        };

        let escrowed: i64 = ticket.stakes.iter().map(|(_, amount)| amount).sum();
        let payout = round.payout();
        if payout > 0 {
            ctx.data()
                .economy
                .award(guild_id, user_id, payout, "Blackjack payout")
                .await?;
        }
        let house_take = escrowed - payout;
        if house_take > 0 {
            ctx.data().economy.credit_vault(guild_id, house_take).await?;
        }

        let embed = settled_embed(ctx.author().name.as_str(), &round, payout);
        let _ = reply
            .edit(
                ctx,
                poise::CreateReply::default()
                    .embed(embed)
                    .components(vec![]),
            )
            .await;
    } else {
        // Dealt a natural (either side). Settle without buttons.
        let Some(ticket) = ctx.data().tables.close(channel_id) else {
            return Ok(());
        };
        let escrowed: i64 = ticket.stakes.iter().map(|(_, amount)| amount).sum();
        let payout = round.payout();
        if payout > 0 {
            ctx.data()
                .economy
                .award(guild_id, user_id, payout, "Blackjack payout")
                .await?;
        }
        let house_take = escrowed - payout;
        if house_take > 0 {
            ctx.data().economy.credit_vault(guild_id, house_take).await?;
        }

        let embed = settled_embed(ctx.author().name.as_str(), &round, payout);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
    }

    Ok(())
}

/// Challenge another member to a blackjack duel
#[poise::command(slash_command, guild_only)]
pub async fn duel(
    ctx: Context<'_>,
    #[description = "Who to challenge"] opponent: serenity::User,
    #[description = "Petals each side puts up"]
    #[min = 1]
    stake: i64,
) -> Result<(), Error> {
    let challenger = ctx.author();
    let challenger_id = challenger.id.get();
    let opponent_id = opponent.id.get();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();
    let channel_id = ctx.channel_id().get();

    if opponent.bot {
        ctx.say("Bots never gamble. They always know the next card. 🤖")
            .await?;
        return Ok(());
    }
    if opponent_id == challenger_id {
        ctx.say("You cannot duel yourself. Youmu tried once. It was confusing.")
            .await?;
        return Ok(());
    }

    // Challenger escrows first; the opponent pays in if they accept
    match ctx
        .data()
        .economy
        .charge(guild_id, challenger_id, stake, "Duel stake")
        .await
    {
        Ok(_) => {}
        Err(e @ EconomyError::InsufficientFunds { .. }) => {
            ctx.say(format!("❌ {}", e)).await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    if let Err(TableError::ChannelBusy) = ctx.data().tables.open(
        channel_id,
        guild_id,
        TableKind::Duel,
        vec![(challenger_id, stake)],
    ) {
        ctx.data()
            .economy
            .award(guild_id, challenger_id, stake, "Duel refund")
            .await?;
        ctx.say("🎴 A game is already running in this channel. Wait for it to finish.")
            .await?;
        return Ok(());
    }

    let mut rng = StdRng::seed_from_u64(table_seed(challenger_id, channel_id));
    let mut duel = BlackjackDuel::new(&mut rng, challenger_id, opponent_id, stake);

    let challenge_embed = serenity::CreateEmbed::new()
        .title("⚔️ Blackjack Duel")
        .description(format!(
            "{} challenges {} for **{}** petals a side!",
            challenger.name,
            opponent.name,
            format_number(stake)
        ))
        .color(0xFFB7C5) // Cherry blossom pink
        .footer(serenity::CreateEmbedFooter::new(
            "The challenge expires in 60 seconds",
        ));
    let challenge_components = vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new("duel_accept")
            .label("Accept")
            .style(serenity::ButtonStyle::Success),
        serenity::CreateButton::new("duel_decline")
            .label("Decline")
            .style(serenity::ButtonStyle::Danger),
    ])];

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .content(format!("<@{}>", opponent_id))
                .embed(challenge_embed)
                .components(challenge_components),
        )
        .await?;
    let msg_id = reply.message().await?.id;

    // Challenge phase: only the opponent may answer
    while matches!(duel.phase(), DuelPhase::AwaitingAccept) {
        let Some(mci) = serenity::ComponentInteractionCollector::new(ctx)
            .channel_id(ctx.channel_id())
            .timeout(std::time::Duration::from_secs(60))
            .filter(move |mci| mci.message.id == msg_id)
            .await
        else {
            duel.expire();
            break;
        };

        if mci.user.id.get() != opponent_id {
            let _ = mci
                .create_response(
                    &ctx,
                    serenity::CreateInteractionResponse::Message(
                        serenity::CreateInteractionResponseMessage::new()
                            .content(format!("Only <@{}> can answer this challenge.", opponent_id))
                            .ephemeral(true),
                    ),
                )
                .await;
            continue;
        }

        match mci.data.custom_id.as_str() {
            "duel_accept" => {
                match ctx
                    .data()
                    .economy
                    .charge(guild_id, opponent_id, stake, "Duel stake")
                    .await
                {
                    Ok(_) => {
                        ctx.data().tables.add_stake(channel_id, opponent_id, stake);
                        // Deals the opening hands; challenger acts first
                        let _ = duel.accept();
                    }
                    Err(EconomyError::InsufficientFunds { .. }) => {
                        let _ = mci
                            .create_response(
                                &ctx,
                                serenity::CreateInteractionResponse::Message(
                                    serenity::CreateInteractionResponseMessage::new()
                                        .content("You don't have enough petals to cover the stake.")
                                        .ephemeral(true),
                                ),
                            )
                            .await;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            "duel_decline" => {
                let _ = duel.decline();
            }
            _ => continue,
        }

        ctx.data().tables.touch(channel_id);
        if let Err(e) = mci.defer(&ctx.http()).await {
            tracing::warn!("Failed to defer duel interaction: {e:?}");
        }
        break;
    }

    // Play phase: turn order is enforced by the duel state itself
    while let DuelPhase::InPlay { turn } = duel.phase() {
        let embed = duel_embed(&duel, &challenger.name, &opponent.name, Some(turn));
        let components = vec![serenity::CreateActionRow::Buttons(vec![
            serenity::CreateButton::new("duel_hit")
                .label("Hit")
                .style(serenity::ButtonStyle::Primary),
            serenity::CreateButton::new("duel_stand")
                .label("Stand")
                .style(serenity::ButtonStyle::Secondary),
        ])];
        if let Err(e) = reply
            .edit(
                ctx,
                poise::CreateReply::default()
                    .content(format!("<@{}>", duel.player_id(turn)))
                    .embed(embed)
                    .components(components),
            )
            .await
        {
            tracing::warn!("Failed to update duel table: {e:?}");
        }

        let Some(mci) = serenity::ComponentInteractionCollector::new(ctx)
            .channel_id(ctx.channel_id())
            .timeout(std::time::Duration::from_secs(120))
            .filter(move |mci| mci.message.id == msg_id)
            .await
        else {
            // Both walked away; the duel is abandoned and stakes come back
            duel.expire();
            break;
        };

        let Some(seat) = duel.seat_of(mci.user.id.get()) else {
            let _ = mci
                .create_response(
                    &ctx,
                    serenity::CreateInteractionResponse::Message(
                        serenity::CreateInteractionResponseMessage::new()
                            .content("This is not your duel.")
                            .ephemeral(true),
                    ),
                )
                .await;
            continue;
        };

        let result = match mci.data.custom_id.as_str() {
            "duel_hit" => duel.hit(seat),
            "duel_stand" => duel.stand(seat),
            _ => continue,
        };

        match result {
            Ok(_) => {
                ctx.data().tables.touch(channel_id);
                if let Err(e) = mci.defer(&ctx.http()).await {
                    tracing::warn!("Failed to defer duel interaction: {e:?}");
                }
            }
            Err(DuelError::NotYourTurn) | Err(DuelError::WrongPhase) => {
                let _ = mci
                    .create_response(
                        &ctx,
                        serenity::CreateInteractionResponse::Message(
                            serenity::CreateInteractionResponseMessage::new()
                                .content("It is not your turn.")
                                .ephemeral(true),
                        ),
                    )
                    .await;
            }
        }
    }

    // Settle: only the holder of the ticket pays out
    let Some(_ticket) = ctx.data().tables.close(channel_id) else {
        ctx.say("The duel was cleared for inactivity and the stakes refunded.")
            .await?;
        return Ok(());
    };

    for seat in [Seat::Challenger, Seat::Opponent] {
        let owed = duel.payout_for(seat);
        if owed > 0 {
            ctx.data()
                .economy
                .award(guild_id, duel.player_id(seat), owed, "Duel payout")
                .await?;
        }
    }

    let embed = duel_embed(&duel, &challenger.name, &opponent.name, None);
    let _ = reply
        .edit(
            ctx,
            poise::CreateReply::default()
                .content("")
                .embed(embed)
                .components(vec![]),
        )
        .await;

    Ok(())
}

/// Seed mixing the clock with the table so parallel games differ.
fn table_seed(user_id: u64, channel_id: u64) -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
        ^ user_id
        ^ channel_id
}

fn hand_line(hand: &Hand) -> String {
    if hand.is_empty() {
        // Declined and expired challenges settle before any cards move
        return "*(no cards dealt)*".to_string();
    }
    format!("{} ({})", hand, hand.value())
}

fn play_embed(player_name: &str, round: &BlackjackRound) -> serenity::CreateEmbed {
    // Dealer's hole card stays hidden while the player acts
    let dealer_shows = round
        .dealer()
        .cards()
        .first()
        .map(|c| c.to_string())
        .unwrap_or_default();

    serenity::CreateEmbed::new()
        .title("🎴 Blackjack")
        .description(format!("Bet: **{}** petals", format_number(round.bet())))
        .color(0xFFB7C5) // Cherry blossom pink
        .field(
            format!("{}'s Hand", player_name),
            hand_line(round.player()),
            true,
        )
        .field("Dealer Shows", format!("{} 🎴", dealer_shows), true)
}

fn play_buttons(round: &BlackjackRound) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new("bj_hit")
            .label("Hit")
            .style(serenity::ButtonStyle::Primary),
        serenity::CreateButton::new("bj_stand")
            .label("Stand")
            .style(serenity::ButtonStyle::Secondary),
        serenity::CreateButton::new("bj_double")
            .label("Double Down")
            .style(serenity::ButtonStyle::Danger)
            .disabled(!round.can_double()),
    ])]
}

fn settled_embed(player_name: &str, round: &BlackjackRound, payout: i64) -> serenity::CreateEmbed {
    let RoundPhase::Finished(outcome) = round.phase() else {
        // Settlement only runs on finished rounds
        return serenity::CreateEmbed::new().title("🎴 Blackjack");
    };

    let (title, color) = match outcome {
        RoundOutcome::PlayerNatural => ("🌸 Blackjack!", 0xFFD700),
        RoundOutcome::PlayerWin => ("✅ You Win!", 0x00FF00),
        RoundOutcome::DealerBust => ("✅ Dealer Busts!", 0x00FF00),
        RoundOutcome::Push => ("🤝 Push", 0xFFA500),
        RoundOutcome::PlayerBust => ("💥 Bust!", 0xFF0000),
        RoundOutcome::DealerWin => ("❌ Dealer Wins", 0xFF0000),
    };

    let net = payout - round.total_stake();
    let result_line = if net > 0 {
        format!("You collect **{}** petals. 🌸", format_number(payout))
    } else if net == 0 {
        "Your stake comes back to you.".to_string()
    } else {
        format!(
            "The vault swallows your **{}** petals.",
            format_number(-net)
        )
    };

    serenity::CreateEmbed::new()
        .title(title)
        .description(result_line)
        .color(color)
        .field(
            format!("{}'s Hand", player_name),
            hand_line(round.player()),
            true,
        )
        .field("Dealer's Hand", hand_line(round.dealer()), true)
}

fn duel_embed(
    duel: &BlackjackDuel,
    challenger_name: &str,
    opponent_name: &str,
    turn: Option<Seat>,
) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title("⚔️ Blackjack Duel")
        .color(0xFFB7C5) // Cherry blossom pink
        .field(
            format!("{} (challenger)", challenger_name),
            hand_line(duel.hand(Seat::Challenger)),
            true,
        )
        .field(
            format!("{} (opponent)", opponent_name),
            hand_line(duel.hand(Seat::Opponent)),
            true,
        );

    embed = match duel.phase() {
        DuelPhase::InPlay { .. } => {
            let name = match turn {
                Some(Seat::Challenger) => challenger_name,
                Some(Seat::Opponent) => opponent_name,
                None => "?",
            };
            embed.description(format!(
                "Pot: **{}** petals. It is **{}**'s turn.",
                format_number(duel.pot()),
                name
            ))
        }
        DuelPhase::Finished(outcome) => {
            let line = match outcome {
                DuelOutcome::Won { winner } => format!(
                    "🏆 <@{}> takes the pot of **{}** petals!",
                    duel.player_id(winner),
                    format_number(duel.pot())
                ),
                DuelOutcome::Push => "🤝 A push. Both stakes return.".to_string(),
                DuelOutcome::Declined => "The challenge was declined. Stake refunded.".to_string(),
                DuelOutcome::Expired => "Nobody answered the challenge. Stake refunded.".to_string(),
                DuelOutcome::Abandoned => {
                    "The duel was abandoned. Both stakes refunded.".to_string()
                }
            };
            embed.description(line)
        }
        DuelPhase::AwaitingAccept => embed,
    };

    embed
}
