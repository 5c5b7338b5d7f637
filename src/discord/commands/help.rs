use crate::discord::commands::economy::{Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

// Category definitions with emojis and order
const CATEGORY_ORDER: &[&str] = &[
    "Petals & Banking",
    "Games",
    "Moderation",
    "Utilities",
];

fn get_category_emoji(category: &str) -> &'static str {
    match category {
        "Petals & Banking" => "🌸",
        "Games" => "🎴",
        "Moderation" => "🛡️",
        "Utilities" => "🧰",
        _ => "•",
    }
}

struct CommandMetadata {
    category: &'static str,
    priority: i32,
    description: Option<&'static str>,
    note: Option<&'static str>,
}

fn get_command_metadata(name: &str) -> CommandMetadata {
    match name {
        "balance" => CommandMetadata {
            category: "Petals & Banking",
            priority: 100,
            description: Some("Check your purse, bank, loan and biggest catch."),
            note: None,
        },
        "daily" => CommandMetadata {
            category: "Petals & Banking",
            priority: 95,
            description: Some("Claim your daily petals once every 24 hours."),
            note: None,
        },
        "pay" => CommandMetadata {
            category: "Petals & Banking",
            priority: 90,
            description: Some("Send petals to another member."),
            note: None,
        },
        "bank" => CommandMetadata {
            category: "Petals & Banking",
            priority: 85,
            description: Some("Deposit or withdraw petals. Banked petals are never taxed."),
            note: Some("Subcommands: deposit, withdraw"),
        },
        "loan" => CommandMetadata {
            category: "Petals & Banking",
            priority: 80,
            description: Some("Borrow from the server vault at 10% interest."),
            note: Some("Subcommands: take, repay, status. Late loans grow 5% per day."),
        },
        "richest" => CommandMetadata {
            category: "Petals & Banking",
            priority: 75,
            description: Some("The top 10 wealthiest members of this server."),
            note: None,
        },
        "vault" => CommandMetadata {
            category: "Petals & Banking",
            priority: 70,
            description: Some("Peek at the server vault's treasury and tax settings."),
            note: None,
        },
        "tax" => CommandMetadata {
            category: "Petals & Banking",
            priority: 0, // Low priority, staff only
            description: Some("Collect taxes or set the rate (staff only)."),
            note: Some("Subcommands: collect, rate"),
        },
        "blackjack" => CommandMetadata {
            category: "Games",
            priority: 90,
            description: Some("Bet petals on a round against the dealer."),
            note: Some("Hit, stand or double down. Naturals pay 3:2."),
        },
        "duel" => CommandMetadata {
            category: "Games",
            priority: 85,
            description: Some("Challenge a member to blackjack, winner takes the pot."),
            note: None,
        },
        "fish" => CommandMetadata {
            category: "Games",
            priority: 80,
            description: Some("Cast a line into the Sanzu River. 30 second cooldown."),
            note: None,
        },
        "quiz" => CommandMetadata {
            category: "Games",
            priority: 75,
            description: Some("A question for the channel. First correct answer wins."),
            note: None,
        },
        "ban" => CommandMetadata {
            category: "Moderation",
            priority: 90,
            description: Some("Ban a member (staff only)."),
            note: None,
        },
        "kick" => CommandMetadata {
            category: "Moderation",
            priority: 85,
            description: Some("Kick a member (staff only)."),
            note: None,
        },
        "timeout" => CommandMetadata {
            category: "Moderation",
            priority: 80,
            description: Some("Time a member out for a number of minutes (staff only)."),
            note: None,
        },
        "clear" => CommandMetadata {
            category: "Moderation",
            priority: 75,
            description: Some("Bulk delete recent messages in this channel (staff only)."),
            note: None,
        },
        "blocklist" => CommandMetadata {
            category: "Moderation",
            priority: 70,
            description: Some("Manage users whose messages are silently removed (staff only)."),
            note: Some("Subcommands: add, remove, show"),
        },
        "about" => CommandMetadata {
            category: "Utilities",
            priority: 50,
            description: Some("Who this bot is and what she does."),
            note: None,
        },
        _ => CommandMetadata {
            category: "Utilities",
            priority: 0,
            description: None,
            note: None,
        },
    }
}

/// Show a categorized list of commands.
#[poise::command(slash_command, prefix_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let mut categories: HashMap<&str, Vec<(i32, String)>> = HashMap::new();

    for command in &ctx.framework().options().commands {
        if command.hide_in_help {
            continue;
        }

        let metadata = get_command_metadata(&command.name);

        if command.name == "help" {
            continue;
        }

        let description = metadata
            .description
            .or(command.description.as_deref())
            .or(command.help_text.as_deref())
            .unwrap_or("No description provided.");

        let mut entry = format!("• **/{0}** — {1}", command.name, description);

        if let Some(note) = metadata.note {
            entry.push_str(&format!("\n  ⤷ {}", note));
        }

        categories
            .entry(metadata.category)
            .or_default()
            .push((metadata.priority, entry));
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("Yuyuko's Command Guide")
        .description(
            "Use slash commands with `/`. \
            Commands are grouped by what you want to do, with the most useful \
            ones at the top of each section.",
        )
        .color(serenity::Colour::from_rgb(255, 183, 197))
        .timestamp(serenity::Timestamp::now());

    if let Some(user) = ctx.framework().bot_id.to_user(&ctx).await.ok() {
        embed = embed.thumbnail(user.face());
    }

    // Sort categories based on defined order, then alphabetically for others
    let mut sorted_categories: Vec<_> = categories.keys().cloned().collect();
    sorted_categories.sort_by(|a, b| {
        let pos_a = CATEGORY_ORDER.iter().position(|&x| x == *a).unwrap_or(999);
        let pos_b = CATEGORY_ORDER.iter().position(|&x| x == *b).unwrap_or(999);
        pos_a.cmp(&pos_b).then(a.cmp(b))
    });

    for category in sorted_categories {
        if let Some(entries) = categories.get_mut(category) {
            // Sort by priority (descending), then name (ascending)
            entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            let emoji = get_category_emoji(category);
            let title = format!("{} {}", emoji, category);

            let formatted_entries: Vec<String> = entries.iter().map(|(_, s)| s.clone()).collect();

            // Chunk entries to avoid hitting 1024 char limit per field
            let chunks = chunk_entries(&formatted_entries);

            for (i, chunk) in chunks.iter().enumerate() {
                let field_name = if i == 0 {
                    title.clone()
                } else {
                    format!("{} (cont.)", title)
                };

                embed = embed.field(field_name, chunk.join("\n"), false);
            }
        }
    }

    embed = embed.footer(serenity::CreateEmbedFooter::new(
        "Need a hand? Ping a moderator.",
    ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

fn chunk_entries(entries: &[String]) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current_chunk = Vec::new();
    let mut current_length = 0;

    for entry in entries {
        let entry_len = entry.len();
        // Discord field value limit is 1024. We leave a bit of buffer.
        if current_length + entry_len + 1 > 1000 {
            chunks.push(current_chunk);
            current_chunk = Vec::new();
            current_length = 0;
        }

        current_chunk.push(entry.clone());
        current_length += entry_len + 1; // +1 for newline
    }

    if !current_chunk.is_empty() {
        chunks.push(current_chunk);
    }

    chunks
}
