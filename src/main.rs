// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, files)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::chatter::ChatterService;
use crate::core::economy::EconomyService;
use crate::core::games::{FishingService, QuizService, TableRegistry};
use crate::core::moderation::ModerationService;
use crate::discord::chatter as chatter_events;
use crate::discord::commands::presence;
use crate::discord::{Data, Error};
use crate::infra::catalogs;
use crate::infra::chatter::SqliteMemoryStore;
use crate::infra::economy::JsonLedgerStore;
use crate::infra::moderation::SqliteBlocklistStore;
use crate::infra::webhook::WebhookNotifier;
use poise::serenity_prelude as serenity;

const FISHING_COOLDOWN_SECS: i64 = 30;

/// Event handler for non-command Discord events.
/// Messages feed the blocklist, the chat memory and the chatter rules.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = chatter_events::handle_message(ctx, new_message, data).await {
                tracing::error!("Error handling message: {}", e);
            }
        }
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    // Keep runtime state in a dedicated folder so the repo root stays tidy.
    let data_dir = std::env::var("YUYUKO_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    std::fs::create_dir_all(&data_dir).expect("Failed to create data directory");
    let config_dir = std::path::PathBuf::from(
        std::env::var("YUYUKO_CONFIG_DIR").unwrap_or_else(|_| "config".to_string()),
    );
    let db_path = format!("{}/yuyuko.db", data_dir);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    use std::sync::Arc;

    // Economy: flat JSON ledger, loaded once and held in memory
    let ledger_store = JsonLedgerStore::new(format!("{}/economy.json", data_dir));
    let economy_service = Arc::new(
        EconomyService::new(ledger_store)
            .await
            .expect("Failed to load the economy ledger"),
    );

    // One game per channel, tracked here
    let tables = Arc::new(TableRegistry::new());

    let fishing_catalog = catalogs::load_fishing_catalog(&config_dir)
        .expect("Failed to load the fishing catalog");
    let fishing_service = Arc::new(FishingService::new(fishing_catalog, FISHING_COOLDOWN_SECS));

    let quiz_catalog =
        catalogs::load_quiz_catalog(&config_dir).expect("Failed to load the quiz catalog");
    let quiz_service = Arc::new(QuizService::new(quiz_catalog).expect("Quiz catalog is invalid"));

    // Chatter: YAML response rules plus a SQLite memory of what was said
    let memory_ttl_days = std::env::var("YUYUKO_MEMORY_TTL_DAYS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(7);
    let memory_store = SqliteMemoryStore::new(&db_path)
        .await
        .expect("Failed to initialize the chat memory store");
    let response_catalog = catalogs::load_response_catalog(&config_dir)
        .expect("Failed to load the response catalog");
    let chatter_service = Arc::new(ChatterService::new(
        response_catalog,
        memory_store,
        memory_ttl_days,
    ));

    let blocklist_store = SqliteBlocklistStore::new(&db_path)
        .await
        .expect("Failed to initialize the blocklist store");
    let moderation_service = Arc::new(ModerationService::new(blocklist_store));

    // Webhook notifications are optional; unset URL means stay quiet
    let notifier = Arc::new(WebhookNotifier::new(std::env::var("YUYUKO_WEBHOOK_URL").ok()));

    let tax_interval_hours = std::env::var("YUYUKO_TAX_INTERVAL_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24);

    // Create the data structure that will be shared across all commands
    let data = Data {
        economy: Arc::clone(&economy_service),
        tables: Arc::clone(&tables),
        fishing: Arc::clone(&fishing_service),
        quiz: Arc::clone(&quiz_service),
        chatter: Arc::clone(&chatter_service),
        moderation: Arc::clone(&moderation_service),
        notifier: Arc::clone(&notifier),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Configure the poise framework with our commands and settings.

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![
                discord::commands::economy::balance(),
                discord::commands::economy::daily(),
                discord::commands::economy::pay(),
                discord::commands::economy::richest(),
                discord::commands::bank::bank(),
                discord::commands::bank::loan(),
                discord::commands::vault::vault(),
                discord::commands::vault::tax(),
                discord::commands::blackjack::blackjack(),
                discord::commands::blackjack::duel(),
                discord::commands::fishing::fish(),
                discord::commands::quiz::quiz(),
                discord::commands::help::help(),
                discord::commands::about::about(),
                crate::discord::moderation::ban(),
                crate::discord::moderation::kick(),
                crate::discord::moderation::timeout(),
                crate::discord::moderation::clear(),
                crate::discord::moderation::blocklist(),
            ],
            // Event handler for messages and other events
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                println!("🌸 Yuyuko is drifting in...");

                // Register slash commands globally (can take up to an hour to propagate)
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                println!("✅ Commands registered!");
                presence::on_ready(ctx);

                // Background sweep: loan penalties and scheduled taxes, hourly
                let sweeper = Arc::clone(&data.economy);
                tokio::spawn(async move {
                    use std::time::Duration as StdDuration;
                    use tokio::time::sleep;

                    loop {
                        sleep(StdDuration::from_secs(60 * 60)).await;

                        match sweeper.run_scheduled_sweeps(tax_interval_hours).await {
                            Ok(reports) => {
                                for report in reports {
                                    tracing::info!(
                                        guild_id = report.guild_id,
                                        collected = report.collected,
                                        payers = report.payers,
                                        treasury = report.treasury,
                                        "Scheduled tax sweep finished"
                                    );
                                }
                            }
                            Err(err) => tracing::warn!("Scheduled sweep failed: {}", err),
                        }
                    }
                });

                // Chat memory TTL purge, every ten minutes
                let chatter = Arc::clone(&data.chatter);
                tokio::spawn(async move {
                    use std::time::Duration as StdDuration;
                    use tokio::time::sleep;

                    loop {
                        sleep(StdDuration::from_secs(10 * 60)).await;

                        match chatter.purge_expired().await {
                            Ok(0) => {}
                            Ok(purged) => tracing::info!(purged, "Expired chat memory purged"),
                            Err(err) => tracing::warn!("Chat memory purge failed: {}", err),
                        }
                    }
                });

                // Stale game tables: refund the escrowed stakes, every minute
                let stale_tables = Arc::clone(&data.tables);
                let refunder = Arc::clone(&data.economy);
                tokio::spawn(async move {
                    use std::time::Duration as StdDuration;
                    use tokio::time::sleep;

                    loop {
                        sleep(StdDuration::from_secs(60)).await;

                        for (channel_id, ticket) in
                            stale_tables.sweep_stale(chrono::Duration::minutes(10))
                        {
                            for (user_id, amount) in &ticket.stakes {
                                if *amount <= 0 {
                                    continue;
                                }
                                if let Err(err) = refunder
                                    .award(
                                        ticket.guild_id,
                                        *user_id,
                                        *amount,
                                        "Stale table refund",
                                    )
                                    .await
                                {
                                    tracing::error!(
                                        user_id,
                                        amount,
                                        "Failed to refund a swept stake: {}",
                                        err
                                    );
                                }
                            }
                            tracing::info!(
                                channel_id,
                                kind = ticket.kind.label(),
                                "Swept a stale game table"
                            );
                        }
                    }
                });

                println!("🚀 Yuyuko is ready!");
                Ok(data)
            })
        })
        .build();

    // Create the client and start the bot
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
