//! # Phrasedrop CLI
//!
//! Periodically delivers one unseen phrase from a shared pool to every
//! subscribed Telegram chat, never repeating a phrase for the same
//! recipient, and falls back to a fixed message once a recipient has seen
//! everything. Faults are escalated to the operational log, operator chats,
//! and (optionally) email.
//!
//! Usage:
//!   phrasedrop start                        # Run the delivery scheduler
//!   phrasedrop phrases import quotes.txt    # Add phrases, one per line
//!   phrasedrop phrases list
//!   phrasedrop users add 123456 --subscribe
//!   phrasedrop users set-role 123456 admin on
//!   phrasedrop users list
//!   phrasedrop config show

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use phrasedrop_channels::{MailEscalation, Mailer, TelegramChannel, TelegramEscalation};
use phrasedrop_core::PhrasedropConfig;
use phrasedrop_core::traits::{RecipientDirectory, Store};
use phrasedrop_core::types::Role;
use phrasedrop_scheduler::{CycleTimer, DeliveryCycle, EscalationPipeline, WakeupSchedule};
use phrasedrop_store::SqliteStore;

#[derive(Parser)]
#[command(
    name = "phrasedrop",
    version,
    about = "Periodic unseen-phrase delivery over Telegram"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the delivery scheduler
    Start,

    /// Manage the phrase pool
    Phrases {
        #[command(subcommand)]
        action: PhraseAction,
    },

    /// Manage recipients
    Users {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum PhraseAction {
    /// Import phrases from a file, one per line (duplicate text is skipped)
    Import { file: PathBuf },
    /// List the stored pool
    List,
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a recipient chat
    Add {
        chat_id: i64,
        /// Subscribe the recipient to deliveries
        #[arg(long)]
        subscribe: bool,
        /// Grant the admin capability
        #[arg(long)]
        admin: bool,
    },
    /// List recipients
    List,
    /// Toggle a capability: <chat_id> <admin|subscriber> <on|off>
    SetRole {
        chat_id: i64,
        role: String,
        state: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the loaded configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(PhrasedropConfig::default_path);
    let config = PhrasedropConfig::load_from(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let log_path = init_logging(&config, cli.verbose)?;

    match cli.command {
        Commands::Start => start(config, log_path).await,
        Commands::Phrases { action } => phrases_cmd(&config, action).await,
        Commands::Users { action } => users_cmd(&config, action).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        },
    }
}

/// Tee log output to stdout and a per-run file under the working directory.
/// The file is what escalation reports excerpt from.
fn init_logging(config: &PhrasedropConfig, verbose: bool) -> Result<PathBuf> {
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("{}.log", chrono::Utc::now().format("%Y%m%dT%H%M%S")));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file).and(std::io::stdout))
        .init();
    tracing::info!("Logging to {}", log_path.display());
    Ok(log_path)
}

async fn start(config: PhrasedropConfig, log_path: PathBuf) -> Result<()> {
    let schedule = WakeupSchedule::new(config.schedule.anchor()?, config.schedule.period()?)?;
    let store = Arc::new(SqliteStore::open(&config.db_path())?);
    let telegram = TelegramChannel::new(config.bot_token.clone());

    let mut pipeline = EscalationPipeline::new()
        .with_log_path(log_path)
        .with_version(env!("CARGO_PKG_VERSION"));
    let admin_chats = store.admin_chats().await?;
    if admin_chats.is_empty() {
        tracing::warn!("No admin recipients; fault reports go to the log only");
    } else {
        tracing::info!("Fault reports go to {} admin chats", admin_chats.len());
        pipeline.add_channel(Box::new(TelegramEscalation::new(
            telegram.clone(),
            admin_chats,
        )));
    }
    if let Some(mail) = &config.error_mail {
        tracing::info!("Fault reports will be mailed to {}", mail.to_addr);
        pipeline.add_channel(Box::new(MailEscalation::new(Mailer::new(
            mail.clone(),
            "Phrasedrop error",
        ))));
    }

    let cycle = Arc::new(DeliveryCycle::new(
        store.clone(),
        store.clone(),
        Arc::new(telegram),
        Arc::new(pipeline),
    ));
    let mut timer = CycleTimer::start(schedule, move || {
        let cycle = cycle.clone();
        async move { cycle.run().await }
    });

    tracing::info!("🦀 Phrasedrop running; press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    while let Err(e) = timer.stop().await {
        tracing::warn!("{e}");
    }
    Ok(())
}

async fn phrases_cmd(config: &PhrasedropConfig, action: PhraseAction) -> Result<()> {
    let store = SqliteStore::open(&config.db_path())?;
    match action {
        PhraseAction::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let phrases: Vec<String> = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
            let total = phrases.len();
            let inserted = store.add_phrases_if_absent(&phrases).await?;
            println!(
                "Imported {inserted} new phrases ({} duplicates skipped)",
                total - inserted
            );
        }
        PhraseAction::List => {
            for phrase in store.all_phrases().await? {
                println!("{}  {}", phrase.id, phrase.text);
            }
        }
    }
    Ok(())
}

async fn users_cmd(config: &PhrasedropConfig, action: UserAction) -> Result<()> {
    let store = SqliteStore::open(&config.db_path())?;
    match action {
        UserAction::Add {
            chat_id,
            subscribe,
            admin,
        } => {
            store.ensure_recipient(chat_id)?;
            if subscribe {
                store.set_role(chat_id, Role::Subscriber, true)?;
            }
            if admin {
                store.set_role(chat_id, Role::Admin, true)?;
            }
            println!("Registered chat {chat_id}");
        }
        UserAction::List => {
            for recipient in store.list_recipients()? {
                println!(
                    "{}  admin={}  subscribed={}",
                    recipient.chat_id,
                    recipient.has_role(Role::Admin),
                    recipient.has_role(Role::Subscriber),
                );
            }
        }
        UserAction::SetRole {
            chat_id,
            role,
            state,
        } => {
            let role = match role.as_str() {
                "admin" => Role::Admin,
                "subscriber" => Role::Subscriber,
                other => bail!("unknown role '{other}' (expected admin|subscriber)"),
            };
            let state = match state.as_str() {
                "on" => true,
                "off" => false,
                other => bail!("unknown state '{other}' (expected on|off)"),
            };
            store.set_role(chat_id, role, state)?;
            println!("Updated chat {chat_id}");
        }
    }
    Ok(())
}
