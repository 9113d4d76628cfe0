//! looplistctl - command-line front end for a local LoopList store.
//!
//! Each invocation opens the SQLite snapshot, runs one operation as the
//! configured user and exits.

mod render;

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use eyre::WrapErr;
use looplist_core::types::day_format;
use looplist_core::{
    Config, Frequency, Id, IdentityProvider, LoopPatch, LoopStatus, NewLoop, StaticIdentity,
    StreakPolicy, Visibility,
};
use looplist_store::{LoopStore, SqliteKv, StoreError, StoreSettings};
use render::TerminalNotifier;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Track daily habits as loops.
#[derive(Parser)]
#[command(name = "looplistctl")]
#[command(about = "Habit loops with streaks, cheers and clones")]
#[command(version)]
struct Cli {
    /// SQLite file holding the loops (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file path (overrides .looplist/config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as this user id
    #[arg(long, global = true, env = "LOOPLIST_USER")]
    user: Option<String>,

    /// Streak policy: legacy or consecutive
    #[arg(long, global = true, value_parser = parse_streak_policy)]
    streak_policy: Option<StreakPolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a loop owned by the current user
    Create {
        /// Loop title
        title: Option<String>,

        #[command(flatten)]
        fields: LoopFields,
    },

    /// Edit a loop
    Update {
        /// Loop ID
        loop_id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        fields: LoopFields,

        /// Status: active, broken, or completed
        #[arg(long, value_parser = parse_status)]
        status: Option<LoopStatus>,
    },

    /// Delete one of your loops with its check-ins and cheers
    Delete {
        /// Loop ID
        loop_id: String,
    },

    /// List your loops
    List {
        /// List another user's loops instead
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show a loop and its check-ins
    Show {
        /// Loop ID
        loop_id: String,
    },

    /// Record today's (or another day's) outcome for a loop
    #[command(name = "check-in")]
    CheckIn {
        /// Loop ID
        loop_id: String,

        /// Day to record (YYYY-MM-DD, default: today in UTC)
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,

        /// Record the day as missed
        #[arg(long)]
        missed: bool,
    },

    /// Cheer a loop, or take the cheer back
    Cheer {
        /// Loop ID
        loop_id: String,
    },

    /// Copy a loop into your own private loops
    Clone {
        /// Loop ID
        loop_id: String,
    },

    /// Most popular public loops
    Trending,

    /// The loop of the day
    Today,

    /// Print the stored snapshot as JSON
    Export,
}

/// Loop fields shared by `create` and `update`.
#[derive(clap::Args)]
struct LoopFields {
    /// Emoji shown next to the title
    #[arg(long)]
    emoji: Option<String>,

    /// Cover image URL
    #[arg(long)]
    cover_image: Option<String>,

    /// Frequency: daily, weekdays, 3x-weekly, or custom
    #[arg(long, value_parser = parse_frequency)]
    frequency: Option<Frequency>,

    /// Weekdays for custom frequency, 0 = Sunday (e.g. 1,3,5)
    #[arg(long, value_delimiter = ',')]
    days: Option<Vec<u8>>,

    /// First day of the loop (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    start: Option<NaiveDate>,

    /// Visibility: private, public, or friends
    #[arg(long, value_parser = parse_visibility)]
    visibility: Option<Visibility>,

    /// Free-form category label
    #[arg(long)]
    category: Option<String>,
}

fn parse_streak_policy(s: &str) -> Result<StreakPolicy, String> {
    s.parse()
}

fn parse_frequency(s: &str) -> Result<Frequency, String> {
    s.parse()
}

fn parse_visibility(s: &str) -> Result<Visibility, String> {
    s.parse()
}

fn parse_status(s: &str) -> Result<LoopStatus, String> {
    s.parse()
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    day_format::parse(s)
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        // Store failures were already reported by the notifier.
        if e.downcast_ref::<StoreError>().is_none() {
            eprintln!("error: {e:#}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> eyre::Result<()> {
    let cwd = std::env::current_dir().wrap_err("failed to resolve working directory")?;
    let mut config =
        Config::load(&cwd, cli.config.as_deref()).wrap_err("failed to load config")?;
    if let Some(db) = cli.db {
        config.db_path = db;
        config.resolve_paths(&cwd);
    }
    if let Some(user) = cli.user {
        config.user = Some(user);
    }
    if let Some(policy) = cli.streak_policy {
        config.streak_policy = policy;
    }
    debug!("using database {}", config.db_path.display());

    let identity: Arc<dyn IdentityProvider> = match config.user {
        Some(ref user) => Arc::new(StaticIdentity::user(Id::from_string(user.as_str()))),
        None => Arc::new(StaticIdentity::anonymous()),
    };

    let kv = SqliteKv::open(&config.db_path)
        .await
        .wrap_err_with(|| format!("failed to open {}", config.db_path.display()))?;
    let store = LoopStore::open(
        kv,
        Arc::clone(&identity),
        Arc::new(TerminalNotifier::default()),
        StoreSettings::from(&config),
    )
    .await
    .map_err(|e| eyre::eyre!("failed to load loops: {e}"))?;

    let result = dispatch(&store, identity.as_ref(), cli.command).await;
    store.kv().close().await;
    result
}

async fn dispatch(
    store: &LoopStore<SqliteKv>,
    identity: &dyn IdentityProvider,
    command: Command,
) -> eyre::Result<()> {
    match command {
        Command::Create { title, fields } => {
            let created = store
                .create_loop(NewLoop {
                    title,
                    emoji: fields.emoji,
                    cover_image: fields.cover_image,
                    frequency: fields.frequency,
                    custom_days: fields.days,
                    start_date: fields.start.map(start_of_day),
                    visibility: fields.visibility,
                    category: fields.category,
                })
                .await?;
            render::print_loop_summary(&created);
        }
        Command::Update {
            loop_id,
            title,
            fields,
            status,
        } => {
            let patch = LoopPatch {
                title,
                emoji: fields.emoji,
                cover_image: fields.cover_image,
                frequency: fields.frequency,
                custom_days: fields.days,
                start_date: fields.start.map(start_of_day),
                visibility: fields.visibility,
                category: fields.category,
                status,
            };
            if patch.is_empty() {
                eyre::bail!("nothing to update; pass at least one field");
            }
            let updated = store.update_loop(&Id::from_string(loop_id), patch).await?;
            render::print_loop_summary(&updated);
        }
        Command::Delete { loop_id } => {
            store.delete_loop(&Id::from_string(loop_id)).await?;
        }
        Command::List { owner } => {
            let loops = match owner {
                Some(owner) => store.get_user_loops(&Id::from_string(owner)).await,
                None => {
                    if identity.current_user_id().is_none() {
                        eyre::bail!("no user set; pass --user or set LOOPLIST_USER");
                    }
                    store.current_user_loops().await
                }
            };
            render::print_loop_list(&loops);
        }
        Command::Show { loop_id } => {
            let loop_id = Id::from_string(loop_id);
            let Some(found) = store.get_loop_by_id(&loop_id).await else {
                eyre::bail!("loop not found: {loop_id}");
            };
            let check_ins = store.get_check_ins_for_loop(&loop_id).await;
            let cheered = store.has_user_cheered_loop(&loop_id).await;
            render::print_loop_details(&found, &check_ins, cheered);
        }
        Command::CheckIn {
            loop_id,
            date,
            missed,
        } => {
            let at = date.map_or_else(Utc::now, start_of_day);
            let updated = store
                .check_in_loop(&Id::from_string(loop_id), at, !missed)
                .await?;
            render::print_streak(&updated);
        }
        Command::Cheer { loop_id } => {
            let outcome = store.cheer_loop(&Id::from_string(loop_id)).await?;
            println!("  Cheers: {}", outcome.cheers);
        }
        Command::Clone { loop_id } => {
            let cloned = store.clone_loop(&Id::from_string(loop_id)).await?;
            render::print_loop_summary(&cloned);
        }
        Command::Trending => {
            render::print_loop_list(&store.get_trending_loops().await);
        }
        Command::Today => match store.get_loop_of_the_day().await {
            Some(featured) => render::print_loop_summary(&featured),
            None => println!("No public loops yet."),
        },
        Command::Export => {
            let json = serde_json::to_string_pretty(&store.snapshot().await)
                .wrap_err("failed to serialize snapshot")?;
            println!("{json}");
        }
    }
    Ok(())
}
