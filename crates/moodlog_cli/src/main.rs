use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use moodlog_core::{EntryStore, Insights, MoodlogConfig, PipelineSettings};
use moodlog_gateway::GatewayServer;
use moodlog_store::SqliteEntryStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "moodlog", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "MOODLOG_CONFIG", default_value = "moodlog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Answer every check-in with a fixed label instead of calling the
        /// inference endpoints
        #[arg(long, value_name = "LABEL")]
        offline: Option<String>,
    },
    /// Print a user's streak, weekly recap and recent entries
    Recap {
        #[arg(short, long)]
        user: String,
    },
    /// Delete today's entry so the user can check in again
    Reset {
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = MoodlogConfig::load_or_default(&args.config);

    let store = Arc::new(
        SqliteEntryStore::new(&config.store.db_path)
            .await
            .with_context(|| format!("Failed to open entry store at {}", config.store.db_path))?,
    );

    match args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
        offline: None,
    }) {
        Command::Serve { host, port, offline } => serve(config, store, host, port, offline).await,
        Command::Recap { user } => recap(&config, store.as_ref(), &user).await,
        Command::Reset { user } => reset(&config, store.as_ref(), &user).await,
    }
}

async fn serve(
    config: MoodlogConfig,
    store: Arc<SqliteEntryStore>,
    host: Option<String>,
    port: Option<u16>,
    offline: Option<String>,
) -> Result<()> {
    let services = match offline {
        Some(label) => {
            info!("Offline mode: every modality answers '{}'", label);
            moodlog_inference::static_services(&label, "offline check-in", store)
        }
        None => moodlog_inference::http_services(&config.inference, store)?,
    };
    let settings = PipelineSettings::from_config(&config);
    info!(
        "Confidence threshold {:.2}, aggregation {:?}, diary override {}",
        settings.gate.threshold(),
        settings.reducer.aggregation(),
        settings.diary_override
    );

    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);
    let handle = GatewayServer::new(services, settings, &host, port).start();

    tokio::select! {
        result = handle => {
            result.context("Gateway task failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
    Ok(())
}

async fn recap(config: &MoodlogConfig, store: &dyn EntryStore, user: &str) -> Result<()> {
    let entries = store.list(user).await?;
    let insights = Insights::compute(&entries, config.clock.today());

    println!("Streak: {} day(s)", insights.streak);
    for line in &insights.recap {
        println!("- {}", line);
    }
    for entry in entries.iter().rev().take(7) {
        println!("{}  {:<5}  {}", entry.date, entry.final_emotion.as_str(), entry.diary);
    }
    Ok(())
}

async fn reset(config: &MoodlogConfig, store: &dyn EntryStore, user: &str) -> Result<()> {
    let today = config.clock.today();
    if store.remove(user, today).await? {
        println!("Removed {}'s entry for {}", user, today);
    } else {
        println!("No entry for {} on {}", user, today);
    }
    Ok(())
}
