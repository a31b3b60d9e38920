use std::path::PathBuf;
use std::time::Duration;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use livecraft_core::PipelineConfig;
use livecraft_core::config::default_database_path;
use livecraft_core::platforms::ReconnectPolicy;

mod server;
mod store_commands;

#[derive(Parser, Debug)]
#[command(name = "livecraft")]
#[command(author, version, about = "livecraft - rule-driven actions for live stream events")]
struct Args {
    /// Path of the sqlite database file. Defaults to the platform's local
    /// data directory.
    #[arg(long, global = true, env = "LIVECRAFT_DATABASE_URL")]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to the live source and dispatch actions until Ctrl-C.
    Run(RunArgs),
    /// Print every record of a collection, one JSON object per line.
    List { collection: String },
    /// Write a collection as a JSON array.
    Export {
        collection: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Save every object of a JSON array into a collection.
    Import { collection: String, file: PathBuf },
    /// Remove all records of a collection.
    Clear { collection: String },
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// WebSocket the live platform events arrive on.
    #[arg(long, env = "LIVECRAFT_LIVE_URL", default_value = "ws://127.0.0.1:21213")]
    live_url: String,

    /// WebSocket "actions" messages are sent to.
    #[arg(long, env = "LIVECRAFT_ACTION_URL", default_value = "ws://127.0.0.1:8000")]
    action_url: String,

    /// HTTP endpoint for TTS. Speech is only logged when unset.
    #[arg(long, env = "LIVECRAFT_TTS_URL")]
    tts_url: Option<String>,

    /// "strict" or "lenient" checking of action fields.
    #[arg(long, env = "LIVECRAFT_FIELD_VALIDATION", default_value = "strict")]
    field_validation: String,

    #[arg(long, env = "LIVECRAFT_RECONNECT_INITIAL_MS", default_value_t = 1000)]
    reconnect_initial_ms: u64,

    #[arg(long, env = "LIVECRAFT_RECONNECT_MAX_MS", default_value_t = 30000)]
    reconnect_max_ms: u64,
}

impl RunArgs {
    fn into_config(self, database_url: String) -> anyhow::Result<PipelineConfig> {
        Ok(PipelineConfig {
            database_url,
            live_source_url: self.live_url,
            action_socket_url: self.action_url,
            tts_url: self.tts_url,
            reconnect: ReconnectPolicy {
                initial: Duration::from_millis(self.reconnect_initial_ms),
                max: Duration::from_millis(self.reconnect_max_ms),
                ..ReconnectPolicy::default()
            },
            field_validation: self.field_validation.parse()?,
        })
    }
}

fn init_tracing() {
    // tungstenite logs through the `log` crate
    let _ = tracing_log::LogTracer::init();
    let filter = EnvFilter::from_default_env()
        .add_directive("livecraft=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(sub).is_err() {
        eprintln!("A global tracing subscriber was already set");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    let db_path = args.db_path.unwrap_or_else(default_database_path);
    info!("livecraft starting. db={}", db_path);

    match args.command {
        Command::Run(run) => {
            let config = run.into_config(db_path)?;
            server::run_server(config).await?;
        }
        Command::List { collection } => store_commands::list(&db_path, &collection).await?,
        Command::Export { collection, out } => {
            store_commands::export(&db_path, &collection, out.as_deref()).await?
        }
        Command::Import { collection, file } => {
            store_commands::import(&db_path, &collection, &file).await?
        }
        Command::Clear { collection } => store_commands::clear(&db_path, &collection).await?,
    }
    info!("Main finished. Goodbye!");
    Ok(())
}
