use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hacksync_storage::PgStore;
use hacksync_sync::{engine_from_config, SyncConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hacksync")]
#[command(about = "Hackathon listing sync")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "HACKSYNC_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one sync pass and print the summary.
    Sync {
        /// Print the full summary as JSON instead of the one-line message.
        #[arg(long)]
        json: bool,
    },
    /// Serve the HTTP trigger and listing endpoints.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply database migrations to DATABASE_URL.
    Migrate,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(err) = installed {
        eprintln!("tracing already initialised: {err}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    let mut config = SyncConfig::from_env();

    match cli.command.unwrap_or(Commands::Sync { json: false }) {
        Commands::Sync { json } => {
            let engine = engine_from_config(&config).await.context("preparing sync engine")?;
            let summary = engine.run_once().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "{} (rejected={} deactivated={} total={} run_id={})",
                    summary.message(),
                    summary.stats.rejected,
                    summary.stats.deactivated,
                    summary.stats.total,
                    summary.run_id
                );
            }
        }
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.web_port = port;
            }
            hacksync_web::serve(config).await?;
        }
        Commands::Migrate => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set to run migrations")?;
            let store = PgStore::connect(url).await.context("connecting to database")?;
            store.migrate().await.context("applying migrations")?;
            info!("migrations complete");
        }
    }

    Ok(())
}
