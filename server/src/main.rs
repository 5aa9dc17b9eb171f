//! Data logger archive server (sdlogd)

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod archive;
mod config;
mod storage;

use archive::ArchiveIndex;
use config::Config;
use storage::{LocalStorage, StorageDevice};

#[derive(Parser)]
#[command(name = "sdlogd")]
#[command(about = "Serves the data logger's archived log files over HTTP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server in the foreground
    Serve,
    /// Print the archive listing
    List {
        /// Print the JSON document served at /api/logs
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sdlogd=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let device: Arc<dyn StorageDevice> = Arc::new(LocalStorage::new(&config.storage_root));

    match cli.command {
        Commands::Serve => {
            run_server(config, device).await?;
        }
        Commands::List { json } => {
            list_archive(&config, device, json)?;
        }
    }

    Ok(())
}

async fn run_server(config: Config, device: Arc<dyn StorageDevice>) -> anyhow::Result<()> {
    if device.is_mounted() {
        tracing::info!("storage mounted at {}", config.storage_root);
    } else {
        tracing::warn!(
            "storage root {} not present; archive routes will report it unavailable",
            config.storage_root
        );
    }

    let app_state = api::AppState::new(config.clone(), device);

    let rest_addr = format!("0.0.0.0:{}", config.rest_port).parse()?;
    tracing::info!("{} listening on {}", config.server_name, rest_addr);
    api::rest::serve(rest_addr, app_state).await?;

    Ok(())
}

fn list_archive(config: &Config, device: Arc<dyn StorageDevice>, json: bool) -> anyhow::Result<()> {
    let index = ArchiveIndex::new(device, config.archive_dir.clone());

    if json {
        println!("{}", index.render_json()?);
        return Ok(());
    }

    let mut count = 0;
    for (idx, entry) in index.entries()?.enumerate() {
        println!(
            "{:>4}  {:<32} {:>8} kB  {}",
            idx + 1,
            entry.name,
            entry.size_kib(),
            entry.timestamp
        );
        count += 1;
    }
    println!("{} log(s) in {}", count, index.archive_dir());
    Ok(())
}
