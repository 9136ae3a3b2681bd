use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sheetpulse::config::ServerConfig;
use sheetpulse::server::start_server;

#[derive(Parser)]
#[command(name = "sheetpulse", about = "Spreadsheet upload, aggregation and AI narrative server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the SQLite database file
        #[arg(short, long)]
        database: Option<String>,

        /// Path to a YAML configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Allowed CORS origin (defaults to any)
        #[arg(long)]
        cors_origin: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sheetpulse=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            database,
            config,
            cors_origin,
        } => {
            let mut config = match config {
                Some(path) => ServerConfig::load(&path)?,
                None => ServerConfig::default(),
            };
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(database) = database {
                config.database_path = database;
            }
            if let Some(origin) = cors_origin {
                config.cors_origin = Some(origin);
            }

            start_server(config).await
        }
    }
}
