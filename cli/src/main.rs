mod seed;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "potluck")]
#[command(about = "Potluck CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ping the server (unauthenticated)
    Ping {
        /// Server URL (default: http://localhost:3000)
        #[arg(long, default_value = "http://localhost:3000")]
        server: String,
    },
    /// Seed the database with the tag and ingredient catalogs
    Seed {
        /// Database URL (default: the DATABASE_URL environment variable)
        #[arg(long)]
        database_url: Option<String>,
        /// Directory holding tags.json and ingredients.json
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ping { server } => {
            ping(&server).await?;
        }
        Commands::Seed {
            database_url,
            data_dir,
        } => {
            let database_url = database_url
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .context("DATABASE_URL must be set (flag or environment variable)")?;
            seed::seed(&database_url, &data_dir)?;
        }
    }

    Ok(())
}

#[derive(serde::Deserialize)]
struct PingResponse {
    message: String,
}

async fn ping(server: &str) -> Result<()> {
    let response = reqwest::get(format!("{}/api/test/unauthed-ping", server))
        .await?
        .error_for_status()?;

    let body: PingResponse = response.json().await?;
    println!("{}", body.message);

    Ok(())
}
