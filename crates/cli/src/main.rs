//! Bazaar CLI - Database migrations and shop management.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! bazaar-cli migrate
//!
//! # Create a staff account for the dashboard
//! bazaar-cli admin create -u admin -e admin@example.com -p 'long passphrase'
//!
//! # Load categories, products and coupons from a fixture
//! bazaar-cli seed fixtures/demo.yaml
//! ```
//!
//! All commands read `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`), loading
//! `.env` when present.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage staff accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Upsert categories, products and coupons from a YAML file
    Seed {
        /// Path to the fixture file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a staff user, or promote an existing one
    Create {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: Option<String>,

        #[arg(short, long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                email,
                password,
            } => {
                commands::admin::create_staff(&username, email.as_deref(), &password).await?;
            }
        },
        Commands::Seed { file } => {
            commands::seed::from_file(&file).await?;
        }
    }
    Ok(())
}
