//! Delicious CLI - database migrations, seeding and account management.
//!
//! # Usage
//!
//! ```bash
//! # Create the schema and the session table
//! delicious migrate
//!
//! # Load sample stores, owned by a seed account
//! delicious seed --file data/stores.json --email seed@example.com --password 'correct horse'
//!
//! # Create an account
//! delicious user create -e wes@example.com -n Wes -p 'correct horse'
//! ```
//!
//! All commands read the same `DELICIOUS_*` environment as the web server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "delicious")]
#[command(author, version, about = "Delicious directory CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations (directory schema and session store)
    Migrate,
    /// Insert stores from a JSON file
    Seed {
        /// Path to the JSON seed file
        #[arg(short, long, default_value = "data/stores.json")]
        file: String,

        /// Email of the account that will own the stores (created if missing)
        #[arg(short, long, default_value = "seed@delicious.local")]
        email: String,

        /// Password for the seed account when it has to be created
        #[arg(short, long)]
        password: String,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Login email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Password (at least 8 characters)
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
        Commands::Seed {
            file,
            email,
            password,
        } => commands::seed::run(&file, &email, &password).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                password,
            } => commands::user::create(&email, &name, &password).await?,
        },
    }
    Ok(())
}
