//! Rabit CLI - Database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! rabit-cli migrate
//!
//! # Create an admin (password from --password or RABIT_USER_PASSWORD)
//! rabit-cli user create -e admin@example.com -n "Admin Name" -r admin
//!
//! # Create a brand for an existing owner
//! rabit-cli brand create -o owner@example.com -n "Acme Goods" -p 0123456789
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create a user with a password
//! - `brand create` - Create a brand for an owner

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "rabit-cli")]
#[command(author, version, about = "Rabit CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage brands
    Brand {
        #[command(subcommand)]
        action: BrandAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`admin` or `owner`)
        #[arg(short, long, default_value = "owner")]
        role: String,

        /// Password (falls back to `RABIT_USER_PASSWORD`)
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum BrandAction {
    /// Create a brand owned by an existing user
    Create {
        /// Owner's email address
        #[arg(short, long)]
        owner: String,

        /// Brand name
        #[arg(short, long)]
        name: String,

        /// Contact phone number
        #[arg(short, long)]
        phone: String,

        /// Logo URL (a placeholder is used when omitted)
        #[arg(short, long)]
        logo: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::users::create(&email, &name, &role, password).await?;
            }
        },
        Commands::Brand { action } => match action {
            BrandAction::Create {
                owner,
                name,
                phone,
                logo,
            } => {
                commands::brands::create(&owner, name, phone, logo).await?;
            }
        },
    }
    Ok(())
}
