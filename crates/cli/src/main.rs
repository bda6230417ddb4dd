//! Shopdesk CLI - Database migrations, user bootstrap, and sales rollups.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! shopdesk-cli migrate
//!
//! # Create an admin user
//! shopdesk-cli admin create -e admin@example.com -n "Admin Name" -p 'long passphrase'
//!
//! # Reset a password
//! shopdesk-cli admin set-password -e admin@example.com -p 'new passphrase'
//!
//! # Roll up yesterday's delivered orders
//! shopdesk-cli sales rollup
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` / `admin set-password` - Manage back-office users
//! - `sales rollup` - Recompute `daily_sales` and `category_sales`

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;

use commands::sales::RollupTarget;

#[derive(Parser)]
#[command(name = "shopdesk-cli")]
#[command(author, version, about = "Shopdesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage back-office users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Sales aggregation
    Sales {
        #[command(subcommand)]
        action: SalesAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`admin`, `user`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
    /// Replace a user's password
    SetPassword {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// New password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SalesAction {
    /// Recompute rollup rows (defaults to yesterday)
    Rollup {
        /// Single date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// First date of a range (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date of a range, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopdesk_cli=info,shopdesk_admin=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
                role,
            } => {
                commands::admin::create_user(&email, &name, &password, &role).await?;
            }
            AdminAction::SetPassword { email, password } => {
                commands::admin::set_password(&email, &password).await?;
            }
        },
        Commands::Sales { action } => match action {
            SalesAction::Rollup { date, from, to } => {
                let target =
                    RollupTarget::from_args(date, from, to, commands::sales::today())?;
                commands::sales::rollup(target).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_rollup_range() {
        let cli = Cli::try_parse_from([
            "shopdesk-cli",
            "sales",
            "rollup",
            "--from",
            "2025-03-01",
            "--to",
            "2025-03-31",
        ]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Sales {
                action: SalesAction::Rollup {
                    date: None,
                    from: Some(_),
                    to: Some(_)
                }
            })
        ));
    }

    #[test]
    fn test_rejects_bad_date() {
        assert!(
            Cli::try_parse_from(["shopdesk-cli", "sales", "rollup", "--date", "14/03/2025"])
                .is_err()
        );
    }
}
