//! docket-admin: bootstrap and maintenance commands.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use docket_api::auth::hash_password;
use docket_core::{defaults, CreateUserRequest, ROLE_ADMIN};
use docket_db::Database;

#[derive(Parser)]
#[command(name = "docket-admin")]
#[command(author, version, about = "Administrative commands for docket")]
#[command(propagate_version = true)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", default_value = defaults::DATABASE_URL)]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the initial administrator unless the email is already registered
    CreateAdmin {
        /// Login email
        #[arg(long, env = "ADMIN_EMAIL")]
        email: String,

        /// Display name
        #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
        username: String,

        /// Password (min 6 characters)
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Apply pending migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db = Database::connect(&cli.database_url)
        .await
        .context("failed to connect to database")?;
    db.migrate().await.context("failed to run migrations")?;

    match cli.command {
        Commands::CreateAdmin {
            email,
            username,
            password,
        } => {
            if password.chars().count() < defaults::PASSWORD_MIN_LEN {
                anyhow::bail!("password must be at least {} characters", defaults::PASSWORD_MIN_LEN);
            }
            let password_hash = hash_password(&password)
                .map_err(|e| anyhow::anyhow!("password hashing failed: {e:?}"))?;

            let created = db
                .users
                .create_admin_if_missing(&CreateUserRequest {
                    username,
                    email: email.trim().to_string(),
                    password_hash,
                    role: ROLE_ADMIN.to_string(),
                    position: None,
                    phone: None,
                    office: None,
                })
                .await?;

            if created {
                println!("Admin {} created", email.trim());
            } else {
                println!("A user with email {} already exists, nothing to do", email.trim());
            }
        }
        Commands::Migrate => println!("Migrations applied"),
    }

    Ok(())
}
