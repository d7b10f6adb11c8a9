use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::db::DatabaseManager;
use crate::domain::Role;
use crate::hotel::users::NewUserInput;
use crate::hotel::{HotelCore, Principal};
use crate::utils::logging::init_tracing;
use crate::web::WebServer;

#[derive(Debug, Parser)]
#[command(name = "hrs", version, about = "Hotel reservation and front desk server")]
pub struct Cli {
    /// Configuration file. Falls back to `HRS_CONFIG`, then `config.yaml`.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Apply migrations and serve the HTTP API (default).
    Serve,
    /// Apply migrations and seed role defaults, then exit.
    Migrate,
    /// Create a login and print its API token.
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: Role,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Arc::new(
            Config::load(self.config.as_deref()).context("failed to load configuration")?,
        );
        init_tracing(&config.logging).context("failed to install tracing subscriber")?;

        let db = Arc::new(
            DatabaseManager::new(&config.database)
                .await
                .context("failed to open database")?,
        );
        db.migrate().await.context("failed to migrate database")?;
        let core = HotelCore::new(db, config.clone());

        match self.command.unwrap_or(Command::Serve) {
            Command::Serve => {
                info!(hotel = %config.hotel.name, "hotel reservation server starting up");
                WebServer::new(config.clone(), core)
                    .start()
                    .await
                    .context("web server failed")?;
                info!("hotel reservation server shutting down");
            }
            Command::Migrate => info!("database migrated"),
            Command::CreateUser {
                username,
                display_name,
                email,
                role,
            } => {
                let issued = core
                    .create_user(
                        &Principal::bootstrap(),
                        NewUserInput {
                            username,
                            display_name,
                            email,
                            role,
                        },
                    )
                    .await?;
                println!(
                    "created {} user {} (id {})",
                    issued.user.role, issued.user.username, issued.user.id
                );
                println!("api token: {}", issued.api_token);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::domain::Role;

    use super::{Cli, Command};

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["hrs", "--config", "hotel.yaml"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config.unwrap().to_string_lossy(), "hotel.yaml");
    }

    #[test]
    fn create_user_parses_the_role() {
        let cli = Cli::try_parse_from([
            "hrs",
            "create-user",
            "--username",
            "frontdesk",
            "--display-name",
            "Front Desk",
            "--email",
            "desk@example.com",
            "--role",
            "receptionist",
        ])
        .unwrap();
        match cli.command {
            Some(Command::CreateUser { role, username, .. }) => {
                assert_eq!(role, Role::Receptionist);
                assert_eq!(username, "frontdesk");
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["hrs", "create-user", "--role", "janitor"]).is_err());
    }
}
