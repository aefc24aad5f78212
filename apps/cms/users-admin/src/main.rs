//! Users Admin
//!
//! Operator CLI for CMS accounts: applies the schema, bootstraps the root
//! user and runs the account workflows against the configured database.
//! Results are printed as JSON.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::postgres::{check_health, connect_from_config_with_retry, run_migrations};
use domain_users::{Argon2PasswordEncoder, DbGroupService, RegisterUser, UserService};
use eyre::Result;
use migration::Migrator;
use serde_json::json;
use tracing::info;
use validator::Validate;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "users-admin")]
#[command(about = "Manage CMS user accounts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,

    /// Create the root user unless one exists
    InitRoot {
        #[arg(long, env = "ROOT_USERNAME", default_value = "root")]
        username: String,

        #[arg(long, env = "ROOT_PASSWORD")]
        password: String,
    },

    /// Register a new user
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        /// Defaults to --password
        #[arg(long)]
        confirm_password: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Groups to join. Defaults to the guest group.
        #[arg(long = "group-id", value_delimiter = ',')]
        group_ids: Vec<i32>,
    },

    /// List users, root excluded
    List {
        /// 0 lists every group
        #[arg(long, default_value_t = 0)]
        group_id: i32,

        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u64,

        #[arg(long, default_value_t = 20)]
        count: u64,
    },

    /// Look up a single user
    Show {
        #[arg(long, conflicts_with_all = ["username", "email"])]
        id: Option<i32>,

        #[arg(long, conflicts_with = "email")]
        username: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },

    /// Report whether a user belongs to the root group
    IsAdmin {
        #[arg(long)]
        id: i32,
    },

    /// Replace a user's password
    Passwd {
        #[arg(long)]
        id: i32,

        #[arg(long)]
        password: String,
    },

    /// Soft-delete a user
    Delete {
        #[arg(long)]
        id: i32,
    },

    /// Check a username/password pair
    Verify {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!("Connecting to database...");
    let db = connect_from_config_with_retry(config.database.clone(), None).await?;
    check_health(&db).await?;

    let encoder = Argon2PasswordEncoder::from_config(&config.password)?;
    let service = UserService::new(db.clone(), DbGroupService::new(db.clone()), encoder);

    let output = match cli.command {
        Commands::Migrate => {
            run_migrations::<Migrator>(&db, "users-admin").await?;
            json!({ "migrated": true })
        }

        Commands::InitRoot { username, password } => {
            let id = service.ensure_root_user(&username, &password).await?;
            json!({ "root_user_id": id })
        }

        Commands::Register {
            username,
            password,
            confirm_password,
            email,
            group_ids,
        } => {
            let input = RegisterUser {
                username,
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                password,
                email,
                group_ids,
            };
            input.validate()?;

            let user = service.create_user(input).await?;
            serde_json::to_value(user)?
        }

        Commands::List {
            group_id,
            page,
            count,
        } => {
            let page = service
                .get_user_page_by_group_id(group_id, page, count)
                .await?;
            serde_json::to_value(page)?
        }

        Commands::Show {
            id,
            username,
            email,
        } => {
            let user = match (id, username, email) {
                (Some(id), _, _) => service.get_user_by_id(id).await?,
                (None, Some(username), _) => service.get_user_by_username(&username).await?,
                (None, None, Some(email)) => service.get_user_by_email(&email).await?,
                (None, None, None) => eyre::bail!("one of --id, --username or --email is required"),
            };
            serde_json::to_value(user)?
        }

        Commands::IsAdmin { id } => {
            let admin = service.is_admin(id).await?;
            json!({ "id": id, "admin": admin })
        }

        Commands::Passwd { id, password } => {
            service.change_user_password(id, &password).await?;
            json!({ "id": id, "password_changed": true })
        }

        Commands::Delete { id } => {
            service.delete_user(id).await?;
            json!({ "id": id, "deleted": true })
        }

        Commands::Verify { username, password } => {
            let user = service.verify_user(&username, &password).await?;
            serde_json::to_value(user)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
