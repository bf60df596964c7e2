use anyhow::Context as _;
use clap::Parser as _;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info, warn};

mod config;
mod db;
mod modules;
mod services;

use modules::ActionKind;
use services::kv::{DbKeyValueStore, KeyValueStore, MemoryKeyValueStore};
use services::platform::ModerationPlatform;

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Rollback the specified number of migrations and run all migrations again.
    #[arg(long, num_args = 0..=1, default_missing_value = "1")]
    refresh_migrations: Option<u32>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Remove a post or comment and add a strike to its author
    Strike {
        /// Fullname of the post (t3_...) or comment (t1_...)
        target: String,
        /// Reason for strike
        #[arg(long)]
        reason: Option<String>,
    },
    /// Show how many strikes the author has
    Check { target: String },
    /// Remove a strike from the author
    RemoveStrike { target: String },
    /// Reset the author's strike count to zero
    ClearStrikes { target: String },
    /// Re-approve a removed post or comment and notify the author
    UndoRemoval {
        target: String,
        /// Reason for undoing removal
        #[arg(long)]
        reason: Option<String>,
    },
    /// List the available moderator actions
    Actions,
}

impl Command {
    fn action(&self) -> Option<(ActionKind, &str, Option<&str>)> {
        match self {
            Command::Strike { target, reason } => {
                Some((ActionKind::RemoveAndStrike, target, reason.as_deref()))
            }
            Command::Check { target } => Some((ActionKind::CheckStrikes, target, None)),
            Command::RemoveStrike { target } => Some((ActionKind::RemoveStrike, target, None)),
            Command::ClearStrikes { target } => Some((ActionKind::ClearStrikes, target, None)),
            Command::UndoRemoval { target, reason } => {
                Some((ActionKind::UndoRemoval, target, reason.as_deref()))
            }
            Command::Actions => None,
        }
    }
}

// Shared services handed to every action
pub struct Data {
    pub platform: Arc<dyn ModerationPlatform>,
    pub strikes: Arc<services::strikes::StrikeLedger>,
    pub reversal: Arc<services::reversal::ModerationReversal>,
    pub action_definitions: Vec<modules::ActionDefinition>,
}

pub type Error = anyhow::Error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Args::parse();

    tracing_subscriber::fmt::init();

    let Some(command) = args.command else {
        if args.refresh_migrations.is_none() {
            anyhow::bail!("No command given, see --help");
        }
        return refresh_migrations(args.refresh_migrations).await;
    };

    if let Command::Actions = command {
        for module in modules::get_modules() {
            for action in module.actions {
                println!(
                    "[{}] {} ({}): {}",
                    module.id, action.name, action.context, action.description
                );
            }
        }
        return Ok(());
    }

    let config = config::AppConfig::from_env()?;

    let store: Arc<dyn KeyValueStore> = match &config.database_url {
        Some(url) => {
            let db = db::establish_connection(url)
                .await
                .context("Failed to connect to database")?;
            run_migrations(&db, args.refresh_migrations).await?;
            Arc::new(DbKeyValueStore::new(db))
        }
        None => {
            warn!("DATABASE_URL is not set, strike counts will not outlive this process");
            Arc::new(MemoryKeyValueStore::new())
        }
    };

    let platform: Arc<dyn ModerationPlatform> = Arc::new(
        services::reddit::RedditClient::new(config.reddit.clone())
            .context("Failed to create Reddit client")?,
    );

    let data = Data {
        platform: platform.clone(),
        strikes: Arc::new(services::strikes::StrikeLedger::new(
            platform.clone(),
            store,
        )),
        reversal: Arc::new(services::reversal::ModerationReversal::new(platform.clone())),
        action_definitions: modules::definitions(),
    };

    let Some((kind, target, reason)) = command.action() else {
        return Ok(());
    };

    let content = platform
        .fetch_content(target)
        .await
        .with_context(|| format!("Failed to look up {target}"))?
        .with_context(|| format!("{target} is not a post or comment"))?;

    let outcome = modules::dispatch(&data, kind, &content, reason).await?;

    if outcome.success {
        info!("{:?} on {} succeeded", kind, target);
        println!("{}", outcome.message);
        Ok(())
    } else {
        error!("{:?} on {} failed: {}", kind, target, outcome.message);
        eprintln!("{}", outcome.message);
        std::process::exit(1);
    }
}

async fn refresh_migrations(depth: Option<u32>) -> anyhow::Result<()> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = db::establish_connection(&database_url)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&db, depth).await
}

async fn run_migrations(
    db: &sea_orm::DatabaseConnection,
    refresh_depth: Option<u32>,
) -> anyhow::Result<()> {
    use sea_orm_migration::MigratorTrait;
    if let Some(depth) = refresh_depth {
        info!("Refreshing migrations (down {}, then up)...", depth);
        db::migrations::Migrator::down(db, Some(depth))
            .await
            .context("Failed to rollback migration")?;
    }

    db::migrations::Migrator::up(db, None)
        .await
        .context("Failed to run migrations")?;

    if refresh_depth.is_some() {
        info!("Migrations refreshed successfully.");
    }

    Ok(())
}
