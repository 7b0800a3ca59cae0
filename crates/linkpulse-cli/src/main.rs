mod clicks;
mod enrich;

use clap::{Parser, Subcommand};
use linkpulse_core::AppConfig;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use crate::clicks::ClicksCommands;
use crate::enrich::EnrichCommands;

#[derive(Debug, Parser)]
#[command(name = "linkpulse-cli")]
#[command(about = "linkpulse click pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run the enrichment pipeline outside the trigger
    Enrich {
        #[command(subcommand)]
        command: EnrichCommands,
    },
    /// Inspect stored click rows
    Clicks {
        #[command(subcommand)]
        command: ClicksCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

impl Commands {
    /// Whether the command can run without ever reaching the database.
    fn is_offline(&self) -> bool {
        matches!(
            self,
            Commands::Enrich {
                command: EnrichCommands::Replay { dry_run: true, .. }
            }
        )
    }
}

/// Connect eagerly for commands that query, lazily for those that never do.
async fn open_pool(command: &Commands, config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool_config = linkpulse_db::PoolConfig::from_app_config(config);
    let pool = if command.is_offline() {
        linkpulse_db::connect_pool_lazy(&config.database_url, pool_config)?
    } else {
        linkpulse_db::connect_pool(&config.database_url, pool_config).await?
    };
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("linkpulse-cli: no command given; see --help");
        return Ok(());
    };

    let config = linkpulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool = open_pool(&command, &config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                linkpulse_db::ping(&pool).await?;
                println!("database ok");
            }
            DbCommands::Migrate => {
                let applied = linkpulse_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
        },
        Commands::Enrich { command } => match command {
            EnrichCommands::Replay {
                file,
                dry_run,
                concurrency,
            } => {
                enrich::run_replay(&pool, &config, &file, dry_run, concurrency).await?;
            }
        },
        Commands::Clicks { command } => match command {
            ClicksCommands::Show { firestore_id } => {
                clicks::run_show(&pool, &firestore_id).await?;
            }
        },
    }

    Ok(())
}
