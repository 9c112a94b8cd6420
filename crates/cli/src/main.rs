use crate::{
    conn::{ConnectionPinger, PostgresConnectionPinger},
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use commands::Commands;
use connectors::{archive::FsPageArchive, nvd::NvdClient, postgres::PgMirrorStore};
use mirror_config::{env::EnvManager, settings::MirrorConfig};
use mirror_core::{
    archive::PageArchive, rate::RateBudget, retry::RetryPolicy, source::ResilientSource,
    store::MirrorStore,
};
use mirror_runtime::orchestrator::{SyncOptions, SyncOrchestrator};
use model::{entity::EntityKind, report::RunOutcome, sync::SyncMode};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(name = "nvd-mirror", version = "0.1.0", about = "NVD catalog mirror")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Initialize logger; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code.into(),
        Err(err) => {
            error!("{err}");
            ExitCode::GeneralError.into()
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    match cli.command {
        Commands::Sync {
            full,
            entity,
            env_file,
        } => sync(full, entity, env_file).await,
        Commands::Inspect { json, env_file } => {
            inspect(json, env_file).await?;
            Ok(ExitCode::Success)
        }
        Commands::Sweep { env_file } => {
            let config = load_config(env_file)?;
            let archive = FsPageArchive::new(config.archive_dir(), config.retention());
            let deleted = archive.sweep().await?;
            println!("Deleted {deleted} archived pages");
            Ok(ExitCode::Success)
        }
        Commands::TestConn { env_file } => {
            let config = load_config(env_file)?;
            PostgresConnectionPinger {
                conn_str: config.db.connection_string(),
            }
            .ping()
            .await?;
            println!("Connection OK");
            Ok(ExitCode::Success)
        }
    }
}

fn load_config(env_file: Option<String>) -> Result<MirrorConfig, CliError> {
    let mut env = EnvManager::new();
    if let Some(path) = env_file {
        env.load_from_file(path)?;
    }
    Ok(MirrorConfig::from_env(&env)?)
}

async fn sync(
    full: bool,
    entity: Option<String>,
    env_file: Option<String>,
) -> Result<ExitCode, CliError> {
    let config = load_config(env_file)?;

    let mode = if full {
        SyncMode::Full
    } else {
        SyncMode::Incremental
    };
    let entities = match entity {
        Some(raw) => vec![
            raw.parse::<EntityKind>()
                .map_err(|_| CliError::InvalidEntity(raw.clone()))?,
        ],
        None => EntityKind::ALL.to_vec(),
    };

    let store = Arc::new(PgMirrorStore::connect(&config.db.connection_string()).await?);
    store.ensure_schema().await?;

    let archive = Arc::new(FsPageArchive::new(config.archive_dir(), config.retention()));
    let budget = Arc::new(match config.api_key {
        Some(_) => RateBudget::keyed(),
        None => RateBudget::keyless(),
    });
    let client = NvdClient::new(config.api_base_url.clone(), config.api_key.clone())?;
    let source = ResilientSource::new(client, budget, RetryPolicy::for_api());

    let cancel = CancellationToken::new();
    let shutdown = ShutdownCoordinator::install(cancel.clone());

    let opts = SyncOptions {
        mode,
        entities,
        results_per_page: config.results_per_page,
        safety_delay: config.safety_delay(),
    };
    let orchestrator = SyncOrchestrator::new(source, store, archive, opts, cancel);
    let report = orchestrator.run().await;

    output::print_run_report(&report);

    let code = if shutdown.is_shutdown_requested() || report.outcome == RunOutcome::Interrupted {
        ExitCode::ShutdownRequested
    } else {
        match report.outcome {
            RunOutcome::Success => ExitCode::Success,
            _ => ExitCode::PartialFailure,
        }
    };
    Ok(code)
}

async fn inspect(as_json: bool, env_file: Option<String>) -> Result<(), CliError> {
    let config = load_config(env_file)?;
    let store = PgMirrorStore::connect(&config.db.connection_string()).await?;

    let mut stats = Vec::new();
    for entity in EntityKind::ALL {
        stats.push(store.stats(entity).await?);
    }
    let db_size = store.database_size().await?;

    if as_json {
        output::print_inspection_json(&stats, db_size.as_deref())?;
    } else {
        output::print_inspection_table(&stats, db_size.as_deref());
    }
    Ok(())
}
