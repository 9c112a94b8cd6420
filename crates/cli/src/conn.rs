use crate::error::CliError;
use async_trait::async_trait;
use connectors::postgres::PgMirrorStore;
use tracing::{error, info};

/// Trait for "pinging" a backing service
#[async_trait]
pub trait ConnectionPinger {
    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

/// Postgres pinger
pub struct PostgresConnectionPinger {
    pub conn_str: String,
}

#[async_trait]
impl ConnectionPinger for PostgresConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!("Pinging PostgreSQL");

        let store = PgMirrorStore::connect(&self.conn_str).await.map_err(|e| {
            error!("PostgreSQL connection failed: {e}");
            print_connection_guidance();
            CliError::Store(e)
        })?;

        store.ping().await.map_err(|e| {
            error!("PostgreSQL ping query failed: {e}");
            CliError::Store(e)
        })?;

        info!("PostgreSQL connection OK");
        Ok(())
    }
}

fn print_connection_guidance() {
    eprintln!("Please verify:");
    eprintln!("  1. PostgreSQL is running");
    eprintln!("  2. Database credentials in .env are correct");
    eprintln!("  3. The configured database exists");
}
