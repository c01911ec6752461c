use std::time::Duration;

use mongodb::{Client, Database, bson::doc};
use tokio::time::sleep;
use tracing::debug;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

/// Client and database handle for one successful connect.
///
/// A connect only rides out a server that is briefly unreachable; longer outages are left to
/// the storage supervisor, which calls connect again with its own back-off.
#[derive(Clone)]
pub struct MongoConnection {
    database: Database,
}

impl MongoConnection {
    /// Build a client for `config` and wait until its database answers a ping.
    pub async fn open(config: &MongoConfig) -> MongoResult<Self> {
        let client = Client::with_options(config.options.clone())
            .map_err(|source| MongoDaoError::ClientConstruction { source })?;
        let connection = Self {
            database: client.database(&config.database_name),
        };

        let mut delays = ping_delays(config.ping_backoff, config.ping_attempts);
        let mut attempts = 0;
        loop {
            attempts += 1;
            let Err(source) = connection.run_ping().await else {
                debug!(
                    database = %config.database_name,
                    attempts,
                    "MongoDB connection established"
                );
                return Ok(connection);
            };

            let Some(delay) = delays.next() else {
                return Err(MongoDaoError::InitialPing { attempts, source });
            };
            debug!(attempts, delay_ms = delay.as_millis() as u64, error = %source, "MongoDB ping failed; retrying");
            sleep(delay).await;
        }
    }

    /// Database handle shared by every collection accessor.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Health ping against an already established connection.
    pub async fn ping(&self) -> MongoResult<()> {
        self.run_ping()
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })
    }

    async fn run_ping(&self) -> Result<(), mongodb::error::Error> {
        self.database.run_command(doc! { "ping": 1 }).await.map(|_| ())
    }
}

/// Pauses between ping attempts: doubling from `first`, one fewer than `attempts`.
fn ping_delays(first: Duration, attempts: u32) -> impl Iterator<Item = Duration> {
    std::iter::successors(Some(first), |delay| Some(*delay * 2))
        .take(attempts.saturating_sub(1) as usize)
}
