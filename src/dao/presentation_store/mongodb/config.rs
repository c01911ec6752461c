use std::time::Duration;

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DATABASE: &str = "presentation_timer";
const DEFAULT_PING_ATTEMPTS: u32 = 3;
const DEFAULT_PING_BACKOFF: Duration = Duration::from_millis(250);

/// Connection settings resolved from the `MONGO_URI` / `MONGO_DB` pair.
#[derive(Clone)]
pub struct MongoConfig {
    /// Parsed driver options.
    pub options: ClientOptions,
    /// Database holding the presentation collections.
    pub database_name: String,
    /// Pings tried per connect before giving up.
    pub ping_attempts: u32,
    /// Pause after the first failed ping; doubles after each further failure.
    pub ping_backoff: Duration,
}

impl MongoConfig {
    /// Parse `uri`, targeting `db_name` or `presentation_timer` when unset.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;

        Ok(Self {
            options,
            database_name: db_name.unwrap_or(DEFAULT_DATABASE).to_owned(),
            ping_attempts: DEFAULT_PING_ATTEMPTS,
            ping_backoff: DEFAULT_PING_BACKOFF,
        })
    }
}
