use std::{error::Error, future::Future, time::Duration};

use thiserror::Error;
use tokio::time::timeout;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("storage call `{operation}` exceeded {limit:?}")]
    TimedOut {
        operation: &'static str,
        limit: Duration,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Run a storage call, failing with [`StorageError::TimedOut`] once `limit` elapses.
pub async fn bounded<T, Fut>(limit: Duration, operation: &'static str, call: Fut) -> StorageResult<T>
where
    Fut: Future<Output = StorageResult<T>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::TimedOut { operation, limit }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn bounded_reports_timeouts() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, StorageError>(())
        };

        let err = bounded(Duration::from_secs(5), "slow_call", slow)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::TimedOut {
                operation: "slow_call",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn bounded_passes_results_through() {
        let value = bounded(Duration::from_secs(1), "fast_call", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
