use chrono::NaiveDate;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Daily weather for a city
    Weather { city: String, date: NaiveDate },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Weather { city, date } => {
                write!(f, "weather:{}:{}", city.to_lowercase(), date)
            }
        }
    }
}

/// Creates a Redis client for caching collaborator responses
///
/// Only the URL is parsed here; use [`Cache::ping`] to check the server is up.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Short-lived store for collaborator responses, backed by Redis
///
/// Reads go straight to Redis. Writes are queued to a background task so a
/// slow or missing server never delays a recommendation.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the background writer started by [`Cache::new`]
pub struct CacheWriterHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer and waits until it has attempted every queued write
    ///
    /// Writes queued after the signal are dropped, even if `Cache` clones are
    /// still alive.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task failed");
        }
    }
}

/// Owns the writer's Redis connection, reconnecting after a failed write
struct Writer {
    client: Client,
    conn: Option<MultiplexedConnection>,
}

impl Writer {
    async fn write(&mut self, pending: PendingWrite) -> AppResult<()> {
        let existing = self.conn.clone();
        let mut conn = match existing {
            Some(conn) => conn,
            None => {
                let conn = self.client.get_multiplexed_async_connection().await?;
                self.conn = Some(conn.clone());
                conn
            }
        };

        let result: redis::RedisResult<()> =
            conn.set_ex(&pending.key, &pending.value, pending.ttl).await;
        if result.is_err() {
            self.conn = None;
        }
        Ok(result?)
    }

    async fn write_logged(&mut self, pending: PendingWrite) -> bool {
        let key = pending.key.clone();
        match self.write(pending).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache write failed");
                false
            }
        }
    }

    /// Runs until shutdown is signalled or every `Cache` clone is dropped
    async fn run(
        mut self,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                pending = write_rx.recv() => match pending {
                    Some(pending) => {
                        self.write_logged(pending).await;
                    }
                    None => break,
                },
                Ok(()) = &mut shutdown_rx => {
                    let mut written = 0;
                    let mut failed = 0;
                    while let Ok(pending) = write_rx.try_recv() {
                        if self.write_logged(pending).await {
                            written += 1;
                        } else {
                            failed += 1;
                        }
                    }
                    tracing::debug!(written, failed, "Flushed queued cache writes");
                    break;
                }
            }
        }
        tracing::debug!("Cache writer stopped");
    }
}

impl Cache {
    /// Creates the cache and spawns its background writer
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let writer = Writer {
            client: redis_client.clone(),
            conn: None,
        };
        let task = tokio::spawn(writer.run(write_rx, shutdown_rx));

        (
            Self {
                redis_client,
                write_tx,
            },
            CacheWriterHandle { shutdown_tx, task },
        )
    }

    /// Round-trips a `PING` to confirm the server is reachable
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Looks up `key`; `Ok(None)` on a miss
    pub async fn get_from_cache<T: DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache entry {} is not valid JSON: {}", key, e))
                })
            })
            .transpose()
    }

    /// Queues `value` for writing under `key` with a TTL in seconds
    pub fn set_in_background<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let value = match serde_json::to_string(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Could not serialize cache value");
                return;
            }
        };

        let pending = PendingWrite {
            key: key.to_string(),
            value,
            ttl,
        };
        if self.write_tx.send(pending).is_err() {
            tracing::debug!(key = %key, "Cache writer stopped, dropping write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 15).unwrap()
    }

    fn weather_key(city: &str) -> CacheKey {
        CacheKey::Weather {
            city: city.to_string(),
            date: date(),
        }
    }

    #[test]
    fn test_cache_key_display_weather() {
        assert_eq!(format!("{}", weather_key("Tokyo,JP")), "weather:tokyo,jp:2024-10-15");
    }

    #[test]
    fn test_cache_key_display_weather_lowercase() {
        assert_eq!(weather_key("OSAKA"), weather_key("OSAKA"));
        assert_eq!(format!("{}", weather_key("OSAKA")), "weather:osaka:2024-10-15");
    }

    fn unreachable_cache_client() -> Client {
        create_redis_client("redis://127.0.0.1:1").unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_errors() {
        let (cache, handle) = Cache::new(unreachable_cache_client()).await;

        assert!(matches!(cache.ping().await, Err(AppError::Cache(_))));
        let read: AppResult<Option<String>> = cache.get_from_cache(&weather_key("tokyo")).await;
        assert!(matches!(read, Err(AppError::Cache(_))));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_returns_while_cache_clones_alive() {
        let (cache, handle) = Cache::new(unreachable_cache_client()).await;
        let clone = cache.clone();

        cache.set_in_background(&weather_key("kyoto"), &vec!["a".to_string()], 60);
        clone.set_in_background(&weather_key("nara"), &vec!["b".to_string()], 60);

        let stopped = tokio::time::timeout(std::time::Duration::from_secs(5), handle.shutdown()).await;
        assert!(stopped.is_ok());

        // Writer is gone; further writes are dropped without panicking
        clone.set_in_background(&weather_key("kobe"), &vec!["c".to_string()], 60);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_cache_miss() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let (cache, _handle) = Cache::new(client).await;

        let key = weather_key("nonexistent_city_12345");
        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();

        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_set_in_background_writes_to_cache() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let (cache, _handle) = Cache::new(client.clone()).await;

        let key = weather_key("test_async_write");
        let value = vec!["item1".to_string(), "item2".to_string()];

        cache.set_in_background(&key, &value, 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(format!("{}", key)).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_cache_writer_graceful_shutdown() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let (cache, handle) = Cache::new(client.clone()).await;

        let key = weather_key("test_shutdown");
        let value = vec!["shutdown_test".to_string()];

        cache.set_in_background(&key, &value, 60);

        handle.shutdown().await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(format!("{}", key)).await.unwrap();
    }
}
