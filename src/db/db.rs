// db/db.rs
use redis::aio::ConnectionManager;
use sqlx::{Pool, Postgres};
use std::sync::Arc;

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
    pub redis_client: Option<Arc<ConnectionManager>>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .field("redis_client", &self.redis_client.is_some())
            .finish()
    }
}

impl DBClient {
    /// Create a new DBClient with PostgreSQL pool only
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient {
            pool,
            redis_client: None,
        }
    }

    /// Create a new DBClient with both PostgreSQL and Redis. A Redis failure
    /// is logged and the client falls back to Postgres only.
    pub async fn with_redis(pool: Pool<Postgres>, redis_url: &str) -> Self {
        match redis::Client::open(redis_url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(conn) => {
                    tracing::info!("Redis connection established");
                    DBClient {
                        pool,
                        redis_client: Some(Arc::new(conn)),
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to Redis: {}. Sign-out blacklist disabled.", e);
                    DBClient::new(pool)
                }
            },
            Err(e) => {
                tracing::warn!("Failed to create Redis client: {}. Sign-out blacklist disabled.", e);
                DBClient::new(pool)
            }
        }
    }

    /// Marks a token as revoked until it would have expired anyway.
    pub async fn blacklist_token(&self, key: &str, ttl_seconds: u64) -> Result<(), redis::RedisError> {
        if let Some(redis) = &self.redis_client {
            let mut conn = ConnectionManager::clone(redis);
            let _: () = redis::cmd("SET")
                .arg(key)
                .arg(1)
                .arg("EX")
                .arg(ttl_seconds.max(1))
                .query_async(&mut conn)
                .await?;
        }
        Ok(())
    }

    pub async fn is_token_blacklisted(&self, key: &str) -> bool {
        let Some(redis) = &self.redis_client else {
            return false;
        };
        let mut conn = ConnectionManager::clone(redis);
        redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .unwrap_or(false)
    }
}
