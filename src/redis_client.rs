use redis::aio::ConnectionManager;
use redis::{Client, RedisResult};

#[derive(Clone)]
pub struct RedisClient {
    client: Client,
    manager: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(url: &str) -> RedisResult<Self> {
        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client.clone()).await?;
        Ok(Self { client, manager })
    }

    pub fn manager(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// Pub/sub requires a dedicated connection, not the multiplexed manager.
    pub async fn pubsub(&self) -> RedisResult<redis::aio::PubSub> {
        #[allow(deprecated)]
        let conn = self.client.get_async_connection().await?;
        Ok(conn.into_pubsub())
    }
}
