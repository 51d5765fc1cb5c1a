//! Redis implementation of the store trait

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::time::timeout;

use super::KvStore;
use crate::error::{AdapterError, AdapterResult};

/// Per-operation deadline; a slow store degrades to an empty result rather
/// than stalling the connection
const OP_DEADLINE: Duration = Duration::from_secs(2);

/// Redis-backed store over a small pool of auto-reconnecting connections
pub struct RedisStore {
    connections: Vec<ConnectionManager>,
    next: AtomicUsize,
    deadline: Duration,
}

impl RedisStore {
    /// Open `pool_size` managed connections to `url`
    pub async fn connect(url: &str, pool_size: usize) -> AdapterResult<Self> {
        let client = redis::Client::open(url)?;
        let mut connections = Vec::with_capacity(pool_size.max(1));
        for _ in 0..pool_size.max(1) {
            connections.push(ConnectionManager::new(client.clone()).await?);
        }
        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
            deadline: OP_DEADLINE,
        })
    }

    fn connection(&self) -> ConnectionManager {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[index].clone()
    }

    async fn query<T: redis::FromRedisValue>(
        &self,
        operation: &'static str,
        cmd: redis::Cmd,
    ) -> AdapterResult<T> {
        let mut conn = self.connection();
        match timeout(self.deadline, cmd.query_async::<T>(&mut conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AdapterError::Store(format!("{operation}: {e}"))),
            Err(_) => Err(AdapterError::StoreTimeout(operation.to_string())),
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> AdapterResult<Option<String>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query("get", cmd).await
    }

    async fn get_del(&self, key: &str) -> AdapterResult<Option<String>> {
        let mut cmd = redis::cmd("GETDEL");
        cmd.arg(key);
        self.query("getdel", cmd).await
    }

    async fn scan(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> AdapterResult<(u64, Vec<String>)> {
        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor).arg("MATCH").arg(pattern).arg("COUNT").arg(count);
        self.query("scan", cmd).await
    }

    async fn incr(&self, key: &str) -> AdapterResult<i64> {
        let mut cmd = redis::cmd("INCR");
        cmd.arg(key);
        self.query("incr", cmd).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> AdapterResult<()> {
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(key).arg(seconds);
        self.query::<i64>("expire", cmd).await?;
        Ok(())
    }

    async fn ping(&self) -> AdapterResult<()> {
        let reply: String = self.query("ping", redis::cmd("PING")).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(AdapterError::Store(format!(
                "unexpected PING reply: {reply}"
            )))
        }
    }
}
