//! mini-mysql-redis server binary
//!
//! Usage:
//!   mini-mysql-redis [OPTIONS]
//!
//! Startup order: parse the CLI, initialise logging, probe the backing
//! store with a PING (exit 1 when unreachable), then serve the MySQL front
//! end until Ctrl-C.

use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_mysql_redis::config::Config;
use mini_mysql_redis::engine::QueryEngine;
use mini_mysql_redis::mysql::MysqlServer;
use mini_mysql_redis::store::{KvStore, RedisStore};
use mini_mysql_redis::SERVER_VERSION;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("🚀 mini-mysql-redis starting (server version {})", SERVER_VERSION);

    let pool_size = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let store = match RedisStore::connect(&config.redis_url, pool_size).await {
        Ok(store) => store,
        Err(e) => {
            error!("failed to connect to {}: {}", config.redis_url, e);
            process::exit(1);
        }
    };
    if let Err(e) = store.ping().await {
        error!("backing store probe failed: {}", e);
        process::exit(1);
    }
    info!("backing store reachable at {}", config.redis_url);

    let engine = Arc::new(QueryEngine::new(Arc::new(store), &config));
    let server = MysqlServer::new(format!("0.0.0.0:{}", config.port), engine);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("server error: {}", e);
                process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("👋 shutting down");
        }
    }
}
