//! MySQL front-end TCP server

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use super::protocol::MysqlConnection;
use crate::engine::QueryEngine;
use crate::error::AdapterResult;

/// Accept loop for the MySQL front end
pub struct MysqlServer {
    bind_addr: String,
    engine: Arc<QueryEngine>,
}

impl MysqlServer {
    /// Server bound to `bind_addr`, executing against `engine`
    pub fn new(bind_addr: impl Into<String>, engine: Arc<QueryEngine>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            engine,
        }
    }

    /// Bind and serve; binding failure is a startup error
    pub async fn run(&self) -> AdapterResult<()> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!("MySQL front end listening on {}", self.bind_addr);

        loop {
            match listener.accept().await {
                Ok((socket, addr)) => {
                    debug!("new connection from {}", addr);
                    let engine = Arc::clone(&self.engine);
                    tokio::spawn(async move {
                        let connection = MysqlConnection::new(engine, addr);
                        if let Err(e) = connection.run(socket).await {
                            warn!(client = %addr.ip(), error = %e, "connection dropped");
                        }
                    });
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
    }
}
