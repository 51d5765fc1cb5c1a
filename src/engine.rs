//! Query execution engine
//!
//! Runs every query through the same pipeline: rate limiter, classifier,
//! then one of the execution paths. Meta-queries answer from the static
//! schema tables; lookups, scans, and token verification talk to the
//! backing store. Store failures degrade to empty results; the client never
//! sees an error packet.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::mysql::constants::ColumnType;
use crate::rate_limit::{Decision, RateLimiter};
use crate::schema::{Column, TableSchema, UserRecord};
use crate::sql::{classify, Classification};
use crate::store::{self, KvStore};
use crate::token;
use crate::SERVER_VERSION;

/// Keys fetched per SCAN step
const SCAN_BATCH: usize = 100;

/// Result of executing one query
#[derive(Debug)]
pub enum QueryOutcome {
    /// Result set: column metadata plus text-encoded rows
    Rows {
        /// Column definitions in projection order
        columns: Vec<Column>,
        /// Row values; `None` encodes SQL NULL
        rows: Vec<Vec<Option<String>>>,
    },
    /// Plain OK with no rows (no-ops, rejections, throttled requests)
    Ok,
}

/// Shared per-process executor
pub struct QueryEngine {
    store: Arc<dyn KvStore>,
    limiter: RateLimiter,
    schemas: HashMap<String, TableSchema>,
    scan_limit: usize,
    allow_scan: bool,
}

impl QueryEngine {
    /// Engine over `store`, tuned by `config`
    pub fn new(store: Arc<dyn KvStore>, config: &Config) -> Self {
        let limiter = RateLimiter::new(Arc::clone(&store), config.rate_limit, config.rate_window);
        let mut schemas = HashMap::new();
        let users = TableSchema::users();
        schemas.insert(users.name.clone(), users);
        Self {
            store,
            limiter,
            schemas,
            scan_limit: config.scan_limit,
            allow_scan: config.allow_scan,
        }
    }

    /// Table descriptor lookup, used by COM_FIELD_LIST
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.schemas.get(name)
    }

    /// Run one query through the limiter, classifier, and executor
    pub async fn execute(
        &self,
        sql: &str,
        client: SocketAddr,
        database: Option<&str>,
    ) -> QueryOutcome {
        // raw SQL only at debug: literals can carry tokens
        debug!(client = %client.ip(), sql = sql, "raw_query");
        let started = Instant::now();

        if self.limiter.check(client.ip()).await == Decision::Throttled {
            return QueryOutcome::Ok;
        }

        let tables: Vec<&TableSchema> = self.schemas.values().collect();
        match classify(sql, &tables) {
            Classification::Version => {
                let columns = vec![Column::new("", "@@version", ColumnType::VarString)];
                let rows = vec![vec![Some(SERVER_VERSION.to_string())]];
                log_executed("version", None, started, 1, client);
                QueryOutcome::Rows { columns, rows }
            }

            Classification::ShowTables => {
                let name = format!("Tables_in_{}", database.unwrap_or("db"));
                let columns = vec![Column::new("", &name, ColumnType::VarString)];
                let mut names: Vec<&String> = self.schemas.keys().collect();
                names.sort();
                let rows: Vec<Vec<Option<String>>> =
                    names.into_iter().map(|n| vec![Some(n.clone())]).collect();
                log_executed("show_tables", None, started, rows.len(), client);
                QueryOutcome::Rows { columns, rows }
            }

            Classification::Describe { table } => {
                let Some(schema) = self.schemas.get(&table) else {
                    return QueryOutcome::Ok;
                };
                let columns = ["Field", "Type", "Null", "Key", "Default", "Extra"]
                    .iter()
                    .map(|n| Column::new("", n, ColumnType::VarString))
                    .collect();
                let rows = schema.describe_rows();
                log_executed("describe", Some(table.as_str()), started, rows.len(), client);
                QueryOutcome::Rows { columns, rows }
            }

            Classification::PkLookup { table, pk_value } => {
                let Some(schema) = self.schemas.get(&table) else {
                    return QueryOutcome::Ok;
                };
                let columns = schema.columns();
                let key = format!("{table}.{pk_value}");
                let mut rows = Vec::new();
                match self.store.get(&key).await {
                    Ok(Some(payload)) => match serde_json::from_str::<UserRecord>(&payload) {
                        Ok(record) => rows.push(record.into_row(&pk_value)),
                        Err(e) => {
                            warn!(key = %key, error = %e, "record payload could not be parsed")
                        }
                    },
                    Ok(None) => {}
                    Err(e) => store::log_error("get", &e),
                }
                log_executed("pk_lookup", Some(table.as_str()), started, rows.len(), client);
                QueryOutcome::Rows { columns, rows }
            }

            Classification::FullScan { table } => {
                if !self.allow_scan {
                    warn!(client = %client.ip(), reason = "scan_disabled", "query_rejected");
                    return QueryOutcome::Ok;
                }
                let Some(schema) = self.schemas.get(&table) else {
                    return QueryOutcome::Ok;
                };
                let columns = schema.columns();
                if self.scan_limit == 0 {
                    log_executed("scan", Some(table.as_str()), started, 0, client);
                    return QueryOutcome::Rows {
                        columns,
                        rows: Vec::new(),
                    };
                }
                let rows = self.scan_table(&table, client).await;
                log_executed("scan", Some(table.as_str()), started, rows.len(), client);
                QueryOutcome::Rows { columns, rows }
            }

            Classification::TokenVerify { token } => {
                let columns = token::columns();
                let mut rows = Vec::new();
                if let Some(v) = token::verify(self.store.as_ref(), &token).await {
                    rows.push(vec![
                        Some("1".to_string()),
                        Some(v.user_id),
                        Some(v.facility),
                        Some(v.verified_at),
                        Some(v.data),
                    ]);
                }
                log_executed("qr_verify", None, started, rows.len(), client);
                QueryOutcome::Rows { columns, rows }
            }

            Classification::Noop => {
                log_executed("noop", None, started, 0, client);
                QueryOutcome::Ok
            }

            Classification::Rejected { reason } => {
                warn!(client = %client.ip(), reason = reason, "query_rejected");
                QueryOutcome::Ok
            }
        }
    }

    /// Collect up to `scan_limit` rows from the table's keyspace
    async fn scan_table(&self, table: &str, client: SocketAddr) -> Vec<Vec<Option<String>>> {
        warn!(
            table = table,
            limit = self.scan_limit,
            client = %client.ip(),
            "scan_operation_triggered"
        );

        let pattern = format!("{table}.*");
        let mut cursor = 0u64;
        let mut keys = Vec::new();
        loop {
            match self.store.scan(&pattern, cursor, SCAN_BATCH).await {
                Ok((next, batch)) => {
                    keys.extend(batch);
                    if keys.len() >= self.scan_limit {
                        keys.truncate(self.scan_limit);
                        break;
                    }
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }
                Err(e) => {
                    store::log_error("scan", &e);
                    return Vec::new();
                }
            }
        }

        let prefix = format!("{table}.");
        let mut rows = Vec::new();
        for key in keys {
            let pk = key.strip_prefix(&prefix).unwrap_or(&key);
            match self.store.get(&key).await {
                Ok(Some(payload)) => match serde_json::from_str::<UserRecord>(&payload) {
                    Ok(record) => rows.push(record.into_row(pk)),
                    Err(e) => warn!(key = %key, error = %e, "skipping unparseable record"),
                },
                Ok(None) => {}
                Err(e) => store::log_error("get", &e),
            }
        }
        rows
    }
}

fn log_executed(
    query_type: &str,
    table: Option<&str>,
    started: Instant,
    rows: usize,
    client: SocketAddr,
) {
    info!(
        query_type = query_type,
        table = table.unwrap_or("-"),
        duration_ms = started.elapsed().as_millis() as u64,
        rows = rows,
        client = %client.ip(),
        result = "success",
        "query_executed"
    );
}
