//! Per-connection protocol driver
//!
//! Runs the handshake, then loops over command frames, handing SQL to the
//! query engine and encoding its outcome back to the client. Protocol
//! faults never produce an error packet; the connection is simply dropped.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use super::messages::{
    decode_execute_params, encode_binary_row, encode_column, encode_field_list_column,
    encode_text_row, put_lenenc_int, Command, EofPacket, Handshake, HandshakeResponse, OkPacket,
    PrepareOk,
};
use super::packet::PacketCodec;
use crate::engine::{QueryEngine, QueryOutcome};
use crate::error::{AdapterError, AdapterResult};
use crate::mysql::constants::ColumnType;
use crate::schema::Column;

static NEXT_CONNECTION_ID: AtomicU32 = AtomicU32::new(1);

/// How result rows are encoded on the wire
#[derive(Debug, Clone, Copy)]
enum RowEncoding {
    Text,
    Binary,
}

struct PreparedStatement {
    sql: String,
    param_count: usize,
    param_types: Vec<(u8, u8)>,
}

/// Drives a single client connection
pub struct MysqlConnection {
    engine: Arc<QueryEngine>,
    peer: SocketAddr,
    database: Option<String>,
    statements: HashMap<u32, PreparedStatement>,
    next_statement_id: u32,
}

impl MysqlConnection {
    /// Connection bound to `peer`, executing against `engine`
    pub fn new(engine: Arc<QueryEngine>, peer: SocketAddr) -> Self {
        Self {
            engine,
            peer,
            database: None,
            statements: HashMap::new(),
            next_statement_id: 1,
        }
    }

    /// Serve the connection until the client quits or the stream closes
    pub async fn run<S>(mut self, stream: S) -> AdapterResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut framed = Framed::new(stream, PacketCodec::new());
        self.handshake(&mut framed).await?;

        loop {
            let Some(frame) = framed.next().await else {
                debug!(client = %self.peer.ip(), "client disconnected");
                break;
            };
            match Command::parse(frame?)? {
                Command::Quit => break,
                Command::Ping | Command::StmtReset { .. } | Command::Other(_) => {
                    self.write_ok(&mut framed).await?;
                }
                Command::InitDb(database) => {
                    self.database = Some(database);
                    self.write_ok(&mut framed).await?;
                }
                Command::Query(sql) => {
                    let outcome = self
                        .engine
                        .execute(&sql, self.peer, self.database.as_deref())
                        .await;
                    self.write_outcome(&mut framed, outcome, RowEncoding::Text)
                        .await?;
                }
                Command::FieldList { table } => {
                    self.handle_field_list(&mut framed, &table).await?;
                }
                Command::StmtPrepare(sql) => {
                    self.handle_prepare(&mut framed, sql).await?;
                }
                Command::StmtExecute {
                    statement_id,
                    params,
                } => {
                    self.handle_execute(&mut framed, statement_id, params)
                        .await?;
                }
                Command::StmtClose { statement_id } => {
                    self.statements.remove(&statement_id);
                }
            }
        }

        Ok(())
    }

    async fn handshake<S>(&mut self, framed: &mut Framed<S, PacketCodec>) -> AdapterResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let greeting = Handshake::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        let mut buf = BytesMut::new();
        greeting.encode(&mut buf);
        framed.send(buf.freeze()).await?;

        let Some(frame) = framed.next().await else {
            return Err(AdapterError::Handshake(
                "client closed during handshake".into(),
            ));
        };
        let response = HandshakeResponse::parse(frame?)?;
        debug!(
            client = %self.peer.ip(),
            user = %response.username,
            database = ?response.database,
            "client connected"
        );
        self.database = response.database;

        // any credentials are accepted
        self.write_ok(framed).await
    }

    async fn write_ok<S>(&mut self, framed: &mut Framed<S, PacketCodec>) -> AdapterResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut buf = BytesMut::new();
        OkPacket::default().encode(&mut buf);
        framed.send(buf.freeze()).await
    }

    async fn write_outcome<S>(
        &mut self,
        framed: &mut Framed<S, PacketCodec>,
        outcome: QueryOutcome,
        encoding: RowEncoding,
    ) -> AdapterResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let QueryOutcome::Rows { columns, rows } = outcome else {
            return self.write_ok(framed).await;
        };

        let mut buf = BytesMut::new();
        put_lenenc_int(&mut buf, columns.len() as u64);
        framed.feed(buf.split().freeze()).await?;

        for column in &columns {
            encode_column(column, &mut buf);
            framed.feed(buf.split().freeze()).await?;
        }
        EofPacket.encode(&mut buf);
        framed.feed(buf.split().freeze()).await?;

        for row in &rows {
            match encoding {
                RowEncoding::Text => encode_text_row(row, &mut buf),
                RowEncoding::Binary => encode_binary_row(&columns, row, &mut buf),
            }
            framed.feed(buf.split().freeze()).await?;
        }
        EofPacket.encode(&mut buf);
        framed.feed(buf.split().freeze()).await?;

        framed.flush().await
    }

    async fn handle_field_list<S>(
        &mut self,
        framed: &mut Framed<S, PacketCodec>,
        table: &str,
    ) -> AdapterResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut buf = BytesMut::new();
        if let Some(schema) = self.engine.table(table) {
            for column in schema.columns() {
                encode_field_list_column(&column, &mut buf);
                framed.feed(buf.split().freeze()).await?;
            }
        }
        EofPacket.encode(&mut buf);
        framed.feed(buf.split().freeze()).await?;
        framed.flush().await
    }

    async fn handle_prepare<S>(
        &mut self,
        framed: &mut Framed<S, PacketCodec>,
        sql: String,
    ) -> AdapterResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let param_count = count_placeholders(&sql);
        let statement_id = self.next_statement_id;
        self.next_statement_id = self.next_statement_id.wrapping_add(1);

        self.statements.insert(
            statement_id,
            PreparedStatement {
                sql,
                param_count,
                param_types: Vec::new(),
            },
        );

        let mut buf = BytesMut::new();
        PrepareOk {
            statement_id,
            num_columns: 0,
            num_params: param_count as u16,
        }
        .encode(&mut buf);
        framed.feed(buf.split().freeze()).await?;

        if param_count > 0 {
            let placeholder = Column::new("", "?", ColumnType::VarString);
            for _ in 0..param_count {
                encode_column(&placeholder, &mut buf);
                framed.feed(buf.split().freeze()).await?;
            }
            EofPacket.encode(&mut buf);
            framed.feed(buf.split().freeze()).await?;
        }

        framed.flush().await
    }

    async fn handle_execute<S>(
        &mut self,
        framed: &mut Framed<S, PacketCodec>,
        statement_id: u32,
        params: bytes::Bytes,
    ) -> AdapterResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let substituted = match self.statements.get_mut(&statement_id) {
            None => {
                warn!(client = %self.peer.ip(), statement_id, "unknown statement executed");
                None
            }
            Some(statement) => {
                let mut payload = params;
                match decode_execute_params(
                    &mut payload,
                    statement.param_count,
                    &mut statement.param_types,
                ) {
                    Ok(literals) => Some(substitute_placeholders(&statement.sql, &literals)),
                    Err(e) => {
                        warn!(client = %self.peer.ip(), error = %e, "statement parameters could not be decoded");
                        None
                    }
                }
            }
        };

        match substituted {
            Some(sql) => {
                let outcome = self
                    .engine
                    .execute(&sql, self.peer, self.database.as_deref())
                    .await;
                self.write_outcome(framed, outcome, RowEncoding::Binary)
                    .await
            }
            None => self.write_ok(framed).await,
        }
    }
}

/// Count `?` placeholders outside string literals
fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in sql.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '?' => count += 1,
                _ => {}
            },
        }
    }
    count
}

/// Replace each `?` placeholder outside string literals with the next literal
fn substitute_placeholders(sql: &str, literals: &[String]) -> String {
    let mut out = String::with_capacity(sql.len() + literals.iter().map(String::len).sum::<usize>());
    let mut next = literals.iter();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in sql.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None => match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => match next.next() {
                    Some(literal) => out.push_str(literal),
                    None => out.push(c),
                },
                _ => out.push(c),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_inside_literals_are_ignored() {
        assert_eq!(count_placeholders("SELECT * FROM users WHERE id = ?"), 1);
        assert_eq!(count_placeholders("SELECT qr_verify('?')"), 0);
        assert_eq!(count_placeholders("SELECT ?, ?, '?'"), 2);
    }

    #[test]
    fn substitution_is_positional() {
        let sql = substitute_placeholders(
            "SELECT * FROM users WHERE id = ?",
            &["'u001'".to_string()],
        );
        assert_eq!(sql, "SELECT * FROM users WHERE id = 'u001'");
    }

    #[test]
    fn substitution_leaves_quoted_question_marks() {
        let sql = substitute_placeholders("SELECT qr_verify('a?b')", &[]);
        assert_eq!(sql, "SELECT qr_verify('a?b')");
    }
}
