//! Typed MySQL protocol packets
//!
//! Parsing and encoding for the handful of packets the adapter exchanges:
//! the server greeting, the client handshake response, command frames, and
//! the OK/EOF/column/row packets that make up responses. Layouts follow the
//! protocol documentation for the 4.1+ wire format.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{Datelike, NaiveDateTime, Timelike};
use rand::Rng;

use super::constants::{
    command, Capabilities, ColumnType, StatusFlags, CHARSET_BINARY, CHARSET_UTF8MB4,
};
use crate::error::{AdapterError, AdapterResult};
use crate::schema::Column;
use crate::SERVER_VERSION;

/// Authentication plugin named in the greeting; any response is accepted
const AUTH_PLUGIN: &[u8] = b"mysql_native_password";

/// Capability set the server advertises
pub fn server_capabilities() -> Capabilities {
    Capabilities::LONG_PASSWORD
        | Capabilities::FOUND_ROWS
        | Capabilities::LONG_FLAG
        | Capabilities::CONNECT_WITH_DB
        | Capabilities::PROTOCOL_41
        | Capabilities::TRANSACTIONS
        | Capabilities::SECURE_CONNECTION
        | Capabilities::PLUGIN_AUTH
        | Capabilities::PLUGIN_AUTH_LENENC_DATA
        | Capabilities::CONNECT_ATTRS
}

// ---------------------------------------------------------------------------
// length-encoded primitives

/// Write a length-encoded integer
pub fn put_lenenc_int(buf: &mut BytesMut, n: u64) {
    match n {
        0..=250 => buf.put_u8(n as u8),
        251..=0xffff => {
            buf.put_u8(0xfc);
            buf.put_u16_le(n as u16);
        }
        0x1_0000..=0xff_ffff => {
            buf.put_u8(0xfd);
            buf.put_uint_le(n, 3);
        }
        _ => {
            buf.put_u8(0xfe);
            buf.put_u64_le(n);
        }
    }
}

/// Write a length-encoded string
pub fn put_lenenc_bytes(buf: &mut BytesMut, bytes: &[u8]) {
    put_lenenc_int(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn get_u8(buf: &mut Bytes) -> AdapterResult<u8> {
    if buf.is_empty() {
        return Err(AdapterError::Protocol("truncated packet".into()));
    }
    Ok(buf.get_u8())
}

fn get_u16_le(buf: &mut Bytes) -> AdapterResult<u16> {
    if buf.len() < 2 {
        return Err(AdapterError::Protocol("truncated packet".into()));
    }
    Ok(buf.get_u16_le())
}

fn get_u32_le(buf: &mut Bytes) -> AdapterResult<u32> {
    if buf.len() < 4 {
        return Err(AdapterError::Protocol("truncated packet".into()));
    }
    Ok(buf.get_u32_le())
}

fn get_bytes(buf: &mut Bytes, n: usize) -> AdapterResult<Bytes> {
    if buf.len() < n {
        return Err(AdapterError::Protocol("truncated packet".into()));
    }
    Ok(buf.split_to(n))
}

/// Read a length-encoded integer
pub fn get_lenenc_int(buf: &mut Bytes) -> AdapterResult<u64> {
    match get_u8(buf)? {
        n @ 0..=0xfa => Ok(u64::from(n)),
        0xfc => Ok(u64::from(get_u16_le(buf)?)),
        0xfd => {
            let bytes = get_bytes(buf, 3)?;
            Ok(u64::from_le_bytes([bytes[0], bytes[1], bytes[2], 0, 0, 0, 0, 0]))
        }
        0xfe => {
            let bytes = get_bytes(buf, 8)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes);
            Ok(u64::from_le_bytes(raw))
        }
        other => Err(AdapterError::Protocol(format!(
            "invalid length-encoded integer prefix {:#04x}",
            other
        ))),
    }
}

/// Read a length-encoded byte string
pub fn get_lenenc_bytes(buf: &mut Bytes) -> AdapterResult<Bytes> {
    let len = get_lenenc_int(buf)? as usize;
    get_bytes(buf, len)
}

/// Read a NUL-terminated string; a missing terminator takes the rest of the
/// buffer (some clients omit the final NUL)
fn get_cstr(buf: &mut Bytes) -> AdapterResult<String> {
    let raw = match buf.iter().position(|&b| b == 0) {
        Some(pos) => {
            let s = buf.split_to(pos);
            buf.advance(1);
            s
        }
        None => buf.split_to(buf.len()),
    };
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

// ---------------------------------------------------------------------------
// handshake

/// Server greeting (HandshakeV10)
#[derive(Debug)]
pub struct Handshake {
    /// Connection id echoed to the client
    pub connection_id: u32,
    /// 20-byte auth scramble (unused beyond the exchange; any password passes)
    pub scramble: [u8; 20],
}

impl Handshake {
    /// Greeting with a fresh scramble
    pub fn new(connection_id: u32) -> Self {
        let mut rng = rand::thread_rng();
        let mut scramble = [0u8; 20];
        for b in &mut scramble {
            *b = rng.gen_range(1..=255);
        }
        Self {
            connection_id,
            scramble,
        }
    }

    /// Encode the greeting payload
    pub fn encode(&self, buf: &mut BytesMut) {
        let caps = server_capabilities().bits();

        buf.put_u8(10);
        buf.extend_from_slice(SERVER_VERSION.as_bytes());
        buf.put_u8(0);
        buf.put_u32_le(self.connection_id);
        buf.extend_from_slice(&self.scramble[..8]);
        buf.put_u8(0);
        buf.put_u16_le((caps & 0xffff) as u16);
        buf.put_u8(CHARSET_UTF8MB4);
        buf.put_u16_le(StatusFlags::AUTOCOMMIT.bits());
        buf.put_u16_le((caps >> 16) as u16);
        buf.put_u8(self.scramble.len() as u8 + 1);
        buf.extend_from_slice(&[0u8; 10]);
        buf.extend_from_slice(&self.scramble[8..]);
        buf.put_u8(0);
        buf.extend_from_slice(AUTH_PLUGIN);
        buf.put_u8(0);
    }
}

/// Client handshake response (HandshakeResponse41)
#[derive(Debug)]
pub struct HandshakeResponse {
    /// Capabilities the client settled on
    pub capabilities: Capabilities,
    /// Largest packet the client will send
    pub max_packet_size: u32,
    /// Connection character set requested by the client
    pub charset: u8,
    /// Login name; not verified
    pub username: String,
    /// Database selected at connect time
    pub database: Option<String>,
}

impl HandshakeResponse {
    /// Parse the client's handshake response payload
    pub fn parse(mut buf: Bytes) -> AdapterResult<Self> {
        let capabilities = Capabilities::from_bits_truncate(get_u32_le(&mut buf)?);
        if !capabilities.contains(Capabilities::PROTOCOL_41) {
            return Err(AdapterError::Handshake(
                "client does not speak the 4.1 protocol".into(),
            ));
        }
        if capabilities.contains(Capabilities::SSL) {
            return Err(AdapterError::Handshake("TLS is not supported".into()));
        }

        let max_packet_size = get_u32_le(&mut buf)?;
        let charset = get_u8(&mut buf)?;
        get_bytes(&mut buf, 23)?;

        let username = get_cstr(&mut buf)?;

        // auth response: discarded, any credentials are accepted
        if capabilities.contains(Capabilities::PLUGIN_AUTH_LENENC_DATA) {
            get_lenenc_bytes(&mut buf)?;
        } else {
            let len = get_u8(&mut buf)? as usize;
            get_bytes(&mut buf, len)?;
        }

        let database = if capabilities.contains(Capabilities::CONNECT_WITH_DB) && !buf.is_empty() {
            let db = get_cstr(&mut buf)?;
            (!db.is_empty()).then_some(db)
        } else {
            None
        };

        // auth plugin name and connect attributes are irrelevant here

        Ok(Self {
            capabilities,
            max_packet_size,
            charset,
            username,
            database,
        })
    }
}

// ---------------------------------------------------------------------------
// command frames

/// A parsed client command
#[derive(Debug)]
pub enum Command {
    /// COM_QUIT
    Quit,
    /// COM_INIT_DB: select a default database
    InitDb(String),
    /// COM_QUERY: text-protocol SQL
    Query(String),
    /// COM_FIELD_LIST: list columns of a table
    FieldList {
        /// Table whose columns are requested
        table: String,
    },
    /// COM_PING
    Ping,
    /// COM_STMT_PREPARE: SQL with `?` placeholders
    StmtPrepare(String),
    /// COM_STMT_EXECUTE: bound parameters follow in `params`
    StmtExecute {
        /// Statement id from the prepare response
        statement_id: u32,
        /// Raw parameter block (null bitmap, types, values)
        params: Bytes,
    },
    /// COM_STMT_CLOSE (no response expected)
    StmtClose {
        /// Statement id to discard
        statement_id: u32,
    },
    /// COM_STMT_RESET
    StmtReset {
        /// Statement id to reset
        statement_id: u32,
    },
    /// Any other command byte; answered with OK
    Other(u8),
}

impl Command {
    /// Parse one command frame
    pub fn parse(mut payload: Bytes) -> AdapterResult<Self> {
        let op = get_u8(&mut payload)?;
        let cmd = match op {
            command::COM_QUIT => Command::Quit,
            command::COM_INIT_DB => {
                Command::InitDb(String::from_utf8_lossy(&payload).into_owned())
            }
            command::COM_QUERY => Command::Query(String::from_utf8_lossy(&payload).into_owned()),
            command::COM_FIELD_LIST => Command::FieldList {
                table: get_cstr(&mut payload)?,
            },
            command::COM_PING => Command::Ping,
            command::COM_STMT_PREPARE => {
                Command::StmtPrepare(String::from_utf8_lossy(&payload).into_owned())
            }
            command::COM_STMT_EXECUTE => {
                let statement_id = get_u32_le(&mut payload)?;
                get_u8(&mut payload)?; // flags
                get_u32_le(&mut payload)?; // iteration count, always 1
                Command::StmtExecute {
                    statement_id,
                    params: payload,
                }
            }
            command::COM_STMT_CLOSE => Command::StmtClose {
                statement_id: get_u32_le(&mut payload)?,
            },
            command::COM_STMT_RESET => Command::StmtReset {
                statement_id: get_u32_le(&mut payload)?,
            },
            other => Command::Other(other),
        };
        Ok(cmd)
    }
}

// ---------------------------------------------------------------------------
// response packets

/// OK packet; also stands in for every empty response
#[derive(Debug, Default)]
pub struct OkPacket {
    /// Affected row count (always 0 here; the adapter never mutates)
    pub affected_rows: u64,
}

impl OkPacket {
    /// Encode the OK payload
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(0x00);
        put_lenenc_int(buf, self.affected_rows);
        put_lenenc_int(buf, 0); // last insert id
        buf.put_u16_le(StatusFlags::AUTOCOMMIT.bits());
        buf.put_u16_le(0); // warnings
    }
}

/// EOF packet, delimiting column definitions and rows
#[derive(Debug, Default)]
pub struct EofPacket;

impl EofPacket {
    /// Encode the EOF payload
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(0xfe);
        buf.put_u16_le(0); // warnings
        buf.put_u16_le(StatusFlags::AUTOCOMMIT.bits());
    }
}

/// COM_STMT_PREPARE response header
#[derive(Debug)]
pub struct PrepareOk {
    /// Statement id the client will execute against
    pub statement_id: u32,
    /// Result columns (unknown until execution, reported as 0)
    pub num_columns: u16,
    /// `?` placeholders in the statement
    pub num_params: u16,
}

impl PrepareOk {
    /// Encode the prepare-OK payload
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(0x00);
        buf.put_u32_le(self.statement_id);
        buf.put_u16_le(self.num_columns);
        buf.put_u16_le(self.num_params);
        buf.put_u8(0); // filler
        buf.put_u16_le(0); // warnings
    }
}

/// Encode a column definition packet (protocol 4.1 layout)
pub fn encode_column(col: &Column, buf: &mut BytesMut) {
    let (charset, max_size) = match col.ty {
        ColumnType::VarString => (CHARSET_UTF8MB4, 1020),
        ColumnType::Tiny => (CHARSET_BINARY, 4),
        ColumnType::Long => (CHARSET_BINARY, 11),
        ColumnType::LongLong => (CHARSET_BINARY, 20),
        ColumnType::Datetime => (CHARSET_BINARY, 19),
    };

    put_lenenc_bytes(buf, b"def");
    put_lenenc_bytes(buf, b""); // schema
    put_lenenc_bytes(buf, col.table.as_bytes());
    put_lenenc_bytes(buf, col.table.as_bytes()); // org table
    put_lenenc_bytes(buf, col.name.as_bytes());
    put_lenenc_bytes(buf, col.name.as_bytes()); // org name
    put_lenenc_int(buf, 0x0c); // fixed-length fields below
    buf.put_u16_le(u16::from(charset));
    buf.put_u32_le(max_size);
    buf.put_u8(col.ty as u8);
    buf.put_u16_le(col.flags.bits());
    buf.put_u8(0); // decimals
    buf.put_u16_le(0); // filler
}

/// Column definition for a COM_FIELD_LIST response (carries a default value)
pub fn encode_field_list_column(col: &Column, buf: &mut BytesMut) {
    encode_column(col, buf);
    buf.put_u8(0xfb); // NULL default
}

/// Encode one row in the text protocol
pub fn encode_text_row(values: &[Option<String>], buf: &mut BytesMut) {
    for value in values {
        match value {
            None => buf.put_u8(0xfb),
            Some(text) => put_lenenc_bytes(buf, text.as_bytes()),
        }
    }
}

/// Encode one row in the binary protocol (COM_STMT_EXECUTE responses)
pub fn encode_binary_row(columns: &[Column], values: &[Option<String>], buf: &mut BytesMut) {
    buf.put_u8(0x00);

    let bitmap_len = (values.len() + 7 + 2) / 8;
    let mut bitmap = vec![0u8; bitmap_len];
    for (i, value) in values.iter().enumerate() {
        if value.is_none() {
            bitmap[(i + 2) / 8] |= 1 << ((i + 2) % 8);
        }
    }
    buf.extend_from_slice(&bitmap);

    for (col, value) in columns.iter().zip(values) {
        let Some(text) = value else { continue };
        match col.ty {
            ColumnType::Tiny => buf.put_i8(text.parse().unwrap_or(0)),
            ColumnType::Long => buf.put_i32_le(text.parse().unwrap_or(0)),
            ColumnType::LongLong => buf.put_i64_le(text.parse().unwrap_or(0)),
            ColumnType::Datetime => encode_binary_datetime(text, buf),
            ColumnType::VarString => put_lenenc_bytes(buf, text.as_bytes()),
        }
    }
}

fn encode_binary_datetime(text: &str, buf: &mut BytesMut) {
    match NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        Ok(dt) => {
            buf.put_u8(7);
            buf.put_u16_le(dt.year() as u16);
            buf.put_u8(dt.month() as u8);
            buf.put_u8(dt.day() as u8);
            buf.put_u8(dt.hour() as u8);
            buf.put_u8(dt.minute() as u8);
            buf.put_u8(dt.second() as u8);
        }
        // zero-length datetime is the protocol's "zero date"
        Err(_) => buf.put_u8(0),
    }
}

// ---------------------------------------------------------------------------
// prepared-statement parameters

/// Decode the parameter block of a COM_STMT_EXECUTE frame into SQL literal
/// fragments, ready for placeholder substitution.
///
/// `types` is the per-statement type cache: when the client sends fresh type
/// information it is stored there; otherwise the cached types are reused.
pub fn decode_execute_params(
    payload: &mut Bytes,
    param_count: usize,
    types: &mut Vec<(u8, u8)>,
) -> AdapterResult<Vec<String>> {
    if param_count == 0 {
        return Ok(Vec::new());
    }

    let bitmap = get_bytes(payload, (param_count + 7) / 8)?;
    let fresh_types = get_u8(payload)? == 1;
    if fresh_types {
        types.clear();
        for _ in 0..param_count {
            let ty = get_u8(payload)?;
            let flags = get_u8(payload)?;
            types.push((ty, flags));
        }
    }
    if types.len() != param_count {
        return Err(AdapterError::Protocol(
            "statement executed before parameter types were bound".into(),
        ));
    }

    let mut literals = Vec::with_capacity(param_count);
    for (i, &(ty, flags)) in types.iter().enumerate() {
        if bitmap[i / 8] & (1 << (i % 8)) != 0 {
            literals.push("NULL".to_string());
            continue;
        }
        literals.push(decode_binary_value(payload, ty, flags)?);
    }
    Ok(literals)
}

fn decode_binary_value(payload: &mut Bytes, ty: u8, flags: u8) -> AdapterResult<String> {
    let unsigned = flags & 0x80 != 0;
    let value = match ty {
        // NULL type
        0x06 => "NULL".to_string(),
        // TINY
        0x01 => {
            let b = get_u8(payload)?;
            if unsigned {
                b.to_string()
            } else {
                (b as i8).to_string()
            }
        }
        // SHORT, YEAR
        0x02 | 0x0d => {
            let v = get_u16_le(payload)?;
            if unsigned {
                v.to_string()
            } else {
                (v as i16).to_string()
            }
        }
        // LONG, INT24
        0x03 | 0x09 => {
            let v = get_u32_le(payload)?;
            if unsigned {
                v.to_string()
            } else {
                (v as i32).to_string()
            }
        }
        // LONGLONG
        0x08 => {
            let bytes = get_bytes(payload, 8)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes);
            if unsigned {
                u64::from_le_bytes(raw).to_string()
            } else {
                i64::from_le_bytes(raw).to_string()
            }
        }
        // FLOAT
        0x04 => {
            let bytes = get_bytes(payload, 4)?;
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes);
            f32::from_le_bytes(raw).to_string()
        }
        // DOUBLE
        0x05 => {
            let bytes = get_bytes(payload, 8)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes);
            f64::from_le_bytes(raw).to_string()
        }
        // TIMESTAMP, DATE, DATETIME
        0x07 | 0x0a | 0x0c => quote_literal(&decode_binary_datetime(payload)?),
        // TIME
        0x0b => quote_literal(&decode_binary_time(payload)?),
        // DECIMAL, NEWDECIMAL: sent as text
        0x00 | 0xf6 => {
            let raw = get_lenenc_bytes(payload)?;
            let text = String::from_utf8_lossy(&raw).into_owned();
            if text.parse::<f64>().is_ok() {
                text
            } else {
                quote_literal(&text)
            }
        }
        // VARCHAR, ENUM, blobs, VAR_STRING, STRING
        0x0f | 0xf7 | 0xf9 | 0xfa | 0xfb | 0xfc | 0xfd | 0xfe => {
            let raw = get_lenenc_bytes(payload)?;
            quote_literal(&String::from_utf8_lossy(&raw))
        }
        other => {
            return Err(AdapterError::Protocol(format!(
                "unsupported parameter type {:#04x}",
                other
            )))
        }
    };
    Ok(value)
}

fn decode_binary_datetime(payload: &mut Bytes) -> AdapterResult<String> {
    let len = get_u8(payload)? as usize;
    if len == 0 {
        return Ok("0000-00-00 00:00:00".to_string());
    }
    if len < 4 {
        return Err(AdapterError::Protocol(
            "malformed datetime parameter".into(),
        ));
    }
    let raw = get_bytes(payload, len)?;
    let year = u16::from_le_bytes([raw[0], raw[1]]);
    let (month, day) = (raw[2], raw[3]);
    let (hour, minute, second) = if len >= 7 {
        (raw[4], raw[5], raw[6])
    } else {
        (0, 0, 0)
    };
    Ok(format!(
        "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
    ))
}

fn decode_binary_time(payload: &mut Bytes) -> AdapterResult<String> {
    let len = get_u8(payload)? as usize;
    if len == 0 {
        return Ok("00:00:00".to_string());
    }
    if len < 8 {
        return Err(AdapterError::Protocol("malformed time parameter".into()));
    }
    let raw = get_bytes(payload, len)?;
    let negative = raw[0] != 0;
    let days = u32::from_le_bytes([raw[1], raw[2], raw[3], raw[4]]);
    let hours = u64::from(days) * 24 + u64::from(raw[5]);
    let sign = if negative { "-" } else { "" };
    Ok(format!("{sign}{hours:02}:{:02}:{:02}", raw[6], raw[7]))
}

/// Quote a string value as a SQL literal, escaping backslashes and quotes
pub fn quote_literal(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        match c {
            '\'' => quoted.push_str("\\'"),
            '\\' => quoted.push_str("\\\\"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenenc_int_round_trips() {
        for n in [0u64, 250, 251, 0xffff, 0x1_0000, 0xff_ffff, u64::MAX] {
            let mut buf = BytesMut::new();
            put_lenenc_int(&mut buf, n);
            let mut bytes = buf.freeze();
            assert_eq!(get_lenenc_int(&mut bytes).unwrap(), n);
            assert!(bytes.is_empty());
        }
    }

    #[test]
    fn ok_packet_layout() {
        let mut buf = BytesMut::new();
        OkPacket::default().encode(&mut buf);
        assert_eq!(&buf[..], &[0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn eof_packet_layout() {
        let mut buf = BytesMut::new();
        EofPacket.encode(&mut buf);
        assert_eq!(&buf[..], &[0xfe, 0x00, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn handshake_greeting_shape() {
        let mut buf = BytesMut::new();
        Handshake::new(7).encode(&mut buf);
        assert_eq!(buf[0], 10);
        let version_end = 1 + SERVER_VERSION.len();
        assert_eq!(&buf[1..version_end], SERVER_VERSION.as_bytes());
        assert_eq!(buf[version_end], 0);
        // plugin name is the trailer
        let tail = &buf[buf.len() - AUTH_PLUGIN.len() - 1..buf.len() - 1];
        assert_eq!(tail, AUTH_PLUGIN);
        assert_eq!(buf[buf.len() - 1], 0);
        // no NUL bytes inside the scramble halves
        assert!(buf[version_end + 5..version_end + 13].iter().all(|&b| b != 0));
    }

    #[test]
    fn handshake_response_with_database() {
        let caps = Capabilities::PROTOCOL_41
            | Capabilities::SECURE_CONNECTION
            | Capabilities::CONNECT_WITH_DB;
        let mut buf = BytesMut::new();
        buf.put_u32_le(caps.bits());
        buf.put_u32_le(1 << 24);
        buf.put_u8(CHARSET_UTF8MB4);
        buf.extend_from_slice(&[0u8; 23]);
        buf.extend_from_slice(b"app\0");
        buf.put_u8(0); // empty auth response
        buf.extend_from_slice(b"legacy\0");

        let response = HandshakeResponse::parse(buf.freeze()).unwrap();
        assert_eq!(response.username, "app");
        assert_eq!(response.database.as_deref(), Some("legacy"));
    }

    #[test]
    fn ssl_request_is_refused() {
        let caps = Capabilities::PROTOCOL_41 | Capabilities::SSL;
        let mut buf = BytesMut::new();
        buf.put_u32_le(caps.bits());
        buf.put_u32_le(1 << 24);
        buf.put_u8(CHARSET_UTF8MB4);
        buf.extend_from_slice(&[0u8; 23]);
        assert!(HandshakeResponse::parse(buf.freeze()).is_err());
    }

    #[test]
    fn command_dispatch() {
        let query = Command::parse(Bytes::from_static(b"\x03SELECT 1")).unwrap();
        assert!(matches!(query, Command::Query(q) if q == "SELECT 1"));

        let ping = Command::parse(Bytes::from_static(b"\x0e")).unwrap();
        assert!(matches!(ping, Command::Ping));

        let close = Command::parse(Bytes::from_static(b"\x19\x02\x00\x00\x00")).unwrap();
        assert!(matches!(close, Command::StmtClose { statement_id: 2 }));
    }

    #[test]
    fn text_row_encodes_null_as_fb() {
        let mut buf = BytesMut::new();
        encode_text_row(&[Some("u001".to_string()), None], &mut buf);
        assert_eq!(&buf[..], &[0x04, b'u', b'0', b'0', b'1', 0xfb]);
    }

    #[test]
    fn binary_row_null_bitmap_offset() {
        let columns = vec![
            Column::new("users", "id", ColumnType::VarString),
            Column::new("users", "age", ColumnType::Long),
        ];
        let mut buf = BytesMut::new();
        encode_binary_row(&columns, &[Some("u1".to_string()), None], &mut buf);
        // header, one bitmap byte with bit 3 set (second column NULL), then "u1"
        assert_eq!(&buf[..], &[0x00, 0b0000_1000, 0x02, b'u', b'1']);
    }

    #[test]
    fn execute_params_decode_and_quote() {
        let mut buf = BytesMut::new();
        buf.put_u8(0x00); // null bitmap: nothing null
        buf.put_u8(1); // fresh types
        buf.put_u8(0xfd); // VAR_STRING
        buf.put_u8(0);
        buf.put_u8(0x03); // LONG
        buf.put_u8(0);
        put_lenenc_bytes(&mut buf, b"O'Brien");
        buf.put_u32_le(28);

        let mut payload = buf.freeze();
        let mut types = Vec::new();
        let literals = decode_execute_params(&mut payload, 2, &mut types).unwrap();
        assert_eq!(literals, vec!["'O\\'Brien'".to_string(), "28".to_string()]);
        assert_eq!(types.len(), 2);
    }

    #[test]
    fn execute_params_null_bitmap() {
        let mut buf = BytesMut::new();
        buf.put_u8(0b0000_0001); // first param NULL
        buf.put_u8(1);
        buf.put_u8(0x06); // NULL type
        buf.put_u8(0);
        let mut payload = buf.freeze();
        let mut types = Vec::new();
        let literals = decode_execute_params(&mut payload, 1, &mut types).unwrap();
        assert_eq!(literals, vec!["NULL".to_string()]);
    }
}
