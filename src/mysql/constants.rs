//! Protocol constants: command bytes, capability and status flags, column types
//!
//! Flag values follow the documented MySQL 8 capability set:
//! <https://dev.mysql.com/doc/dev/mysql-server/latest/group__group__cs__capabilities__flags.html>

use bitflags::bitflags;

/// Command bytes carried as the first payload byte of a command frame
pub mod command {
    /// Close the connection
    pub const COM_QUIT: u8 = 0x01;
    /// Select a default database
    pub const COM_INIT_DB: u8 = 0x02;
    /// Text-protocol query
    pub const COM_QUERY: u8 = 0x03;
    /// List the columns of a table
    pub const COM_FIELD_LIST: u8 = 0x04;
    /// Liveness check
    pub const COM_PING: u8 = 0x0e;
    /// Prepare a statement
    pub const COM_STMT_PREPARE: u8 = 0x16;
    /// Execute a prepared statement
    pub const COM_STMT_EXECUTE: u8 = 0x17;
    /// Discard a prepared statement
    pub const COM_STMT_CLOSE: u8 = 0x19;
    /// Reset a prepared statement
    pub const COM_STMT_RESET: u8 = 0x1a;
}

bitflags! {
    /// Client/server capability flags exchanged during the handshake
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        /// Improved old password auth, assumed since 4.1
        const LONG_PASSWORD = 0x0000_0001;
        /// Report found rows instead of affected rows
        const FOUND_ROWS = 0x0000_0002;
        /// Long flags in column metadata
        const LONG_FLAG = 0x0000_0004;
        /// Database name may be supplied at connect time
        const CONNECT_WITH_DB = 0x0000_0008;
        /// Compression protocol
        const COMPRESS = 0x0000_0020;
        /// 4.1+ protocol
        const PROTOCOL_41 = 0x0000_0200;
        /// TLS requested for this session
        const SSL = 0x0000_0800;
        /// Status flags in EOF packets
        const TRANSACTIONS = 0x0000_2000;
        /// 4.1+ native authentication
        const SECURE_CONNECTION = 0x0000_8000;
        /// Multiple statements per COM_QUERY
        const MULTI_STATEMENTS = 0x0001_0000;
        /// Multiple result sets per COM_QUERY
        const MULTI_RESULTS = 0x0002_0000;
        /// Authentication plugins
        const PLUGIN_AUTH = 0x0008_0000;
        /// Connection attributes in the handshake response
        const CONNECT_ATTRS = 0x0010_0000;
        /// Length-encoded auth response data
        const PLUGIN_AUTH_LENENC_DATA = 0x0020_0000;
        /// Session state change information in OK packets
        const SESSION_TRACK = 0x0080_0000;
        /// OK packet in place of EOF
        const DEPRECATE_EOF = 0x0100_0000;
    }
}

bitflags! {
    /// Server status bits carried in OK and EOF packets
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u16 {
        /// A transaction is open
        const IN_TRANS = 0x0001;
        /// Autocommit is enabled
        const AUTOCOMMIT = 0x0002;
        /// More result sets follow
        const MORE_RESULTS_EXISTS = 0x0008;
    }
}

bitflags! {
    /// Column definition flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColumnFlags: u16 {
        /// Column cannot be NULL
        const NOT_NULL = 0x0001;
        /// Column is part of the primary key
        const PRI_KEY = 0x0002;
        /// Column holds an unsigned value
        const UNSIGNED = 0x0020;
    }
}

/// Column type bytes used in column definitions and binary rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColumnType {
    /// `TINYINT`, one byte in binary rows
    Tiny = 0x01,
    /// `INT`, four bytes in binary rows
    Long = 0x03,
    /// `BIGINT`, eight bytes in binary rows
    LongLong = 0x08,
    /// `DATETIME`, component-encoded in binary rows
    Datetime = 0x0c,
    /// Variable-length string, length-encoded in binary rows
    VarString = 0xfd,
}

/// `utf8mb4_general_ci`, the connection character set we advertise
pub const CHARSET_UTF8MB4: u8 = 45;

/// The `binary` pseudo-charset used for numeric and temporal columns
pub const CHARSET_BINARY: u8 = 63;
