//! MySQL wire protocol front end
//!
//! Enough of the MySQL 8 client/server protocol to satisfy stock clients:
//! handshake with any-credentials authentication, text-protocol queries,
//! prepared statements (classified after parameter substitution), and text
//! and binary result sets.

pub mod constants;
pub mod messages;
pub mod packet;
pub mod protocol;
pub mod server;

pub use protocol::MysqlConnection;
pub use server::MysqlServer;
