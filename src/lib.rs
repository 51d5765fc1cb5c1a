//! # mini-mysql-redis
//!
//! A protocol adapter that speaks the MySQL client/server wire protocol on
//! its front end and translates a whitelisted subset of SQL into key/value
//! operations against a Redis backing store:
//!
//! - **MySQL wire front end**: handshake, `COM_QUERY` and prepared-statement
//!   dispatch, text and binary result sets
//! - **SQL whitelist**: a conservative tokenizing classifier; anything it
//!   does not recognise is rejected with a silent empty result
//! - **Redis back end**: GET / GETDEL / SCAN / INCR / EXPIRE over the
//!   `users.*`, `auth:*` and `ratelimit:*` keyspaces
//!
//! ## Architecture
//!
//! Every connection runs the same pipeline: rate limiter, classifier,
//! executor, result-set encoder. The backing store owns all persistent
//! state; the adapter only ever writes rate counters.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod mysql;
pub mod rate_limit;
pub mod schema;
pub mod sql;
pub mod store;
pub mod token;

pub use error::{AdapterError, AdapterResult};

/// Version string advertised in the greeting and by `SELECT @@version`.
pub const SERVER_VERSION: &str = "8.0.36-mini-mysql-redis";
