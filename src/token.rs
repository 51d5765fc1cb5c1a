//! Single-use token verification
//!
//! Tokens live under `auth:<token>` with a TTL set by their producer. The
//! first verification consumes the key with an atomic GETDEL, so of any
//! number of concurrent attempts exactly one can succeed. A plain GET
//! followed by DEL would break that guarantee.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::mysql::constants::ColumnType;
use crate::schema::Column;
use crate::store::{self, KvStore};

/// Token payload stored as JSON under `auth:<token>`
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Owner of the token
    pub user_id: String,
    /// Facility the token was issued for
    pub facility: String,
    /// Producer-defined extra payload
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// A successful verification
#[derive(Debug)]
pub struct Verification {
    /// `user_id` from the consumed payload
    pub user_id: String,
    /// `facility` from the consumed payload
    pub facility: String,
    /// Wall-clock time of the verification, `YYYY-MM-DD HH:MM:SS` UTC
    pub verified_at: String,
    /// Extra payload serialised back to JSON, empty when absent
    pub data: String,
}

/// Consume `auth:<token>`; `None` when the token is absent, already used,
/// expired, unreadable, or the store failed
pub async fn verify(store: &dyn KvStore, token: &str) -> Option<Verification> {
    let key = format!("auth:{token}");
    let payload = match store.get_del(&key).await {
        Ok(value) => value?,
        Err(e) => {
            store::log_error("getdel", &e);
            return None;
        }
    };

    match serde_json::from_str::<TokenRecord>(&payload) {
        Ok(record) => Some(Verification {
            user_id: record.user_id,
            facility: record.facility,
            verified_at: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            data: record.data.map(|v| v.to_string()).unwrap_or_default(),
        }),
        Err(e) => {
            warn!(error = %e, "token payload could not be parsed");
            None
        }
    }
}

/// Columns of the `qr_verify` result row
pub fn columns() -> Vec<Column> {
    vec![
        Column::new("", "verified", ColumnType::Tiny),
        Column::new("", "user_id", ColumnType::VarString),
        Column::new("", "facility", ColumnType::VarString),
        Column::new("", "verified_at", ColumnType::Datetime),
        Column::new("", "data", ColumnType::VarString),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn first_verification_wins_second_sees_nothing() {
        let store = MemoryStore::new();
        store.put("auth:abc123", r#"{"user_id":"u001","facility":"fac-tokyo"}"#);

        let first = verify(&store, "abc123").await.unwrap();
        assert_eq!(first.user_id, "u001");
        assert_eq!(first.facility, "fac-tokyo");
        assert_eq!(first.data, "");
        assert!(!store.contains("auth:abc123"));

        assert!(verify(&store, "abc123").await.is_none());
    }

    #[tokio::test]
    async fn unknown_token_yields_nothing() {
        let store = MemoryStore::new();
        assert!(verify(&store, "missing").await.is_none());
    }

    #[tokio::test]
    async fn malformed_payload_counts_as_absent_but_is_consumed() {
        let store = MemoryStore::new();
        store.put("auth:bad", "not json");
        assert!(verify(&store, "bad").await.is_none());
        assert!(!store.contains("auth:bad"));
    }

    #[tokio::test]
    async fn extra_payload_is_carried_through() {
        let store = MemoryStore::new();
        store.put(
            "auth:rich",
            r#"{"user_id":"u002","facility":"fac-osaka","data":{"gate":"A4"}}"#,
        );
        let verification = verify(&store, "rich").await.unwrap();
        assert_eq!(verification.data, r#"{"gate":"A4"}"#);
    }

    #[test]
    fn token_record_tolerates_missing_data_field() {
        let record: TokenRecord =
            serde_json::from_str(r#"{"user_id":"u001","facility":"fac-tokyo"}"#).unwrap();
        assert!(record.data.is_none());
    }
}
