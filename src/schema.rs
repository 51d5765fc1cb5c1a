//! Static table descriptors and stored payload shapes

use serde::{Deserialize, Serialize};

use crate::mysql::constants::{ColumnFlags, ColumnType};

/// A column in a result set
#[derive(Debug, Clone)]
pub struct Column {
    /// Table the column belongs to (empty for synthetic columns)
    pub table: String,
    /// Column name as presented to the client
    pub name: String,
    /// Wire type used in the column definition
    pub ty: ColumnType,
    /// Column definition flags
    pub flags: ColumnFlags,
}

impl Column {
    /// A plain column with no flags set
    pub fn new(table: &str, name: &str, ty: ColumnType) -> Self {
        Self {
            table: table.to_string(),
            name: name.to_string(),
            ty,
            flags: ColumnFlags::empty(),
        }
    }

    /// A column with explicit definition flags
    pub fn with_flags(table: &str, name: &str, ty: ColumnType, flags: ColumnFlags) -> Self {
        Self {
            table: table.to_string(),
            name: name.to_string(),
            ty,
            flags,
        }
    }
}

/// Descriptor of a table exposed through the whitelist
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Table name as seen by clients
    pub name: String,
    /// Primary key column; the only column equality predicates may use
    pub pk: String,
    /// Payload columns in projection order, after the primary key
    pub fields: Vec<(String, ColumnType)>,
}

impl TableSchema {
    /// The single `users` table backed by the `users.*` keyspace
    pub fn users() -> Self {
        TableSchema {
            name: "users".to_string(),
            pk: "id".to_string(),
            fields: vec![
                ("name".to_string(), ColumnType::VarString),
                ("email".to_string(), ColumnType::VarString),
                ("age".to_string(), ColumnType::Long),
                ("created_at".to_string(), ColumnType::Datetime),
            ],
        }
    }

    /// Result-set columns, primary key first
    pub fn columns(&self) -> Vec<Column> {
        let mut cols = vec![Column::with_flags(
            &self.name,
            &self.pk,
            ColumnType::VarString,
            ColumnFlags::PRI_KEY | ColumnFlags::NOT_NULL,
        )];
        for (name, ty) in &self.fields {
            cols.push(Column::new(&self.name, name, *ty));
        }
        cols
    }

    /// Rows answering `DESCRIBE <table>`: Field, Type, Null, Key, Default, Extra
    pub fn describe_rows(&self) -> Vec<Vec<Option<String>>> {
        let mut rows = vec![vec![
            Some(self.pk.clone()),
            Some(type_name(ColumnType::VarString).to_string()),
            Some("NO".to_string()),
            Some("PRI".to_string()),
            None,
            Some(String::new()),
        ]];
        for (name, ty) in &self.fields {
            rows.push(vec![
                Some(name.clone()),
                Some(type_name(*ty).to_string()),
                Some("YES".to_string()),
                Some(String::new()),
                None,
                Some(String::new()),
            ]);
        }
        rows
    }
}

/// SQL type name shown by DESCRIBE
fn type_name(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Tiny => "tinyint",
        ColumnType::Long => "int",
        ColumnType::LongLong => "bigint",
        ColumnType::Datetime => "datetime",
        ColumnType::VarString => "varchar(255)",
    }
}

/// User record payload stored as JSON under `users.<pk>`
///
/// Every field is optional; absent fields project as SQL NULL.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserRecord {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Contact address
    #[serde(default)]
    pub email: Option<String>,
    /// Age in years, nullable
    #[serde(default)]
    pub age: Option<i64>,
    /// Creation timestamp, `YYYY-MM-DD HH:MM:SS`
    #[serde(default)]
    pub created_at: Option<String>,
}

impl UserRecord {
    /// Project the record into a result row, primary key first
    pub fn into_row(self, pk: &str) -> Vec<Option<String>> {
        vec![
            Some(pk.to_string()),
            self.name,
            self.email,
            self.age.map(|a| a.to_string()),
            self.created_at,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_columns_lead_with_primary_key() {
        let schema = TableSchema::users();
        let cols = schema.columns();
        assert_eq!(cols.len(), 5);
        assert_eq!(cols[0].name, "id");
        assert!(cols[0].flags.contains(ColumnFlags::PRI_KEY));
        assert_eq!(cols[4].name, "created_at");
    }

    #[test]
    fn record_with_missing_fields_projects_nulls() {
        let record: UserRecord = serde_json::from_str(r#"{"name":"Eve"}"#).unwrap();
        let row = record.into_row("u005");
        assert_eq!(row[0].as_deref(), Some("u005"));
        assert_eq!(row[1].as_deref(), Some("Eve"));
        assert_eq!(row[2], None);
        assert_eq!(row[3], None);
        assert_eq!(row[4], None);
    }

    #[test]
    fn null_age_round_trips() {
        let record: UserRecord =
            serde_json::from_str(r#"{"name":"Eve","email":"eve@example.com","age":null}"#).unwrap();
        assert_eq!(record.age, None);
        let row = record.into_row("u005");
        assert_eq!(row[3], None);
    }

    #[test]
    fn describe_marks_only_the_primary_key() {
        let rows = TableSchema::users().describe_rows();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0][3].as_deref(), Some("PRI"));
        assert!(rows[1..].iter().all(|r| r[3].as_deref() == Some("")));
    }
}
