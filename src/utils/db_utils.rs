use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::error::AppError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Date(NaiveDate),
}

/// Sparse set of column updates. Iteration order is irrelevant, the emitted
/// statement follows the table's column list.
pub type FieldMap = HashMap<&'static str, SqlValue>;

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build parameterized UPDATE SQL
/// ===============================
///
/// `columns` is the whitelist and fixes the order of the SET clause. Only
/// whitelisted names ever reach the SQL text; values are always bound.
pub fn build_update_sql(
    table: &str,
    columns: &[&str],
    fields: &FieldMap,
    id_column: &str,
    id_value: &str,
) -> Result<SqlUpdate, AppError> {
    if fields.is_empty() {
        return Err(AppError::BadRequest("No fields provided for update".into()));
    }

    if let Some(unknown) = fields.keys().find(|k| !columns.contains(*k)) {
        return Err(AppError::BadRequest(format!(
            "Unknown column for {}: {}",
            table, unknown
        )));
    }

    let mut set_clause = Vec::with_capacity(fields.len());
    let mut values = Vec::with_capacity(fields.len() + 1);

    for column in columns {
        if let Some(value) = fields.get(*column) {
            set_clause.push(format!("{} = ?", column));
            values.push(value.clone());
        }
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        set_clause.join(", "),
        id_column
    );

    // WHERE id = ?
    values.push(SqlValue::Text(id_value.to_string()));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &SqlitePool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}
