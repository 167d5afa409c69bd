//! PostgreSQL implementation of [`DataStore`].
//!
//! Every call opens its own connection, runs one statement and closes the
//! connection again, whether the statement succeeded or not.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, DataStore, ResultTable, Row, Value};
use crate::error::{ReportError, Result};
use crate::query::SqlParam;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgColumn, PgConnection, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column, Connection, Decode, Executor, Row as SqlxRow, Statement, Type, TypeInfo};
use std::io::ErrorKind;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    config: ConnectionConfig,
}

impl PostgresStore {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    async fn open(&self) -> Result<PgConnection> {
        let options = self.config.connect_options()?;
        debug!("Opening connection to {}", self.config.display_string());

        PgConnection::connect_with(&options)
            .await
            .map_err(|e| map_connection_error(e, &self.config))
    }
}

#[async_trait]
impl DataStore for PostgresStore {
    async fn fetch(&self, sql: &str, params: &[SqlParam]) -> Result<ResultTable> {
        let mut conn = self.open().await?;

        let start = Instant::now();
        let outcome = bind_params(sqlx::query(sql), params)
            .fetch_all(&mut conn)
            .await;
        let execution_time = start.elapsed();

        let columns = match &outcome {
            Ok(rows) => match rows.first() {
                Some(first) => columns_of(first),
                None => describe_columns(&mut conn, sql).await,
            },
            Err(_) => Vec::new(),
        };

        if let Err(e) = conn.close().await {
            warn!("Connection did not close cleanly: {e}");
        }

        let rows = outcome.map_err(|e| ReportError::query(format_query_error(e)))?;
        debug!(
            "Statement returned {} rows in {:?}",
            rows.len(),
            execution_time
        );

        Ok(ResultTable {
            columns,
            rows: rows.iter().map(convert_row).collect::<Result<_>>()?,
            execution_time,
        })
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.as_str()),
        };
    }
    query
}

fn columns_of(row: &PgRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Column metadata for a statement that returned no rows. Best effort: an
/// empty list is returned if the statement cannot be prepared again.
async fn describe_columns(conn: &mut PgConnection, sql: &str) -> Vec<ColumnInfo> {
    match (&mut *conn).prepare(sql).await {
        Ok(statement) => statement
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect(),
        Err(e) => {
            debug!("Could not describe empty result: {e}");
            Vec::new()
        }
    }
}

fn convert_row(row: &PgRow) -> Result<Row> {
    row.columns().iter().map(|col| convert_value(row, col)).collect()
}

fn cell<'r, T>(row: &'r PgRow, index: usize) -> std::result::Result<Option<T>, sqlx::Error>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index)
}

/// Decodes one cell by its column type. Types without a dedicated arm are read
/// as text; a cell that cannot be read is an error, never a NULL.
fn convert_value(row: &PgRow, column: &PgColumn) -> Result<Value> {
    let index = column.ordinal();
    let type_name = column.type_info().name();

    let decoded = match type_name {
        "BOOL" => cell::<bool>(row, index).map(|v| v.map(Value::Bool)),
        "INT2" => cell::<i16>(row, index).map(|v| v.map(|n| Value::Int(n.into()))),
        "INT4" => cell::<i32>(row, index).map(|v| v.map(|n| Value::Int(n.into()))),
        "INT8" => cell::<i64>(row, index).map(|v| v.map(Value::Int)),
        "FLOAT4" => cell::<f32>(row, index).map(|v| v.map(|n| Value::Float(n.into()))),
        "FLOAT8" => cell::<f64>(row, index).map(|v| v.map(Value::Float)),
        "NUMERIC" => cell::<Decimal>(row, index).map(|v| v.map(decimal_value)),
        "DATE" => cell::<NaiveDate>(row, index).map(|v| v.map(|d| Value::Text(d.to_string()))),
        "TIME" => cell::<NaiveTime>(row, index).map(|v| v.map(|t| Value::Text(t.to_string()))),
        "TIMESTAMP" => cell::<NaiveDateTime>(row, index)
            .map(|v| v.map(|ts| Value::Text(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()))),
        "TIMESTAMPTZ" => {
            cell::<DateTime<Utc>>(row, index).map(|v| v.map(|ts| Value::Text(ts.to_rfc3339())))
        }
        _ => cell::<String>(row, index).map(|v| v.map(Value::Text)),
    };

    decoded
        .map(Option::unwrap_or_default)
        .map_err(|e| {
            ReportError::query(format!(
                "Cannot read column '{}' of type {type_name}: {e}",
                column.name()
            ))
        })
}

fn decimal_value(decimal: Decimal) -> Value {
    match decimal.to_f64() {
        Some(n) => Value::Float(n),
        None => Value::Text(decimal.to_string()),
    }
}

/// Turns a failed connect into a message naming what to check.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> ReportError {
    let target = format!(
        "{}:{}",
        config.host.as_deref().unwrap_or("localhost"),
        config.port
    );
    let code = error
        .as_database_error()
        .and_then(|e| e.code())
        .map(|code| code.into_owned());

    let message = match (&error, code.as_deref()) {
        (sqlx::Error::Io(io), _) if io.kind() == ErrorKind::TimedOut => {
            format!("Connection to {target} timed out.")
        }
        (sqlx::Error::Io(_), _) => {
            format!("Cannot connect to {target}. Check that the server is running.")
        }
        (sqlx::Error::PoolTimedOut, _) => format!("Connection to {target} timed out."),
        // invalid_password, invalid_authorization_specification
        (_, Some("28P01" | "28000")) => format!(
            "Authentication failed for user '{}'. Check your credentials.",
            config.user.as_deref().unwrap_or("unknown")
        ),
        // invalid_catalog_name
        (_, Some("3D000")) => format!(
            "Database '{}' does not exist.",
            config.database.as_deref().unwrap_or("unknown")
        ),
        _ => error.to_string(),
    };
    ReportError::connection(message)
}

fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => {
            let mut message = format!("ERROR: {}", db_error.message());
            if let Some(pg_error) =
                db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
            {
                if let Some(detail) = pg_error.detail() {
                    message.push_str("\nDETAIL: ");
                    message.push_str(detail);
                }
                if let Some(hint) = pg_error.hint() {
                    message.push_str("\nHINT: ");
                    message.push_str(hint);
                }
            }
            message
        }
        None => error.to_string(),
    }
}
