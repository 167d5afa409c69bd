//! In-memory stores for tests.

use super::{DataStore, ResultTable};
use crate::error::{ReportError, Result};
use crate::query::{BuiltQuery, SqlParam};
use async_trait::async_trait;
use std::sync::Mutex;

/// Returns a canned table for every statement and records what it was asked
/// to run.
#[derive(Debug, Default)]
pub struct MockDataStore {
    table: ResultTable,
    issued: Mutex<Vec<BuiltQuery>>,
}

impl MockDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: ResultTable) -> Self {
        Self {
            table,
            issued: Mutex::new(Vec::new()),
        }
    }

    /// Statements received so far, oldest first.
    pub fn issued(&self) -> Vec<BuiltQuery> {
        self.issued
            .lock()
            .map(|issued| issued.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DataStore for MockDataStore {
    async fn fetch(&self, sql: &str, params: &[SqlParam]) -> Result<ResultTable> {
        if let Ok(mut issued) = self.issued.lock() {
            issued.push(BuiltQuery {
                sql: sql.to_string(),
                params: params.to_vec(),
            });
        }
        Ok(self.table.clone())
    }
}

/// Fails every statement with the configured error kind.
#[derive(Debug, Clone)]
pub enum FailingDataStore {
    Unreachable,
    BadStatement,
}

#[async_trait]
impl DataStore for FailingDataStore {
    async fn fetch(&self, _sql: &str, _params: &[SqlParam]) -> Result<ResultTable> {
        match self {
            Self::Unreachable => Err(ReportError::connection(
                "Cannot connect to localhost:5432. Check that the server is running.",
            )),
            Self::BadStatement => Err(ReportError::query("ERROR: syntax error at or near \"FROM\"")),
        }
    }
}
