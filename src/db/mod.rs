//! Data store access.
//!
//! Report queries go through the [`DataStore`] trait so the runner can be
//! exercised without a live database. Schema setup and data loading live in
//! [`setup`].

mod mock;
mod postgres;
pub mod setup;
mod types;

pub use mock::{FailingDataStore, MockDataStore};
pub use postgres::PostgresStore;
pub use types::{ColumnInfo, ResultTable, Row, Value};

use crate::error::Result;
use crate::query::SqlParam;
use async_trait::async_trait;

/// The one capability reports need: run a parameterized SELECT and return a
/// table with named columns.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn fetch(&self, sql: &str, params: &[SqlParam]) -> Result<ResultTable>;
}
