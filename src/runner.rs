//! Report runner.
//!
//! Hands built statements to a [`DataStore`] and shapes the results. Each call is
//! one round trip; failures are returned as-is with no retry.

use tracing::{debug, info};

use crate::db::{DataStore, ResultTable};
use crate::eligibility::EligibilityOutcome;
use crate::error::Result;
use crate::insights::Insight;
use crate::models::EligibilityCriteria;
use crate::query::{batches_query, eligibility_query, BuiltQuery};

pub struct ReportRunner<S> {
    store: S,
}

impl<S: DataStore> ReportRunner<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn run(&self, query: &BuiltQuery) -> Result<ResultTable> {
        debug!("Running statement with {} bound values", query.params.len());
        self.store.fetch(&query.sql, &query.params).await
    }

    pub async fn find_eligible(&self, criteria: &EligibilityCriteria) -> Result<EligibilityOutcome> {
        let table = self.run(&eligibility_query(criteria)).await?;
        let outcome = EligibilityOutcome::from_table(table);
        info!(
            "{} across {} batches",
            outcome.summary_line(),
            outcome.by_batch.len()
        );
        Ok(outcome)
    }

    /// Distinct batch identifiers known to the store, in ascending order.
    pub async fn list_batches(&self) -> Result<Vec<String>> {
        let table = self.run(&batches_query()).await?;
        Ok(table
            .rows
            .iter()
            .filter_map(|row| row.first())
            .filter_map(|value| value.as_str())
            .map(String::from)
            .collect())
    }

    pub async fn run_insight(&self, insight: Insight) -> Result<ResultTable> {
        debug!("Running insight {insight}");
        self.run(&insight.query()).await
    }

    /// Runs every insight in order, stopping at the first failure.
    pub async fn run_all_insights(&self) -> Result<Vec<(Insight, ResultTable)>> {
        let mut results = Vec::with_capacity(Insight::ALL.len());
        for insight in Insight::ALL {
            results.push((insight, self.run_insight(insight).await?));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, FailingDataStore, MockDataStore, Value};
    use crate::error::ReportError;
    use crate::query::SqlParam;

    #[tokio::test]
    async fn eligibility_search_sends_bound_criteria() {
        let runner = ReportRunner::new(MockDataStore::new());
        let criteria = EligibilityCriteria::default().with_batches(["2023A", "2023B"]);

        let outcome = runner.find_eligible(&criteria).await.unwrap();
        assert_eq!(outcome.eligible_count(), 0);

        let issued = runner.store().issued();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].params.len(), 5);
        assert_eq!(issued[0].params[4], SqlParam::Text("2023B".to_string()));
    }

    #[tokio::test]
    async fn list_batches_reads_first_column() {
        let table = ResultTable::with_data(
            vec![ColumnInfo::new("course_batch", "TEXT")],
            vec![
                vec![Value::from("2023A")],
                vec![Value::Null],
                vec![Value::from("2023B")],
            ],
        );
        let runner = ReportRunner::new(MockDataStore::with_table(table));
        assert_eq!(runner.list_batches().await.unwrap(), vec!["2023A", "2023B"]);
    }

    #[tokio::test]
    async fn all_insights_run_in_order() {
        let runner = ReportRunner::new(MockDataStore::new());
        let results = runner.run_all_insights().await.unwrap();
        assert_eq!(results.len(), 10);

        let issued = runner.store().issued();
        for (query, insight) in issued.iter().zip(Insight::ALL) {
            assert_eq!(query.sql, insight.sql());
        }
    }

    #[tokio::test]
    async fn connection_failure_propagates() {
        let runner = ReportRunner::new(FailingDataStore::Unreachable);
        let err = runner
            .find_eligible(&EligibilityCriteria::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Connection(_)));
    }

    #[tokio::test]
    async fn insight_failure_stops_the_run() {
        let runner = ReportRunner::new(FailingDataStore::BadStatement);
        assert!(matches!(
            runner.run_all_insights().await,
            Err(ReportError::Query(_))
        ));
    }
}
