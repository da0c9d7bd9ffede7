use crate::core::{QueryEngine, Result};
use crate::domain::model::{QueryRows, QueryState, QueryStatus};
use crate::utils::error::OpsError;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Runs Athena statements to completion by spin-polling their state.
pub struct QueryRunner<Q: QueryEngine> {
    engine: Q,
    output_location: String,
    poll_interval: Duration,
    max_polls: Option<u32>,
}

impl<Q: QueryEngine> QueryRunner<Q> {
    pub fn new(engine: Q, output_location: String) -> Self {
        Self {
            engine,
            output_location,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Give up after this many status checks. Unlimited by default.
    pub fn with_max_polls(mut self, max_polls: Option<u32>) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Start `query` and wait for it. Returns the execution id once the
    /// query has succeeded.
    pub async fn run_query(&self, query: &str, database: &str) -> Result<String> {
        tracing::debug!("Starting Athena query on {}: {}", database, query);
        let query_execution_id = self
            .engine
            .start_query(query, database, &self.output_location)
            .await?;

        let status = self.wait_for_completion(&query_execution_id).await?;
        match status.state {
            QueryState::Succeeded => Ok(query_execution_id),
            state => Err(OpsError::QueryFailed {
                query_execution_id,
                state: state.as_str().to_string(),
                reason: status
                    .reason
                    .unwrap_or_else(|| "no reason reported".to_string()),
            }),
        }
    }

    pub async fn wait_for_completion(&self, query_execution_id: &str) -> Result<QueryStatus> {
        let mut polls = 0u32;
        loop {
            let status = self.engine.query_status(query_execution_id).await?;
            polls += 1;
            tracing::debug!(
                "Query {} state: {} (check {})",
                query_execution_id,
                status.state.as_str(),
                polls
            );

            if status.state.is_terminal() {
                return Ok(status);
            }

            if self.max_polls.is_some_and(|max| polls >= max) {
                return Err(OpsError::QueryFailed {
                    query_execution_id: query_execution_id.to_string(),
                    state: status.state.as_str().to_string(),
                    reason: format!("still not finished after {} status checks", polls),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub async fn fetch_rows(&self, query_execution_id: &str) -> Result<QueryRows> {
        self.engine.query_results(query_execution_id).await
    }

    /// Run a `SELECT COUNT(*) ...` statement and return the count.
    pub async fn run_count_query(&self, query: &str, database: &str) -> Result<u64> {
        let query_execution_id = self.run_query(query, database).await?;
        let rows = self.fetch_rows(&query_execution_id).await?;
        parse_count(&rows).map_err(|message| OpsError::ProcessingError {
            message: format!("query {}: {}", query_execution_id, message),
        })
    }
}

/// Athena returns the column header as the first row; the count is the first
/// cell of the second row.
pub fn parse_count(rows: &QueryRows) -> std::result::Result<u64, String> {
    let cell = rows
        .get(1)
        .and_then(|row| row.first())
        .ok_or_else(|| "result set has no data row".to_string())?;

    let value = cell
        .as_deref()
        .ok_or_else(|| "count cell is empty".to_string())?;

    value
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("count '{}' is not a number: {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct ScriptedEngine {
        states: Arc<Mutex<VecDeque<QueryStatus>>>,
        rows: QueryRows,
        started: Arc<Mutex<Vec<(String, String, String)>>>,
    }

    impl ScriptedEngine {
        fn with_states(states: &[&str], rows: QueryRows) -> Self {
            Self {
                states: Arc::new(Mutex::new(
                    states
                        .iter()
                        .map(|s| QueryStatus {
                            state: QueryState::parse(s),
                            reason: (*s == "FAILED").then(|| "SYNTAX_ERROR".to_string()),
                        })
                        .collect(),
                )),
                rows,
                started: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl QueryEngine for ScriptedEngine {
        async fn start_query(
            &self,
            query: &str,
            database: &str,
            output_location: &str,
        ) -> Result<String> {
            self.started.lock().await.push((
                query.to_string(),
                database.to_string(),
                output_location.to_string(),
            ));
            Ok("qid-1".to_string())
        }

        async fn query_status(&self, _query_execution_id: &str) -> Result<QueryStatus> {
            let mut states = self.states.lock().await;
            Ok(states.pop_front().unwrap_or(QueryStatus {
                state: QueryState::Running,
                reason: None,
            }))
        }

        async fn query_results(&self, _query_execution_id: &str) -> Result<QueryRows> {
            Ok(self.rows.clone())
        }
    }

    fn count_rows(count: &str) -> QueryRows {
        vec![vec![Some("_col0".to_string())], vec![Some(count.to_string())]]
    }

    #[tokio::test]
    async fn count_query_polls_until_success() {
        let engine = ScriptedEngine::with_states(&["QUEUED", "RUNNING", "SUCCEEDED"], count_rows("42"));
        let runner = QueryRunner::new(engine.clone(), "s3://athena-results/".to_string())
            .with_poll_interval(Duration::from_millis(1));

        let count = runner
            .run_count_query("SELECT COUNT(*) FROM \"db\".\"t\"", "db")
            .await
            .unwrap();

        assert_eq!(count, 42);
        assert!(engine.states.lock().await.is_empty());
        let started = engine.started.lock().await;
        assert_eq!(started[0].1, "db");
        assert_eq!(started[0].2, "s3://athena-results/");
    }

    #[tokio::test]
    async fn failed_query_reports_state_and_reason() {
        let engine = ScriptedEngine::with_states(&["RUNNING", "FAILED"], vec![]);
        let runner = QueryRunner::new(engine, "s3://athena-results/".to_string())
            .with_poll_interval(Duration::from_millis(1));

        let err = runner.run_query("SELECT 1", "db").await.unwrap_err();
        match err {
            OpsError::QueryFailed { state, reason, .. } => {
                assert_eq!(state, "FAILED");
                assert_eq!(reason, "SYNTAX_ERROR");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn max_polls_stops_waiting() {
        let engine = ScriptedEngine::with_states(&[], vec![]);
        let runner = QueryRunner::new(engine, "s3://athena-results/".to_string())
            .with_poll_interval(Duration::from_millis(1))
            .with_max_polls(Some(3));

        let err = runner.wait_for_completion("qid-1").await.unwrap_err();
        assert!(err.to_string().contains("after 3 status checks"));
    }

    #[test]
    fn parse_count_rejects_missing_or_bad_rows() {
        assert_eq!(parse_count(&count_rows(" 7 ")), Ok(7));
        assert!(parse_count(&vec![vec![Some("_col0".to_string())]]).is_err());
        assert!(parse_count(&vec![vec![], vec![None]]).is_err());
        assert!(parse_count(&count_rows("seven")).is_err());
    }
}
