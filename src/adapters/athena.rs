use crate::core::{QueryEngine, Result};
use crate::domain::model::{QueryRows, QueryState, QueryStatus};
use crate::utils::error::{aws_error, OpsError};
use async_trait::async_trait;
use aws_sdk_athena::types::{QueryExecutionContext, ResultConfiguration};
use aws_sdk_athena::Client as AthenaClient;

const SERVICE: &str = "athena";

#[derive(Debug, Clone)]
pub struct AthenaQueryEngine {
    client: AthenaClient,
}

impl AthenaQueryEngine {
    pub fn new(client: AthenaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryEngine for AthenaQueryEngine {
    async fn start_query(
        &self,
        query: &str,
        database: &str,
        output_location: &str,
    ) -> Result<String> {
        let output = self
            .client
            .start_query_execution()
            .query_string(query)
            .query_execution_context(QueryExecutionContext::builder().database(database).build())
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(output_location)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "StartQueryExecution", e))?;

        output
            .query_execution_id()
            .map(str::to_string)
            .ok_or_else(|| OpsError::processing("Athena returned no query execution id"))
    }

    async fn query_status(&self, query_execution_id: &str) -> Result<QueryStatus> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(query_execution_id)
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "GetQueryExecution", e))?;

        let status = output.query_execution().and_then(|q| q.status());
        Ok(QueryStatus {
            state: status
                .and_then(|s| s.state())
                .map(|s| QueryState::parse(s.as_str()))
                .unwrap_or(QueryState::Queued),
            reason: status
                .and_then(|s| s.state_change_reason())
                .map(str::to_string),
        })
    }

    async fn query_results(&self, query_execution_id: &str) -> Result<QueryRows> {
        let mut pages = self
            .client
            .get_query_results()
            .query_execution_id(query_execution_id)
            .into_paginator()
            .send();

        let mut rows = QueryRows::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| aws_error(SERVICE, "GetQueryResults", e))?;
            let Some(result_set) = page.result_set() else {
                continue;
            };
            rows.extend(result_set.rows().iter().map(|row| {
                row.data()
                    .iter()
                    .map(|datum| datum.var_char_value().map(str::to_string))
                    .collect()
            }));
        }

        Ok(rows)
    }
}
