use crate::core::{Result, SourceControl};
use crate::domain::model::PullRequestSummary;
use crate::utils::error::{aws_error, OpsError};
use async_trait::async_trait;
use aws_sdk_codecommit::primitives::DateTime as SmithyDateTime;
use aws_sdk_codecommit::types::PullRequestStatusEnum;
use aws_sdk_codecommit::Client as CodeCommitClient;
use chrono::{DateTime, Utc};

const SERVICE: &str = "codecommit";

#[derive(Debug, Clone)]
pub struct CodeCommitSource {
    client: CodeCommitClient,
}

impl CodeCommitSource {
    pub fn new(client: CodeCommitClient) -> Self {
        Self { client }
    }
}

fn to_chrono(date: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(date.secs(), date.subsec_nanos())
}

#[async_trait]
impl SourceControl for CodeCommitSource {
    async fn list_repositories(&self) -> Result<Vec<String>> {
        let mut pages = self.client.list_repositories().into_paginator().send();

        let mut names = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| aws_error(SERVICE, "ListRepositories", e))?;
            names.extend(
                page.repositories()
                    .iter()
                    .filter_map(|r| r.repository_name().map(str::to_string)),
            );
        }
        Ok(names)
    }

    async fn list_branches(&self, repository: &str) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .list_branches()
            .repository_name(repository)
            .into_paginator()
            .send();

        let mut branches = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| aws_error(SERVICE, "ListBranches", e))?;
            branches.extend(page.branches().iter().cloned());
        }
        Ok(branches)
    }

    async fn list_open_pull_requests(&self, repository: &str) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .list_pull_requests()
            .repository_name(repository)
            .pull_request_status(PullRequestStatusEnum::Open)
            .into_paginator()
            .send();

        let mut ids = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| aws_error(SERVICE, "ListPullRequests", e))?;
            ids.extend(page.pull_request_ids().iter().cloned());
        }
        Ok(ids)
    }

    async fn get_pull_request(&self, pull_request_id: &str) -> Result<PullRequestSummary> {
        let output = self
            .client
            .get_pull_request()
            .pull_request_id(pull_request_id)
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "GetPullRequest", e))?;

        let pull_request = output.pull_request().ok_or_else(|| {
            OpsError::processing(format!("Pull request {} not returned", pull_request_id))
        })?;

        Ok(PullRequestSummary {
            pull_request_id: pull_request_id.to_string(),
            title: pull_request.title().unwrap_or_default().to_string(),
            author_arn: pull_request.author_arn().map(str::to_string),
            last_activity_date: pull_request.last_activity_date().and_then(to_chrono),
            creation_date: pull_request.creation_date().and_then(to_chrono),
        })
    }
}
