use crate::domain::model::{
    BucketTag, CustomResourceResponse, JobRunRequest, JobRunSubmission, NotificationConfiguration,
    PullRequestSummary, QueryRows, QueryStatus, TableDefinition,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn get_notification_configuration(
        &self,
        bucket: &str,
    ) -> Result<NotificationConfiguration>;
    async fn put_notification_configuration(
        &self,
        bucket: &str,
        configuration: &NotificationConfiguration,
    ) -> Result<()>;
}

/// Delivers the outcome of a custom resource request back to CloudFormation.
#[async_trait]
pub trait ResponseSender: Send + Sync {
    /// Returns the HTTP status code of the delivery.
    async fn send(&self, response_url: &str, response: &CustomResourceResponse) -> Result<u16>;
}

#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn start_query(
        &self,
        query: &str,
        database: &str,
        output_location: &str,
    ) -> Result<String>;
    async fn query_status(&self, query_execution_id: &str) -> Result<QueryStatus>;
    async fn query_results(&self, query_execution_id: &str) -> Result<QueryRows>;
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_table(&self, database: &str, table: &str) -> Result<TableDefinition>;
    async fn list_tables(&self, database: &str) -> Result<Vec<String>>;
}

#[async_trait]
pub trait SourceControl: Send + Sync {
    async fn list_repositories(&self) -> Result<Vec<String>>;
    async fn list_branches(&self, repository: &str) -> Result<Vec<String>>;
    async fn list_open_pull_requests(&self, repository: &str) -> Result<Vec<String>>;
    async fn get_pull_request(&self, pull_request_id: &str) -> Result<PullRequestSummary>;
}

#[async_trait]
pub trait BucketAdmin: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<String>>;
    /// Empty when the bucket has no tag set.
    async fn bucket_tags(&self, bucket: &str) -> Result<Vec<BucketTag>>;
    async fn put_policy(&self, bucket: &str, policy: &str) -> Result<()>;
    async fn get_policy(&self, bucket: &str) -> Result<String>;
    async fn delete_policy(&self, bucket: &str) -> Result<()>;
}

/// Receives per-bucket enforcement results as soon as each bucket is done.
#[async_trait]
pub trait PolicyReport: Send {
    async fn policy_applied(&mut self, bucket: &str, policy: &serde_json::Value) -> Result<()>;
    async fn policy_rejected(&mut self, bucket: &str) -> Result<()>;
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Sends to a FIFO queue and returns the message id.
    async fn send_fifo_message(
        &self,
        queue_url: &str,
        body: &str,
        message_group_id: &str,
    ) -> Result<String>;
}

#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn start_job_run(&self, request: &JobRunRequest) -> Result<JobRunSubmission>;
    async fn job_run_state(&self, application_id: &str, job_run_id: &str) -> Result<String>;
}
