//! Serde shapes of the AWS payloads the tasks read and write.
//!
//! Field names follow the JSON the services use on the wire (PascalCase for
//! S3 and CloudFormation, camelCase for Lambda event envelopes) so that the
//! same types can be logged, sent and compared without conversion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// S3 bucket notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationConfiguration {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topic_configurations: Vec<TopicConfiguration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queue_configurations: Vec<QueueConfiguration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lambda_function_configurations: Vec<LambdaFunctionConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_bridge_configuration: Option<EventBridgeConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TopicConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub topic_arn: String,
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<NotificationFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueueConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub queue_arn: String,
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<NotificationFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LambdaFunctionConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lambda_function_arn: String,
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<NotificationFilter>,
}

/// Presence alone enables EventBridge delivery; the section has no fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBridgeConfiguration {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationFilter {
    #[serde(default)]
    pub key: KeyFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyFilter {
    #[serde(default)]
    pub filter_rules: Vec<FilterRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilterRule {
    pub name: String,
    pub value: String,
}

/// Notification entries are matched across configurations by their `Id`.
pub trait Identified {
    fn id(&self) -> Option<&str>;
}

impl Identified for TopicConfiguration {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Identified for QueueConfiguration {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Identified for LambdaFunctionConfiguration {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

// ---------------------------------------------------------------------------
// CloudFormation custom resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceRequest {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    /// Kept as raw JSON so a malformed property still leaves an envelope
    /// that can be answered.
    #[serde(default)]
    pub resource_properties: Value,
}

impl CustomResourceRequest {
    pub fn notification_properties(&self) -> serde_json::Result<NotificationResourceProperties> {
        NotificationResourceProperties::deserialize(&self.resource_properties)
    }

    pub fn bucket_name(&self) -> Option<&str> {
        self.resource_properties
            .get("BucketName")
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationResourceProperties {
    #[serde(default)]
    pub service_token: Option<String>,
    pub bucket_name: String,
    #[serde(default)]
    pub notification_configuration: NotificationConfiguration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
}

// ---------------------------------------------------------------------------
// Glue / Athena
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: String,
    pub is_primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDefinition {
    pub database: String,
    pub name: String,
    /// `None` when the table has no storage descriptor at all.
    pub columns: Option<Vec<ColumnDefinition>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Unknown(String),
}

impl QueryState {
    pub fn parse(state: &str) -> Self {
        match state {
            "QUEUED" => QueryState::Queued,
            "RUNNING" => QueryState::Running,
            "SUCCEEDED" => QueryState::Succeeded,
            "FAILED" => QueryState::Failed,
            "CANCELLED" => QueryState::Cancelled,
            other => QueryState::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryState::Succeeded | QueryState::Failed | QueryState::Cancelled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            QueryState::Queued => "QUEUED",
            QueryState::Running => "RUNNING",
            QueryState::Succeeded => "SUCCEEDED",
            QueryState::Failed => "FAILED",
            QueryState::Cancelled => "CANCELLED",
            QueryState::Unknown(state) => state,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryStatus {
    pub state: QueryState,
    pub reason: Option<String>,
}

/// Athena result rows, one `Option<String>` per cell.
pub type QueryRows = Vec<Vec<Option<String>>>;

// ---------------------------------------------------------------------------
// CodeCommit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequestSummary {
    pub pull_request_id: String,
    pub title: String,
    pub author_arn: Option<String>,
    pub last_activity_date: Option<DateTime<Utc>>,
    pub creation_date: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// S3 bucket policies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketTag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketPolicy {
    pub version: String,
    pub id: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub sid: String,
    pub effect: String,
    pub principal: Value,
    pub action: Value,
    pub resource: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

// ---------------------------------------------------------------------------
// Lambda event envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    #[serde(rename = "eventName", default)]
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SqsRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqsRecord {
    #[serde(rename = "messageId", default)]
    pub message_id: Option<String>,
    pub body: String,
    #[serde(rename = "eventSource", default)]
    pub event_source: Option<String>,
}

/// `{statusCode, body}` result returned by the relay and trigger functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Hudi / EMR Serverless job specs
// ---------------------------------------------------------------------------

/// Job spec carried from the relay to the EMR trigger inside the SQS message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmrEvent {
    #[serde(default)]
    pub jar: Vec<String>,
    #[serde(default)]
    pub spark_submit_parameters: Vec<String>,
    /// Ordered: entry point arguments are emitted in this order.
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(default)]
    pub job: JobSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "ApplicationId", default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(rename = "ExecutionTime", default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<i32>,
    #[serde(rename = "JobActive", default, skip_serializing_if = "Option::is_none")]
    pub job_active: Option<bool>,
    #[serde(rename = "JobStatusPolling", default, skip_serializing_if = "Option::is_none")]
    pub job_status_polling: Option<bool>,
    #[serde(rename = "JobDescription", default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(rename = "ExecutionArn", default, skip_serializing_if = "Option::is_none")]
    pub execution_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub s3_folder: String,
    pub target_table: String,
    pub emr_event: EmrEvent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRunRequest {
    pub application_id: String,
    pub execution_role_arn: String,
    pub client_token: String,
    pub name: Option<String>,
    pub entry_point: String,
    pub entry_point_arguments: Vec<String>,
    pub spark_submit_parameters: String,
    pub execution_timeout_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRunSubmission {
    pub application_id: String,
    pub job_run_id: String,
    pub arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_state: Option<String>,
}
