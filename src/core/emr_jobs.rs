use crate::core::{JobRunner, Result};
use crate::domain::model::{
    EmrEvent, JobRunRequest, JobRunSubmission, LambdaResponse, SqsEvent, SqsRecord,
};
use crate::utils::error::OpsError;
use serde_json::{json, Map, Value};
use std::time::Duration;

pub const SPARK_ENTRY_POINT: &str = "local:///usr/lib/spark/examples/jars/spark-examples.jar";
pub const DEFAULT_EXECUTION_TIMEOUT_MINUTES: i64 = 600;
pub const JOB_POLL_INTERVAL: Duration = Duration::from_secs(5);
const TERMINAL_JOB_STATES: [&str; 3] = ["CANCELLED", "FAILED", "SUCCESS"];
const HOODIE_CONF: &str = "hoodie-conf";

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSettings {
    pub default_application_id: String,
    pub default_execution_role_arn: String,
    pub poll_interval: Duration,
}

impl TriggerSettings {
    pub fn new(default_application_id: String, default_execution_role_arn: String) -> Self {
        Self {
            default_application_id,
            default_execution_role_arn,
            poll_interval: JOB_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// The `emr_event` section of a relay message carried in an SQS body.
pub fn extract_emr_event(record: &SqsRecord) -> Result<EmrEvent> {
    let preview: String = record.body.chars().take(100).collect();
    tracing::debug!("Raw body: {}...", preview);

    let mut body: Value = serde_json::from_str(&record.body).map_err(|e| {
        OpsError::invalid_event(format!("Failed to parse SQS record body: {}", e))
    })?;
    let section = body
        .get_mut("emr_event")
        .map(Value::take)
        .ok_or_else(|| OpsError::invalid_event("SQS record body has no emr_event"))?;

    let event = serde_json::from_value(section).map_err(|e| {
        OpsError::invalid_event(format!("Failed to parse emr_event from SQS record: {}", e))
    })?;
    tracing::info!("Extracted emr_event successfully");
    Ok(event)
}

pub fn spark_submit_parameters(event: &EmrEvent) -> String {
    format!(
        "--conf spark.jars={} {}",
        event.jar.join(","),
        event.spark_submit_parameters.join(" ")
    )
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Spark-submit style arguments, in the order of the `arguments` map.
///
/// `hoodie-conf` expands into one `--hoodie-conf key=value` pair per entry,
/// `true` becomes a bare `--flag`, `false` and `null` are dropped.
pub fn flatten_arguments(arguments: &Map<String, Value>) -> Vec<String> {
    let mut flat = Vec::new();

    for (key, value) in arguments {
        match value {
            Value::Object(conf) if key == HOODIE_CONF => {
                for (conf_key, conf_value) in conf {
                    flat.push(format!("--{}", HOODIE_CONF));
                    flat.push(format!("{}={}", conf_key, render_value(conf_value)));
                }
            }
            Value::Bool(true) => flat.push(format!("--{}", key)),
            Value::Bool(false) | Value::Null => {}
            other => {
                flat.push(format!("--{}", key));
                flat.push(render_value(other));
            }
        }
    }

    flat
}

pub fn build_job_run_request(event: &EmrEvent, settings: &TriggerSettings) -> JobRunRequest {
    let job = &event.job;
    JobRunRequest {
        application_id: job
            .application_id
            .clone()
            .unwrap_or_else(|| settings.default_application_id.clone()),
        execution_role_arn: job
            .execution_arn
            .clone()
            .unwrap_or_else(|| settings.default_execution_role_arn.clone()),
        client_token: uuid::Uuid::new_v4().to_string(),
        name: job.job_name.clone(),
        entry_point: SPARK_ENTRY_POINT.to_string(),
        entry_point_arguments: flatten_arguments(&event.arguments),
        spark_submit_parameters: spark_submit_parameters(event),
        execution_timeout_minutes: job
            .execution_time
            .map(i64::from)
            .unwrap_or(DEFAULT_EXECUTION_TIMEOUT_MINUTES),
    }
}

/// Submits the Hudi jobs carried by SQS messages to EMR Serverless.
pub struct EmrJobTrigger<J: JobRunner> {
    runner: J,
    settings: TriggerSettings,
}

impl<J: JobRunner> EmrJobTrigger<J> {
    pub fn new(runner: J, settings: TriggerSettings) -> Self {
        Self { runner, settings }
    }

    pub async fn submit(&self, event: &EmrEvent) -> Result<JobRunSubmission> {
        let request = build_job_run_request(event, &self.settings);
        tracing::debug!(
            "Prepared {} entry point arguments for job {:?}",
            request.entry_point_arguments.len(),
            request.name
        );

        tracing::info!("Submitting job: {}", request.name.as_deref().unwrap_or("<unnamed>"));
        let mut submission = self.runner.start_job_run(&request).await?;
        tracing::info!("Job submitted with run ID: {}", submission.job_run_id);

        if event.job.job_status_polling == Some(true) {
            submission.final_state = Some(self.wait_for_job(&submission).await?);
        }

        Ok(submission)
    }

    async fn wait_for_job(&self, submission: &JobRunSubmission) -> Result<String> {
        loop {
            let state = self
                .runner
                .job_run_state(&submission.application_id, &submission.job_run_id)
                .await?;
            tracing::info!("Job status: {}", state);

            if TERMINAL_JOB_STATES.contains(&state.as_str()) {
                return Ok(state);
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn process(&self, event: &SqsEvent) -> Result<Vec<JobRunSubmission>> {
        let mut submissions = Vec::with_capacity(event.records.len());
        for record in &event.records {
            let emr_event = extract_emr_event(record)?;
            submissions.push(self.submit(&emr_event).await?);
        }
        Ok(submissions)
    }

    /// Submit every record's job. Failures are reported in the response
    /// body with status 500 rather than as an invocation error.
    pub async fn handle(&self, event: &SqsEvent) -> LambdaResponse {
        tracing::info!("Lambda handler invoked with {} records", event.records.len());

        let result = self
            .process(event)
            .await
            .and_then(|submissions| Ok(serde_json::to_string(&submissions)?));

        match result {
            Ok(body) => LambdaResponse {
                status_code: 200,
                body,
            },
            Err(e) => {
                tracing::error!("An error occurred during job execution: {}", e);
                LambdaResponse {
                    status_code: 500,
                    body: json!({ "error": e.to_string() }).to_string(),
                }
            }
        }
    }
}
