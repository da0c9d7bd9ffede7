use crate::core::{JobRunner, Result};
use crate::domain::model::{JobRunRequest, JobRunSubmission};
use crate::utils::error::{aws_error, OpsError};
use async_trait::async_trait;
use aws_sdk_emrserverless::types::{JobDriver, SparkSubmit};
use aws_sdk_emrserverless::Client as EmrServerlessClient;

const SERVICE: &str = "emr-serverless";

#[derive(Debug, Clone)]
pub struct EmrServerlessRunner {
    client: EmrServerlessClient,
}

impl EmrServerlessRunner {
    pub fn new(client: EmrServerlessClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobRunner for EmrServerlessRunner {
    async fn start_job_run(&self, request: &JobRunRequest) -> Result<JobRunSubmission> {
        let spark_submit = SparkSubmit::builder()
            .entry_point(&request.entry_point)
            .set_entry_point_arguments(Some(request.entry_point_arguments.clone()))
            .spark_submit_parameters(&request.spark_submit_parameters)
            .build()
            .map_err(|e| OpsError::processing(format!("Invalid Spark submit driver: {}", e)))?;

        let output = self
            .client
            .start_job_run()
            .application_id(&request.application_id)
            .client_token(&request.client_token)
            .execution_role_arn(&request.execution_role_arn)
            .job_driver(JobDriver::SparkSubmit(spark_submit))
            .execution_timeout_minutes(request.execution_timeout_minutes)
            .set_name(request.name.clone())
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "StartJobRun", e))?;

        Ok(JobRunSubmission {
            application_id: output.application_id().to_string(),
            job_run_id: output.job_run_id().to_string(),
            arn: output.arn().to_string(),
            final_state: None,
        })
    }

    async fn job_run_state(&self, application_id: &str, job_run_id: &str) -> Result<String> {
        let output = self
            .client
            .get_job_run()
            .application_id(application_id)
            .job_run_id(job_run_id)
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "GetJobRun", e))?;

        output
            .job_run()
            .map(|run| run.state().as_str().to_string())
            .ok_or_else(|| OpsError::processing(format!("Job run {} not returned", job_run_id)))
    }
}
