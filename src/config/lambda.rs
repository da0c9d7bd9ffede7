//! Environment configuration of the Lambda entry points.
//!
//! Each config is built from a key lookup so tests can supply a map
//! instead of mutating the process environment.

use crate::adapters::session::AwsSettings;
use crate::core::emr_jobs::{TriggerSettings, JOB_POLL_INTERVAL};
use crate::core::s3_relay::{RelaySettings, DEFAULT_TARGET_DATABASE};
use crate::utils::error::{OpsError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_range,
    validate_s3_bucket_name, validate_sql_identifier, validate_url, Validate,
};
use std::time::Duration;

const UNKNOWN_LOG_STREAM: &str = "unknown";
const DEFAULT_CREATED_BY: &str = "s3-event-relay";

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| OpsError::ConfigError {
            message: format!("{} environment variable is required", key),
        })
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[derive(Debug, Clone)]
pub struct NotificationLambdaConfig {
    pub log_stream_name: String,
}

impl NotificationLambdaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            log_stream_name: lookup("AWS_LAMBDA_LOG_STREAM_NAME")
                .unwrap_or_else(|| UNKNOWN_LOG_STREAM.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub queue_url: String,
    pub artifactory_bucket: String,
    pub stage_bucket: String,
    pub target_database: String,
    pub emr_application_id: String,
    pub emr_execution_role_arn: String,
    pub created_by: String,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            queue_url: required(&lookup, "SQS_QUEUE_URL")?,
            artifactory_bucket: required(&lookup, "ARTIFACTORY_BUCKET_NAME")?,
            stage_bucket: required(&lookup, "STAGE_BUCKET_NAME")?,
            target_database: lookup("TARGET_DATABASE")
                .unwrap_or_else(|| DEFAULT_TARGET_DATABASE.to_string()),
            emr_application_id: required(&lookup, "EMR_APPLICATION_ID")?,
            emr_execution_role_arn: required(&lookup, "EMR_EXECUTION_ROLE_ARN")?,
            created_by: lookup("CREATED_BY").unwrap_or_else(|| DEFAULT_CREATED_BY.to_string()),
        })
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            queue_url: self.queue_url.clone(),
            artifactory_bucket: self.artifactory_bucket.clone(),
            stage_bucket: self.stage_bucket.clone(),
            target_database: self.target_database.clone(),
            emr_application_id: self.emr_application_id.clone(),
            emr_execution_role_arn: self.emr_execution_role_arn.clone(),
            created_by: self.created_by.clone(),
        }
    }
}

impl Validate for RelayConfig {
    fn validate(&self) -> Result<()> {
        validate_url("SQS_QUEUE_URL", &self.queue_url)?;
        validate_s3_bucket_name("ARTIFACTORY_BUCKET_NAME", &self.artifactory_bucket)?;
        validate_s3_bucket_name("STAGE_BUCKET_NAME", &self.stage_bucket)?;
        validate_sql_identifier("TARGET_DATABASE", &self.target_database)?;
        validate_non_empty_string("CREATED_BY", &self.created_by)?;

        tracing::info!("✅ Relay configuration validation passed");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EmrTriggerConfig {
    pub application_id: String,
    pub execution_role_arn: String,
    pub poll_interval_seconds: u64,
    /// Optional `DEV_*` overrides for the EMR Serverless client.
    pub aws: AwsSettings,
}

impl EmrTriggerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let poll_interval_seconds = match lookup("JOB_POLL_INTERVAL_SECONDS") {
            Some(raw) => raw.parse().map_err(|_| OpsError::InvalidConfigValueError {
                field: "JOB_POLL_INTERVAL_SECONDS".to_string(),
                value: raw.clone(),
                reason: "must be a whole number of seconds".to_string(),
            })?,
            None => JOB_POLL_INTERVAL.as_secs(),
        };

        Ok(Self {
            application_id: required(&lookup, "EMR_APPLICATION_ID")?,
            execution_role_arn: required(&lookup, "EMR_EXECUTION_ROLE_ARN")?,
            poll_interval_seconds,
            aws: AwsSettings {
                region: lookup("DEV_REGION"),
                profile: None,
                access_key_id: lookup("DEV_ACCESS_KEY"),
                secret_access_key: lookup("DEV_SECRET_KEY"),
                session_token: None,
            },
        })
    }

    pub fn trigger_settings(&self) -> TriggerSettings {
        TriggerSettings::new(self.application_id.clone(), self.execution_role_arn.clone())
            .with_poll_interval(Duration::from_secs(self.poll_interval_seconds))
    }
}

impl Validate for EmrTriggerConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("EMR_APPLICATION_ID", &self.application_id)?;
        validate_non_empty_string("EMR_EXECUTION_ROLE_ARN", &self.execution_role_arn)?;
        validate_range("JOB_POLL_INTERVAL_SECONDS", self.poll_interval_seconds, 1, 300)?;

        tracing::info!("✅ EMR trigger configuration validation passed");
        Ok(())
    }
}
