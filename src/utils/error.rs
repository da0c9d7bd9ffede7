use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid event: {message}")]
    InvalidEvent { message: String },

    #[error("{service} {operation} failed{}: {message}", code_suffix(.code))]
    AwsServiceError {
        service: &'static str,
        operation: &'static str,
        code: Option<String>,
        message: String,
    },

    #[error("Athena query {query_execution_id} finished in state {state}: {reason}")]
    QueryFailed {
        query_execution_id: String,
        state: String,
        reason: String,
    },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, OpsError>;

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" ({c})"))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    CloudService,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Map any AWS SDK error into [`OpsError::AwsServiceError`], keeping the
/// service error code when the response carried one.
pub fn aws_error<E>(service: &'static str, operation: &'static str, err: E) -> OpsError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    OpsError::AwsServiceError {
        service,
        operation,
        code,
        message,
    }
}

impl OpsError {
    pub fn processing(message: impl Into<String>) -> Self {
        OpsError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn invalid_event(message: impl Into<String>) -> Self {
        OpsError::InvalidEvent {
            message: message.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        OpsError::MissingConfigError {
            field: field.into(),
        }
    }

    /// Service error code reported by AWS, if this is an SDK failure.
    pub fn aws_code(&self) -> Option<&str> {
        match self {
            OpsError::AwsServiceError { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            OpsError::ConfigError { .. }
            | OpsError::MissingConfigError { .. }
            | OpsError::InvalidConfigValueError { .. }
            | OpsError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            OpsError::InvalidEvent { .. } | OpsError::SerializationError(_) => {
                ErrorCategory::Input
            }
            OpsError::AwsServiceError { .. }
            | OpsError::QueryFailed { .. }
            | OpsError::HttpError(_) => ErrorCategory::CloudService,
            OpsError::CsvError(_)
            | OpsError::ArrowError(_)
            | OpsError::ParquetError(_)
            | OpsError::ProcessingError { .. }
            | OpsError::ValidationError { .. } => ErrorCategory::Data,
            OpsError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::CloudService => match self.aws_code() {
                Some("Throttling" | "ThrottlingException" | "SlowDown" | "RequestTimeout") => {
                    ErrorSeverity::Medium
                }
                _ => ErrorSeverity::High,
            },
            ErrorCategory::Configuration | ErrorCategory::Input | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            OpsError::MissingConfigError { .. } => {
                "Pass the value as a command-line flag or add it to the TOML configuration file"
            }
            OpsError::InvalidConfigValueError { .. }
            | OpsError::ConfigValidationError { .. }
            | OpsError::ConfigError { .. } => "Check the configuration values and try again",
            OpsError::InvalidEvent { .. } => {
                "Check that the invoking service sends the expected event shape"
            }
            OpsError::AwsServiceError { code, .. } => match code.as_deref() {
                Some("AccessDenied" | "AccessDeniedException") => {
                    "Check the IAM permissions of the credentials in use"
                }
                Some("MalformedPolicy") => {
                    "Check that every principal referenced in the policy exists"
                }
                Some("NoSuchBucket" | "EntityNotFoundException" | "RepositoryDoesNotExistException") => {
                    "Check the resource name and region"
                }
                _ => "Check the AWS credentials, region and service quotas",
            },
            OpsError::QueryFailed { .. } => "Inspect the query in the Athena console",
            OpsError::HttpError(_) => "Check network connectivity to the response endpoint",
            OpsError::IoError(_) => "Check file paths and permissions",
            OpsError::CsvError(_) => "Check the CSV delimiter, quoting and encoding",
            _ => "Check the logs for details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Unexpected input: {}", self),
            ErrorCategory::CloudService => format!("AWS call failed: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aws_error_display_includes_code() {
        let err = OpsError::AwsServiceError {
            service: "s3",
            operation: "PutBucketPolicy",
            code: Some("MalformedPolicy".to_string()),
            message: "Invalid principal".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "s3 PutBucketPolicy failed (MalformedPolicy): Invalid principal"
        );
        assert_eq!(err.aws_code(), Some("MalformedPolicy"));
        assert_eq!(err.category(), ErrorCategory::CloudService);
    }

    #[test]
    fn throttling_is_medium_severity() {
        let err = OpsError::AwsServiceError {
            service: "athena",
            operation: "GetQueryExecution",
            code: Some("ThrottlingException".to_string()),
            message: "Rate exceeded".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn missing_config_is_configuration_error() {
        let err = OpsError::missing("athena.output_location");
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("athena.output_location"));
    }
}
