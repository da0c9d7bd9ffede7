use crate::adapters::session::AwsSettings;
use crate::utils::error::{OpsError, Result};
use crate::utils::validation::{
    validate_aws_region, validate_non_empty_string, validate_path, validate_positive_number,
    validate_s3_bucket_name, validate_s3_uri, validate_sql_identifier, Validate,
};
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

/// Settings shared by the CLI tasks, loaded from a TOML file. Every section
/// is optional; command line flags take precedence over file values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpsConfig {
    #[serde(default)]
    pub aws: AwsSettings,
    #[serde(default)]
    pub athena: AthenaSection,
    #[serde(default)]
    pub data_quality: DataQualitySection,
    #[serde(default)]
    pub codecommit: CodeCommitSection,
    #[serde(default)]
    pub bucket_policy: BucketPolicySection,
    #[serde(default)]
    pub ddl: DdlSection,
    #[serde(default)]
    pub ddl_diff: DdlDiffSection,
    #[serde(default)]
    pub csv_loader: CsvLoaderSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AthenaSection {
    /// `s3://` prefix for query results.
    pub output_location: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub max_polls: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataQualitySection {
    pub database: Option<String>,
    pub table: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeCommitSection {
    pub search: Option<String>,
    pub report_file: Option<String>,
    /// Repositories whose open pull requests are listed.
    #[serde(default)]
    pub repositories: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BucketPolicySection {
    pub project: Option<String>,
    #[serde(default)]
    pub buckets: Vec<String>,
    pub report_file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DdlSection {
    pub database: Option<String>,
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DdlDiffSection {
    pub left_dir: Option<String>,
    pub right_dir: Option<String>,
    #[serde(default)]
    pub pairs: Vec<TablePair>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TablePair {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CsvLoaderSection {
    pub input: Option<String>,
    pub destination: Option<String>,
    pub delimiter: Option<String>,
}

fn env_placeholder() -> &'static regex::Regex {
    static PLACEHOLDER: OnceLock<regex::Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex")
    })
}

impl OpsConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| OpsError::ConfigError {
            message: format!("Cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| OpsError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the environment value. Unset variables are
    /// left as written so validation can point at them.
    fn substitute_env_vars(content: &str) -> String {
        env_placeholder()
            .replace_all(content, |caps: &regex::Captures| {
                std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
            })
            .into_owned()
    }
}

impl Validate for OpsConfig {
    fn validate(&self) -> Result<()> {
        if let Some(region) = &self.aws.region {
            validate_aws_region("aws.region", region)?;
        }
        if self.aws.access_key_id.is_some() != self.aws.secret_access_key.is_some() {
            return Err(OpsError::ConfigValidationError {
                field: "aws".to_string(),
                message: "access_key_id and secret_access_key must be set together".to_string(),
            });
        }

        if let Some(location) = &self.athena.output_location {
            validate_s3_uri("athena.output_location", location)?;
        }
        if let Some(interval) = self.athena.poll_interval_ms {
            validate_positive_number("athena.poll_interval_ms", interval, 1)?;
        }
        if let Some(max_polls) = self.athena.max_polls {
            validate_positive_number("athena.max_polls", u64::from(max_polls), 1)?;
        }

        if let Some(database) = &self.data_quality.database {
            validate_sql_identifier("data_quality.database", database)?;
        }
        if let Some(table) = &self.data_quality.table {
            validate_sql_identifier("data_quality.table", table)?;
        }

        for bucket in &self.bucket_policy.buckets {
            validate_s3_bucket_name("bucket_policy.buckets", bucket)?;
        }
        if let Some(project) = &self.bucket_policy.project {
            validate_non_empty_string("bucket_policy.project", project)?;
        }

        if let Some(database) = &self.ddl.database {
            validate_sql_identifier("ddl.database", database)?;
        }
        if let Some(dir) = &self.ddl.output_dir {
            validate_path("ddl.output_dir", dir)?;
        }

        for pair in &self.ddl_diff.pairs {
            validate_non_empty_string("ddl_diff.pairs.left", &pair.left)?;
            validate_non_empty_string("ddl_diff.pairs.right", &pair.right)?;
        }

        if let Some(delimiter) = &self.csv_loader.delimiter {
            validate_non_empty_string("csv_loader.delimiter", delimiter)?;
        }

        tracing::debug!("Configuration file validation passed");
        Ok(())
    }
}
