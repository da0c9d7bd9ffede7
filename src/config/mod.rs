pub mod cli;
pub mod lambda;
pub mod toml_config;

use crate::utils::error::{OpsError, Result};
use crate::utils::validation::validate_required_field;
pub use toml_config::{OpsConfig, TablePair};

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// First value present among a command line flag and its config file
/// counterpart; `MissingConfigError` naming `field` when neither is set.
pub fn resolve(flag: Option<String>, file_value: Option<&String>, field: &str) -> Result<String> {
    let value = flag
        .or_else(|| file_value.cloned())
        .filter(|v| !v.trim().is_empty());
    validate_required_field(field, &value).cloned()
}

/// Command line list values replace the file list entirely when given.
pub fn resolve_list<T: Clone>(flag: Vec<T>, file_value: &[T], field: &str) -> Result<Vec<T>> {
    let values = if flag.is_empty() {
        file_value.to_vec()
    } else {
        flag
    };
    if values.is_empty() {
        return Err(OpsError::missing(field));
    }
    Ok(values)
}

/// Parse `left=right` into a table pair.
pub fn parse_table_pair(raw: &str) -> std::result::Result<TablePair, String> {
    match raw.split_once('=') {
        Some((left, right)) if !left.trim().is_empty() && !right.trim().is_empty() => {
            Ok(TablePair {
                left: left.trim().to_string(),
                right: right.trim().to_string(),
            })
        }
        _ => Err(format!("expected LEFT=RIGHT, got '{}'", raw)),
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "lakehouse-ops")]
#[command(about = "Operational tasks for the AWS data lake", version)]
pub struct CliConfig {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Named AWS profile
    #[arg(long, global = true)]
    pub profile: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check column types, nulls and primary-key uniqueness of a Glue table
    ValidateTable {
        #[arg(long)]
        database: Option<String>,
        #[arg(long)]
        table: Option<String>,
        /// s3:// prefix for Athena results
        #[arg(long)]
        output_location: Option<String>,
    },
    /// List CodeCommit repositories matching a search string, with branches
    ListRepos {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        report_file: Option<String>,
    },
    /// Show the open pull requests of one or more repositories
    ListPullRequests {
        #[arg(long = "repository")]
        repositories: Vec<String>,
    },
    /// Put a TLS-only deny policy on tagged project buckets
    EnforceSslPolicy {
        #[arg(long)]
        project: Option<String>,
        /// Candidate bucket; repeat for several
        #[arg(long = "bucket")]
        buckets: Vec<String>,
        #[arg(long)]
        report_file: Option<String>,
    },
    /// Remove the bucket policy of a bucket
    DeletePolicy {
        #[arg(long)]
        bucket: String,
    },
    /// Write SHOW CREATE TABLE output of every table in a database
    ExportDdl {
        #[arg(long)]
        database: Option<String>,
        #[arg(long)]
        output_dir: Option<String>,
        #[arg(long)]
        output_location: Option<String>,
    },
    /// Compare exported DDL files table by table
    DiffDdl {
        #[arg(long)]
        left_dir: Option<String>,
        #[arg(long)]
        right_dir: Option<String>,
        /// LEFT=RIGHT table names; repeat for several
        #[arg(long = "pair", value_parser = parse_table_pair)]
        pairs: Vec<TablePair>,
    },
    /// Convert a delimited text file to Parquet, locally or on S3
    CsvToParquet {
        #[arg(long)]
        input: Option<String>,
        /// Local path or s3://bucket/key
        #[arg(long)]
        destination: Option<String>,
        #[arg(long)]
        delimiter: Option<String>,
    },
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Load the TOML file named by `--config` (or an empty configuration)
    /// with the global AWS flags applied on top.
    pub fn load_file_config(&self) -> Result<OpsConfig> {
        let mut config = match &self.config {
            Some(path) => OpsConfig::from_file(path)?,
            None => OpsConfig::default(),
        };

        if let Some(region) = &self.region {
            config.aws.region = Some(region.clone());
        }
        if let Some(profile) = &self.profile {
            config.aws.profile = Some(profile.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_file() {
        let file = Some("from-file".to_string());
        assert_eq!(
            resolve(Some("from-flag".into()), file.as_ref(), "x").unwrap(),
            "from-flag"
        );
        assert_eq!(resolve(None, file.as_ref(), "x").unwrap(), "from-file");

        let err = resolve(None, None, "ddl.database").unwrap_err();
        assert!(matches!(err, OpsError::MissingConfigError { field } if field == "ddl.database"));
    }

    #[test]
    fn list_flags_replace_file_lists() {
        let file = vec!["a".to_string(), "b".to_string()];
        assert_eq!(resolve_list(vec!["c".to_string()], &file, "x").unwrap(), vec!["c"]);
        assert_eq!(resolve_list(Vec::new(), &file, "x").unwrap(), file);
        assert!(resolve_list::<String>(Vec::new(), &[], "x").is_err());
    }

    #[test]
    fn table_pairs_parse() {
        assert_eq!(
            parse_table_pair("tabla_1=tabla_1.1").unwrap(),
            TablePair {
                left: "tabla_1".into(),
                right: "tabla_1.1".into()
            }
        );
        assert!(parse_table_pair("tabla_1").is_err());
        assert!(parse_table_pair("=x").is_err());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = CliConfig::try_parse_from([
            "lakehouse-ops",
            "diff-ddl",
            "--pair",
            "tabla_1=tabla_1.1",
            "--region",
            "us-west-2",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.region.as_deref(), Some("us-west-2"));
        match &cli.command {
            Command::DiffDdl { pairs, .. } => assert_eq!(pairs[0].right, "tabla_1.1"),
            other => panic!("unexpected command {:?}", other),
        }

        let config = cli.load_file_config().unwrap();
        assert_eq!(config.aws.region.as_deref(), Some("us-west-2"));
    }
}
