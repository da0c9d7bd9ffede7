use crate::adapters::{
    load_sdk_config, AthenaQueryEngine, CodeCommitSource, GlueCatalog, S3Admin, S3Storage,
};
use crate::config::cli::LocalStorage;
use crate::config::{resolve, resolve_list, CliConfig, Command, OpsConfig};
use crate::core::bucket_policy::{malformed_policy_banner, policy_line, PolicyEnforcer};
use crate::core::data_quality::DataQualityChecker;
use crate::core::ddl::DdlExporter;
use crate::core::ddl_diff::compare_tables;
use crate::core::parquet_loader::{CsvOptions, ParquetLoader, DEFAULT_DELIMITER};
use crate::core::query::QueryRunner;
use crate::core::repositories::{
    render_pull_request, render_repository_report, RepositoryLister, DEFAULT_REPORT_FILE,
};
use crate::utils::error::{OpsError, Result};
use crate::utils::validation::{parse_s3_uri, validate_sql_identifier, validate_s3_uri, Validate};
use crate::core::PolicyReport;
use async_trait::async_trait;
use aws_config::SdkConfig;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_POLICY_REPORT_FILE: &str = "bucket_policies.txt";

/// Prints each enforcement result and appends applied policies to the
/// report file.
struct PolicyReportFile {
    file: tokio::fs::File,
}

impl PolicyReportFile {
    async fn append(path: &str) -> Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self { file })
    }
}

#[async_trait]
impl PolicyReport for PolicyReportFile {
    async fn policy_applied(&mut self, bucket: &str, policy: &Value) -> Result<()> {
        let line = policy_line(bucket, policy);
        println!("{}", line);
        self.file.write_all(line.as_bytes()).await?;
        self.file.write_all(b"\n").await?;
        self.file.flush().await?;
        Ok(())
    }

    async fn policy_rejected(&mut self, bucket: &str) -> Result<()> {
        println!("{}", bucket);
        println!("{}", malformed_policy_banner());
        Ok(())
    }
}

fn query_runner(config: &OpsConfig, sdk: &SdkConfig, output_location: String) -> QueryRunner<AthenaQueryEngine> {
    let mut runner = QueryRunner::new(
        AthenaQueryEngine::new(aws_sdk_athena::Client::new(sdk)),
        output_location,
    )
    .with_max_polls(config.athena.max_polls);

    if let Some(ms) = config.athena.poll_interval_ms {
        runner = runner.with_poll_interval(Duration::from_millis(ms));
    }
    runner
}

/// Run the selected subcommand. Task output goes to stdout; progress is
/// logged through `tracing`.
pub async fn run(cli: CliConfig) -> Result<()> {
    let config = cli.load_file_config()?;
    config.validate()?;

    match cli.command {
        Command::ValidateTable {
            database,
            table,
            output_location,
        } => {
            let database = resolve(database, config.data_quality.database.as_ref(), "data_quality.database")?;
            let table = resolve(table, config.data_quality.table.as_ref(), "data_quality.table")?;
            let output_location = resolve(
                output_location,
                config.athena.output_location.as_ref(),
                "athena.output_location",
            )?;
            validate_sql_identifier("database", &database)?;
            validate_sql_identifier("table", &table)?;
            validate_s3_uri("output_location", &output_location)?;

            let sdk = load_sdk_config(&config.aws).await;
            let checker = DataQualityChecker::new(
                GlueCatalog::new(aws_sdk_glue::Client::new(&sdk)),
                query_runner(&config, &sdk, output_location),
            );

            let report = checker.validate_table(&database, &table).await?;
            for line in report.lines() {
                println!("{}", line);
            }
            if report.all_passed() {
                tracing::info!("All checks passed for {}.{}", database, table);
            } else {
                tracing::warn!("Data quality issues found in {}.{}", database, table);
            }
        }

        Command::ListRepos {
            search,
            report_file,
        } => {
            let search = resolve(search, config.codecommit.search.as_ref(), "codecommit.search")?;
            let report_file = report_file
                .or(config.codecommit.report_file.clone())
                .unwrap_or_else(|| DEFAULT_REPORT_FILE.to_string());

            let sdk = load_sdk_config(&config.aws).await;
            let lister = RepositoryLister::new(CodeCommitSource::new(
                aws_sdk_codecommit::Client::new(&sdk),
            ));

            let repositories = lister.repositories_with_branches(&search).await?;
            let report = render_repository_report(&repositories);
            print!("{}", report);
            tokio::fs::write(&report_file, &report).await?;
            tracing::info!("Repository report written to {}", report_file);
        }

        Command::ListPullRequests { repositories } => {
            let repositories = resolve_list(
                repositories,
                &config.codecommit.repositories,
                "codecommit.repositories",
            )?;

            let sdk = load_sdk_config(&config.aws).await;
            let lister = RepositoryLister::new(CodeCommitSource::new(
                aws_sdk_codecommit::Client::new(&sdk),
            ));

            for repository in &repositories {
                for pull_request in lister.open_pull_requests(repository).await? {
                    print!("{}", render_pull_request(repository, &pull_request));
                }
            }
        }

        Command::EnforceSslPolicy {
            project,
            buckets,
            report_file,
        } => {
            let project = resolve(project, config.bucket_policy.project.as_ref(), "bucket_policy.project")?;
            let candidates = resolve_list(buckets, &config.bucket_policy.buckets, "bucket_policy.buckets")?;
            let report_file = report_file
                .or(config.bucket_policy.report_file.clone())
                .unwrap_or_else(|| DEFAULT_POLICY_REPORT_FILE.to_string());

            let sdk = load_sdk_config(&config.aws).await;
            let enforcer = PolicyEnforcer::new(S3Admin::new(aws_sdk_s3::Client::new(&sdk)));

            let selected = enforcer.select_buckets(&candidates, &project).await?;
            if selected.is_empty() {
                tracing::warn!("No candidate bucket is tagged project={}", project);
            }

            let mut sink = PolicyReportFile::append(&report_file).await?;
            let report = enforcer.enforce_ssl_only(&selected, &mut sink).await?;
            tracing::info!(
                "Policy applied to {} bucket(s), {} rejected; report appended to {}",
                report.applied.len(),
                report.rejected.len(),
                report_file
            );
        }

        Command::DeletePolicy { bucket } => {
            let sdk = load_sdk_config(&config.aws).await;
            let enforcer = PolicyEnforcer::new(S3Admin::new(aws_sdk_s3::Client::new(&sdk)));
            enforcer.delete_policy(&bucket).await?;
        }

        Command::ExportDdl {
            database,
            output_dir,
            output_location,
        } => {
            let database = resolve(database, config.ddl.database.as_ref(), "ddl.database")?;
            let output_dir = resolve(output_dir, config.ddl.output_dir.as_ref(), "ddl.output_dir")?;
            let output_location = resolve(
                output_location,
                config.athena.output_location.as_ref(),
                "athena.output_location",
            )?;
            validate_sql_identifier("database", &database)?;
            validate_s3_uri("output_location", &output_location)?;

            let sdk = load_sdk_config(&config.aws).await;
            let exporter = DdlExporter::new(
                GlueCatalog::new(aws_sdk_glue::Client::new(&sdk)),
                query_runner(&config, &sdk, output_location),
                LocalStorage::new(&output_dir),
            );

            let files = exporter.export_database(&database).await?;
            println!(
                "Exported {} table definitions from {} to {}",
                files.len(),
                database,
                output_dir
            );
        }

        Command::DiffDdl {
            left_dir,
            right_dir,
            pairs,
        } => {
            let left_dir = resolve(left_dir, config.ddl_diff.left_dir.as_ref(), "ddl_diff.left_dir")?;
            let right_dir = resolve(right_dir, config.ddl_diff.right_dir.as_ref(), "ddl_diff.right_dir")?;
            let pairs = resolve_list(pairs, &config.ddl_diff.pairs, "ddl_diff.pairs")?;

            for (index, pair) in pairs.iter().enumerate() {
                let comparison = compare_tables(
                    Path::new(&left_dir),
                    &pair.left,
                    Path::new(&right_dir),
                    &pair.right,
                )
                .await?;
                print!("{}", comparison.render(index + 1));
            }
        }

        Command::CsvToParquet {
            input,
            destination,
            delimiter,
        } => {
            let input = resolve(input, config.csv_loader.input.as_ref(), "csv_loader.input")?;
            let destination = resolve(
                destination,
                config.csv_loader.destination.as_ref(),
                "csv_loader.destination",
            )?;
            let options = CsvOptions {
                delimiter: delimiter
                    .or(config.csv_loader.delimiter.clone())
                    .unwrap_or_else(|| DEFAULT_DELIMITER.to_string()),
                ..Default::default()
            };

            let csv_bytes = tokio::fs::read(&input).await?;

            let rows = if destination.starts_with("s3://") {
                let (bucket, key) = parse_s3_uri("destination", &destination)?;
                if key.is_empty() {
                    return Err(OpsError::InvalidConfigValueError {
                        field: "destination".to_string(),
                        value: destination,
                        reason: "S3 destination must name an object key".to_string(),
                    });
                }
                let sdk = load_sdk_config(&config.aws).await;
                let storage = S3Storage::new(aws_sdk_s3::Client::new(&sdk), bucket);
                ParquetLoader::new(storage, options).load(&csv_bytes, &key).await?
            } else {
                ParquetLoader::new(LocalStorage::new("."), options)
                    .load(&csv_bytes, &destination)
                    .await?
            };

            println!("Parquet file written to {} ({} rows)", destination, rows);
        }
    }

    Ok(())
}
