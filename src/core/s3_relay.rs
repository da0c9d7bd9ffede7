use crate::core::{MessageQueue, Result, Storage};
use crate::domain::model::{EmrEvent, JobSpec, LambdaResponse, RelayMessage, S3Event, S3EventRecord};
use crate::utils::error::OpsError;
use serde_json::{Map, Value};

pub const DEFAULT_MESSAGE_GROUP: &str = "default_group";
pub const HUDI_PROPS_PREFIX: &str = "props";
pub const DEFAULT_TARGET_DATABASE: &str = "guay_jocker_db";
pub const DEFAULT_EXECUTION_TIME_MINUTES: i32 = 600;

const HUDI_JARS: [&str; 3] = [
    "hudi-aws-bundle-0.14.1.jar",
    "hudi-utilities-slim-bundle_2.12-0.14.1.jar",
    "hudi-spark3.4-bundle_2.12-0.14.1.jar",
];

const SPARK_SUBMIT_PARAMETERS: [&str; 9] = [
    "--conf spark.serializer=org.apache.spark.serializer.KryoSerializer",
    "--conf spark.sql.extensions=org.apache.spark.sql.hudi.HoodieSparkSessionExtension",
    "--conf spark.sql.catalog.spark_catalog=org.apache.spark.sql.hudi.catalog.HoodieCatalog",
    "--conf spark.sql.hive.convertMetastoreParquet=false",
    "--conf spark.driver.memory=2g",
    "--conf spark.executor.memory=3g",
    "--conf spark.executor.cores=2",
    "--conf spark.executor.instances=1",
    "--class org.apache.hudi.utilities.streamer.HoodieStreamer",
];

const JOB_DESCRIPTION: &str = "Ingest data from parquet source (MySQL data)";

#[derive(Debug, Clone, PartialEq)]
pub struct RelaySettings {
    pub queue_url: String,
    pub artifactory_bucket: String,
    pub stage_bucket: String,
    pub target_database: String,
    pub emr_application_id: String,
    pub emr_execution_role_arn: String,
    pub created_by: String,
}

/// Second segment of the key, which names the target table in the raw
/// bucket layout (`<source>/<table>/<date>/<file>`).
pub fn message_group_id(key: &str) -> &str {
    match key.split('/').nth(1) {
        Some(segment) if !segment.is_empty() => segment,
        _ => DEFAULT_MESSAGE_GROUP,
    }
}

/// `s3://<bucket>/<key without its file name>/`
pub fn folder_uri(bucket: &str, key: &str) -> String {
    match key.rsplit_once('/') {
        Some((folder, _)) => format!("s3://{}/{}/", bucket, folder),
        None => format!("s3://{}/", bucket),
    }
}

/// Name of the folder directly containing the object, the partition date in
/// the raw layout.
pub fn partition_folder(key: &str) -> Result<&str> {
    let (folder, _) = key
        .rsplit_once('/')
        .ok_or_else(|| OpsError::invalid_event(format!("object key '{}' has no folder", key)))?;
    Ok(folder.rsplit('/').next().unwrap_or(folder))
}

pub fn queue_url_for(base_url: &str, message_group_id: &str) -> String {
    format!(
        "{}/sdlf-analytics-{}_queue.fifo",
        base_url.trim_end_matches('/'),
        message_group_id
    )
}

pub fn hudi_template_key(table: &str) -> String {
    format!("{}/templates/hudi_{}.props", HUDI_PROPS_PREFIX, table)
}

/// Parse a Hudi `.props` template into an ordered key/value map, filling in
/// the `${RAW_BUCKET_NAME_AND_KEY}` and `${s3_folder_uri}` placeholders.
pub fn flatten_hudi_props(
    content: &str,
    bucket: &str,
    key: &str,
    s3_folder_uri: &str,
) -> Map<String, Value> {
    let raw_object = format!("{}/{}", bucket, key);
    let mut props = Map::new();

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        let value = value
            .replace("${RAW_BUCKET_NAME_AND_KEY}", &raw_object)
            .replace("${s3_folder_uri}", s3_folder_uri);
        props.insert(name.trim().to_string(), Value::String(value.trim().to_string()));
    }

    props
}

pub fn build_emr_event(
    settings: &RelaySettings,
    target_table: &str,
    date_folder: &str,
    hoodie_conf: Map<String, Value>,
    created_at: &str,
) -> EmrEvent {
    let artifacts = &settings.artifactory_bucket;

    let mut arguments = Map::new();
    arguments.insert("table-type".into(), Value::from("COPY_ON_WRITE"));
    arguments.insert("op".into(), Value::from("UPSERT"));
    arguments.insert("enable-sync".into(), Value::Bool(true));
    arguments.insert("source-ordering-field".into(), Value::from("source_timestamp"));
    arguments.insert(
        "source-class".into(),
        Value::from("org.apache.hudi.utilities.sources.ParquetDFSSource"),
    );
    arguments.insert("target-table".into(), Value::from(target_table));
    arguments.insert(
        "target-base-path".into(),
        Value::from(format!(
            "s3a://{}/{}/{}/",
            settings.stage_bucket, settings.target_database, target_table
        )),
    );
    arguments.insert(
        "props".into(),
        Value::from(format!("s3://{}/props/templates/empty-streamer.props", artifacts)),
    );
    arguments.insert(
        "sync-tool-classes".into(),
        Value::from("org.apache.hudi.aws.sync.AwsGlueCatalogSyncTool"),
    );
    arguments.insert("hoodie-conf".into(), Value::Object(hoodie_conf));

    EmrEvent {
        jar: HUDI_JARS
            .iter()
            .map(|jar| format!("s3://{}/jar/{}", artifacts, jar))
            .collect(),
        spark_submit_parameters: SPARK_SUBMIT_PARAMETERS.iter().map(|p| p.to_string()).collect(),
        arguments,
        job: JobSpec {
            job_name: Some(format!("Hudi_0.14.0_{}_{}", target_table, date_folder)),
            created_by: Some(settings.created_by.clone()),
            created_at: Some(created_at.to_string()),
            application_id: Some(settings.emr_application_id.clone()),
            execution_time: Some(DEFAULT_EXECUTION_TIME_MINUTES),
            job_active: Some(true),
            job_status_polling: Some(true),
            job_description: Some(JOB_DESCRIPTION.to_string()),
            execution_arn: Some(settings.emr_execution_role_arn.clone()),
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayOutcome {
    pub queue_url: String,
    pub message_id: String,
    pub message: RelayMessage,
}

/// Turns S3 put events into Hudi ingestion job specs on per-table FIFO
/// queues. `artifacts` reads from the artifact bucket.
pub struct S3EventRelay<S: Storage, M: MessageQueue> {
    artifacts: S,
    queue: M,
    settings: RelaySettings,
}

impl<S: Storage, M: MessageQueue> S3EventRelay<S, M> {
    pub fn new(artifacts: S, queue: M, settings: RelaySettings) -> Self {
        Self {
            artifacts,
            queue,
            settings,
        }
    }

    pub async fn relay_record(&self, record: &S3EventRecord) -> Result<RelayOutcome> {
        let bucket = &record.s3.bucket.name;
        let key = &record.s3.object.key;
        tracing::debug!("S3 Put Event from: {}/{}", bucket, key);

        let group_id = message_group_id(key);
        let s3_folder = folder_uri(bucket, key);
        let date_folder = partition_folder(key)?;
        tracing::debug!("Extracted MessageGroupId: {}", group_id);
        tracing::debug!("Extracted S3 Folder URI: {}", s3_folder);

        let template_key = hudi_template_key(group_id);
        tracing::info!(
            "Downloading template Hudi props from s3://{}/{}",
            self.settings.artifactory_bucket,
            template_key
        );
        let template = self.artifacts.read_file(&template_key).await.map_err(|e| {
            OpsError::processing(format!(
                "Failed to load props template {}: {}",
                template_key, e
            ))
        })?;
        let template = String::from_utf8(template).map_err(|e| {
            OpsError::processing(format!("Props template {} is not UTF-8: {}", template_key, e))
        })?;

        let hoodie_conf = flatten_hudi_props(&template, bucket, key, &s3_folder);
        let flattened = Value::Object(hoodie_conf.clone());
        tracing::debug!("Flattened hoodie-conf: {}", flattened);

        let created_at = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let message = RelayMessage {
            s3_folder,
            target_table: group_id.to_string(),
            emr_event: build_emr_event(&self.settings, group_id, date_folder, hoodie_conf, &created_at),
        };

        let queue_url = queue_url_for(&self.settings.queue_url, group_id);
        let body = serde_json::to_string(&message)?;
        let message_id = self
            .queue
            .send_fifo_message(&queue_url, &body, group_id)
            .await?;

        tracing::info!(
            queue_url = %queue_url,
            bucket = %bucket,
            key = %key,
            group_id = %group_id,
            message_id = %message_id,
            "Sent event to SQS FIFO"
        );

        Ok(RelayOutcome {
            queue_url,
            message_id,
            message,
        })
    }

    /// Relay every record; the first failure aborts the invocation.
    pub async fn handle(&self, event: &S3Event) -> Result<LambdaResponse> {
        tracing::info!("Received S3 event with {} records", event.records.len());

        for record in &event.records {
            self.relay_record(record).await.inspect_err(|e| {
                tracing::error!("Failed to process S3 event: {}", e);
            })?;
        }

        Ok(LambdaResponse {
            status_code: 200,
            body: serde_json::to_string(
                "S3 event successfully sent to SQS FIFO and Hudi props updated.",
            )?,
        })
    }
}
