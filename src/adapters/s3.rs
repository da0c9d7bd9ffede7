use crate::core::{BucketAdmin, NotificationStore, Result, Storage};
use crate::domain::model::{
    BucketTag, EventBridgeConfiguration, FilterRule, KeyFilter, LambdaFunctionConfiguration,
    NotificationConfiguration, NotificationFilter, QueueConfiguration, TopicConfiguration,
};
use crate::utils::error::{aws_error, OpsError};
use async_trait::async_trait;
use aws_sdk_s3::error::{BuildError, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types as s3;
use aws_sdk_s3::Client as S3Client;

const SERVICE: &str = "s3";
const NO_SUCH_TAG_SET: &str = "NoSuchTagSet";

/// Object storage rooted at one bucket; paths are object keys.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

impl Storage for S3Storage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "GetObject", e))?;

        let data = resp.body.collect().await.map_err(|e| {
            OpsError::processing(format!(
                "Failed to read s3://{}/{}: {}",
                self.bucket, path, e
            ))
        })?;

        Ok(data.into_bytes().to_vec())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "PutObject", e))?;

        tracing::debug!("Wrote {} bytes to s3://{}/{}", data.len(), self.bucket, path);
        Ok(())
    }
}

/// Bucket-level administration: notifications, tags and policies.
#[derive(Debug, Clone)]
pub struct S3Admin {
    client: S3Client,
}

impl S3Admin {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationStore for S3Admin {
    async fn get_notification_configuration(
        &self,
        bucket: &str,
    ) -> Result<NotificationConfiguration> {
        let output = self
            .client
            .get_bucket_notification_configuration()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "GetBucketNotificationConfiguration", e))?;

        Ok(NotificationConfiguration {
            topic_configurations: output
                .topic_configurations()
                .iter()
                .map(|c| TopicConfiguration {
                    id: c.id().map(str::to_string),
                    topic_arn: c.topic_arn().to_string(),
                    events: event_names(c.events()),
                    filter: c.filter().map(filter_from_sdk),
                })
                .collect(),
            queue_configurations: output
                .queue_configurations()
                .iter()
                .map(|c| QueueConfiguration {
                    id: c.id().map(str::to_string),
                    queue_arn: c.queue_arn().to_string(),
                    events: event_names(c.events()),
                    filter: c.filter().map(filter_from_sdk),
                })
                .collect(),
            lambda_function_configurations: output
                .lambda_function_configurations()
                .iter()
                .map(|c| LambdaFunctionConfiguration {
                    id: c.id().map(str::to_string),
                    lambda_function_arn: c.lambda_function_arn().to_string(),
                    events: event_names(c.events()),
                    filter: c.filter().map(filter_from_sdk),
                })
                .collect(),
            event_bridge_configuration: output
                .event_bridge_configuration()
                .map(|_| EventBridgeConfiguration {}),
        })
    }

    async fn put_notification_configuration(
        &self,
        bucket: &str,
        configuration: &NotificationConfiguration,
    ) -> Result<()> {
        let sdk_configuration = notification_to_sdk(configuration).map_err(|e| {
            OpsError::invalid_event(format!("Invalid notification configuration: {}", e))
        })?;

        self.client
            .put_bucket_notification_configuration()
            .bucket(bucket)
            .notification_configuration(sdk_configuration)
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "PutBucketNotificationConfiguration", e))?;
        Ok(())
    }
}

#[async_trait]
impl BucketAdmin for S3Admin {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "ListBuckets", e))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }

    async fn bucket_tags(&self, bucket: &str) -> Result<Vec<BucketTag>> {
        match self.client.get_bucket_tagging().bucket(bucket).send().await {
            Ok(output) => Ok(output
                .tag_set()
                .iter()
                .map(|tag| BucketTag {
                    key: tag.key().to_string(),
                    value: tag.value().to_string(),
                })
                .collect()),
            Err(e) if e.code() == Some(NO_SUCH_TAG_SET) => Ok(Vec::new()),
            Err(e) => Err(aws_error(SERVICE, "GetBucketTagging", e)),
        }
    }

    async fn put_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "PutBucketPolicy", e))?;
        Ok(())
    }

    async fn get_policy(&self, bucket: &str) -> Result<String> {
        let output = self
            .client
            .get_bucket_policy()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "GetBucketPolicy", e))?;

        output
            .policy()
            .map(str::to_string)
            .ok_or_else(|| OpsError::processing(format!("Bucket {} returned no policy", bucket)))
    }

    async fn delete_policy(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket_policy()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "DeleteBucketPolicy", e))?;
        Ok(())
    }
}

fn event_names(events: &[s3::Event]) -> Vec<String> {
    events.iter().map(|e| e.as_str().to_string()).collect()
}

fn filter_from_sdk(filter: &s3::NotificationConfigurationFilter) -> NotificationFilter {
    let filter_rules = filter
        .key()
        .map(|key| {
            key.filter_rules()
                .iter()
                .map(|rule| FilterRule {
                    name: rule.name().map(|n| n.as_str().to_string()).unwrap_or_default(),
                    value: rule.value().unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    NotificationFilter {
        key: KeyFilter { filter_rules },
    }
}

fn filter_to_sdk(filter: &NotificationFilter) -> s3::NotificationConfigurationFilter {
    let rules = filter
        .key
        .filter_rules
        .iter()
        .map(|rule| {
            s3::FilterRule::builder()
                .name(s3::FilterRuleName::from(rule.name.as_str()))
                .value(&rule.value)
                .build()
        })
        .collect();

    s3::NotificationConfigurationFilter::builder()
        .key(s3::S3KeyFilter::builder().set_filter_rules(Some(rules)).build())
        .build()
}

fn sdk_events(events: &[String]) -> Vec<s3::Event> {
    events.iter().map(|e| s3::Event::from(e.as_str())).collect()
}

fn notification_to_sdk(
    configuration: &NotificationConfiguration,
) -> std::result::Result<s3::NotificationConfiguration, BuildError> {
    let topics = configuration
        .topic_configurations
        .iter()
        .map(|c| {
            s3::TopicConfiguration::builder()
                .set_id(c.id.clone())
                .topic_arn(&c.topic_arn)
                .set_events(Some(sdk_events(&c.events)))
                .set_filter(c.filter.as_ref().map(filter_to_sdk))
                .build()
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let queues = configuration
        .queue_configurations
        .iter()
        .map(|c| {
            s3::QueueConfiguration::builder()
                .set_id(c.id.clone())
                .queue_arn(&c.queue_arn)
                .set_events(Some(sdk_events(&c.events)))
                .set_filter(c.filter.as_ref().map(filter_to_sdk))
                .build()
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let lambdas = configuration
        .lambda_function_configurations
        .iter()
        .map(|c| {
            s3::LambdaFunctionConfiguration::builder()
                .set_id(c.id.clone())
                .lambda_function_arn(&c.lambda_function_arn)
                .set_events(Some(sdk_events(&c.events)))
                .set_filter(c.filter.as_ref().map(filter_to_sdk))
                .build()
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(s3::NotificationConfiguration::builder()
        .set_topic_configurations(Some(topics))
        .set_queue_configurations(Some(queues))
        .set_lambda_function_configurations(Some(lambdas))
        .set_event_bridge_configuration(
            configuration
                .event_bridge_configuration
                .as_ref()
                .map(|_| s3::EventBridgeConfiguration::builder().build()),
        )
        .build())
}
