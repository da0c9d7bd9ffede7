use crate::core::{NotificationStore, ResponseSender, Result};
use crate::domain::model::{
    CustomResourceRequest, CustomResourceResponse, Identified, NotificationConfiguration,
    RequestType, ResponseStatus,
};
use crate::utils::error::OpsError;
use std::collections::HashSet;

/// Merge the notification entries requested by a custom resource into the
/// bucket's current configuration.
///
/// Only the entry kinds present in `input` are touched. Within a kind, current
/// entries sharing an `Id` with an input entry are dropped; on `Create` and
/// `Update` the input entries are then appended in their given order.
pub fn merge_configurations(
    request_type: RequestType,
    input: &NotificationConfiguration,
    current: &NotificationConfiguration,
) -> Result<NotificationConfiguration> {
    let event_bridge_configuration = match (&input.event_bridge_configuration, request_type) {
        (None, _) => current.event_bridge_configuration.clone(),
        (Some(_), RequestType::Delete) => None,
        (Some(requested), _) => Some(requested.clone()),
    };

    Ok(NotificationConfiguration {
        topic_configurations: merge_entries(
            "TopicConfigurations",
            request_type,
            &input.topic_configurations,
            &current.topic_configurations,
        )?,
        queue_configurations: merge_entries(
            "QueueConfigurations",
            request_type,
            &input.queue_configurations,
            &current.queue_configurations,
        )?,
        lambda_function_configurations: merge_entries(
            "LambdaFunctionConfigurations",
            request_type,
            &input.lambda_function_configurations,
            &current.lambda_function_configurations,
        )?,
        event_bridge_configuration,
    })
}

fn merge_entries<T: Identified + Clone>(
    kind: &str,
    request_type: RequestType,
    input: &[T],
    current: &[T],
) -> Result<Vec<T>> {
    if input.is_empty() {
        return Ok(current.to_vec());
    }

    let input_ids = input
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            entry.id().ok_or_else(|| {
                OpsError::invalid_event(format!("{kind}[{index}] is missing the Id field"))
            })
        })
        .collect::<Result<HashSet<&str>>>()?;

    let mut merged: Vec<T> = current
        .iter()
        .filter(|entry| entry.id().map_or(true, |id| !input_ids.contains(id)))
        .cloned()
        .collect();

    if request_type != RequestType::Delete {
        merged.extend(input.iter().cloned());
    }

    Ok(merged)
}

pub fn build_response(
    request: &CustomResourceRequest,
    status: ResponseStatus,
    reason: Option<String>,
    log_stream_name: &str,
) -> CustomResourceResponse {
    CustomResourceResponse {
        status,
        reason: reason.unwrap_or_else(|| {
            format!("See the details in CloudWatch Log Stream: {log_stream_name}")
        }),
        physical_resource_id: request
            .physical_resource_id
            .clone()
            .unwrap_or_else(|| request.logical_resource_id.clone()),
        stack_id: request.stack_id.clone(),
        request_id: request.request_id.clone(),
        logical_resource_id: request.logical_resource_id.clone(),
        no_echo: false,
    }
}

/// CloudFormation custom resource that owns a subset of a bucket's
/// notification configuration.
pub struct NotificationHandler<N: NotificationStore, R: ResponseSender> {
    store: N,
    responder: R,
    log_stream_name: String,
}

impl<N: NotificationStore, R: ResponseSender> NotificationHandler<N, R> {
    pub fn new(store: N, responder: R, log_stream_name: String) -> Self {
        Self {
            store,
            responder,
            log_stream_name,
        }
    }

    /// Apply the request and report the outcome to CloudFormation.
    ///
    /// Failures while reading or writing the bucket configuration become a
    /// `FAILED` response; only a failure to deliver the response is returned
    /// as an error.
    pub async fn handle(&self, request: &CustomResourceRequest) -> Result<CustomResourceResponse> {
        tracing::info!(
            "Received event: {}",
            serde_json::to_string_pretty(request)?
        );

        let response = match self.apply(request).await {
            Ok(()) => build_response(request, ResponseStatus::Success, None, &self.log_stream_name),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = request.bucket_name().unwrap_or_default(),
                    "Error processing event"
                );
                build_response(
                    request,
                    ResponseStatus::Failed,
                    Some(e.to_string()),
                    &self.log_stream_name,
                )
            }
        };

        let status = self
            .responder
            .send(&request.response_url, &response)
            .await
            .inspect_err(|e| tracing::error!("Failed to send response: {}", e))?;
        tracing::info!("Response sent: {}", status);

        Ok(response)
    }

    async fn apply(&self, request: &CustomResourceRequest) -> Result<()> {
        let properties = request.notification_properties().map_err(|e| {
            OpsError::invalid_event(format!("Invalid ResourceProperties: {e}"))
        })?;
        let bucket = &properties.bucket_name;

        let current = self.store.get_notification_configuration(bucket).await?;
        let merged = merge_configurations(
            request.request_type,
            &properties.notification_configuration,
            &current,
        )?;

        tracing::info!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "bucket": bucket,
                "previousConfiguration": current,
                "newConfiguration": merged,
            }))?
        );

        self.store
            .put_notification_configuration(bucket, &merged)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        EventBridgeConfiguration, LambdaFunctionConfiguration, NotificationResourceProperties,
        QueueConfiguration, TopicConfiguration,
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn queue(id: &str, arn: &str) -> QueueConfiguration {
        QueueConfiguration {
            id: Some(id.to_string()),
            queue_arn: arn.to_string(),
            events: vec!["s3:ObjectCreated:*".to_string()],
            filter: None,
        }
    }

    fn topic(id: &str) -> TopicConfiguration {
        TopicConfiguration {
            id: Some(id.to_string()),
            topic_arn: format!("arn:aws:sns:us-west-2:123456789012:{id}"),
            events: vec!["s3:ObjectRemoved:*".to_string()],
            filter: None,
        }
    }

    #[test]
    fn update_replaces_entries_with_same_id_and_appends_new_ones() {
        let current = NotificationConfiguration {
            queue_configurations: vec![queue("a", "old-a"), queue("b", "old-b")],
            topic_configurations: vec![topic("alerts")],
            ..Default::default()
        };
        let input = NotificationConfiguration {
            queue_configurations: vec![queue("b", "new-b"), queue("c", "new-c")],
            ..Default::default()
        };

        let merged = merge_configurations(RequestType::Update, &input, &current).unwrap();

        let arns: Vec<&str> = merged
            .queue_configurations
            .iter()
            .map(|q| q.queue_arn.as_str())
            .collect();
        assert_eq!(arns, vec!["old-a", "new-b", "new-c"]);
        // kinds absent from the input are untouched
        assert_eq!(merged.topic_configurations, current.topic_configurations);
    }

    #[test]
    fn create_on_kind_missing_from_current_uses_input() {
        let current = NotificationConfiguration::default();
        let input = NotificationConfiguration {
            lambda_function_configurations: vec![LambdaFunctionConfiguration {
                id: Some("on-create".to_string()),
                lambda_function_arn: "arn:aws:lambda:us-west-2:123456789012:function:f".into(),
                events: vec!["s3:ObjectCreated:Put".to_string()],
                filter: None,
            }],
            ..Default::default()
        };

        let merged = merge_configurations(RequestType::Create, &input, &current).unwrap();
        assert_eq!(
            merged.lambda_function_configurations,
            input.lambda_function_configurations
        );
    }

    #[test]
    fn delete_removes_matching_ids_only() {
        let current = NotificationConfiguration {
            queue_configurations: vec![queue("a", "arn-a"), queue("b", "arn-b")],
            ..Default::default()
        };
        let input = NotificationConfiguration {
            queue_configurations: vec![queue("b", "whatever")],
            ..Default::default()
        };

        let merged = merge_configurations(RequestType::Delete, &input, &current).unwrap();
        assert_eq!(merged.queue_configurations, vec![queue("a", "arn-a")]);
    }

    #[test]
    fn delete_never_adds_entries() {
        let input = NotificationConfiguration {
            topic_configurations: vec![topic("gone")],
            ..Default::default()
        };
        let merged =
            merge_configurations(RequestType::Delete, &input, &NotificationConfiguration::default())
                .unwrap();
        assert!(merged.topic_configurations.is_empty());
    }

    #[test]
    fn event_bridge_is_set_and_cleared() {
        let input = NotificationConfiguration {
            event_bridge_configuration: Some(EventBridgeConfiguration {}),
            ..Default::default()
        };
        let enabled = merge_configurations(
            RequestType::Create,
            &input,
            &NotificationConfiguration::default(),
        )
        .unwrap();
        assert!(enabled.event_bridge_configuration.is_some());

        let disabled = merge_configurations(RequestType::Delete, &input, &enabled).unwrap();
        assert!(disabled.event_bridge_configuration.is_none());

        let untouched =
            merge_configurations(RequestType::Update, &NotificationConfiguration::default(), &enabled)
                .unwrap();
        assert!(untouched.event_bridge_configuration.is_some());
    }

    #[test]
    fn input_entry_without_id_is_rejected() {
        let mut entry = queue("x", "arn");
        entry.id = None;
        let input = NotificationConfiguration {
            queue_configurations: vec![entry],
            ..Default::default()
        };

        let err = merge_configurations(RequestType::Create, &input, &NotificationConfiguration::default())
            .unwrap_err();
        assert!(matches!(err, OpsError::InvalidEvent { .. }));
        assert!(err.to_string().contains("QueueConfigurations[0]"));
    }

    #[derive(Clone, Default)]
    struct MockStore {
        configurations: Arc<Mutex<std::collections::HashMap<String, NotificationConfiguration>>>,
        fail_put: bool,
    }

    #[async_trait]
    impl NotificationStore for MockStore {
        async fn get_notification_configuration(
            &self,
            bucket: &str,
        ) -> Result<NotificationConfiguration> {
            Ok(self
                .configurations
                .lock()
                .await
                .get(bucket)
                .cloned()
                .unwrap_or_default())
        }

        async fn put_notification_configuration(
            &self,
            bucket: &str,
            configuration: &NotificationConfiguration,
        ) -> Result<()> {
            if self.fail_put {
                return Err(OpsError::AwsServiceError {
                    service: "s3",
                    operation: "PutBucketNotificationConfiguration",
                    code: Some("AccessDenied".to_string()),
                    message: "Access Denied".to_string(),
                });
            }
            self.configurations
                .lock()
                .await
                .insert(bucket.to_string(), configuration.clone());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSender {
        sent: Arc<Mutex<Vec<(String, CustomResourceResponse)>>>,
    }

    #[async_trait]
    impl ResponseSender for RecordingSender {
        async fn send(&self, response_url: &str, response: &CustomResourceResponse) -> Result<u16> {
            self.sent
                .lock()
                .await
                .push((response_url.to_string(), response.clone()));
            Ok(200)
        }
    }

    fn request(request_type: RequestType, input: NotificationConfiguration) -> CustomResourceRequest {
        CustomResourceRequest {
            request_type,
            response_url: "https://cfn-response.example.com/r".to_string(),
            stack_id: "stack-1".to_string(),
            request_id: "req-1".to_string(),
            resource_type: Some("Custom::S3Notifications".to_string()),
            logical_resource_id: "RawBucketNotifications".to_string(),
            physical_resource_id: None,
            resource_properties: serde_json::to_value(NotificationResourceProperties {
                service_token: None,
                bucket_name: "lakehouse-raw".to_string(),
                notification_configuration: input,
            })
            .unwrap(),
        }
    }

    #[tokio::test]
    async fn handler_writes_merged_configuration_and_reports_success() {
        let store = MockStore::default();
        let sender = RecordingSender::default();
        let handler =
            NotificationHandler::new(store.clone(), sender.clone(), "2024/01/01/[$LATEST]abc".into());

        let input = NotificationConfiguration {
            queue_configurations: vec![queue("ingest", "arn:ingest")],
            ..Default::default()
        };
        let response = handler
            .handle(&request(RequestType::Create, input.clone()))
            .await
            .unwrap();

        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.physical_resource_id, "RawBucketNotifications");
        assert_eq!(
            response.reason,
            "See the details in CloudWatch Log Stream: 2024/01/01/[$LATEST]abc"
        );

        let stored = store.configurations.lock().await;
        assert_eq!(stored["lakehouse-raw"].queue_configurations, input.queue_configurations);

        let sent = sender.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "https://cfn-response.example.com/r");
    }

    #[tokio::test]
    async fn handler_reports_failure_with_error_reason() {
        let store = MockStore {
            fail_put: true,
            ..Default::default()
        };
        let sender = RecordingSender::default();
        let handler = NotificationHandler::new(store, sender.clone(), "stream".into());

        let mut req = request(RequestType::Update, NotificationConfiguration::default());
        req.physical_resource_id = Some("existing-id".to_string());

        let response = handler.handle(&req).await.unwrap();

        assert_eq!(response.status, ResponseStatus::Failed);
        assert_eq!(response.physical_resource_id, "existing-id");
        assert!(response.reason.contains("AccessDenied"));
        assert_eq!(sender.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn malformed_properties_are_answered_with_failed() {
        let store = MockStore::default();
        let sender = RecordingSender::default();
        let handler = NotificationHandler::new(store.clone(), sender.clone(), "stream".into());

        let mut req = request(RequestType::Create, NotificationConfiguration::default());
        req.resource_properties = serde_json::json!({
            "BucketName": "lakehouse-raw",
            "NotificationConfiguration": {
                "QueueConfigurations": [{"Id": "ingest", "QueueArn": "arn:ingest"}]
            }
        });

        let response = handler.handle(&req).await.unwrap();

        assert_eq!(response.status, ResponseStatus::Failed);
        assert!(response.reason.starts_with("Invalid event: Invalid ResourceProperties"));
        assert!(response.reason.contains("Events"));
        assert!(store.configurations.lock().await.is_empty());
        assert_eq!(sender.sent.lock().await[0].1, response);
    }
}
