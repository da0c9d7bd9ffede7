use crate::core::{MessageQueue, Result};
use crate::utils::error::{aws_error, OpsError};
use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;

#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: SqsClient,
}

impl SqsQueue {
    pub fn new(client: SqsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn send_fifo_message(
        &self,
        queue_url: &str,
        body: &str,
        message_group_id: &str,
    ) -> Result<String> {
        let output = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .message_group_id(message_group_id)
            .send()
            .await
            .map_err(|e| aws_error("sqs", "SendMessage", e))?;

        output
            .message_id()
            .map(str::to_string)
            .ok_or_else(|| OpsError::processing("SQS returned no message id"))
    }
}
