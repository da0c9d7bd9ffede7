use crate::core::{ResponseSender, Result};
use crate::domain::model::CustomResourceResponse;
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;

/// PUTs custom resource results to the pre-signed S3 URL CloudFormation
/// hands out with each request.
#[derive(Debug, Clone, Default)]
pub struct HttpResponseSender {
    client: Client,
}

impl HttpResponseSender {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResponseSender for HttpResponseSender {
    async fn send(&self, response_url: &str, response: &CustomResourceResponse) -> Result<u16> {
        let body = serde_json::to_string(response)?;
        tracing::info!("Response body: {}", body);

        // The pre-signed URL is signed without a content type.
        let resp = self
            .client
            .put(response_url)
            .header(CONTENT_TYPE, "")
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            tracing::info!("Status code: {}", status);
        } else {
            tracing::warn!("CloudFormation response rejected with status {}", status);
        }
        Ok(status.as_u16())
    }
}
