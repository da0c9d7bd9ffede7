use crate::core::{BucketAdmin, PolicyReport, Result};
use crate::domain::model::{BucketPolicy, PolicyStatement};
use serde_json::{json, Value};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const SSL_ONLY_SID: &str = "AllowSSLRequestsOnly";
pub const PROJECT_TAG_KEY: &str = "project";
const MALFORMED_POLICY: &str = "MalformedPolicy";

/// Deny every S3 action on the bucket and its objects unless the request
/// came over TLS.
pub fn ssl_only_policy(bucket: &str, policy_id: &str) -> BucketPolicy {
    BucketPolicy {
        version: POLICY_VERSION.to_string(),
        id: policy_id.to_string(),
        statement: vec![PolicyStatement {
            sid: SSL_ONLY_SID.to_string(),
            effect: "Deny".to_string(),
            principal: json!("*"),
            action: json!("s3:*"),
            resource: vec![
                format!("arn:aws:s3:::{bucket}/*"),
                format!("arn:aws:s3:::{bucket}"),
            ],
            condition: Some(json!({"Bool": {"aws:SecureTransport": "false"}})),
        }],
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnforcementReport {
    /// Bucket name and the policy read back after the put.
    pub applied: Vec<(String, Value)>,
    /// Buckets whose policy S3 rejected as malformed.
    pub rejected: Vec<String>,
}

impl EnforcementReport {
    pub fn lines(&self) -> Vec<String> {
        self.applied
            .iter()
            .map(|(bucket, policy)| policy_line(bucket, policy))
            .collect()
    }
}

pub fn policy_line(bucket: &str, policy: &Value) -> String {
    format!("Bucket {} has policy {}.", bucket, policy)
}

pub struct PolicyEnforcer<B: BucketAdmin> {
    admin: B,
}

impl<B: BucketAdmin> PolicyEnforcer<B> {
    pub fn new(admin: B) -> Self {
        Self { admin }
    }

    /// Buckets of the account that are named in `candidates` and tagged
    /// `project=<project>`.
    pub async fn select_buckets(&self, candidates: &[String], project: &str) -> Result<Vec<String>> {
        let mut selected = Vec::new();

        for bucket in self.admin.list_buckets().await? {
            if !candidates.contains(&bucket) {
                continue;
            }

            let tags = self.admin.bucket_tags(&bucket).await?;
            if tags.is_empty() {
                tracing::info!("No tags found for bucket {}, skipping", bucket);
                continue;
            }

            if tags
                .iter()
                .any(|tag| tag.key == PROJECT_TAG_KEY && tag.value == project)
            {
                tracing::info!("Bucket {} is tagged {}={}", bucket, PROJECT_TAG_KEY, project);
                selected.push(bucket);
            }
        }

        Ok(selected)
    }

    pub async fn put_policy(&self, bucket: &str, policy: &BucketPolicy) -> Result<()> {
        let document = serde_json::to_string(policy)?;
        self.admin
            .put_policy(bucket, &document)
            .await
            .inspect_err(|e| tracing::error!("Couldn't apply policy to bucket '{}': {}", bucket, e))?;
        tracing::info!("Put policy {} for bucket '{}'.", document, bucket);
        Ok(())
    }

    pub async fn get_policy(&self, bucket: &str) -> Result<Value> {
        let document = self
            .admin
            .get_policy(bucket)
            .await
            .inspect_err(|e| tracing::error!("Couldn't get policy for bucket '{}': {}", bucket, e))?;
        tracing::info!("Got policy {} for bucket '{}'.", document, bucket);
        Ok(serde_json::from_str(&document)?)
    }

    pub async fn delete_policy(&self, bucket: &str) -> Result<()> {
        self.admin
            .delete_policy(bucket)
            .await
            .inspect_err(|e| {
                tracing::error!("Couldn't delete policy for bucket '{}': {}", bucket, e)
            })?;
        tracing::info!("Deleted policy for bucket '{}'.", bucket);
        Ok(())
    }

    /// Put the TLS-only policy on each bucket and read it back, handing each
    /// result to `sink` before moving on.
    ///
    /// A `MalformedPolicy` rejection is recorded and the next bucket is
    /// processed; any other failure stops the run after the buckets already
    /// reported.
    pub async fn enforce_ssl_only<R: PolicyReport>(
        &self,
        buckets: &[String],
        sink: &mut R,
    ) -> Result<EnforcementReport> {
        let mut report = EnforcementReport::default();

        for bucket in buckets {
            let policy = ssl_only_policy(bucket, &uuid::Uuid::new_v4().to_string());

            match self.put_policy(bucket, &policy).await {
                Ok(()) => {}
                Err(e) if e.aws_code() == Some(MALFORMED_POLICY) => {
                    tracing::warn!(
                        "Couldn't set the bucket policy on {} because a principal in the policy does not exist",
                        bucket
                    );
                    sink.policy_rejected(bucket).await?;
                    report.rejected.push(bucket.clone());
                    continue;
                }
                Err(e) => return Err(e),
            }

            let applied = self.get_policy(bucket).await?;
            sink.policy_applied(bucket, &applied).await?;
            report.applied.push((bucket.clone(), applied));
        }

        Ok(report)
    }
}

pub fn malformed_policy_banner() -> String {
    let rule = "*".repeat(88);
    format!(
        "{rule}\nThe bucket policy couldn't be set because a principal user specified in the\npolicy does not exist. Replace the principal with an existing AWS user or role.\n{rule}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::BucketTag;
    use crate::utils::error::OpsError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct FakeS3 {
        tags: HashMap<String, Vec<BucketTag>>,
        policies: Arc<Mutex<HashMap<String, String>>>,
        malformed: Vec<String>,
        denied: Vec<String>,
    }

    fn service_error(code: &str) -> OpsError {
        OpsError::AwsServiceError {
            service: "s3",
            operation: "PutBucketPolicy",
            code: Some(code.to_string()),
            message: code.to_string(),
        }
    }

    #[async_trait]
    impl BucketAdmin for FakeS3 {
        async fn list_buckets(&self) -> Result<Vec<String>> {
            let mut names: Vec<String> = self.tags.keys().cloned().collect();
            names.sort();
            Ok(names)
        }

        async fn bucket_tags(&self, bucket: &str) -> Result<Vec<BucketTag>> {
            Ok(self.tags.get(bucket).cloned().unwrap_or_default())
        }

        async fn put_policy(&self, bucket: &str, policy: &str) -> Result<()> {
            if self.malformed.iter().any(|b| b == bucket) {
                return Err(service_error("MalformedPolicy"));
            }
            if self.denied.iter().any(|b| b == bucket) {
                return Err(service_error("AccessDenied"));
            }
            self.policies
                .lock()
                .await
                .insert(bucket.to_string(), policy.to_string());
            Ok(())
        }

        async fn get_policy(&self, bucket: &str) -> Result<String> {
            Ok(self.policies.lock().await[bucket].clone())
        }

        async fn delete_policy(&self, bucket: &str) -> Result<()> {
            self.policies.lock().await.remove(bucket);
            Ok(())
        }
    }

    /// Report lines in the order the enforcer produced them.
    #[derive(Default)]
    struct RecordedReport(Vec<String>);

    #[async_trait]
    impl PolicyReport for RecordedReport {
        async fn policy_applied(&mut self, bucket: &str, policy: &Value) -> Result<()> {
            self.0.push(policy_line(bucket, policy));
            Ok(())
        }

        async fn policy_rejected(&mut self, bucket: &str) -> Result<()> {
            self.0.push(format!("rejected {}", bucket));
            Ok(())
        }
    }

    fn tag(key: &str, value: &str) -> BucketTag {
        BucketTag {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn ssl_only_policy_document() {
        let policy = serde_json::to_value(ssl_only_policy("lakehouse-raw", "policy-1")).unwrap();
        assert_eq!(
            policy,
            json!({
                "Version": "2012-10-17",
                "Id": "policy-1",
                "Statement": [{
                    "Sid": "AllowSSLRequestsOnly",
                    "Effect": "Deny",
                    "Principal": "*",
                    "Action": "s3:*",
                    "Resource": ["arn:aws:s3:::lakehouse-raw/*", "arn:aws:s3:::lakehouse-raw"],
                    "Condition": {"Bool": {"aws:SecureTransport": "false"}}
                }]
            })
        );
    }

    #[tokio::test]
    async fn selects_named_buckets_with_project_tag() {
        let s3 = FakeS3 {
            tags: HashMap::from([
                ("lakehouse-raw".to_string(), vec![tag("project", "lakehouse")]),
                ("lakehouse-stage".to_string(), vec![tag("project", "billing")]),
                ("lakehouse-logs".to_string(), vec![]),
                ("other-bucket".to_string(), vec![tag("project", "lakehouse")]),
            ]),
            ..Default::default()
        };
        let enforcer = PolicyEnforcer::new(s3);
        let candidates = vec![
            "lakehouse-raw".to_string(),
            "lakehouse-stage".to_string(),
            "lakehouse-logs".to_string(),
        ];

        let selected = enforcer.select_buckets(&candidates, "lakehouse").await.unwrap();
        assert_eq!(selected, vec!["lakehouse-raw"]);
    }

    #[tokio::test]
    async fn enforcement_skips_malformed_and_reads_back_policy() {
        let s3 = FakeS3 {
            malformed: vec!["bad-principal".to_string()],
            ..Default::default()
        };
        let enforcer = PolicyEnforcer::new(s3.clone());
        let mut recorded = RecordedReport::default();

        let report = enforcer
            .enforce_ssl_only(
                &["bad-principal".to_string(), "lakehouse-raw".to_string()],
                &mut recorded,
            )
            .await
            .unwrap();

        assert_eq!(report.rejected, vec!["bad-principal"]);
        assert_eq!(report.applied.len(), 1);
        let (bucket, policy) = &report.applied[0];
        assert_eq!(bucket, "lakehouse-raw");
        assert_eq!(policy["Statement"][0]["Sid"], "AllowSSLRequestsOnly");
        assert!(report.lines()[0].starts_with("Bucket lakehouse-raw has policy {"));
        assert_eq!(recorded.0[0], "rejected bad-principal");
        assert_eq!(recorded.0[1], report.lines()[0]);

        enforcer.delete_policy("lakehouse-raw").await.unwrap();
        assert!(s3.policies.lock().await.is_empty());
    }

    #[tokio::test]
    async fn other_put_errors_abort() {
        let s3 = FakeS3 {
            denied: vec!["locked".to_string()],
            ..Default::default()
        };
        let enforcer = PolicyEnforcer::new(s3.clone());
        let mut recorded = RecordedReport::default();

        let err = enforcer
            .enforce_ssl_only(&["ok".to_string(), "locked".to_string()], &mut recorded)
            .await
            .unwrap_err();

        assert_eq!(err.aws_code(), Some("AccessDenied"));
        // The bucket changed before the failure is still reported.
        assert!(s3.policies.lock().await.contains_key("ok"));
        assert_eq!(recorded.0.len(), 1);
        assert!(recorded.0[0].starts_with("Bucket ok has policy {"));
    }
}
