use crate::utils::error::{OpsError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(OpsError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

/// Split `s3://bucket/key` into bucket and key. The key may be empty.
pub fn parse_s3_uri(field_name: &str, uri: &str) -> Result<(String, String)> {
    let invalid = |reason: &str| OpsError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: uri.to_string(),
        reason: reason.to_string(),
    };

    let rest = uri
        .strip_prefix("s3://")
        .ok_or_else(|| invalid("S3 URI must start with s3://"))?;
    let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
    validate_s3_bucket_name(field_name, bucket)?;

    if key.starts_with('/') || key.contains("//") {
        return Err(invalid("S3 key cannot contain empty path segments"));
    }

    Ok((bucket.to_string(), key.to_string()))
}

pub fn validate_s3_uri(field_name: &str, uri: &str) -> Result<()> {
    parse_s3_uri(field_name, uri).map(|_| ())
}

pub fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    if bucket_name.is_empty() {
        return Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name cannot be empty".to_string(),
        });
    }

    if bucket_name.len() < 3 || bucket_name.len() > 63 {
        return Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name must be between 3 and 63 characters".to_string(),
        });
    }

    if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name can only contain lowercase letters, numbers, hyphens and dots"
                .to_string(),
        });
    }

    if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        return Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name cannot start or end with a hyphen".to_string(),
        });
    }

    Ok(())
}

pub fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: region.to_string(),
            reason: "AWS region can only contain lowercase letters, numbers, and hyphens"
                .to_string(),
        });
    }

    Ok(())
}

/// Glue database, table and column names end up inside Athena SQL text, so
/// only plain identifiers are accepted.
pub fn validate_sql_identifier(field_name: &str, identifier: &str) -> Result<()> {
    validate_non_empty_string(field_name, identifier)?;

    if !identifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: identifier.to_string(),
            reason: "Identifier can only contain letters, numbers and underscores".to_string(),
        });
    }

    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| OpsError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(OpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("queue_url", "https://sqs.us-west-2.amazonaws.com/123").is_ok());
        assert!(validate_url("queue_url", "http://localhost:4566").is_ok());
        assert!(validate_url("queue_url", "").is_err());
        assert!(validate_url("queue_url", "invalid-url").is_err());
        assert!(validate_url("queue_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_parse_s3_uri() {
        assert_eq!(
            parse_s3_uri("dest", "s3://bucket-name/table1/my_file.parquet").unwrap(),
            ("bucket-name".to_string(), "table1/my_file.parquet".to_string())
        );
        assert_eq!(
            parse_s3_uri("dest", "s3://athena-results/").unwrap(),
            ("athena-results".to_string(), String::new())
        );
        assert_eq!(
            parse_s3_uri("dest", "s3://athena-results").unwrap(),
            ("athena-results".to_string(), String::new())
        );
        assert!(parse_s3_uri("dest", "athena-bucket/").is_err());
        assert!(parse_s3_uri("dest", "s3://Bad_Bucket/key").is_err());
        assert!(parse_s3_uri("dest", "s3://bucket//key").is_err());
        assert!(parse_s3_uri("dest", "s3://bucket/table1//my_file.parquet").is_err());
    }

    #[test]
    fn test_validate_s3_bucket_name() {
        assert!(validate_s3_bucket_name("bucket", "lakehouse-raw").is_ok());
        assert!(validate_s3_bucket_name("bucket", "ab").is_err());
        assert!(validate_s3_bucket_name("bucket", "-lakehouse").is_err());
        assert!(validate_s3_bucket_name("bucket", "LakeHouse").is_err());
        assert!(validate_s3_bucket_name("bucket", "lake_house").is_err());
    }

    #[test]
    fn test_validate_sql_identifier() {
        assert!(validate_sql_identifier("table", "orders_2024").is_ok());
        assert!(validate_sql_identifier("table", "orders; DROP TABLE x").is_err());
        assert!(validate_sql_identifier("table", "  ").is_err());
    }

    #[test]
    fn test_validate_positive_number_and_range() {
        assert!(validate_positive_number("poll_interval_ms", 5, 1).is_ok());
        assert!(validate_positive_number("poll_interval_ms", 0, 1).is_err());
        assert!(validate_range("execution_time", 600, 1, 1440).is_ok());
        assert!(validate_range("execution_time", 0, 1, 1440).is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let present = Some("db_hudi".to_string());
        let absent: Option<String> = None;
        assert_eq!(validate_required_field("ddl.database", &present).unwrap(), "db_hudi");
        assert!(matches!(
            validate_required_field("ddl.database", &absent),
            Err(OpsError::MissingConfigError { .. })
        ));
    }
}
