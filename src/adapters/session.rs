use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use serde::Deserialize;

const CREDENTIALS_PROVIDER_NAME: &str = "lakehouse-ops";

/// How AWS clients are configured. Unset fields fall back to the default
/// provider chain (environment, shared profile, instance role).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AwsSettings {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

impl AwsSettings {
    /// Static credentials, when both halves of the key pair are set.
    pub fn static_credentials(&self) -> Option<Credentials> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some(Credentials::new(
                id,
                secret,
                self.session_token.clone(),
                None,
                CREDENTIALS_PROVIDER_NAME,
            )),
            _ => None,
        }
    }
}

pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(profile) = &settings.profile {
        loader = loader.profile_name(profile);
    }
    if let Some(credentials) = settings.static_credentials() {
        tracing::debug!("Using static AWS credentials from configuration");
        loader = loader.credentials_provider(credentials);
    }

    loader.load().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_credentials_need_both_keys() {
        let mut settings = AwsSettings {
            access_key_id: Some("AKIDEXAMPLE".into()),
            ..Default::default()
        };
        assert!(settings.static_credentials().is_none());

        settings.secret_access_key = Some("secret".into());
        let credentials = settings.static_credentials().unwrap();
        assert_eq!(credentials.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(credentials.session_token(), None);
    }
}
