// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use std::time::SystemTime;

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_sts::error::DisplayErrorContext;
use log::{debug, info};

use crate::model::connection::AwsAuthConfig;
use crate::utils::config::DEFAULT_STS_MAX_ATTEMPTS;
use crate::utils::error::CoreMirrorError;

const STATIC_PROVIDER_NAME: &str = "MirrorStaticCredentials";
const ASSUME_ROLE_PROVIDER_NAME: &str = "MirrorAssumeRole";

/// Where the signing credentials come from, in order of priority.
#[derive(Debug, PartialEq, Eq)]
enum CredentialSource<'a> {
  /// Access key, secret and session token are all given and used as is.
  Session {
    access_key_id: &'a str,
    secret_access_key: &'a str,
    session_token: &'a str,
  },

  /// Access key and secret are given and used to call AssumeRole.
  AssumeRoleWithKeys {
    access_key_id: &'a str,
    secret_access_key: &'a str,
  },

  /// Nothing is given, AssumeRole is called with the default credential chain.
  AssumeRoleWithDefaultChain,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().filter(|v| !v.is_empty())
}

fn credential_source(aws: &AwsAuthConfig) -> CredentialSource<'_> {
  let access_key_id = non_empty(&aws.aws_access_key_id);
  let secret_access_key = non_empty(&aws.aws_secret_access_key);
  let session_token = non_empty(&aws.aws_session_token);

  match (access_key_id, secret_access_key, session_token) {
    (Some(access_key_id), Some(secret_access_key), Some(session_token)) => {
      CredentialSource::Session {
        access_key_id,
        secret_access_key,
        session_token,
      }
    }
    (Some(access_key_id), Some(secret_access_key), None) => CredentialSource::AssumeRoleWithKeys {
      access_key_id,
      secret_access_key,
    },
    _ => CredentialSource::AssumeRoleWithDefaultChain,
  }
}

/// Resolve a frozen set of credentials for the given AWS settings.
///
/// Credentials obtained through AssumeRole are time limited and are not refreshed. Once they expire, calls
/// to the backend fail with an authentication error.
pub async fn resolve_credentials(aws: &AwsAuthConfig) -> Result<Credentials, CoreMirrorError> {
  match credential_source(aws) {
    CredentialSource::Session {
      access_key_id,
      secret_access_key,
      session_token,
    } => {
      debug!("Using static session credentials");
      Ok(Credentials::new(
        access_key_id,
        secret_access_key,
        Some(session_token.to_owned()),
        None,
        STATIC_PROVIDER_NAME,
      ))
    }
    CredentialSource::AssumeRoleWithKeys {
      access_key_id,
      secret_access_key,
    } => {
      let static_credentials = Credentials::new(
        access_key_id,
        secret_access_key,
        None,
        None,
        STATIC_PROVIDER_NAME,
      );
      let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(aws.region_name.clone()))
        .credentials_provider(static_credentials)
        .retry_config(RetryConfig::standard().with_max_attempts(DEFAULT_STS_MAX_ATTEMPTS))
        .load()
        .await;
      assume_role(&sdk_config, aws).await
    }
    CredentialSource::AssumeRoleWithDefaultChain => {
      let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(aws.region_name.clone()))
        .load()
        .await;
      assume_role(&sdk_config, aws).await
    }
  }
}

async fn assume_role(
  sdk_config: &SdkConfig,
  aws: &AwsAuthConfig,
) -> Result<Credentials, CoreMirrorError> {
  let role_arn = non_empty(&aws.role_arn).ok_or_else(|| {
    CoreMirrorError::InvalidConfiguration("role_arn is required to assume a role".to_owned())
  })?;

  info!(
    "Assuming role {} with session name {}",
    role_arn, aws.role_session_name
  );

  let client = aws_sdk_sts::Client::new(sdk_config);
  let output = client
    .assume_role()
    .role_arn(role_arn)
    .role_session_name(&aws.role_session_name)
    .set_external_id(aws.external_id.clone())
    .send()
    .await
    .map_err(|err| CoreMirrorError::CredentialError(DisplayErrorContext(&err).to_string()))?;

  let credentials = output.credentials().ok_or_else(|| {
    CoreMirrorError::CredentialError(format!("AssumeRole for {} returned no credentials", role_arn))
  })?;

  Ok(Credentials::new(
    credentials.access_key_id(),
    credentials.secret_access_key(),
    Some(credentials.session_token().to_owned()),
    SystemTime::try_from(*credentials.expiration()).ok(),
    ASSUME_ROLE_PROVIDER_NAME,
  ))
}

#[cfg(test)]
mod tests {
  use std::env;

  use super::*;
  use crate::utils::environment::load_env;

  fn aws_config(key: Option<&str>, secret: Option<&str>, token: Option<&str>) -> AwsAuthConfig {
    AwsAuthConfig {
      role_arn: Some("arn:aws:iam::123456789012:role/mirror".to_owned()),
      external_id: Some("external".to_owned()),
      aws_access_key_id: key.map(str::to_owned),
      aws_secret_access_key: secret.map(str::to_owned),
      aws_session_token: token.map(str::to_owned),
      region_name: "eu-west-1".to_owned(),
      role_session_name: "test".to_owned(),
    }
  }

  #[test]
  fn test_credential_source_priority() {
    let aws = aws_config(Some("AKID"), Some("SECRET"), Some("TOKEN"));
    assert_eq!(
      credential_source(&aws),
      CredentialSource::Session {
        access_key_id: "AKID",
        secret_access_key: "SECRET",
        session_token: "TOKEN",
      }
    );

    let aws = aws_config(Some("AKID"), Some("SECRET"), None);
    assert_eq!(
      credential_source(&aws),
      CredentialSource::AssumeRoleWithKeys {
        access_key_id: "AKID",
        secret_access_key: "SECRET",
      }
    );

    // An empty session token counts as missing.
    let aws = aws_config(Some("AKID"), Some("SECRET"), Some(""));
    assert!(matches!(
      credential_source(&aws),
      CredentialSource::AssumeRoleWithKeys { .. }
    ));

    // A session token without keys is not enough.
    let aws = aws_config(None, None, Some("TOKEN"));
    assert_eq!(
      credential_source(&aws),
      CredentialSource::AssumeRoleWithDefaultChain
    );

    let aws = aws_config(Some("AKID"), None, None);
    assert_eq!(
      credential_source(&aws),
      CredentialSource::AssumeRoleWithDefaultChain
    );
  }

  #[tokio::test]
  async fn test_resolve_session_credentials() {
    let aws = aws_config(Some("AKID"), Some("SECRET"), Some("TOKEN"));
    let credentials = resolve_credentials(&aws).await.unwrap();
    assert_eq!(credentials.access_key_id(), "AKID");
    assert_eq!(credentials.secret_access_key(), "SECRET");
    assert_eq!(credentials.session_token(), Some("TOKEN"));
    assert_eq!(credentials.expiry(), None);
  }

  #[tokio::test]
  async fn test_assume_role_requires_role_arn() {
    let mut aws = aws_config(Some("AKID"), Some("SECRET"), None);
    aws.role_arn = None;
    let result = resolve_credentials(&aws).await;
    assert!(matches!(
      result,
      Err(CoreMirrorError::InvalidConfiguration(_))
    ));
  }

  #[tokio::test]
  async fn test_assume_role_with_default_chain() {
    // Load environment variables - esp creds for assuming a role.
    load_env();

    // Do not run this test in Github Actions, and do not run it if the AWS credentials are not set.
    if env::var("GITHUB_ACTIONS").is_ok()
      || env::var("AWS_ACCESS_KEY_ID").is_err()
      || env::var("MIRROR_TEST_ROLE_ARN").is_err()
    {
      return;
    }

    let mut aws = aws_config(None, None, None);
    aws.role_arn = env::var("MIRROR_TEST_ROLE_ARN").ok();
    aws.external_id = env::var("MIRROR_TEST_EXTERNAL_ID").ok();
    let credentials = resolve_credentials(&aws).await.unwrap();
    assert!(credentials.session_token().is_some());
    assert!(credentials.expiry().is_some());
  }
}
