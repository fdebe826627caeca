use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::{Credentials, Region};

use crate::infrastructure::config::AwsConfig;

/// Shared SDK configuration for the S3 and Bedrock clients. Explicit keys
/// from the configuration win; otherwise the default provider chain applies.
pub async fn load_sdk_config(config: &AwsConfig) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    if let (Some(access_key), Some(secret_key)) =
        (&config.access_key_id, &config.secret_access_key)
    {
        tracing::debug!("using AWS credentials from configuration");
        loader = loader.credentials_provider(Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "pdf-rag-config",
        ));
    }

    loader.load().await
}
