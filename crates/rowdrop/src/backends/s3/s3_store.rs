use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, ServerSideEncryption};
use serde::Deserialize;
use tracing::debug;

use crate::backends::{ObjectStore, PutRequest};

// ============================================================
//  🔧 S3StoreConfig — a bucket, a region, and maybe a detour
// ============================================================

/// 🔧 Configuration for the S3 store backend.
///
/// `bucket` is required. `region` defaults to us-east-1. `endpoint_url` is for
/// S3-compatible stores and turns on path-style addressing.
#[derive(Debug, Deserialize, Clone)]
pub struct S3StoreConfig {
    /// 🪣 Where the exports live, sleep, and wait to be downloaded by someone in finance
    pub bucket: String,
    /// 🌎 AWS region — defaults to "us-east-1" because that's where data goes to retire
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// 🧭 Optional custom endpoint (MinIO, R2, localstack). None = real AWS.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// 🌎 Default region — us-east-1. The Florida of AWS regions. Everyone ends up there eventually.
fn default_s3_region() -> String {
    "us-east-1".to_string()
}

/// 🪣 S3Store — one `PutObject` per key, metadata stamped on every one.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    store_config: S3StoreConfig,
}

// 🐛 Debug impl skips `client` — nobody debugging an export wants 400 lines of SDK config.
impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("store_config", &self.store_config)
            .finish()
    }
}

impl S3Store {
    /// 🚀 Load AWS config from the environment and build the client.
    ///
    /// No request is made here. A missing bucket or bad credentials show up on the
    /// first `PutObject`, as an upload error for that key.
    pub async fn new(store_config: S3StoreConfig) -> Self {
        let the_aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(store_config.region.clone()))
            .load()
            .await;

        let mut the_builder = aws_sdk_s3::config::Builder::from(&the_aws_config);
        if let Some(endpoint_url) = &store_config.endpoint_url {
            // -- 🧭 S3-compatible stores rarely do virtual-hosted buckets. path-style it is.
            the_builder = the_builder
                .endpoint_url(endpoint_url.clone())
                .force_path_style(true);
        }
        let client = aws_sdk_s3::Client::from_conf(the_builder.build());

        Self {
            client,
            store_config,
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    /// 📡 Drain the body into one `PutObject`. No retries beyond what the SDK does on its own.
    async fn put_object(&mut self, request: PutRequest) -> Result<()> {
        let PutRequest {
            key,
            body,
            metadata,
        } = request;

        // -- 📖 take whatever the reader has not consumed yet. a fresh reader means all of it.
        let the_start = usize::try_from(body.position()).unwrap_or(usize::MAX);
        let the_bytes = body.into_inner();
        let the_bytes = the_bytes.slice(the_start.min(the_bytes.len())..);
        let the_length = the_bytes.len();

        let mut the_put = self
            .client
            .put_object()
            .bucket(&self.store_config.bucket)
            .key(&key)
            .content_length(i64::try_from(the_length).context("💀 payload too large for S3")?)
            .body(ByteStream::from(the_bytes));
        if let Some(content_type) = &metadata.content_type {
            the_put = the_put.content_type(content_type);
        }
        if let Some(content_encoding) = &metadata.content_encoding {
            the_put = the_put.content_encoding(content_encoding);
        }
        if let Some(access_policy) = &metadata.access_policy {
            the_put = the_put.acl(ObjectCannedAcl::from(access_policy.as_str()));
        }
        if let Some(server_side_encryption) = &metadata.server_side_encryption {
            the_put = the_put
                .server_side_encryption(ServerSideEncryption::from(server_side_encryption.as_str()));
        }

        the_put.send().await.context(format!(
            "💀 PutObject failed for s3://{}/{}. The bucket ghosted us. \
             Check: bucket name, region, credentials, ACL permissions, KMS key access.",
            self.store_config.bucket, key
        ))?;

        debug!(
            "🪣 {} bytes landed at s3://{}/{}",
            the_length, self.store_config.bucket, key
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_config_deserializes_like_a_well_behaved_struct() {
        let the_config: S3StoreConfig = figment::Figment::new()
            .merge(figment::providers::Serialized::defaults(
                std::collections::BTreeMap::from([
                    ("bucket", "exports"),
                    ("endpoint_url", "http://localhost:9000"),
                ]),
            ))
            .extract()
            .expect("💀 S3 config should parse. the bucket was right there.");

        assert_eq!(the_config.bucket, "exports");
        assert_eq!(the_config.region, "us-east-1");
        assert_eq!(the_config.endpoint_url.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn the_one_where_a_config_without_a_bucket_is_rejected() {
        let the_verdict: Result<S3StoreConfig, _> = figment::Figment::new()
            .merge(figment::providers::Serialized::defaults(
                std::collections::BTreeMap::from([("region", "eu-west-1")]),
            ))
            .extract();
        assert!(the_verdict.is_err(), "no bucket, no store. the bouncer is awake.");
    }
}
