//! Retrieval credential minting
//! ----------------------------
//! Wraps the S3 client and produces time-boxed presigned GetObject URLs
//! scoped to exactly one key. The key is always built from resolved and
//! stored values, never from raw request path text, so a minted credential
//! can never point outside the object it was decided for.

use std::time::Duration;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;

use crate::config::S3Config;
use crate::error::{AppError, AppResult};

pub struct ObjectSigner {
    client: aws_sdk_s3::Client,
    ttl: Duration,
}

impl ObjectSigner {
    /// Build the S3 client from explicit configuration. Path-style
    /// addressing keeps MinIO-style endpoints working.
    pub fn from_config(s3: &S3Config, ttl: Duration) -> Self {
        let credentials = Credentials::new(
            s3.access_key_id.clone(),
            s3.secret_access_key.clone(),
            None,
            None,
            "filegate-static",
        );
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(s3.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(&s3.endpoint)
            .force_path_style(true)
            .build();
        Self {
            client: aws_sdk_s3::Client::from_conf(conf),
            ttl,
        }
    }

    /// Object-store key for an attachment: `{org public id}/{attachment
    /// id}/{stored filename}`.
    pub fn object_key(org_public_id: &str, attachment_public_id: &str, file_name: &str) -> String {
        format!("{}/{}/{}", org_public_id, attachment_public_id, file_name)
    }

    /// Mint a read-only retrieval credential for one key. Signing failure
    /// is an infrastructure error, not a client error.
    pub async fn presign_get(&self, bucket: &str, key: &str) -> AppResult<String> {
        let presigning = PresigningConfig::expires_in(self.ttl)
            .map_err(|e| AppError::Upstream(format!("invalid presign ttl: {e}")))?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| AppError::Upstream(format!("presigning failed: {e}")))?;
        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signer(ttl_secs: u64) -> ObjectSigner {
        let s3 = S3Config {
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            bucket_attachments: "attachments".to_string(),
            bucket_avatars: "avatars".to_string(),
        };
        ObjectSigner::from_config(&s3, Duration::from_secs(ttl_secs))
    }

    #[test]
    fn key_is_built_from_resolved_values() {
        assert_eq!(
            ObjectSigner::object_key("acme-public-id", "at_01h455vb4pex5vsknk084sn02q", "report.pdf"),
            "acme-public-id/at_01h455vb4pex5vsknk084sn02q/report.pdf"
        );
    }

    #[tokio::test]
    async fn presigned_url_is_scoped_to_the_exact_key() {
        let signer = test_signer(3600);
        let url = signer
            .presign_get(
                "attachments",
                "acme-public-id/at_01h455vb4pex5vsknk084sn02q/report.pdf",
            )
            .await
            .unwrap();
        assert!(url.starts_with(
            "http://localhost:9000/attachments/acme-public-id/at_01h455vb4pex5vsknk084sn02q/report.pdf?"
        ));
        assert!(url.contains("X-Amz-Expires=3600"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn repeated_mints_produce_fresh_credentials() {
        let signer = test_signer(3600);
        let a = signer.presign_get("attachments", "o/a/f.bin").await.unwrap();
        let b = signer.presign_get("attachments", "o/a/f.bin").await.unwrap();
        // Both are valid standalone credentials; neither is cached state.
        assert!(a.contains("X-Amz-Signature="));
        assert!(b.contains("X-Amz-Signature="));
    }
}
