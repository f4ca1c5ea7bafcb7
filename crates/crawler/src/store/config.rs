/// Connection settings for an S3-compatible bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Custom endpoint (MinIO, LocalStack); `None` means AWS
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    /// Static credentials. When absent the default AWS provider chain is used
    /// (environment, shared profile, instance metadata).
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub path_style: bool,
}

impl StoreConfig {
    pub fn for_aws(region: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: None,
            region: region.into(),
            bucket: bucket.into(),
            access_key: None,
            secret_key: None,
            path_style: false,
        }
    }

    pub fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: "us-east-1".to_string(),
            bucket: bucket.into(),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            path_style: true,
        }
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// `s3://bucket` form used in log lines
    pub fn bucket_url(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_minio() {
        let config = StoreConfig::for_minio("http://localhost:9000", "test-bucket");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.bucket, "test-bucket");
        assert!(config.path_style);
        assert_eq!(config.access_key.as_deref(), Some("minioadmin"));
    }

    #[test]
    fn test_for_aws_uses_provider_chain() {
        let config = StoreConfig::for_aws("eu-west-1", "metrics");
        assert_eq!(config.endpoint, None);
        assert_eq!(config.region, "eu-west-1");
        assert!(config.access_key.is_none());
        assert!(!config.path_style);
        assert_eq!(config.bucket_url(), "s3://metrics");
    }

    #[test]
    fn test_with_credentials() {
        let config = StoreConfig::for_aws("eu-west-1", "metrics").with_credentials("ak", "sk");
        assert_eq!(config.access_key.as_deref(), Some("ak"));
        assert_eq!(config.secret_key.as_deref(), Some("sk"));
    }
}
