//! Instance metadata service client
//!
//! Resolves instance identity from the EC2 Instance Metadata Service (IMDS).
//! Supports both IMDSv1 and IMDSv2 (preferred for security).

use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::{InstanceIdentity, PrepatchError};

/// EC2 metadata service base URL (link-local address)
const IMDS_BASE_URL: &str = "http://169.254.169.254";

/// IMDSv2 token TTL in seconds
const TOKEN_TTL_SECONDS: u32 = 300;

/// Client for the instance metadata endpoint
pub struct Imds {
    client: Client,
    base_url: String,
}

impl Imds {
    pub fn new() -> Self {
        Self::with_base_url(IMDS_BASE_URL)
    }

    /// Point the client at a non-default endpoint (used by tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Get an IMDSv2 token for authenticated requests
    ///
    /// The token is not cached: each metadata lookup re-acquires one.
    async fn get_imdsv2_token(&self) -> Option<String> {
        let url = format!("{}/latest/api/token", self.base_url);
        let response = self
            .client
            .put(&url)
            .header("X-aws-ec2-metadata-token-ttl-seconds", TOKEN_TTL_SECONDS.to_string())
            .send()
            .await
            .ok()?;

        if response.status().is_success() {
            response.text().await.ok()
        } else {
            None
        }
    }

    /// Fetch a metadata path, trying IMDSv2 first then falling back to IMDSv1
    ///
    /// Returns `None` when both protocol versions fail; no retries.
    pub async fn fetch(&self, path: &str) -> Option<String> {
        let url = format!("{}/latest/meta-data/{}", self.base_url, path);

        // Try IMDSv2 first (more secure)
        if let Some(token) = self.get_imdsv2_token().await {
            debug!("Using IMDSv2 for {}", path);
            let response = self
                .client
                .get(&url)
                .header("X-aws-ec2-metadata-token", &token)
                .send()
                .await
                .ok()?;

            if response.status().is_success() {
                return response.text().await.ok();
            }
        }

        // Fall back to IMDSv1
        debug!("Falling back to IMDSv1 for {}", path);
        let response = self.client.get(&url).send().await.ok()?;

        if response.status().is_success() {
            response.text().await.ok()
        } else {
            None
        }
    }

    /// Resolve the identity of the instance this process is running on
    pub async fn resolve_identity(&self) -> Result<InstanceIdentity, PrepatchError> {
        let instance_id = self
            .fetch("instance-id")
            .await
            .ok_or_else(|| PrepatchError::Metadata("could not determine instance id".to_string()))?;

        let region = self
            .fetch("placement/region")
            .await
            .ok_or_else(|| PrepatchError::Metadata("could not determine region".to_string()))?;

        debug!("Resolved identity: {} in {}", instance_id, region);

        Ok(InstanceIdentity {
            instance_id,
            region,
        })
    }
}

impl Default for Imds {
    fn default() -> Self {
        Self::new()
    }
}
