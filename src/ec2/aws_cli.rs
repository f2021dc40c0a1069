//! `aws` CLI backed implementation of [`Ec2Api`]
//!
//! Every call is a single `aws ec2 ...` invocation with `--output json`; the
//! responses are parsed into typed records. No retries: a nonzero exit from the
//! CLI is surfaced as an error with the CLI's stderr attached.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::{Ec2Api, SnapshotRequest};
use crate::PrepatchError;

/// Control-plane client for one region
pub struct AwsCli {
    region: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstances {
    reservations: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeTags {
    tags: Vec<TagRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TagRecord {
    key: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVolumes {
    volumes: Vec<VolumeRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VolumeRecord {
    volume_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSnapshot {
    snapshot_id: String,
}

impl AwsCli {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    /// Run an `aws ec2` subcommand and return its stdout
    async fn invoke(&self, action: &str, args: &[&str]) -> Result<String, PrepatchError> {
        debug!("aws ec2 {} {:?}", action, args);

        let output = Command::new("aws")
            .arg("ec2")
            .arg(action)
            .args(args)
            .args(["--region", &self.region, "--output", "json"])
            .output()
            .await
            .map_err(|e| PrepatchError::Command(format!("aws ec2 {}: {}", action, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrepatchError::api(format!("aws ec2 {}", action), stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Ec2Api for AwsCli {
    async fn validate_instance(&self, instance_id: &str) -> Result<(), PrepatchError> {
        let stdout = self
            .invoke("describe-instances", &["--instance-ids", instance_id])
            .await
            .map_err(|e| PrepatchError::Validation {
                instance_id: instance_id.to_string(),
                region: self.region.clone(),
                message: e.to_string(),
            })?;

        let response: DescribeInstances = serde_json::from_str(&stdout)?;
        if response.reservations.is_empty() {
            return Err(PrepatchError::Validation {
                instance_id: instance_id.to_string(),
                region: self.region.clone(),
                message: "no matching reservations".to_string(),
            });
        }

        Ok(())
    }

    async fn name_tag(&self, resource_id: &str) -> Result<Option<String>, PrepatchError> {
        let resource_filter = format!("Name=resource-id,Values={}", resource_id);
        let stdout = self
            .invoke(
                "describe-tags",
                &["--filters", &resource_filter, "Name=key,Values=Name"],
            )
            .await?;

        let response: DescribeTags = serde_json::from_str(&stdout)?;
        let value = response
            .tags
            .into_iter()
            .find(|t| t.key == "Name")
            .map(|t| t.value);

        // "None" is the query-language placeholder for a missing value; fold it
        // into absence so the caller's fallback applies.
        match value {
            Some(v) if v.is_empty() || v == "None" => Ok(None),
            other => Ok(other),
        }
    }

    async fn attached_volumes(&self, instance_id: &str) -> Result<Vec<String>, PrepatchError> {
        let attachment_filter = format!("Name=attachment.instance-id,Values={}", instance_id);
        let stdout = self
            .invoke("describe-volumes", &["--filters", &attachment_filter])
            .await?;

        let response: DescribeVolumes = serde_json::from_str(&stdout)?;
        Ok(response.volumes.into_iter().map(|v| v.volume_id).collect())
    }

    async fn create_snapshot(&self, request: &SnapshotRequest) -> Result<String, PrepatchError> {
        let tag_spec = format!(
            "ResourceType=snapshot,Tags=[{{Key=Name,Value={name}}},{{Key=SourceInstance,Value={instance}}},{{Key=SourceInstanceName,Value={instance_name}}},{{Key=SourceVolume,Value={volume}}},{{Key=Purpose,Value=PreUpdate}}]",
            name = request.name,
            instance = request.source_instance,
            instance_name = request.source_instance_name,
            volume = request.volume_id,
        );

        let stdout = self
            .invoke(
                "create-snapshot",
                &[
                    "--volume-id",
                    &request.volume_id,
                    "--description",
                    &request.description,
                    "--tag-specifications",
                    &tag_spec,
                ],
            )
            .await?;

        let response: CreateSnapshot = serde_json::from_str(&stdout)?;
        Ok(response.snapshot_id)
    }

    async fn wait_snapshot_completed(&self, snapshot_id: &str) -> Result<(), PrepatchError> {
        debug!("Waiting for {} to complete", snapshot_id);

        let output = Command::new("aws")
            .args(["ec2", "wait", "snapshot-completed", "--snapshot-ids", snapshot_id])
            .args(["--region", &self.region])
            .output()
            .await
            .map_err(|e| PrepatchError::Command(format!("aws ec2 wait: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrepatchError::api("aws ec2 wait snapshot-completed", stderr));
        }

        Ok(())
    }
}
