//! Control-plane access for instances, volumes, and snapshots
//!
//! The `Ec2Api` trait is the seam between the pipeline and the cloud provider;
//! the production implementation shells out to the `aws` CLI.

pub mod aws_cli;
pub mod mock;

use async_trait::async_trait;

use crate::PrepatchError;

/// Tags applied to every pre-update snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub volume_id: String,
    pub description: String,
    /// `Name` tag, also embedded in the description
    pub name: String,
    pub source_instance: String,
    pub source_instance_name: String,
}

/// Control-plane operations the pipeline depends on
#[async_trait]
pub trait Ec2Api: Send + Sync {
    /// Confirm the instance exists; any query error is surfaced to the caller,
    /// which treats it as fatal (not-found is not distinguished).
    async fn validate_instance(&self, instance_id: &str) -> Result<(), PrepatchError>;

    /// Look up the `Name` tag on a resource (instance or volume).
    ///
    /// The placeholder string "None" that the CLI query language emits for a
    /// missing tag is normalized to absence.
    async fn name_tag(&self, resource_id: &str) -> Result<Option<String>, PrepatchError>;

    /// List volume ids currently attached to the instance, in API order.
    async fn attached_volumes(&self, instance_id: &str) -> Result<Vec<String>, PrepatchError>;

    /// Create a tagged snapshot; returns the new snapshot id.
    async fn create_snapshot(&self, request: &SnapshotRequest) -> Result<String, PrepatchError>;

    /// Block until the snapshot reaches the completed state (provider long-poll).
    async fn wait_snapshot_completed(&self, snapshot_id: &str) -> Result<(), PrepatchError>;
}
