//! Error types for prepatch-rs

use thiserror::Error;

/// Main error type for prepatch-rs operations
#[derive(Error, Debug)]
pub enum PrepatchError {
    #[error("Insufficient privileges: {0}")]
    Privilege(String),

    #[error("Required dependency missing: {0}")]
    MissingDependency(String),

    #[error("Metadata unavailable: {0}")]
    Metadata(String),

    #[error("Instance validation failed for {instance_id} in {region}: {message}")]
    Validation {
        instance_id: String,
        region: String,
        message: String,
    },

    #[error("Update check failed: {0}")]
    UpdateCheck(String),

    #[error("No volumes attached to instance {0}")]
    NoVolumes(String),

    #[error("Snapshot batch failed: {succeeded} succeeded, {failed} failed")]
    SnapshotBatch { succeeded: usize, failed: usize },

    #[error("Package update failed: {0}")]
    UpdateApply(String),

    #[error("Kernel update failed: {0}")]
    KernelUpdate(String),

    #[error("Control-plane error: {0}")]
    Api(String),

    #[error("Command execution failed: {0}")]
    Command(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PrepatchError {
    /// Create a control-plane error from a failed CLI invocation
    pub fn api(action: impl Into<String>, stderr: impl AsRef<str>) -> Self {
        Self::Api(format!(
            "{}: {}",
            action.into(),
            stderr.as_ref().trim()
        ))
    }
}
