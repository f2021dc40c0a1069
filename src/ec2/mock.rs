//! Mock control-plane for testing
//!
//! Provides a configurable, builder-style [`Ec2Api`] implementation that
//! records snapshot requests so tests can assert on what was (not) created.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{Ec2Api, SnapshotRequest};
use crate::PrepatchError;

/// Mock control-plane for testing
///
/// # Example
/// ```
/// use prepatch_rs::ec2::mock::MockEc2;
///
/// let mock = MockEc2::new()
///     .with_instance_name("web1")
///     .with_volumes(&["vol-0123456789abcdef0"]);
/// ```
pub struct MockEc2 {
    validation_error: Option<String>,
    instance_name: Option<String>,
    volumes: Vec<String>,
    volume_names: HashMap<String, String>,
    failing_creates: HashSet<String>,
    failing_waits: HashSet<String>,
    created: Mutex<Vec<SnapshotRequest>>,
}

impl MockEc2 {
    /// Create a new mock with no volumes and a passing validation
    pub fn new() -> Self {
        Self {
            validation_error: None,
            instance_name: None,
            volumes: Vec::new(),
            volume_names: HashMap::new(),
            failing_creates: HashSet::new(),
            failing_waits: HashSet::new(),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Make instance validation fail with the given message
    pub fn with_validation_failure(mut self, message: &str) -> Self {
        self.validation_error = Some(message.to_string());
        self
    }

    /// Set the instance's `Name` tag
    pub fn with_instance_name(mut self, name: &str) -> Self {
        self.instance_name = Some(name.to_string());
        self
    }

    /// Set the attached volume ids, in order
    pub fn with_volumes(mut self, volumes: &[&str]) -> Self {
        self.volumes = volumes.iter().map(|v| (*v).to_string()).collect();
        self
    }

    /// Set a volume's `Name` tag
    pub fn with_volume_name(mut self, volume_id: &str, name: &str) -> Self {
        self.volume_names
            .insert(volume_id.to_string(), name.to_string());
        self
    }

    /// Make snapshot creation fail for the given volume
    pub fn with_create_failure(mut self, volume_id: &str) -> Self {
        self.failing_creates.insert(volume_id.to_string());
        self
    }

    /// Make the completion wait fail for snapshots of the given volume
    pub fn with_wait_failure(mut self, volume_id: &str) -> Self {
        self.failing_waits.insert(volume_id.to_string());
        self
    }

    /// Snapshot requests accepted so far
    pub fn created_snapshots(&self) -> Vec<SnapshotRequest> {
        self.created.lock().unwrap().clone()
    }
}

impl Default for MockEc2 {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ec2Api for MockEc2 {
    async fn validate_instance(&self, instance_id: &str) -> Result<(), PrepatchError> {
        match &self.validation_error {
            Some(message) => Err(PrepatchError::Validation {
                instance_id: instance_id.to_string(),
                region: "mock-region-1".to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn name_tag(&self, resource_id: &str) -> Result<Option<String>, PrepatchError> {
        if resource_id.starts_with("vol-") {
            return Ok(self.volume_names.get(resource_id).cloned());
        }
        Ok(self.instance_name.clone())
    }

    async fn attached_volumes(&self, _instance_id: &str) -> Result<Vec<String>, PrepatchError> {
        Ok(self.volumes.clone())
    }

    async fn create_snapshot(&self, request: &SnapshotRequest) -> Result<String, PrepatchError> {
        if self.failing_creates.contains(&request.volume_id) {
            return Err(PrepatchError::Api(format!(
                "create-snapshot refused for {}",
                request.volume_id
            )));
        }

        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        Ok(format!("snap-{:017}", created.len()))
    }

    async fn wait_snapshot_completed(&self, snapshot_id: &str) -> Result<(), PrepatchError> {
        let created = self.created.lock().unwrap();
        let index: usize = snapshot_id
            .trim_start_matches("snap-")
            .trim_start_matches('0')
            .parse()
            .unwrap_or(0);

        if let Some(request) = created.get(index.saturating_sub(1)) {
            if self.failing_waits.contains(&request.volume_id) {
                return Err(PrepatchError::Api(format!(
                    "{} never reached completed",
                    snapshot_id
                )));
            }
        }
        Ok(())
    }
}
