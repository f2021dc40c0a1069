//! Mock package-manager for testing
//!
//! Records the order of operations so pipeline tests can assert that the
//! updater never runs after a failed snapshot batch, and that the kernel
//! path follows the general update.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{KernelOutcome, PatchOps, UpdateCheck};
use crate::PrepatchError;

/// Mock patch operations for testing
pub struct MockPatch {
    check_result: UpdateCheck,
    kernel_outcome: KernelOutcome,
    apply_error: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl MockPatch {
    /// Create a mock reporting pending updates and an up-to-date kernel
    pub fn new() -> Self {
        Self {
            check_result: UpdateCheck::Available,
            kernel_outcome: KernelOutcome::UpToDate,
            apply_error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the result of the pending-update check
    pub fn with_check_result(mut self, result: UpdateCheck) -> Self {
        self.check_result = result;
        self
    }

    /// Set the kernel update outcome
    pub fn with_kernel_outcome(mut self, outcome: KernelOutcome) -> Self {
        self.kernel_outcome = outcome;
        self
    }

    /// Make the package update fail
    pub fn with_apply_failure(mut self, message: &str) -> Self {
        self.apply_error = Some(message.to_string());
        self
    }

    /// Operations invoked so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

impl Default for MockPatch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatchOps for MockPatch {
    async fn check_updates(&self) -> Result<UpdateCheck, PrepatchError> {
        self.record("check_updates");
        Ok(self.check_result.clone())
    }

    async fn apply_updates(&self) -> Result<(), PrepatchError> {
        self.record("apply_updates");
        match &self.apply_error {
            Some(message) => Err(PrepatchError::UpdateApply(message.clone())),
            None => Ok(()),
        }
    }

    async fn update_kernel(&self) -> Result<KernelOutcome, PrepatchError> {
        self.record("update_kernel");
        Ok(self.kernel_outcome.clone())
    }

    async fn schedule_reboot(&self) -> Result<(), PrepatchError> {
        self.record("schedule_reboot");
        Ok(())
    }
}
