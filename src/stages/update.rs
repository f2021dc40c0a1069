//! Update stage - apply package updates, then the controlled kernel path

use tracing::info;

use crate::pkg::{KernelOutcome, PatchOps};
use crate::PrepatchError;

/// Apply all pending updates except the held-back package families
pub async fn apply(patch: &dyn PatchOps) -> Result<(), PrepatchError> {
    patch.apply_updates().await
}

/// Check for and apply a kernel update; returns whether a reboot was scheduled
pub async fn kernel(patch: &dyn PatchOps) -> Result<bool, PrepatchError> {
    match patch.update_kernel().await? {
        KernelOutcome::Updated { running, installed } => {
            info!(
                "Kernel updated from {} to {}; scheduling reboot",
                running, installed
            );
            patch.schedule_reboot().await?;
            Ok(true)
        }
        KernelOutcome::UpToDate => Ok(false),
    }
}
