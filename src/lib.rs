//! prepatch-rs library
//!
//! Pre-patch automation for EC2 instances: snapshot every attached EBS
//! volume, then apply package updates with the log shipper and kernel held
//! back, and handle the kernel separately with a scheduled reboot.
//!
//! # Design Principles
//!
//! - **Safety First**: No unsafe code (`#![forbid(unsafe_code)]`)
//! - **Fail Fast**: every external-call failure aborts the run, except the
//!   per-volume snapshot loop, which finishes the batch before failing
//! - **Explicit context**: instance identity, name, and date stamp are
//!   passed into each stage rather than threaded through globals

pub mod ec2;
pub mod imds;
pub mod pkg;
pub mod stages;

mod error;

pub use error::PrepatchError;

use chrono::Utc;
use tracing::info;

use ec2::Ec2Api;
use pkg::{PatchOps, UpdateCheck};
use stages::snapshot::SnapshotTally;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Privilege and dependency checks
    Preflight,
    /// Metadata resolution, instance validation, name resolution
    Identity,
    /// Pending-update check
    Check,
    /// Per-volume snapshot loop
    Snapshot,
    /// General package update
    Update,
    /// Controlled kernel update and reboot scheduling
    Kernel,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Preflight => write!(f, "preflight"),
            Stage::Identity => write!(f, "identity"),
            Stage::Check => write!(f, "check"),
            Stage::Snapshot => write!(f, "snapshot"),
            Stage::Update => write!(f, "update"),
            Stage::Kernel => write!(f, "kernel"),
        }
    }
}

/// Instance identity resolved once at startup; immutable afterward
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceIdentity {
    pub instance_id: String,
    pub region: String,
}

/// Explicit per-run context passed into each stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub instance_id: String,
    pub region: String,
    /// Sanitized `Name` tag, or the instance id when untagged
    pub instance_name: String,
    /// UTC timestamp embedded in snapshot names, fixed for the whole run
    pub date_stamp: String,
}

/// Terminal state of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Nothing was pending; no snapshot was taken and no update applied
    NoUpdates,
    /// Updates applied behind a complete snapshot set
    Patched {
        /// Whether a kernel update was installed and a reboot scheduled
        rebooting: bool,
    },
}

/// Run the full pipeline against the given control-plane and patch backends
///
/// Assumes preflight checks and identity resolution already happened; the
/// remaining stages run strictly top to bottom.
pub async fn run_pipeline(
    identity: &InstanceIdentity,
    ec2: &dyn Ec2Api,
    patch: &dyn PatchOps,
) -> Result<PipelineOutcome, PrepatchError> {
    info!("Starting stage: {}", Stage::Identity);
    stages::identity::validate(ec2, identity).await?;
    let instance_name = stages::identity::resolve_name(ec2, identity).await?;

    let ctx = RunContext {
        instance_id: identity.instance_id.clone(),
        region: identity.region.clone(),
        instance_name,
        date_stamp: Utc::now().format("%Y-%m-%d-%H-%M-%S").to_string(),
    };

    run_with_context(&ctx, ec2, patch).await
}

/// Pipeline body with a caller-supplied context (date stamp included)
pub async fn run_with_context(
    ctx: &RunContext,
    ec2: &dyn Ec2Api,
    patch: &dyn PatchOps,
) -> Result<PipelineOutcome, PrepatchError> {
    info!("Starting stage: {}", Stage::Check);
    match patch.check_updates().await? {
        UpdateCheck::Available => info!("Updates pending; snapshotting before applying"),
        UpdateCheck::None => {
            info!("No updates pending; nothing to do");
            return Ok(PipelineOutcome::NoUpdates);
        }
        UpdateCheck::Failed(message) => return Err(PrepatchError::UpdateCheck(message)),
    }

    info!("Starting stage: {}", Stage::Snapshot);
    let SnapshotTally { succeeded, failed } = stages::snapshot::run(ec2, ctx).await?;
    if failed > 0 {
        return Err(PrepatchError::SnapshotBatch { succeeded, failed });
    }

    info!("Starting stage: {}", Stage::Update);
    stages::update::apply(patch).await?;

    info!("Starting stage: {}", Stage::Kernel);
    let rebooting = stages::update::kernel(patch).await?;

    Ok(PipelineOutcome::Patched { rebooting })
}
