//! yum-backed implementation of [`PatchOps`]
//!
//! Amazon Linux ships yum, whose `check-update` exit-code convention
//! (100 / 0 / other) this adapter translates into [`UpdateCheck`]. Exclusions
//! are passed through a transient config file rather than repeated flags so
//! both call sites share one documented mechanism.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::exclude::{ExcludeConf, EXCLUDE_CONF_PATH};
use super::{KernelOutcome, PatchOps, UpdateCheck};
use crate::PrepatchError;

/// Log-shipper package family, excluded from both the check and the update
pub const LOG_SHIPPER_GLOB: &str = "awslogs*";

/// Kernel package family, excluded from the general update and handled
/// separately under explicit control
pub const KERNEL_GLOB: &str = "kernel*";

/// yum / rpm / shutdown adapter
pub struct Yum {
    exclude_path: PathBuf,
}

impl Yum {
    pub fn new() -> Self {
        Self {
            exclude_path: PathBuf::from(EXCLUDE_CONF_PATH),
        }
    }

    async fn run(&self, cmd: &str, args: &[&str]) -> Result<Output, PrepatchError> {
        debug!("{} {:?}", cmd, args);
        Command::new(cmd)
            .args(args)
            .output()
            .await
            .map_err(|e| PrepatchError::Command(format!("{}: {}", cmd, e)))
    }

    /// Running kernel version, from `uname -r`
    async fn running_kernel(&self) -> Result<String, PrepatchError> {
        let output = self.run("uname", &["-r"]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Most recently installed kernel package, from `rpm -q --last kernel`
    async fn installed_kernel(&self) -> Result<String, PrepatchError> {
        let output = self.run("rpm", &["-q", "--last", "kernel"]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let newest = stdout
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().next())
            .unwrap_or("unknown");
        Ok(newest.trim_start_matches("kernel-").to_string())
    }
}

impl Default for Yum {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatchOps for Yum {
    async fn check_updates(&self) -> Result<UpdateCheck, PrepatchError> {
        let conf = ExcludeConf::create(&self.exclude_path, &[LOG_SHIPPER_GLOB])?;
        let conf_path = conf.path().to_string_lossy().into_owned();

        let output = self
            .run("yum", &["-c", &conf_path, "check-update"])
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            info!("Pending updates:\n{}", stdout.trim_end());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(UpdateCheck::from_exit_code(output.status.code(), &stderr))
    }

    async fn apply_updates(&self) -> Result<(), PrepatchError> {
        let conf = ExcludeConf::create(&self.exclude_path, &[LOG_SHIPPER_GLOB, KERNEL_GLOB])?;
        let conf_path = conf.path().to_string_lossy().into_owned();

        // Dry run first to surface the change set. --assumeno declines the
        // transaction, so its exit status carries no signal.
        let dry_run = self
            .run("yum", &["-c", &conf_path, "update", "--assumeno"])
            .await?;
        info!(
            "Update change set:\n{}",
            String::from_utf8_lossy(&dry_run.stdout).trim_end()
        );

        let output = self
            .run("yum", &["-c", &conf_path, "update", "-y"])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrepatchError::UpdateApply(stderr.trim().to_string()));
        }

        info!("Package update applied (kernel and log shipper held back)");
        Ok(())
    }

    async fn update_kernel(&self) -> Result<KernelOutcome, PrepatchError> {
        let check = self.run("yum", &["check-update", "kernel"]).await?;
        let stderr = String::from_utf8_lossy(&check.stderr);

        match UpdateCheck::from_exit_code(check.status.code(), &stderr) {
            UpdateCheck::None => {
                info!("No kernel update pending");
                return Ok(KernelOutcome::UpToDate);
            }
            UpdateCheck::Failed(message) => {
                return Err(PrepatchError::KernelUpdate(message));
            }
            UpdateCheck::Available => {}
        }

        let running = self.running_kernel().await?;
        info!("Kernel update pending (running {})", running);

        let output = self.run("yum", &["update", "-y", "kernel"]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrepatchError::KernelUpdate(stderr.trim().to_string()));
        }

        let installed = self.installed_kernel().await?;
        info!("Kernel {} installed (running {})", installed, running);

        Ok(KernelOutcome::Updated { running, installed })
    }

    async fn schedule_reboot(&self) -> Result<(), PrepatchError> {
        // Fire and forget: the reboot itself is never awaited or verified.
        let output = self
            .run(
                "shutdown",
                &["-r", "+1", "Rebooting in 1 minute to load the updated kernel"],
            )
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Could not schedule reboot: {}", stderr.trim());
            return Err(PrepatchError::KernelUpdate(format!(
                "reboot scheduling failed: {}",
                stderr.trim()
            )));
        }

        info!("Reboot scheduled in 1 minute");
        Ok(())
    }
}
