//! Package-manager and OS-level operations
//!
//! Wraps the yum / rpm / shutdown surface behind the `PatchOps` trait. The
//! yum exit-code convention (100 = updates pending, 0 = none, anything else
//! = error) lives only here, classified into [`UpdateCheck`] at the boundary.

pub mod exclude;
pub mod mock;
pub mod yum;

use async_trait::async_trait;

use crate::PrepatchError;

/// Result of a pending-update check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    /// Updates are pending (yum exit 100)
    Available,
    /// Nothing to update (yum exit 0)
    None,
    /// The check itself failed (any other exit)
    Failed(String),
}

impl UpdateCheck {
    /// Classify a yum `check-update` exit code
    pub fn from_exit_code(code: Option<i32>, stderr: &str) -> Self {
        match code {
            Some(100) => Self::Available,
            Some(0) => Self::None,
            Some(other) => Self::Failed(format!("check-update exited {}: {}", other, stderr.trim())),
            None => Self::Failed("check-update terminated by signal".to_string()),
        }
    }
}

/// Outcome of the controlled kernel update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelOutcome {
    /// A new kernel was installed; the running and installed versions differ
    /// until the scheduled reboot.
    Updated { running: String, installed: String },
    /// No kernel update was pending
    UpToDate,
}

/// Package-manager and OS operations the pipeline depends on
#[async_trait]
pub trait PatchOps: Send + Sync {
    /// Check for pending updates, excluding the log-shipper package family.
    async fn check_updates(&self) -> Result<UpdateCheck, PrepatchError>;

    /// Apply all pending updates except the log-shipper and kernel families:
    /// a dry run to surface the change set, then the real non-interactive run.
    async fn apply_updates(&self) -> Result<(), PrepatchError>;

    /// Check for and apply a kernel update under explicit control.
    async fn update_kernel(&self) -> Result<KernelOutcome, PrepatchError>;

    /// Schedule a delayed reboot; fire and forget.
    async fn schedule_reboot(&self) -> Result<(), PrepatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_100_means_updates_available() {
        assert_eq!(UpdateCheck::from_exit_code(Some(100), ""), UpdateCheck::Available);
    }

    #[test]
    fn exit_0_means_no_updates() {
        assert_eq!(UpdateCheck::from_exit_code(Some(0), ""), UpdateCheck::None);
    }

    #[test]
    fn other_exit_codes_are_failures() {
        for code in [1, 2, 127] {
            match UpdateCheck::from_exit_code(Some(code), "repo metadata error") {
                UpdateCheck::Failed(message) => {
                    assert!(message.contains(&code.to_string()));
                    assert!(message.contains("repo metadata error"));
                }
                other => panic!("expected Failed for exit {}, got {:?}", code, other),
            }
        }
    }

    #[test]
    fn signal_termination_is_a_failure() {
        assert!(matches!(
            UpdateCheck::from_exit_code(None, ""),
            UpdateCheck::Failed(_)
        ));
    }
}
