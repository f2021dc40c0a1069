//! Preflight stage - privilege and dependency checks
//!
//! Both checks gate everything else: updates need root, and every
//! control-plane call shells out to the `aws` CLI.

use tracing::debug;

use crate::PrepatchError;

/// Run the preflight checks
pub async fn run() -> Result<(), PrepatchError> {
    require_root().await?;
    require_command("aws").await?;
    debug!("Preflight checks passed");
    Ok(())
}

/// Require an effective uid of 0
async fn require_root() -> Result<(), PrepatchError> {
    let output = tokio::process::Command::new("id")
        .arg("-u")
        .output()
        .await
        .map_err(|e| PrepatchError::Command(format!("id -u: {}", e)))?;

    let uid = String::from_utf8_lossy(&output.stdout);
    if uid.trim() == "0" {
        Ok(())
    } else {
        Err(PrepatchError::Privilege(
            "this tool must run as root".to_string(),
        ))
    }
}

/// Require a command to be present on PATH
async fn require_command(cmd: &str) -> Result<(), PrepatchError> {
    let found = tokio::process::Command::new("which")
        .arg(cmd)
        .output()
        .await
        .is_ok_and(|o| o.status.success());

    if found {
        Ok(())
    } else {
        Err(PrepatchError::MissingDependency(format!(
            "{} not found on PATH",
            cmd
        )))
    }
}
