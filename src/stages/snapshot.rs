//! Snapshot stage - pre-update EBS snapshots
//!
//! Volumes are snapshotted strictly one at a time: create, then block on the
//! provider's completion wait before touching the next volume. A single
//! volume's failure is recorded and the loop continues, but any failure in
//! the batch fails the stage so package updates never run on a host with an
//! incomplete backup set.

use tracing::{error, info, warn};

use crate::ec2::{Ec2Api, SnapshotRequest};
use crate::{PrepatchError, RunContext};

/// Per-run snapshot counters; any failure fails the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotTally {
    pub succeeded: usize,
    pub failed: usize,
}

/// Snapshot every volume attached to the instance
///
/// An empty volume set is an anomaly, not a valid "nothing to back up"
/// state, and aborts before any snapshot is requested.
pub async fn run(ec2: &dyn Ec2Api, ctx: &RunContext) -> Result<SnapshotTally, PrepatchError> {
    let volumes = ec2.attached_volumes(&ctx.instance_id).await?;
    if volumes.is_empty() {
        return Err(PrepatchError::NoVolumes(ctx.instance_id.clone()));
    }

    info!("Snapshotting {} attached volume(s)", volumes.len());
    let mut tally = SnapshotTally::default();

    for volume_id in &volumes {
        let volume_name = ec2.name_tag(volume_id).await?;
        let name = compose_snapshot_name(
            &ctx.instance_name,
            volume_name.as_deref(),
            volume_id,
            &ctx.date_stamp,
        );
        let request = SnapshotRequest {
            volume_id: volume_id.clone(),
            description: format!(
                "Pre-update snapshot {} of {} attached to {}",
                name, volume_id, ctx.instance_id
            ),
            name,
            source_instance: ctx.instance_id.clone(),
            source_instance_name: ctx.instance_name.clone(),
        };

        match ec2.create_snapshot(&request).await {
            Ok(snapshot_id) => {
                info!("Created {} for {}", snapshot_id, volume_id);
                match ec2.wait_snapshot_completed(&snapshot_id).await {
                    Ok(()) => {
                        info!("{} completed", snapshot_id);
                        tally.succeeded += 1;
                    }
                    Err(e) => {
                        warn!("{} did not complete: {}", snapshot_id, e);
                        tally.failed += 1;
                    }
                }
            }
            Err(e) => {
                error!("Snapshot of {} failed: {}", volume_id, e);
                tally.failed += 1;
            }
        }
    }

    info!(
        "Snapshot batch done: {} succeeded, {} failed",
        tally.succeeded, tally.failed
    );
    Ok(tally)
}

/// Compose the snapshot `Name` tag
///
/// `<instance>-<volume name>-<date>` when the volume carries a `Name` tag,
/// otherwise `<instance>-vol-<id tail>-<date>`.
pub fn compose_snapshot_name(
    instance_name: &str,
    volume_name: Option<&str>,
    volume_id: &str,
    date_stamp: &str,
) -> String {
    match volume_name {
        Some(name) => format!("{}-{}-{}", instance_name, name, date_stamp),
        None => {
            let tail = volume_id.rsplit('-').next().unwrap_or(volume_id);
            format!("{}-vol-{}-{}", instance_name, tail, date_stamp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec2::mock::MockEc2;

    fn context() -> RunContext {
        RunContext {
            instance_id: "i-0abc123def4567890".to_string(),
            region: "us-east-1".to_string(),
            instance_name: "web1".to_string(),
            date_stamp: "2024-01-01-00-00-00".to_string(),
        }
    }

    #[test]
    fn named_volume_uses_its_tag() {
        let name =
            compose_snapshot_name("web1", Some("data"), "vol-0123456789abcdef0", "2024-01-01-00-00-00");
        assert_eq!(name, "web1-data-2024-01-01-00-00-00");
    }

    #[test]
    fn unnamed_volume_uses_the_id_tail() {
        let name = compose_snapshot_name("web1", None, "vol-0123456789abcdef0", "2024-01-01-00-00-00");
        assert_eq!(name, "web1-vol-0123456789abcdef0-2024-01-01-00-00-00");
    }

    #[tokio::test]
    async fn empty_volume_set_aborts_without_creating_anything() {
        let ec2 = MockEc2::new();
        let result = run(&ec2, &context()).await;
        assert!(matches!(result, Err(PrepatchError::NoVolumes(_))));
        assert!(ec2.created_snapshots().is_empty());
    }

    #[tokio::test]
    async fn all_volumes_are_snapshotted_in_order() {
        let ec2 = MockEc2::new()
            .with_volumes(&["vol-0aaa", "vol-0bbb"])
            .with_volume_name("vol-0aaa", "data");

        let tally = run(&ec2, &context()).await.unwrap();
        assert_eq!(tally, SnapshotTally { succeeded: 2, failed: 0 });

        let created = ec2.created_snapshots();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].name, "web1-data-2024-01-01-00-00-00");
        assert_eq!(created[1].name, "web1-vol-0bbb-2024-01-01-00-00-00");
        assert_eq!(created[0].source_instance, "i-0abc123def4567890");
        assert_eq!(created[0].source_instance_name, "web1");
    }

    #[tokio::test]
    async fn one_failure_is_recorded_and_the_loop_continues() {
        let ec2 = MockEc2::new()
            .with_volumes(&["vol-0aaa", "vol-0bbb", "vol-0ccc"])
            .with_create_failure("vol-0bbb");

        let tally = run(&ec2, &context()).await.unwrap();
        assert_eq!(tally, SnapshotTally { succeeded: 2, failed: 1 });

        // The later volume was still attempted
        let created = ec2.created_snapshots();
        assert!(created.iter().any(|r| r.volume_id == "vol-0ccc"));
    }

    #[tokio::test]
    async fn a_wait_failure_counts_against_the_batch() {
        let ec2 = MockEc2::new()
            .with_volumes(&["vol-0aaa"])
            .with_wait_failure("vol-0aaa");

        let tally = run(&ec2, &context()).await.unwrap();
        assert_eq!(tally, SnapshotTally { succeeded: 0, failed: 1 });
    }
}
