//! prepatch-rs - snapshot EBS volumes, then patch with the kernel held back
//!
//! Exit codes: 0 for success or nothing to do, 1 for any validation,
//! snapshot, or update failure.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use prepatch_rs::ec2::aws_cli::AwsCli;
use prepatch_rs::imds::Imds;
use prepatch_rs::pkg::yum::Yum;
use prepatch_rs::pkg::{PatchOps, UpdateCheck};
use prepatch_rs::{
    run_pipeline, stages, InstanceIdentity, PipelineOutcome, PrepatchError, RunContext, Stage,
};

#[derive(Parser)]
#[command(name = "prepatch-rs")]
#[command(author, version, about = "Pre-patch EBS snapshots and controlled package updates", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Region override; skips the metadata service when paired with --instance-id
    #[arg(long, env = "PREPATCH_REGION")]
    region: Option<String>,

    /// Instance id override; skips the metadata service when paired with --region
    #[arg(long, env = "PREPATCH_INSTANCE_ID")]
    instance_id: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: check, snapshot, update, kernel
    Run,
    /// Check for pending updates only (log shipper excluded)
    Check,
    /// Snapshot all attached volumes without updating anything
    Snapshot,
    /// Query an instance metadata path (e.g. instance-id, placement/region)
    Query {
        key: String,
    },
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Resolve identity from the CLI overrides or the metadata service
async fn resolve_identity(cli: &Cli) -> Result<InstanceIdentity, PrepatchError> {
    if let (Some(instance_id), Some(region)) = (&cli.instance_id, &cli.region) {
        return Ok(InstanceIdentity {
            instance_id: instance_id.clone(),
            region: region.clone(),
        });
    }
    Imds::new().resolve_identity().await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Query { ref key }) => {
            let value = Imds::new()
                .fetch(key)
                .await
                .ok_or_else(|| PrepatchError::Metadata(format!("no value for {}", key)))?;
            println!("{}", value);
            return Ok(());
        }
        Some(Commands::Check) => {
            info!("Starting stage: {}", Stage::Preflight);
            stages::preflight::run().await?;

            match Yum::new().check_updates().await? {
                UpdateCheck::Available => info!("Updates are pending"),
                UpdateCheck::None => info!("No updates pending"),
                UpdateCheck::Failed(message) => {
                    return Err(PrepatchError::UpdateCheck(message).into());
                }
            }
            return Ok(());
        }
        _ => {}
    }

    info!("Starting stage: {}", Stage::Preflight);
    stages::preflight::run().await?;

    let identity = resolve_identity(&cli)
        .await
        .context("resolving instance identity")?;
    info!(
        "Operating on {} in {}",
        identity.instance_id, identity.region
    );

    let ec2 = AwsCli::new(&identity.region);

    match cli.command {
        Some(Commands::Snapshot) => {
            stages::identity::validate(&ec2, &identity).await?;
            let instance_name = stages::identity::resolve_name(&ec2, &identity).await?;
            let ctx = RunContext {
                instance_id: identity.instance_id.clone(),
                region: identity.region.clone(),
                instance_name,
                date_stamp: Utc::now().format("%Y-%m-%d-%H-%M-%S").to_string(),
            };

            let tally = stages::snapshot::run(&ec2, &ctx).await?;
            if tally.failed > 0 {
                return Err(PrepatchError::SnapshotBatch {
                    succeeded: tally.succeeded,
                    failed: tally.failed,
                }
                .into());
            }
            info!("All {} snapshot(s) completed", tally.succeeded);
        }
        _ => {
            let patch = Yum::new();
            match run_pipeline(&identity, &ec2, &patch).await? {
                PipelineOutcome::NoUpdates => info!("Nothing to do"),
                PipelineOutcome::Patched { rebooting: true } => {
                    info!("Patched; rebooting in 1 minute for the new kernel");
                }
                PipelineOutcome::Patched { rebooting: false } => {
                    info!("Patched; no kernel update was pending");
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
