use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use convoy_cluster::HttpClusterClient;
use convoy_core::{Chunking, Deployment, DeploymentConfig, PlanExecutor, Strategy};

#[derive(Parser, Debug)]
#[command(
    name = "convoy",
    about = "Convoy — chunked deployments for unit-based cluster schedulers",
    version,
)]
struct Cli {
    /// Scheduler API endpoint
    #[arg(long, env = "CONVOY_ENDPOINT", default_value = "http://localhost:49153")]
    endpoint: String,

    /// Name of the service to deploy
    #[arg(long)]
    name: String,

    /// Release tag used when naming spawned units.
    /// Defaults to the tag of the first discovered unit.
    #[arg(long)]
    tag: Option<String>,

    /// Deployment strategy: stopstart, rolling or atomic
    #[arg(long, default_value = "stopstart")]
    strategy: Strategy,

    /// Desired number of unit instances (default: keep the current count)
    #[arg(long)]
    instances: Option<usize>,

    /// Unit file used as the template for spawned units
    /// (default: fetch the service's template unit from the cluster)
    #[arg(long)]
    unit_file: Option<PathBuf>,

    /// Handoff script invoked once per chunk under the atomic strategy
    #[arg(long)]
    handler: Option<PathBuf>,

    /// Number of units per stage
    #[arg(long, conflicts_with = "chunk_percent")]
    chunk_count: Option<usize>,

    /// Percentage of units per stage (1-100)
    #[arg(long)]
    chunk_percent: Option<u32>,

    /// Seconds to wait between printing the plan and executing it
    #[arg(long, default_value_t = 0)]
    delay: u64,

    /// Print the plan without executing it
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn chunking(&self) -> Chunking {
        match (self.chunk_count, self.chunk_percent) {
            (Some(count), _) => Chunking::Count(count),
            (None, Some(percent)) => Chunking::Percent(percent),
            (None, None) => Chunking::Auto,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("convoy=info".parse()?),
        )
        .init();

    run(Cli::parse()).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let chunking = cli.chunking();
    let mut deployment = Deployment::new(DeploymentConfig {
        service: cli.name,
        strategy: cli.strategy,
        tag: cli.tag,
        instances: cli.instances,
        unit_file: cli.unit_file,
        handler: cli.handler,
        chunking,
    })?;

    // An unreachable scheduler is fatal here, before any planning.
    let cluster = HttpClusterClient::connect(&cli.endpoint)
        .await
        .context("unable to connect to the cluster scheduler")?;

    deployment.load(&cluster).await?;
    deployment.resolve_chunking()?;
    deployment.create_plans()?;

    for line in deployment.describe() {
        println!("{line}");
    }

    if cli.dry_run {
        return Ok(());
    }

    if cli.delay > 0 {
        info!(seconds = cli.delay, "delaying before execution");
        tokio::time::sleep(Duration::from_secs(cli.delay)).await;
    }

    PlanExecutor::new(&cluster).run(&deployment).await?;
    println!("Deployment of {} complete.", deployment.deployment_name());
    Ok(())
}
