use clap::{Parser, Subcommand};
use harness::validate::{Validator, ValidatorConfig};
use probe::{
    ClusterConfig, ElasticProbe, MysqlProbe, MysqlProbeConfig, SearchProbeConfig, ServiceProbe,
    WebProbe, WebProbeConfig,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "harness")]
#[command(about = "Smoke-test probes and pre-push validation for NodePort services")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the relational database service
    Database,
    /// Probe the search service
    Search,
    /// Probe the web server
    Web,
    /// Run all service probes in sequence
    All,
    /// Validate test sources and manifests before pushing
    Validate {
        /// Repository root to validate
        #[arg(long, default_value = ".")]
        repo_root: PathBuf,
        /// Skip the cargo test discovery pass
        #[arg(long)]
        skip_discovery: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cluster = ClusterConfig::from_env();

    match cli.command {
        Commands::Database => {
            let probe = MysqlProbe::new(MysqlProbeConfig::for_cluster(&cluster))?;
            run_probe(&probe).await
        }
        Commands::Search => {
            let probe = ElasticProbe::new(SearchProbeConfig::for_cluster(&cluster))?;
            run_probe(&probe).await
        }
        Commands::Web => {
            let probe = WebProbe::new(WebProbeConfig::for_cluster(&cluster))?;
            run_probe(&probe).await
        }
        Commands::All => run_all(&cluster).await,
        Commands::Validate {
            repo_root,
            skip_discovery,
        } => run_validate(repo_root, skip_discovery).await,
    }
}

async fn run_probe(probe: &dyn ServiceProbe) -> Result<(), Box<dyn std::error::Error>> {
    let name = probe.service_name();
    println!("Probing {}...", name);

    match probe.health_check().await {
        Ok(()) => println!("✓ {} is reachable", name),
        Err(e) => {
            println!("✗ {} health check failed: {}", name, e);
            error!("{} health check failed: {}", name, e);
            return Err(e.into());
        }
    }

    match probe.verify_seed_data().await {
        Ok(()) => {
            println!("✓ {} seed data verified", name);
            info!("{} probe passed", name);
            Ok(())
        }
        Err(e) => {
            println!("✗ {} seed data check failed: {}", name, e);
            error!("{} seed data check failed: {}", name, e);
            Err(e.into())
        }
    }
}

async fn run_all(cluster: &ClusterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mysql = MysqlProbe::new(MysqlProbeConfig::for_cluster(cluster))?;
    let elastic = ElasticProbe::new(SearchProbeConfig::for_cluster(cluster))?;
    let web = WebProbe::new(WebProbeConfig::for_cluster(cluster))?;

    let probes: Vec<&dyn ServiceProbe> = vec![&mysql, &elastic, &web];
    let mut failures = 0usize;

    // One probe failing never short-circuits its siblings.
    for probe in probes {
        if run_probe(probe).await.is_err() {
            failures += 1;
        }
        println!();
    }

    if failures > 0 {
        Err(format!("{} probe(s) failed", failures).into())
    } else {
        println!("All probes passed.");
        Ok(())
    }
}

async fn run_validate(
    repo_root: PathBuf,
    skip_discovery: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ValidatorConfig::default().with_repo_root(repo_root);
    if skip_discovery {
        config = config.without_discovery();
    }

    let report = Validator::new(config).run().await;
    println!("{}", report);

    if report.is_passing() {
        Ok(())
    } else {
        Err(format!("validation failed with {} error(s)", report.errors.len()).into())
    }
}
