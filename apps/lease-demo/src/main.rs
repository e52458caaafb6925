use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Args, Parser, Subcommand, ValueEnum};
use lease_store::config::{BackendKind, LeaseStoreConfig};
use lease_store::contract::{Lease, LeaseStoreApi, NewLease, NewResource, NewUser};
use lease_store::{LeaseStoreModule, SystemClock};
use runtime::{AppConfig, CliArgs};
use tokio::time::Instant;
use uuid::Uuid;

const POLL_INTERVAL: StdDuration = StdDuration::from_millis(25);

/// Lease store demo - create a user, a resource and a lease, then read them back
#[derive(Parser)]
#[command(name = "lease-demo")]
#[command(about = "Lease store demo - indexed users, resources and leases")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage backend (overrides config)
    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Hierarchical,
    SingleTable,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Hierarchical => BackendKind::Hierarchical,
            BackendArg::SingleTable => BackendKind::SingleTable,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the add-lease scenario against a fresh store
    Scenario(ScenarioArgs),
    /// Check configuration
    Check,
}

#[derive(Args, Clone)]
struct ScenarioArgs {
    #[arg(long, default_value = "John Doe")]
    display_name: String,
    #[arg(long, default_value = "john@x.com")]
    email: String,
    #[arg(long, default_value = "sensitive-service")]
    resource: String,
    #[arg(long, default_value = "debug")]
    reason: String,
    /// Lease duration in hours
    #[arg(long, default_value_t = 3)]
    hours: i64,
}

impl Default for ScenarioArgs {
    fn default() -> Self {
        Self {
            display_name: "John Doe".to_string(),
            email: "john@x.com".to_string(),
            resource: "sensitive-service".to_string(),
            reason: "debug".to_string(),
            hours: 3,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        backend: cli.backend.map(BackendKind::from),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::init_logging_from_config(&logging_config, Path::new(&config.home_dir));
    tracing::info!("lease-demo starting");

    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command {
        Some(Commands::Check) => check_config(&config),
        Some(Commands::Scenario(scenario)) => run_scenario(&config.storage, scenario).await,
        None => run_scenario(&config.storage, ScenarioArgs::default()).await,
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    LeaseStoreModule::init(&config.storage, Arc::new(SystemClock))
        .context("storage section does not produce a usable backend")?;

    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}

async fn run_scenario(storage: &LeaseStoreConfig, args: ScenarioArgs) -> Result<()> {
    let module = LeaseStoreModule::init(storage, Arc::new(SystemClock))?;
    let client = module.client();
    println!("Backend: {}", module.backend_name());

    let user = client
        .create_user(NewUser {
            display_name: args.display_name,
            email: args.email,
        })
        .await?;
    println!("Created user {} <{}> id={}", user.display_name, user.email, user.id);

    let resource = client
        .create_resource(NewResource {
            name: args.resource,
        })
        .await?;
    println!("Created resource {} id={}", resource.name, resource.id);

    let duration = Duration::try_hours(args.hours)
        .with_context(|| format!("--hours {} is out of range", args.hours))?;
    let lease = client
        .create_lease(NewLease {
            user_id: user.id,
            resource_id: resource.id,
            reason: args.reason,
            duration,
        })
        .await?;
    println!(
        "Created lease id={} reason={} expires_at={}",
        lease.id,
        lease.reason,
        lease.expires_at().to_rfc3339()
    );

    // Index-backed reads may lag behind the write on the single-table backend.
    let window = storage.index_propagation_delay * 4 + StdDuration::from_millis(100);
    let by_user = wait_for_lease(client.as_ref(), Listing::ByUser(user.id), lease.id, window).await?;
    print_listing("user", &by_user);
    let by_resource = wait_for_lease(
        client.as_ref(),
        Listing::ByResource(resource.id),
        lease.id,
        window,
    )
    .await?;
    print_listing("resource", &by_resource);

    tokio::time::sleep(StdDuration::from_millis(5)).await;
    let touched = client.touch_lease(lease.id).await?;
    println!(
        "Touched lease id={} expires_at={} (was {})",
        touched.id,
        touched.expires_at().to_rfc3339(),
        lease.expires_at().to_rfc3339()
    );

    let collected = module.collect_expired().await?;
    println!("Collected {} expired leases", collected);

    Ok(())
}

enum Listing {
    ByUser(Uuid),
    ByResource(Uuid),
}

/// Poll a listing until it contains `lease_id` or the window closes.
async fn wait_for_lease(
    client: &dyn LeaseStoreApi,
    listing: Listing,
    lease_id: Uuid,
    window: StdDuration,
) -> Result<Vec<Lease>> {
    let deadline = Instant::now() + window;
    loop {
        let leases = match listing {
            Listing::ByUser(id) => client.list_leases_by_user(id).await?,
            Listing::ByResource(id) => client.list_leases_by_resource(id).await?,
        };
        if leases.iter().any(|l| l.id == lease_id) || Instant::now() >= deadline {
            return Ok(leases);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn print_listing(by: &str, leases: &[Lease]) {
    println!("Leases by {}: {}", by, leases.len());
    for lease in leases {
        println!(
            "  lease id={} user={} resource={} pending={}",
            lease.id,
            lease.user_id,
            lease.resource_id,
            lease.is_pending()
        );
    }
}
