mod command_suite;
mod config;
mod manifest;
mod runner;
mod summary;

use anyhow::{Context, Result};
use clap::Parser;
use connect::{ConnectClient, TemplateRenderer};
use e2e_core::{NameSalt, TestSet};
use events::EventBus;
use orchestrator::PhaseScheduler;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use command_suite::CommandContext;
use config::{client_config, Credentials, Environment};
use manifest::Manifest;
use runner::{select_groups, GroupRunner};
use summary::RunSummary;

#[derive(Parser, Debug)]
#[command(name = "e2e-verify")]
#[command(about = "Run end-to-end verification suites against a connector deployment", long_about = None)]
#[command(version)]
struct Cli {
    /// Message-queue bootstrap address
    kafka_address: String,

    schema_registry_address: String,

    /// Connector framework REST address
    kafka_connect_address: String,

    /// confluent, apache or clean
    test_set: String,

    test_version: String,

    /// Suffix appended to every resource name
    name_salt: String,

    /// `true` runs the stress groups only
    pressure: String,

    /// `true` enables SASL_SSL for queue clients
    enable_ssl: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let test_set: TestSet = cli.test_set.parse()?;
    let pressure = cli.pressure == "true";
    let enable_ssl = cli.enable_ssl == "true";

    let env = Environment::from_env()?;
    let credentials = Credentials::load(&env.credential_file).await?;
    let manifest = Manifest::load(&env.manifest)
        .await
        .with_context(|| format!("Failed to load suite manifest {}", env.manifest.display()))?;

    let account = credentials.account()?;

    tracing::info!(
        test_set = %test_set,
        version = %cli.test_version,
        salt = %cli.name_salt,
        pressure,
        enable_ssl,
        platform = ?env.platform,
        account = %account,
        warehouse = %credentials.warehouse,
        "Starting end-to-end verification"
    );

    let renderer = TemplateRenderer::new(credentials.template_values(&cli.schema_registry_address));
    let lifecycle = ConnectClient::new(&cli.kafka_connect_address, renderer);

    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let salt = NameSalt::new(cli.name_salt.as_str());
    let scheduler = PhaseScheduler::new(Arc::new(lifecycle), salt.clone()).with_event_bus(bus);

    let context = CommandContext {
        salt,
        test_version: cli.test_version.clone(),
        test_set,
        client_config: serde_json::to_string(&client_config(&cli.kafka_address, enable_ssl))?,
        schema_registry: cli.schema_registry_address.clone(),
        connect_address: cli.kafka_connect_address.clone(),
        working_dir: None,
    };

    let groups = select_groups(&manifest, pressure, env.runs_delivery_guarantee());
    let runner = GroupRunner::new(&scheduler, &manifest, context, test_set);
    let result = runner.run_all(&groups).await;

    RunSummary::drain(&mut rx).print();
    result?;

    if test_set.is_clean() {
        println!("All clean done");
    } else {
        println!("All test passed");
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "e2e_verify=info,orchestrator=info,connect=info".into()),
        )
        .init();
}
