mod cli;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fhirgraph_client::FhirClient;
use fhirgraph_engine::RunConfig;
use fhirgraph_graph::Neo4jStore;
use fhirgraph_model::MapperRegistry;

use cli::Cli;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log)),
        )
        .with_target(false)
        .init();

    if cli.resources.is_empty() && !cli.delete && !cli.resolve {
        bail!("nothing to do: use at least one of --resource, --delete, --resolve");
    }
    if !cli.resources.is_empty() && cli.fhir_server.is_none() {
        bail!("--resource requires a FHIR server (--fhir-server URL)");
    }

    // Check both connections up front so a typo fails fast, before any
    // destructive or long-running work starts.
    let store = Neo4jStore::connect(
        &cli.neo4j,
        &cli.neo4j_user,
        &cli.neo4j_password,
        &cli.neo4j_database,
    )
    .await
    .with_context(|| format!("connecting to Neo4j at {}", cli.neo4j))?;

    let mut client = None;
    let mut server_base = None;
    if let Some(fhir_server) = &cli.fhir_server {
        let fhir = FhirClient::new(fhir_server);
        let capability = fhir
            .capability()
            .await
            .with_context(|| format!("connecting to FHIR server at {fhir_server}"))?;
        info!(
            software = capability.software.as_deref().unwrap_or("unknown"),
            version = capability.software_version.as_deref().unwrap_or("unknown"),
            fhir_version = capability.fhir_version.as_deref().unwrap_or("unknown"),
            "connected to FHIR server"
        );
        server_base = capability.implementation_url.clone();
        client = Some(fhir);
    }

    let config = RunConfig {
        resource_types: cli.resources.clone(),
        delete_first: cli.delete,
        resolve: cli.resolve,
        page_size: cli.page_size,
        limit: cli.limit,
        validate: !cli.no_validation,
        strict: cli.strict,
        parallel: cli.parallel,
        server_base,
        ..RunConfig::default()
    };

    let registry = Arc::new(MapperRegistry::with_defaults());
    let report = fhirgraph_engine::run(client, Arc::new(store), registry, &config).await?;

    println!("{report}");
    for note in &report.failures {
        println!("failed: {note}");
    }
    for note in &report.issues {
        println!("issue: {note}");
    }

    Ok(())
}
