use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use realmpath_engine::{EntityAccessor, InMemoryEntityGraph, InMemoryRuleStore, ResolutionService, RuleSource};
use realmpath_server::{ResolutionHttpServer, ServerConfig, default_config_path, load_config_from_path, resolve_bind_address};
use realmpath_types::{Budget, DependencyResolutionRequest, PlaceholderResolutionRequest};
use serde::{Serialize, de::DeserializeOwned};
use tracing::info;

/// Resolve entity placeholder paths against an entity graph.
#[derive(Parser, Debug)]
#[command(name = "realmpath", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the resolution API over HTTP
    Serve {
        /// Configuration file; defaults to $REALMPATH_CONFIG_PATH or the user config directory
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Resolve a placeholder request file and print the response
    Resolve {
        #[command(flatten)]
        fixtures: FixtureArgs,

        /// Override the hop limit for this run
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=Budget::LIMIT_MAX_HOPS as u64))]
        max_hops: Option<u64>,
    },

    /// Resolve a dependency request file and print the response
    Dependencies {
        #[command(flatten)]
        fixtures: FixtureArgs,
    },
}

#[derive(clap::Args, Debug)]
struct FixtureArgs {
    /// Entity graph JSON document
    #[arg(long)]
    graph: PathBuf,

    /// Request JSON document
    #[arg(long)]
    request: PathBuf,

    /// Validation rules JSON array
    #[arg(long)]
    rules: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    match Args::parse().command {
        Command::Serve { config } => serve(config).await,
        Command::Resolve { fixtures, max_hops } => {
            let budget = Budget {
                max_hops: max_hops.map_or(Budget::DEFAULT_MAX_HOPS, |hops| hops as usize),
                ..Budget::default()
            };
            let service = build_service(Some(&fixtures.graph), fixtures.rules.as_deref(), budget)?;
            let request: PlaceholderResolutionRequest = read_json(&fixtures.request)?;
            let response = service.resolve_placeholders(request).await?;
            print_json(&response)
        }
        Command::Dependencies { fixtures } => {
            let service = build_service(Some(&fixtures.graph), fixtures.rules.as_deref(), Budget::default())?;
            let request: DependencyResolutionRequest = read_json(&fixtures.request)?;
            let response = service.resolve_dependencies(request).await?;
            print_json(&response)
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    let config_path = config_path.unwrap_or_else(default_config_path);
    let config: ServerConfig =
        load_config_from_path(&config_path).with_context(|| format!("failed to load configuration from {}", config_path.display()))?;
    let service = build_service(config.graph_path.as_deref(), config.rules_path.as_deref(), config.budget)?;
    let bind_address = resolve_bind_address(&config.bind_address)?;

    let running = ResolutionHttpServer::new(bind_address, service).start().await?;
    info!(address = %running.bound_address(), config = %config_path.display(), "serving; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    running.stop().await
}

fn build_service(graph_path: Option<&Path>, rules_path: Option<&Path>, budget: Budget) -> Result<ResolutionService> {
    let graph = match graph_path {
        Some(path) => InMemoryEntityGraph::load_from_path(path)?,
        None => InMemoryEntityGraph::new(),
    };
    let rules = match rules_path {
        Some(path) => InMemoryRuleStore::load_from_path(path)?,
        None => InMemoryRuleStore::default(),
    };
    info!(entities = graph.len(), rules = rules.len(), "loaded resolution fixtures");

    let accessor: Arc<dyn EntityAccessor> = Arc::new(graph);
    let rule_source: Arc<dyn RuleSource> = Arc::new(rules);
    Ok(ResolutionService::new(accessor, rule_source, budget))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid request JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resolve_arguments() {
        let args = Args::try_parse_from([
            "realmpath",
            "resolve",
            "--graph",
            "graph.json",
            "--request",
            "request.json",
            "--max-hops",
            "3",
        ])
        .expect("parse args");
        match args.command {
            Command::Resolve { fixtures, max_hops } => {
                assert_eq!(fixtures.graph, PathBuf::from("graph.json"));
                assert!(fixtures.rules.is_none());
                assert_eq!(max_hops, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_hop_limits() {
        for hops in ["0", "65", "-1"] {
            let parsed = Args::try_parse_from([
                "realmpath",
                "resolve",
                "--graph",
                "graph.json",
                "--request",
                "request.json",
                "--max-hops",
                hops,
            ]);
            assert!(parsed.is_err(), "--max-hops {hops} should be rejected");
        }
    }

    #[tokio::test]
    async fn resolves_a_request_file() {
        let directory = tempfile::tempdir().expect("create temp dir");
        let graph_path = directory.path().join("graph.json");
        fs::write(
            &graph_path,
            r#"{ "entities": [ { "type": "Town", "id": 4, "properties": { "Name": { "scalar": "York" } } } ] }"#,
        )
        .expect("write graph");
        let request_path = directory.path().join("request.json");
        fs::write(
            &request_path,
            r#"{ "rootEntityType": "Town", "rootEntityId": 4, "explicitPaths": ["Town.Name"] }"#,
        )
        .expect("write request");

        let service = build_service(Some(&graph_path), None, Budget::default()).expect("build service");
        let request: PlaceholderResolutionRequest = read_json(&request_path).expect("read request");
        let response = service.resolve_placeholders(request).await.expect("resolve");

        assert_eq!(response.resolved_placeholders.get("Town.Name").map(String::as_str), Some("York"));
        assert!(response.is_successful);
    }
}
