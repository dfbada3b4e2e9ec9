use std::{env, fs, process, sync::Arc};

use anyhow::{bail, Context};
use fusion_composition::{compose_subgraphs, RenameTypeTransform, SubgraphConfig};
use fusion_gateway_config::{
    compose::{ComposeSubgraphConfig, TransportConfig},
    load_compose_config, load_config, FusionGatewayConfig,
};
use fusion_gateway_internal::{
    background_tasks::BackgroundTasksManager, logging::configure_logging,
};
use fusion_plan_executor::{executors::transport::HttpTransport, RequestContext};
use fusion_query_planner::build_plan;
use fusion_runtime::{Gateway, GatewayRequest, SchemaState};
use fusion_supergraph::{
    ast::{parse_operation, parse_schema},
    extract_subgraph, Supergraph, TransportEntry,
};
use serde_json::Value;
use tracing::{debug, info};

const USAGE: &str = "Usage: fusion-dev-cli <command> [...]

Commands:
  compose <compose-config>                       Compose subgraphs into a supergraph
  extract <supergraph> <subgraph>                Print the schema of one subgraph
  plan <supergraph> <operation-file> [--json]    Print the plan of an operation
  query <operation-file> [variables-json]        Run an operation against the configured supergraph";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = env::var("FUSION_CONFIG_FILE_PATH").ok();
    let gateway_config = load_config(config_path)?;
    configure_logging(&gateway_config.log);

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        eprintln!("{}", USAGE);
        process::exit(1);
    };

    match (command.as_str(), &args[2..]) {
        ("compose", [compose_config, ..]) => compose(compose_config),
        ("extract", [supergraph_path, subgraph_name, ..]) => {
            let supergraph = read_supergraph(supergraph_path)?;
            let subgraph = extract_subgraph(&supergraph, subgraph_name)?;
            println!("{}", subgraph);
            Ok(())
        }
        ("plan", [supergraph_path, operation_path, rest @ ..]) => {
            let supergraph = read_supergraph(supergraph_path)?;
            let operation_text = read_file(operation_path)?;
            let document = parse_operation(&operation_text)?;
            let plan = build_plan(&supergraph, &document, None)?;

            if rest.iter().any(|arg| arg == "--json") {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("{}", plan);
            }
            Ok(())
        }
        ("query", [operation_path, rest @ ..]) => {
            query(&gateway_config, operation_path, rest.first()).await
        }
        _ => {
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    }
}

fn read_file(path: &str) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Unable to read input file {}", path))
}

fn read_supergraph(path: &str) -> anyhow::Result<Supergraph> {
    Ok(Supergraph::parse(&read_file(path)?)?)
}

fn compose(compose_config_path: &str) -> anyhow::Result<()> {
    let compose_config = load_compose_config(compose_config_path)?;
    if compose_config.subgraphs.is_empty() {
        bail!("no subgraphs listed in {}", compose_config_path);
    }

    let subgraphs = compose_config
        .subgraphs
        .iter()
        .map(subgraph_config)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let supergraph = compose_subgraphs(subgraphs)?;
    let printed = supergraph.print();

    match &compose_config.output {
        Some(output) => {
            fs::write(&output.absolute, printed)
                .with_context(|| format!("Unable to write {}", output))?;
            info!(output = %output, "supergraph written");
        }
        None => println!("{}", printed),
    }

    Ok(())
}

fn subgraph_config(subgraph: &ComposeSubgraphConfig) -> anyhow::Result<SubgraphConfig> {
    debug!(subgraph = subgraph.name.as_str(), schema = %subgraph.schema, "reading subgraph");

    let sdl = fs::read_to_string(&subgraph.schema.absolute)
        .with_context(|| format!("Unable to read schema of subgraph {}", subgraph.name))?;
    let mut config = SubgraphConfig::new(subgraph.name.clone(), parse_schema(&sdl)?);

    if let Some(transport) = &subgraph.transport {
        config = config.with_transport(transport_entry(&subgraph.name, transport));
    }
    if let Some(prefix) = &subgraph.type_prefix {
        config = config.with_transform(RenameTypeTransform::prefix(prefix.clone()));
    }

    Ok(config)
}

fn transport_entry(subgraph_name: &str, transport: &TransportConfig) -> TransportEntry {
    TransportEntry {
        subgraph: subgraph_name.to_string(),
        kind: transport.kind.clone(),
        location: transport.location.clone(),
        headers: transport.headers.clone(),
        options: transport
            .options
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}

async fn query(
    gateway_config: &FusionGatewayConfig,
    operation_path: &str,
    variables: Option<&String>,
) -> anyhow::Result<()> {
    let mut request = GatewayRequest::new(read_file(operation_path)?);
    if let Some(variables) = variables {
        match serde_json::from_str::<Value>(variables)? {
            Value::Object(variables) => request = request.with_variables(variables),
            _ => bail!("variables must be a JSON object"),
        }
    }

    let mut bg_tasks_manager = BackgroundTasksManager::new();
    let schema_state = SchemaState::new_from_config(
        &mut bg_tasks_manager,
        gateway_config,
        Arc::new(HttpTransport::new(reqwest::Client::new())),
        Arc::new(vec![]),
    )
    .await?;
    let gateway = Gateway::from_config(schema_state, gateway_config);

    let response = gateway.execute(request, RequestContext::default()).await;
    bg_tasks_manager.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
