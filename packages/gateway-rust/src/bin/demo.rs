//! Runs one search call through the gateway pipeline and prints the response.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tower::ServiceExt;

use mse_core::methods;
use mse_gateway::service::domain::search::{
    register_search, Document, SearchRegistry, SearchRegistryBuilder, SearchRequest,
    SearchResponse,
};
use mse_gateway::telemetry::init_tracing;
use mse_gateway::{build_gateway_pipeline, GatewayCall, GatewayConfig, GatewayEntrance};

/// MSE gateway demo: one search call through the five-stage entrance
#[derive(Parser, Debug)]
#[command(name = "mse-gateway-demo")]
struct Args {
    /// Search query
    #[arg(short, long, default_value = "gateway")]
    query: String,

    /// Zero-based result page
    #[arg(long, default_value = "0")]
    page: u32,

    /// Results per page
    #[arg(long, default_value = "10")]
    page_size: u32,

    /// Emit logs as JSON lines
    #[arg(long, env = "MSE_JSON_LOGS")]
    json_logs: bool,

    /// Gateway config file (JSON); defaults apply when omitted
    #[arg(long, env = "MSE_GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

fn corpus() -> Vec<Document> {
    vec![
        Document::new(
            "gw-1",
            "Gateway entrance",
            "The gateway entrance runs validate, convert, intercept, invoke and convert again.",
        ),
        Document::new(
            "gw-2",
            "Service registry",
            "Collaborators are registered per service and published atomically to the gateway.",
        ),
        Document::new(
            "gw-3",
            "Failure mapping",
            "Every gateway failure becomes a response with a stable detail message.",
        ),
        Document::new(
            "misc-1",
            "Release notes",
            "Minor fixes to the build scripts.",
        ),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs)?;

    let config = match &args.config {
        Some(path) => GatewayConfig::from_json_file(path)?,
        None => GatewayConfig::default(),
    };

    let mut builder = SearchRegistryBuilder::new();
    register_search(&mut builder, corpus());
    let registry = Arc::new(SearchRegistry::new(builder.build()));
    for (service, missing) in registry.incomplete_services() {
        tracing::warn!(%service, ?missing, "service registered without a full collaborator set");
    }

    let entrance = GatewayEntrance::new(registry, Arc::new(config.clone()));
    let pipeline = build_gateway_pipeline(entrance, &config);

    let request = SearchRequest::new(args.query).with_page(args.page, args.page_size);
    let response = pipeline
        .oneshot(GatewayCall::new(
            methods::SEARCH,
            request,
            SearchResponse::default(),
        ))
        .await
        .context("gateway pipeline failed")?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
