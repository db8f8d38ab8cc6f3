//! insights - query an asynchronous SQL warehouse from the command line.

use std::sync::Arc;

use tracing::{error, info};
use warehouse_insights::cli::{Cli, Command};
use warehouse_insights::config::Config;
use warehouse_insights::error::{InsightsError, Result};
use warehouse_insights::knowledge::{generate_docs, write_docs, GenerateOptions, KnowledgeBase};
use warehouse_insights::logging;
use warehouse_insights::tools::ToolRouter;
use warehouse_insights::warehouse::{MockQueryService, WarehouseClient};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load(&config_path)?;

    let client = if cli.mock {
        info!("Using mock warehouse");
        WarehouseClient::new(
            config.warehouse.clone(),
            Arc::new(MockQueryService::with_demo_catalog()),
        )
    } else {
        WarehouseClient::connect(config.warehouse.clone()).await?
    };

    let router = ToolRouter::new(
        client,
        KnowledgeBase::new(&config.knowledge.dir),
        config.tools.clone(),
    );

    let output = match &cli.command {
        Command::Tools => serde_json::to_string_pretty(&router.tool_definitions())
            .map_err(|e| InsightsError::internal(format!("Failed to encode tools: {e}")))?,
        Command::Resources => router
            .resources()
            .iter()
            .map(|r| format!("{}  {}", r.uri, r.description))
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Resource { uri } => router.read_resource(uri),
        Command::Describe { table, full: true } => router.table_schema(table).await,
        Command::Generate {
            row_limit,
            preview_rows,
            ddl,
        } => {
            let knowledge = KnowledgeBase::new(&config.knowledge.dir);
            let queries = knowledge.query_files();
            info!(templates = queries.len(), "Generating documentation");
            let options = GenerateOptions {
                row_limit: *row_limit,
                preview_rows: *preview_rows,
                include_ddl: *ddl,
            };
            let docs = generate_docs(router.client(), &queries, &options).await;
            write_docs(knowledge.dir(), &docs)?
                .iter()
                .map(|path| format!("Wrote {}", path.display()))
                .collect::<Vec<_>>()
                .join("\n")
        }
        command => match command.tool_call() {
            Some((name, arguments)) => router.execute(name, &arguments.to_string()).await,
            None => return Err(InsightsError::internal("Command has no handler")),
        },
    };

    println!("{output}");
    Ok(())
}
