use anyhow::{Context, Result};
use clap::Parser;

use table_sync::sync::{ConsolePrompt, DecisionProvider, StaticDecision};
use table_sync::utils::logging::init_logging;

/// Synchronize a MySQL schema with declared tables
#[derive(Debug, Parser)]
#[command(name = "table_sync", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "table_sync.toml")]
    config: String,

    /// Path to the YAML schema declarations
    #[arg(short, long)]
    schema: String,

    /// Drop columns that are no longer declared
    #[arg(long)]
    dangerous: bool,

    /// Answer yes to every backup question
    #[arg(long, conflicts_with = "no")]
    yes: bool,

    /// Answer no to every backup question
    #[arg(long)]
    no: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let configuration = e
            .downcast_ref::<table_sync::Error>()
            .map_or(false, table_sync::Error::is_configuration);
        if configuration {
            eprintln!("Invalid declarations: {:#}", e);
            std::process::exit(2);
        }
        return Err(e);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = table_sync::config::load_from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config))?;
    init_logging(&config.logging)?;

    let mut client = table_sync::TableSyncClient::new(config).await?;
    client
        .register_schema_file(&cli.schema)
        .with_context(|| format!("loading {}", cli.schema))?;

    let mut options = client.default_options();
    options.dangerous_sync |= cli.dangerous;

    let decisions: Box<dyn DecisionProvider> = if cli.yes {
        Box::new(StaticDecision(true))
    } else if cli.no {
        Box::new(StaticDecision(false))
    } else {
        Box::new(ConsolePrompt)
    };

    let report = client.sync(decisions.as_ref(), options).await?;

    println!("Tables in order: {}", report.order.join(", "));
    if !report.created_tables.is_empty() {
        println!("Created: {}", report.created_tables.join(", "));
    }
    for dropped in &report.dropped_orphans {
        match &dropped.backup {
            Some(backup) => println!(
                "Dropped orphan {} ({} rows, backup {})",
                dropped.table,
                dropped.rows,
                backup.path.display()
            ),
            None => println!(
                "Dropped orphan {} ({} rows, no backup written)",
                dropped.table, dropped.rows
            ),
        }
    }
    println!("Column operations applied: {}", report.applied_operations());

    let suppressed = report.suppressed_drops();
    if !suppressed.is_empty() {
        println!(
            "Not dropped (use --dangerous): {}",
            suppressed.join(", ")
        );
    }

    Ok(())
}
