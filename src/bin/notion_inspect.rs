use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use statement_press::config;
use statement_press::notion::{NotionClient, NotionService};

#[derive(Parser, Debug)]
#[command(about = "Print the property names and types of a Notion database")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Database ID to inspect (defaults to notion.database_id)
    #[arg(long)]
    db_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    statement_press::init_tracing();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    if cfg.notion.token.trim().is_empty() {
        anyhow::bail!("notion.token must be non-empty");
    }
    let client = NotionClient::new(cfg.notion.token.clone(), cfg.notion.version.clone())?;
    let db_id = match args.db_id {
        Some(id) => id,
        None => {
            config::validate_notion(&cfg)?;
            cfg.notion.database_id.clone()
        }
    };

    let db = client.retrieve_database(&db_id).await?;
    println!("Database ID: {}", db.id);
    println!("Title: {}", db.plain_title());
    println!("Properties:");
    for (name, typ) in db.property_summary() {
        println!("  \"{}\": type={}", name, typ);
    }
    Ok(())
}
