use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use statement_press::config;
use statement_press::model::SyncStatus;
use statement_press::notion::NotionClient;
use statement_press::sync;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Fetch statements from the Notion database and save them with sync metadata"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Exit with a failure status when the sync ends in `error`
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    statement_press::init_tracing();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    config::validate_notion(&cfg)?;
    cfg.ensure_dirs()?;

    let client = NotionClient::new(cfg.notion.token.clone(), cfg.notion.version.clone())?;
    let report = sync::run_sync(&client, &cfg.notion.database_id, &cfg.data_file()).await?;

    info!(
        path = %report.path.display(),
        status = report.metadata.sync_status.as_str(),
        statements = report.metadata.statements_count,
        skipped = report.skipped_pages,
        previous = report.used_previous,
        "sync finished"
    );

    if args.strict && report.metadata.sync_status == SyncStatus::Error {
        anyhow::bail!(
            "sync failed: {}",
            report.metadata.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
