use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use statement_press::config;
use statement_press::notion::NotionClient;
use statement_press::site;
use statement_press::sync;

#[derive(Debug, Parser)]
#[command(author, version, about = "Sync statements from Notion, then export the site fragments")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Export the existing payload without contacting Notion
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    statement_press::init_tracing();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let data_file = cfg.data_file();
    if args.offline {
        info!("offline run; skipping Notion sync");
    } else {
        config::validate_notion(&cfg)?;
        let client = NotionClient::new(cfg.notion.token.clone(), cfg.notion.version.clone())?;
        let report = sync::run_sync(&client, &cfg.notion.database_id, &data_file).await?;
        info!(
            status = report.metadata.sync_status.as_str(),
            statements = report.metadata.statements_count,
            skipped = report.skipped_pages,
            "sync finished"
        );
    }

    let payload = site::load_payload(&data_file).await?;
    let bundle = site::build_site(payload, &cfg)?;
    let out_dir = PathBuf::from(cfg.app.resolved_output_dir());
    for path in site::write_site(&bundle, &out_dir).await? {
        info!(path = %path.display(), "wrote");
    }
    Ok(())
}
