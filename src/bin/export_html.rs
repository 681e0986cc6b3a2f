use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use statement_press::config;
use statement_press::site;

#[derive(Debug, Parser)]
#[command(
    about = "Render the saved statements into HTML fragments and a preview page. Reads the payload from app.data_dir."
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output directory (defaults to app.output_dir)
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    statement_press::init_tracing();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let out_dir = args
        .out
        .unwrap_or_else(|| PathBuf::from(cfg.app.resolved_output_dir()));

    let payload = site::load_payload(&cfg.data_file()).await?;
    let bundle = site::build_site(payload, &cfg)?;
    let written = site::write_site(&bundle, &out_dir).await?;

    println!(
        "Exported {} statements ({} detail fragments)",
        bundle.fragments.details.len(),
        bundle.fragments.details.values().filter(|d| d.ok).count()
    );
    for path in written {
        println!("  {}", absolute_path(&path).display());
    }
    Ok(())
}

fn absolute_path(p: &std::path::Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(p),
        Err(_) => p.to_path_buf(),
    }
}
