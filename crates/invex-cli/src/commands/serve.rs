//! Serve command - run the HTTP extraction service.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use invex_core::InvoicePipeline;

use super::load_config;
use crate::server;

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Template directory (overrides config)
    #[arg(short, long)]
    templates: Option<PathBuf>,
}

pub async fn run(args: ServeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = args.templates {
        config.templates.dir = dir;
    }
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    info!(
        "Serving templates from {}",
        config.templates.dir.display()
    );
    let pipeline = Arc::new(InvoicePipeline::from_config(&config));
    let app = server::router(pipeline, config.server.max_upload_bytes);

    server::serve(app, &bind).await
}
