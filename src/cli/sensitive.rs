//! Ingest command - offline population of the phrase blocklist

use std::path::PathBuf;

use crate::config::AppConfig;

use super::IngestArgs;

pub async fn run(config: AppConfig, args: IngestArgs) -> anyhow::Result<()> {
    let path = args
        .file
        .unwrap_or_else(|| PathBuf::from(&config.sensitive.phrase_file));

    let context = crate::create_app_context(config).await?;
    let report = context.gate.sensitive().ingest_phrase_file(&path).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    context.pool.close().await;
    Ok(())
}
