//! Cache commands - screen messages, store answers, inspect tables

use serde_json::json;

use crate::config::AppConfig;
use crate::infrastructure::services::CacheTicket;
use crate::infrastructure::storage::run_cache_migrations;
use crate::GateStores;

use super::{AskArgs, RememberArgs};

/// Print the gate decision for one message
pub async fn ask(config: AppConfig, args: AskArgs) -> anyhow::Result<()> {
    let context = crate::create_app_context(config).await?;

    let decision = context.gate.screen(&args.text).await?;
    println!("{}", serde_json::to_string_pretty(&decision)?);

    context.pool.close().await;
    Ok(())
}

pub async fn remember(config: AppConfig, args: RememberArgs) -> anyhow::Result<()> {
    let context = crate::create_app_context(config).await?;

    let answer_id = context
        .gate
        .remember(&args.question, &args.answer, CacheTicket::new(args.entry_id))
        .await?;
    println!("{}", json!({ "answer_id": answer_id }));

    context.pool.close().await;
    Ok(())
}

/// Row counts; needs only the database, not an embedding provider
pub async fn stats(config: AppConfig) -> anyhow::Result<()> {
    let pool = crate::connect_database(&config).await?;
    run_cache_migrations(&pool).await?;
    let stores = GateStores::postgres(&pool);

    let (questions, answers) = stores.answers.counts().await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "cache_entries": stores.cache_entries.count().await?,
            "questions": questions,
            "answers": answers,
            "sensitive_phrases": stores.sensitive_phrases.count().await?,
        }))?
    );

    pool.close().await;
    Ok(())
}
