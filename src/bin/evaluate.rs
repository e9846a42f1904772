//! Batch evaluation: `evaluate [DATASET.yaml]`.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use weather_rag_agent::core::config::AppPaths;
use weather_rag_agent::core::logging;
use weather_rag_agent::eval::{default_dataset, evaluate, load_dataset};
use weather_rag_agent::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let dataset = match env::args().nth(1) {
        Some(path) => load_dataset(&PathBuf::from(path))?,
        None => default_dataset(),
    };

    let state = AppState::initialize(paths).await?;

    tracing::info!("Starting evaluation of {} examples", dataset.len());
    let summary = evaluate(&state.orchestrator, &dataset, 1).await;
    tracing::info!(
        "Evaluation finished: {}/{} passed",
        summary.passed,
        summary.total
    );

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
