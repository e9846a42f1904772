//! Batch evaluation of the orchestrator over a small question dataset.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::agent::Orchestrator;

pub const NOT_EMPTY_KEY: &str = "not_empty";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalExample {
    pub question: String,
}

/// The three questions used to smoke-test both routes and the empty-result path.
pub fn default_dataset() -> Vec<EvalExample> {
    [
        "Delhi",
        "tell me about avdeep's experience? in 2 lines",
        "What is the capital of France?",
    ]
    .into_iter()
    .map(|question| EvalExample {
        question: question.to_string(),
    })
    .collect()
}

/// Reads a YAML (or JSON) list of `{question}` entries.
pub fn load_dataset(path: &Path) -> anyhow::Result<Vec<EvalExample>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("Invalid dataset {}", path.display()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvalScore {
    pub key: &'static str,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

pub fn must_not_be_empty(answer: Option<&str>) -> EvalScore {
    match answer {
        Some(text) if !text.trim().is_empty() => EvalScore {
            key: NOT_EMPTY_KEY,
            score: 1,
            comment: None,
        },
        _ => EvalScore {
            key: NOT_EMPTY_KEY,
            score: 0,
            comment: Some("Output is empty.".to_string()),
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalRecord {
    pub question: String,
    pub context: Option<String>,
    pub answer: Option<String>,
    pub error: Option<String>,
    pub score: EvalScore,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalSummary {
    pub total: usize,
    pub passed: usize,
    pub mean_score: f64,
    pub records: Vec<EvalRecord>,
}

/// Runs every example, at most `concurrency` at a time. Records keep
/// dataset order; a failed turn scores 0 instead of aborting the run.
pub async fn evaluate(
    orchestrator: &Orchestrator,
    dataset: &[EvalExample],
    concurrency: usize,
) -> EvalSummary {
    let records: Vec<EvalRecord> = stream::iter(dataset.iter())
        .map(|example| run_example(orchestrator, example))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let total = records.len();
    let passed = records.iter().filter(|r| r.score.score == 1).count();
    let mean_score = if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64
    };

    EvalSummary {
        total,
        passed,
        mean_score,
        records,
    }
}

async fn run_example(orchestrator: &Orchestrator, example: &EvalExample) -> EvalRecord {
    let started = Instant::now();
    let outcome = orchestrator.run(&example.question).await;
    let elapsed_ms = started.elapsed().as_millis();

    match outcome {
        Ok(result) => {
            let score = must_not_be_empty(Some(&result.answer));
            tracing::info!("eval {:?}: score={}", example.question, score.score);
            EvalRecord {
                question: example.question.clone(),
                context: Some(result.context),
                answer: Some(result.answer),
                error: None,
                score,
                elapsed_ms,
            }
        }
        Err(err) => {
            tracing::warn!("eval {:?} failed: {}", example.question, err);
            EvalRecord {
                question: example.question.clone(),
                context: None,
                answer: None,
                error: Some(err.to_string()),
                score: must_not_be_empty(None),
                elapsed_ms,
            }
        }
    }
}
