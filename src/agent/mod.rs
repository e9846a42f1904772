//! Question-answering agent.
//!
//! `Orchestrator` drives one turn through the routing graph:
//! classify, retrieve from exactly one backend, synthesize.

pub mod classifier;
pub mod prompts;
pub mod synthesizer;


use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::graph::{build_agent_graph, GraphError, GraphRuntime, NodeContext, TurnState};
use crate::llm::LlmProvider;
use crate::rag::DocumentRetriever;
use crate::tools::weather::WeatherProvider;

pub use crate::graph::state::RouteDecision;
pub use classifier::Classifier;
pub use synthesizer::Synthesizer;

/// Outcome of one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    pub question: String,
    pub context: String,
    pub answer: String,
}

pub struct Orchestrator {
    graph: GraphRuntime,
    classifier: Classifier,
    synthesizer: Synthesizer,
    weather: Arc<dyn WeatherProvider>,
    retriever: DocumentRetriever,
    top_k: usize,
}

impl Orchestrator {
    /// One LLM serves both classification and synthesis.
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        weather: Arc<dyn WeatherProvider>,
        retriever: DocumentRetriever,
        top_k: usize,
    ) -> Result<Self, GraphError> {
        Ok(Self {
            graph: build_agent_graph()?,
            classifier: Classifier::new(llm.clone()),
            synthesizer: Synthesizer::new(llm),
            weather,
            retriever,
            top_k,
        })
    }

    /// Answer `question`. Turns are independent; nothing is kept between calls.
    pub async fn run(&self, question: &str) -> Result<TurnResult, GraphError> {
        let mut state = TurnState::new(question);
        let ctx = NodeContext {
            classifier: &self.classifier,
            weather: self.weather.as_ref(),
            retriever: &self.retriever,
            synthesizer: &self.synthesizer,
            top_k: self.top_k,
        };

        let trace = self.graph.run(&mut state, &ctx).await?;
        let phase = state.phase();
        let route = state.route();

        let (context, answer) = state.into_outcome().ok_or_else(|| {
            GraphError::new(
                "orchestrator",
                format!("turn ended in phase {} without an answer", phase.as_str()),
            )
            .with_trace(trace.clone())
        })?;

        tracing::info!(
            "Turn answered via {} (route={})",
            trace.join(" -> "),
            route.map(|r| r.as_str()).unwrap_or("none")
        );

        Ok(TurnResult {
            question: question.to_string(),
            context: context.text,
            answer,
        })
    }
}
