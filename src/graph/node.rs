// Node trait and types
// Base abstraction for graph nodes

use async_trait::async_trait;

use crate::agent::classifier::Classifier;
use crate::agent::synthesizer::Synthesizer;
use crate::core::errors::ApiError;
use crate::rag::DocumentRetriever;
use crate::tools::weather::WeatherProvider;

use super::state::TurnState;

/// Services available to nodes during execution
pub struct NodeContext<'a> {
    pub classifier: &'a Classifier,
    pub weather: &'a dyn WeatherProvider,
    pub retriever: &'a DocumentRetriever,
    pub synthesizer: &'a Synthesizer,
    /// Passages requested from the document index
    pub top_k: usize,
}

/// Output from a node execution
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// Follow the node's unconditional edge
    Continue,
    /// Follow the edge labelled with this condition
    Branch(String),
    /// Graph execution complete
    Final,
}

/// Graph execution error
///
/// Includes an `execution_trace` recording the node IDs visited before the
/// error occurred.
#[derive(Debug, Clone)]
pub struct GraphError {
    pub node_id: String,
    pub message: String,
    /// Ordered list of node IDs executed before this error, most-recent last.
    pub execution_trace: Vec<String>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            execution_trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.execution_trace = trace;
        self
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "GraphError in {}: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "GraphError in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for GraphError {}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Execute the node logic
    async fn execute(
        &self,
        state: &mut TurnState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError>;
}
