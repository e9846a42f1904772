// Classifier Node
// Entry point that routes the question to a retrieval backend

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::TurnState;

pub struct ClassifierNode;

impl ClassifierNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClassifierNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ClassifierNode {
    fn id(&self) -> &'static str {
        "classifier"
    }

    fn name(&self) -> &'static str {
        "Intent Classifier"
    }

    async fn execute(
        &self,
        state: &mut TurnState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let route = ctx
            .classifier
            .classify(&state.question)
            .await
            .map_err(|e| GraphError::new(self.id(), e.to_string()))?;

        state
            .record_route(route)
            .map_err(|msg| GraphError::new(self.id(), msg))?;

        tracing::info!("Classifier: routing to {}", route.as_str());

        Ok(NodeOutput::Branch(route.as_str().to_string()))
    }
}
