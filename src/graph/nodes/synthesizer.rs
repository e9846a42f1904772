// Synthesizer Node
// Generates the final answer from the retrieved context

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::TurnState;

pub struct SynthesizerNode;

impl SynthesizerNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SynthesizerNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for SynthesizerNode {
    fn id(&self) -> &'static str {
        "synthesizer"
    }

    fn name(&self) -> &'static str {
        "Answer Synthesizer"
    }

    async fn execute(
        &self,
        state: &mut TurnState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let context = state
            .context()
            .map(|c| c.text.clone())
            .ok_or_else(|| GraphError::new(self.id(), "no context was retrieved"))?;

        let answer = ctx
            .synthesizer
            .synthesize(&context, &state.question)
            .await
            .map_err(|e| GraphError::new(self.id(), e.to_string()))?;

        state
            .record_answer(answer)
            .map_err(|msg| GraphError::new(self.id(), msg))?;

        Ok(NodeOutput::Final)
    }
}
