// Document Node
// Similarity search over the ingested document

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{RouteDecision, TurnState};

pub struct DocumentNode;

impl DocumentNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocumentNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for DocumentNode {
    fn id(&self) -> &'static str {
        "document"
    }

    fn name(&self) -> &'static str {
        "Document Retriever"
    }

    async fn execute(
        &self,
        state: &mut TurnState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let passages = ctx
            .retriever
            .retrieve(&state.question, ctx.top_k)
            .await
            .map_err(|e| GraphError::new(self.id(), e.to_string()))?;

        state
            .record_context(RouteDecision::Document, passages)
            .map_err(|msg| GraphError::new(self.id(), msg))?;

        Ok(NodeOutput::Continue)
    }
}
