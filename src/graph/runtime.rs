// Graph Runtime - petgraph based
// Drives one question/answer turn from the entry node to a `Final` node

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::TurnState;

/// Edge condition for graph routing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeCondition {
    /// Followed when a node returns `Continue`
    Always,
    /// Followed when a node returns `Branch` with this label
    OnCondition(String),
}

impl EdgeCondition {
    pub fn on(condition: impl Into<String>) -> Self {
        Self::OnCondition(condition.into())
    }

    pub fn matches(&self, condition: Option<&str>) -> bool {
        match (self, condition) {
            (EdgeCondition::Always, None) => true,
            (EdgeCondition::OnCondition(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

/// petgraph-based StateGraph runtime
pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, EdgeCondition>,
    node_indices: HashMap<String, NodeIndex>,
    entry_node_id: String,
    /// Upper bound on nodes executed per turn
    max_steps: usize,
}

impl GraphRuntime {
    fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry_node_id: String::new(),
            max_steps: 8,
        }
    }

    fn add_node(&mut self, node: Box<dyn Node>) {
        let id = node.id().to_string();
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
    }

    fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        condition: EdgeCondition,
    ) -> Result<(), GraphError> {
        let lookup = |id: &str| {
            self.node_indices
                .get(id)
                .copied()
                .ok_or_else(|| GraphError::new(id, format!("Node not found: {}", id)))
        };
        let (from_idx, to_idx) = (lookup(from)?, lookup(to)?);
        self.graph.add_edge(from_idx, to_idx, condition);
        Ok(())
    }

    /// IDs of every node in the graph, in no particular order
    pub fn node_ids(&self) -> Vec<&str> {
        self.node_indices.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Execute the graph from the entry node until a node returns `Final`.
    ///
    /// Returns the IDs of the nodes visited, in order. On failure the error
    /// carries the IDs of the nodes that completed before it.
    pub async fn run(
        &self,
        state: &mut TurnState,
        ctx: &NodeContext<'_>,
    ) -> Result<Vec<String>, GraphError> {
        let mut current_idx = *self.node_indices.get(&self.entry_node_id).ok_or_else(|| {
            GraphError::new(
                "runtime",
                format!("Entry node not found: '{}'", self.entry_node_id),
            )
        })?;

        let mut trace: Vec<String> = Vec::new();

        loop {
            if trace.len() >= self.max_steps {
                return Err(GraphError::new(
                    "runtime",
                    format!("Maximum steps ({}) exceeded", self.max_steps),
                )
                .with_trace(trace));
            }

            let node = &self.graph[current_idx];
            tracing::debug!(
                "Executing node: {} [{}] (step {})",
                node.id(),
                node.name(),
                trace.len()
            );

            let output = match node.execute(state, ctx).await {
                Ok(output) => output,
                Err(err) => return Err(err.with_trace(trace)),
            };
            trace.push(node.id().to_string());

            let condition = match &output {
                NodeOutput::Final => return Ok(trace),
                NodeOutput::Continue => None,
                NodeOutput::Branch(label) => Some(label.as_str()),
            };
            current_idx = self
                .next_node(current_idx, condition)
                .map_err(|e| e.with_trace(trace.clone()))?;
        }
    }

    /// First outgoing edge whose condition matches the node's output.
    fn next_node(
        &self,
        current_idx: NodeIndex,
        condition: Option<&str>,
    ) -> Result<NodeIndex, GraphError> {
        self.graph
            .edges_directed(current_idx, Direction::Outgoing)
            .find(|edge| edge.weight().matches(condition))
            .map(|edge| edge.target())
            .ok_or_else(|| {
                let current_id = self.graph[current_idx].id();
                GraphError::new(
                    current_id,
                    format!(
                        "No outgoing edge from '{}' for condition {:?}",
                        current_id,
                        condition.unwrap_or("(continue)")
                    ),
                )
            })
    }
}

/// Builder for constructing graphs fluently
pub struct GraphBuilder {
    runtime: GraphRuntime,
    pending_edges: Vec<(String, String, EdgeCondition)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.runtime.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.runtime.add_node(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::on(condition)));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, GraphError> {
        for (from, to, condition) in std::mem::take(&mut self.pending_edges) {
            self.runtime.add_edge(&from, &to, condition)?;
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::agent::{Classifier, Synthesizer};
    use crate::rag::{DocumentRetriever, SqliteVectorIndex};
    use crate::server::handlers::test_support::{StubEmbedder, StubLlm, StubWeather};

    struct Step {
        id: &'static str,
        output: NodeOutput,
    }

    fn step(id: &'static str, output: NodeOutput) -> Box<dyn Node> {
        Box::new(Step { id, output })
    }

    #[async_trait]
    impl Node for Step {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn execute(
            &self,
            _state: &mut TurnState,
            _ctx: &NodeContext<'_>,
        ) -> Result<NodeOutput, GraphError> {
            Ok(self.output.clone())
        }
    }

    struct Services {
        classifier: Classifier,
        synthesizer: Synthesizer,
        weather: StubWeather,
        retriever: DocumentRetriever,
    }

    impl Services {
        async fn new() -> Self {
            let index = Arc::new(SqliteVectorIndex::in_memory().await.unwrap());
            Self {
                classifier: Classifier::new(Arc::new(StubLlm::default())),
                synthesizer: Synthesizer::new(Arc::new(StubLlm::default())),
                weather: StubWeather,
                retriever: DocumentRetriever::new(Arc::new(StubEmbedder), index, "docs"),
            }
        }

        fn ctx(&self) -> NodeContext<'_> {
            NodeContext {
                classifier: &self.classifier,
                weather: &self.weather,
                retriever: &self.retriever,
                synthesizer: &self.synthesizer,
                top_k: 3,
            }
        }
    }

    async fn run(graph: &GraphRuntime) -> Result<Vec<String>, GraphError> {
        let services = Services::new().await;
        let mut state = TurnState::new("Delhi");
        graph.run(&mut state, &services.ctx()).await
    }

    #[test]
    fn test_edge_condition_matching() {
        assert!(EdgeCondition::Always.matches(None));
        assert!(!EdgeCondition::Always.matches(Some("weather")));

        assert!(EdgeCondition::on("weather").matches(Some("weather")));
        assert!(!EdgeCondition::on("weather").matches(Some("document")));
        assert!(!EdgeCondition::on("weather").matches(None));
    }

    #[tokio::test]
    async fn continue_and_branch_follow_matching_edges() {
        let graph = GraphBuilder::new()
            .entry("route")
            .node(step("route", NodeOutput::Branch("b".to_string())))
            .node(step("a", NodeOutput::Continue))
            .node(step("b", NodeOutput::Continue))
            .node(step("end", NodeOutput::Final))
            .conditional_edge("route", "a", "a")
            .conditional_edge("route", "b", "b")
            .edge("a", "end")
            .edge("b", "end")
            .build()
            .unwrap();

        assert_eq!(run(&graph).await.unwrap(), vec!["route", "b", "end"]);
    }

    #[tokio::test]
    async fn unmatched_branch_fails_with_trace() {
        let graph = GraphBuilder::new()
            .entry("route")
            .node(step("route", NodeOutput::Branch("other".to_string())))
            .node(step("a", NodeOutput::Final))
            .conditional_edge("route", "a", "a")
            .build()
            .unwrap();

        let err = run(&graph).await.unwrap_err();
        assert_eq!(err.node_id, "route");
        assert_eq!(err.execution_trace, vec!["route"]);
    }

    #[tokio::test]
    async fn continue_without_edge_fails() {
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Continue))
            .build()
            .unwrap();

        let err = run(&graph).await.unwrap_err();
        assert_eq!(err.node_id, "a");
        assert!(err.message.contains("No outgoing edge"));
    }

    #[tokio::test]
    async fn step_limit_stops_cycles() {
        let graph = GraphBuilder::new()
            .entry("a")
            .max_steps(3)
            .node(step("a", NodeOutput::Continue))
            .node(step("b", NodeOutput::Continue))
            .edge("a", "b")
            .edge("b", "a")
            .build()
            .unwrap();
        assert!(graph.has_cycle());

        let err = run(&graph).await.unwrap_err();
        assert_eq!(err.node_id, "runtime");
        assert_eq!(err.execution_trace, vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn missing_entry_node_is_an_error() {
        let graph = GraphBuilder::new()
            .entry("nowhere")
            .node(step("a", NodeOutput::Final))
            .build()
            .unwrap();

        let err = run(&graph).await.unwrap_err();
        assert!(err.message.contains("nowhere"));
        assert!(err.execution_trace.is_empty());
    }

    #[test]
    fn build_rejects_edges_to_unknown_nodes() {
        let result = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Final))
            .edge("a", "missing")
            .build();

        let err = result.err().map(|e| e.node_id);
        assert_eq!(err.as_deref(), Some("missing"));
    }
}
