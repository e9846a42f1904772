// Graph Builder
// Constructs the question-answering graph using petgraph

use super::node::GraphError;
use super::nodes::{ClassifierNode, DocumentNode, SynthesizerNode, WeatherNode};
use super::runtime::{GraphBuilder, GraphRuntime};
use super::state::RouteDecision;

/// Build the single-pass routing graph:
/// classifier -> {weather | document} -> synthesizer
pub fn build_agent_graph() -> Result<GraphRuntime, GraphError> {
    let graph = GraphBuilder::new()
        .entry("classifier")
        .max_steps(3)
        .node(Box::new(ClassifierNode::new()))
        .node(Box::new(WeatherNode::new()))
        .node(Box::new(DocumentNode::new()))
        .node(Box::new(SynthesizerNode::new()))
        // Classifier edges (one per route)
        .conditional_edge("classifier", "weather", RouteDecision::Weather.as_str())
        .conditional_edge("classifier", "document", RouteDecision::Document.as_str())
        // Both retrievers feed the synthesizer
        .edge("weather", "synthesizer")
        .edge("document", "synthesizer")
        .build()?;

    if graph.has_cycle() {
        return Err(GraphError::new("builder", "agent graph must be acyclic"));
    }
    tracing::debug!("Agent graph ready with nodes: {:?}", graph.node_ids());
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_has_four_nodes_and_no_cycle() {
        let graph = build_agent_graph().unwrap();
        let mut ids = graph.node_ids();
        ids.sort_unstable();
        assert_eq!(ids, vec!["classifier", "document", "synthesizer", "weather"]);
        assert!(!graph.has_cycle());
    }
}
