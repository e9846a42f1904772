// Graph Module
// LangGraph-style StateGraph architecture for Rust

pub mod builder;
pub mod node;
pub mod runtime;
pub mod state;

pub mod nodes;

pub use builder::build_agent_graph;
pub use node::{GraphError, Node, NodeContext, NodeOutput};
pub use runtime::GraphRuntime;
pub use state::{RetrievedContext, RouteDecision, TurnPhase, TurnState};
