// Graph Nodes Module
// Individual node implementations

pub mod classifier;
pub mod document;
pub mod synthesizer;
pub mod weather;

pub use classifier::ClassifierNode;
pub use document::DocumentNode;
pub use synthesizer::SynthesizerNode;
pub use weather::WeatherNode;
