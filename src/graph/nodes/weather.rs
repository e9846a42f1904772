// Weather Node
// Current-weather lookup; provider failures become context text

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{RouteDecision, TurnState};
use crate::tools::weather::fetch_weather;

pub struct WeatherNode;

impl WeatherNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WeatherNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for WeatherNode {
    fn id(&self) -> &'static str {
        "weather"
    }

    fn name(&self) -> &'static str {
        "Weather Retriever"
    }

    async fn execute(
        &self,
        state: &mut TurnState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        // The whole question is used as the location.
        let report = fetch_weather(ctx.weather, &state.question).await;

        state
            .record_context(RouteDecision::Weather, report)
            .map_err(|msg| GraphError::new(self.id(), msg))?;

        Ok(NodeOutput::Continue)
    }
}
