// Graph State
// Per-turn state carried through the StateGraph

use serde::{Deserialize, Serialize};

/// Which retrieval backend answers a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RouteDecision {
    Weather,
    #[default]
    Document,
}

impl RouteDecision {
    /// Decode a raw classifier label.
    ///
    /// `Weather` iff the label mentions "weather" (any case); every other
    /// label, including "rag", empty output and noise, is `Document`.
    pub fn from_label(label: &str) -> Self {
        if label.to_lowercase().contains("weather") {
            RouteDecision::Weather
        } else {
            RouteDecision::Document
        }
    }

    /// Graph branch condition for this route.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDecision::Weather => "weather",
            RouteDecision::Document => "document",
        }
    }
}

/// Lifecycle of one turn: Start -> Classified -> Retrieved -> Answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TurnPhase {
    #[default]
    Start,
    Classified,
    Retrieved,
    Answered,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::Start => "start",
            TurnPhase::Classified => "classified",
            TurnPhase::Retrieved => "retrieved",
            TurnPhase::Answered => "answered",
        }
    }

    fn next(&self) -> Option<TurnPhase> {
        match self {
            TurnPhase::Start => Some(TurnPhase::Classified),
            TurnPhase::Classified => Some(TurnPhase::Retrieved),
            TurnPhase::Retrieved => Some(TurnPhase::Answered),
            TurnPhase::Answered => None,
        }
    }
}

/// Retrieved text plus the route that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub route: RouteDecision,
    pub text: String,
}

/// Main graph state
#[derive(Debug, Clone)]
pub struct TurnState {
    pub question: String,
    phase: TurnPhase,
    route: Option<RouteDecision>,
    context: Option<RetrievedContext>,
    answer: Option<String>,
}

impl TurnState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            phase: TurnPhase::Start,
            route: None,
            context: None,
            answer: None,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn route(&self) -> Option<RouteDecision> {
        self.route
    }

    pub fn context(&self) -> Option<&RetrievedContext> {
        self.context.as_ref()
    }

    fn advance(&mut self, to: TurnPhase) -> Result<(), String> {
        if self.phase.next() != Some(to) {
            return Err(format!(
                "invalid transition {} -> {}",
                self.phase.as_str(),
                to.as_str()
            ));
        }
        self.phase = to;
        Ok(())
    }

    pub fn record_route(&mut self, route: RouteDecision) -> Result<(), String> {
        self.advance(TurnPhase::Classified)?;
        self.route = Some(route);
        Ok(())
    }

    /// The context must come from the route chosen at classification.
    pub fn record_context(&mut self, route: RouteDecision, text: String) -> Result<(), String> {
        if self.route != Some(route) {
            return Err(format!(
                "{} context recorded for a turn routed to {}",
                route.as_str(),
                self.route.map(|r| r.as_str()).unwrap_or("nothing")
            ));
        }
        self.advance(TurnPhase::Retrieved)?;
        self.context = Some(RetrievedContext { route, text });
        Ok(())
    }

    pub fn record_answer(&mut self, answer: String) -> Result<(), String> {
        self.advance(TurnPhase::Answered)?;
        self.answer = Some(answer);
        Ok(())
    }

    /// `(context, answer)` once the turn has reached `Answered`.
    pub fn into_outcome(self) -> Option<(RetrievedContext, String)> {
        match (self.phase, self.context, self.answer) {
            (TurnPhase::Answered, Some(context), Some(answer)) => Some((context, answer)),
            _ => None,
        }
    }
}
