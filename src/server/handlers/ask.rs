use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::TurnResult;
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Runs one question through the orchestrator.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<TurnResult>, ApiError> {
    if payload.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    // Passed through untouched; the weather route uses it as the location.
    let turn = state.orchestrator.run(&payload.question);
    let result = match state.config.server.request_timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), turn)
            .await
            .map_err(|_| {
                tracing::warn!("Turn timed out after {}s", secs);
                ApiError::ServiceUnavailable(format!("request timed out after {}s", secs))
            })?,
        None => turn.await,
    };

    match result {
        Ok(result) => Ok(Json(result)),
        Err(err) => {
            tracing::error!("Failed to answer question: {}", err);
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::handlers::test_support::{test_state, test_state_with_llm, StubLlm};

    fn request(question: &str) -> Json<AskRequest> {
        Json(AskRequest {
            question: question.to_string(),
        })
    }

    #[tokio::test]
    async fn answers_a_weather_question() {
        let state = test_state(|_| {}).await;

        let Json(result) = ask(State(state), request("Delhi")).await.unwrap();

        assert_eq!(result.question, "Delhi");
        assert_eq!(result.context, "Sunny in Delhi");
        assert_eq!(result.answer, "It is sunny.");
    }

    #[tokio::test]
    async fn question_reaches_the_turn_verbatim() {
        let state = test_state(|_| {}).await;

        let Json(result) = ask(State(state), request("  Delhi \n")).await.unwrap();

        assert_eq!(result.question, "  Delhi \n");
        assert_eq!(result.context, "Sunny in   Delhi \n");
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let state = test_state(|_| {}).await;

        let err = ask(State(state), request("   ")).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn llm_failure_is_a_bad_gateway() {
        let state = test_state_with_llm(
            |_| {},
            StubLlm {
                fail: true,
                ..StubLlm::default()
            },
        )
        .await;

        let err = ask(State(state), request("Delhi")).await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }

    #[tokio::test]
    async fn slow_turn_hits_the_timeout() {
        let state = test_state_with_llm(
            |config| config.server.request_timeout_secs = Some(1),
            StubLlm {
                delay: Some(Duration::from_secs(5)),
                ..StubLlm::default()
            },
        )
        .await;

        let err = ask(State(state), request("Delhi")).await.unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }
}
