//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::Serialize;

use crate::bot::{Bot, HealthSnapshot};
use crate::health::HealthResponse;
use crate::pool::ActiveEmote;
use crate::version::VersionInfo;

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: HealthResponse,
    pub version: VersionInfo,
    pub slots: SlotsResponse,
}

#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub total: usize,
    pub available: usize,
    pub active: Vec<ActiveEmote>,
}

impl HealthCheckResponse {
    pub fn from_snapshot(snapshot: HealthSnapshot) -> Self {
        let status = if snapshot.is_busy() {
            HealthResponse::Busy
        } else {
            snapshot.state.into()
        };

        Self {
            status,
            version: snapshot.version,
            slots: SlotsResponse {
                total: snapshot.total_slots,
                available: snapshot.available_slots,
                active: snapshot.active,
            },
        }
    }
}

async fn health_check(State(bot): State<Arc<Bot>>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse::from_snapshot(bot.health().await))
}

async fn shutdown(State(bot): State<Arc<Bot>>) -> impl IntoResponse {
    tracing::info!("Shutdown requested via HTTP");
    bot.trigger_shutdown();
    (StatusCode::OK, Json(serde_json::json!({})))
}

pub fn routes(bot: Arc<Bot>) -> Router {
    Router::new()
        .route("/health-check", get(health_check))
        .route("/shutdown", post(shutdown))
        .with_state(bot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::BotConfig;
    use crate::catalog::EmoteCatalog;
    use crate::command::CommandHandler;
    use crate::pool::EmotePool;
    use crate::registry::mock::MockRegistry;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body();
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn bot(ids: &[&str]) -> Arc<Bot> {
        let pool = Arc::new(EmotePool::new(
            EmoteCatalog::new(ids.iter().copied()).unwrap(),
            Arc::new(MockRegistry::new()),
        ));
        let ttl = Duration::from_secs(20);
        let handler = CommandHandler::new(Arc::clone(&pool), ttl);
        Arc::new(Bot::new(pool, handler, BotConfig::new("streamer".to_string())))
    }

    #[tokio::test]
    async fn health_check_returns_status_and_slots() {
        let app = routes(bot(&["X", "Y"]));

        let response = app
            .oneshot(Request::get("/health-check").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "STARTING");
        assert!(json["version"]["emote_pool"].is_string());
        assert_eq!(json["slots"]["total"], 2);
        assert_eq!(json["slots"]["available"], 2);
        assert_eq!(json["slots"]["active"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn health_check_lists_active_emotes() {
        let bot = bot(&["X"]);
        bot.pool().allocate("catJAM").await.unwrap();

        let response = routes(Arc::clone(&bot))
            .oneshot(Request::get("/health-check").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let json = response_json(response).await;
        assert_eq!(json["slots"]["available"], 0);
        assert_eq!(json["slots"]["active"][0]["id"], "X");
        assert_eq!(json["slots"]["active"][0]["alias"], "catJAM");
    }

    #[tokio::test]
    async fn shutdown_cancels_bot_token() {
        let bot = bot(&["X"]);
        let token = bot.shutdown_token();
        assert!(!token.is_cancelled());

        let response = routes(bot)
            .oneshot(Request::post("/shutdown").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = routes(bot(&["X"]))
            .oneshot(Request::get("/predictions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
