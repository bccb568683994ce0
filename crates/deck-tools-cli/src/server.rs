//! Webhook HTTP server

use anyhow::Result;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use deck_runtime::{DeckCommand, Delivery, Pipeline, PipelineOutcome, WebhookEnvelope};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub commands: mpsc::UnboundedSender<DeckCommand>,
    pub started: DateTime<Utc>,
}

pub fn router(state: AppState) -> Router {
    let webhook_path = state.pipeline.config().webhook_path.clone();
    Router::new()
        .route(&webhook_path, post(webhook))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let webhook_path = state.pipeline.config().webhook_path.clone();
    let app = router(state);

    log::info!("listening on {addr}, webhook at {webhook_path}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("shutting down");
        })
        .await?;
    Ok(())
}

/// Handler for `POST <webhook_path>`; always answers 200
async fn webhook(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    Json(acknowledge(&state, &body).await)
}

/// Admit the delivery and queue it for the worker
async fn acknowledge(state: &AppState, body: &[u8]) -> Value {
    let envelope = match WebhookEnvelope::parse(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::warn!("unreadable webhook body: {e}");
            return json!({"status": "ignored", "message": e.to_string()});
        }
    };

    let event = match envelope.into_delivery() {
        Delivery::Challenge(challenge) => return json!({"challenge": challenge}),
        Delivery::Empty => {
            return json!({"status": "ignored", "message": "Webhook received but no event data"});
        }
        Delivery::Event(event) => event,
    };

    let key = state.pipeline.key_of(&event);
    let claim = match state.pipeline.admit(&event).await {
        Ok(claim) => claim,
        Err(PipelineOutcome::Skipped { reason, .. }) => {
            return json!({"status": "skipped", "item_id": key, "message": reason});
        }
        Err(other) => return json!({"status": "skipped", "item_id": key, "message": format!("{other:?}")}),
    };

    // A refused command drops its claim, so a retry can be admitted
    if state
        .commands
        .send(DeckCommand::Process { event, claim })
        .is_err()
    {
        log::error!("worker is gone; dropping {key}");
        return json!({"status": "error", "item_id": key, "message": "worker unavailable"});
    }

    log::info!("accepted {key}");
    json!({"status": "accepted", "item_id": key})
}

/// Handler for `GET /health`
async fn health(State(state): State<AppState>) -> Json<Value> {
    let now = Utc::now();
    Json(json!({
        "status": "ok",
        "uptime_seconds": (now - state.started).num_seconds(),
        "in_flight": state.pipeline.ledger().in_flight(),
        "timestamp": now.to_rfc3339(),
    }))
}
