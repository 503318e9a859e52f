//! HTTP webhook gateway
//!
//! Receives Telegram updates on `POST /webhook`, hands them to the
//! dispatcher and sends the replies before answering. Telegram only needs
//! to know whether the payload was accepted, so handler and send failures
//! never change the status code.
//!
//! Endpoints:
//! - `POST /webhook` - update delivery (200 / 400 malformed / 401 bad secret)
//! - `GET /health`  - liveness check, empty 200

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpListener;

use educore::config::WEBHOOK_PATH;
use educore::Config;

use crate::dispatcher::Dispatcher;
use crate::telegram::{deliver, MessageSender, Update};

/// Header Telegram echoes the registered secret token in.
pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Largest accepted update body (1 MiB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for the gateway routes
#[derive(Clone)]
struct GatewayState {
    dispatcher: Arc<Dispatcher>,
    sender: Arc<dyn MessageSender>,
    webhook_secret: Option<Arc<SecretString>>,
}

pub struct Gateway {
    state: GatewayState,
}

impl Gateway {
    pub fn new(dispatcher: Arc<Dispatcher>, sender: Arc<dyn MessageSender>) -> Self {
        Self {
            state: GatewayState {
                dispatcher,
                sender,
                webhook_secret: None,
            },
        }
    }

    /// Requires every delivery to carry `secret` in [`SECRET_HEADER`].
    pub fn with_secret(mut self, secret: SecretString) -> Self {
        self.state.webhook_secret = Some(Arc::new(secret));
        self
    }

    /// Gateway using the webhook secret from `config`, if one is set.
    pub fn from_config(config: &Config, dispatcher: Arc<Dispatcher>, sender: Arc<dyn MessageSender>) -> Self {
        let gateway = Self::new(dispatcher, sender);
        match &config.webhook_secret {
            Some(secret) => gateway.with_secret(SecretString::from(secret.expose_secret().to_owned())),
            None => gateway,
        }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route(WEBHOOK_PATH, post(webhook_handler))
            .route("/health", get(health_handler))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .with_state(self.state)
    }
}

/// Serves `router` on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    log::info!("Webhook gateway listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;

    log::info!("Webhook gateway stopped");
    Ok(())
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}

async fn webhook_handler(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    if let Some(expected) = &state.webhook_secret {
        let provided = headers.get(SECRET_HEADER).and_then(|value| value.to_str().ok());
        if provided != Some(expected.expose_secret()) {
            log::warn!("Rejected webhook delivery with missing or wrong secret token");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            log::warn!("Rejected malformed webhook payload ({} bytes): {}", body.len(), e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let replies = state.dispatcher.dispatch(&update).await;
    if !replies.is_empty() {
        let delivered = deliver(state.sender.as_ref(), &replies).await;
        if delivered < replies.len() {
            log::warn!(
                "Delivered {}/{} replies for update {:?}",
                delivered,
                replies.len(),
                update.update_id
            );
        }
    }

    StatusCode::OK
}
