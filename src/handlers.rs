use crate::config::Config;
use crate::errors::AppError;
use crate::idempotency::{IdempotencyGuard, InMemoryStore, KeyValueStore, RedisStore};
use crate::klaviyo_client::KlaviyoClient;
use crate::webhook_handler;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

pub const ORDER_CREATED_PATH: &str = "/api/webhooks/woocommerce/order-created";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the Klaviyo API.
    pub klaviyo: KlaviyoClient,
    /// Deduplicates "Placed Order" events per order id.
    pub guard: IdempotencyGuard,
}

impl AppState {
    /// Builds the state from configuration, connecting to Redis when `REDIS_URL` is set.
    pub async fn from_config(config: Config) -> Result<Self, AppError> {
        let store: Arc<dyn KeyValueStore> = match config.redis_url.as_deref() {
            Some(url) => {
                let store = RedisStore::connect(url).await?;
                tracing::info!("Idempotency store: redis");
                Arc::new(store)
            }
            None => {
                tracing::info!("Idempotency store: in-memory (not shared across instances)");
                Arc::new(InMemoryStore::new())
            }
        };

        let klaviyo = KlaviyoClient::from_config(&config)?;
        let guard = IdempotencyGuard::new(store, config.idempotency_ttl());

        Ok(Self {
            config,
            klaviyo,
            guard,
        })
    }
}

/// Application routes, without the middleware stack.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            ORDER_CREATED_PATH,
            post(webhook_handler::woocommerce_order_created).fallback(method_not_allowed),
        )
        .with_state(state)
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Only POST is accepted on the webhook route.
pub async fn method_not_allowed() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}
