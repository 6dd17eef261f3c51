use crate::errors::AppError;
use crate::handlers::AppState;
use crate::klaviyo_client::ProfileOutcome;
use crate::normalizer::normalize;
use crate::signature::validate_webhook_signature;
use crate::validation::{parse_payload, validate};
use crate::webhook_models::{RawOrderPayload, WebhookResponse, WebhookStatus};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

/// WooCommerce "order created" webhook handler
///
/// Verifies the delivery signature (when a secret is configured), validates and
/// normalizes the order, then forwards a profile and a "Placed Order" event to
/// Klaviyo.
///
/// Once the payload is valid the answer is always 200: forwarding failures are
/// logged rather than surfaced, so WooCommerce does not redeliver.
pub async fn woocommerce_order_created(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookResponse>), AppError> {
    let topic = headers
        .get("x-wc-webhook-topic")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info!(
        "WooCommerce order webhook received (topic={}, {} bytes)",
        topic,
        body.len()
    );

    // 1. Signature
    validate_webhook_signature(state.config.webhook_secret.as_deref(), &headers, &body)?;

    // 2. Parse
    let payload = parse_payload(&body).map_err(AppError::InvalidPayload)?;
    tracing::debug!(
        "WooCommerce order payload: {}",
        serde_json::to_string(&payload).unwrap_or_default()
    );

    // 3. Validate, normalize, forward
    let status = process_order(&state, &payload).await?;

    Ok((StatusCode::OK, Json(status.into())))
}

/// Runs the normalize-and-forward pipeline for one order payload.
///
/// Only validation failures are returned as errors. Profile and event
/// forwarding failures are logged; an idempotency store failure turns the
/// status into `error_logged`.
pub async fn process_order(
    state: &AppState,
    payload: &RawOrderPayload,
) -> Result<WebhookStatus, AppError> {
    let order = validate(payload).map_err(AppError::InvalidPayload)?;
    let order_id = order.order_id;
    let (profile, event) = normalize(&order);

    // Profile upsert never blocks event tracking
    match state.klaviyo.upsert_profile(&profile).await {
        Ok(ProfileOutcome::Created) => {
            tracing::debug!("Profile upserted for order {}", order_id);
        }
        Ok(ProfileOutcome::AlreadyExists) => {
            tracing::debug!("Profile already existed for order {}", order_id);
        }
        Err(e) => {
            tracing::error!(
                order_id = %order_id,
                endpoint = %e.endpoint,
                status = ?e.status,
                body = ?e.body,
                "Klaviyo profile upsert failed: {}",
                e
            );
        }
    }

    let mut store_failed = false;
    match state.guard.has_been_processed(order_id).await {
        Ok(true) => {
            tracing::info!("Order event already tracked for order ID: {}", order_id);
            return Ok(WebhookStatus::AlreadyProcessed);
        }
        Ok(false) => {}
        Err(e) => {
            // Best effort: forward anyway rather than drop the event
            tracing::error!(
                "Idempotency check failed for order {}, forwarding anyway: {}",
                order_id,
                e
            );
            store_failed = true;
        }
    }

    match state.klaviyo.track_order_event(&event).await {
        Ok(()) => {
            tracing::info!("Placed Order event tracked for order {}", order_id);
            if let Err(e) = state.guard.mark_processed(order_id).await {
                tracing::error!("Failed to mark order {} as processed: {}", order_id, e);
                store_failed = true;
            }
        }
        Err(e) => {
            tracing::error!(
                order_id = %order_id,
                endpoint = %e.endpoint,
                status = ?e.status,
                body = ?e.body,
                "Error processing Klaviyo integration: {}",
                e
            );
        }
    }

    Ok(if store_failed {
        WebhookStatus::ErrorLogged
    } else {
        WebhookStatus::Processed
    })
}
