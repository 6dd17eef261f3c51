use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::config::Config;
use crate::errors::{AppError, ForwardingError};
use crate::webhook_models::{OrderEventRecord, ProfileRecord};

pub const PROFILES_ENDPOINT: &str = "/profiles/";
pub const EVENTS_ENDPOINT: &str = "/events/";
pub const PLACED_ORDER_METRIC: &str = "Placed Order";

/// Result of a profile upsert that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOutcome {
    Created,
    /// Klaviyo answered 409: the profile already exists.
    AlreadyExists,
}

/// Fixed-delay retry: `max_attempts` tries in total, `delay` between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(100),
        }
    }
}

enum PostOutcome {
    Accepted,
    Conflict,
}

/// Client for the Klaviyo JSON:API.
#[derive(Clone)]
pub struct KlaviyoClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    revision: String,
    retry: RetryPolicy,
}

impl KlaviyoClient {
    /// Creates a new `KlaviyoClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The Klaviyo API base URL, without trailing slash.
    /// * `api_key` - Private API key, sent as `Klaviyo-API-Key <key>`.
    /// * `revision` - Value of the `Revision` header.
    /// * `timeout` - Per-attempt request timeout.
    /// * `retry` - Retry policy applied to every call.
    pub fn new(
        base_url: String,
        api_key: String,
        revision: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create Klaviyo client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            revision,
            retry,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.klaviyo_base_url.clone(),
            config.klaviyo_api_key.clone(),
            config.klaviyo_revision.clone(),
            config.klaviyo_timeout(),
            RetryPolicy {
                max_attempts: config.klaviyo_max_attempts,
                delay: config.klaviyo_retry_delay(),
            },
        )
    }

    /// Creates or updates a profile.
    ///
    /// A 409 (profile already exists) is not an error and is never retried.
    pub async fn upsert_profile(
        &self,
        profile: &ProfileRecord,
    ) -> Result<ProfileOutcome, ForwardingError> {
        let body = profile_body(profile);
        match self.post_with_retry(PROFILES_ENDPOINT, &body, true).await? {
            PostOutcome::Accepted => Ok(ProfileOutcome::Created),
            PostOutcome::Conflict => {
                tracing::info!("Profile already exists in Klaviyo, skipping upsert");
                Ok(ProfileOutcome::AlreadyExists)
            }
        }
    }

    /// Tracks a "Placed Order" event.
    pub async fn track_order_event(&self, event: &OrderEventRecord) -> Result<(), ForwardingError> {
        let body = event_body(event);
        self.post_with_retry(EVENTS_ENDPOINT, &body, false).await?;
        Ok(())
    }

    async fn post_with_retry(
        &self,
        endpoint: &str,
        body: &Value,
        conflict_is_success: bool,
    ) -> Result<PostOutcome, ForwardingError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let result = self
                .client
                .post(&url)
                .header("Authorization", format!("Klaviyo-API-Key {}", self.api_key))
                .header("Revision", &self.revision)
                .header("Accept", "application/json")
                .json(body)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(
                        "Klaviyo API call successful: endpoint={}, status={}",
                        endpoint,
                        response.status()
                    );
                    return Ok(PostOutcome::Accepted);
                }
                Ok(response) if conflict_is_success && response.status() == StatusCode::CONFLICT => {
                    return Ok(PostOutcome::Conflict);
                }
                Ok(response) => {
                    let status = response.status();
                    let error_text = response.text().await.ok();
                    tracing::warn!(
                        "Klaviyo API call failed (attempt {}/{}): endpoint={}, status={}, body={}",
                        attempt,
                        max_attempts,
                        endpoint,
                        status,
                        error_text.as_deref().unwrap_or("")
                    );
                    last_error = Some(ForwardingError {
                        endpoint: endpoint.to_string(),
                        status: Some(status.as_u16()),
                        body: error_text,
                        attempts: attempt,
                        message: format!("Klaviyo API error: {}", status.as_u16()),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "Klaviyo request failed (attempt {}/{}): endpoint={}, error={}",
                        attempt,
                        max_attempts,
                        endpoint,
                        e
                    );
                    last_error = Some(ForwardingError {
                        endpoint: endpoint.to_string(),
                        status: None,
                        body: None,
                        attempts: attempt,
                        message: format!("Klaviyo request failed: {}", e),
                    });
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.retry.delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| ForwardingError {
            endpoint: endpoint.to_string(),
            status: None,
            body: None,
            attempts: 0,
            message: "No attempt was made".to_string(),
        }))
    }
}

/// JSON:API body for `POST /profiles/`.
pub fn profile_body(profile: &ProfileRecord) -> Value {
    json!({
        "data": {
            "type": "profile",
            "attributes": {
                "email": profile.email,
                "first_name": profile.first_name,
                "last_name": profile.last_name,
                "properties": {
                    "woocommerce_id": profile.external_id.clone().unwrap_or(Value::Null),
                }
            }
        }
    })
}

/// JSON:API body for `POST /events/`.
///
/// The raw payload is merged into `properties` after the canonical fields, so
/// raw keys with the same name (`total`, `currency`, `payment_method`) win.
pub fn event_body(event: &OrderEventRecord) -> Value {
    let mut properties = Map::new();
    properties.insert("order_id".to_string(), json!(event.order_id));
    properties.insert("total".to_string(), json!(event.total));
    properties.insert("currency".to_string(), json!(event.currency));
    properties.insert("payment_method".to_string(), json!(event.payment_method));
    properties.insert("coupons".to_string(), Value::Array(event.coupons.clone()));
    properties.insert("items".to_string(), Value::Array(event.items.clone()));
    properties.extend(event.extra_properties.clone());

    json!({
        "data": {
            "type": "event",
            "attributes": {
                "metric": {
                    "data": {
                        "type": "metric",
                        "attributes": { "name": PLACED_ORDER_METRIC }
                    }
                },
                "profile": {
                    "data": {
                        "type": "profile",
                        "attributes": { "email": event.customer_email }
                    }
                },
                "value": event.total,
                "time": event.occurred_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
                "properties": properties,
            }
        }
    })
}
