use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// WooCommerce order payload exactly as received.
///
/// No schema is imposed beyond what the validator checks.
pub type RawOrderPayload = Map<String, Value>;

/// WooCommerce order identifier, used as the idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Customer profile derived from the order's billing block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRecord {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// WooCommerce `customer_id`; `None` when absent or null.
    pub external_id: Option<Value>,
}

/// "Placed Order" event derived from the order payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEventRecord {
    pub order_id: OrderId,
    /// Billing email, used to attach the event to a profile.
    pub customer_email: String,
    pub total: f64,
    pub currency: String,
    pub payment_method: String,
    pub coupons: Vec<Value>,
    pub items: Vec<Value>,
    pub occurred_at: DateTime<Utc>,
    /// Full original payload, merged into the event properties last.
    pub extra_properties: RawOrderPayload,
}

/// Outcome reported back to WooCommerce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    Processed,
    AlreadyProcessed,
    InvalidPayload,
    ErrorLogged,
}

/// Response body sent back to the webhook sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: WebhookStatus,
}

impl From<WebhookStatus> for WebhookResponse {
    fn from(status: WebhookStatus) -> Self {
        Self { status }
    }
}
