//! Maps a validated WooCommerce order into the two canonical records.
//!
//! Every optional field falls back to its default when absent or of the wrong
//! type; normalization itself never fails.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::validation::ValidatedOrder;
use crate::webhook_models::{OrderEventRecord, ProfileRecord};

pub const DEFAULT_CURRENCY: &str = "USD";

/// Normalizes using the current wall-clock time as the fallback event time.
pub fn normalize(order: &ValidatedOrder<'_>) -> (ProfileRecord, OrderEventRecord) {
    normalize_at(order, Utc::now())
}

/// Normalizes with an explicit fallback time for orders without a usable `date_created`.
pub fn normalize_at(
    order: &ValidatedOrder<'_>,
    now: DateTime<Utc>,
) -> (ProfileRecord, OrderEventRecord) {
    let payload = order.payload;
    let billing = payload.get("billing");

    let profile = ProfileRecord {
        email: order.email.to_string(),
        first_name: string_field(billing.and_then(|b| b.get("first_name"))),
        last_name: string_field(billing.and_then(|b| b.get("last_name"))),
        external_id: payload
            .get("customer_id")
            .filter(|id| !id.is_null())
            .cloned(),
    };

    let event = OrderEventRecord {
        order_id: order.order_id,
        customer_email: order.email.to_string(),
        total: payload.get("total").and_then(parse_decimal).unwrap_or(0.0),
        currency: payload
            .get("currency")
            .and_then(Value::as_str)
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_string(),
        payment_method: string_field(payload.get("payment_method")),
        coupons: array_field(payload.get("coupon_lines")),
        items: array_field(payload.get("line_items")),
        occurred_at: payload
            .get("date_created")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .unwrap_or(now),
        extra_properties: payload.clone(),
    };

    tracing::debug!(
        "Normalized order {}: total={} {}, {} item(s), {} coupon(s)",
        event.order_id,
        event.total,
        event.currency,
        event.items.len(),
        event.coupons.len()
    );

    (profile, event)
}

fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn array_field(value: Option<&Value>) -> Vec<Value> {
    value
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// WooCommerce sends money as strings ("42.50"); plain numbers are accepted too.
fn parse_decimal(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Parse a WooCommerce date string to `DateTime<Utc>`.
///
/// Timestamps without an offset are taken as UTC.
pub fn parse_timestamp(timestamp_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = timestamp_str.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .ok()
}
