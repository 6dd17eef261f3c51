//! Inbound payload validation.
//!
//! Checks only the minimum shape needed to forward an order: a valid
//! `billing.email` and an integer-like `id`. Everything else in the payload is
//! treated as opaque and handled leniently by the normalizer.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use crate::webhook_models::{OrderId, RawOrderPayload};

// RFC 5322 simplified: local@domain.tld
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .expect("email regex is valid")
});

/// Field → violation reason for a rejected payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: BTreeMap<String, String>,
}

impl ValidationReport {
    pub fn add(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.errors.insert(field.into(), reason.into());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, reason)| format!("{}: {}", field, reason))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// A payload that passed validation, with its required fields already extracted.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedOrder<'a> {
    pub order_id: OrderId,
    pub email: &'a str,
    pub payload: &'a RawOrderPayload,
}

/// Parses a raw request body into an order payload.
///
/// Malformed JSON and non-object bodies are reported against the `payload` field.
pub fn parse_payload(body: &[u8]) -> Result<RawOrderPayload, ValidationReport> {
    let mut report = ValidationReport::default();
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => {
            report.add("payload", "The payload must be a JSON object.");
            Err(report)
        }
        Err(e) => {
            report.add("payload", format!("The payload is not valid JSON: {}", e));
            Err(report)
        }
    }
}

/// Validates the minimum required shape of an order payload.
pub fn validate(payload: &RawOrderPayload) -> Result<ValidatedOrder<'_>, ValidationReport> {
    let mut report = ValidationReport::default();

    let email = match payload
        .get("billing")
        .and_then(|billing| billing.get("email"))
    {
        None | Some(Value::Null) => {
            report.add("billing.email", "The billing.email field is required.");
            None
        }
        Some(Value::String(email)) if email.is_empty() => {
            report.add("billing.email", "The billing.email field is required.");
            None
        }
        Some(Value::String(email)) if is_valid_email(email) => Some(email.as_str()),
        Some(_) => {
            report.add(
                "billing.email",
                "The billing.email field must be a valid email address.",
            );
            None
        }
    };

    let order_id = match payload.get("id") {
        None | Some(Value::Null) => {
            report.add("id", "The id field is required.");
            None
        }
        Some(value) => match parse_order_id(value) {
            Some(id) => Some(id),
            None => {
                report.add("id", "The id field must be an integer.");
                None
            }
        },
    };

    match (email, order_id) {
        (Some(email), Some(order_id)) => Ok(ValidatedOrder {
            order_id,
            email,
            payload,
        }),
        _ => Err(report),
    }
}

/// Validate email address format.
pub fn is_valid_email(email: &str) -> bool {
    email.len() >= 5 && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Accepts JSON integers and strings holding an integer (`501`, `"501"`).
pub fn parse_order_id(value: &Value) -> Option<OrderId> {
    match value {
        Value::Number(n) => n.as_i64().map(OrderId),
        Value::String(s) => s.trim().parse::<i64>().ok().map(OrderId),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> RawOrderPayload {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn test_valid_payload() {
        let p = payload(json!({"id": 501, "billing": {"email": "a@b.com"}}));
        let order = validate(&p).unwrap();
        assert_eq!(order.order_id, OrderId(501));
        assert_eq!(order.email, "a@b.com");
    }

    #[test]
    fn test_string_id_is_integer_like() {
        let p = payload(json!({"id": "42", "billing": {"email": "a@b.com"}}));
        assert_eq!(validate(&p).unwrap().order_id, OrderId(42));
    }

    #[test]
    fn test_missing_billing() {
        let p = payload(json!({"id": 7}));
        let report = validate(&p).unwrap_err();
        assert!(report.errors.contains_key("billing.email"));
        assert!(!report.errors.contains_key("id"));
    }

    #[test]
    fn test_reports_every_violation() {
        let p = payload(json!({"billing": {"email": "not-an-email"}, "id": 4.5}));
        let report = validate(&p).unwrap_err();
        assert_eq!(report.errors.len(), 2);
        assert_eq!(
            report.errors["billing.email"],
            "The billing.email field must be a valid email address."
        );
        assert_eq!(report.errors["id"], "The id field must be an integer.");
    }

    #[test]
    fn test_non_integer_ids_rejected() {
        assert_eq!(parse_order_id(&json!("abc")), None);
        assert_eq!(parse_order_id(&json!(true)), None);
        assert_eq!(parse_order_id(&json!(1.5)), None);
        assert_eq!(parse_order_id(&json!(" 12 ")), Some(OrderId(12)));
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user+tag@example.co.uk"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("missing@domain"));
        assert!(!is_valid_email("user @example.com"));
    }

    #[test]
    fn test_parse_payload_rejects_non_objects() {
        assert!(parse_payload(br#"{"id": 1}"#).is_ok());
        assert!(parse_payload(b"[1, 2]").unwrap_err().errors.contains_key("payload"));
        assert!(parse_payload(b"webhook_id=12").is_err());
    }
}
