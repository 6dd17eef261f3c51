/// Property-based tests using proptest
/// Tests invariants of validation and normalization that should hold for all inputs
use proptest::prelude::*;
use serde_json::{json, Value};
use woo_klaviyo_bridge::normalizer::normalize;
use woo_klaviyo_bridge::validation::{is_valid_email, parse_payload, validate};
use woo_klaviyo_bridge::webhook_models::{OrderId, RawOrderPayload};

fn as_payload(value: Value) -> RawOrderPayload {
    value.as_object().cloned().unwrap_or_default()
}

fn arbitrary_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "\\PC{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

// Property: validation never panics
proptest! {
    #[test]
    fn parse_payload_never_panics(body in prop::collection::vec(any::<u8>(), 0..256)) {
        if let Ok(payload) = parse_payload(&body) {
            let _ = validate(&payload);
        }
    }

    #[test]
    fn email_validation_never_panics(email in "\\PC*") {
        let _ = is_valid_email(&email);
    }
}

// Property: valid payloads always normalize, and the profile email is the billing email
proptest! {
    #[test]
    fn valid_payloads_normalize_with_billing_email(
        local in "[a-z][a-z0-9._+-]{0,15}",
        domain in "[a-z][a-z0-9]{0,10}",
        tld in "[a-z]{2,6}",
        id in any::<i64>(),
        total in arbitrary_json(),
        currency in arbitrary_json(),
        line_items in arbitrary_json(),
        coupon_lines in arbitrary_json(),
        date_created in arbitrary_json(),
        extra in arbitrary_json(),
    ) {
        let email = format!("{}@{}.{}", local, domain, tld);
        let payload = as_payload(json!({
            "id": id,
            "billing": {"email": email},
            "total": total,
            "currency": currency,
            "line_items": line_items,
            "coupon_lines": coupon_lines,
            "date_created": date_created,
            "meta_data": extra,
        }));

        let order = validate(&payload);
        prop_assert!(order.is_ok(), "rejected valid payload: {:?}", payload);
        let order = order.unwrap();

        let (profile, event) = normalize(&order);
        prop_assert_eq!(&profile.email, &email);
        prop_assert_eq!(event.order_id, OrderId(id));
        prop_assert!(event.total.is_finite());
        prop_assert!(!event.currency.is_empty());
        prop_assert_eq!(event.extra_properties, payload.clone());
    }

    #[test]
    fn non_numeric_totals_default_to_zero(total in "[a-zA-Z ]{0,10}") {
        let payload = as_payload(json!({
            "id": 1,
            "billing": {"email": "a@b.com"},
            "total": total,
        }));
        let order = validate(&payload).unwrap();
        let (_, event) = normalize(&order);
        // "inf"/"nan" spellings parse as floats but are not finite
        prop_assert_eq!(event.total, 0.0);
    }

    #[test]
    fn numeric_string_totals_are_parsed(cents in 0u64..10_000_000) {
        let total = format!("{}.{:02}", cents / 100, cents % 100);
        let payload = as_payload(json!({
            "id": 1,
            "billing": {"email": "a@b.com"},
            "total": total,
        }));
        let order = validate(&payload).unwrap();
        let (_, event) = normalize(&order);
        prop_assert!((event.total - cents as f64 / 100.0).abs() < 1e-6);
    }
}

// Property: payloads without an email or id never validate
proptest! {
    #[test]
    fn payloads_missing_required_fields_rejected(extra in arbitrary_json(), id in any::<i64>()) {
        let without_billing = as_payload(json!({"id": id, "other": extra.clone()}));
        prop_assert!(validate(&without_billing).is_err());

        let without_id = as_payload(json!({"billing": {"email": "a@b.com"}, "other": extra}));
        prop_assert!(validate(&without_id).is_err());
    }
}
