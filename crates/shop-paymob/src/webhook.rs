//! # Paymob Webhook Verification
//!
//! Paymob signs transaction callbacks with HMAC-SHA512 and appends the hex
//! digest as an `hmac` query parameter. The signed message is the callback
//! object with its keys sorted recursively and all leaf values concatenated
//! depth-first.

use serde_json::Value;
use shop_core::{Currency, StoreError, StoreResult, TransactionCallback};

/// Compute the canonical string Paymob signs: keys sorted recursively,
/// leaf values concatenated depth-first.
pub fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    append_canonical(value, &mut out);
    out
}

fn append_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                append_canonical(&map[key], out);
            }
        }
        Value::Array(items) => {
            // Arrays are leaves, stringified the way the provider's digest
            // does: elements joined with commas, objects flattened to
            // "[object Object]", null to the empty string
            let rendered: Vec<String> = items.iter().map(coerce_array_element).collect();
            out.push_str(&rendered.join(","));
        }
        Value::String(s) => out.push_str(s),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Null => out.push_str("null"),
    }
}

fn coerce_array_element(value: &Value) -> String {
    match value {
        Value::Object(_) => "[object Object]".to_string(),
        Value::Array(inner) => {
            let rendered: Vec<String> = inner.iter().map(coerce_array_element).collect();
            rendered.join(",")
        }
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => (if *b { "true" } else { "false" }).to_string(),
        // null inside an array renders empty, unlike null in value position
        Value::Null => String::new(),
    }
}

/// Compute the hex HMAC-SHA512 signature for a callback payload
pub fn compute_signature(secret: &str, payload: &Value) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha512;

    type HmacSha512 = Hmac<Sha512>;

    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(canonical_string(payload).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a callback signature (constant-time comparison)
pub fn verify_signature(secret: &str, payload: &Value, signature: &str) -> bool {
    let expected = compute_signature(secret, payload);
    constant_time_compare(&expected, signature)
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Parse a transaction callback body into the gateway-neutral form.
///
/// The callback must carry `order.id`; everything else is optional.
pub fn parse_callback(payload: &Value) -> StoreResult<TransactionCallback> {
    let obj = payload
        .as_object()
        .ok_or_else(|| StoreError::WebhookParseError("Callback is not an object".to_string()))?;

    let gateway_order_id = obj
        .get("order")
        .and_then(|o| o.get("id"))
        .map(json_id_to_string)
        .ok_or_else(|| StoreError::WebhookParseError("Missing order.id".to_string()))?;

    let success = obj.get("success").and_then(Value::as_bool).unwrap_or(false);

    // Newer callbacks carry the transaction ID as `id`, older as
    // `transaction_id`
    let transaction_id = obj
        .get("id")
        .or_else(|| obj.get("transaction_id"))
        .map(json_id_to_string);

    let amount_cents = obj.get("amount_cents").and_then(Value::as_i64);

    let currency = obj
        .get("currency")
        .and_then(Value::as_str)
        .and_then(Currency::from_code);

    let source_subtype = obj
        .get("source_data")
        .and_then(|sd| sd.get("sub_type"))
        .and_then(Value::as_str)
        .map(String::from);

    Ok(TransactionCallback {
        success,
        gateway_order_id,
        transaction_id,
        amount_cents,
        currency,
        source_subtype,
    })
}

// Paymob sends numeric IDs; accept strings too
fn json_id_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_string_sorts_keys() {
        let payload = json!({
            "b": "two",
            "a": "one",
            "c": { "z": 3, "y": "inner" }
        });

        // a, b, then c recursed with y before z
        assert_eq!(canonical_string(&payload), "onetwoinner3");
    }

    #[test]
    fn test_canonical_string_leaf_types() {
        let payload = json!({
            "flag": true,
            "empty": null,
            "count": 42,
            "list": [1, 2]
        });

        // Sorted: count, empty, flag, list
        assert_eq!(canonical_string(&payload), "42nulltrue1,2");
    }

    #[test]
    fn test_canonical_string_object_arrays() {
        // Transaction callbacks carry order.items as an array of objects;
        // the digest flattens each to "[object Object]"
        let payload = json!({
            "order": {
                "id": 987654,
                "items": [
                    { "name": "Widget", "quantity": 2 },
                    { "name": "Gadget", "quantity": 1 }
                ]
            },
            "success": true
        });

        assert_eq!(
            canonical_string(&payload),
            "987654[object Object],[object Object]true"
        );

        let with_null = json!({ "list": [null, "x", { "k": 1 }] });
        assert_eq!(canonical_string(&with_null), ",x,[object Object]");
    }

    #[test]
    fn test_signature_round() {
        let payload = json!({
            "success": true,
            "order": { "id": 987654 },
            "amount_cents": 15000
        });

        let sig = compute_signature("secret", &payload);
        assert_eq!(sig.len(), 128); // SHA-512 hex digest

        assert!(verify_signature("secret", &payload, &sig));
        assert!(!verify_signature("other-secret", &payload, &sig));

        let mut tampered = payload.clone();
        tampered["amount_cents"] = json!(1);
        assert!(!verify_signature("secret", &tampered, &sig));
    }

    #[test]
    fn test_parse_callback() {
        let payload = json!({
            "success": true,
            "id": 4471234,
            "order": { "id": 987654 },
            "amount_cents": 15000,
            "currency": "EGP",
            "source_data": { "sub_type": "WALLET" }
        });

        let cb = parse_callback(&payload).unwrap();
        assert!(cb.success);
        assert_eq!(cb.gateway_order_id, "987654");
        assert_eq!(cb.transaction_id.as_deref(), Some("4471234"));
        assert_eq!(cb.amount_cents, Some(15000));
        assert_eq!(cb.currency, Some(Currency::EGP));
        assert_eq!(cb.source_subtype.as_deref(), Some("WALLET"));
    }

    #[test]
    fn test_parse_callback_missing_order() {
        let payload = json!({ "success": true });
        let err = parse_callback(&payload).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_parse_callback_defaults_to_failure() {
        let payload = json!({ "order": { "id": "12" } });
        let cb = parse_callback(&payload).unwrap();
        assert!(!cb.success);
        assert_eq!(cb.gateway_order_id, "12");
        assert!(cb.transaction_id.is_none());
    }
}
