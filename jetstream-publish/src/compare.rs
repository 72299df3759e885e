//! Structural comparison of decoded artifacts.
//!
//! Two artifacts match when their trees are equal ignoring mapping key order.
//! Before comparing, [`strip_volatile`] removes `Metadata.Jetstream` from both
//! sides so render-time values never trigger a republish.

use serde_json::{Number, Value};

use jetstream_core::{METADATA_KEY, VOLATILE_METADATA_KEY};

/// Recursive, key-order-independent equality.
///
/// Values of different kinds never match. Scalars compare natively: the
/// string `"1"` does not match the number `1`, and the integer `1` does not
/// match the float `1.0`. Integers compare exactly at any size; floats
/// compare by value, so `1.0` matches `1.00`.
pub fn objects_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, value)| match b.get(key) {
                    Some(other) => objects_match(value, other),
                    None => false,
                })
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| objects_match(x, y))
        }
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_match(a, b),
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

fn numbers_match(a: &Number, b: &Number) -> bool {
    let (a_text, b_text) = (a.to_string(), b.to_string());
    match (is_integer(&a_text), is_integer(&b_text)) {
        (true, true) => a_text == b_text,
        (false, false) => a.as_f64() == b.as_f64(),
        _ => false,
    }
}

/// Numbers keep their literal text, so an integer is one written without a
/// fraction or exponent.
fn is_integer(text: &str) -> bool {
    !text.contains(['.', 'e', 'E'])
}

/// Remove `Metadata.Jetstream` from both trees.
///
/// When `existing` has no `Metadata` at all and the candidate's `Metadata`
/// is empty once stripped, the candidate's `Metadata` is dropped too. The
/// rule is one-directional: an empty `Metadata` left on `existing` is kept.
pub fn strip_volatile(existing: &mut Value, candidate: &mut Value) {
    remove_volatile(existing);
    remove_volatile(candidate);

    let existing_has_metadata = existing
        .as_object()
        .map(|m| m.contains_key(METADATA_KEY))
        .unwrap_or(false);
    if existing_has_metadata {
        return;
    }
    if let Some(root) = candidate.as_object_mut() {
        let empty = root
            .get(METADATA_KEY)
            .and_then(Value::as_object)
            .map(|m| m.is_empty())
            .unwrap_or(false);
        if empty {
            root.shift_remove(METADATA_KEY);
        }
    }
}

fn remove_volatile(tree: &mut Value) {
    if let Some(metadata) = tree
        .as_object_mut()
        .and_then(|root| root.get_mut(METADATA_KEY))
        .and_then(Value::as_object_mut)
    {
        metadata.shift_remove(VOLATILE_METADATA_KEY);
    }
}
