// ABOUTME: Opaque component state and the recursive merge used by extend_state.
// ABOUTME: Objects merge key-wise, arrays index-wise, everything else is replaced.

use serde_json::Value;

/// Merge `source` into `target` in place.
///
/// Objects are merged key by key and arrays element by element, recursing
/// into nested values; the target array grows when the source is longer.
/// Any other pairing replaces the target with a copy of the source.
pub fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => {
            for (i, value) in source.iter().enumerate() {
                match target.get_mut(i) {
                    Some(existing) => deep_merge(existing, value),
                    None => target.push(value.clone()),
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

/// Non-mutating form of [`deep_merge`]
pub fn merged(target: &Value, source: &Value) -> Value {
    let mut result = target.clone();
    deep_merge(&mut result, source);
    result
}
