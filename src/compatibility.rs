//! Initial-state compatibility checking
//!
//! Decides whether a proposed `initialState` value can stand in for the
//! reference value. The reference is the ground truth: it defines the minimum
//! contract, and extra information in the candidate is always acceptable.

use serde_json::{Number, Value};

/// Whether `candidate` is an acceptable substitute for `ground_truth`.
///
/// - Arrays must have exactly the same length (position carries meaning) and
///   be pairwise compatible.
/// - Objects must contain every ground-truth key with a compatible value;
///   keys only present in the candidate are ignored.
/// - Everything else, `null` included, must be strictly equal.
///
/// The relation is not symmetric.
pub fn is_initial_state_compatible(ground_truth: &Value, candidate: &Value) -> bool {
    match ground_truth {
        Value::Array(expected) => match candidate {
            Value::Array(actual) => {
                expected.len() == actual.len()
                    && expected
                        .iter()
                        .zip(actual)
                        .all(|(e, a)| is_initial_state_compatible(e, a))
            }
            _ => false,
        },
        Value::Object(expected) => match candidate {
            Value::Object(actual) => expected.iter().all(|(key, e)| {
                actual
                    .get(key)
                    .is_some_and(|a| is_initial_state_compatible(e, a))
            }),
            _ => false,
        },
        _ => primitive_equal(ground_truth, candidate),
    }
}

/// Symmetric deep equality with numeric value semantics for numbers
pub fn json_deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_deep_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| json_deep_equal(l, r)))
        }
        _ => primitive_equal(a, b),
    }
}

/// Equality of optional values, where `None` stands for an absent attribute
pub fn optional_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => json_deep_equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn primitive_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        _ => a == b,
    }
}

// serde_json keeps 1 and 1.0 apart; JSON producers do not.
fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
