//! JSON equality and number arithmetic as JSON Schema defines them
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Tolerance for `multipleOf` on non-integer operands
const MULTIPLE_OF_EPSILON: f64 = 1e-9;

/// Structural equality where numbers compare by value, so `1 == 1.0`
pub fn json_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b) == Ordering::Equal,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).map_or(false, |y| json_equal(x, y)))
        }
        _ => left == right,
    }
}

/// Compare two numbers exactly when both are integers, as floats otherwise
pub fn compare_numbers(left: &Number, right: &Number) -> Ordering {
    match (as_integer(left), as_integer(right)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => {
            let a = left.as_f64().unwrap_or(f64::NAN);
            let b = right.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
    }
}

/// Whether `value` is an integer multiple of `multiple`
pub fn is_multiple_of(value: &Number, multiple: &Number) -> bool {
    if let (Some(v), Some(m)) = (as_integer(value), as_integer(multiple)) {
        return m != 0 && v % m == 0;
    }

    let (Some(v), Some(m)) = (value.as_f64(), multiple.as_f64()) else {
        return false;
    };
    let quotient = v / m;
    quotient.is_finite() && (quotient - quotient.round()).abs() < MULTIPLE_OF_EPSILON
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}
