use serde_json::Value;

use super::format_scalar;

/// Headline field per command, in priority order.
const PRIORITY_KEYS: [&str; 6] = [
    "new_interest_rate",
    "final_rate",
    "risk_score",
    "matches",
    "all_passing",
    "answer",
];

/// Print just the headline value of the output, falling back to the first
/// field of the result object.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                return format_scalar(val);
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_scalar(val));
        }
    }

    format_scalar(result_obj)
}
