use serde_json::Value;

pub const NAME_FIELDS: &[&str] = &[
    "name",
    "asset_name",
    "internal_name",
    "display_name",
    "public_name",
    "title",
];

pub const VERSION_FIELDS: &[&str] = &["version_id", "version", "asset_version_id"];

pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.as_object()?.get(*key)?;
        if current.is_null() {
            return None;
        }
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

pub fn lookup_or<'a>(value: &'a Value, path: &[&str], default: &'a Value) -> &'a Value {
    lookup(value, path).unwrap_or(default)
}

pub fn has(value: &Value, key: &str) -> bool {
    lookup(value, &[key]).is_some()
}

pub fn int_at(value: &Value, path: &[&str]) -> Option<i64> {
    lookup(value, path).and_then(as_int)
}

pub fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    lookup(value, path).and_then(as_text)
}

pub fn first_present(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(text) = text_at(value, &[key]) {
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

pub fn version_of(value: &Value) -> Option<String> {
    first_present(value, VERSION_FIELDS)
}

pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|v| i64::try_from(v).ok())),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

pub fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Text form of a scalar. Objects resolve through a nested `value` or `name` the way the
/// catalog and tier payloads wrap their labels.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => {
            for key in ["value", "name"] {
                if let Some(Value::String(s)) = map.get(key) {
                    return Some(s.trim().to_string());
                }
            }
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_short_circuits_on_absence_and_null() {
        let v = json!({"a": {"b": {"c": 3}, "n": null}, "s": "x"});
        assert_eq!(lookup(&v, &["a", "b", "c"]), Some(&json!(3)));
        assert_eq!(lookup(&v, &["a", "missing", "c"]), None);
        assert_eq!(lookup(&v, &["a", "n"]), None);
        assert_eq!(lookup(&v, &["a", "n", "deeper"]), None);
        assert_eq!(lookup(&v, &["s", "deeper"]), None);
        assert_eq!(lookup_or(&v, &["nope"], &json!(0)), &json!(0));
    }

    #[test]
    fn first_present_skips_empty_names() {
        let v = json!({"name": "", "public_name": "Recharge"});
        assert_eq!(first_present(&v, NAME_FIELDS).as_deref(), Some("Recharge"));
        assert_eq!(version_of(&json!({"version": "v2"})).as_deref(), Some("v2"));
    }

    #[test]
    fn text_unwraps_value_objects() {
        assert_eq!(as_text(&json!({"value": "Killjoy"})).as_deref(), Some("Killjoy"));
        assert_eq!(as_int(&json!("42")), Some(42));
        assert_eq!(as_float(&json!("0.5")), Some(0.5));
    }
}
