//! Field-level decode fallbacks for API records.
//!
//! Used through `#[serde(default, deserialize_with = "...")]`: a missing field takes the
//! serde default, a `null` or mistyped one goes through these helpers. Only list members
//! that are not records at all get dropped, and every drop is logged.
use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use serde_json::Value;

/// `null` or a value of the wrong shape becomes `T::default()`.
pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_default())
}

/// `null` or a value of the wrong shape becomes `None`.
pub(crate) fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

/// Members that still fail to decode are skipped with a warning; `null` is an empty list.
pub(crate) fn members<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => {
            tracing::warn!(
                target: "decode",
                kind = std::any::type_name::<T>(),
                found = %json_kind(&other),
                "decode.list.dropped"
            );
            return Ok(Vec::new());
        }
    };

    let mut out = Vec::with_capacity(raw.len());
    for (index, item) in raw.into_iter().enumerate() {
        match serde_json::from_value(item) {
            Ok(member) => out.push(member),
            Err(e) => tracing::warn!(
                target: "decode",
                kind = std::any::type_name::<T>(),
                index,
                error = %e,
                "decode.member.dropped"
            ),
        }
    }
    Ok(out)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
