//! Lenient field deserializers for the loosely typed Weibo JSON.

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accept an id rendered either as a JSON string or a number.
pub fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected id, found {}", other))),
    }
}

pub fn id_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("id out of range: {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("non-numeric id: {}", s))),
        other => Err(D::Error::custom(format!("expected id, found {}", other))),
    }
}

/// Interaction counts arrive as numbers, or as display strings such as
/// `"100万+"` once they get large.
pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| D::Error::custom(format!("invalid count: {}", n))),
        Value::String(s) => parse_display_count(&s)
            .ok_or_else(|| D::Error::custom(format!("invalid count: {}", s))),
        Value::Null => Ok(0),
        other => Err(D::Error::custom(format!("expected count, found {}", other))),
    }
}

pub fn parse_display_count(raw: &str) -> Option<u64> {
    let trimmed = raw.trim().trim_end_matches('+');
    if trimmed.is_empty() {
        return Some(0);
    }

    let (number, multiplier) = if let Some(n) = trimmed.strip_suffix('万') {
        (n, 10_000.0)
    } else if let Some(n) = trimmed.strip_suffix('亿') {
        (n, 100_000_000.0)
    } else {
        (trimmed, 1.0)
    };

    let value: f64 = number.trim().parse().ok()?;
    if value < 0.0 || !value.is_finite() {
        return None;
    }
    Some((value * multiplier).round() as u64)
}
