//! Helpers for explicit optional-field update structs.

use serde::{Deserialize, Deserializer};

/// Deserialize a doubly-optional patch field.
///
/// Used with `#[serde(default, deserialize_with = "double_option")]`:
/// an absent field stays `None` (keep the current value), an explicit
/// `null` becomes `Some(None)` (clear it), and a value becomes
/// `Some(Some(v))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        note: Option<Option<String>>,
    }

    #[test]
    fn absent_null_and_value_are_distinct() {
        let p: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(p.note, None);

        let p: Patch = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(p.note, Some(None));

        let p: Patch = serde_json::from_str(r#"{"note": "x"}"#).unwrap();
        assert_eq!(p.note, Some(Some("x".to_string())));
    }
}
