//! Field-level cleansing passes applied while standardizing.

use std::sync::LazyLock;

use regex::Regex;

/// Read a field as trimmed text. Numbers are stringified; null, empty and
/// whitespace-only values become `None`.
pub(crate) fn text(value: Option<&serde_json::Value>) -> Option<String> {
    let s = match value? {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    static WS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
    WS_RE.replace_all(s.trim(), " ").into_owned()
}

/// Instructions are collapsed to a single line.
pub(crate) fn instructions(value: Option<&serde_json::Value>) -> String {
    text(value)
        .map(|s| collapse_whitespace(&s))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_trims_and_drops_empty() {
        assert_eq!(text(Some(&json!("  Highball glass "))), Some("Highball glass".into()));
        assert_eq!(text(Some(&json!("   "))), None);
        assert_eq!(text(Some(&json!(null))), None);
        assert_eq!(text(Some(&json!(11000))), Some("11000".into()));
        assert_eq!(text(None), None);
    }

    #[test]
    fn instructions_are_single_line() {
        let raw = json!("Muddle mint.\r\n\r\nAdd  rum.\tStir.");
        assert_eq!(instructions(Some(&raw)), "Muddle mint. Add rum. Stir.");
    }
}
