/// Quote a name for inclusion in a diagnostic, escaping it the way a JSON
/// string would be.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}
