use serde_json::Value;

/// Turn the untyped error half of a store envelope into a real error.
///
/// Absent (`None` or JSON null) means no failure. Otherwise the message is
/// resolved in priority order: a non-blank string `message` field, then a
/// non-blank string `details` field, then the pretty-printed serialization
/// of the whole value. A `message` that is present but not a string (or is
/// blank after trimming) does not count.
pub fn check_store_error(error: Option<&Value>) -> anyhow::Result<()> {
    let Some(value) = error else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }

    let string_field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let message = string_field("message")
        .or_else(|| string_field("details"))
        .unwrap_or_else(|| {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        });

    Err(anyhow::anyhow!(message))
}
