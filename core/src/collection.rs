//! Helpers for reading HAL collection pages.

use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::links::OSDI_PREFIX;

/// Key under `_embedded` that holds a resource's items, e.g. `osdi:people`.
pub fn embedded_key(resource: &str) -> String {
    let name = resource.strip_prefix(OSDI_PREFIX).unwrap_or(resource);
    format!("{OSDI_PREFIX}{name}")
}

/// Items embedded in one page, in server order.
pub fn embedded_items(page: &Value, resource: &str) -> Result<Vec<Value>> {
    let key = embedded_key(resource);
    page.get("_embedded")
        .and_then(|embedded| embedded.get(&key))
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| ApiError::MissingField(format!("_embedded.{key}")))
}

/// `_links.next.href`, if the server sent one.
pub fn next_link(page: &Value) -> Option<&str> {
    page.get("_links")?.get("next")?.get("href")?.as_str()
}

/// The `error` member the service puts in failed responses. Empty or falsy
/// values (`null`, `false`, `0`, `""`, `[]`, `{}`) do not count.
pub fn server_error(page: &Value) -> Option<&Value> {
    page.get("error").filter(|e| is_truthy(e))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// `<url>?filter=<escaped filter>`.
pub fn filtered_url(url: &str, filter: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}filter={}", urlencoding::encode(filter))
}
