//! The API root document and the link table lookup built on it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

/// Namespace prefix the service uses for its OSDI resources.
pub const OSDI_PREFIX: &str = "osdi:";

/// The self-describing document served at the API root.
///
/// `_links` is kept as raw JSON: most entries are `{ "href": ... }` but HAL
/// also puts arrays there (`curies`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootDocument {
    #[serde(rename = "_links", default)]
    pub links: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motd: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RootDocument {
    pub fn motd(&self) -> &str {
        self.motd.as_deref().unwrap_or_default()
    }

    /// Resolve a short resource name to its URL, trying `name` and then
    /// `osdi:name`.
    pub fn resolve(&self, name: &str) -> Result<&str> {
        self.href(name)
            .or_else(|| self.href(&format!("{OSDI_PREFIX}{name}")))
            .ok_or_else(|| ApiError::UnknownResource(name.to_string()))
    }

    /// API base URL advertised by `_links.self`, always ending in `/`.
    pub fn base_url(&self, fallback: &str) -> String {
        let base = self.href("self").unwrap_or(fallback);
        if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        }
    }

    /// Short names of every linked resource, without the `osdi:` prefix.
    pub fn resource_names(&self) -> Vec<&str> {
        self.links
            .iter()
            .filter(|(_, v)| v.get("href").is_some())
            .map(|(k, _)| k.strip_prefix(OSDI_PREFIX).unwrap_or(k))
            .collect()
    }

    fn href(&self, key: &str) -> Option<&str> {
        self.links.get(key)?.get("href")?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root() -> RootDocument {
        serde_json::from_value(json!({
            "motd": "Welcome",
            "max_page_size": 25,
            "_links": {
                "self": { "href": "https://example.org/api/v2" },
                "curies": [{ "name": "osdi", "href": "https://example.org/docs/v2/{rel}", "templated": true }],
                "osdi:people": { "href": "https://example.org/api/v2/people" },
                "docs": { "href": "https://example.org/docs/v2/" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn resolves_plain_name() {
        assert_eq!(root().resolve("docs").unwrap(), "https://example.org/docs/v2/");
    }

    #[test]
    fn falls_back_to_osdi_prefix() {
        assert_eq!(
            root().resolve("people").unwrap(),
            "https://example.org/api/v2/people"
        );
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = root().resolve("events").unwrap_err();
        assert!(matches!(err, ApiError::UnknownResource(ref name) if name == "events"));
    }

    #[test]
    fn link_without_href_does_not_resolve() {
        assert!(root().resolve("curies").is_err());
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        assert_eq!(root().base_url("unused"), "https://example.org/api/v2/");
        assert_eq!(
            RootDocument::default().base_url("https://fallback/api/v2/"),
            "https://fallback/api/v2/"
        );
    }

    #[test]
    fn keeps_unknown_fields_and_motd() {
        let doc = root();
        assert_eq!(doc.motd(), "Welcome");
        assert_eq!(doc.extra["max_page_size"], 25);
        assert_eq!(RootDocument::default().motd(), "");
    }

    #[test]
    fn resource_names_strip_namespace() {
        let doc = root();
        let mut names = doc.resource_names();
        names.sort();
        assert_eq!(names, vec!["docs", "people", "self"]);
    }
}
