//! Replay JSON fixtures from `tests/fixtures/` through the client.
//!
//! Each collection case lists the pages the server sends, the URLs the
//! client must request, and the items it must return. Comparing parsed JSON
//! (not raw strings) avoids false negatives from field ordering.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use actionnetwork_core::{
    ActionNetworkClient, ClientConfig, HttpMethod, HttpRequest, HttpResponse, NewPerson, Result,
    Transport,
};
use serde_json::Value;

const ROOT_URL: &str = "https://api.example.org/api/v2/";

/// Answers with the queued responses and remembers each request.
#[derive(Default)]
struct Replay {
    responses: RefCell<VecDeque<HttpResponse>>,
    sent: RefCell<Vec<HttpRequest>>,
}

impl Replay {
    fn push(&self, status: u16, body: &Value) {
        self.responses.borrow_mut().push_back(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        });
    }
}

impl Transport for Replay {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.sent.borrow_mut().push(request.clone());
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request to {}", request.url)))
    }
}

fn client<'a>(replay: &'a Replay, root: &Value) -> ActionNetworkClient<&'a Replay> {
    replay.push(200, root);
    let config = ClientConfig::new("fixture-token")
        .root_url(ROOT_URL)
        .rate_limit(1_000, Duration::from_secs(1));
    ActionNetworkClient::with_transport(config, replay).unwrap()
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[test]
fn collection_fixtures() {
    let raw = include_str!("fixtures/collections.json");
    let fixtures: Value = serde_json::from_str(raw).unwrap();

    for case in fixtures["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let replay = Replay::default();
        let client = client(&replay, &fixtures["root"]);
        for response in case["responses"].as_array().unwrap() {
            let status = response["status"].as_u64().unwrap() as u16;
            replay.push(status, &response["body"]);
        }

        let items = client
            .get_resource_list(case["resource"].as_str().unwrap(), case["filter"].as_str())
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(Value::Array(items), case["expected_items"], "{name}: items");

        let sent = replay.sent.borrow();
        let urls: Vec<&str> = sent[1..].iter().map(|r| r.url.as_str()).collect();
        let expected: Vec<&str> = case["expected_urls"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u.as_str().unwrap())
            .collect();
        assert_eq!(urls, expected, "{name}: urls");
        assert!(
            sent.iter().all(|r| r.method == HttpMethod::Get),
            "{name}: only GETs"
        );
        assert!(
            sent.iter()
                .all(|r| r.header_value("OSDI-API-Token") == Some("fixture-token")),
            "{name}: token on every request"
        );
    }
}

// ---------------------------------------------------------------------------
// Signup
// ---------------------------------------------------------------------------

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|a| a.iter().map(|v| v.as_str().unwrap().to_string()).collect())
        .unwrap_or_default()
}

fn text(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

#[test]
fn signup_fixtures() {
    let raw = include_str!("fixtures/signup.json");
    let fixtures: Value = serde_json::from_str(raw).unwrap();
    let root = serde_json::json!({
        "_links": { "self": { "href": "https://api.example.org/api/v2" } }
    });

    for case in fixtures["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let person = NewPerson {
            emails: vec![text(&input["email"])],
            given_name: text(&input["given_name"]),
            family_name: text(&input["family_name"]),
            address_lines: strings(&input["address_lines"]),
            locality: text(&input["locality"]),
            region: text(&input["region"]),
            country: text(&input["country"]),
            postal_code: text(&input["postal_code"]),
            tags: strings(&input["tags"]),
            custom_fields: input["custom_fields"].as_object().cloned().unwrap_or_default(),
        };

        let replay = Replay::default();
        let client = client(&replay, &root);
        replay.push(201, &serde_json::json!({ "identifiers": ["action_network:x"] }));
        client.create_person(&person).unwrap();

        let sent = replay.sent.borrow();
        let request = &sent[1];
        assert_eq!(request.method, HttpMethod::Post, "{name}: method");
        assert_eq!(request.url, "https://api.example.org/api/v2/people/", "{name}: url");
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, case["expected_body"], "{name}: body");
    }
}
