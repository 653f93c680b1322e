//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port in a background tokio runtime,
//! then drives `ActionNetworkClient` over real HTTP with its default ureq
//! transport.

use std::time::Duration;

use actionnetwork_core::{
    ActionNetworkClient, ApiError, ClientConfig, FilterOp, NewPerson, Person, PersonLookup,
    PersonUpdate,
};
use mock_server::{MockConfig, DEFAULT_TOKEN, MOTD};

/// Serve a mock built from `config` and return its API root URL.
fn start_server(config: MockConfig) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let config = MockConfig {
        base_url: format!("http://{addr}/api/v2"),
        ..config
    };

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::serve(listener, config).await
        })
        .unwrap();
    });

    format!("http://{addr}/api/v2/")
}

/// Client with a quota generous enough that tests never wait.
fn connect(root_url: &str) -> ActionNetworkClient {
    let config = ClientConfig::new(DEFAULT_TOKEN)
        .root_url(root_url)
        .rate_limit(1_000, Duration::from_secs(1));
    ActionNetworkClient::connect(config).unwrap()
}

#[test]
fn person_lifecycle() {
    let root = start_server(MockConfig::default());
    let client = connect(&root);

    // Step 1: root document loaded.
    assert_eq!(client.motd(), MOTD);
    assert_eq!(client.base_url(), root);

    // Step 2: create a person.
    let created = client
        .create_person(
            &NewPerson::new("ada@example.com")
                .given_name("Ada")
                .family_name("Lovelace")
                .address_line("12 St James's Square")
                .locality("London")
                .country("GB")
                .tag("mathematicians")
                .custom_field("engine", "analytical"),
        )
        .unwrap();
    let person = Person::from_value(created).unwrap();
    assert_eq!(person.given_name.as_deref(), Some("Ada"));
    assert_eq!(person.primary_email(), Some("ada@example.com"));
    assert_eq!(person.custom_fields["engine"], "analytical");
    let id = person.id().unwrap().to_string();

    // Step 3: fetch by id.
    let fetched = client.get_person(&PersonLookup::id(&id)).unwrap();
    assert_eq!(fetched["family_name"], "Lovelace");
    assert_eq!(fetched["postal_addresses"][0]["locality"], "London");

    // Step 4: search by email returns a collection page.
    let page = client
        .get_person(&PersonLookup::email("ada@example.com"))
        .unwrap();
    let hits = page["_embedded"]["osdi:people"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["identifiers"][0], format!("action_network:{id}"));

    // Step 5: update one field; the rest stays.
    let updated = client
        .update_person(&id, &PersonUpdate::new().given_name("Augusta").tag("poets"))
        .unwrap();
    assert_eq!(updated["given_name"], "Augusta");
    assert_eq!(updated["family_name"], "Lovelace");

    // Step 6: both tags are now listed.
    let tags = client.get_resource_list("tags", None).unwrap();
    let names: Vec<&str> = tags.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["mathematicians", "poets"]);

    // Step 7: unknown id comes back as an error object, not a failure.
    let missing = client
        .get_person(&PersonLookup::id("00000000-0000-0000-0000-000000000000"))
        .unwrap();
    assert!(missing["error"].is_string());
}

#[test]
fn collection_follows_every_page() {
    let root = start_server(MockConfig {
        page_size: 2,
        ..MockConfig::default()
    });
    let client = connect(&root);
    for i in 0..5 {
        client
            .create_person(&NewPerson::new(format!("p{i}@example.com")).given_name(if i % 2 == 0 { "Even" } else { "Odd" }))
            .unwrap();
    }

    let people = client.get_resource_list("people", None).unwrap();
    let emails: Vec<&str> = people
        .iter()
        .map(|p| p["email_addresses"][0]["address"].as_str().unwrap())
        .collect();
    assert_eq!(
        emails,
        vec![
            "p0@example.com",
            "p1@example.com",
            "p2@example.com",
            "p3@example.com",
            "p4@example.com"
        ]
    );

    let evens = client
        .search("people", "given_name", FilterOp::Eq, "Even")
        .unwrap();
    assert_eq!(evens.len(), 3);
}

#[test]
fn unsupported_filter_falls_back_to_full_listing() {
    let root = start_server(MockConfig::default());
    let client = connect(&root);
    client.create_person(&NewPerson::new("a@example.com")).unwrap();
    client.create_person(&NewPerson::new("b@example.com")).unwrap();

    let people = client
        .get_resource_list("people", Some("city eq 'Paris'"))
        .unwrap();
    assert_eq!(people.len(), 2);
}

#[test]
fn page_guard_applies_over_http() {
    let root = start_server(MockConfig {
        page_size: 1,
        ..MockConfig::default()
    });
    let config = ClientConfig::new(DEFAULT_TOKEN)
        .root_url(&root)
        .rate_limit(1_000, Duration::from_secs(1))
        .max_pages(2);
    let client = ActionNetworkClient::connect(config).unwrap();
    for i in 0..3 {
        client.create_person(&NewPerson::new(format!("g{i}@example.com"))).unwrap();
    }
    let err = client.get_resource_list("people", None).unwrap_err();
    assert!(matches!(err, ApiError::PageLimitExceeded(2)));
}

#[test]
fn unknown_resource_is_reported() {
    let root = start_server(MockConfig::default());
    let client = connect(&root);
    let err = client.get_resource_list("events", None).unwrap_err();
    assert!(matches!(err, ApiError::UnknownResource(ref name) if name == "events"));
}

#[test]
fn bad_token_fails_to_connect() {
    let root = start_server(MockConfig::default());
    let config = ClientConfig::new("wrong-token").root_url(&root);
    let err = ActionNetworkClient::connect(config).unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 401, .. }));
}

#[test]
fn default_quota_keeps_server_happy() {
    let root = start_server(MockConfig {
        calls_per_second: Some(4),
        ..MockConfig::default()
    });
    let client = ActionNetworkClient::connect(ClientConfig::new(DEFAULT_TOKEN).root_url(&root)).unwrap();

    // Nine calls in total: the limiter has to spread them over two windows.
    for _ in 0..8 {
        let page = client.get_resource("people", &[("page", "1")]).unwrap();
        assert!(page.get("error").is_none(), "unexpected error: {page}");
    }
}
