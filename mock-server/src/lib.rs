use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const TOKEN_HEADER: &str = "OSDI-API-Token";
pub const DEFAULT_TOKEN: &str = "test-token";
pub const MOTD: &str = "Welcome to the mock Action Network API";

#[derive(Clone, Debug)]
pub struct MockConfig {
    pub api_token: String,
    /// Absolute API root, e.g. `http://127.0.0.1:3000/api/v2`.
    pub base_url: String,
    pub page_size: usize,
    /// Calls per second before answering 429. `None` disables the quota.
    pub calls_per_second: Option<usize>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            api_token: DEFAULT_TOKEN.to_string(),
            base_url: "http://localhost/api/v2".to_string(),
            page_size: 25,
            calls_per_second: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmailAddress {
    pub address: String,
    pub primary: bool,
    pub status: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PostalAddress {
    #[serde(default)]
    pub address_lines: Vec<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

impl PostalAddress {
    fn is_blank(&self) -> bool {
        let blank = |f: &Option<String>| f.as_deref().map_or(true, str::is_empty);
        self.address_lines.iter().all(|l| l.is_empty())
            && blank(&self.locality)
            && blank(&self.region)
            && blank(&self.country)
            && blank(&self.postal_code)
    }
}

#[derive(Clone, Debug)]
pub struct Person {
    pub id: Uuid,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email_addresses: Vec<EmailAddress>,
    pub postal_addresses: Vec<PostalAddress>,
    pub custom_fields: Map<String, Value>,
    pub tags: Vec<String>,
}

impl Person {
    fn render(&self, base: &str) -> Value {
        json!({
            "identifiers": [format!("action_network:{}", self.id)],
            "given_name": self.given_name,
            "family_name": self.family_name,
            "email_addresses": self.email_addresses,
            "postal_addresses": self.postal_addresses,
            "custom_fields": self.custom_fields,
            "_links": {
                "self": { "href": format!("{base}/people/{}", self.id) },
                "osdi:taggings": { "href": format!("{base}/people/{}/taggings", self.id) }
            }
        })
    }

    fn primary_email(&self) -> Option<&str> {
        self.email_addresses.first().map(|e| e.address.as_str())
    }

    fn apply(&mut self, input: PersonInput, add_tags: Vec<String>) {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        if let Some(name) = non_empty(input.given_name) {
            self.given_name = Some(name);
        }
        if let Some(name) = non_empty(input.family_name) {
            self.family_name = Some(name);
        }
        if let Some(email) = input.email_addresses.into_iter().next() {
            match self.email_addresses.first_mut() {
                Some(existing) => existing.address = email.address,
                None => self.email_addresses.push(subscribed(email.address)),
            }
        }
        if let Some(address) = input.postal_addresses.into_iter().find(|a| !a.is_blank()) {
            self.postal_addresses = vec![address];
        }
        self.custom_fields.extend(input.custom_fields);
        for tag in add_tags {
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
    }
}

fn subscribed(address: String) -> EmailAddress {
    EmailAddress {
        address,
        primary: true,
        status: "subscribed".to_string(),
    }
}

#[derive(Deserialize, Default)]
pub struct PersonInput {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailInput>,
    #[serde(default)]
    pub postal_addresses: Vec<PostalAddress>,
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct EmailInput {
    pub address: String,
}

#[derive(Deserialize)]
pub struct Signup {
    pub person: PersonInput,
    #[serde(default)]
    pub add_tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct PersonPut {
    #[serde(flatten)]
    pub person: PersonInput,
    #[serde(default)]
    pub add_tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<usize>,
    pub filter: Option<String>,
}

#[derive(Default)]
pub struct Db {
    pub people: Vec<Person>,
    pub tags: Vec<String>,
}

pub struct AppState {
    pub config: MockConfig,
    pub db: RwLock<Db>,
    calls: Mutex<VecDeque<Instant>>,
}

pub type Shared = Arc<AppState>;

pub fn app(config: MockConfig) -> Router {
    app_with_db(config, Db::default())
}

pub fn app_with_db(config: MockConfig, db: Db) -> Router {
    let state: Shared = Arc::new(AppState {
        config,
        db: RwLock::new(db),
        calls: Mutex::new(VecDeque::new()),
    });
    Router::new()
        .route("/api/v2", get(root))
        .route("/api/v2/", get(root))
        .route("/api/v2/people", get(list_people).post(signup))
        .route("/api/v2/people/", get(list_people).post(signup))
        .route("/api/v2/people/{id}", get(get_person).put(update_person))
        .route("/api/v2/tags", get(list_tags))
        .layer(middleware::from_fn_with_state(state.clone(), guard))
        .with_state(state)
}

pub async fn run(listener: TcpListener, api_token: &str) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    let config = MockConfig {
        api_token: api_token.to_string(),
        base_url: format!("http://{addr}/api/v2"),
        ..MockConfig::default()
    };
    serve(listener, config).await
}

pub async fn serve(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app(config)).await
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Token check plus the optional per-second quota.
async fn guard(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if token != Some(state.config.api_token.as_str()) {
        return error(StatusCode::UNAUTHORIZED, "API Key invalid or not present");
    }

    if let Some(limit) = state.config.calls_per_second {
        let now = Instant::now();
        let mut calls = state.calls.lock().unwrap_or_else(|e| e.into_inner());
        while calls
            .front()
            .is_some_and(|&t| now.duration_since(t) >= Duration::from_secs(1))
        {
            calls.pop_front();
        }
        if calls.len() >= limit {
            return error(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded");
        }
        calls.push_back(now);
    }

    next.run(request).await
}

async fn root(State(state): State<Shared>) -> Json<Value> {
    let base = &state.config.base_url;
    Json(json!({
        "motd": MOTD,
        "max_page_size": state.config.page_size,
        "vendor_name": "Mock",
        "_links": {
            "self": { "href": base },
            "curies": [{ "name": "osdi", "href": format!("{base}/docs/{{rel}}"), "templated": true }],
            "osdi:people": { "href": format!("{base}/people") },
            "osdi:tags": { "href": format!("{base}/tags") },
            "docs": { "href": format!("{base}/docs") }
        }
    }))
}

/// One HAL page of `items`, linking to the next page while there is one.
fn paginate(
    config: &MockConfig,
    resource: &str,
    items: Vec<Value>,
    page: usize,
    filter: Option<&str>,
) -> Value {
    let base = &config.base_url;
    let size = config.page_size.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(size).max(1);
    let page = page.max(1);

    let page_url = |p: usize| {
        let mut url = format!("{base}/{resource}?page={p}");
        if let Some(filter) = filter {
            url.push_str("&filter=");
            url.push_str(&urlencoding::encode(filter));
        }
        url
    };

    let slice: Vec<Value> = items.into_iter().skip((page - 1) * size).take(size).collect();
    let mut links = json!({ "self": { "href": page_url(page) } });
    if page < total_pages {
        links["next"] = json!({ "href": page_url(page + 1) });
    }
    if page > 1 {
        links["previous"] = json!({ "href": page_url(page - 1) });
    }
    json!({
        "total_pages": total_pages,
        "per_page": size,
        "page": page,
        "total_records": total,
        "_links": links,
        "_embedded": { format!("osdi:{resource}"): slice }
    })
}

/// Parse `<field> eq '<value>'`.
fn parse_filter(filter: &str) -> Result<(String, String), String> {
    let mut parts = filter.trim().splitn(3, ' ');
    let (Some(field), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("Could not parse filter: {filter}"));
    };
    if !op.eq_ignore_ascii_case("eq") {
        return Err(format!("Filter operator not supported: {op}"));
    }
    let value = value
        .trim()
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .ok_or_else(|| format!("Filter value must be quoted: {value}"))?;
    Ok((field.to_string(), value.replace("''", "'")))
}

const FILTER_FIELDS: [&str; 3] = ["email_address", "given_name", "family_name"];

fn validate_field(field: &str) -> Result<(), String> {
    if FILTER_FIELDS.contains(&field) {
        Ok(())
    } else {
        Err(format!("Filter field not supported: {field}"))
    }
}

fn matches(person: &Person, field: &str, value: &str) -> Result<bool, String> {
    validate_field(field)?;
    Ok(match field {
        "email_address" => person
            .email_addresses
            .iter()
            .any(|e| e.address.eq_ignore_ascii_case(value)),
        "given_name" => person.given_name.as_deref() == Some(value),
        _ => person.family_name.as_deref() == Some(value),
    })
}

async fn list_people(State(state): State<Shared>, Query(params): Query<ListParams>) -> Response {
    let db = state.db.read().await;
    let base = &state.config.base_url;

    let mut selected = Vec::new();
    if let Some(filter) = params.filter.as_deref() {
        let (field, value) = match parse_filter(filter) {
            Ok(parsed) => parsed,
            Err(msg) => return error(StatusCode::BAD_REQUEST, msg),
        };
        if let Err(msg) = validate_field(&field) {
            return error(StatusCode::BAD_REQUEST, msg);
        }
        for person in &db.people {
            match matches(person, &field, &value) {
                Ok(true) => selected.push(person.render(base)),
                Ok(false) => {}
                Err(msg) => return error(StatusCode::BAD_REQUEST, msg),
            }
        }
    } else {
        selected = db.people.iter().map(|p| p.render(base)).collect();
    }

    let page = paginate(
        &state.config,
        "people",
        selected,
        params.page.unwrap_or(1),
        params.filter.as_deref(),
    );
    Json(page).into_response()
}

async fn list_tags(State(state): State<Shared>, Query(params): Query<ListParams>) -> Response {
    let db = state.db.read().await;
    let base = &state.config.base_url;
    let tags = db
        .tags
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "_links": { "self": { "href": format!("{base}/tags/{}", urlencoding::encode(name)) } }
            })
        })
        .collect();
    Json(paginate(&state.config, "tags", tags, params.page.unwrap_or(1), None)).into_response()
}

/// Signup helper: merge into the person with the same email, or create one.
async fn signup(State(state): State<Shared>, Json(input): Json<Signup>) -> Response {
    let Some(email) = input
        .person
        .email_addresses
        .first()
        .map(|e| e.address.clone())
        .filter(|a| !a.is_empty())
    else {
        return error(StatusCode::BAD_REQUEST, "An email address is required");
    };

    let mut db = state.db.write().await;
    record_tags(&mut db.tags, &input.add_tags);

    let existing = db.people.iter().position(|p| {
        p.primary_email()
            .is_some_and(|a| a.eq_ignore_ascii_case(&email))
    });
    let (status, index) = match existing {
        Some(index) => (StatusCode::OK, index),
        None => {
            db.people.push(Person {
                id: Uuid::new_v4(),
                given_name: None,
                family_name: None,
                email_addresses: Vec::new(),
                postal_addresses: Vec::new(),
                custom_fields: Map::new(),
                tags: Vec::new(),
            });
            (StatusCode::CREATED, db.people.len() - 1)
        }
    };
    let person = &mut db.people[index];
    person.apply(input.person, input.add_tags);
    info!(id = %person.id, %email, "person signup");
    (status, Json(person.render(&state.config.base_url))).into_response()
}

async fn get_person(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let db = state.db.read().await;
    match db.people.iter().find(|p| p.id.to_string() == id) {
        Some(person) => Json(person.render(&state.config.base_url)).into_response(),
        None => error(StatusCode::NOT_FOUND, format!("Couldn't find person with id {id}")),
    }
}

async fn update_person(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(input): Json<PersonPut>,
) -> Response {
    let mut guard = state.db.write().await;
    let db = &mut *guard;
    let Some(person) = db.people.iter_mut().find(|p| p.id.to_string() == id) else {
        return error(StatusCode::NOT_FOUND, format!("Couldn't find person with id {id}"));
    };
    record_tags(&mut db.tags, &input.add_tags);
    person.apply(input.person, input.add_tags);
    Json(person.render(&state.config.base_url)).into_response()
}

fn record_tags(known: &mut Vec<String>, added: &[String]) {
    for tag in added {
        if !known.contains(tag) {
            known.push(tag.clone());
        }
    }
}
