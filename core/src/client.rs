//! Blocking client for the Action Network OSDI API.
//!
//! # Design
//! `ActionNetworkClient` fetches the root document once at construction and
//! resolves every resource through its link table. All outbound calls go
//! through one `Throttle`, so the 4-calls-per-second quota holds no matter
//! which helper issued them. Responses are returned as parsed JSON: the
//! service signals most failures inside the body, and callers decide how to
//! read them.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::collection::{embedded_items, filtered_url, next_link, server_error};
use crate::config::{ClientConfig, API_TOKEN_HEADER};
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::limiter::{Clock, SystemClock, Throttle};
use crate::links::RootDocument;
use crate::transport::UreqTransport;
use crate::types::{filter_expression, FilterOp, NewPerson, PersonLookup, PersonUpdate};

/// Client bound to one API token and one root document.
#[derive(Debug)]
pub struct ActionNetworkClient<T = UreqTransport> {
    config: ClientConfig,
    root: RootDocument,
    base_url: String,
    transport: T,
    throttle: Throttle,
}

impl ActionNetworkClient<UreqTransport> {
    /// Connect over HTTPS and load the root document.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ActionNetworkClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        Self::with_clock(config, transport, Box::new(SystemClock))
    }

    pub fn with_clock(config: ClientConfig, transport: T, clock: Box<dyn Clock>) -> Result<Self> {
        let throttle = Throttle::new(config.rate_limit.clone(), config.retry.clone(), clock);
        let mut client = Self {
            base_url: config.root_url.clone(),
            root: RootDocument::default(),
            config,
            transport,
            throttle,
        };
        client.refresh_config()?;
        info!(motd = client.motd(), "connected to {}", client.base_url);
        Ok(client)
    }

    /// Re-fetch the root document and replace the link table.
    pub fn refresh_config(&mut self) -> Result<()> {
        let request = self.build_request(HttpMethod::Get, &self.config.root_url, None);
        let response = self.throttle.send(&self.transport, &request)?;
        if !response.is_success() {
            return Err(ApiError::Http {
                status: response.status,
                body: response.body,
            });
        }
        let root: RootDocument = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(format!("root document: {e}")))?;
        self.base_url = root.base_url(&self.config.root_url);
        self.root = root;
        Ok(())
    }

    pub fn root(&self) -> &RootDocument {
        &self.root
    }

    pub fn motd(&self) -> &str {
        self.root.motd()
    }

    /// API base URL, ending in `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve a resource name (`people`, `tags`, ...) to its URL.
    pub fn resource_url(&self, resource: &str) -> Result<&str> {
        self.root.resolve(resource)
    }

    /// Issue one authenticated, throttled call and parse the JSON reply.
    pub fn request<K, V>(
        &self,
        method: HttpMethod,
        url: &str,
        params: &[(K, V)],
        body: Option<&Value>,
    ) -> Result<Value>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        let request = self.build_request(method, url, body).with_query(params);
        self.execute(&request)
    }

    /// GET a resource endpoint by name.
    pub fn get_resource<K, V>(&self, resource: &str, params: &[(K, V)]) -> Result<Value>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = self.resource_url(resource)?;
        self.request(HttpMethod::Get, url, params, None)
    }

    /// Fetch every item of a collection, following `next` links.
    ///
    /// When the first page comes back with an `error` member (typically an
    /// unsupported filter), the fetch is retried once without the filter.
    pub fn get_resource_list(&self, resource: &str, filter: Option<&str>) -> Result<Vec<Value>> {
        let unfiltered = self.resource_url(resource)?.to_string();
        let first = match filter {
            Some(filter) => filtered_url(&unfiltered, filter),
            None => unfiltered.clone(),
        };

        let mut page = self.get_json(&first)?;
        if let Some(error) = server_error(&page) {
            warn!(resource, %error, "server rejected collection request, retrying unfiltered");
            page = self.get_json(&unfiltered)?;
        }

        let mut items = Vec::new();
        let mut pages = 1;
        loop {
            items.extend(embedded_items(&page, resource)?);
            let Some(next) = next_link(&page).map(str::to_string) else {
                break;
            };
            if let Some(max) = self.config.max_pages {
                if pages >= max {
                    return Err(ApiError::PageLimitExceeded(max));
                }
            }
            debug!(resource, page = pages + 1, "following next link");
            page = self.get_json(&next)?;
            pages += 1;
        }
        Ok(items)
    }

    /// All items of `resource` where `field op 'term'` holds.
    pub fn search(&self, resource: &str, field: &str, op: FilterOp, term: &str) -> Result<Vec<Value>> {
        let filter = filter_expression(field, op, term);
        self.get_resource_list(resource, Some(&filter))
    }

    /// Look a person up by id or by a field search.
    ///
    /// The raw reply is returned: a single person record for `Id`, a
    /// collection page for `Search`.
    pub fn get_person(&self, lookup: &PersonLookup) -> Result<Value> {
        let url = match lookup {
            PersonLookup::Id(id) => self.person_url(id),
            PersonLookup::Search { field, value } => {
                let filter = filter_expression(field, FilterOp::Eq, value);
                filtered_url(&format!("{}people/", self.base_url), &filter)
            }
        };
        self.get_json(&url)
    }

    /// Create (or match and merge) a person through the signup helper.
    pub fn create_person(&self, person: &NewPerson) -> Result<Value> {
        let body = serde_json::to_string(&person.payload())
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        let url = format!("{}people/", self.base_url);
        let request = self.build_request(HttpMethod::Post, &url, Some(body));
        self.execute(&request)
    }

    /// Update the person with the given id. Only fields set on `update` are
    /// sent.
    pub fn update_person(&self, id: &str, update: &PersonUpdate) -> Result<Value> {
        let body = serde_json::to_string(&update.payload())
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        let url = self.person_url(id);
        let request = self.build_request(HttpMethod::Put, &url, Some(body));
        self.execute(&request)
    }

    fn person_url(&self, id: &str) -> String {
        format!("{}people/{}", self.base_url, urlencoding::encode(id))
    }

    fn get_json(&self, url: &str) -> Result<Value> {
        let request = self.build_request(HttpMethod::Get, url, None);
        self.execute(&request)
    }

    fn build_request(&self, method: HttpMethod, url: &str, body: Option<String>) -> HttpRequest {
        let request =
            HttpRequest::new(method, url).header(API_TOKEN_HEADER, self.config.api_token.as_str());
        match body {
            Some(body) => request.json_body(body),
            None => request,
        }
    }

    fn execute(&self, request: &HttpRequest) -> Result<Value> {
        let response = self.throttle.send(&self.transport, request)?;
        parse_body(response)
    }
}

/// JSON regardless of status; an empty body is `null`.
fn parse_body(response: HttpResponse) -> Result<Value> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(&response.body) {
        Ok(value) => Ok(value),
        Err(e) if response.is_success() => Err(ApiError::Deserialization(e.to_string())),
        Err(_) => Err(ApiError::Http {
            status: response.status,
            body: response.body,
        }),
    }
}
