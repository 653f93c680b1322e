//! Person DTOs and lookup/filter helpers.
//!
//! # Design
//! Callers fill in `NewPerson` / `PersonUpdate`; those convert into the wire
//! payloads `SignupPayload` / `UpdatePayload`. Creation mirrors the signup
//! helper's shape (a `person` object next to `add_tags`) and always sends
//! every field. Updates send only what was set, so a PUT never blanks a
//! field the caller did not mention.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

/// Identifier namespace the service uses for its own ids.
pub const ID_PREFIX: &str = "action_network:";

/// Field searched by `PersonLookup::email`.
pub const EMAIL_FIELD: &str = "email_address";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl EmailAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            primary: None,
            status: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostalAddress {
    #[serde(default)]
    pub address_lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// Input for `ActionNetworkClient::create_person`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPerson {
    /// First entry is the person's primary address.
    pub emails: Vec<String>,
    pub given_name: String,
    pub family_name: String,
    pub address_lines: Vec<String>,
    pub locality: String,
    pub region: String,
    pub country: String,
    pub postal_code: String,
    pub tags: Vec<String>,
    pub custom_fields: Map<String, Value>,
}

impl NewPerson {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            emails: vec![email.into()],
            ..Self::default()
        }
    }

    pub fn given_name(mut self, name: impl Into<String>) -> Self {
        self.given_name = name.into();
        self
    }

    pub fn family_name(mut self, name: impl Into<String>) -> Self {
        self.family_name = name.into();
        self
    }

    pub fn address_line(mut self, line: impl Into<String>) -> Self {
        self.address_lines.push(line.into());
        self
    }

    pub fn locality(mut self, city: impl Into<String>) -> Self {
        self.locality = city.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    pub fn postal_code(mut self, code: impl Into<String>) -> Self {
        self.postal_code = code.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn custom_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_fields.insert(key.into(), value.into());
        self
    }

    pub fn payload(&self) -> SignupPayload {
        SignupPayload {
            person: SignupPerson {
                family_name: self.family_name.clone(),
                given_name: self.given_name.clone(),
                postal_addresses: vec![PostalAddress {
                    address_lines: self.address_lines.clone(),
                    locality: Some(self.locality.clone()),
                    region: Some(self.region.clone()),
                    country: Some(self.country.clone()),
                    postal_code: Some(self.postal_code.clone()),
                }],
                email_addresses: self.emails.iter().map(EmailAddress::new).collect(),
                custom_fields: self.custom_fields.clone(),
            },
            add_tags: self.tags.clone(),
        }
    }
}

/// Body of a person signup POST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupPayload {
    pub person: SignupPerson,
    pub add_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupPerson {
    pub family_name: String,
    pub given_name: String,
    pub postal_addresses: Vec<PostalAddress>,
    pub email_addresses: Vec<EmailAddress>,
    pub custom_fields: Map<String, Value>,
}

/// Input for `ActionNetworkClient::update_person`. Unset fields are left
/// untouched on the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonUpdate {
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub address_lines: Vec<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub tags: Vec<String>,
    pub custom_fields: Map<String, Value>,
}

impl PersonUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn given_name(mut self, name: impl Into<String>) -> Self {
        self.given_name = Some(name.into());
        self
    }

    pub fn family_name(mut self, name: impl Into<String>) -> Self {
        self.family_name = Some(name.into());
        self
    }

    pub fn address_line(mut self, line: impl Into<String>) -> Self {
        self.address_lines.push(line.into());
        self
    }

    pub fn locality(mut self, city: impl Into<String>) -> Self {
        self.locality = Some(city.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn postal_code(mut self, code: impl Into<String>) -> Self {
        self.postal_code = Some(code.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn custom_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_fields.insert(key.into(), value.into());
        self
    }

    fn has_address(&self) -> bool {
        !self.address_lines.is_empty()
            || self.locality.is_some()
            || self.region.is_some()
            || self.country.is_some()
            || self.postal_code.is_some()
    }

    pub fn payload(&self) -> UpdatePayload {
        let postal_addresses = if self.has_address() {
            vec![PostalAddress {
                address_lines: self.address_lines.clone(),
                locality: self.locality.clone(),
                region: self.region.clone(),
                country: self.country.clone(),
                postal_code: self.postal_code.clone(),
            }]
        } else {
            Vec::new()
        };
        UpdatePayload {
            family_name: self.family_name.clone(),
            given_name: self.given_name.clone(),
            postal_addresses,
            email_addresses: self.email.iter().map(EmailAddress::new).collect(),
            add_tags: self.tags.clone(),
            custom_fields: self.custom_fields.clone(),
        }
    }
}

/// Body of a person PUT.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub postal_addresses: Vec<PostalAddress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom_fields: Map<String, Value>,
}

/// Read model for a person record returned by the service. Fields the
/// client does not model are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub identifiers: Vec<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub postal_addresses: Vec<PostalAddress>,
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
    #[serde(rename = "_links", default)]
    pub links: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Person {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// The service's own id, with the `action_network:` namespace removed.
    pub fn id(&self) -> Option<&str> {
        self.identifiers
            .iter()
            .find_map(|ident| ident.strip_prefix(ID_PREFIX))
    }

    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses
            .iter()
            .find(|e| e.primary == Some(true))
            .or_else(|| self.email_addresses.first())
            .map(|e| e.address.as_str())
    }
}

/// How `get_person` finds its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonLookup {
    Id(String),
    Search { field: String, value: String },
}

impl PersonLookup {
    pub fn id(id: impl Into<String>) -> Self {
        PersonLookup::Id(id.into())
    }

    pub fn email(address: impl Into<String>) -> Self {
        Self::search(EMAIL_FIELD, address)
    }

    pub fn search(field: impl Into<String>, value: impl Into<String>) -> Self {
        PersonLookup::Search {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Comparison operators understood by the service's `filter` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Lt,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterOp::Eq => "eq",
            FilterOp::Gt => "gt",
            FilterOp::Lt => "lt",
        })
    }
}

impl std::str::FromStr for FilterOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Ok(FilterOp::Eq),
            "gt" => Ok(FilterOp::Gt),
            "lt" => Ok(FilterOp::Lt),
            other => Err(format!("unsupported filter operator: {other}")),
        }
    }
}

/// Render `<field> <op> '<term>'`. Quotes inside `term` are doubled.
pub fn filter_expression(field: &str, op: FilterOp, term: &str) -> String {
    format!("{field} {op} '{}'", term.replace('\'', "''"))
}
