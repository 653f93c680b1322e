//! `an`: command-line access to the Action Network API.
//!
//! # Usage
//!
//! ```text
//! an --token $ACTION_NETWORK_API_KEY motd
//! an list people --filter "given_name eq 'Ada'"
//! an person create --email ada@example.com --given-name Ada --tag volunteer
//! ```

use std::time::Duration;

use actionnetwork_core::{
    config::{API_KEY_ENV, DEFAULT_ROOT_URL, ROOT_URL_ENV},
    ActionNetworkClient, ClientConfig, FilterOp, NewPerson, PersonLookup, PersonUpdate,
};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "an", version, about = "Command-line client for the Action Network API")]
struct Cli {
    /// API token sent in the OSDI-API-Token header.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    token: String,

    /// URL of the API root document.
    #[arg(long, env = ROOT_URL_ENV, default_value = DEFAULT_ROOT_URL)]
    root_url: String,

    /// Stop paginating after this many pages.
    #[arg(long)]
    max_pages: Option<usize>,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the server's message of the day.
    Motd,
    /// List the resources advertised by the root document.
    Resources,
    /// Fetch every item of a collection.
    List {
        resource: String,
        #[arg(long)]
        filter: Option<String>,
    },
    /// GET a resource endpoint once.
    Get {
        resource: String,
        /// Query parameter as key=value; repeatable.
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },
    /// Fetch all items where `<field> <op> '<term>'`.
    Search {
        resource: String,
        field: String,
        /// One of eq, gt, lt.
        op: FilterOp,
        term: String,
    },
    /// Read, create and update people.
    #[command(subcommand)]
    Person(PersonCommand),
}

#[derive(Subcommand, Debug)]
enum PersonCommand {
    /// Look a person up by id or by a field search.
    Get {
        #[arg(long, conflicts_with = "value")]
        id: Option<String>,
        #[arg(long, default_value = "email_address")]
        search_by: String,
        #[arg(long)]
        value: Option<String>,
    },
    /// Create a person (or merge into the one with the same email).
    Create {
        #[arg(long)]
        email: String,
        #[command(flatten)]
        fields: PersonFields,
    },
    /// Update fields on an existing person.
    Update {
        id: String,
        #[arg(long)]
        email: Option<String>,
        #[command(flatten)]
        fields: PersonFields,
    },
}

#[derive(Args, Debug)]
struct PersonFields {
    #[arg(long)]
    given_name: Option<String>,
    #[arg(long)]
    family_name: Option<String>,
    /// Street address line; repeatable.
    #[arg(long = "address")]
    address_lines: Vec<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    postal_code: Option<String>,
    /// Tag to add; repeatable.
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Custom field as key=value; repeatable.
    #[arg(long = "custom", value_parser = parse_key_value)]
    custom_fields: Vec<(String, String)>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

impl PersonFields {
    fn new_person(self, email: String) -> NewPerson {
        NewPerson {
            emails: vec![email],
            given_name: self.given_name.unwrap_or_default(),
            family_name: self.family_name.unwrap_or_default(),
            address_lines: self.address_lines,
            locality: self.city.unwrap_or_default(),
            region: self.state.unwrap_or_default(),
            country: self.country.unwrap_or_default(),
            postal_code: self.postal_code.unwrap_or_default(),
            tags: self.tags,
            custom_fields: self
                .custom_fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        }
    }

    fn update(self, email: Option<String>) -> PersonUpdate {
        PersonUpdate {
            email,
            given_name: self.given_name,
            family_name: self.family_name,
            address_lines: self.address_lines,
            locality: self.city,
            region: self.state,
            country: self.country,
            postal_code: self.postal_code,
            tags: self.tags,
            custom_fields: self
                .custom_fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        }
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("formatting reply")?);
    Ok(())
}

/// Log filter from `directives` (normally `RUST_LOG`), `info` when empty.
fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

fn main() -> Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&directives))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::new(cli.token)
        .root_url(cli.root_url)
        .timeout(Duration::from_secs(cli.timeout));
    if let Some(max) = cli.max_pages {
        config = config.max_pages(max);
    }
    let client = ActionNetworkClient::connect(config).context("connecting to the API root")?;

    match cli.command {
        Command::Motd => println!("{}", client.motd()),
        Command::Resources => {
            for name in client.root().resource_names() {
                println!("{name}");
            }
        }
        Command::List { resource, filter } => {
            let items = client
                .get_resource_list(&resource, filter.as_deref())
                .with_context(|| format!("listing {resource}"))?;
            print_json(&Value::Array(items))?;
        }
        Command::Get { resource, params } => {
            let reply = client
                .get_resource(&resource, &params)
                .with_context(|| format!("fetching {resource}"))?;
            print_json(&reply)?;
        }
        Command::Search {
            resource,
            field,
            op,
            term,
        } => {
            let items = client
                .search(&resource, &field, op, &term)
                .with_context(|| format!("searching {resource}"))?;
            print_json(&Value::Array(items))?;
        }
        Command::Person(command) => {
            let reply = match command {
                PersonCommand::Get {
                    id,
                    search_by,
                    value,
                } => {
                    let lookup = match (id, value) {
                        (Some(id), _) => PersonLookup::Id(id),
                        (None, Some(value)) => PersonLookup::search(search_by, value),
                        (None, None) => return Err(anyhow!("pass --id or --value")),
                    };
                    client.get_person(&lookup)?
                }
                PersonCommand::Create { email, fields } => {
                    client.create_person(&fields.new_person(email))?
                }
                PersonCommand::Update { id, email, fields } => {
                    client.update_person(&id, &fields.update(email))?
                }
            };
            print_json(&reply)?;
        }
    }
    Ok(())
}
