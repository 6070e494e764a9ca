use std::collections::BTreeMap;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::properties::Properties;

pub const DEFAULT_CONFIG_PATH: &str = "amizone.toml";
pub const DEFAULT_PROPERTIES_PATH: &str = "local.properties";

// Realtime defaults
pub const DEFAULT_TOPIC: &str = "ami_zone_channel";
pub const DEFAULT_EVENT: &str = "my_event";
pub const DEFAULT_GREETING: &str = "HuHu Android";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 25;
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 10_000;

// Query defaults
pub const DEFAULT_SCHEMA: &str = "ami_zone";
pub const DEFAULT_TABLE: &str = "shop_product";
pub const DEFAULT_COLUMNS: &str = "id,name,category:shop_category(*),unit,price,vat";
pub const DEFAULT_QUERY_LIMIT: usize = 1;

/// Flat environment keys shared with the Android build's `local.properties`.
pub const CREDENTIAL_KEYS: [&str; 9] = [
    "supabase_url",
    "supabase_anon_key",
    "supabase_db_port",
    "supabase_db_database",
    "supabase_db_driver",
    "supabase_db_user",
    "supabase_db_password",
    "supabase_user_email",
    "supabase_user_password",
];

/// Top-level config: defaults < amizone.toml < local.properties < env.
///
/// Built once at startup and passed by reference to every command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmizoneConfig {
    #[serde(flatten)]
    pub supabase: SupabaseCredentials,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

/// Project credentials. Every value is an opaque string; nothing is
/// validated here; a missing value shows up as a connection failure later.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseCredentials {
    /// Project host without scheme, e.g. `abcd.supabase.co`.
    #[serde(rename = "supabase_url", deserialize_with = "opaque")]
    pub url: String,
    #[serde(rename = "supabase_anon_key", deserialize_with = "opaque")]
    pub anon_key: String,
    #[serde(rename = "supabase_db_port", deserialize_with = "opaque")]
    pub db_port: String,
    #[serde(rename = "supabase_db_database", deserialize_with = "opaque")]
    pub db_database: String,
    /// Carried for parity with the Android build; the Postgres client picks its own driver.
    #[serde(rename = "supabase_db_driver", deserialize_with = "opaque")]
    pub db_driver: String,
    #[serde(rename = "supabase_db_user", deserialize_with = "opaque")]
    pub db_user: String,
    #[serde(rename = "supabase_db_password", deserialize_with = "opaque")]
    pub db_password: String,
    #[serde(rename = "supabase_user_email", deserialize_with = "opaque")]
    pub user_email: String,
    #[serde(rename = "supabase_user_password", deserialize_with = "opaque")]
    pub user_password: String,
}

impl SupabaseCredentials {
    /// Base URL for the REST and auth endpoints.
    pub fn http_url(&self) -> String {
        format!("https://{}", self.url)
    }

    /// Realtime websocket endpoint (Phoenix protocol v1). The realtime
    /// client appends the `apikey` parameter itself.
    pub fn realtime_url(&self) -> String {
        format!("wss://{}/realtime/v1/websocket?vsn=1.0.0", self.url)
    }

    /// Direct database connection string. Bypasses row-level security,
    /// so never ship it in a client app.
    pub fn postgres_url(&self) -> String {
        format!(
            "postgresql://{}:{}@db.{}:{}/{}",
            self.db_user, self.db_password, self.url, self.db_port, self.db_database
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Channel name without the `realtime:` wire prefix.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Broadcast event name used for both sending and receiving.
    #[serde(default = "default_event")]
    pub event: String,
    /// Text placed in front of the key in each outgoing `msg`.
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            event: default_event(),
            greeting: default_greeting(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_table")]
    pub table: String,
    /// PostgREST `select` expression, embedded resources included.
    #[serde(default = "default_columns")]
    pub columns: String,
    /// How many products the REST demo prints.
    #[serde(default = "default_query_limit")]
    pub limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            table: default_table(),
            columns: default_columns(),
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}
fn default_event() -> String {
    DEFAULT_EVENT.to_string()
}
fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_heartbeat_interval_secs() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_SECS
}
fn default_join_timeout_ms() -> u64 {
    DEFAULT_JOIN_TIMEOUT_MS
}
fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}
fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}
fn default_columns() -> String {
    DEFAULT_COLUMNS.to_string()
}
fn default_query_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

/// Accept strings, numbers and booleans alike and keep their text.
///
/// Env and TOML providers type-guess values, so a password like `12345`
/// would otherwise arrive as an integer.
fn opaque<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Opaque {
        Text(String),
        Signed(i64),
        Unsigned(u64),
        Float(f64),
        Flag(bool),
    }

    Ok(match Opaque::deserialize(deserializer)? {
        Opaque::Text(s) => s,
        Opaque::Signed(n) => n.to_string(),
        Opaque::Unsigned(n) => n.to_string(),
        Opaque::Float(n) => n.to_string(),
        Opaque::Flag(b) => b.to_string(),
    })
}

/// Where [`AmizoneConfig::load`] reads from.
#[derive(Debug, Clone)]
pub struct ConfigSources {
    pub config_path: String,
    pub properties_path: String,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            properties_path: DEFAULT_PROPERTIES_PATH.to_string(),
        }
    }
}

impl AmizoneConfig {
    /// Load config from the TOML file, the properties file and the environment.
    ///
    /// Later sources win:
    ///   1. amizone.toml
    ///   2. local.properties
    ///   3. raw `supabase_*` env vars (case-insensitive)
    ///   4. `AMIZONE_REALTIME__*` / `AMIZONE_QUERY__*` env vars
    pub fn load(sources: &ConfigSources) -> crate::error::Result<Self> {
        debug!(config = %sources.config_path, properties = %sources.properties_path, "loading config");
        let figment = Figment::new()
            .merge(Toml::file(&sources.config_path))
            .merge(Properties::file(&sources.properties_path))
            .merge(Serialized::defaults(credential_env(std::env::vars())))
            .merge(Env::prefixed("AMIZONE_").split("__"));

        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> crate::error::Result<Self> {
        Ok(figment.extract()?)
    }
}

/// Pick the `supabase_*` credentials out of an environment, names matched
/// case-insensitively.
///
/// figment's `Env` provider parses values (`007` becomes `7`), so the raw
/// text is merged through `Serialized` instead.
fn credential_env<I>(vars: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| {
            let name = name.to_ascii_lowercase();
            CREDENTIAL_KEYS
                .contains(&name.as_str())
                .then_some((name, value))
        })
        .collect()
}
