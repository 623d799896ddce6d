use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued tokens. Default: 168 (7 days).
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    /// Admin account created on first start. Also protected from deletion.
    #[serde(default = "default_bootstrap_admin_username")]
    pub bootstrap_admin_username: String,
    /// Password for the bootstrap admin. No account is seeded when unset.
    #[serde(default)]
    pub bootstrap_admin_password: Option<String>,
}

fn default_token_ttl_hours() -> i64 {
    168
}
fn default_bootstrap_admin_username() -> String {
    "admin".into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocodingConfig {
    /// Geocoding is skipped (every address unresolved) without a key.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_geocoding_endpoint() -> String {
    "https://maps.googleapis.com/maps/api/geocode/json".into()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_geocoding_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PropertyRecordsConfig {
    #[serde(default = "default_property_api_url")]
    pub api_url: String,
    /// Prefix the record's account id is appended to.
    #[serde(default = "default_property_link_base")]
    pub link_base: String,
    /// Only addresses located in this county are looked up. Unset: no gate.
    #[serde(default = "default_property_county")]
    pub county: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_property_api_url() -> String {
    "https://www.bcpao.us/api/records".into()
}
fn default_property_link_base() -> String {
    "https://www.bcpao.us/propertysearch/#/account/".into()
}
fn default_property_county() -> Option<String> {
    Some("BREVARD".into())
}

impl Default for PropertyRecordsConfig {
    fn default() -> Self {
        Self {
            api_url: default_property_api_url(),
            link_base: default_property_link_base(),
            county: default_property_county(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CountiesConfig {
    /// GeoJSON FeatureCollection of county boundaries.
    #[serde(default)]
    pub geojson_path: Option<PathBuf>,
    #[serde(default = "default_name_property")]
    pub name_property: String,
}

fn default_name_property() -> String {
    "NAME".into()
}

impl Default for CountiesConfig {
    fn default() -> Self {
        Self {
            geojson_path: None,
            name_property: default_name_property(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub property_records: PropertyRecordsConfig,
    #[serde(default)]
    pub counties: CountiesConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., FIELDBOOK__GEOCODING__API_KEY)
            .add_source(Environment::with_prefix("FIELDBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
