use std::net::SocketAddr;
use std::path::PathBuf;

use serde::de::DeserializeOwned;

use crate::error::ErrorKind;
use crate::Result;

pub static CONFIG_FILE: &'static str = "geogallery.toml";

/// Default upload size limit, 5 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Application configuration.
///
/// # Sources
///
/// Values are read from `geogallery.toml`, `secret.geogallery.toml` and the
/// environment, in that order, later sources overriding earlier ones. Both
/// files are optional. Environment variables map onto keys directly, e.g.
/// `MAX_FILE_SIZE` sets `max_file_size` and `TRACING__LEVEL` sets
/// `tracing.level`.
///
/// Using the *struct update syntax* one can initialize a new `Config`, making
/// a few changes right in the definition.
///
/// ```ignore
/// let cfg = Config {
///     database_url: "./db".to_string(),
///     ..Default::default()
/// }
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub name: String,

    /// Address on which to serve the application. Defaults to
    /// `127.0.0.1:8000`.
    pub address: SocketAddr,

    /// Location of the metadata store. For the embedded backends this is a
    /// filesystem path. Required.
    pub database_url: String,

    /// Origin allowed to make cross-origin requests, with credentials.
    pub frontend_url: String,
    /// Public base url of this server, used when deriving image urls.
    pub host_url: String,

    /// Upload size limit in bytes.
    pub max_file_size: u64,
    /// Content store directory. Created at startup if missing.
    pub upload_dir: PathBuf,

    /// Per-request timeout applied at the http boundary.
    pub request_timeout_secs: u64,

    pub tracing: Tracing,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            database_url: "".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            host_url: "http://localhost:8000".to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            upload_dir: PathBuf::from("./uploads"),
            request_timeout_secs: 30,
            tracing: Tracing::default(),
        }
    }
}

impl Config {
    /// Checks the values that must be present before the application is
    /// allowed to boot.
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(ErrorKind::InvalidConfig(
                "`database_url` is not set, provide it through the config file or the \
                 DATABASE_URL environment variable"
                    .to_string(),
            )
            .into());
        }
        if self.max_file_size == 0 {
            return Err(
                ErrorKind::InvalidConfig("`max_file_size` must be greater than zero".to_string())
                    .into(),
            );
        }
        url::Url::parse(&self.host_url)?;
        url::Url::parse(&self.frontend_url)?;
        Ok(())
    }
}

/// Loads application config from toml file at default location, with
/// environment overrides.
pub fn load<T: DeserializeOwned>() -> Result<T> {
    load_from(CONFIG_FILE)
}

/// Loads application config from toml file at standard path using provided
/// name.
///
/// For example for `name` == `geogallery.toml` we will load both
/// `geogallery.toml` and `secret.geogallery.toml` from the working directory.
pub fn load_from<T: DeserializeOwned>(name: impl AsRef<str>) -> Result<T> {
    let config = config::Config::builder()
        .add_source(config::File::with_name(name.as_ref()).required(false))
        .add_source(config::File::with_name(&format!("secret.{}", name.as_ref())).required(false))
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix_separator("__"),
        )
        .build()?;

    let config: T = config.try_deserialize()?;

    Ok(config)
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Tracing {
    pub enabled: bool,

    pub mode: crate::tracing::Mode,
    pub level: crate::tracing::Level,

    pub loki_address: String,
}

impl Default for Tracing {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: crate::tracing::Mode::default(),
            level: crate::tracing::Level::default(),
            loki_address: "".to_string(),
        }
    }
}
