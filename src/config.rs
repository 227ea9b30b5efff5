use std::env;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::errors::ConfigError;

const DEFAULT_SECRET_KEY: &str = "a-default-fallback-secret-key";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_CONNECTION_STRING: &str = "sqlite://voters.db";
const DEFAULT_REGISTRATION_PATH: &str = "register";

/// Runtime configuration, read once at startup and handed to
/// everything that needs it.
#[derive(Debug)]
pub struct Config {
    /// Framework secret. Nothing on the write path uses it.
    pub secret_key: SecretString,

    /// Directory that photos are written into. Created on first use.
    pub upload_dir: PathBuf,

    pub connection_string: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,

    pub port: u16,
    pub admin_port: u16,

    /// Path segment of the registration endpoint, without slashes.
    pub registration_path: String,

    /// The largest request body to accept, in bytes.
    pub max_content_length: u64,

    pub log_level: String,
}

impl Config {
    /// Reads every setting from the environment, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            secret_key: SecretString::new(get_variable_or(
                "FLASK_SECRET_KEY",
                DEFAULT_SECRET_KEY,
            )),
            upload_dir: PathBuf::from(get_variable_or("BACKEND_UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
            connection_string: get_variable_or(
                "BACKEND_DB_CONNECTION_STRING",
                DEFAULT_CONNECTION_STRING,
            ),
            max_connections: parse_variable_or("BACKEND_DB_MAX_CONNECTIONS", 5)?,
            acquire_timeout: Duration::from_secs(parse_variable_or(
                "BACKEND_DB_ACQUIRE_TIMEOUT_SECONDS",
                5,
            )?),
            port: parse_variable_or("BACKEND_PORT", 5000)?,
            admin_port: parse_variable_or("BACKEND_ADMIN_PORT", 5001)?,
            registration_path: parse_path_segment("BACKEND_REGISTRATION_PATH")?,
            max_content_length: parse_variable_or("BACKEND_MAX_CONTENT_LENGTH", 16 * 1024 * 1024)?,
            log_level: get_variable_or("BACKEND_LOG_LEVEL", "info"),
        })
    }

    /// A configuration for tests: a scratch database and upload
    /// directory, and otherwise the defaults.
    pub fn for_paths(connection_string: impl Into<String>, upload_dir: impl Into<PathBuf>) -> Self {
        Config {
            secret_key: SecretString::new(DEFAULT_SECRET_KEY.to_owned()),
            upload_dir: upload_dir.into(),
            connection_string: connection_string.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            port: 5000,
            admin_port: 5001,
            registration_path: DEFAULT_REGISTRATION_PATH.to_owned(),
            max_content_length: 16 * 1024 * 1024,
            log_level: "info".to_owned(),
        }
    }
}

/// Returns the value of the named environment variable, or `default`
/// if it isn't set.
pub fn get_variable_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Turns a relative directory into one under the current working
/// directory, so stored photo references are full paths.
pub fn absolute(path: PathBuf) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

/// Reads a single URL path segment; surrounding slashes are ignored.
fn parse_path_segment(name: &'static str) -> Result<String, ConfigError> {
    let value = get_variable_or(name, DEFAULT_REGISTRATION_PATH);
    let segment = value.trim_matches('/');

    if segment.is_empty() || segment.contains('/') {
        return Err(ConfigError::Invalid { name, value });
    }

    Ok(segment.to_owned())
}

fn parse_variable_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
