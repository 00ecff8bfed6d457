use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::media::DEFAULT_MAX_FILE_SIZE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key} value {value:?}: {message}")]
    Invalid {
        key: &'static str,
        value: String,
        message: String,
    },
}

/// Settings read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub media_root: PathBuf,
    /// URL prefix stored images are served under, e.g. `/media`.
    pub media_url: String,
    pub max_image_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let media_url = lookup("MEDIA_URL").unwrap_or_else(|| "/media".to_string());
        let media_url = format!("/{}", media_url.trim_matches('/'));
        if media_url == "/" {
            return Err(ConfigError::Invalid {
                key: "MEDIA_URL",
                value: media_url,
                message: "must not be the root path".to_string(),
            });
        }

        Ok(Self {
            database_url,
            bind_addr: parse_or(&lookup, "BIND_ADDR", "0.0.0.0:3000")?,
            media_root: lookup("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("media")),
            media_url,
            max_image_bytes: parse_or(
                &lookup,
                "MAX_IMAGE_BYTES",
                &DEFAULT_MAX_FILE_SIZE.to_string(),
            )?,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        tracing::debug!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: e.to_string(),
        value,
    })
}
