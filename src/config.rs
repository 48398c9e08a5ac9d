use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Origins a local frontend dev server runs on.
const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_upload_bytes: usize,
    pub sample_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 8080,
                host: "0.0.0.0".to_string(),
                cors_allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
                request_timeout_secs: 60,
                shutdown_timeout_secs: 10,
                static_dir: None,
            },
            upload: UploadConfig {
                max_upload_bytes: 10 << 20, // 10 MB
                sample_size: 5,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source, falling
    /// back to [`Config::default`] for anything unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mut cors_allowed_origins = defaults.server.cors_allowed_origins;
        if let Some(origin) = lookup("CORS_ORIGIN").filter(|o| !o.trim().is_empty()) {
            cors_allowed_origins.push(origin.trim().to_string());
        }

        Ok(Self {
            server: ServerConfig {
                port: parse_or(&lookup, "PORT", defaults.server.port)?,
                host: lookup("HOST").unwrap_or(defaults.server.host),
                cors_allowed_origins,
                request_timeout_secs: parse_or(
                    &lookup,
                    "REQUEST_TIMEOUT_SECS",
                    defaults.server.request_timeout_secs,
                )?,
                shutdown_timeout_secs: parse_or(
                    &lookup,
                    "SHUTDOWN_TIMEOUT_SECS",
                    defaults.server.shutdown_timeout_secs,
                )?,
                static_dir: lookup("STATIC_DIR").map(PathBuf::from),
            },
            upload: UploadConfig {
                max_upload_bytes: parse_or(
                    &lookup,
                    "MAX_UPLOAD_BYTES",
                    defaults.upload.max_upload_bytes,
                )?,
                sample_size: defaults.upload.sample_size,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(
            config.server.cors_allowed_origins,
            ["http://localhost:3000", "http://localhost:5173"]
        );
        assert_eq!(config.server.request_timeout_secs, 60);
        assert_eq!(config.upload.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.upload.sample_size, 5);
        assert!(config.server.static_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("HOST", "127.0.0.1"),
            ("CORS_ORIGIN", "https://viewer.example.com"),
            ("MAX_UPLOAD_BYTES", "1024"),
            ("STATIC_DIR", "web/dist"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.cors_allowed_origins.len(), 3);
        assert_eq!(
            config.server.cors_allowed_origins[2],
            "https://viewer.example.com"
        );
        assert_eq!(config.upload.max_upload_bytes, 1024);
        assert_eq!(config.server.static_dir, Some(PathBuf::from("web/dist")));
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
