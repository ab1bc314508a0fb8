//! Command-line and environment configuration.
//!
//! Every knob has a CLI flag and an environment-variable fallback, so the
//! dashboard can be pointed at a different service without editing code.
//! [`Args::into_config`] validates the raw values into a [`Config`].

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use reqwest::Url;

use crate::error::ConfigError;

/// Per-bucket display cap used when none is configured.
pub const DEFAULT_BUCKET_CAP: usize = 8;

/// Number of languages drawn in the distribution chart by default.
pub const DEFAULT_LANGUAGE_CAP: usize = 6;

/// Live terminal dashboard for a trending-topics aggregation service.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Base URL of the aggregation service; `status/` and `trending/` are
    /// resolved against it.
    #[arg(long, env = "TRENDBOARD_BASE_URL", default_value = "http://127.0.0.1:8000/api/")]
    pub base_url: String,

    /// Seconds between the end of one refresh cycle and the start of the next.
    #[arg(long, env = "TRENDBOARD_INTERVAL_SECS", default_value_t = 30)]
    pub interval_secs: u64,

    /// Per-request timeout in seconds.
    #[arg(long, env = "TRENDBOARD_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Maximum items shown per platform bucket.
    #[arg(long, env = "TRENDBOARD_BUCKET_CAP", default_value_t = DEFAULT_BUCKET_CAP)]
    pub bucket_cap: usize,

    /// Maximum languages shown in the distribution chart.
    #[arg(long, env = "TRENDBOARD_LANGUAGE_CAP", default_value_t = DEFAULT_LANGUAGE_CAP)]
    pub language_cap: usize,

    /// Write logs to this file.  Nothing is logged when unset.
    #[arg(long, env = "TRENDBOARD_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "TRENDBOARD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: Url,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub bucket_cap: usize,
    pub language_cap: usize,
}

impl Config {
    /// The `GET` target for the service status endpoint.
    pub fn status_url(&self) -> Url {
        join_endpoint(&self.base_url, "status/")
    }

    /// The `GET` target for the trending payload endpoint.
    pub fn trending_url(&self) -> Url {
        join_endpoint(&self.base_url, "trending/")
    }
}

impl Args {
    /// Validate the raw arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the base URL is not an http(s) URL or
    /// any duration or cap is zero.
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let base_url = parse_base_url(&self.base_url)?;

        let nonzero = |name: &'static str, value: u64| -> Result<u64, ConfigError> {
            if value == 0 {
                Err(ConfigError::Zero { name })
            } else {
                Ok(value)
            }
        };

        let interval = nonzero("interval-secs", self.interval_secs)?;
        let timeout = nonzero("timeout-secs", self.timeout_secs)?;
        let bucket_cap = nonzero("bucket-cap", self.bucket_cap as u64)? as usize;
        let language_cap = nonzero("language-cap", self.language_cap as u64)? as usize;

        Ok(Config {
            base_url,
            refresh_interval: Duration::from_secs(interval),
            request_timeout: Duration::from_secs(timeout),
            bucket_cap,
            language_cap,
        })
    }
}

/// Parse the base URL, forcing a trailing slash so relative joins append
/// rather than replace the last path segment.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn join_endpoint(base: &Url, path: &str) -> Url {
    // `base` always ends in '/', so a relative join cannot fail.
    base.join(path).unwrap_or_else(|_| base.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args::parse_from(["trendboard"])
    }

    #[test]
    fn defaults_validate() {
        let config = args().into_config().unwrap();
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.bucket_cap, DEFAULT_BUCKET_CAP);
        assert_eq!(config.language_cap, DEFAULT_LANGUAGE_CAP);
        assert_eq!(
            config.status_url().as_str(),
            "http://127.0.0.1:8000/api/status/"
        );
        assert_eq!(
            config.trending_url().as_str(),
            "http://127.0.0.1:8000/api/trending/"
        );
    }

    #[test]
    fn base_url_without_trailing_slash_keeps_last_segment() {
        let mut a = args();
        a.base_url = "https://trends.example.com/api".into();
        let config = a.into_config().unwrap();
        assert_eq!(
            config.trending_url().as_str(),
            "https://trends.example.com/api/trending/"
        );
    }

    #[test]
    fn rejects_non_http_scheme() {
        let mut a = args();
        a.base_url = "ftp://example.com/".into();
        let err = a.into_config().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidBaseUrl { .. }),
            "expected InvalidBaseUrl, got: {err:?}"
        );
    }

    #[test]
    fn rejects_garbage_url() {
        let mut a = args();
        a.base_url = "not a url".into();
        assert!(a.into_config().is_err());
    }

    #[test]
    fn rejects_zero_interval_and_caps() {
        let mut a = args();
        a.interval_secs = 0;
        assert_eq!(
            a.into_config().unwrap_err(),
            ConfigError::Zero { name: "interval-secs" }
        );

        let mut a = args();
        a.bucket_cap = 0;
        assert_eq!(
            a.into_config().unwrap_err(),
            ConfigError::Zero { name: "bucket-cap" }
        );
    }

    #[test]
    fn flags_override_defaults() {
        let a = Args::parse_from([
            "trendboard",
            "--interval-secs",
            "5",
            "--bucket-cap",
            "3",
            "--language-cap",
            "2",
        ]);
        let config = a.into_config().unwrap();
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
        assert_eq!(config.bucket_cap, 3);
        assert_eq!(config.language_cap, 2);
    }
}
