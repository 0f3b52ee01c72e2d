//! CLI flags + optional YAML config file.
//!
//! Precedence: flag / environment variable, then config file, then built-in defaults.

use crate::error::{Result, ServerError};
use crate::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use unrelated_deploy_platforms::{Platform, ProviderEndpoints};
use unrelated_provider_http::transport::{DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_TIMEOUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// MCP over stdin/stdout (single client).
    Stdio,
    /// MCP streamable HTTP on `/mcp`, plus `/health`.
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "unrelated-deploy-mcp", version, about = "Deploy to Cloudflare, Vercel and Railway over MCP", long_about = None)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "UNRELATED_DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// MCP transport
    #[arg(long, value_enum, env = "UNRELATED_DEPLOY_TRANSPORT", default_value_t = TransportKind::Stdio)]
    pub transport: TransportKind,

    /// Listen address for the HTTP transport
    #[arg(long, env = "UNRELATED_DEPLOY_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Max tool calls per client per window (overrides config file)
    #[arg(long, env = "UNRELATED_DEPLOY_RATE_LIMIT_MAX")]
    pub rate_limit_max: Option<usize>,

    /// Rate limit window in milliseconds (overrides config file)
    #[arg(long, env = "UNRELATED_DEPLOY_RATE_LIMIT_WINDOW_MS")]
    pub rate_limit_window_ms: Option<u64>,

    /// Per-call provider timeout in milliseconds (overrides config file)
    #[arg(long, env = "UNRELATED_DEPLOY_HTTP_TIMEOUT_MS")]
    pub http_timeout_ms: Option<u64>,

    /// Comma-separated platforms to enable (overrides config file)
    #[arg(long, env = "UNRELATED_DEPLOY_PLATFORMS", value_delimiter = ',', value_parser = parse_platform_arg)]
    pub platforms: Option<Vec<Platform>>,

    /// Log level / filter directive (`RUST_LOG` wins when set)
    #[arg(long, env = "UNRELATED_DEPLOY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, env = "UNRELATED_DEPLOY_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

fn parse_platform_arg(raw: &str) -> std::result::Result<Platform, String> {
    raw.parse::<Platform>().map_err(|e| e.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_ms: u64::try_from(DEFAULT_WINDOW.as_millis()).unwrap_or(60_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub max_response_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(30_000),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

fn all_platforms() -> Vec<Platform> {
    Platform::ALL.to_vec()
}

/// Effective server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeployConfig {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub endpoints: ProviderEndpoints,
    #[serde(default = "all_platforms")]
    pub platforms: Vec<Platform>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            http: HttpConfig::default(),
            endpoints: ProviderEndpoints::default(),
            platforms: all_platforms(),
        }
    }
}

impl DeployConfig {
    /// Load from `path`, or defaults when no file is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&raw)
    }

    /// # Errors
    ///
    /// Returns an error if `raw` is not a valid config document.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        // An empty file is a valid "all defaults" config.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Self = serde_yaml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply CLI overrides on top of file values.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged config is invalid.
    pub fn with_overrides(mut self, cli: &Cli) -> Result<Self> {
        if let Some(max) = cli.rate_limit_max {
            self.rate_limit.max_requests = max;
        }
        if let Some(window) = cli.rate_limit_window_ms {
            self.rate_limit.window_ms = window;
        }
        if let Some(timeout) = cli.http_timeout_ms {
            self.http.timeout_ms = timeout;
        }
        if let Some(platforms) = &cli.platforms {
            self.platforms.clone_from(platforms);
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.rate_limit.max_requests == 0 {
            return Err(ServerError::Config("rateLimit.maxRequests must be at least 1".into()));
        }
        if self.rate_limit.window_ms == 0 {
            return Err(ServerError::Config("rateLimit.windowMs must be at least 1".into()));
        }
        if self.http.timeout_ms == 0 {
            return Err(ServerError::Config("http.timeoutMs must be at least 1".into()));
        }
        if self.platforms.is_empty() {
            return Err(ServerError::Config("at least one platform must be enabled".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit.window_ms)
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http.timeout_ms)
    }

    /// Enabled platforms, deduplicated, in declaration order.
    #[must_use]
    pub fn enabled_platforms(&self) -> Vec<Platform> {
        let mut out: Vec<Platform> = Vec::with_capacity(self.platforms.len());
        for p in &self.platforms {
            if !out.contains(p) {
                out.push(*p);
            }
        }
        out
    }
}
