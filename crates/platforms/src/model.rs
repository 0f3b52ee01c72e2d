//! Deployment data model shared by every adapter.

use crate::error::{DeployError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Supported deployment platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Edge workers + Pages.
    Cloudflare,
    /// Static/serverless deployments.
    Vercel,
    /// Full-stack app services (GraphQL API).
    Railway,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Cloudflare, Platform::Vercel, Platform::Railway];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Platform::Cloudflare => "cloudflare",
            Platform::Vercel => "vercel",
            Platform::Railway => "railway",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Platform::Cloudflare => "Cloudflare",
            Platform::Vercel => "Vercel",
            Platform::Railway => "Railway",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == needle)
            .ok_or_else(|| DeployError::unsupported(s, &Platform::ALL))
    }
}

/// Target environment of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub const ALL: [Environment; 3] = [
        Environment::Development,
        Environment::Staging,
        Environment::Production,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        Environment::ALL
            .into_iter()
            .find(|e| e.as_str() == needle)
            .ok_or_else(|| {
                let allowed: Vec<&str> = Environment::ALL.iter().map(|e| e.as_str()).collect();
                DeployError::validation(
                    "environment",
                    format!("'{s}' is not one of: {}", allowed.join(", ")),
                )
            })
    }
}

/// Normalized deployment status. Every provider vocabulary maps onto these five values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Pending,
    Building,
    Ready,
    Error,
    Canceled,
}

impl DeploymentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "pending",
            DeploymentStatus::Building => "building",
            DeploymentStatus::Ready => "ready",
            DeploymentStatus::Error => "error",
            DeploymentStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A project name that has passed sanitization and `^[A-Za-z0-9_-]{1,100}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectName(String);

impl ProjectName {
    /// # Errors
    ///
    /// Returns a validation error naming "project name" if `raw` is not a valid project name.
    pub fn parse(raw: &str) -> Result<Self> {
        crate::validation::validate_project_name(raw).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Everything needed to deploy a project, minus the target platform.
///
/// Used as-is by tools that compare several platforms for the same project.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentTemplate {
    pub project_name: ProjectName,
    pub environment: Environment,
    pub build_command: Option<String>,
    pub output_directory: Option<String>,
    pub environment_variables: BTreeMap<String, String>,
    pub custom_domains: Vec<String>,
    pub region: Option<String>,
}

impl DeploymentTemplate {
    #[must_use]
    pub fn for_platform(self, platform: Platform) -> DeploymentConfig {
        DeploymentConfig {
            platform,
            project_name: self.project_name,
            environment: self.environment,
            build_command: self.build_command,
            output_directory: self.output_directory,
            environment_variables: self.environment_variables,
            custom_domains: self.custom_domains,
            region: self.region,
        }
    }
}

/// A validated deploy request. Built by [`crate::validation::deployment_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentConfig {
    pub platform: Platform,
    pub project_name: ProjectName,
    pub environment: Environment,
    pub build_command: Option<String>,
    pub output_directory: Option<String>,
    pub environment_variables: BTreeMap<String, String>,
    pub custom_domains: Vec<String>,
    pub region: Option<String>,
}

impl DeploymentConfig {
    /// Minimal production config, mostly useful in tests.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `project_name` is invalid.
    pub fn new(platform: Platform, project_name: &str) -> Result<Self> {
        Ok(Self {
            platform,
            project_name: ProjectName::parse(project_name)?,
            environment: Environment::default(),
            build_command: None,
            output_directory: None,
            environment_variables: BTreeMap::new(),
            custom_domains: Vec::new(),
            region: None,
        })
    }

    /// True when the config describes a build (static site) rather than a single script.
    #[must_use]
    pub fn has_build_step(&self) -> bool {
        self.build_command.is_some() || self.output_directory.is_some()
    }
}

/// Snapshot of one deployment, normalized from provider data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub platform: Platform,
    pub deployment_id: String,
    pub url: String,
    pub status: DeploymentStatus,
    /// Project/service name as the provider knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Per-platform aggregate for one project. Recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformAnalytics {
    pub platform: Platform,
    pub project_name: String,
    pub total_deployments: usize,
    /// Fraction of deployments that reached `ready`, 0..=1.
    pub success_rate: f64,
    pub average_build_time_ms: f64,
    pub total_cost: f64,
    /// 0..=100.
    pub performance_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_deployment: Option<DateTime<Utc>>,
}

impl PlatformAnalytics {
    #[must_use]
    pub fn empty(platform: Platform, project_name: &str) -> Self {
        Self {
            platform,
            project_name: project_name.to_string(),
            total_deployments: 0,
            success_rate: 0.0,
            average_build_time_ms: 0.0,
            total_cost: 0.0,
            performance_score: 0.0,
            last_deployment: None,
        }
    }
}
