//! Platform id -> adapter handle routing.

use crate::adapter::PlatformAdapter;
use crate::analytics::PricingModel;
use crate::cloudflare::{self, CloudflareAdapter};
use crate::credentials::Credentials;
use crate::error::{DeployError, Result};
use crate::model::{DeploymentConfig, DeploymentResult, Platform, PlatformAnalytics};
use crate::policy::{FailurePolicy, Operation, Settled, settle};
use crate::railway::{self, RailwayAdapter};
use crate::vercel::{self, VercelAdapter};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use unrelated_provider_http::HttpTransport;
use url::Url;

/// Provider API base URLs. Overridable so tests (and proxies) can point adapters elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderEndpoints {
    pub cloudflare: Url,
    pub vercel: Url,
    pub railway: Url,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        // Constant, known-good URLs.
        #[allow(clippy::expect_used)]
        let parse = |s: &str| Url::parse(s).expect("default provider URL");
        Self {
            cloudflare: parse(cloudflare::DEFAULT_BASE_URL),
            vercel: parse(vercel::DEFAULT_BASE_URL),
            railway: parse(railway::DEFAULT_BASE_URL),
        }
    }
}

/// One adapter plus its call gate.
///
/// The gate serializes calls into the same adapter; different adapters run concurrently.
/// Every operation except `authenticate` checks `is_authenticated()` while holding the gate, so
/// a concurrent `logout` cannot slip in between the check and the provider call. Advisory
/// operations go through [`settle`].
pub struct AdapterHandle {
    adapter: Arc<dyn PlatformAdapter>,
    gate: tokio::sync::Mutex<()>,
}

impl fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("platform", &self.adapter.platform())
            .field("authenticated", &self.adapter.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl AdapterHandle {
    #[must_use]
    pub fn new(adapter: Arc<dyn PlatformAdapter>) -> Self {
        Self {
            adapter,
            gate: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.adapter.platform()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.adapter.is_authenticated()
    }

    #[must_use]
    pub fn pricing(&self) -> PricingModel {
        self.adapter.pricing()
    }

    /// Core operations have no default value to fall back on.
    fn propagate<T>(&self, op: Operation, result: Result<T>) -> Result<T> {
        debug_assert_eq!(op.policy(), FailurePolicy::Propagate);
        if let Err(e) = &result {
            tracing::debug!(platform = %self.platform(), operation = op.as_str(), error = %e, "operation failed");
        }
        result
    }

    fn ensure_authenticated(&self, op: Operation) -> Result<()> {
        if op.requires_authentication() && !self.adapter.is_authenticated() {
            tracing::debug!(platform = %self.platform(), operation = op.as_str(), "rejected: not authenticated");
            return Err(DeployError::not_authenticated(self.platform()));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns validation or authentication errors from the adapter.
    pub async fn authenticate(&self, credentials: Credentials) -> Result<bool> {
        let _gate = self.gate.lock().await;
        let result = self.adapter.authenticate(credentials).await;
        self.propagate(Operation::Authenticate, result)
    }

    pub async fn logout(&self) {
        let _gate = self.gate.lock().await;
        self.adapter.logout();
        tracing::info!(platform = %self.platform(), "logged out");
    }

    /// # Errors
    ///
    /// Fails if unauthenticated, if `config` targets another platform, or if the provider fails.
    pub async fn deploy(&self, config: &DeploymentConfig) -> Result<DeploymentResult> {
        if config.platform != self.platform() {
            return Err(DeployError::validation(
                "platform",
                format!(
                    "config targets '{}' but was routed to '{}'",
                    config.platform,
                    self.platform()
                ),
            ));
        }
        let _gate = self.gate.lock().await;
        self.ensure_authenticated(Operation::Deploy)?;
        let result = self.adapter.deploy(config).await;
        if let Ok(r) = &result {
            tracing::info!(platform = %r.platform, deployment_id = %r.deployment_id, status = %r.status, "deployed");
        }
        self.propagate(Operation::Deploy, result)
    }

    /// # Errors
    ///
    /// Fails if unauthenticated or if the provider fails.
    pub async fn get_status(&self, deployment_id: &str) -> Result<DeploymentResult> {
        let _gate = self.gate.lock().await;
        self.ensure_authenticated(Operation::Status)?;
        let result = self.adapter.get_status(deployment_id).await;
        self.propagate(Operation::Status, result)
    }

    /// # Errors
    ///
    /// Fails if unauthenticated or if the provider fails.
    pub async fn get_deployments(&self) -> Result<Vec<DeploymentResult>> {
        let _gate = self.gate.lock().await;
        self.ensure_authenticated(Operation::Deployments)?;
        let result = self.adapter.get_deployments().await;
        self.propagate(Operation::Deployments, result)
    }

    /// Best-effort: provider failures yield `0.0`.
    ///
    /// # Errors
    ///
    /// Fails only if unauthenticated.
    pub async fn get_cost(&self, deployment_id: &str) -> Result<Settled<f64>> {
        let _gate = self.gate.lock().await;
        self.ensure_authenticated(Operation::Cost)?;
        let result = self.adapter.get_cost(deployment_id).await;
        settle(self.platform(), Operation::Cost, result, || 0.0)
    }

    /// Best-effort: provider failures yield an all-zero record, with the failure kept in
    /// [`Settled::degraded`].
    ///
    /// # Errors
    ///
    /// Fails only if unauthenticated.
    pub async fn get_analytics(&self, project_name: &str) -> Result<Settled<PlatformAnalytics>> {
        let _gate = self.gate.lock().await;
        self.ensure_authenticated(Operation::Analytics)?;
        let result = self.adapter.get_analytics(project_name).await;
        settle(self.platform(), Operation::Analytics, result, || {
            PlatformAnalytics::empty(self.platform(), project_name)
        })
    }

    /// Best-effort: provider failures yield `false`.
    ///
    /// # Errors
    ///
    /// Fails only if unauthenticated.
    pub async fn share_with_team(&self, deployment_id: &str, team_id: &str) -> Result<bool> {
        let _gate = self.gate.lock().await;
        self.ensure_authenticated(Operation::Share)?;
        let result = self.adapter.share_with_team(deployment_id, team_id).await;
        settle(self.platform(), Operation::Share, result, || false).map(Settled::into_value)
    }

    /// Best-effort: provider failures yield an empty list.
    ///
    /// # Errors
    ///
    /// Fails only if unauthenticated.
    pub async fn get_team_deployments(&self, team_id: &str) -> Result<Vec<DeploymentResult>> {
        let _gate = self.gate.lock().await;
        self.ensure_authenticated(Operation::TeamDeployments)?;
        let result = self.adapter.get_team_deployments(team_id).await;
        settle(self.platform(), Operation::TeamDeployments, result, Vec::new)
            .map(Settled::into_value)
    }
}

/// Immutable map of enabled platforms to their handles. Built once at startup.
#[derive(Debug, Clone)]
pub struct AdapterRegistry {
    handles: BTreeMap<Platform, Arc<AdapterHandle>>,
}

impl AdapterRegistry {
    pub fn new(adapters: impl IntoIterator<Item = Arc<dyn PlatformAdapter>>) -> Self {
        let handles = adapters
            .into_iter()
            .map(|a| (a.platform(), Arc::new(AdapterHandle::new(a))))
            .collect();
        Self { handles }
    }

    /// Registry with the built-in adapters for `enabled` platforms, all sharing `transport`.
    #[must_use]
    pub fn with_defaults(
        endpoints: &ProviderEndpoints,
        transport: &Arc<dyn HttpTransport>,
        enabled: &[Platform],
    ) -> Self {
        let adapters = enabled.iter().map(|p| -> Arc<dyn PlatformAdapter> {
            match p {
                Platform::Cloudflare => Arc::new(CloudflareAdapter::new(
                    endpoints.cloudflare.clone(),
                    Arc::clone(transport),
                )),
                Platform::Vercel => Arc::new(VercelAdapter::new(
                    endpoints.vercel.clone(),
                    Arc::clone(transport),
                )),
                Platform::Railway => Arc::new(RailwayAdapter::new(
                    endpoints.railway.clone(),
                    Arc::clone(transport),
                )),
            }
        });
        Self::new(adapters)
    }

    /// Look up a raw platform id.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::PlatformUnsupported`] for unknown or disabled platforms.
    pub fn get(&self, raw: &str) -> Result<Arc<AdapterHandle>> {
        let platform = raw
            .parse::<Platform>()
            .map_err(|_| self.unsupported(raw))?;
        self.get_platform(platform)
    }

    /// # Errors
    ///
    /// Returns [`DeployError::PlatformUnsupported`] if `platform` is not enabled.
    pub fn get_platform(&self, platform: Platform) -> Result<Arc<AdapterHandle>> {
        self.handles
            .get(&platform)
            .cloned()
            .ok_or_else(|| self.unsupported(platform.as_str()))
    }

    /// Handles for `requested`, or every registered platform when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::PlatformUnsupported`] for the first platform that is not enabled.
    pub fn resolve(&self, requested: Option<&[Platform]>) -> Result<Vec<Arc<AdapterHandle>>> {
        match requested {
            Some(list) => list.iter().map(|p| self.get_platform(*p)).collect(),
            None => Ok(self.handles.values().cloned().collect()),
        }
    }

    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        self.handles.keys().copied().collect()
    }

    fn unsupported(&self, requested: &str) -> DeployError {
        DeployError::unsupported(requested, self.handles.keys())
    }
}
