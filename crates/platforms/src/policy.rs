//! Per-operation failure policy.
//!
//! Core operations (deploy, status, listing) propagate provider failures to the caller.
//! Advisory operations (cost, analytics, team hooks) degrade to a default value instead.
//!
//! Only provider failures degrade. Authentication and validation errors always propagate.

use crate::error::{DeployError, Result};
use crate::model::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Authenticate,
    Deploy,
    Status,
    Deployments,
    Cost,
    Analytics,
    Share,
    TeamDeployments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Propagate,
    Degrade,
}

impl Operation {
    #[must_use]
    pub const fn policy(self) -> FailurePolicy {
        match self {
            Operation::Authenticate
            | Operation::Deploy
            | Operation::Status
            | Operation::Deployments => FailurePolicy::Propagate,
            Operation::Cost
            | Operation::Analytics
            | Operation::Share
            | Operation::TeamDeployments => FailurePolicy::Degrade,
        }
    }

    #[must_use]
    pub const fn requires_authentication(self) -> bool {
        !matches!(self, Operation::Authenticate)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Authenticate => "authenticate",
            Operation::Deploy => "deploy",
            Operation::Status => "status",
            Operation::Deployments => "deployments",
            Operation::Cost => "cost",
            Operation::Analytics => "analytics",
            Operation::Share => "share",
            Operation::TeamDeployments => "team_deployments",
        }
    }
}

/// Result of an advisory operation: the value handed to the caller, plus the provider failure
/// it stands in for when the policy degraded.
///
/// Single-platform callers usually just take [`Settled::into_value`]; aggregates check
/// [`Settled::degraded`] so a platform whose provider is down is reported, not priced at zero.
#[derive(Debug)]
pub struct Settled<T> {
    pub value: T,
    pub degraded: Option<DeployError>,
}

impl<T> Settled<T> {
    #[must_use]
    pub fn fresh(value: T) -> Self {
        Self {
            value,
            degraded: None,
        }
    }

    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }

    /// The real value, or the provider failure that was degraded.
    ///
    /// # Errors
    ///
    /// Returns the degraded provider error.
    pub fn into_result(self) -> Result<T> {
        match self.degraded {
            Some(e) => Err(e),
            None => Ok(self.value),
        }
    }
}

/// Apply `op`'s failure policy to an adapter result.
///
/// # Errors
///
/// Returns the original error unless the policy degrades it.
pub fn settle<T>(
    platform: Platform,
    op: Operation,
    result: Result<T>,
    default: impl FnOnce() -> T,
) -> Result<Settled<T>> {
    match result {
        Ok(value) => Ok(Settled::fresh(value)),
        Err(e @ DeployError::ProviderRequest { .. }) if op.policy() == FailurePolicy::Degrade => {
            tracing::warn!(
                platform = %platform,
                operation = op.as_str(),
                error = %e,
                "advisory provider call failed; using default"
            );
            Ok(Settled {
                value: default(),
                degraded: Some(e),
            })
        }
        Err(e) => Err(e),
    }
}
