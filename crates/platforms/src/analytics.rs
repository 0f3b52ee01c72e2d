//! Cost estimates and per-project analytics computed from deployment snapshots.

use crate::model::{DeploymentResult, DeploymentStatus, Platform, PlatformAnalytics};

/// Build time at (or above) which the speed component of the performance score bottoms out.
const SLOW_BUILD_MS: f64 = 600_000.0;

/// Flat monthly plan price plus a per-build-minute rate, in USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingModel {
    pub base_monthly: f64,
    pub per_build_minute: f64,
}

impl PricingModel {
    #[must_use]
    pub fn build_cost(&self, build_time_ms: Option<u64>) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let minutes = build_time_ms.unwrap_or(0) as f64 / 60_000.0;
        minutes * self.per_build_minute
    }

    /// Estimated cost attributable to one deployment.
    #[must_use]
    pub fn price(&self, deployment: &DeploymentResult) -> f64 {
        round_cents(self.base_monthly + self.build_cost(deployment.build_time_ms))
    }
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Aggregate the deployments belonging to `project_name`.
///
/// A deployment belongs to the project when its provider-reported project/service name or its
/// deployment id contains `project_name`.
#[must_use]
pub fn aggregate(
    platform: Platform,
    project_name: &str,
    deployments: &[DeploymentResult],
    pricing: PricingModel,
) -> PlatformAnalytics {
    let mine: Vec<&DeploymentResult> = deployments
        .iter()
        .filter(|d| {
            d.project
                .as_deref()
                .is_some_and(|p| p.contains(project_name))
                || d.deployment_id.contains(project_name)
        })
        .collect();

    if mine.is_empty() {
        return PlatformAnalytics::empty(platform, project_name);
    }

    #[allow(clippy::cast_precision_loss)]
    let total = mine.len() as f64;
    let ready = mine
        .iter()
        .filter(|d| d.status == DeploymentStatus::Ready)
        .count();
    #[allow(clippy::cast_precision_loss)]
    let success_rate = ready as f64 / total;

    let build_times: Vec<u64> = mine.iter().filter_map(|d| d.build_time_ms).collect();
    #[allow(clippy::cast_precision_loss)]
    let average_build_time_ms = if build_times.is_empty() {
        0.0
    } else {
        build_times.iter().sum::<u64>() as f64 / build_times.len() as f64
    };

    let total_cost = round_cents(
        pricing.base_monthly
            + mine
                .iter()
                .map(|d| pricing.build_cost(d.build_time_ms))
                .sum::<f64>(),
    );

    PlatformAnalytics {
        platform,
        project_name: project_name.to_string(),
        total_deployments: mine.len(),
        success_rate,
        average_build_time_ms,
        total_cost,
        performance_score: performance_score(success_rate, average_build_time_ms),
        last_deployment: mine.iter().map(|d| d.timestamp).max(),
    }
}

/// `round(success_rate * 70 + speed * 30)`, where speed falls linearly from 1 (instant) to 0
/// (ten minutes or slower).
#[must_use]
pub fn performance_score(success_rate: f64, average_build_time_ms: f64) -> f64 {
    let speed = 1.0 - (average_build_time_ms / SLOW_BUILD_MS).clamp(0.0, 1.0);
    (success_rate.clamp(0.0, 1.0) * 70.0 + speed * 30.0).round()
}
