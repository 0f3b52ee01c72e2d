//! Human-readable tool output.

use std::fmt::Write as _;
use unrelated_deploy_platforms::{DeployError, DeploymentResult, Platform, PlatformAnalytics};

/// One platform's row in a cost comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct CostLine {
    pub platform: Platform,
    pub monthly_cost: f64,
    /// True when the platform has no deployments for the project and the cost is the plan price.
    pub estimated: bool,
    pub analytics: PlatformAnalytics,
}

fn seconds(ms: f64) -> String {
    format!("{:.1}s", ms / 1000.0)
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

fn error_line(out: &mut String, platform: Platform, error: &DeployError) {
    let _ = writeln!(out, "{}: error - {error}", platform.display_name());
}

#[must_use]
pub fn deployment_summary(heading: &str, d: &DeploymentResult) -> String {
    let mut out = format!("{heading}\n");
    let _ = writeln!(out, "Platform: {}", d.platform.display_name());
    let _ = writeln!(out, "Deployment ID: {}", d.deployment_id);
    if !d.url.is_empty() {
        let _ = writeln!(out, "URL: {}", d.url);
    }
    let _ = writeln!(out, "Status: {}", d.status);
    if let Some(ms) = d.build_time_ms {
        let _ = writeln!(out, "Build Time: {ms}ms");
    }
    if let Some(region) = &d.region {
        let _ = writeln!(out, "Region: {region}");
    }
    if let Some(cost) = d.cost {
        let _ = writeln!(out, "Cost: ${cost:.2}");
    }
    let _ = write!(out, "Created: {}", d.timestamp.to_rfc3339());
    out
}

fn deployment_row(out: &mut String, d: &DeploymentResult) {
    let _ = write!(out, "- [{}] {} | {}", d.platform, d.deployment_id, d.status);
    if !d.url.is_empty() {
        let _ = write!(out, " | {}", d.url);
    }
    let _ = writeln!(out, " | {}", d.timestamp.to_rfc3339());
}

/// Newest-first listing followed by per-platform failures.
#[must_use]
pub fn deployment_list(
    heading: &str,
    deployments: &[DeploymentResult],
    errors: &[(Platform, DeployError)],
) -> String {
    let mut out = String::new();
    if deployments.is_empty() {
        out.push_str("No deployments found\n");
    } else {
        let _ = writeln!(out, "{heading} ({}):", deployments.len());
        for d in deployments {
            deployment_row(&mut out, d);
        }
    }
    if !errors.is_empty() {
        out.push_str("\nErrors:\n");
        for (platform, e) in errors {
            let _ = writeln!(out, "- {platform}: {e}");
        }
    }
    out.trim_end().to_string()
}

#[must_use]
pub fn cost_comparison(
    project_name: &str,
    lines: &[CostLine],
    errors: &[(Platform, DeployError)],
) -> String {
    let mut out = format!("Cost comparison for '{project_name}':\n\n");
    for line in lines {
        let a = &line.analytics;
        let _ = write!(
            out,
            "{}: ${:.2}/month",
            line.platform.display_name(),
            line.monthly_cost
        );
        if line.estimated {
            out.push_str(" (estimated, no deployments yet)");
        }
        let _ = writeln!(
            out,
            " | Performance: {}/100 | Avg build: {} | Success rate: {} | Deployments: {}",
            a.performance_score,
            seconds(a.average_build_time_ms),
            percent(a.success_rate),
            a.total_deployments
        );
    }
    for (platform, e) in errors {
        error_line(&mut out, *platform, e);
    }
    let cheapest = lines
        .iter()
        .min_by(|a, b| a.monthly_cost.total_cmp(&b.monthly_cost));
    if let Some(c) = cheapest {
        let _ = write!(
            out,
            "\nCheapest: {} (${:.2}/month)",
            c.platform.display_name(),
            c.monthly_cost
        );
    }
    out.trim_end().to_string()
}

fn analytics_block(out: &mut String, a: &PlatformAnalytics) {
    let _ = writeln!(out, "{}:", a.platform.display_name());
    let _ = writeln!(out, "  Deployments: {}", a.total_deployments);
    let _ = writeln!(out, "  Success rate: {}", percent(a.success_rate));
    let _ = writeln!(out, "  Avg build time: {}", seconds(a.average_build_time_ms));
    let _ = writeln!(out, "  Total cost: ${:.2}", a.total_cost);
    let _ = writeln!(out, "  Performance score: {}/100", a.performance_score);
    if let Some(ts) = a.last_deployment {
        let _ = writeln!(out, "  Last deployment: {}", ts.to_rfc3339());
    }
}

/// Per-platform blocks, an aggregate across platforms, and the best performer.
///
/// Platforms without deployments for the project are left out; if none have any, the whole
/// report collapses to a single "no data" line (errors are still listed).
#[must_use]
pub fn analytics_report(
    project_name: &str,
    analytics: &[PlatformAnalytics],
    errors: &[(Platform, DeployError)],
) -> String {
    let with_data: Vec<&PlatformAnalytics> =
        analytics.iter().filter(|a| a.total_deployments > 0).collect();

    let mut out = String::new();
    if with_data.is_empty() {
        let _ = writeln!(out, "No analytics data found for project '{project_name}'");
    } else {
        let _ = writeln!(out, "Analytics for '{project_name}':\n");
        for a in &with_data {
            analytics_block(&mut out, a);
            out.push('\n');
        }

        let total: usize = with_data.iter().map(|a| a.total_deployments).sum();
        #[allow(clippy::cast_precision_loss)]
        let weighted_success = with_data
            .iter()
            .map(|a| a.success_rate * a.total_deployments as f64)
            .sum::<f64>()
            / total as f64;
        let cost: f64 = with_data.iter().map(|a| a.total_cost).sum();
        out.push_str("Summary:\n");
        let _ = writeln!(out, "  Total deployments: {total}");
        let _ = writeln!(out, "  Overall success rate: {}", percent(weighted_success));
        let _ = writeln!(out, "  Total cost: ${cost:.2}");

        if let Some(best) = with_data
            .iter()
            .max_by(|a, b| a.performance_score.total_cmp(&b.performance_score))
        {
            let _ = writeln!(
                out,
                "\nBest performer: {} ({}/100)",
                best.platform.display_name(),
                best.performance_score
            );
        }
    }
    if !errors.is_empty() {
        out.push('\n');
        for (platform, e) in errors {
            error_line(&mut out, *platform, e);
        }
    }
    out.trim_end().to_string()
}
