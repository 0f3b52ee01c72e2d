//! Input validation and sanitization for tool arguments.
//!
//! Every function here is total: it returns either the typed, sanitized value or a
//! [`DeployError::Validation`] naming the offending field. Composite inputs are validated
//! all-or-nothing and the first violation wins.
//!
//! Sanitization runs *before* schema checks so a payload cannot smuggle control sequences or
//! markup through a check that only looks at the cleaned-up value.

use crate::error::{DeployError, Result};
use crate::model::{
    DeploymentConfig, DeploymentTemplate, Environment, Platform, ProjectName,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;

pub const PROJECT_NAME_FIELD: &str = "project name";
pub const MAX_PROJECT_NAME_LEN: usize = 100;
pub const MAX_IDENTIFIER_LEN: usize = 200;
pub const MAX_BUILD_COMMAND_LEN: usize = 500;
pub const MAX_OUTPUT_DIRECTORY_LEN: usize = 255;
pub const MAX_DOMAIN_LEN: usize = 253;
pub const MAX_CUSTOM_DOMAINS: usize = 10;
pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const MAX_LIST_LIMIT: usize = 100;

static PROJECT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid project name regex"));
static ENV_VAR_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid env var regex"));
static REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]{1,32}$").expect("valid region regex"));
static DOMAIN_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("valid domain label regex")
});

fn is_stripped(c: char) -> bool {
    matches!(c, '<' | '>' | '\'' | '"' | '\\' | '/') || c.is_control()
}

/// Strip angle brackets, quotes, slashes, backslashes and control characters, then trim.
#[must_use]
pub fn sanitize_string(input: &str) -> String {
    input
        .chars()
        .filter(|c| !is_stripped(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Validate a project name: sanitization must leave it untouched and it must match
/// `^[A-Za-z0-9_-]{1,100}$`.
///
/// # Errors
///
/// Returns a validation error whose message names "project name".
pub fn validate_project_name(raw: &str) -> Result<String> {
    let sanitized = sanitize_string(raw);
    if sanitized.is_empty() {
        return Err(DeployError::validation(
            PROJECT_NAME_FIELD,
            "project name must not be empty",
        ));
    }
    if sanitized != raw {
        return Err(DeployError::validation(
            PROJECT_NAME_FIELD,
            "project name contains disallowed characters (quotes, slashes, angle brackets, control characters or surrounding whitespace)",
        ));
    }
    if sanitized.chars().count() > MAX_PROJECT_NAME_LEN {
        return Err(DeployError::validation(
            PROJECT_NAME_FIELD,
            format!("project name must be at most {MAX_PROJECT_NAME_LEN} characters"),
        ));
    }
    if !PROJECT_NAME_RE.is_match(&sanitized) {
        return Err(DeployError::validation(
            PROJECT_NAME_FIELD,
            "project name may only contain letters, digits, hyphens and underscores",
        ));
    }
    Ok(sanitized)
}

/// # Errors
///
/// Returns a "not supported" error listing the allowed platforms.
pub fn parse_platform(raw: &str) -> Result<Platform> {
    sanitize_string(raw).parse()
}

/// # Errors
///
/// Returns a validation error listing the allowed environments.
pub fn parse_environment(raw: &str) -> Result<Environment> {
    sanitize_string(raw).parse()
}

/// Validate an opaque identifier (deployment id, team id).
///
/// # Errors
///
/// Returns a validation error naming `field` if the sanitized value is empty or too long.
pub fn validate_identifier(field: &str, raw: &str) -> Result<String> {
    let sanitized = sanitize_string(raw);
    if sanitized.is_empty() {
        return Err(DeployError::validation(field, "must not be empty"));
    }
    if sanitized.len() > MAX_IDENTIFIER_LEN {
        return Err(DeployError::validation(
            field,
            format!("must be at most {MAX_IDENTIFIER_LEN} characters"),
        ));
    }
    Ok(sanitized)
}

/// # Errors
///
/// Returns a validation error if the sanitized region is not a short lowercase slug.
pub fn validate_region(raw: &str) -> Result<String> {
    let sanitized = sanitize_string(raw);
    if !REGION_RE.is_match(&sanitized) {
        return Err(DeployError::validation(
            "region",
            "must be 1-32 lowercase letters, digits or hyphens",
        ));
    }
    Ok(sanitized)
}

/// Build commands keep their shell syntax; only control characters and length are checked.
///
/// # Errors
///
/// Returns a validation error naming "build command".
pub fn validate_build_command(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DeployError::validation("build command", "must not be empty"));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(DeployError::validation(
            "build command",
            "must not contain control characters",
        ));
    }
    if trimmed.len() > MAX_BUILD_COMMAND_LEN {
        return Err(DeployError::validation(
            "build command",
            format!("must be at most {MAX_BUILD_COMMAND_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Output directories are relative paths: `/` is allowed, traversal and markup are not.
///
/// # Errors
///
/// Returns a validation error naming "output directory".
pub fn validate_output_directory(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DeployError::validation("output directory", "must not be empty"));
    }
    if trimmed.len() > MAX_OUTPUT_DIRECTORY_LEN {
        return Err(DeployError::validation(
            "output directory",
            format!("must be at most {MAX_OUTPUT_DIRECTORY_LEN} characters"),
        ));
    }
    if trimmed
        .chars()
        .any(|c| c != '/' && is_stripped(c))
    {
        return Err(DeployError::validation(
            "output directory",
            "must not contain quotes, backslashes, angle brackets or control characters",
        ));
    }
    if trimmed.starts_with('/') || trimmed.split('/').any(|seg| seg == "..") {
        return Err(DeployError::validation(
            "output directory",
            "must be a relative path without '..' segments",
        ));
    }
    Ok(trimmed.to_string())
}

/// # Errors
///
/// Returns a validation error naming "custom domain" if `raw` is not a valid hostname.
pub fn validate_domain(raw: &str) -> Result<String> {
    let domain = sanitize_string(raw).to_ascii_lowercase();
    let valid = !domain.is_empty()
        && domain.len() <= MAX_DOMAIN_LEN
        && domain.contains('.')
        && domain.split('.').all(|label| DOMAIN_LABEL_RE.is_match(label));
    if !valid {
        return Err(DeployError::validation(
            "custom domain",
            format!("'{domain}' is not a valid hostname"),
        ));
    }
    Ok(domain)
}

/// # Errors
///
/// Returns a validation error naming the first bad variable.
pub fn validate_environment_variables(
    vars: BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for (name, value) in vars {
        let clean_name = sanitize_string(&name);
        if !ENV_VAR_NAME_RE.is_match(&clean_name) || clean_name != name {
            return Err(DeployError::validation(
                "environment variable name",
                format!("'{clean_name}' must match [A-Za-z_][A-Za-z0-9_]*"),
            ));
        }
        if value.contains(['\r', '\n', '\0']) {
            return Err(DeployError::validation(
                format!("environment variable {name}"),
                "value must not contain line breaks or NUL",
            ));
        }
        out.insert(name, value);
    }
    Ok(out)
}

/// Validate an optional list limit (default 20, range 1..=100).
///
/// # Errors
///
/// Returns a validation error naming "limit".
pub fn validate_limit(raw: Option<&Value>) -> Result<usize> {
    let Some(v) = raw.filter(|v| !v.is_null()) else {
        return Ok(DEFAULT_LIST_LIMIT);
    };
    let n = v
        .as_u64()
        .ok_or_else(|| DeployError::validation("limit", "must be an integer"))?;
    let n = usize::try_from(n).unwrap_or(usize::MAX);
    if !(1..=MAX_LIST_LIMIT).contains(&n) {
        return Err(DeployError::validation(
            "limit",
            format!("must be between 1 and {MAX_LIST_LIMIT}"),
        ));
    }
    Ok(n)
}

/// Fetch a required string argument.
///
/// # Errors
///
/// Returns a validation error if the field is missing or not a string.
pub fn required_str<'a>(args: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    match args.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Null) | None => Err(DeployError::validation(field, "is required")),
        Some(_) => Err(DeployError::validation(field, "must be a string")),
    }
}

/// Parse an optional list of platform ids; `None` when absent or empty.
///
/// # Errors
///
/// Returns a validation error for non-string entries and "not supported" for unknown ids.
pub fn optional_platforms(args: &Map<String, Value>, field: &str) -> Result<Option<Vec<Platform>>> {
    let Some(v) = args.get(field).filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let arr = v
        .as_array()
        .ok_or_else(|| DeployError::validation(field, "must be an array of platform ids"))?;
    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        let s = item
            .as_str()
            .ok_or_else(|| DeployError::validation(field, "must be an array of platform ids"))?;
        let p = parse_platform(s)?;
        if !out.contains(&p) {
            out.push(p);
        }
    }
    Ok((!out.is_empty()).then_some(out))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawDeploymentConfig {
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    project_name: Option<String>,
    #[serde(default)]
    environment: Option<String>,
    #[serde(default)]
    build_command: Option<String>,
    #[serde(default)]
    output_directory: Option<String>,
    #[serde(default)]
    environment_variables: Option<BTreeMap<String, String>>,
    #[serde(default)]
    custom_domains: Option<Vec<String>>,
    #[serde(default)]
    region: Option<String>,
}

fn parse_raw_config(value: &Value) -> Result<RawDeploymentConfig> {
    if !value.is_object() {
        return Err(DeployError::validation("config", "must be an object"));
    }
    RawDeploymentConfig::deserialize(value)
        .map_err(|e| DeployError::validation("config", e.to_string()))
}

fn template_from_raw(raw: RawDeploymentConfig) -> Result<DeploymentTemplate> {
    let project_name = raw
        .project_name
        .as_deref()
        .ok_or_else(|| DeployError::validation(PROJECT_NAME_FIELD, "project name is required"))
        .and_then(ProjectName::parse)?;

    let environment = raw
        .environment
        .as_deref()
        .map(parse_environment)
        .transpose()?
        .unwrap_or_default();

    let build_command = raw
        .build_command
        .as_deref()
        .map(validate_build_command)
        .transpose()?;
    let output_directory = raw
        .output_directory
        .as_deref()
        .map(validate_output_directory)
        .transpose()?;
    let environment_variables =
        validate_environment_variables(raw.environment_variables.unwrap_or_default())?;

    let domains = raw.custom_domains.unwrap_or_default();
    if domains.len() > MAX_CUSTOM_DOMAINS {
        return Err(DeployError::validation(
            "custom domains",
            format!("at most {MAX_CUSTOM_DOMAINS} domains are allowed"),
        ));
    }
    let custom_domains = domains
        .iter()
        .map(|d| validate_domain(d))
        .collect::<Result<Vec<_>>>()?;

    let region = raw.region.as_deref().map(validate_region).transpose()?;

    Ok(DeploymentTemplate {
        project_name,
        environment,
        build_command,
        output_directory,
        environment_variables,
        custom_domains,
        region,
    })
}

/// Validate a full deploy config (platform required).
///
/// # Errors
///
/// Returns the first validation failure, or "not supported" for an unknown platform.
pub fn deployment_config(value: &Value) -> Result<DeploymentConfig> {
    let mut raw = parse_raw_config(value)?;
    let platform = raw
        .platform
        .take()
        .ok_or_else(|| DeployError::validation("platform", "is required"))
        .and_then(|p| parse_platform(&p))?;
    Ok(template_from_raw(raw)?.for_platform(platform))
}

/// Validate a deploy config without a platform (a `platform` key, if present, is ignored).
///
/// # Errors
///
/// Returns the first validation failure.
pub fn deployment_template(value: &Value) -> Result<DeploymentTemplate> {
    let mut raw = parse_raw_config(value)?;
    raw.platform = None;
    template_from_raw(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_strips_markup_quotes_slashes_and_controls() {
        assert_eq!(sanitize_string("  <b>hi</b>\r\n"), "bhib");
        assert_eq!(sanitize_string("a'b\"c\\d/e\tf"), "abcdef");
    }

    #[test]
    fn valid_project_names_pass_unchanged() {
        for name in ["my-app", "A_b-9", "x", &"a".repeat(100)] {
            assert_eq!(validate_project_name(name).expect("valid"), name);
        }
    }

    #[test]
    fn invalid_project_names_name_the_field() {
        let long = "a".repeat(101);
        for name in [
            "",
            "bad name!",
            "my<app",
            "my>app",
            "it's",
            "say\"hi\"",
            "a/b",
            "a\\b",
            "line\nbreak",
            "tab\there",
            " padded",
            long.as_str(),
            "émoji",
        ] {
            let err = validate_project_name(name).unwrap_err();
            assert!(
                err.to_string().contains("project name"),
                "{name:?} -> {err}"
            );
        }
    }

    #[test]
    fn output_directory_allows_nested_relative_paths() {
        assert_eq!(validate_output_directory("dist/public").expect("ok"), "dist/public");
        assert!(validate_output_directory("../etc").is_err());
        assert!(validate_output_directory("/abs").is_err());
        assert!(validate_output_directory("out<x>").is_err());
    }

    #[test]
    fn domains_are_hostnames() {
        assert_eq!(validate_domain("App.Example.com").expect("ok"), "app.example.com");
        assert!(validate_domain("localhost").is_err());
        assert!(validate_domain("-bad.example.com").is_err());
    }

    #[test]
    fn env_var_names_and_values_are_checked() {
        let ok = BTreeMap::from([("API_URL".to_string(), "https://x/y?z=1".to_string())]);
        assert_eq!(validate_environment_variables(ok.clone()).expect("ok"), ok);

        let bad_name = BTreeMap::from([("1BAD".to_string(), "v".to_string())]);
        assert!(validate_environment_variables(bad_name).is_err());

        let bad_value = BTreeMap::from([("OK".to_string(), "a\nb".to_string())]);
        let err = validate_environment_variables(bad_value).unwrap_err();
        assert!(err.to_string().contains("environment variable OK"));
    }

    #[test]
    fn limit_defaults_and_bounds() {
        assert_eq!(validate_limit(None).expect("default"), 20);
        assert_eq!(validate_limit(Some(&json!(100))).expect("max"), 100);
        assert!(validate_limit(Some(&json!(0))).is_err());
        assert!(validate_limit(Some(&json!(101))).is_err());
        assert!(validate_limit(Some(&json!("5"))).is_err());
    }

    #[test]
    fn deployment_config_builds_typed_value() {
        let cfg = deployment_config(&json!({
            "platform": "vercel",
            "projectName": "site",
            "environment": "staging",
            "buildCommand": "npm run build",
            "outputDirectory": "dist",
            "environmentVariables": {"NODE_ENV": "production"},
            "customDomains": ["www.example.com"],
            "region": "iad1"
        }))
        .expect("valid config");

        assert_eq!(cfg.platform, Platform::Vercel);
        assert_eq!(cfg.project_name.as_str(), "site");
        assert_eq!(cfg.environment, Environment::Staging);
        assert_eq!(cfg.build_command.as_deref(), Some("npm run build"));
        assert_eq!(cfg.custom_domains, vec!["www.example.com".to_string()]);
        assert!(cfg.has_build_step());
    }

    #[test]
    fn deployment_config_rejects_bad_project_name_first() {
        let err = deployment_config(&json!({
            "platform": "cloudflare",
            "projectName": "bad name!",
            "environment": "nope"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("project name"));
    }

    #[test]
    fn deployment_config_unknown_platform_is_not_supported() {
        let err = deployment_config(&json!({"platform": "heroku", "projectName": "x"})).unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn deployment_config_rejects_unknown_fields() {
        let err = deployment_config(&json!({
            "platform": "vercel",
            "projectName": "x",
            "dockerfile": "Dockerfile"
        }))
        .unwrap_err();
        assert!(matches!(err, DeployError::Validation { ref field, .. } if field == "config"));
    }

    #[test]
    fn template_ignores_platform() {
        let t = deployment_template(&json!({"projectName": "x", "platform": "whatever"}))
            .expect("template");
        assert_eq!(t.project_name.as_str(), "x");
        assert_eq!(t.environment, Environment::Production);
    }

    #[test]
    fn optional_platforms_dedupes_and_rejects_unknown() {
        let args = json!({"platforms": ["vercel", "VERCEL", "railway"]});
        let got = optional_platforms(args.as_object().expect("obj"), "platforms")
            .expect("ok")
            .expect("some");
        assert_eq!(got, vec![Platform::Vercel, Platform::Railway]);

        let args = json!({"platforms": ["nope"]});
        let err = optional_platforms(args.as_object().expect("obj"), "platforms").unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }
}
