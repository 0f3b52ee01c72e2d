//! Credential maps as received at the protocol boundary.
//!
//! Adapters never keep the raw map. Each one pulls the fields it knows about with
//! [`Credentials::take_required`] / [`Credentials::take_optional`] and then calls
//! [`Credentials::finish`], which rejects anything left over.

use crate::error::{DeployError, Result};
use crate::model::Platform;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Default)]
pub struct Credentials {
    fields: BTreeMap<String, String>,
}

impl Credentials {
    /// Build from a map; every value must be non-empty after trimming.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first empty or malformed field.
    pub fn new(fields: BTreeMap<String, String>) -> Result<Self> {
        let mut out = BTreeMap::new();
        for (name, value) in fields {
            let key = name.trim().to_string();
            if key.is_empty() {
                return Err(DeployError::validation(
                    "credentials",
                    "field names must not be empty",
                ));
            }
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(DeployError::validation(
                    format!("credentials.{key}"),
                    "must not be empty",
                ));
            }
            if value.chars().any(char::is_control) {
                return Err(DeployError::validation(
                    format!("credentials.{key}"),
                    "must not contain control characters",
                ));
            }
            out.insert(key, value);
        }
        Ok(Self { fields: out })
    }

    /// Parse the `credentials` tool argument (an object of string values).
    ///
    /// # Errors
    ///
    /// Returns a validation error if the value is not an object of non-empty strings.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| DeployError::validation("credentials", "must be an object"))?;
        let mut fields = BTreeMap::new();
        for (k, v) in obj {
            let s = v.as_str().ok_or_else(|| {
                DeployError::validation(format!("credentials.{k}"), "must be a string")
            })?;
            fields.insert(k.clone(), s.to_string());
        }
        Self::new(fields)
    }

    /// # Errors
    ///
    /// Returns a validation error if `name` is missing.
    pub fn take_required(&mut self, platform: Platform, name: &str) -> Result<String> {
        self.fields.remove(name).ok_or_else(|| {
            DeployError::validation(
                format!("credentials.{name}"),
                format!("is required for {platform}"),
            )
        })
    }

    pub fn take_optional(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// Reject any field the adapter did not take.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first unexpected field.
    pub fn finish(self, platform: Platform) -> Result<()> {
        match self.fields.into_keys().next() {
            Some(extra) => Err(DeployError::validation(
                format!("credentials.{extra}"),
                format!("is not a recognized credential field for {platform}"),
            )),
            None => Ok(()),
        }
    }

    /// All values, for redacting provider messages during authentication.
    #[must_use]
    pub fn secret_values(&self) -> Vec<String> {
        self.fields.values().cloned().collect()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.fields.keys()).finish()
    }
}
