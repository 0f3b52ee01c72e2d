//! Outbound HTTP plumbing for the deployment platform adapters.
//!
//! This crate is intended to be used by:
//! - `unrelated-deploy-platforms` (provider adapters)
//! - `unrelated-test-support` (recording transport double)
//!
//! It intentionally knows nothing about providers: adapters build [`ProviderRequest`]s and decide
//! how to interpret the [`ProviderResponse`] they get back.

pub mod redact;
pub mod transport;

pub use reqwest::Method;
pub use transport::{
    HttpTransport, ProviderHttpError, ProviderRequest, ProviderResponse, ReqwestTransport,
    RequestBody, Result,
};
