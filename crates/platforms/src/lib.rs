//! Deployment platform adapters behind one contract.
//!
//! - [`model`]: platforms, configs, normalized results
//! - [`validation`]: raw tool arguments -> typed values
//! - [`adapter`]: the [`PlatformAdapter`] trait and shared HTTP helper
//! - [`cloudflare`], [`vercel`], [`railway`]: the provider adapters
//! - [`registry`]: platform id -> [`AdapterHandle`] (auth gate, serialization, failure policy)

pub mod adapter;
pub mod analytics;
pub mod cloudflare;
pub mod credentials;
pub mod error;
pub mod model;
pub mod policy;
pub mod railway;
pub mod registry;
pub mod validation;
pub mod vercel;

pub use adapter::PlatformAdapter;
pub use analytics::PricingModel;
pub use credentials::Credentials;
pub use error::{DeployError, Result};
pub use model::{
    DeploymentConfig, DeploymentResult, DeploymentStatus, DeploymentTemplate, Environment,
    Platform, PlatformAnalytics, ProjectName,
};
pub use policy::{FailurePolicy, Operation, Settled};
pub use registry::{AdapterHandle, AdapterRegistry, ProviderEndpoints};
