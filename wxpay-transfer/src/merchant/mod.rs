//! Merchant credentials and configuration.
//!
//! - [`PayConfig`]: TOML description of the merchants the process acts for
//! - [`CredentialStore`]: immutable registry built once from a [`PayConfig`]
//! - [`MerchantContext`]: resolved, in-memory material for one merchant
//! - [`MerchantKey`]: selects a merchant, with an explicit default sentinel

pub mod config;
pub mod context;
mod secret;
pub mod store;

pub use config::{CertFormat, MerchantConfig, PayConfig, SecretSource};
pub use context::{ClientCertificate, MerchantContext, MerchantKey, ProviderPublicKey};
pub use secret::Secret;
pub use store::CredentialStore;
