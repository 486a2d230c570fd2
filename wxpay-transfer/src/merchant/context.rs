//! Resolved, in-memory merchant credentials.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Secret;
use crate::protocol::SigningKey;

/// Selects the merchant a call acts for.
///
/// `Default` resolves to the configured default merchant, so callers that only ever use
/// one merchant never have to name it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MerchantKey {
    /// The configured default merchant.
    #[default]
    Default,
    /// A specific merchant number.
    Id(u32),
}

impl From<u32> for MerchantKey {
    fn from(value: u32) -> Self {
        Self::Id(value)
    }
}

impl From<Option<u32>> for MerchantKey {
    fn from(value: Option<u32>) -> Self {
        value.map_or(Self::Default, Self::Id)
    }
}

impl fmt::Display for MerchantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Client certificate material for mutual TLS.
#[derive(Clone, PartialEq, Eq)]
pub enum ClientCertificate {
    /// PKCS#12 bundle and its password.
    Pkcs12 {
        /// DER-encoded bundle.
        der: Secret,
        /// Bundle password. The provider issues bundles protected by the merchant id.
        password: Secret,
    },
    /// PEM certificate chain and PKCS#8 private key.
    Pem {
        /// PEM certificate chain.
        cert: Vec<u8>,
        /// PEM private key.
        key: Secret,
    },
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pkcs12 { der, .. } => f
                .debug_struct("Pkcs12")
                .field("der", der)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::Pem { cert, key } => f
                .debug_struct("Pem")
                .field("cert_len", &cert.len())
                .field("key", key)
                .finish(),
        }
    }
}

/// Provider RSA public key used for field encryption, kept as PEM.
///
/// The key is parsed when used, so a malformed key surfaces as an encryption failure of
/// the disbursement rather than a startup failure for every merchant.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderPublicKey {
    pem: Vec<u8>,
}

impl ProviderPublicKey {
    /// Wraps PEM-encoded key bytes (PKCS#1 or SubjectPublicKeyInfo).
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<Vec<u8>> accepts both owned and borrowed PEM"
    )]
    pub fn from_pem(pem: impl Into<Vec<u8>>) -> Self {
        Self { pem: pem.into() }
    }

    /// PEM bytes.
    #[must_use]
    pub fn pem(&self) -> &[u8] {
        &self.pem
    }
}

impl fmt::Debug for ProviderPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProviderPublicKey({} bytes)", self.pem.len())
    }
}

/// Everything needed to act for one merchant.
///
/// Immutable once built. The credential store hands out shared references, so concurrent
/// calls for the same merchant read the same material and calls for different merchants
/// never share any.
///
/// # Examples
///
/// ```
/// use wxpay_transfer::{
///     merchant::{ClientCertificate, MerchantContext, Secret},
///     protocol::{SignType, SigningKey},
/// };
///
/// let context = MerchantContext::new(
///     1,
///     "1900000109",
///     SigningKey::new("192006250b4c09247ec02edce69f6a2d", SignType::Md5),
///     ClientCertificate::Pkcs12 { der: Secret::new(vec![0x30]), password: Secret::from("1900000109") },
/// )
/// .with_app_id("wx8888888888888888");
///
/// assert_eq!(context.mch_id(), "1900000109");
/// assert_eq!(context.app_id(), Some("wx8888888888888888"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantContext {
    number: u32,
    mch_id: String,
    app_id: Option<String>,
    signing_key: SigningKey,
    certificate: ClientCertificate,
    public_key: Option<ProviderPublicKey>,
    spbill_create_ip: Option<String>,
}

impl MerchantContext {
    /// Creates a context with the mandatory material.
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for constructors"
    )]
    pub fn new(
        number: u32,
        mch_id: impl Into<String>,
        signing_key: SigningKey,
        certificate: ClientCertificate,
    ) -> Self {
        Self {
            number,
            mch_id: mch_id.into(),
            app_id: None,
            signing_key,
            certificate,
            public_key: None,
            spbill_create_ip: None,
        }
    }

    /// Sets the app id used for peer transfers.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Sets the provider public key for bank-card disbursements.
    #[must_use]
    pub fn with_public_key(mut self, key: ProviderPublicKey) -> Self {
        self.public_key = Some(key);
        self
    }

    /// Sets the caller IP announced on peer transfers.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_spbill_create_ip(mut self, ip: impl Into<String>) -> Self {
        self.spbill_create_ip = Some(ip.into());
        self
    }

    /// Merchant number in the configuration.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Provider-assigned merchant id.
    #[must_use]
    pub fn mch_id(&self) -> &str {
        &self.mch_id
    }

    /// Configured app id.
    #[must_use]
    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    /// API signing key.
    #[must_use]
    pub const fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Mutual-TLS client certificate.
    #[must_use]
    pub const fn certificate(&self) -> &ClientCertificate {
        &self.certificate
    }

    /// Provider public key, if configured.
    #[must_use]
    pub const fn public_key(&self) -> Option<&ProviderPublicKey> {
        self.public_key.as_ref()
    }

    /// Caller IP for peer transfers, if configured.
    #[must_use]
    pub fn spbill_create_ip(&self) -> Option<&str> {
        self.spbill_create_ip.as_deref()
    }
}
