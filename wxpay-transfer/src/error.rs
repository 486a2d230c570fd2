//! Error types for the transfer client.
//!
//! Every fault the pipeline can raise is a [`TransferError`]. The variants follow the
//! failure taxonomy of the money-movement protocol:
//!
//! - **Configuration** ([`TransferError::Configuration`]): unknown merchant, missing key
//!   material. Fatal, never retried.
//! - **Validation** ([`TransferError::Validation`]): the caller's request cannot be encoded.
//!   Fatal for that call; fix the input.
//! - **Encryption** ([`TransferError::Encryption`]): sensitive fields could not be encrypted.
//!   The request is never signed or sent.
//! - **Transport** ([`TransferError::Transport`]): network, TLS or timeout failure. Retryable by
//!   the caller with a fresh nonce, never retried inside the crate.
//! - **Protocol** ([`TransferError::Protocol`]): the provider answered with something that is
//!   not a well-formed response document. Provider-side state is unknown.
//!
//! Business outcomes reported by the provider (insufficient balance, unverified payee, ...)
//! are not errors. They are returned as
//! [`TransferResult::BusinessFailure`](crate::protocol::TransferResult::BusinessFailure).
//!
//! # Examples
//!
//! ```
//! use wxpay_transfer::error::{TransferError, ValidationError};
//!
//! let err = TransferError::from(ValidationError::FieldTooLong { field: "desc", max: 100 });
//! assert!(err.is_pre_dispatch());
//! assert!(err.to_string().contains("desc"));
//! ```

use thiserror::Error;

/// Result type alias for transfer operations.
pub type Result<T> = std::result::Result<T, TransferError>;

/// Errors that can occur while preparing or dispatching a transfer request.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum TransferError {
    /// Merchant configuration is missing or unusable.
    ///
    /// # Recovery
    ///
    /// Fix the configuration and restart. Never retried.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The request failed local validation and was not sent.
    ///
    /// # Recovery
    ///
    /// Correct the request fields and submit again.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Sensitive field encryption failed; the request was not signed or sent.
    ///
    /// Common causes include a malformed provider public key or a missing bank-card field.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Network, TLS or timeout failure while talking to the provider.
    ///
    /// # Recovery
    ///
    /// The provider-side outcome is unknown when `kind` is [`TransportFailureKind::Timeout`]
    /// or [`TransportFailureKind::Body`]. Reconcile through the query operation before
    /// submitting again, and always use a fresh nonce.
    #[error("transport failure ({kind}): {message}")]
    Transport {
        /// Where in the exchange the failure happened.
        kind: TransportFailureKind,
        /// Human-readable cause.
        message: String,
    },

    /// The provider response could not be interpreted.
    ///
    /// # Recovery
    ///
    /// Do not retry automatically. Query the transfer and investigate.
    #[error("protocol failure: {0}")]
    Protocol(String),
}

impl TransferError {
    /// Returns `true` when the request provably never left the process.
    #[must_use]
    pub const fn is_pre_dispatch(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Validation(_) | Self::Encryption(_))
    }

    /// Creates a transport error of the given kind.
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for constructor helpers"
    )]
    pub fn transport(kind: TransportFailureKind, message: impl Into<String>) -> Self {
        Self::Transport { kind, message: message.into() }
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportFailureKind::Timeout
        } else if err.is_connect() {
            TransportFailureKind::Connect
        } else if err.is_body() || err.is_decode() {
            TransportFailureKind::Body
        } else {
            TransportFailureKind::Request
        };
        Self::Transport { kind, message: err.to_string() }
    }
}

/// Stage of the HTTP exchange at which a transport failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportFailureKind {
    /// Connection or TLS handshake could not be established. The request was not delivered.
    Connect,
    /// Client-side timeout elapsed.
    Timeout,
    /// Request failed after the connection was established.
    Request,
    /// Response body could not be read to completion.
    Body,
}

impl TransportFailureKind {
    /// Returns `true` when the provider may have received and processed the request.
    #[must_use]
    pub const fn outcome_unknown(self) -> bool {
        !matches!(self, Self::Connect)
    }
}

impl std::fmt::Display for TransportFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Request => "request",
            Self::Body => "body",
        };
        f.write_str(name)
    }
}

/// Configuration problems detected while loading or resolving merchants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No merchant is configured under this key.
    #[error("unknown merchant: {0}")]
    UnknownMerchant(String),

    /// Required key material is absent for a merchant.
    #[error("merchant {merchant} is missing {material}")]
    MissingKeyMaterial {
        /// Merchant number in the configuration.
        merchant: String,
        /// Which piece of material is missing.
        material: &'static str,
    },

    /// Peer transfers need an app id and none was configured or supplied.
    #[error("merchant {0} has no app id for peer transfers")]
    MissingAppId(String),

    /// The client certificate could not be turned into a TLS identity.
    #[error("invalid client certificate for merchant {merchant}: {reason}")]
    InvalidCertificate {
        /// Merchant number in the configuration.
        merchant: String,
        /// Underlying TLS error.
        reason: String,
    },

    /// Configuration file or value is malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Request fields that cannot be encoded for the provider.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is absent or empty.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A field exceeds the provider's length limit.
    #[error("field '{field}' exceeds {max} bytes")]
    FieldTooLong {
        /// Wire name of the field.
        field: &'static str,
        /// Maximum length in bytes.
        max: usize,
    },

    /// A field contains characters the provider rejects.
    #[error("field '{field}' is invalid: {reason}")]
    InvalidField {
        /// Wire name of the field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The amount is zero or negative after conversion to minor units.
    #[error("amount must be at least one minor unit, got {0}")]
    AmountNotPositive(String),

    /// The amount does not fit the provider's integer range.
    #[error("amount {0} is out of range")]
    AmountOverflow(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = TransferError::Encryption("bad key".into());
        assert_eq!(error.to_string(), "encryption failed: bad key");
    }

    #[test]
    fn test_unknown_merchant_display() {
        let error = TransferError::from(ConfigurationError::UnknownMerchant("7".into()));
        assert_eq!(error.to_string(), "configuration error: unknown merchant: 7");
    }

    #[test]
    fn test_field_too_long_display() {
        let error = ValidationError::FieldTooLong { field: "desc", max: 100 };
        assert_eq!(error.to_string(), "field 'desc' exceeds 100 bytes");
    }

    #[test]
    fn test_pre_dispatch_classification() {
        assert!(TransferError::from(ValidationError::MissingField("openid")).is_pre_dispatch());
        assert!(TransferError::Encryption("x".into()).is_pre_dispatch());
        assert!(
            TransferError::from(ConfigurationError::MissingAppId("1".into())).is_pre_dispatch()
        );
        assert!(!TransferError::Protocol("x".into()).is_pre_dispatch());
        assert!(
            !TransferError::transport(TransportFailureKind::Timeout, "slow").is_pre_dispatch()
        );
    }

    #[test]
    fn test_transport_display_includes_kind() {
        let error = TransferError::transport(TransportFailureKind::Connect, "reset by peer");
        assert_eq!(error.to_string(), "transport failure (connect): reset by peer");
    }

    #[test]
    fn test_outcome_unknown_by_kind() {
        assert!(!TransportFailureKind::Connect.outcome_unknown());
        assert!(TransportFailureKind::Timeout.outcome_unknown());
        assert!(TransportFailureKind::Request.outcome_unknown());
        assert!(TransportFailureKind::Body.outcome_unknown());
    }
}
