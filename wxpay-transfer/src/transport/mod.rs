//! Transport layer.
//!
//! A sealed [`Transport`] posts request documents to provider endpoints and returns raw
//! response bodies. [`Transport::send`] wraps that with document encoding and decoding, so
//! every implementation shares one codec.
//!
//! # Failure mapping
//!
//! | Failure | Surfaces as |
//! |---------|-------------|
//! | DNS, TCP, TLS handshake | [`TransferError::Transport`] (`connect`) |
//! | Client-side timeout | [`TransferError::Transport`] (`timeout`) |
//! | Body read error | [`TransferError::Transport`] (`body`) |
//! | Non-2xx status, malformed or truncated document | [`TransferError::Protocol`] |
//!
//! Nothing is retried here.
//!
//! [`TransferError::Transport`]: crate::error::TransferError::Transport
//! [`TransferError::Protocol`]: crate::error::TransferError::Protocol

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;

use crate::{
    error::Result,
    merchant::MerchantContext,
    protocol::{ResponseFields, SignedEnvelope, xml},
};

pub mod config;
pub mod endpoint;
pub mod http;
#[cfg(test)]
pub(crate) mod mock;
mod sealed;

pub use config::{HttpConfig, HttpVersion};
pub use endpoint::Endpoint;
pub use http::HttpTransport;

/// Transport protocol abstraction.
///
/// This trait is sealed: request delivery is part of the money-movement path, and only
/// implementations within this crate are allowed.
pub trait Transport: sealed::private::Sealed + Send + Sync {
    /// Posts a request document for a merchant and returns the response body.
    ///
    /// The connection must authenticate with `merchant`'s client certificate and nobody
    /// else's.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Transport`](crate::error::TransferError::Transport) on
    /// network failures and [`TransferError::Protocol`](crate::error::TransferError::Protocol)
    /// on a non-success HTTP status.
    fn post<'a>(
        &'a self,
        merchant: &'a MerchantContext,
        endpoint: Endpoint,
        body: String,
    ) -> impl Future<Output = Result<String>> + Send + 'a;

    /// Returns the protocol name for logging.
    fn protocol_name(&self) -> &'static str;

    /// Serializes a signed envelope, posts it and parses the response document.
    ///
    /// # Errors
    ///
    /// Same as [`Transport::post`], plus
    /// [`TransferError::Protocol`](crate::error::TransferError::Protocol) for a response
    /// that is not a well-formed flat document.
    fn send<'a>(
        &'a self,
        envelope: &'a SignedEnvelope,
        merchant: &'a MerchantContext,
        endpoint: Endpoint,
    ) -> impl Future<Output = Result<ResponseFields>> + Send + 'a {
        async move {
            let body = envelope.to_document();
            let raw = self.post(merchant, endpoint, body).await?;
            xml::decode(&raw)
        }
    }
}
