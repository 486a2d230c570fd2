//! wxpay-transfer: signed money movement for mobile-payment merchants
//!
//! A client for the merchant transfer API of a mobile-payment provider: wallet
//! transfers to a payee's balance, bank-card disbursements, and status queries for
//! both. Every request is a flat, signed XML document sent over mutual TLS with the
//! merchant's own client certificate.
//!
//! # What does it guarantee?
//!
//! - **Merchant isolation**: a request is signed with, and presented under, the
//!   credentials of exactly one merchant
//! - **Canonical signing**: fields are sorted, empty values are dropped and the digest is
//!   computed over exactly the bytes that are sent
//! - **Sensitive data protection**: bank numbers and real names are RSA-OAEP encrypted
//!   before signing and wiped from memory afterwards
//! - **Fresh nonce per attempt**: nothing is retried inside the crate
//! - **Total outcome classification**: every dispatched request ends in exactly one
//!   [`TransferResult`](protocol::TransferResult)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  TransferRequest │  peer transfer, bank-card transfer, queries
//! └────────┬─────────┘
//!          │
//! ┌────────▼──────────────────────────────────────────────┐
//! │                    TransferClient                      │
//! │  CredentialStore ─► build ─► encrypt ─► sign ─► send   │
//! │                                               │        │
//! │                         TransferResult ◄─ interpret    │
//! └────────┬──────────────────────────────────────────────┘
//!          │ HTTPS + client certificate (per merchant)
//! ┌────────▼─────────┐
//! │  Provider API    │
//! └──────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## 1. Configure merchants
//!
//! ```toml
//! default_merchant = 1
//!
//! [merchants.1]
//! mch_id = "1900000109"
//! app_id = "wx8888888888888888"
//! sign_key = { env = "WXPAY_SIGN_KEY" }
//! client_cert = { file = "/etc/wxpay/apiclient_cert.p12" }
//! cert_password = { env = "WXPAY_CERT_PASSWORD" }
//! public_key = { file = "/etc/wxpay/provider_public.pem" }
//! ```
//!
//! ## 2. Transfer
//!
//! ```rust,no_run
//! use rust_decimal::Decimal;
//! use wxpay_transfer::{
//!     PayConfig, TransferClient,
//!     merchant::MerchantKey,
//!     protocol::{PeerTransfer, TransferResult},
//! };
//!
//! # async fn example() -> wxpay_transfer::Result<()> {
//! let config = PayConfig::from_file("wxpay.toml")?;
//! let client = TransferClient::from_config(&config)?;
//!
//! let transfer = PeerTransfer::new(
//!     "T202401010001",
//!     "oUpF8uMuAJO_M2pxb1Q9zNjWeS6o",
//!     Decimal::new(1234, 2),
//!     "refund",
//! );
//!
//! match client.peer_transfer(MerchantKey::Default, transfer).await? {
//!     TransferResult::Success(receipt) => println!("paid: {:?}", receipt.payment_no()),
//!     TransferResult::BusinessFailure(failure) => println!("declined: {failure}"),
//!     other if other.outcome_unknown() => println!("query before retrying: {other:?}"),
//!     other => println!("not delivered: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## 3. Sign parameters directly
//!
//! ```rust
//! use wxpay_transfer::protocol::{SignType, SigningKey, sign};
//!
//! let key = SigningKey::new("192006250b4c09247ec02edce69f6a2d", SignType::Md5);
//! let signature = sign(
//!     [
//!         ("appid", "wxd930ea5d5a258f4f"),
//!         ("mch_id", "10000100"),
//!         ("device_info", "1000"),
//!         ("body", "test"),
//!         ("nonce_str", "ibuaiVcKdpRxkhJA"),
//!     ],
//!     &key,
//! );
//! assert_eq!(signature, "9A0A8659F005D6984697E2CA0A9CF3B7");
//! ```
//!
//! # Module Organization
//!
//! - [`client`]: the end-to-end pipeline
//! - [`merchant`]: configuration and the read-only credential store
//! - [`protocol`]: field tables, parameter builder, encryptor, signer, document codec and
//!   response interpreter
//! - [`transport`]: sealed transport abstraction and the mutual-TLS HTTP transport
//! - [`audit`]: structured audit events for money movement
//! - [`error`]: error types with recovery guidance
//!
//! # Error Handling
//!
//! Operations return [`Result<T, TransferError>`](error::Result). An `Err` means the
//! request never left the process. Anything that happens after dispatch is a
//! [`TransferResult`](protocol::TransferResult):
//!
//! ```rust
//! use wxpay_transfer::{TransferError, error::ValidationError};
//!
//! fn describe(err: &TransferError) -> &'static str {
//!     match err {
//!         TransferError::Configuration(_) => "fix the configuration",
//!         TransferError::Validation(ValidationError::FieldTooLong { .. }) => "shorten a field",
//!         TransferError::Validation(_) => "fix the request",
//!         TransferError::Encryption(_) => "check the provider public key",
//!         TransferError::Transport { .. } | TransferError::Protocol(_) => "reconcile",
//!     }
//! }
//! # let _ = describe;
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from rsa and reqwest"
)]

pub mod audit;
pub mod client;
pub mod error;
pub mod merchant;
pub mod protocol;
pub mod transport;

pub use client::TransferClient;
pub use error::{Result, TransferError};
pub use merchant::{CredentialStore, MerchantKey, PayConfig};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_reexports_load_and_resolve() {
        let config = PayConfig::from_toml(
            r#"
            [merchants.1]
            mch_id = "1900000109"
            sign_key = { value = "192006250b4c09247ec02edce69f6a2d" }
            client_cert = { value = "pkcs12-bytes" }
            cert_password = { value = "pw" }
            "#,
        )
        .unwrap();
        let store = CredentialStore::from_config(&config).unwrap();

        assert_eq!(store.resolve(MerchantKey::default()).unwrap().mch_id(), "1900000109");
        let err: TransferError = store.resolve(MerchantKey::Id(2)).unwrap_err();
        assert!(err.is_pre_dispatch());
    }
}
