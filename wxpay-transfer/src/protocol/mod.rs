//! Wire protocol of the merchant transfer API.
//!
//! The pipeline stages, in the order a request passes through them:
//!
//! 1. [`build`]: typed [`TransferRequest`] to a [`ParameterSet`], driven by the
//!    per-variant tables in [`field_map`]
//! 2. [`encrypt_sensitive_fields`]: RSA-OAEP encryption of bank-card fields
//! 3. [`ParameterSet::sign`]: freezes the set into a [`SignedEnvelope`]
//! 4. [`xml`]: flat document encoding and decoding
//! 5. [`interpret`]: response fields to a [`TransferResult`]

pub mod amount;
pub mod builder;
pub mod encryptor;
pub mod field_map;
pub mod fields;
pub mod interpreter;
pub mod request;
pub mod signer;
pub mod xml;

pub use amount::to_minor_units;
pub use builder::{FORCE_CHECK, NO_CHECK, build, build_with_nonce, generate_nonce};
pub use encryptor::encrypt_sensitive_fields;
pub use field_map::RequestKind;
pub use fields::{ParameterSet, SignedEnvelope};
pub use interpreter::{BusinessFailure, TransferReceipt, TransferResult, TransferStatus, interpret};
pub use request::{BankCardTransfer, PeerTransfer, Sensitive, TransferQuery, TransferRequest};
pub use signer::{SignType, SigningKey, sign, verify};
pub use xml::ResponseFields;
