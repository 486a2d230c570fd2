//! Request and response signatures.
//!
//! The provider signs a flat field set as follows:
//!
//! 1. drop the `sign` field and every field with an empty value,
//! 2. sort the remaining fields by name (byte order),
//! 3. join them as `name=value` pairs separated by `&`,
//! 4. append `&key=<signing key>`,
//! 5. digest with the merchant's [`SignType`] and render as uppercase hex.
//!
//! # Examples
//!
//! ```
//! use wxpay_transfer::protocol::{SignType, SigningKey, sign};
//!
//! let key = SigningKey::new("192006250b4c09247ec02edce69f6a2d", SignType::Md5);
//! let fields = [
//!     ("appid", "wxd930ea5d5a258f4f"),
//!     ("mch_id", "10000100"),
//!     ("device_info", "1000"),
//!     ("body", "test"),
//!     ("nonce_str", "ibuaiVcKdpRxkhJA"),
//! ];
//!
//! assert_eq!(sign(fields, &key), "9A0A8659F005D6984697E2CA0A9CF3B7");
//! ```

use std::fmt;

use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::merchant::Secret;

/// Name of the signature field in request and response documents.
pub const SIGN_FIELD: &str = "sign";

/// Name of the field announcing a non-default digest.
pub const SIGN_TYPE_FIELD: &str = "sign_type";

/// Digest used to compute signatures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignType {
    /// MD5 over the signing string. The only digest the transfer endpoints accept.
    #[default]
    #[serde(rename = "md5", alias = "MD5")]
    Md5,
    /// HMAC-SHA256 keyed with the signing key.
    #[serde(rename = "hmac_sha256", alias = "HMAC-SHA256")]
    HmacSha256,
}

impl SignType {
    /// Value sent in the `sign_type` field.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::HmacSha256 => "HMAC-SHA256",
        }
    }
}

impl fmt::Display for SignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Merchant API key together with the digest it is used with.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey {
    secret: Secret,
    sign_type: SignType,
}

impl SigningKey {
    /// Creates a signing key.
    pub fn new(secret: impl Into<Secret>, sign_type: SignType) -> Self {
        Self { secret: secret.into(), sign_type }
    }

    /// Digest this key signs with.
    #[must_use]
    pub const fn sign_type(&self) -> SignType {
        self.sign_type
    }

    pub(crate) fn secret(&self) -> &Secret {
        &self.secret
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("secret", &self.secret)
            .field("sign_type", &self.sign_type)
            .finish()
    }
}

/// Builds the canonical `name=value&...` string, without the key suffix.
///
/// Fields are sorted here, so callers may pass them in any order.
pub fn signing_string<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = fields
        .into_iter()
        .filter(|(name, value)| *name != SIGN_FIELD && !value.is_empty())
        .collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut out = String::with_capacity(pairs.iter().map(|(k, v)| k.len() + v.len() + 2).sum());
    for (i, (name, value)) in pairs.into_iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(name);
        out.push('=');
        out.push_str(value);
    }
    out
}

/// Computes the signature of a field set.
///
/// Deterministic for a given field set and key. The `sign` field, if present, is ignored.
pub fn sign<'a, I>(fields: I, key: &SigningKey) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let base = signing_string(fields);
    let secret = key.secret().expose();

    match key.sign_type() {
        SignType::Md5 => {
            let mut hasher = Md5::new();
            hasher.update(base.as_bytes());
            hasher.update(b"&key=");
            hasher.update(secret);
            hex::encode_upper(hasher.finalize())
        }
        SignType::HmacSha256 => {
            // HMAC accepts keys of any length, so construction cannot fail.
            let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
                return String::new();
            };
            mac.update(base.as_bytes());
            mac.update(b"&key=");
            mac.update(secret);
            hex::encode_upper(mac.finalize().into_bytes())
        }
    }
}

/// Checks the `sign` field of a received field set.
///
/// Returns `false` when the field set carries no signature.
pub fn verify<'a, I>(fields: I, key: &SigningKey) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a str)> + Clone,
{
    let Some(received) =
        fields.clone().into_iter().find(|(name, _)| *name == SIGN_FIELD).map(|(_, v)| v)
    else {
        return false;
    };
    let expected = sign(fields, key);
    constant_time_eq(expected.as_bytes(), received.to_ascii_uppercase().as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
