//! Sensitive field encryption.
//!
//! Bank-card disbursements carry the account number and holder name encrypted with the
//! provider's RSA public key using OAEP padding with SHA-1 and MGF1. Ciphertexts are
//! base64-encoded before they enter the parameter set, so the signature covers the
//! encrypted representation.

use base64::{Engine, engine::general_purpose::STANDARD};
use rsa::{
    Oaep, RsaPublicKey,
    pkcs1::DecodeRsaPublicKey,
    pkcs8::DecodePublicKey,
    rand_core::OsRng,
};
use sha1::Sha1;
use tracing::{debug, instrument};

use super::{field_map::RequestKind, fields::ParameterSet};
use crate::{
    error::{Result, TransferError},
    merchant::ProviderPublicKey,
};

/// Parses a PEM public key in PKCS#1 (`BEGIN RSA PUBLIC KEY`) or SubjectPublicKeyInfo
/// (`BEGIN PUBLIC KEY`) form.
///
/// # Errors
///
/// Returns [`TransferError::Encryption`] if the key is not a PEM RSA public key.
pub fn parse_public_key(key: &ProviderPublicKey) -> Result<RsaPublicKey> {
    let pem = std::str::from_utf8(key.pem())
        .map_err(|_| TransferError::Encryption("public key is not valid UTF-8 PEM".to_owned()))?
        .trim();

    RsaPublicKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPublicKey::from_public_key_pem(pem))
        .map_err(|e| TransferError::Encryption(format!("failed to load RSA public key: {e}")))
}

/// Encrypts the fields a request variant marks as encrypted.
///
/// Each encrypted field's plaintext is replaced by its base64 ciphertext and the
/// plaintext is wiped. Variants without encrypted fields are returned unchanged and
/// never touch the key.
///
/// # Errors
///
/// Returns [`TransferError::Encryption`] if an encrypted field is absent, the key is
/// malformed, or encryption fails. No partially encrypted set is ever returned.
#[instrument(skip_all, fields(kind = ?kind))]
pub fn encrypt_sensitive_fields(
    mut fields: ParameterSet,
    kind: RequestKind,
    public_key: &ProviderPublicKey,
) -> Result<ParameterSet> {
    let targets: Vec<&'static str> = kind.encrypted_fields().collect();
    if targets.is_empty() {
        return Ok(fields);
    }

    if let Some(missing) = targets.iter().find(|name| !fields.contains(name)) {
        return Err(TransferError::Encryption(format!(
            "field '{missing}' is required and must not be empty"
        )));
    }

    let key = parse_public_key(public_key)?;
    let mut rng = OsRng;

    for name in targets {
        let plaintext = fields.get(name).unwrap_or_default();
        let ciphertext = key
            .encrypt(&mut rng, Oaep::new::<Sha1>(), plaintext.as_bytes())
            .map_err(|e| TransferError::Encryption(format!("cannot encrypt '{name}': {e}")))?;
        fields.replace_wiping(name, STANDARD.encode(ciphertext));
        debug!(field = name, "encrypted sensitive field");
    }

    Ok(fields)
}
