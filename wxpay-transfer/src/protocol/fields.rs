//! Canonical parameter sets and signed envelopes.

use std::{collections::BTreeMap, fmt};

use zeroize::Zeroize;

use super::{
    field_map::is_sensitive,
    signer::{self, SIGN_FIELD, SigningKey},
    xml,
};

/// Field set under construction, ordered by field name.
///
/// Empty values are never stored: inserting `""` leaves the set unchanged, so absent
/// optional fields are omitted from the wire document instead of being sent empty.
/// Values are wiped when the set is dropped.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    fields: BTreeMap<String, String>,
}

impl ParameterSet {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, returning the value it replaced.
    ///
    /// Empty values and the `sign` field are ignored; the signature is only ever added
    /// by [`ParameterSet::sign`].
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder-style inserts"
    )]
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        if value.is_empty() || name == SIGN_FIELD {
            return None;
        }
        self.fields.insert(name, value)
    }

    /// Replaces the value of an existing field, wiping the old value.
    ///
    /// Returns `false` if the field was absent, in which case nothing is inserted.
    pub fn replace_wiping(&mut self, name: &str, value: String) -> bool {
        match self.fields.get_mut(name) {
            Some(slot) => {
                let mut old = std::mem::replace(slot, value);
                old.zeroize();
                true
            }
            None => false,
        }
    }

    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns `true` if the field is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + Clone {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Field names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Freezes the set and computes its signature.
    ///
    /// Any change after signing requires going back through
    /// [`SignedEnvelope::into_unsigned`] and signing again.
    #[must_use]
    pub fn sign(self, key: &SigningKey) -> SignedEnvelope {
        let signature = signer::sign(self.iter(), key);
        SignedEnvelope { fields: self, signature }
    }
}

impl Drop for ParameterSet {
    fn drop(&mut self) {
        for value in self.fields.values_mut() {
            value.zeroize();
        }
    }
}

impl fmt::Debug for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.fields.iter().map(|(k, v)| {
                let shown = if is_sensitive(k) { "[REDACTED]" } else { v.as_str() };
                (k.as_str(), shown)
            }))
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

/// Parameter set plus its signature. Immutable.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    fields: ParameterSet,
    signature: String,
}

impl SignedEnvelope {
    /// Signed fields, without the signature.
    #[must_use]
    pub fn fields(&self) -> &ParameterSet {
        &self.fields
    }

    /// Uppercase hex signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Returns `true` if the signature still matches the fields under `key`.
    #[must_use]
    pub fn verify(&self, key: &SigningKey) -> bool {
        signer::sign(self.fields.iter(), key) == self.signature
    }

    /// Iterates over all wire fields, signature last.
    pub fn wire_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().chain(std::iter::once((SIGN_FIELD, self.signature.as_str())))
    }

    /// Serializes the envelope to the provider's XML document.
    #[must_use]
    pub fn to_document(&self) -> String {
        xml::encode(self.wire_fields())
    }

    /// Drops the signature to allow further edits.
    #[must_use]
    pub fn into_unsigned(self) -> ParameterSet {
        self.fields
    }
}

impl fmt::Debug for SignedEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedEnvelope")
            .field("fields", &self.fields)
            .field("signature", &self.signature)
            .finish()
    }
}
