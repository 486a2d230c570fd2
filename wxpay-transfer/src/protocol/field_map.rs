//! Per-request field tables.
//!
//! Each request variant owns a static table mapping request attributes to wire field
//! names, together with an inclusion rule and a length limit. The builder walks the table;
//! nothing about the wire layout is inferred from struct field names.
//!
//! The tables reproduce the provider's naming quirks exactly: peer transfers identify the
//! merchant as `mchid` (and the app as `mch_appid`), while the bank-card and query
//! endpoints expect `mch_id`.

use serde::Serialize;

use crate::transport::Endpoint;

/// Request attribute a field value is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Merchant number from the credential store.
    MerchantId,
    /// App id from the request or the merchant configuration.
    AppId,
    /// Single-use random nonce.
    Nonce,
    /// Caller-supplied idempotency key.
    TradeNo,
    /// Payee account identifier (openid).
    PayeeOpenId,
    /// `NO_CHECK` or `FORCE_CHECK`, derived from the verified name.
    CheckName,
    /// Payee real name for forced verification.
    VerifiedName,
    /// Amount in minor units.
    Amount,
    /// Free-text description.
    Description,
    /// Caller IP announced to the provider.
    ClientIp,
    /// Bank account number, encrypted before signing.
    BankNo,
    /// Account holder name, encrypted before signing.
    TrueName,
    /// Provider bank code.
    BankCode,
    /// Digest announcement, present only for non-MD5 keys.
    SignType,
}

/// How a field takes part in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusion {
    /// Must have a non-empty value.
    Required,
    /// Omitted entirely when absent.
    Optional,
    /// Sent only as ciphertext. Absence is reported by the encryptor.
    Encrypted,
}

/// Extra constraint on a field's characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Anything.
    Any,
    /// ASCII letters, digits and underscore.
    Identifier,
}

/// One row of a field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// Source attribute.
    pub attribute: Attribute,
    /// Field name on the wire.
    pub wire: &'static str,
    /// Inclusion rule.
    pub inclusion: Inclusion,
    /// Maximum length in UTF-8 bytes, checked before encryption.
    pub max_len: Option<usize>,
    /// Allowed characters.
    pub charset: Charset,
    /// Value must never appear in logs or `Debug` output.
    pub sensitive: bool,
}

impl FieldRule {
    const fn new(attribute: Attribute, wire: &'static str, inclusion: Inclusion) -> Self {
        Self { attribute, wire, inclusion, max_len: None, charset: Charset::Any, sensitive: false }
    }

    const fn max_len(mut self, max: usize) -> Self {
        self.max_len = Some(max);
        self
    }

    const fn identifier(mut self) -> Self {
        self.charset = Charset::Identifier;
        self
    }

    const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

const TRADE_NO_MAX: usize = 32;
const OPENID_MAX: usize = 64;
const NAME_MAX: usize = 64;
const DESC_MAX: usize = 100;

const PEER_TRANSFER: &[FieldRule] = &[
    FieldRule::new(Attribute::AppId, "mch_appid", Inclusion::Required),
    FieldRule::new(Attribute::MerchantId, "mchid", Inclusion::Required),
    FieldRule::new(Attribute::Nonce, "nonce_str", Inclusion::Required),
    FieldRule::new(Attribute::TradeNo, "partner_trade_no", Inclusion::Required)
        .max_len(TRADE_NO_MAX)
        .identifier(),
    FieldRule::new(Attribute::PayeeOpenId, "openid", Inclusion::Required).max_len(OPENID_MAX),
    FieldRule::new(Attribute::CheckName, "check_name", Inclusion::Required),
    FieldRule::new(Attribute::VerifiedName, "re_user_name", Inclusion::Optional)
        .max_len(NAME_MAX)
        .sensitive(),
    FieldRule::new(Attribute::Amount, "amount", Inclusion::Required),
    FieldRule::new(Attribute::Description, "desc", Inclusion::Required).max_len(DESC_MAX),
    FieldRule::new(Attribute::ClientIp, "spbill_create_ip", Inclusion::Optional),
    FieldRule::new(Attribute::SignType, "sign_type", Inclusion::Optional),
];

const PEER_TRANSFER_QUERY: &[FieldRule] = &[
    FieldRule::new(Attribute::AppId, "appid", Inclusion::Required),
    FieldRule::new(Attribute::MerchantId, "mch_id", Inclusion::Required),
    FieldRule::new(Attribute::Nonce, "nonce_str", Inclusion::Required),
    FieldRule::new(Attribute::TradeNo, "partner_trade_no", Inclusion::Required)
        .max_len(TRADE_NO_MAX)
        .identifier(),
    FieldRule::new(Attribute::SignType, "sign_type", Inclusion::Optional),
];

const BANK_CARD_TRANSFER: &[FieldRule] = &[
    FieldRule::new(Attribute::MerchantId, "mch_id", Inclusion::Required),
    FieldRule::new(Attribute::TradeNo, "partner_trade_no", Inclusion::Required)
        .max_len(TRADE_NO_MAX)
        .identifier(),
    FieldRule::new(Attribute::Nonce, "nonce_str", Inclusion::Required),
    FieldRule::new(Attribute::BankNo, "enc_bank_no", Inclusion::Encrypted).sensitive(),
    FieldRule::new(Attribute::TrueName, "enc_true_name", Inclusion::Encrypted)
        .max_len(NAME_MAX)
        .sensitive(),
    FieldRule::new(Attribute::BankCode, "bank_code", Inclusion::Required),
    FieldRule::new(Attribute::Amount, "amount", Inclusion::Required),
    FieldRule::new(Attribute::Description, "desc", Inclusion::Required).max_len(DESC_MAX),
    FieldRule::new(Attribute::SignType, "sign_type", Inclusion::Optional),
];

const BANK_CARD_QUERY: &[FieldRule] = &[
    FieldRule::new(Attribute::MerchantId, "mch_id", Inclusion::Required),
    FieldRule::new(Attribute::TradeNo, "partner_trade_no", Inclusion::Required)
        .max_len(TRADE_NO_MAX)
        .identifier(),
    FieldRule::new(Attribute::Nonce, "nonce_str", Inclusion::Required),
    FieldRule::new(Attribute::SignType, "sign_type", Inclusion::Optional),
];

/// Closed set of request variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Transfer to a payee's wallet balance.
    PeerTransfer,
    /// Status of a peer transfer.
    PeerTransferQuery,
    /// Disbursement to a bank card.
    BankCardTransfer,
    /// Status of a bank-card disbursement.
    BankCardQuery,
}

impl RequestKind {
    /// All variants.
    pub const ALL: [Self; 4] =
        [Self::PeerTransfer, Self::PeerTransferQuery, Self::BankCardTransfer, Self::BankCardQuery];

    /// Field table for this variant.
    #[must_use]
    pub const fn field_rules(self) -> &'static [FieldRule] {
        match self {
            Self::PeerTransfer => PEER_TRANSFER,
            Self::PeerTransferQuery => PEER_TRANSFER_QUERY,
            Self::BankCardTransfer => BANK_CARD_TRANSFER,
            Self::BankCardQuery => BANK_CARD_QUERY,
        }
    }

    /// Provider endpoint serving this variant.
    #[must_use]
    pub const fn endpoint(self) -> Endpoint {
        match self {
            Self::PeerTransfer => Endpoint::PeerTransfer,
            Self::PeerTransferQuery => Endpoint::PeerTransferQuery,
            Self::BankCardTransfer => Endpoint::BankCardTransfer,
            Self::BankCardQuery => Endpoint::BankCardQuery,
        }
    }

    /// Returns `true` when the variant moves money rather than reading status.
    #[must_use]
    pub const fn moves_money(self) -> bool {
        matches!(self, Self::PeerTransfer | Self::BankCardTransfer)
    }

    /// Wire names of fields that must be encrypted before signing.
    pub fn encrypted_fields(self) -> impl Iterator<Item = &'static str> {
        self.field_rules()
            .iter()
            .filter(|rule| rule.inclusion == Inclusion::Encrypted)
            .map(|rule| rule.wire)
    }
}

/// Returns `true` if the wire field carries sensitive data in any request variant.
#[must_use]
pub fn is_sensitive(wire: &str) -> bool {
    RequestKind::ALL
        .iter()
        .flat_map(|kind| kind.field_rules())
        .any(|rule| rule.sensitive && rule.wire == wire)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn wire_names(kind: RequestKind) -> Vec<&'static str> {
        kind.field_rules().iter().map(|rule| rule.wire).collect()
    }

    #[test]
    fn test_wire_names_unique_per_variant() {
        for kind in RequestKind::ALL {
            let names = wire_names(kind);
            let unique: HashSet<_> = names.iter().collect();
            assert_eq!(names.len(), unique.len(), "duplicate wire name in {kind:?}");
        }
    }

    #[test]
    fn test_merchant_field_name_differs_between_peer_and_bank() {
        assert!(wire_names(RequestKind::PeerTransfer).contains(&"mchid"));
        assert!(!wire_names(RequestKind::PeerTransfer).contains(&"mch_id"));
        assert!(wire_names(RequestKind::BankCardTransfer).contains(&"mch_id"));
        assert!(wire_names(RequestKind::BankCardQuery).contains(&"mch_id"));
        assert!(wire_names(RequestKind::PeerTransferQuery).contains(&"mch_id"));
    }

    #[test]
    fn test_app_id_field_name_by_variant() {
        assert!(wire_names(RequestKind::PeerTransfer).contains(&"mch_appid"));
        assert!(wire_names(RequestKind::PeerTransferQuery).contains(&"appid"));
        assert!(!wire_names(RequestKind::BankCardTransfer).iter().any(|n| n.contains("appid")));
    }

    #[test]
    fn test_only_bank_transfer_encrypts() {
        assert_eq!(
            RequestKind::BankCardTransfer.encrypted_fields().collect::<Vec<_>>(),
            vec!["enc_bank_no", "enc_true_name"]
        );
        assert_eq!(RequestKind::PeerTransfer.encrypted_fields().count(), 0);
        assert_eq!(RequestKind::BankCardQuery.encrypted_fields().count(), 0);
    }

    #[test]
    fn test_every_variant_carries_nonce_and_trade_no() {
        for kind in RequestKind::ALL {
            let names = wire_names(kind);
            assert!(names.contains(&"nonce_str"));
            assert!(names.contains(&"partner_trade_no"));
        }
    }

    #[test]
    fn test_sensitive_fields() {
        assert!(is_sensitive("enc_bank_no"));
        assert!(is_sensitive("enc_true_name"));
        assert!(is_sensitive("re_user_name"));
        assert!(!is_sensitive("openid"));
        assert!(!is_sensitive("amount"));
    }

    #[test]
    fn test_endpoint_mapping() {
        assert_eq!(RequestKind::PeerTransfer.endpoint(), Endpoint::PeerTransfer);
        assert_eq!(RequestKind::BankCardQuery.endpoint(), Endpoint::BankCardQuery);
        assert!(RequestKind::BankCardTransfer.moves_money());
        assert!(!RequestKind::PeerTransferQuery.moves_money());
    }
}
