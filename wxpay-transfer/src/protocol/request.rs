//! Typed transfer and query requests.
//!
//! Requests carry only caller-supplied data. Merchant identity, nonce and signature are
//! added by the pipeline. The idempotency key (`partner_trade_no`) is opaque: the crate
//! validates its shape but never generates or stores it.

use std::fmt;

use rust_decimal::Decimal;
use zeroize::Zeroizing;

use super::field_map::RequestKind;

/// Plaintext personal data (bank numbers, real names) wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Sensitive(Zeroizing<String>);

impl Sensitive {
    /// Wraps a sensitive value.
    #[allow(clippy::impl_trait_in_params, reason = "impl Into<String> is idiomatic for constructors")]
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Returns the plaintext.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Sensitive {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Sensitive {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Transfer to a payee's wallet balance, identified by openid.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use wxpay_transfer::protocol::PeerTransfer;
///
/// let transfer = PeerTransfer::new("T202401010001", "oUpF8uMuAJO_M2pxb1Q9zNjWeS6o", Decimal::new(1234, 2), "refund")
///     .with_verified_name("Zhang San");
/// assert!(transfer.verified_name.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerTransfer {
    /// Idempotency key.
    pub partner_trade_no: String,
    /// Payee openid under the app.
    pub openid: String,
    /// Amount in major units.
    pub amount: Decimal,
    /// Free-text description shown to the payee.
    pub description: String,
    /// Real name to verify; `None` disables verification.
    pub verified_name: Option<Sensitive>,
    /// App id overriding the merchant's configured one.
    pub app_id: Option<String>,
}

impl PeerTransfer {
    /// Creates a peer transfer without name verification.
    #[allow(clippy::impl_trait_in_params, reason = "impl Into<String> is idiomatic for constructors")]
    pub fn new(
        partner_trade_no: impl Into<String>,
        openid: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            partner_trade_no: partner_trade_no.into(),
            openid: openid.into(),
            amount,
            description: description.into(),
            verified_name: None,
            app_id: None,
        }
    }

    /// Requires the payee's real name to match.
    #[must_use]
    #[allow(clippy::impl_trait_in_params, reason = "impl Into<Sensitive> is idiomatic for builders")]
    pub fn with_verified_name(mut self, name: impl Into<Sensitive>) -> Self {
        self.verified_name = Some(name.into());
        self
    }

    /// Overrides the app id.
    #[must_use]
    #[allow(clippy::impl_trait_in_params, reason = "impl Into<String> is idiomatic for builders")]
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }
}

/// Disbursement to a bank card.
///
/// Account number and holder name are encrypted with the provider's public key before the
/// request is signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankCardTransfer {
    /// Idempotency key.
    pub partner_trade_no: String,
    /// Bank account number, plaintext.
    pub bank_no: Sensitive,
    /// Account holder name, plaintext.
    pub true_name: Sensitive,
    /// Provider bank code, e.g. `1002` for ICBC.
    pub bank_code: String,
    /// Amount in major units.
    pub amount: Decimal,
    /// Free-text description.
    pub description: String,
}

impl BankCardTransfer {
    /// Creates a bank-card disbursement.
    #[allow(clippy::impl_trait_in_params, reason = "impl Into<String> is idiomatic for constructors")]
    pub fn new(
        partner_trade_no: impl Into<String>,
        bank_no: impl Into<Sensitive>,
        true_name: impl Into<Sensitive>,
        bank_code: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            partner_trade_no: partner_trade_no.into(),
            bank_no: bank_no.into(),
            true_name: true_name.into(),
            bank_code: bank_code.into(),
            amount,
            description: description.into(),
        }
    }
}

/// Status query for an earlier transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferQuery {
    /// Idempotency key of the transfer to look up.
    pub partner_trade_no: String,
    /// App id override, used by peer transfer queries only.
    pub app_id: Option<String>,
}

impl TransferQuery {
    /// Creates a query.
    #[allow(clippy::impl_trait_in_params, reason = "impl Into<String> is idiomatic for constructors")]
    pub fn new(partner_trade_no: impl Into<String>) -> Self {
        Self { partner_trade_no: partner_trade_no.into(), app_id: None }
    }

    /// Overrides the app id.
    #[must_use]
    #[allow(clippy::impl_trait_in_params, reason = "impl Into<String> is idiomatic for builders")]
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }
}

/// Any request the pipeline can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferRequest {
    /// Wallet transfer.
    PeerTransfer(PeerTransfer),
    /// Wallet transfer status.
    PeerTransferQuery(TransferQuery),
    /// Bank-card disbursement.
    BankCardTransfer(BankCardTransfer),
    /// Bank-card disbursement status.
    BankCardQuery(TransferQuery),
}

impl TransferRequest {
    /// Request variant.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::PeerTransfer(_) => RequestKind::PeerTransfer,
            Self::PeerTransferQuery(_) => RequestKind::PeerTransferQuery,
            Self::BankCardTransfer(_) => RequestKind::BankCardTransfer,
            Self::BankCardQuery(_) => RequestKind::BankCardQuery,
        }
    }

    /// Idempotency key of the transfer this request creates or looks up.
    #[must_use]
    pub fn partner_trade_no(&self) -> &str {
        match self {
            Self::PeerTransfer(r) => &r.partner_trade_no,
            Self::BankCardTransfer(r) => &r.partner_trade_no,
            Self::PeerTransferQuery(q) | Self::BankCardQuery(q) => &q.partner_trade_no,
        }
    }

    /// Payee identifier, if the request names one.
    ///
    /// Bank numbers are reported masked to the last four characters.
    #[must_use]
    pub fn payee(&self) -> Option<String> {
        match self {
            Self::PeerTransfer(r) => Some(r.openid.clone()),
            Self::BankCardTransfer(r) => Some(crate::audit::redact_account(r.bank_no.expose())),
            Self::PeerTransferQuery(_) | Self::BankCardQuery(_) => None,
        }
    }

    /// Requested amount, for money-moving variants.
    #[must_use]
    pub const fn amount(&self) -> Option<Decimal> {
        match self {
            Self::PeerTransfer(r) => Some(r.amount),
            Self::BankCardTransfer(r) => Some(r.amount),
            Self::PeerTransferQuery(_) | Self::BankCardQuery(_) => None,
        }
    }
}

impl From<PeerTransfer> for TransferRequest {
    fn from(value: PeerTransfer) -> Self {
        Self::PeerTransfer(value)
    }
}

impl From<BankCardTransfer> for TransferRequest {
    fn from(value: BankCardTransfer) -> Self {
        Self::BankCardTransfer(value)
    }
}
