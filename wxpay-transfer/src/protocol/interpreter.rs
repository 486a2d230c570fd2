//! Response classification.
//!
//! Every dispatched request ends in exactly one [`TransferResult`]. The checks run in a
//! fixed order:
//!
//! 1. `return_code` must be `SUCCESS`; anything else is a [`TransferResult::ProtocolFailure`]
//!    carrying `return_msg`.
//! 2. A `sign` field, when present, must verify under the merchant's key.
//! 3. `result_code` `FAIL` is a [`TransferResult::BusinessFailure`] with `err_code` and
//!    `err_code_des`. Business failures are data, not errors.
//! 4. Otherwise the response fields become a [`TransferReceipt`].

use std::{collections::BTreeMap, fmt};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::warn;

use super::{
    field_map::RequestKind,
    signer::{SIGN_FIELD, SigningKey, verify},
    xml::ResponseFields,
};
use crate::error::{Result, TransferError, TransportFailureKind};

const SUCCESS: &str = "SUCCESS";
const FAIL: &str = "FAIL";

/// Provider error codes that leave the transfer outcome unknown.
const UNKNOWN_OUTCOME_CODES: &[&str] = &["SYSTEMERROR"];

/// Timestamp layout used by the provider.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferResult {
    /// The provider accepted the request.
    Success(TransferReceipt),
    /// The provider processed the request and declined it.
    BusinessFailure(BusinessFailure),
    /// The response could not be trusted or understood. Provider state is unknown.
    ProtocolFailure {
        /// What was wrong with the response.
        reason: String,
    },
    /// The exchange failed at the network level.
    TransportFailure {
        /// Stage of the exchange that failed.
        kind: TransportFailureKind,
        /// Underlying cause.
        cause: String,
    },
}

impl TransferResult {
    /// Folds a dispatch error into a result.
    ///
    /// # Errors
    ///
    /// Pre-dispatch errors (configuration, validation, encryption) are returned unchanged
    /// because the request never reached the provider.
    pub fn from_dispatch_error(err: TransferError) -> Result<Self> {
        match err {
            TransferError::Transport { kind, message } => {
                Ok(Self::TransportFailure { kind, cause: message })
            }
            TransferError::Protocol(reason) => Ok(Self::ProtocolFailure { reason }),
            other => Err(other),
        }
    }

    /// Returns `true` for [`TransferResult::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` when the caller must query before trying again.
    ///
    /// Covers protocol failures, transport failures after the request may have been
    /// delivered, and business failures with an indeterminate code.
    #[must_use]
    pub fn outcome_unknown(&self) -> bool {
        match self {
            Self::Success(_) => false,
            Self::BusinessFailure(failure) => failure.requires_reconciliation(),
            Self::ProtocolFailure { .. } => true,
            Self::TransportFailure { kind, .. } => kind.outcome_unknown(),
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::BusinessFailure(_) => "business_failure",
            Self::ProtocolFailure { .. } => "protocol_failure",
            Self::TransportFailure { .. } => "transport_failure",
        }
    }
}

/// Provider-declined request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessFailure {
    /// Provider error code, e.g. `NOTENOUGH` or `NAME_MISMATCH`.
    pub code: String,
    /// Provider error description.
    pub message: String,
}

impl BusinessFailure {
    /// Returns `true` if the code leaves the outcome unknown (for example
    /// `SYSTEMERROR`). The transfer must be queried, and retried with the same
    /// `partner_trade_no` only if the query shows it did not happen.
    #[must_use]
    pub fn requires_reconciliation(&self) -> bool {
        UNKNOWN_OUTCOME_CODES.contains(&self.code.as_str())
    }
}

impl fmt::Display for BusinessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Status reported by the query endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Still being processed.
    Processing,
    /// Funds delivered.
    Success,
    /// Transfer failed; funds returned to the merchant.
    Failed,
    /// The bank rejected the disbursement after acceptance.
    BankFail,
    /// Any other value, verbatim.
    Other(String),
}

impl TransferStatus {
    fn parse(value: &str) -> Self {
        match value {
            "PROCESSING" => Self::Processing,
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            "BANK_FAIL" => Self::BankFail,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns `true` once the status can no longer change.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::BankFail)
    }
}

/// Business payload of a successful response.
///
/// The raw fields are kept verbatim; the accessors parse the commonly used ones and
/// return `None` when a field is absent or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    kind: RequestKind,
    fields: BTreeMap<String, String>,
}

impl TransferReceipt {
    /// Wraps response fields, dropping the protocol envelope fields.
    #[must_use]
    pub fn new(kind: RequestKind, mut fields: ResponseFields) -> Self {
        fields.remove(SIGN_FIELD);
        Self { kind, fields }
    }

    /// Request variant that produced this receipt.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.kind
    }

    /// All response fields except `sign`.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Raw field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Provider-side payment number.
    #[must_use]
    pub fn payment_no(&self) -> Option<&str> {
        self.get("payment_no").or_else(|| self.get("detail_id"))
    }

    /// Idempotency key echoed by the provider.
    #[must_use]
    pub fn partner_trade_no(&self) -> Option<&str> {
        self.get("partner_trade_no")
    }

    /// Transfer status. Absent on transfer responses, which only confirm acceptance.
    #[must_use]
    pub fn status(&self) -> Option<TransferStatus> {
        self.get("status").map(TransferStatus::parse)
    }

    /// Amount in minor units.
    #[must_use]
    pub fn amount(&self) -> Option<u64> {
        self.get("amount").or_else(|| self.get("payment_amount")).and_then(|v| v.parse().ok())
    }

    /// Service fee in minor units (bank-card disbursements).
    #[must_use]
    pub fn cmms_amt(&self) -> Option<u64> {
        self.get("cmms_amt").and_then(|v| v.parse().ok())
    }

    /// Time the payment completed, in provider local time.
    #[must_use]
    pub fn payment_time(&self) -> Option<NaiveDateTime> {
        ["payment_time", "pay_succ_time", "transfer_time"]
            .into_iter()
            .find_map(|name| self.get(name))
            .and_then(|v| NaiveDateTime::parse_from_str(v, TIME_FORMAT).ok())
    }

    /// Failure reason reported for a failed transfer.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.get("reason")
    }
}

/// Classifies a parsed response.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use wxpay_transfer::protocol::{RequestKind, SignType, SigningKey, TransferResult, interpret};
///
/// let key = SigningKey::new("192006250b4c09247ec02edce69f6a2d", SignType::Md5);
/// let fields: BTreeMap<String, String> = [
///     ("return_code", "SUCCESS"),
///     ("result_code", "FAIL"),
///     ("err_code", "NOTENOUGH"),
///     ("err_code_des", "balance too low"),
/// ]
/// .into_iter()
/// .map(|(k, v)| (k.to_owned(), v.to_owned()))
/// .collect();
///
/// match interpret(RequestKind::PeerTransfer, fields, &key) {
///     TransferResult::BusinessFailure(failure) => assert_eq!(failure.code, "NOTENOUGH"),
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub fn interpret(kind: RequestKind, fields: ResponseFields, key: &SigningKey) -> TransferResult {
    let protocol = |reason: String| TransferResult::ProtocolFailure { reason };

    match fields.get("return_code").map(String::as_str) {
        Some(SUCCESS) => {}
        Some(code) => {
            let message = fields.get("return_msg").map_or(code, String::as_str);
            return protocol(format!("provider returned {code}: {message}"));
        }
        None => return protocol("response has no return_code".to_owned()),
    }

    if fields.contains_key(SIGN_FIELD)
        && !verify(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())), key)
    {
        warn!(kind = ?kind, "response signature mismatch");
        return protocol("response signature does not verify".to_owned());
    }

    match fields.get("result_code").map(String::as_str) {
        Some(SUCCESS) => TransferResult::Success(TransferReceipt::new(kind, fields)),
        Some(FAIL) => {
            let code = fields.get("err_code").cloned().unwrap_or_default();
            let message = fields
                .get("err_code_des")
                .or_else(|| fields.get("return_msg"))
                .cloned()
                .unwrap_or_default();
            TransferResult::BusinessFailure(BusinessFailure { code, message })
        }
        Some(other) => protocol(format!("unexpected result_code '{other}'")),
        None => protocol("response has no result_code".to_owned()),
    }
}
