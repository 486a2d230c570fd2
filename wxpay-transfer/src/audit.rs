//! Audit records for money movement.
//!
//! Every dispatched transfer produces a `TransferSubmitted` event followed by exactly one
//! terminal event. Events go to the `audit` tracing target so they can be routed to a
//! separate sink. Payee identifiers are redacted before they reach an event.

use std::time::{Duration, SystemTime};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::TransferError,
    protocol::{RequestKind, TransferResult},
};

/// Minimum run of digits treated as an account number inside free text.
const ACCOUNT_DIGITS: usize = 12;

/// Number of trailing characters left visible by [`redact_account`].
const VISIBLE_SUFFIX: usize = 4;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A signed request is about to be sent.
    TransferSubmitted,
    /// The provider accepted the request.
    TransferSucceeded,
    /// The provider declined the request.
    TransferRejected,
    /// The request may or may not have been processed. Query before retrying.
    TransferOutcomeUnknown,
}

impl AuditEventType {
    /// Terminal event type for a pipeline outcome.
    #[must_use]
    pub fn for_result(result: &TransferResult) -> Self {
        match result {
            TransferResult::Success(_) => Self::TransferSucceeded,
            TransferResult::BusinessFailure(failure) if !failure.requires_reconciliation() => {
                Self::TransferRejected
            }
            TransferResult::TransportFailure { kind, .. } if !kind.outcome_unknown() => {
                Self::TransferRejected
            }
            _ => Self::TransferOutcomeUnknown,
        }
    }
}

/// Details for an audit log entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditDetails {
    /// Idempotency key of the transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_trade_no: Option<String>,
    /// Payee identifier, redacted for bank accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee: Option<String>,
    /// Amount in major units as submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    /// Request nonce.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Outcome label or provider error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    /// Error message with account numbers redacted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Duration of the exchange in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Audit log entry.
///
/// # Examples
///
/// ```
/// use wxpay_transfer::{
///     audit::{AuditEvent, AuditEventType, audit_log},
///     protocol::RequestKind,
/// };
/// use uuid::Uuid;
///
/// let event = AuditEvent::new(
///     AuditEventType::TransferSubmitted,
///     RequestKind::BankCardTransfer,
///     "1900000109",
///     Uuid::new_v4(),
/// )
/// .with_partner_trade_no("T202401010001")
/// .with_payee("************1234");
///
/// audit_log(&event);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// When the event occurred.
    pub timestamp: SystemTime,
    /// What happened.
    pub event_type: AuditEventType,
    /// Request variant.
    pub kind: RequestKind,
    /// Provider merchant id the request was made for.
    pub mch_id: String,
    /// Correlation id shared by all events of one pipeline run.
    pub request_id: Uuid,
    /// Contextual information.
    pub details: AuditDetails,
}

impl AuditEvent {
    /// Creates a new audit event.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn new(
        event_type: AuditEventType,
        kind: RequestKind,
        mch_id: impl Into<String>,
        request_id: Uuid,
    ) -> Self {
        Self {
            timestamp: SystemTime::now(),
            event_type,
            kind,
            mch_id: mch_id.into(),
            request_id,
            details: AuditDetails::default(),
        }
    }

    /// Adds the idempotency key.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_partner_trade_no(mut self, partner_trade_no: impl Into<String>) -> Self {
        self.details.partner_trade_no = Some(partner_trade_no.into());
        self
    }

    /// Adds the payee. Callers pass an already redacted value for bank accounts.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.details.payee = Some(payee.into());
        self
    }

    /// Adds the amount.
    #[must_use]
    #[allow(clippy::impl_trait_in_params, reason = "accepts Decimal or preformatted text")]
    pub fn with_amount(mut self, amount: impl ToString) -> Self {
        self.details.amount = Some(amount.to_string());
        self
    }

    /// Adds the request nonce.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.details.nonce = Some(nonce.into());
        self
    }

    /// Records an error that stopped the request before it reached the provider.
    #[must_use]
    pub fn with_error(mut self, err: &TransferError) -> Self {
        self.details.outcome = Some("not_sent".to_owned());
        self.details.error = Some(redact_sensitive(&err.to_string()));
        self
    }

    /// Adds the outcome of a dispatched request.
    ///
    /// Business failures record the provider code, everything else its label. Causes are
    /// passed through [`redact_sensitive`].
    #[must_use]
    pub fn with_result(mut self, result: &TransferResult) -> Self {
        match result {
            TransferResult::Success(_) => {
                self.details.outcome = Some(result.label().to_owned());
            }
            TransferResult::BusinessFailure(failure) => {
                self.details.outcome = Some(failure.code.clone());
                self.details.error = Some(redact_sensitive(&failure.message));
            }
            TransferResult::ProtocolFailure { reason } => {
                self.details.outcome = Some(result.label().to_owned());
                self.details.error = Some(redact_sensitive(reason));
            }
            TransferResult::TransportFailure { kind, cause } => {
                self.details.outcome = Some(format!("{}:{kind}", result.label()));
                self.details.error = Some(redact_sensitive(cause));
            }
        }
        self
    }

    /// Adds the exchange duration.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "duration in ms fits u64 for practical values"
    )]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.details.duration_ms = Some(duration.as_millis() as u64);
        self
    }
}

/// Logs an audit event to tracing with target `audit`.
pub fn audit_log(event: &AuditEvent) {
    tracing::info!(
        target: "audit",
        timestamp = ?event.timestamp,
        event_type = ?event.event_type,
        kind = ?event.kind,
        mch_id = %event.mch_id,
        request_id = %event.request_id,
        details = ?event.details,
        "AUDIT"
    );
}

/// Masks an account number, keeping only the last four characters.
///
/// # Examples
///
/// ```
/// use wxpay_transfer::audit::redact_account;
///
/// assert_eq!(redact_account("6222020000001234"), "************1234");
/// assert_eq!(redact_account("1234"), "****");
/// ```
#[must_use]
pub fn redact_account(account: &str) -> String {
    let len = account.chars().count();
    if len <= VISIBLE_SUFFIX {
        return "*".repeat(len);
    }

    let mut masked = "*".repeat(len - VISIBLE_SUFFIX);
    masked.extend(account.chars().skip(len - VISIBLE_SUFFIX));
    masked
}

/// Masks account-number-like digit runs inside free text.
///
/// Any run of at least twelve ASCII digits is replaced by [`redact_account`] of itself.
///
/// # Examples
///
/// ```
/// use wxpay_transfer::audit::redact_sensitive;
///
/// let msg = "bank rejected card 6222020000001234";
/// assert_eq!(redact_sensitive(msg), "bank rejected card ************1234");
/// assert_eq!(redact_sensitive("order 12345"), "order 12345");
/// ```
#[must_use]
pub fn redact_sensitive(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut digits = String::new();

    let flush = |digits: &mut String, result: &mut String| {
        if digits.len() >= ACCOUNT_DIGITS {
            result.push_str(&redact_account(digits));
        } else {
            result.push_str(digits);
        }
        digits.clear();
    };

    for ch in input.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else {
            flush(&mut digits, &mut result);
            result.push(ch);
        }
    }
    flush(&mut digits, &mut result);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::TransportFailureKind, protocol::BusinessFailure};

    fn rejected(code: &str) -> TransferResult {
        TransferResult::BusinessFailure(BusinessFailure {
            code: code.to_owned(),
            message: "declined".to_owned(),
        })
    }

    #[test]
    fn test_redact_account() {
        assert_eq!(redact_account("6222020000001234"), "************1234");
        assert_eq!(redact_account("12345"), "*2345");
        assert_eq!(redact_account("1234"), "****");
        assert_eq!(redact_account(""), "");
    }

    #[test]
    fn test_redact_account_multibyte() {
        assert_eq!(redact_account("张三丰先生"), "*三丰先生");
    }

    #[test]
    fn test_redact_sensitive_masks_long_digit_runs() {
        let input = "cards 6222020000001234 and 6217000010001234567 failed";
        let result = redact_sensitive(input);
        assert!(!result.contains("6222020000001234"));
        assert!(!result.contains("6217000010001234567"));
        assert!(result.contains("************1234"));
        assert!(result.ends_with("failed"));
    }

    #[test]
    fn test_redact_sensitive_preserves_safe_data() {
        let input = "Order 10000098201411111234567890? amount 12.34, code 500";
        let result = redact_sensitive(input);
        assert!(result.contains("amount 12.34"));
        assert!(result.contains("code 500"));
        assert!(!result.contains("10000098201411111234567890"));
        assert_eq!(redact_sensitive(""), "");
    }

    #[test]
    fn test_event_type_for_result() {
        assert_eq!(AuditEventType::for_result(&rejected("NOTENOUGH")), AuditEventType::TransferRejected);
        assert_eq!(
            AuditEventType::for_result(&rejected("SYSTEMERROR")),
            AuditEventType::TransferOutcomeUnknown
        );
        assert_eq!(
            AuditEventType::for_result(&TransferResult::ProtocolFailure { reason: "x".into() }),
            AuditEventType::TransferOutcomeUnknown
        );
        assert_eq!(
            AuditEventType::for_result(&TransferResult::TransportFailure {
                kind: TransportFailureKind::Timeout,
                cause: "slow".into(),
            }),
            AuditEventType::TransferOutcomeUnknown
        );
        assert_eq!(
            AuditEventType::for_result(&TransferResult::TransportFailure {
                kind: TransportFailureKind::Connect,
                cause: "refused".into(),
            }),
            AuditEventType::TransferRejected
        );
    }

    #[test]
    fn test_audit_event_builder() {
        let request_id = Uuid::new_v4();
        let event = AuditEvent::new(
            AuditEventType::TransferSubmitted,
            RequestKind::PeerTransfer,
            "1900000109",
            request_id,
        )
        .with_partner_trade_no("T1")
        .with_payee("oUpF8uMuAJO_M2pxb1Q9zNjWeS6o")
        .with_amount("12.34")
        .with_nonce("5K8264ILTKCH16CQ2502SI8ZNMTM67VS")
        .with_duration(Duration::from_millis(1500));

        assert_eq!(event.mch_id, "1900000109");
        assert_eq!(event.request_id, request_id);
        assert_eq!(event.details.partner_trade_no.as_deref(), Some("T1"));
        assert_eq!(event.details.amount.as_deref(), Some("12.34"));
        assert_eq!(event.details.duration_ms, Some(1500));
    }

    #[test]
    fn test_audit_event_with_result() {
        let event = AuditEvent::new(
            AuditEventType::TransferOutcomeUnknown,
            RequestKind::BankCardTransfer,
            "1900000109",
            Uuid::new_v4(),
        )
        .with_result(&TransferResult::TransportFailure {
            kind: TransportFailureKind::Body,
            cause: "connection reset while sending 6222020000001234".into(),
        });

        assert_eq!(event.details.outcome.as_deref(), Some("transport_failure:body"));
        let error = event.details.error.unwrap();
        assert!(!error.contains("6222020000001234"));
    }

    #[test]
    fn test_audit_event_with_error() {
        let err = TransferError::Protocol("account 6222020000001234 rejected".into());
        let event = AuditEvent::new(
            AuditEventType::TransferRejected,
            RequestKind::BankCardTransfer,
            "1900000109",
            Uuid::nil(),
        )
        .with_error(&err);

        assert_eq!(event.details.outcome.as_deref(), Some("not_sent"));
        let error = event.details.error.unwrap();
        assert!(error.contains("************1234"));
        assert!(!error.contains("6222020000001234"));
    }

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::new(
            AuditEventType::TransferRejected,
            RequestKind::BankCardQuery,
            "1900000109",
            Uuid::new_v4(),
        )
        .with_result(&rejected("NOTENOUGH"));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("transfer_rejected"));
        assert!(json.contains("bank_card_query"));
        assert!(json.contains("NOTENOUGH"));
        assert!(!json.contains("payee"));
    }
}
