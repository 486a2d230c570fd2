//! Canonical parameter building.
//!
//! [`build`] walks the request variant's field table, pulls each attribute from the
//! request or the merchant context and enforces the table's inclusion, length and
//! character rules. It never truncates: an over-long value is a
//! [`ValidationError::FieldTooLong`].

use tracing::{instrument, trace};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::{
    SignType,
    amount::to_minor_units,
    field_map::{Attribute, Charset, FieldRule, Inclusion},
    fields::ParameterSet,
    request::TransferRequest,
};
use crate::{
    error::{ConfigurationError, Result, ValidationError},
    merchant::MerchantContext,
};

/// `check_name` value when no real name is verified.
pub const NO_CHECK: &str = "NO_CHECK";

/// `check_name` value when the payee's real name must match.
pub const FORCE_CHECK: &str = "FORCE_CHECK";

/// Generates a fresh request nonce: 32 lowercase hex characters from a random UUID.
#[must_use]
pub fn generate_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Builds the parameter set for a request with a fresh nonce.
///
/// # Errors
///
/// - [`ConfigurationError::MissingAppId`] for peer variants without an app id
/// - [`ValidationError`] if a field is missing, too long, malformed or the amount is
///   not a positive number of minor units
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use wxpay_transfer::{
///     merchant::{ClientCertificate, MerchantContext, Secret},
///     protocol::{PeerTransfer, SignType, SigningKey, TransferRequest, build},
/// };
///
/// let merchant = MerchantContext::new(
///     1,
///     "1900000109",
///     SigningKey::new("192006250b4c09247ec02edce69f6a2d", SignType::Md5),
///     ClientCertificate::Pkcs12 { der: Secret::new(vec![0x30]), password: Secret::from("pw") },
/// )
/// .with_app_id("wx8888888888888888");
///
/// let request = TransferRequest::from(PeerTransfer::new(
///     "T202401010001",
///     "oUpF8uMuAJO_M2pxb1Q9zNjWeS6o",
///     Decimal::new(1234, 2),
///     "refund",
/// ));
/// let fields = build(&request, &merchant)?;
///
/// assert_eq!(fields.get("amount"), Some("1234"));
/// assert_eq!(fields.get("check_name"), Some("NO_CHECK"));
/// assert_eq!(fields.get("mchid"), Some("1900000109"));
/// # Ok::<(), wxpay_transfer::error::TransferError>(())
/// ```
pub fn build(request: &TransferRequest, merchant: &MerchantContext) -> Result<ParameterSet> {
    build_with_nonce(request, merchant, &generate_nonce())
}

/// Builds the parameter set with a caller-chosen nonce.
///
/// Only meant for reproducible output in tests and benchmarks; production calls must
/// go through [`build`] so that every attempt gets a fresh nonce.
///
/// # Errors
///
/// Same as [`build`].
#[instrument(skip_all, fields(kind = ?request.kind(), merchant = merchant.number()))]
pub fn build_with_nonce(
    request: &TransferRequest,
    merchant: &MerchantContext,
    nonce: &str,
) -> Result<ParameterSet> {
    let kind = request.kind();
    let mut fields = ParameterSet::new();

    for rule in kind.field_rules() {
        let value = attribute_value(request, merchant, nonce, rule.attribute)?;
        let Some(mut value) = value.filter(|v| !v.is_empty()) else {
            if rule.inclusion == Inclusion::Required {
                return Err(ValidationError::MissingField(rule.wire).into());
            }
            continue;
        };
        check_rule(rule, &value)?;
        fields.insert(rule.wire, std::mem::take(&mut *value));
    }

    trace!(fields = fields.len(), "built parameter set");
    Ok(fields)
}

fn attribute_value(
    request: &TransferRequest,
    merchant: &MerchantContext,
    nonce: &str,
    attribute: Attribute,
) -> Result<Option<Zeroizing<String>>> {
    let plain = |s: &str| Some(Zeroizing::new(s.to_owned()));

    let value = match (attribute, request) {
        (Attribute::MerchantId, _) => plain(merchant.mch_id()),
        (Attribute::Nonce, _) => plain(nonce),
        (Attribute::TradeNo, _) => plain(request.partner_trade_no()),
        (Attribute::SignType, _) => match merchant.signing_key().sign_type() {
            SignType::Md5 => None,
            other => plain(other.wire_name()),
        },
        (Attribute::AppId, TransferRequest::PeerTransfer(r)) => {
            plain(resolve_app_id(r.app_id.as_deref(), merchant)?)
        }
        (Attribute::AppId, TransferRequest::PeerTransferQuery(q)) => {
            plain(resolve_app_id(q.app_id.as_deref(), merchant)?)
        }
        (Attribute::PayeeOpenId, TransferRequest::PeerTransfer(r)) => plain(&r.openid),
        (Attribute::CheckName, TransferRequest::PeerTransfer(r)) => {
            let verified = r.verified_name.as_ref().is_some_and(|n| !n.expose().is_empty());
            plain(if verified { FORCE_CHECK } else { NO_CHECK })
        }
        (Attribute::VerifiedName, TransferRequest::PeerTransfer(r)) => {
            r.verified_name.as_ref().and_then(|n| plain(n.expose()))
        }
        (Attribute::Amount, TransferRequest::PeerTransfer(r)) => {
            plain(&to_minor_units(r.amount)?.to_string())
        }
        (Attribute::Amount, TransferRequest::BankCardTransfer(r)) => {
            plain(&to_minor_units(r.amount)?.to_string())
        }
        (Attribute::Description, TransferRequest::PeerTransfer(r)) => plain(&r.description),
        (Attribute::Description, TransferRequest::BankCardTransfer(r)) => plain(&r.description),
        (Attribute::ClientIp, TransferRequest::PeerTransfer(_)) => {
            merchant.spbill_create_ip().and_then(plain)
        }
        (Attribute::BankNo, TransferRequest::BankCardTransfer(r)) => plain(r.bank_no.expose()),
        (Attribute::TrueName, TransferRequest::BankCardTransfer(r)) => {
            plain(r.true_name.expose())
        }
        (Attribute::BankCode, TransferRequest::BankCardTransfer(r)) => plain(&r.bank_code),
        _ => None,
    };

    Ok(value)
}

fn resolve_app_id<'a>(requested: Option<&'a str>, merchant: &'a MerchantContext) -> Result<&'a str> {
    requested
        .filter(|id| !id.is_empty())
        .or_else(|| merchant.app_id())
        .ok_or_else(|| ConfigurationError::MissingAppId(merchant.number().to_string()).into())
}

fn check_rule(rule: &FieldRule, value: &str) -> Result<()> {
    if let Some(max) = rule.max_len
        && value.len() > max
    {
        return Err(ValidationError::FieldTooLong { field: rule.wire, max }.into());
    }

    match rule.charset {
        Charset::Any => {}
        Charset::Identifier => {
            if !value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
                return Err(ValidationError::InvalidField {
                    field: rule.wire,
                    reason: "only ASCII letters, digits and '_' are allowed",
                }
                .into());
            }
        }
    }

    if value.chars().any(char::is_control) {
        return Err(ValidationError::InvalidField {
            field: rule.wire,
            reason: "control characters are not allowed",
        }
        .into());
    }

    Ok(())
}
