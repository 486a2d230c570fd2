//! End-to-end request pipeline.
//!
//! [`TransferClient`] runs every request through the same stages:
//!
//! 1. resolve the merchant in the [`CredentialStore`]
//! 2. build the canonical parameter set with a fresh nonce
//! 3. encrypt sensitive fields (bank-card disbursements only)
//! 4. sign
//! 5. send over the [`Transport`]
//! 6. interpret the response
//!
//! Failures in stages 1-4 are returned as `Err` and guarantee nothing was sent. Once a
//! request is dispatched, every outcome is folded into exactly one [`TransferResult`].
//! Nothing is retried; a retry is a new call and therefore a new nonce.

use std::{sync::Arc, time::Instant};

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    audit::{AuditEvent, AuditEventType, audit_log},
    error::{ConfigurationError, Result},
    merchant::{CredentialStore, MerchantContext, MerchantKey, PayConfig},
    protocol::{
        BankCardTransfer, ParameterSet, PeerTransfer, TransferQuery,
        TransferRequest, TransferResult, build, encrypt_sensitive_fields, interpret,
    },
    transport::{HttpTransport, Transport},
};

/// Money-movement client bound to a credential store and a transport.
///
/// The client holds no mutable state, so one instance can serve concurrent calls for any
/// mix of merchants.
///
/// # Examples
///
/// ```rust,no_run
/// use rust_decimal::Decimal;
/// use wxpay_transfer::{
///     client::TransferClient,
///     merchant::{MerchantKey, PayConfig},
///     protocol::PeerTransfer,
/// };
///
/// # async fn example() -> wxpay_transfer::error::Result<()> {
/// let config = PayConfig::from_file("wxpay.toml")?;
/// let client = TransferClient::from_config(&config)?;
///
/// let transfer = PeerTransfer::new(
///     "T202401010001",
///     "oUpF8uMuAJO_M2pxb1Q9zNjWeS6o",
///     Decimal::new(1234, 2),
///     "refund",
/// );
/// let result = client.peer_transfer(MerchantKey::Default, transfer).await?;
/// println!("{}", result.label());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TransferClient<T: Transport> {
    store: Arc<CredentialStore>,
    transport: T,
}

impl TransferClient<HttpTransport> {
    /// Loads credentials and builds the mutual-TLS transport from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Configuration`](crate::error::TransferError::Configuration)
    /// if key material cannot be loaded or a client certificate is unusable.
    pub fn from_config(config: &PayConfig) -> Result<Self> {
        let store = CredentialStore::from_config(config)?;
        let transport = HttpTransport::new(&config.http, &store)?;
        Ok(Self::new(store, transport))
    }
}

impl<T: Transport> TransferClient<T> {
    /// Creates a client over an existing store and transport.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "accepts an owned or already shared store"
    )]
    pub fn new(store: impl Into<Arc<CredentialStore>>, transport: T) -> Self {
        Self { store: store.into(), transport }
    }

    /// Credential store used to resolve merchants.
    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Transfers to a payee's wallet balance.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn peer_transfer(
        &self,
        merchant: MerchantKey,
        transfer: PeerTransfer,
    ) -> Result<TransferResult> {
        self.execute(merchant, TransferRequest::PeerTransfer(transfer)).await
    }

    /// Looks up a peer transfer by its idempotency key.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn query_peer_transfer(
        &self,
        merchant: MerchantKey,
        query: TransferQuery,
    ) -> Result<TransferResult> {
        self.execute(merchant, TransferRequest::PeerTransferQuery(query)).await
    }

    /// Disburses to a bank card.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute). A merchant without a provider public key fails
    /// with [`ConfigurationError::MissingKeyMaterial`].
    pub async fn bank_card_transfer(
        &self,
        merchant: MerchantKey,
        transfer: BankCardTransfer,
    ) -> Result<TransferResult> {
        self.execute(merchant, TransferRequest::BankCardTransfer(transfer)).await
    }

    /// Looks up a bank-card disbursement by its idempotency key.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn query_bank_card_transfer(
        &self,
        merchant: MerchantKey,
        query: TransferQuery,
    ) -> Result<TransferResult> {
        self.execute(merchant, TransferRequest::BankCardQuery(query)).await
    }

    /// Runs a request through the full pipeline.
    ///
    /// # Errors
    ///
    /// Returns `Err` only when the request was never sent:
    ///
    /// - [`TransferError::Configuration`](crate::error::TransferError::Configuration) for an
    ///   unknown merchant or missing key material
    /// - [`TransferError::Validation`](crate::error::TransferError::Validation) for fields
    ///   the provider would reject
    /// - [`TransferError::Encryption`](crate::error::TransferError::Encryption) if sensitive
    ///   fields cannot be encrypted
    ///
    /// Transport and protocol failures after dispatch are reported through the returned
    /// [`TransferResult`].
    #[instrument(skip_all, fields(kind = ?request.kind(), merchant = %merchant))]
    pub async fn execute(
        &self,
        merchant: MerchantKey,
        request: TransferRequest,
    ) -> Result<TransferResult> {
        let context = self.store.resolve(merchant)?;
        let kind = request.kind();

        let fields = prepare(&request, &context)?;
        let nonce = fields.get("nonce_str").unwrap_or_default().to_owned();
        let envelope = fields.sign(context.signing_key());

        let request_id = Uuid::new_v4();
        let mut submitted = AuditEvent::new(
            AuditEventType::TransferSubmitted,
            kind,
            context.mch_id(),
            request_id,
        )
        .with_partner_trade_no(request.partner_trade_no())
        .with_nonce(nonce);
        if let Some(payee) = request.payee() {
            submitted = submitted.with_payee(payee);
        }
        if let Some(amount) = request.amount() {
            submitted = submitted.with_amount(amount);
        }
        audit_log(&submitted);

        let started = Instant::now();
        let result = match self.transport.send(&envelope, &context, kind.endpoint()).await {
            Ok(response) => interpret(kind, response, context.signing_key()),
            Err(err) => match TransferResult::from_dispatch_error(err) {
                Ok(result) => result,
                Err(err) => {
                    audit_log(
                        &AuditEvent::new(
                            AuditEventType::TransferRejected,
                            kind,
                            context.mch_id(),
                            request_id,
                        )
                        .with_partner_trade_no(request.partner_trade_no())
                        .with_error(&err)
                        .with_duration(started.elapsed()),
                    );
                    return Err(err);
                }
            },
        };
        let elapsed = started.elapsed();

        if result.outcome_unknown() {
            warn!(
                outcome = result.label(),
                partner_trade_no = request.partner_trade_no(),
                "transfer outcome unknown, query before retrying"
            );
        } else {
            info!(outcome = result.label(), elapsed_ms = elapsed.as_millis(), "request completed");
        }

        audit_log(
            &AuditEvent::new(AuditEventType::for_result(&result), kind, context.mch_id(), request_id)
                .with_partner_trade_no(request.partner_trade_no())
                .with_result(&result)
                .with_duration(elapsed),
        );

        Ok(result)
    }
}

/// Builds the parameter set and encrypts it where the variant requires.
fn prepare(request: &TransferRequest, merchant: &MerchantContext) -> Result<ParameterSet> {
    let kind = request.kind();
    let fields = build(request, merchant)?;

    if kind.encrypted_fields().next().is_none() {
        return Ok(fields);
    }

    let public_key = merchant.public_key().ok_or_else(|| ConfigurationError::MissingKeyMaterial {
        merchant: merchant.number().to_string(),
        material: "public_key",
    })?;
    encrypt_sensitive_fields(fields, kind, public_key)
}
