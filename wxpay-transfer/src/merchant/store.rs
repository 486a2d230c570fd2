//! Read-only registry of merchant credentials.

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, instrument};

use super::{
    ClientCertificate, MerchantContext, MerchantKey, ProviderPublicKey,
    config::{CertFormat, MerchantConfig, PayConfig},
};
use crate::{
    error::{ConfigurationError, Result},
    protocol::SigningKey,
};

/// Resolves merchant keys to their credentials.
///
/// Built once from an explicit configuration value and never mutated afterwards, so it
/// can be shared across tasks and threads without locking. Every
/// [`resolve`](Self::resolve) returns the context of exactly one merchant.
///
/// # Examples
///
/// ```
/// use wxpay_transfer::{
///     merchant::{ClientCertificate, CredentialStore, MerchantContext, MerchantKey, Secret},
///     protocol::{SignType, SigningKey},
/// };
///
/// let merchant = MerchantContext::new(
///     1,
///     "1900000109",
///     SigningKey::new("192006250b4c09247ec02edce69f6a2d", SignType::Md5),
///     ClientCertificate::Pkcs12 { der: Secret::new(vec![0x30]), password: Secret::from("pw") },
/// );
/// let store = CredentialStore::new(1, [merchant])?;
///
/// assert_eq!(store.resolve(MerchantKey::Default)?.mch_id(), "1900000109");
/// assert!(store.resolve(MerchantKey::Id(2)).is_err());
/// # Ok::<(), wxpay_transfer::error::TransferError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CredentialStore {
    default_merchant: u32,
    merchants: HashMap<u32, Arc<MerchantContext>>,
}

impl CredentialStore {
    /// Creates a store from resolved contexts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfig`] if no merchant is given, two contexts
    /// share a number, or the default merchant is missing.
    pub fn new(
        default_merchant: u32,
        merchants: impl IntoIterator<Item = MerchantContext>,
    ) -> Result<Self> {
        let mut map = HashMap::new();
        for context in merchants {
            let number = context.number();
            if map.insert(number, Arc::new(context)).is_some() {
                return Err(ConfigurationError::InvalidConfig(format!(
                    "merchant {number} configured twice"
                ))
                .into());
            }
        }

        if map.is_empty() {
            return Err(
                ConfigurationError::InvalidConfig("no merchants configured".to_owned()).into()
            );
        }
        if !map.contains_key(&default_merchant) {
            return Err(ConfigurationError::InvalidConfig(format!(
                "default merchant {default_merchant} is not configured"
            ))
            .into());
        }

        Ok(Self { default_merchant, merchants: map })
    }

    /// Loads every merchant's secret material and builds the store.
    ///
    /// This is the only place configuration sources (files, environment variables) are
    /// read. Downstream components only see the in-memory material.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::MissingKeyMaterial`] if a merchant lacks its signing key,
    ///   client certificate, certificate password (PKCS#12) or private key (PEM)
    /// - [`ConfigurationError::InvalidConfig`] if the configuration is invalid or a file
    ///   cannot be read
    #[instrument(skip(config), fields(merchants = config.merchants.len()))]
    pub fn from_config(config: &PayConfig) -> Result<Self> {
        config.validate()?;

        let mut contexts = Vec::with_capacity(config.merchants.len());
        for (number, merchant) in config.numbered_merchants()? {
            let context = load_merchant(number, merchant, config.spbill_create_ip.as_deref())?;
            debug!(merchant = number, mch_id = context.mch_id(), "loaded merchant credentials");
            contexts.push(context);
        }

        Self::new(config.default_merchant, contexts)
    }

    /// Resolves a merchant key to its context.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownMerchant`] if no merchant has that number.
    pub fn resolve(&self, key: MerchantKey) -> Result<Arc<MerchantContext>> {
        let number = match key {
            MerchantKey::Default => self.default_merchant,
            MerchantKey::Id(number) => number,
        };
        self.merchants
            .get(&number)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownMerchant(number.to_string()).into())
    }

    /// Number of the default merchant.
    #[must_use]
    pub const fn default_merchant(&self) -> u32 {
        self.default_merchant
    }

    /// All configured merchants, in no particular order.
    pub fn merchants(&self) -> impl Iterator<Item = &Arc<MerchantContext>> {
        self.merchants.values()
    }

    /// Number of configured merchants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.merchants.len()
    }

    /// Returns `true` if no merchant is configured. Never true for a built store.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.merchants.is_empty()
    }
}

fn load_merchant(
    number: u32,
    config: &MerchantConfig,
    global_ip: Option<&str>,
) -> Result<MerchantContext> {
    let label = number.to_string();
    let missing = |material| ConfigurationError::MissingKeyMaterial {
        merchant: label.clone(),
        material,
    };

    let sign_key = config.sign_key.as_ref().ok_or_else(|| missing("sign_key"))?;
    let signing_key = SigningKey::new(sign_key.load_text(&label, "sign_key")?, config.sign_type);

    let cert_source = config.client_cert.as_ref().ok_or_else(|| missing("client_cert"))?;
    let cert = cert_source.load(&label, "client_cert")?;
    let certificate = match config.cert_format {
        CertFormat::Pkcs12 => {
            let password = config.cert_password.as_ref().ok_or_else(|| missing("cert_password"))?;
            ClientCertificate::Pkcs12 {
                der: cert,
                password: password.load_text(&label, "cert_password")?,
            }
        }
        CertFormat::Pem => {
            let key = config.client_key.as_ref().ok_or_else(|| missing("client_key"))?;
            ClientCertificate::Pem {
                cert: cert.expose().to_vec(),
                key: key.load(&label, "client_key")?,
            }
        }
    };

    let mut context = MerchantContext::new(number, config.mch_id.trim(), signing_key, certificate);
    if let Some(app_id) = config.app_id.as_deref().filter(|id| !id.is_empty()) {
        context = context.with_app_id(app_id);
    }
    if let Some(source) = &config.public_key {
        let pem = source.load(&label, "public_key")?;
        context = context.with_public_key(ProviderPublicKey::from_pem(pem.expose()));
    }
    if let Some(ip) = config.spbill_create_ip.as_deref().or(global_ip).filter(|ip| !ip.is_empty()) {
        context = context.with_spbill_create_ip(ip);
    }

    Ok(context)
}
