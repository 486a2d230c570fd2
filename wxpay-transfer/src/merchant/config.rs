//! Merchant configuration types.
//!
//! [`PayConfig`] is the TOML-deserializable description of every merchant the process
//! may act for. It only names where secret material lives; the material itself is read
//! once by [`CredentialStore::from_config`](super::CredentialStore::from_config).
//!
//! ```toml
//! default_merchant = 1
//! spbill_create_ip = "203.0.113.7"
//!
//! [http]
//! timeout_secs = 20
//!
//! [merchants.1]
//! mch_id = "1900000109"
//! app_id = "wx8888888888888888"
//! sign_key = { env = "WXPAY_1_KEY" }
//! client_cert = { file = "/etc/wxpay/1/apiclient_cert.p12" }
//! cert_password = { env = "WXPAY_1_CERT_PASSWORD" }
//! public_key = { file = "/etc/wxpay/1/public.pem" }
//! ```

use std::{collections::BTreeMap, fmt, path::PathBuf};

use serde::Deserialize;

use crate::{
    error::{ConfigurationError, Result},
    merchant::Secret,
    protocol::SignType,
    transport::HttpConfig,
};

/// Merchant number used when a configuration does not name one.
pub const DEFAULT_MERCHANT: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PayConfig {
    /// Merchant used for [`MerchantKey::Default`](super::MerchantKey::Default).
    #[serde(default = "default_merchant")]
    pub default_merchant: u32,

    /// Caller IP announced on peer transfers, unless a merchant overrides it.
    #[serde(default)]
    pub spbill_create_ip: Option<String>,

    /// Transport settings shared by all merchants.
    #[serde(default)]
    pub http: HttpConfig,

    /// Merchants keyed by their number.
    #[serde(default)]
    pub merchants: BTreeMap<String, MerchantConfig>,
}

/// Configuration of a single merchant account.
#[derive(Debug, Clone, Deserialize)]
pub struct MerchantConfig {
    /// Merchant id assigned by the provider.
    pub mch_id: String,

    /// App id used for peer transfers.
    #[serde(default)]
    pub app_id: Option<String>,

    /// API signing key.
    #[serde(default)]
    pub sign_key: Option<SecretSource>,

    /// Digest used with the signing key.
    #[serde(default)]
    pub sign_type: SignType,

    /// Client certificate for mutual TLS.
    #[serde(default)]
    pub client_cert: Option<SecretSource>,

    /// Encoding of `client_cert`.
    #[serde(default)]
    pub cert_format: CertFormat,

    /// PKCS#8 private key, required when `cert_format = "pem"`.
    #[serde(default)]
    pub client_key: Option<SecretSource>,

    /// Password of the PKCS#12 bundle, required when `cert_format = "pkcs12"`.
    #[serde(default)]
    pub cert_password: Option<SecretSource>,

    /// Provider RSA public key (PEM) for bank-card disbursements.
    #[serde(default)]
    pub public_key: Option<SecretSource>,

    /// Caller IP overriding the global one.
    #[serde(default)]
    pub spbill_create_ip: Option<String>,
}

/// Encoding of the client certificate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertFormat {
    /// PKCS#12 bundle (`apiclient_cert.p12`) protected by a password.
    #[default]
    Pkcs12,
    /// PEM certificate chain plus a separate PKCS#8 PEM key.
    Pem,
}

/// Where a piece of secret material is read from.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSource {
    /// Inline value.
    Value(String),
    /// File contents, read as raw bytes.
    File(PathBuf),
    /// Environment variable contents.
    Env(String),
}

impl SecretSource {
    /// Reads the secret.
    ///
    /// `merchant` and `material` only label errors.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::MissingKeyMaterial`] if the source is empty or the
    ///   environment variable is unset
    /// - [`ConfigurationError::InvalidConfig`] if the file cannot be read
    pub fn load(&self, merchant: &str, material: &'static str) -> Result<Secret> {
        let missing =
            || ConfigurationError::MissingKeyMaterial { merchant: merchant.to_owned(), material };

        let secret = match self {
            Self::Value(value) => Secret::from(value.as_str()),
            Self::File(path) => Secret::new(std::fs::read(path).map_err(|e| {
                ConfigurationError::InvalidConfig(format!(
                    "cannot read {material} for merchant {merchant} from {}: {e}",
                    path.display()
                ))
            })?),
            Self::Env(name) => Secret::from(std::env::var(name).map_err(|_| missing())?),
        };

        if secret.is_empty() {
            return Err(missing().into());
        }
        Ok(secret)
    }

    /// Reads a text secret such as a signing key or certificate password.
    ///
    /// Same as [`SecretSource::load`] with trailing ASCII whitespace removed, so a
    /// key file ending in a newline signs like the inline value.
    ///
    /// # Errors
    ///
    /// As [`SecretSource::load`]; a secret that is only whitespace counts as missing.
    pub fn load_text(&self, merchant: &str, material: &'static str) -> Result<Secret> {
        let secret = self.load(merchant, material)?.trim_end();
        if secret.is_empty() {
            return Err(ConfigurationError::MissingKeyMaterial {
                merchant: merchant.to_owned(),
                material,
            }
            .into());
        }
        Ok(secret)
    }
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value([REDACTED])"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Env(name) => f.debug_tuple("Env").field(name).finish(),
        }
    }
}

impl PayConfig {
    /// Parses a TOML configuration and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfig`] if the TOML is malformed or
    /// [`PayConfig::validate`] fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use wxpay_transfer::merchant::PayConfig;
    ///
    /// let config = PayConfig::from_toml(
    ///     r#"
    ///     [merchants.1]
    ///     mch_id = "1900000109"
    ///     sign_key = { value = "192006250b4c09247ec02edce69f6a2d" }
    ///     client_cert = { file = "apiclient_cert.p12" }
    ///     cert_password = { env = "WXPAY_CERT_PASSWORD" }
    ///     "#,
    /// )?;
    /// assert_eq!(config.default_merchant, 1);
    /// # Ok::<(), wxpay_transfer::error::TransferError>(())
    /// ```
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            ConfigurationError::InvalidConfig(format!("invalid TOML config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigurationError::InvalidConfig(format!("cannot read config file: {e}"))
        })?;
        Self::from_toml(&content)
    }

    /// Validates the configuration without touching secret material.
    ///
    /// Checks that:
    /// - at least one merchant is configured and every key is a merchant number
    /// - the default merchant is configured
    /// - every merchant has a non-empty `mch_id`
    /// - environment variable names are well-formed
    /// - HTTP settings are in range and the API base is HTTPS
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.merchants.is_empty() {
            return Err(invalid("no merchants configured"));
        }

        for (number, merchant) in &self.merchants {
            parse_merchant_number(number)?;
            merchant.validate(number)?;
        }

        if !self.merchants.contains_key(&self.default_merchant.to_string()) {
            return Err(invalid(format!(
                "default merchant {} is not configured",
                self.default_merchant
            )));
        }

        self.http.validate()
    }

    /// Merchants with their parsed numbers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfig`] for a key that is not a merchant number.
    pub fn numbered_merchants(&self) -> Result<Vec<(u32, &MerchantConfig)>> {
        self.merchants
            .iter()
            .map(|(number, merchant)| Ok((parse_merchant_number(number)?, merchant)))
            .collect()
    }
}

impl MerchantConfig {
    /// Validates a single merchant table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfig`] if `mch_id` is empty or an
    /// environment variable name is malformed.
    pub fn validate(&self, number: &str) -> Result<()> {
        if self.mch_id.trim().is_empty() {
            return Err(invalid(format!("merchant {number} has an empty mch_id")));
        }

        let sources = [
            &self.sign_key,
            &self.client_cert,
            &self.client_key,
            &self.cert_password,
            &self.public_key,
        ];
        for source in sources.into_iter().flatten() {
            if let SecretSource::Env(name) = source {
                validate_env_var_name(name)?;
            }
        }

        Ok(())
    }
}

fn default_merchant() -> u32 {
    DEFAULT_MERCHANT
}

fn parse_merchant_number(number: &str) -> Result<u32> {
    number
        .parse()
        .map_err(|_| invalid(format!("merchant key '{number}' is not a merchant number")))
}

fn invalid(message: impl Into<String>) -> crate::error::TransferError {
    ConfigurationError::InvalidConfig(message.into()).into()
}

/// Validates environment variable name.
///
/// Environment variable names must be alphanumeric with underscores only,
/// and must start with a letter or underscore.
fn validate_env_var_name(name: &str) -> Result<()> {
    let Some(first_char) = name.chars().next() else {
        return Err(invalid("environment variable name cannot be empty"));
    };

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(invalid(format!(
            "environment variable name must start with letter or underscore: {name}"
        )));
    }

    if let Some(ch) = name.chars().find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(invalid(format!(
            "environment variable name contains invalid character '{ch}': {name}"
        )));
    }

    Ok(())
}
