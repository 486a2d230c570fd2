//! wxpay-transfer: operator CLI for merchant transfers
//!
//! Loads a TOML configuration, runs exactly one operation and prints the outcome as
//! JSON on stdout. Logs and audit events go to stderr.
//!
//! # Exit status
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | The provider accepted the request |
//! | 1 | The request was not sent (configuration, validation or encryption error) |
//! | 2 | The provider declined the request |
//! | 3 | Outcome unknown: query before retrying |
//! | 4 | The request was not delivered |

#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from rsa and reqwest"
)]

mod observability;

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::debug;
use wxpay_transfer::{
    PayConfig, TransferClient,
    merchant::MerchantKey,
    protocol::{BankCardTransfer, PeerTransfer, TransferQuery, TransferRequest, TransferResult},
};

use crate::observability::{LogFormat, init_observability};

#[derive(Parser, Debug)]
#[command(name = "wxpay-transfer", version, about = "Signed merchant transfers and bank-card disbursements")]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(short, long, env = "WXPAY_CONFIG", default_value = "wxpay.toml")]
    config: PathBuf,

    /// Merchant number; the configured default merchant when omitted.
    #[arg(short, long, global = true)]
    merchant: Option<u32>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transfer to a payee's wallet balance.
    PeerTransfer(PeerTransferArgs),
    /// Query a wallet transfer.
    QueryPeer(QueryArgs),
    /// Disburse to a bank card.
    BankTransfer(BankTransferArgs),
    /// Query a bank-card disbursement.
    QueryBank(QueryArgs),
}

#[derive(Args, Debug)]
struct PeerTransferArgs {
    /// Idempotency key; reuse it when retrying the same transfer.
    #[arg(long)]
    trade_no: String,
    /// Payee openid.
    #[arg(long)]
    openid: String,
    /// Amount in major units, e.g. `12.34`.
    #[arg(long)]
    amount: Decimal,
    /// Description shown to the payee.
    #[arg(long)]
    desc: String,
    /// Real name to verify against the payee account.
    #[arg(long, env = "WXPAY_VERIFIED_NAME", hide_env_values = true)]
    verified_name: Option<String>,
    /// App id overriding the merchant's configured one.
    #[arg(long)]
    app_id: Option<String>,
}

#[derive(Args, Debug)]
struct BankTransferArgs {
    /// Idempotency key; reuse it when retrying the same transfer.
    #[arg(long)]
    trade_no: String,
    /// Bank account number.
    #[arg(long, env = "WXPAY_BANK_NO", hide_env_values = true)]
    bank_no: String,
    /// Account holder name.
    #[arg(long, env = "WXPAY_TRUE_NAME", hide_env_values = true)]
    true_name: String,
    /// Provider bank code.
    #[arg(long)]
    bank_code: String,
    /// Amount in major units, e.g. `500.00`.
    #[arg(long)]
    amount: Decimal,
    /// Description of the disbursement.
    #[arg(long)]
    desc: String,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Idempotency key of the transfer.
    #[arg(long)]
    trade_no: String,
    /// App id override (wallet transfers only).
    #[arg(long)]
    app_id: Option<String>,
}

impl QueryArgs {
    fn into_query(self) -> TransferQuery {
        let query = TransferQuery::new(self.trade_no);
        match self.app_id {
            Some(app_id) => query.with_app_id(app_id),
            None => query,
        }
    }
}

impl Command {
    fn into_request(self) -> TransferRequest {
        match self {
            Self::PeerTransfer(args) => {
                let mut transfer =
                    PeerTransfer::new(args.trade_no, args.openid, args.amount, args.desc);
                if let Some(name) = args.verified_name {
                    transfer = transfer.with_verified_name(name);
                }
                if let Some(app_id) = args.app_id {
                    transfer = transfer.with_app_id(app_id);
                }
                transfer.into()
            }
            Self::QueryPeer(args) => TransferRequest::PeerTransferQuery(args.into_query()),
            Self::BankTransfer(args) => BankCardTransfer::new(
                args.trade_no,
                args.bank_no,
                args.true_name,
                args.bank_code,
                args.amount,
                args.desc,
            )
            .into(),
            Self::QueryBank(args) => TransferRequest::BankCardQuery(args.into_query()),
        }
    }
}

/// Maps an outcome to the process exit status.
fn exit_code(result: &TransferResult) -> u8 {
    match result {
        TransferResult::Success(_) => 0,
        other if other.outcome_unknown() => 3,
        TransferResult::BusinessFailure(_) => 2,
        _ => 4,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_observability(LogFormat::from_env(), cli.verbose);

    let config = PayConfig::from_file(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let client = TransferClient::from_config(&config).context("initializing merchants")?;
    debug!(merchants = client.store().len(), "client ready");

    let merchant = MerchantKey::from(cli.merchant);
    let result = client
        .execute(merchant, cli.command.into_request())
        .await
        .context("request was not sent")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(ExitCode::from(exit_code(&result)))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use wxpay_transfer::{error::TransportFailureKind, protocol::BusinessFailure};

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_peer_transfer() {
        let cli = Cli::try_parse_from([
            "wxpay-transfer",
            "--config",
            "pay.toml",
            "--merchant",
            "2",
            "peer-transfer",
            "--trade-no",
            "T202401010001",
            "--openid",
            "oUpF8uMuAJO_M2pxb1Q9zNjWeS6o",
            "--amount",
            "12.34",
            "--desc",
            "refund",
        ])
        .unwrap();

        assert_eq!(cli.merchant, Some(2));
        let TransferRequest::PeerTransfer(transfer) = cli.command.into_request() else {
            panic!("expected peer transfer");
        };
        assert_eq!(transfer.amount, Decimal::new(1234, 2));
        assert!(transfer.verified_name.is_none());
    }

    #[test]
    fn test_parse_query_bank() {
        let cli =
            Cli::try_parse_from(["wxpay-transfer", "query-bank", "--trade-no", "B1"]).unwrap();
        assert_eq!(cli.merchant, None);
        assert!(matches!(
            cli.command.into_request(),
            TransferRequest::BankCardQuery(ref q) if q.partner_trade_no == "B1"
        ));
    }

    #[test]
    fn test_rejects_malformed_amount() {
        let parsed = Cli::try_parse_from([
            "wxpay-transfer",
            "peer-transfer",
            "--trade-no",
            "T1",
            "--openid",
            "o",
            "--amount",
            "twelve",
            "--desc",
            "d",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_exit_codes() {
        let declined = TransferResult::BusinessFailure(BusinessFailure {
            code: "NOTENOUGH".into(),
            message: "balance too low".into(),
        });
        let system_error = TransferResult::BusinessFailure(BusinessFailure {
            code: "SYSTEMERROR".into(),
            message: "retry later".into(),
        });
        let refused = TransferResult::TransportFailure {
            kind: TransportFailureKind::Connect,
            cause: "refused".into(),
        };
        let timeout = TransferResult::TransportFailure {
            kind: TransportFailureKind::Timeout,
            cause: "slow".into(),
        };

        assert_eq!(exit_code(&declined), 2);
        assert_eq!(exit_code(&system_error), 3);
        assert_eq!(exit_code(&timeout), 3);
        assert_eq!(exit_code(&refused), 4);
        assert_eq!(exit_code(&TransferResult::ProtocolFailure { reason: "x".into() }), 3);
    }
}
