//! Provider endpoints.

use std::fmt;

use serde::Serialize;

/// Fixed provider endpoint paths, relative to the API base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// Wallet transfer.
    PeerTransfer,
    /// Wallet transfer query.
    PeerTransferQuery,
    /// Bank-card disbursement.
    BankCardTransfer,
    /// Bank-card disbursement query.
    BankCardQuery,
}

impl Endpoint {
    /// Path on the API host.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::PeerTransfer => "/mmpaymkttransfers/promotion/transfers",
            Self::PeerTransferQuery => "/mmpaymkttransfers/gettransferinfo",
            Self::BankCardTransfer => "/mmpaysptrans/pay_bank",
            Self::BankCardQuery => "/mmpaysptrans/query_bank",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(Endpoint::PeerTransfer.path(), "/mmpaymkttransfers/promotion/transfers");
        assert_eq!(Endpoint::BankCardTransfer.path(), "/mmpaysptrans/pay_bank");
        assert_eq!(Endpoint::BankCardQuery.to_string(), "/mmpaysptrans/query_bank");
    }
}
