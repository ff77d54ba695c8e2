//! Ledger transport interface.

use dntkey_core::{Address, SignedTransaction};
use serde::{Deserialize, Serialize};

/// Account state as reported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BalanceAndNonce {
    pub dnt: u64,
    pub afc: u64,
    /// Used verbatim as the next transaction's nonce
    pub nonce: u64,
}

/// Connection to a DNT node.
pub trait LedgerTransport {
    type Error: std::error::Error + Send + Sync + 'static;

    fn balance_and_nonce(&self, address: &Address) -> Result<BalanceAndNonce, Self::Error>;

    /// Submit a signed transaction. Returns the ledger's transaction hash.
    fn broadcast(&self, signed: &SignedTransaction) -> Result<String, Self::Error>;

    fn block_height(&self) -> Result<u64, Self::Error>;
}
