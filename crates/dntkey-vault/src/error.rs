use dntkey_core::{AddressError, CryptoError, KeyError, MnemonicError, TxError};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Wallet is locked")]
    Locked,

    #[error("No wallet found")]
    NoWallet,

    #[error("A wallet already exists; wipe it first")]
    WalletExists,

    /// Stored public data disagrees with the decrypted key.
    #[error("Wallet record mismatch: {0}")]
    RecordMismatch(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Mnemonic(#[from] MnemonicError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Tx(#[from] TxError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Ledger error: {0}")]
    Ledger(Box<dyn std::error::Error + Send + Sync>),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl VaultError {
    /// Wrong password (or corrupted ciphertext, which is indistinguishable).
    pub fn is_wrong_password(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::DecryptionFailed))
    }
}
