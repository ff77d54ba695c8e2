//! DNTKey Vault
//!
//! Encrypted wallet persistence and session auto-lock on top of a generic
//! key-value store.
//!
//! ```text
//! Wallet ──► SessionGuard ──► SecretStore ──► KvStore (MemoryStore | SqliteStore)
//!                 │                  │
//!                 └── SettingsStore ─┘
//! ```
//!
//! Nothing here is a process-wide singleton: every component is built from
//! a [`VaultContext`] holding the store, a [`Clock`] and a shared write lock.

pub mod context;
pub mod error;
pub mod ledger;
pub mod records;
pub mod secret_store;
pub mod session;
pub mod settings;
pub mod sqlite;
pub mod store;
pub mod wallet;

pub use context::{Clock, ManualClock, SystemClock, VaultContext};
pub use error::VaultError;
pub use ledger::{BalanceAndNonce, LedgerTransport};
pub use records::{SessionRecord, Settings, WalletRecord};
pub use secret_store::{LoadedWallet, SecretStore};
pub use session::{SessionGuard, SessionStatus};
pub use settings::{validate_settings, SettingsStore};
pub use sqlite::SqliteStore;
pub use store::{KvStore, MemoryStore, StoreChange, StoreError};
pub use wallet::{ExportedSecrets, SentTransaction, Wallet};
