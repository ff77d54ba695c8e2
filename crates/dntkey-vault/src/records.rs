//! Persisted record shapes.
//!
//! The store holds exactly three records, stored as JSON under
//! [`WALLET_KEY`], [`SETTINGS_KEY`] and [`SESSION_KEY`].

use dntkey_core::encoding::hex_array;
use dntkey_core::keys::PUBLIC_KEY_LEN;
use dntkey_core::{Address, EncryptedSecret};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const WALLET_KEY: &str = "wallet";
pub const SETTINGS_KEY: &str = "settings";
pub const SESSION_KEY: &str = "session";

/// Default auto-lock window
pub const DEFAULT_AUTO_LOCK_MINUTES: u32 = 15;

/// Default ledger RPC endpoint
pub const DEFAULT_RPC_ENDPOINT: &str = "http://127.0.0.1:9933";

const MS_PER_MINUTE: u64 = 60_000;

/// Public half of the wallet plus its encrypted secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub address: Address,
    #[serde(with = "hex_array")]
    pub public_key: [u8; PUBLIC_KEY_LEN],
    pub encrypted: EncryptedSecret,
}

/// Session state. Overwritten on every lock, unlock and touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub unlocked: bool,
    /// Unix epoch milliseconds of the last user activity
    pub last_activity_ms: u64,
}

impl SessionRecord {
    pub fn unlocked_at(now_ms: u64) -> Self {
        Self {
            unlocked: true,
            last_activity_ms: now_ms,
        }
    }

    pub fn locked_at(now_ms: u64) -> Self {
        Self {
            unlocked: false,
            last_activity_ms: now_ms,
        }
    }

    /// `unlocked && now - last_activity < auto_lock_minutes`.
    ///
    /// A clock that went backwards counts as zero elapsed time.
    pub fn is_valid_at(&self, auto_lock_minutes: u32, now_ms: u64) -> bool {
        let elapsed = now_ms.saturating_sub(self.last_activity_ms);
        self.unlocked && elapsed < u64::from(auto_lock_minutes) * MS_PER_MINUTE
    }
}

/// User-adjustable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub rpc_endpoint: String,
    pub auto_lock_minutes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc_endpoint: DEFAULT_RPC_ENDPOINT.to_string(),
            auto_lock_minutes: DEFAULT_AUTO_LOCK_MINUTES,
        }
    }
}

/// Plaintext inside `WalletRecord::encrypted`.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SecretPayload {
    pub private_key: String,
    pub mnemonic: Option<String>,
}
