//! Session auto-lock
//!
//! The session is Unlocked after a wallet is created or imported, and after
//! a successful `unlock`. It becomes invalid once `auto_lock_minutes` pass
//! without a `touch`. The guard runs no timer: hosts poll
//! [`SessionGuard::enforce_timeout`] (or `is_valid`) and the persisted
//! record flips to Locked on the first poll after expiry.

use zeroize::Zeroizing;

use crate::context::VaultContext;
use crate::error::VaultError;
use crate::records::{SessionRecord, WalletRecord, SESSION_KEY};
use crate::secret_store::SecretStore;
use crate::settings::SettingsStore;
use crate::store::{encode_record, read_record, KvStore, Records};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Locked,
    Unlocked,
    /// Still marked unlocked, but the auto-lock window has passed.
    Expired,
}

pub struct SessionGuard<S> {
    ctx: VaultContext<S>,
    secrets: SecretStore<S>,
    settings: SettingsStore<S>,
}

impl<S> Clone for SessionGuard<S> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            secrets: self.secrets.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<S: KvStore> SessionGuard<S> {
    pub fn new(ctx: VaultContext<S>, secrets: SecretStore<S>, settings: SettingsStore<S>) -> Self {
        Self {
            ctx,
            secrets,
            settings,
        }
    }

    /// A missing session record reads as Locked.
    pub fn status(&self) -> Result<SessionStatus, VaultError> {
        let Some(session) = self.session()? else {
            return Ok(SessionStatus::Locked);
        };
        if !session.unlocked {
            return Ok(SessionStatus::Locked);
        }
        let minutes = self.settings.load()?.auto_lock_minutes;
        if session.is_valid_at(minutes, self.ctx.now_ms()) {
            Ok(SessionStatus::Unlocked)
        } else {
            Ok(SessionStatus::Expired)
        }
    }

    /// Unlocked and inside the auto-lock window. Storage errors count as
    /// invalid.
    pub fn is_valid(&self) -> bool {
        match self.status() {
            Ok(status) => status == SessionStatus::Unlocked,
            Err(e) => {
                log::error!("Session status unavailable: {}", e);
                false
            }
        }
    }

    /// `Err(Locked)` unless the session is valid.
    pub fn require_unlocked(&self) -> Result<(), VaultError> {
        match self.status()? {
            SessionStatus::Unlocked => Ok(()),
            _ => Err(VaultError::Locked),
        }
    }

    pub fn lock(&self) -> Result<(), VaultError> {
        let _guard = self.ctx.write_guard()?;
        if !self.secrets.has_wallet()? {
            return Ok(());
        }
        self.write(SessionRecord::locked_at(self.ctx.now_ms()))?;
        log::info!("Session locked");
        Ok(())
    }

    /// Unlock with the wallet password. A failed attempt leaves the session
    /// as it was and returns the decryption error.
    pub fn unlock(&self, password: &str) -> Result<(), VaultError> {
        // Key derivation happens outside the write lock
        let record = match self.secrets.load_with_record(password) {
            Ok((record, _)) => record,
            Err(e) => {
                log::warn!("Unlock attempt failed: {}", e);
                return Err(e);
            }
        };
        self.mark_unlocked(&record)
    }

    /// Start a session for `verified`, provided it is still the stored
    /// wallet.
    fn mark_unlocked(&self, verified: &WalletRecord) -> Result<(), VaultError> {
        let _guard = self.ctx.write_guard()?;
        match self.secrets.wallet_record()? {
            None => return Err(VaultError::NoWallet),
            Some(current) if current != *verified => {
                log::warn!("Wallet replaced during unlock; session left locked");
                return Err(VaultError::RecordMismatch(
                    "wallet changed during unlock".into(),
                ));
            }
            Some(_) => {}
        }
        self.write(SessionRecord::unlocked_at(self.ctx.now_ms()))?;
        log::info!("Session unlocked");
        Ok(())
    }

    /// Record user activity. Only extends a valid session; an expired one
    /// is locked instead, and a locked one is left alone.
    pub fn touch(&self) -> Result<SessionStatus, VaultError> {
        let _guard = self.ctx.write_guard()?;
        let now = self.ctx.now_ms();
        match self.status()? {
            SessionStatus::Unlocked => {
                self.write(SessionRecord::unlocked_at(now))?;
                Ok(SessionStatus::Unlocked)
            }
            SessionStatus::Expired => {
                self.write(SessionRecord::locked_at(now))?;
                log::info!("Session expired; locked");
                Ok(SessionStatus::Locked)
            }
            SessionStatus::Locked => Ok(SessionStatus::Locked),
        }
    }

    /// Lock the session if its window has passed. Returns `true` if this
    /// call locked it.
    pub fn enforce_timeout(&self) -> Result<bool, VaultError> {
        let _guard = self.ctx.write_guard()?;
        if self.status()? != SessionStatus::Expired {
            return Ok(false);
        }
        self.write(SessionRecord::locked_at(self.ctx.now_ms()))?;
        log::info!("Session expired; locked");
        Ok(true)
    }

    fn session(&self) -> Result<Option<SessionRecord>, VaultError> {
        Ok(read_record(self.ctx.store(), SESSION_KEY)?)
    }

    fn write(&self, session: SessionRecord) -> Result<(), VaultError> {
        let mut batch = Records::new();
        encode_record(&mut batch, SESSION_KEY, &session)?;
        self.ctx.store().set(batch)?;
        Ok(())
    }
}

impl<S: KvStore + 'static> SessionGuard<S> {
    /// [`SessionGuard::unlock`] on the blocking pool.
    pub async fn unlock_async(&self, password: Zeroizing<String>) -> Result<(), VaultError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.unlock(&password)).await?
    }
}
