//! Single-address wallet
//!
//! Ties the secret store, session guard and settings together. Every
//! operation that touches key material re-decrypts it from the store with
//! the caller's password and drops it before returning.
//!
//! # Nonces
//!
//! [`Wallet::send`] asks the ledger for the account nonce and signs with it
//! verbatim. Two sends racing against the same ledger state will produce
//! two transactions with the same nonce; the ledger accepts at most one.
//! Callers that need several transfers in flight must serialize them.

use std::fmt;
use std::sync::Arc;

use dntkey_core::{
    derive_address, generate_key_pair, generate_mnemonic, import_from_private_key,
    keypair_from_mnemonic, sign_transaction, Address, KeyPair, Mnemonic, SignedTransaction,
    TokenType, Transaction,
};
use zeroize::Zeroizing;

use crate::context::{Clock, VaultContext};
use crate::error::VaultError;
use crate::ledger::LedgerTransport;
use crate::records::Settings;
use crate::secret_store::SecretStore;
use crate::session::{SessionGuard, SessionStatus};
use crate::settings::SettingsStore;
use crate::store::KvStore;

/// Secrets returned by [`Wallet::export_secrets`].
pub struct ExportedSecrets {
    pub address: Address,
    pub private_key: Zeroizing<String>,
    pub mnemonic: Option<Mnemonic>,
}

impl fmt::Debug for ExportedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportedSecrets")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .field("mnemonic", &self.mnemonic)
            .finish()
    }
}

/// Result of a broadcast transfer.
#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub signed: SignedTransaction,
    pub tx_hash: String,
}

pub struct Wallet<S> {
    secrets: SecretStore<S>,
    session: SessionGuard<S>,
    settings: SettingsStore<S>,
}

impl<S> Clone for Wallet<S> {
    fn clone(&self) -> Self {
        Self {
            secrets: self.secrets.clone(),
            session: self.session.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<S: KvStore> Wallet<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, defaults: Settings) -> Self {
        Self::from_context(VaultContext::new(store, clock), defaults)
    }

    pub fn from_context(ctx: VaultContext<S>, defaults: Settings) -> Self {
        let secrets = SecretStore::new(ctx.clone());
        let settings = SettingsStore::new(ctx.clone(), defaults);
        let session = SessionGuard::new(ctx, secrets.clone(), settings.clone());
        Self {
            secrets,
            session,
            settings,
        }
    }

    pub fn secrets(&self) -> &SecretStore<S> {
        &self.secrets
    }

    pub fn session(&self) -> &SessionGuard<S> {
        &self.session
    }

    pub fn settings(&self) -> &SettingsStore<S> {
        &self.settings
    }

    /// Public address of the stored wallet, if any. Needs no password.
    pub fn address(&self) -> Result<Option<Address>, VaultError> {
        Ok(self.secrets.wallet_record()?.map(|r| r.address))
    }

    /// Create a wallet from a fresh 12-word mnemonic.
    ///
    /// The mnemonic is returned once so the user can write it down; it is
    /// otherwise only available through [`Wallet::export_secrets`].
    pub fn create(&self, password: &str) -> Result<(Address, Mnemonic), VaultError> {
        let mnemonic = generate_mnemonic()?;
        let key_pair = keypair_from_mnemonic(&mnemonic)?;
        let address = self.store_new(&key_pair, Some(&mnemonic), password)?;
        Ok((address, mnemonic))
    }

    /// Create a wallet from a random private key, with no mnemonic backup.
    pub fn create_key_only(&self, password: &str) -> Result<Address, VaultError> {
        let key_pair = generate_key_pair()?;
        self.store_new(&key_pair, None, password)
    }

    pub fn import_private_key(&self, hex_key: &str, password: &str) -> Result<Address, VaultError> {
        let key_pair = import_from_private_key(hex_key)?;
        self.store_new(&key_pair, None, password)
    }

    pub fn import_mnemonic(&self, phrase: &str, password: &str) -> Result<Address, VaultError> {
        let mnemonic = Mnemonic::parse(phrase)?;
        let key_pair = keypair_from_mnemonic(&mnemonic)?;
        self.store_new(&key_pair, Some(&mnemonic), password)
    }

    /// Sign a transfer from this wallet. Requires a valid session and the
    /// wallet password; counts as activity.
    pub fn sign_transfer(
        &self,
        to: &str,
        amount: u64,
        token_type: TokenType,
        fee: u64,
        nonce: u64,
        password: &str,
    ) -> Result<SignedTransaction, VaultError> {
        self.session.require_unlocked()?;
        let to: Address = to.parse()?;

        let loaded = self.secrets.load_wallet(password)?;
        let tx = Transaction {
            from: loaded.address.clone(),
            to,
            amount,
            token_type,
            fee,
            nonce,
        };
        let signed = sign_transaction(&tx, &loaded.key_pair)?;
        drop(loaded);

        self.record_activity()?;
        log::info!(
            "Signed {} {} transfer from {} to {} (nonce {})",
            signed.tx.amount,
            signed.tx.token_type,
            signed.tx.from,
            signed.tx.to,
            signed.tx.nonce
        );
        Ok(signed)
    }

    /// Fetch the nonce, sign and broadcast.
    pub fn send<L: LedgerTransport>(
        &self,
        ledger: &L,
        to: &str,
        amount: u64,
        token_type: TokenType,
        fee: u64,
        password: &str,
    ) -> Result<SentTransaction, VaultError> {
        self.session.require_unlocked()?;
        let from = self.address()?.ok_or(VaultError::NoWallet)?;

        let account = ledger
            .balance_and_nonce(&from)
            .map_err(|e| VaultError::Ledger(Box::new(e)))?;
        let signed = self.sign_transfer(to, amount, token_type, fee, account.nonce, password)?;
        let tx_hash = ledger
            .broadcast(&signed)
            .map_err(|e| VaultError::Ledger(Box::new(e)))?;

        log::info!("Broadcast transaction {}", tx_hash);
        Ok(SentTransaction { signed, tx_hash })
    }

    /// Reveal the private key and mnemonic.
    ///
    /// Requires a valid session *and* the password, even when unlocked.
    pub fn export_secrets(&self, password: &str) -> Result<ExportedSecrets, VaultError> {
        self.session.require_unlocked()?;
        let loaded = self.secrets.load_wallet(password)?;
        log::warn!("Secrets exported for {}", loaded.address);
        Ok(ExportedSecrets {
            private_key: loaded.key_pair.secret_hex(),
            address: loaded.address,
            mnemonic: loaded.mnemonic,
        })
    }

    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<(), VaultError> {
        self.session.require_unlocked()?;
        self.secrets.change_password(old_password, new_password)
    }

    pub fn wipe(&self) -> Result<(), VaultError> {
        self.secrets.wipe()
    }

    /// Extend the session after a gated operation. The window may have
    /// closed while the key was being derived; that counts as locked.
    fn record_activity(&self) -> Result<(), VaultError> {
        match self.session.touch()? {
            SessionStatus::Unlocked => Ok(()),
            _ => Err(VaultError::Locked),
        }
    }

    fn store_new(
        &self,
        key_pair: &KeyPair,
        mnemonic: Option<&Mnemonic>,
        password: &str,
    ) -> Result<Address, VaultError> {
        let address = derive_address(&key_pair.public_key());
        self.secrets.save_wallet(key_pair, &address, mnemonic, password)?;
        Ok(address)
    }
}
