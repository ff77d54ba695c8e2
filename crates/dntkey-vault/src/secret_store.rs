//! Encrypted wallet persistence
//!
//! The private key (and mnemonic, when there is one) is serialized as
//! `{"privateKey": hex, "mnemonic": phrase|null}` and encrypted with
//! [`dntkey_core::encrypt`]. Only the address and public key are stored in
//! the clear.
//!
//! Every decrypting call pays the full PBKDF2 cost. Hosts running on an
//! async runtime should use the `*_async` variants, which move that work
//! onto the blocking pool.

use dntkey_core::{
    decrypt, derive_address, encrypt, import_from_private_key, Address, KeyPair, Mnemonic,
};
use zeroize::Zeroizing;

use crate::context::VaultContext;
use crate::error::VaultError;
use crate::records::{SecretPayload, SessionRecord, WalletRecord, SESSION_KEY, WALLET_KEY};
use crate::store::{encode_record, read_record, KvStore, Records};

/// A decrypted wallet. Key material is erased when this is dropped.
#[derive(Debug)]
pub struct LoadedWallet {
    pub key_pair: KeyPair,
    pub mnemonic: Option<Mnemonic>,
    pub address: Address,
}

pub struct SecretStore<S> {
    ctx: VaultContext<S>,
}

impl<S> Clone for SecretStore<S> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
        }
    }
}

impl<S: KvStore> SecretStore<S> {
    pub fn new(ctx: VaultContext<S>) -> Self {
        Self { ctx }
    }

    pub fn has_wallet(&self) -> Result<bool, VaultError> {
        Ok(self.wallet_record()?.is_some())
    }

    /// The stored record, without decrypting anything.
    pub fn wallet_record(&self) -> Result<Option<WalletRecord>, VaultError> {
        Ok(read_record(self.ctx.store(), WALLET_KEY)?)
    }

    /// Encrypt and persist a new wallet, starting an unlocked session.
    ///
    /// The wallet record and session are written in one store call. Refuses
    /// to replace an existing wallet.
    pub fn save_wallet(
        &self,
        key_pair: &KeyPair,
        address: &Address,
        mnemonic: Option<&Mnemonic>,
        password: &str,
    ) -> Result<(), VaultError> {
        let public_key = key_pair.public_key();
        if derive_address(&public_key) != *address {
            return Err(VaultError::RecordMismatch(format!(
                "{} is not derived from the given key",
                address
            )));
        }

        let encrypted = encrypt(&encode_payload(key_pair, mnemonic)?, password)?;
        let record = WalletRecord {
            address: address.clone(),
            public_key,
            encrypted,
        };

        let _guard = self.ctx.write_guard()?;
        if self.has_wallet()? {
            return Err(VaultError::WalletExists);
        }

        let mut batch = Records::new();
        encode_record(&mut batch, WALLET_KEY, &record)?;
        encode_record(&mut batch, SESSION_KEY, &SessionRecord::unlocked_at(self.ctx.now_ms()))?;
        self.ctx.store().set(batch)?;

        log::info!("Wallet saved for {}", address);
        Ok(())
    }

    /// Decrypt the stored wallet.
    ///
    /// A wrong password surfaces as `CryptoError::DecryptionFailed`.
    pub fn load_wallet(&self, password: &str) -> Result<LoadedWallet, VaultError> {
        self.load_with_record(password).map(|(_, loaded)| loaded)
    }

    /// Decrypt the stored wallet and hand back the record it came from, so
    /// callers can check it is still current once they hold the write lock.
    pub(crate) fn load_with_record(
        &self,
        password: &str,
    ) -> Result<(WalletRecord, LoadedWallet), VaultError> {
        let record = self.wallet_record()?.ok_or(VaultError::NoWallet)?;
        let loaded = open_record(&record, password)?;
        Ok((record, loaded))
    }

    /// `true` iff `password` decrypts the stored wallet.
    pub fn verify_password(&self, password: &str) -> bool {
        self.load_wallet(password).is_ok()
    }

    /// Re-encrypt the wallet under a new password with a fresh salt and IV.
    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<(), VaultError> {
        let record = self.wallet_record()?.ok_or(VaultError::NoWallet)?;
        let loaded = open_record(&record, old_password)?;
        let encrypted = encrypt(
            &encode_payload(&loaded.key_pair, loaded.mnemonic.as_ref())?,
            new_password,
        )?;

        let _guard = self.ctx.write_guard()?;
        // The record must not have been replaced while we were deriving keys
        if self.wallet_record()?.as_ref() != Some(&record) {
            return Err(VaultError::RecordMismatch(
                "wallet changed during password update".into(),
            ));
        }

        let mut batch = Records::new();
        encode_record(
            &mut batch,
            WALLET_KEY,
            &WalletRecord {
                encrypted,
                ..record
            },
        )?;
        self.ctx.store().set(batch)?;

        log::info!("Wallet password changed for {}", loaded.address);
        Ok(())
    }

    /// Remove the wallet and its session together.
    pub fn wipe(&self) -> Result<(), VaultError> {
        let _guard = self.ctx.write_guard()?;
        self.ctx.store().remove(&[WALLET_KEY, SESSION_KEY])?;
        log::warn!("Wallet wiped");
        Ok(())
    }
}

impl<S: KvStore + 'static> SecretStore<S> {
    pub async fn save_wallet_async(
        &self,
        key_pair: KeyPair,
        mnemonic: Option<Mnemonic>,
        password: Zeroizing<String>,
    ) -> Result<Address, VaultError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            let address = derive_address(&key_pair.public_key());
            this.save_wallet(&key_pair, &address, mnemonic.as_ref(), &password)?;
            Ok(address)
        })
        .await?
    }

    pub async fn load_wallet_async(
        &self,
        password: Zeroizing<String>,
    ) -> Result<LoadedWallet, VaultError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.load_wallet(&password)).await?
    }

    pub async fn verify_password_async(&self, password: Zeroizing<String>) -> bool {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.verify_password(&password))
            .await
            .unwrap_or(false)
    }
}

fn encode_payload(
    key_pair: &KeyPair,
    mnemonic: Option<&Mnemonic>,
) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    let payload = SecretPayload {
        private_key: key_pair.secret_hex().to_string(),
        mnemonic: mnemonic.map(|m| m.as_str().to_string()),
    };
    // Sized for the worst case so the writer never reallocates and leaves
    // an unzeroized copy of the key behind
    let mut buf = Zeroizing::new(Vec::with_capacity(payload_capacity(mnemonic)));
    serde_json::to_writer(&mut *buf, &payload).map_err(|e| VaultError::Store(e.into()))?;
    Ok(buf)
}

/// Upper bound on the serialized payload: every phrase byte may escape to
/// `\uXXXX`, plus the key hex and the JSON framing.
fn payload_capacity(mnemonic: Option<&Mnemonic>) -> usize {
    const FRAMING: usize = 64;
    const KEY_HEX_LEN: usize = 64;
    FRAMING + KEY_HEX_LEN + mnemonic.map_or(0, |m| m.as_str().len() * 6)
}

fn open_record(record: &WalletRecord, password: &str) -> Result<LoadedWallet, VaultError> {
    let plaintext = decrypt(&record.encrypted, password)?;
    // Parse errors could echo plaintext, so they are not passed through
    let payload: SecretPayload = serde_json::from_slice(plaintext.as_slice())
        .map_err(|_| VaultError::RecordMismatch("unreadable secret payload".into()))?;

    let key_pair = import_from_private_key(&payload.private_key)?;
    if key_pair.public_key() != record.public_key {
        return Err(VaultError::RecordMismatch(
            "stored public key does not match private key".into(),
        ));
    }
    let address = derive_address(&record.public_key);
    if address != record.address {
        return Err(VaultError::RecordMismatch(
            "stored address does not match public key".into(),
        ));
    }

    let mnemonic = payload.mnemonic.as_deref().map(Mnemonic::parse).transpose()?;

    Ok(LoadedWallet {
        key_pair,
        mnemonic,
        address,
    })
}
