//! End-to-end wallet lifecycle against the SQLite backend.
//!
//! create → sign → auto-lock → unlock → export → change password → wipe,
//! with the wallet reopened from disk between steps.

use dntkey_core::{validate_address, verify_signed_transaction, SignedTransaction, TokenType};
use dntkey_vault::{
    BalanceAndNonce, LedgerTransport, ManualClock, SessionStatus, Settings, SqliteStore,
    VaultError, Wallet,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use zeroize::Zeroizing;

const START: u64 = 1_700_000_000_000;
const MINUTE: u64 = 60_000;
const VECTOR_KEY: &str = "f1b07e32f1f1bdaf5efa886e6511c91e187138905b3f96600304d8535fbefa6d";
const VECTOR_ADDRESS: &str = "DFSVTrK1N53SeFiKKXRUVKCZKRvmA2xzoU";

fn open(path: &Path, clock: &Arc<ManualClock>) -> Wallet<SqliteStore> {
    let store = Arc::new(SqliteStore::open(path).unwrap());
    Wallet::new(
        store,
        clock.clone(),
        Settings {
            auto_lock_minutes: 5,
            ..Settings::default()
        },
    )
}

/// In-memory ledger that applies transfers and bumps the nonce.
#[derive(Default)]
struct FakeLedger {
    state: Mutex<BalanceAndNonce>,
    seen: Mutex<Vec<SignedTransaction>>,
}

#[derive(Debug, thiserror::Error)]
#[error("rejected: {0}")]
struct Rejected(String);

impl LedgerTransport for FakeLedger {
    type Error = Rejected;

    fn balance_and_nonce(&self, _address: &dntkey_core::Address) -> Result<BalanceAndNonce, Rejected> {
        Ok(*self.state.lock().unwrap())
    }

    fn broadcast(&self, signed: &SignedTransaction) -> Result<String, Rejected> {
        if !verify_signed_transaction(signed) {
            return Err(Rejected("bad signature".into()));
        }
        let mut state = self.state.lock().unwrap();
        if signed.tx.nonce != state.nonce {
            return Err(Rejected(format!("stale nonce {}", signed.tx.nonce)));
        }
        let total = signed.tx.amount + signed.tx.fee;
        if state.dnt < total {
            return Err(Rejected("insufficient funds".into()));
        }
        state.dnt -= total;
        state.nonce += 1;
        self.seen.lock().unwrap().push(signed.clone());
        Ok(hex::encode(signed.hash().unwrap()))
    }

    fn block_height(&self) -> Result<u64, Rejected> {
        Ok(self.seen.lock().unwrap().len() as u64)
    }
}

#[test]
fn test_full_lifecycle_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wallet.db");
    let clock = Arc::new(ManualClock::new(START));

    let (address, mnemonic) = {
        let wallet = open(&path, &clock);
        let (address, mnemonic) = wallet.create("first password").unwrap();
        assert!(validate_address(address.as_str()));
        assert!(address.as_str().starts_with('D'));
        (address, mnemonic.as_str().to_string())
    };

    // Reopen: record and unlocked session persisted
    let wallet = open(&path, &clock);
    assert_eq!(wallet.address().unwrap(), Some(address.clone()));
    assert_eq!(wallet.session().status().unwrap(), SessionStatus::Unlocked);

    let to = "DFSVTrK1N53SeFiKKXRUVKCZKRvmA2xzoU";
    let signed = wallet
        .sign_transfer(to, 10, TokenType::Dnt, 1, 0, "first password")
        .unwrap();
    assert!(verify_signed_transaction(&signed));

    // Idle past the window; the host's poll locks it
    clock.advance(5 * MINUTE);
    assert!(!wallet.session().is_valid());
    assert!(wallet.session().enforce_timeout().unwrap());
    assert!(matches!(
        wallet.sign_transfer(to, 10, TokenType::Dnt, 1, 0, "first password"),
        Err(VaultError::Locked)
    ));

    // Lock state survives reopen
    let wallet = open(&path, &clock);
    assert_eq!(wallet.session().status().unwrap(), SessionStatus::Locked);
    assert!(wallet.session().unlock("nope").unwrap_err().is_wrong_password());
    wallet.session().unlock("first password").unwrap();

    let exported = wallet.export_secrets("first password").unwrap();
    assert_eq!(exported.mnemonic.unwrap().as_str(), mnemonic);

    wallet.change_password("first password", "second password").unwrap();
    let wallet = open(&path, &clock);
    assert!(!wallet.secrets().verify_password("first password"));
    assert!(wallet.secrets().verify_password("second password"));

    wallet.wipe().unwrap();
    let wallet = open(&path, &clock);
    assert_eq!(wallet.address().unwrap(), None);
    assert_eq!(wallet.session().status().unwrap(), SessionStatus::Locked);

    // The phrase restores the same address
    let restored = wallet.import_mnemonic(&mnemonic, "third").unwrap();
    assert_eq!(restored, address);
}

#[test]
fn test_fixed_vector_import_and_send() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(START));
    let wallet = open(&dir.path().join("wallet.db"), &clock);

    let address = wallet.import_private_key(VECTOR_KEY, "pw").unwrap();
    assert_eq!(address.as_str(), VECTOR_ADDRESS);

    let ledger = FakeLedger::default();
    ledger.state.lock().unwrap().dnt = 100;

    let recipient = dntkey_core::derive_address(
        &dntkey_core::generate_key_pair().unwrap().public_key(),
    )
    .to_string();

    let first = wallet
        .send(&ledger, &recipient, 40, TokenType::Dnt, 1, "pw")
        .unwrap();
    let second = wallet
        .send(&ledger, &recipient, 40, TokenType::Dnt, 1, "pw")
        .unwrap();
    assert_eq!(first.signed.tx.nonce, 0);
    assert_eq!(second.signed.tx.nonce, 1);
    assert_ne!(first.tx_hash, second.tx_hash);

    // 100 - 2 * 41 = 18 left
    let err = wallet
        .send(&ledger, &recipient, 40, TokenType::Dnt, 1, "pw")
        .unwrap_err();
    assert!(matches!(err, VaultError::Ledger(_)));
    assert_eq!(err.to_string(), "Ledger error: rejected: insufficient funds");
    assert_eq!(ledger.block_height().unwrap(), 2);
}

#[test]
fn test_stale_nonce_is_rejected_by_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(START));
    let wallet = open(&dir.path().join("wallet.db"), &clock);
    wallet.import_private_key(VECTOR_KEY, "pw").unwrap();

    let ledger = FakeLedger::default();
    ledger.state.lock().unwrap().dnt = 1_000;

    // Two signatures against the same observed nonce; only one lands
    let a = wallet
        .sign_transfer(VECTOR_ADDRESS, 1, TokenType::Dnt, 0, 0, "pw")
        .unwrap();
    let b = wallet
        .sign_transfer(VECTOR_ADDRESS, 2, TokenType::Dnt, 0, 0, "pw")
        .unwrap();
    assert!(ledger.broadcast(&a).is_ok());
    assert!(ledger.broadcast(&b).is_err());
}

#[test]
fn test_signed_json_roundtrip_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(START));
    let wallet = open(&dir.path().join("wallet.db"), &clock);
    wallet.import_private_key(VECTOR_KEY, "pw").unwrap();

    let signed = wallet
        .sign_transfer(VECTOR_ADDRESS, 5, TokenType::Afc, 2, 3, "pw")
        .unwrap();
    let json = serde_json::to_string(&signed).unwrap();
    let parsed: SignedTransaction = serde_json::from_str(&json).unwrap();
    assert!(verify_signed_transaction(&parsed));

    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["amount"] = serde_json::json!(6);
    let forged: SignedTransaction = serde_json::from_value(value).unwrap();
    assert!(!verify_signed_transaction(&forged));
}

#[test]
fn test_settings_persist_and_drive_auto_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wallet.db");
    let clock = Arc::new(ManualClock::new(START));

    {
        let wallet = open(&path, &clock);
        wallet.create_key_only("pw").unwrap();
        wallet.settings().update(|s| s.auto_lock_minutes = 1).unwrap();
    }

    let wallet = open(&path, &clock);
    assert_eq!(wallet.settings().load().unwrap().auto_lock_minutes, 1);
    clock.advance(MINUTE - 1);
    assert!(wallet.session().is_valid());
    clock.advance(1);
    assert!(!wallet.session().is_valid());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_async_unlock_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(START));
    let wallet = open(&dir.path().join("wallet.db"), &clock);
    let address = wallet.create_key_only("pw").unwrap();
    wallet.session().lock().unwrap();

    let result = wallet
        .session()
        .unlock_async(Zeroizing::new("bad".to_string()))
        .await;
    assert!(result.unwrap_err().is_wrong_password());

    wallet
        .session()
        .unlock_async(Zeroizing::new("pw".to_string()))
        .await
        .unwrap();
    let loaded = wallet
        .secrets()
        .load_wallet_async(Zeroizing::new("pw".to_string()))
        .await
        .unwrap();
    assert_eq!(loaded.address, address);
}
