//! Persisted user settings.

use serde_json::Value;

use crate::context::VaultContext;
use crate::error::VaultError;
use crate::records::{Settings, SETTINGS_KEY};
use crate::store::{encode_record, KvStore, Records};

/// Upper bound for the auto-lock window (one day)
pub const MAX_AUTO_LOCK_MINUTES: u32 = 1440;

pub struct SettingsStore<S> {
    ctx: VaultContext<S>,
    defaults: Settings,
}

impl<S> Clone for SettingsStore<S> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            defaults: self.defaults.clone(),
        }
    }
}

impl<S: KvStore> SettingsStore<S> {
    /// `defaults` fill any field the stored record does not have.
    pub fn new(ctx: VaultContext<S>, defaults: Settings) -> Self {
        Self { ctx, defaults }
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    pub fn load(&self) -> Result<Settings, VaultError> {
        let stored = self.ctx.store().get(&[SETTINGS_KEY])?.remove(SETTINGS_KEY);
        let mut merged = serde_json::to_value(&self.defaults).map_err(|e| VaultError::Store(e.into()))?;
        if let (Value::Object(base), Some(Value::Object(overlay))) = (&mut merged, stored) {
            base.extend(overlay);
        }
        serde_json::from_value(merged).map_err(|e| VaultError::Store(e.into()))
    }

    pub fn save(&self, settings: &Settings) -> Result<(), VaultError> {
        validate_settings(settings)?;
        let _guard = self.ctx.write_guard()?;
        self.write(settings)
    }

    /// Load, modify and save under the write lock.
    pub fn update<F>(&self, f: F) -> Result<Settings, VaultError>
    where
        F: FnOnce(&mut Settings),
    {
        let _guard = self.ctx.write_guard()?;
        let mut settings = self.load()?;
        f(&mut settings);
        validate_settings(&settings)?;
        self.write(&settings)?;
        Ok(settings)
    }

    fn write(&self, settings: &Settings) -> Result<(), VaultError> {
        let mut batch = Records::new();
        encode_record(&mut batch, SETTINGS_KEY, settings)?;
        self.ctx.store().set(batch)?;
        log::info!(
            "Settings saved (rpc_endpoint={}, auto_lock_minutes={})",
            settings.rpc_endpoint,
            settings.auto_lock_minutes
        );
        Ok(())
    }
}

pub fn validate_settings(settings: &Settings) -> Result<(), VaultError> {
    if !(1..=MAX_AUTO_LOCK_MINUTES).contains(&settings.auto_lock_minutes) {
        return Err(VaultError::InvalidSettings(format!(
            "auto_lock_minutes must be between 1 and {}, got {}",
            MAX_AUTO_LOCK_MINUTES, settings.auto_lock_minutes
        )));
    }
    let endpoint = settings.rpc_endpoint.trim();
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(VaultError::InvalidSettings(format!(
            "rpc_endpoint must be an http(s) URL, got '{}'",
            settings.rpc_endpoint
        )));
    }
    Ok(())
}
