//! dntkey: command-line host for a single-address DNT wallet
//!
//! # Usage
//!
//! ```bash
//! dntkey create
//! DNTKEY_PASSWORD=... dntkey sign --to D... --amount 100 --nonce 3
//! dntkey --config /path/to/dntkey.toml status
//! ```

mod cli;
mod commands;
mod config;

use anyhow::{Context, Result};
use dntkey_vault::{SqliteStore, Wallet};
use std::sync::Arc;

use cli::{Action, Command};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Keep decrypted key material out of core files
    dntkey_core::memory::disable_core_dumps();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, command) = match cli::parse_args(&args)? {
        Action::Help => {
            cli::print_help();
            return Ok(());
        }
        Action::Version => {
            println!("dntkey {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Action::Run {
            config_path,
            command,
        } => (config_path, command),
    };

    let mut config = config::DntkeyConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.apply_env_overrides();
    config
        .validate()
        .context("Configuration validation failed")?;

    std::env::set_var("RUST_LOG", &config.wallet.log_level);
    env_logger::init();

    if command == Command::ValidateConfig {
        println!("Configuration is valid.");
        println!("  Data dir:     {}", config.wallet.data_dir.display());
        println!("  RPC endpoint: {}", config.defaults.rpc_endpoint);
        println!("  Auto-lock:    {} min", config.defaults.auto_lock_minutes);
        return Ok(());
    }

    std::fs::create_dir_all(&config.wallet.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.wallet.data_dir.display()
        )
    })?;
    let db_path = config.database_path();
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open wallet database {}", db_path.display()))?;
    log::debug!("Opened wallet database at {}", db_path.display());

    let wallet = Wallet::from_context(
        dntkey_vault::VaultContext::with_system_clock(Arc::new(store)),
        config.settings_defaults(),
    );

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(commands::run(command, &wallet))
}
