//! Subcommand handlers.
//!
//! Each invocation first enforces the auto-lock window, so a session left
//! idle past its limit is locked before anything else runs.

use anyhow::{bail, Context, Result};
use dntkey_core::{validate_address, verify_signed_transaction, SignedTransaction};
use dntkey_vault::{SessionStatus, SqliteStore, VaultError, Wallet};
use std::io::{BufRead, Read};
use zeroize::Zeroizing;

use crate::cli::{Command, SignArgs};

pub type CliWallet = Wallet<SqliteStore>;

pub async fn run(command: Command, wallet: &CliWallet) -> Result<()> {
    if wallet.session().enforce_timeout()? {
        eprintln!("Session expired and has been locked.");
    }

    match command {
        Command::Create { with_mnemonic } => create(wallet, with_mnemonic).await,
        Command::ImportKey { key } => {
            let key = match key {
                Some(key) => Zeroizing::new(key),
                None => read_line("Private key (hex): ")?,
            };
            let password = read_password("DNTKEY_PASSWORD", "Password: ")?;
            let address =
                blocking(wallet, move |w| w.import_private_key(key.trim(), &password)).await?;
            println!("Imported wallet {}", address);
            Ok(())
        }
        Command::ImportMnemonic { phrase } => {
            let phrase = match phrase {
                Some(phrase) => Zeroizing::new(phrase),
                None => read_line("Recovery phrase: ")?,
            };
            let password = read_password("DNTKEY_PASSWORD", "Password: ")?;
            let address = blocking(wallet, move |w| w.import_mnemonic(&phrase, &password)).await?;
            println!("Imported wallet {}", address);
            Ok(())
        }
        Command::Address => {
            match wallet.address()? {
                Some(address) => println!("{}", address),
                None => bail!("No wallet found"),
            }
            Ok(())
        }
        Command::Status => status(wallet),
        Command::Unlock => {
            let password = read_password("DNTKEY_PASSWORD", "Password: ")?;
            wallet
                .session()
                .unlock_async(password)
                .await
                .context("Unlock failed")?;
            println!("Unlocked.");
            Ok(())
        }
        Command::Lock => {
            wallet.session().lock()?;
            println!("Locked.");
            Ok(())
        }
        Command::Sign(args) => sign(wallet, args).await,
        Command::Verify { input } => verify(input),
        Command::Export => {
            let password = read_password("DNTKEY_PASSWORD", "Password: ")?;
            let exported = blocking(wallet, move |w| w.export_secrets(&password)).await?;
            println!("Address:     {}", exported.address);
            println!("Private key: {}", exported.private_key.as_str());
            if let Some(mnemonic) = &exported.mnemonic {
                println!("Mnemonic:    {}", mnemonic.as_str());
            }
            Ok(())
        }
        Command::ValidateAddress { address } => {
            if validate_address(&address) {
                println!("valid");
                Ok(())
            } else {
                bail!("invalid address: {}", address)
            }
        }
        Command::Settings {
            rpc_endpoint,
            auto_lock_minutes,
        } => {
            let settings = if rpc_endpoint.is_none() && auto_lock_minutes.is_none() {
                wallet.settings().load()?
            } else {
                wallet.settings().update(|s| {
                    if let Some(endpoint) = rpc_endpoint {
                        s.rpc_endpoint = endpoint;
                    }
                    if let Some(minutes) = auto_lock_minutes {
                        s.auto_lock_minutes = minutes;
                    }
                })?
            };
            println!("rpc_endpoint      = {}", settings.rpc_endpoint);
            println!("auto_lock_minutes = {}", settings.auto_lock_minutes);
            Ok(())
        }
        Command::ChangePassword => {
            let old = read_password("DNTKEY_PASSWORD", "Current password: ")?;
            let new = read_password("DNTKEY_NEW_PASSWORD", "New password: ")?;
            blocking(wallet, move |w| w.change_password(&old, &new)).await?;
            println!("Password changed.");
            Ok(())
        }
        Command::Wipe { confirmed } => {
            if !confirmed {
                bail!("Refusing to wipe without --yes. Make sure the mnemonic or private key is backed up.");
            }
            wallet.wipe()?;
            println!("Wallet deleted.");
            Ok(())
        }
        // Handled before the wallet is opened
        Command::ValidateConfig => Ok(()),
    }
}

async fn create(wallet: &CliWallet, with_mnemonic: bool) -> Result<()> {
    let password = read_password("DNTKEY_PASSWORD", "New password: ")?;
    if with_mnemonic {
        let (address, mnemonic) = blocking(wallet, move |w| w.create(&password)).await?;
        println!("Created wallet {}", address);
        println!();
        println!("Recovery phrase (write it down, it will not be shown again):");
        println!("  {}", mnemonic.as_str());
    } else {
        let address = blocking(wallet, move |w| w.create_key_only(&password)).await?;
        println!("Created wallet {}", address);
    }
    Ok(())
}

fn status(wallet: &CliWallet) -> Result<()> {
    let Some(address) = wallet.address()? else {
        println!("No wallet.");
        return Ok(());
    };
    let state = match wallet.session().status()? {
        SessionStatus::Unlocked => "unlocked",
        SessionStatus::Locked => "locked",
        SessionStatus::Expired => "expired",
    };
    let settings = wallet.settings().load()?;
    println!("Address:   {}", address);
    println!("Session:   {}", state);
    println!("Auto-lock: {} min", settings.auto_lock_minutes);
    Ok(())
}

async fn sign(wallet: &CliWallet, args: SignArgs) -> Result<()> {
    let password = read_password("DNTKEY_PASSWORD", "Password: ")?;
    let signed = blocking(wallet, move |w| {
        w.sign_transfer(
            &args.to,
            args.amount,
            args.token_type,
            args.fee,
            args.nonce,
            &password,
        )
    })
    .await?;
    println!("{}", serde_json::to_string_pretty(&signed)?);
    Ok(())
}

fn verify(input: Option<String>) -> Result<()> {
    let json = match input {
        Some(json) => json,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read transaction from stdin")?;
            buf
        }
    };
    let signed: SignedTransaction =
        serde_json::from_str(&json).context("Not a signed transaction")?;
    if verify_signed_transaction(&signed) {
        println!("valid");
        Ok(())
    } else {
        bail!("signature does not verify")
    }
}

/// Run a wallet operation on the blocking pool; they all pay the KDF cost.
async fn blocking<T, F>(wallet: &CliWallet, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&CliWallet) -> Result<T, VaultError> + Send + 'static,
{
    let wallet = wallet.clone();
    Ok(tokio::task::spawn_blocking(move || f(&wallet)).await??)
}

fn read_password(env_var: &str, prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(v) = std::env::var(env_var) {
        return Ok(Zeroizing::new(v));
    }
    read_line(prompt)
}

fn read_line(prompt: &str) -> Result<Zeroizing<String>> {
    eprint!("{}", prompt);
    let mut line = Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(line)
}
