//! Argument parsing (minimal, no clap)

use anyhow::{bail, Context, Result};
use dntkey_core::TokenType;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "dntkey.toml";

#[derive(Debug, PartialEq)]
pub enum Action {
    Help,
    Version,
    Run { config_path: PathBuf, command: Command },
}

#[derive(Debug, PartialEq)]
pub struct SignArgs {
    pub to: String,
    pub amount: u64,
    pub token_type: TokenType,
    pub fee: u64,
    pub nonce: u64,
}

#[derive(Debug, PartialEq)]
pub enum Command {
    Create { with_mnemonic: bool },
    ImportKey { key: Option<String> },
    ImportMnemonic { phrase: Option<String> },
    Address,
    Status,
    Unlock,
    Lock,
    Sign(SignArgs),
    Verify { input: Option<String> },
    Export,
    ValidateAddress { address: String },
    Settings {
        rpc_endpoint: Option<String>,
        auto_lock_minutes: Option<u32>,
    },
    ChangePassword,
    Wipe { confirmed: bool },
    ValidateConfig,
}

/// Parse `args` (without the program name).
pub fn parse_args(args: &[String]) -> Result<Action> {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                match args.get(i) {
                    Some(path) => config_path = PathBuf::from(path),
                    None => bail!("--config requires a path argument"),
                }
            }
            "--help" | "-h" => return Ok(Action::Help),
            "--version" | "-V" => return Ok(Action::Version),
            _ => break,
        }
        i += 1;
    }

    let Some(name) = args.get(i) else {
        return Ok(Action::Help);
    };
    let command = parse_command(name, &args[i + 1..])?;
    Ok(Action::Run {
        config_path,
        command,
    })
}

fn parse_command(name: &str, rest: &[String]) -> Result<Command> {
    let command = match name {
        "create" => {
            let mut with_mnemonic = true;
            for arg in rest {
                match arg.as_str() {
                    "--no-mnemonic" => with_mnemonic = false,
                    other => bail!("Unknown argument for create: {}", other),
                }
            }
            Command::Create { with_mnemonic }
        }
        "import-key" => Command::ImportKey {
            key: optional_single(name, rest)?,
        },
        "import-mnemonic" => Command::ImportMnemonic {
            phrase: if rest.is_empty() {
                None
            } else {
                Some(rest.join(" "))
            },
        },
        "address" => no_args(name, rest, Command::Address)?,
        "status" => no_args(name, rest, Command::Status)?,
        "unlock" => no_args(name, rest, Command::Unlock)?,
        "lock" => no_args(name, rest, Command::Lock)?,
        "sign" => Command::Sign(parse_sign(rest)?),
        "verify" => Command::Verify {
            input: optional_single(name, rest)?,
        },
        "export" => no_args(name, rest, Command::Export)?,
        "validate-address" => match optional_single(name, rest)? {
            Some(address) => Command::ValidateAddress { address },
            None => bail!("validate-address requires an address"),
        },
        "settings" => {
            let mut rpc_endpoint = None;
            let mut auto_lock_minutes = None;
            let mut flags = rest.iter();
            while let Some(flag) = flags.next() {
                let value = flags
                    .next()
                    .with_context(|| format!("{} requires a value", flag))?;
                match flag.as_str() {
                    "--rpc-endpoint" => rpc_endpoint = Some(value.clone()),
                    "--auto-lock" => {
                        auto_lock_minutes = Some(
                            value
                                .parse()
                                .with_context(|| format!("Invalid minutes: {}", value))?,
                        )
                    }
                    other => bail!("Unknown argument for settings: {}", other),
                }
            }
            Command::Settings {
                rpc_endpoint,
                auto_lock_minutes,
            }
        }
        "change-password" => no_args(name, rest, Command::ChangePassword)?,
        "wipe" => {
            let mut confirmed = false;
            for arg in rest {
                match arg.as_str() {
                    "--yes" => confirmed = true,
                    other => bail!("Unknown argument for wipe: {}", other),
                }
            }
            Command::Wipe { confirmed }
        }
        "validate-config" => no_args(name, rest, Command::ValidateConfig)?,
        other => bail!("Unknown command: {} (see --help)", other),
    };
    Ok(command)
}

fn parse_sign(rest: &[String]) -> Result<SignArgs> {
    let mut to = None;
    let mut amount = None;
    let mut token_type = TokenType::Dnt;
    let mut fee = 0;
    let mut nonce = None;

    let mut flags = rest.iter();
    while let Some(flag) = flags.next() {
        let value = flags
            .next()
            .with_context(|| format!("{} requires a value", flag))?;
        match flag.as_str() {
            "--to" => to = Some(value.clone()),
            "--amount" => amount = Some(parse_u64("--amount", value)?),
            "--token" => token_type = value.parse()?,
            "--fee" => fee = parse_u64("--fee", value)?,
            "--nonce" => nonce = Some(parse_u64("--nonce", value)?),
            other => bail!("Unknown argument for sign: {}", other),
        }
    }

    Ok(SignArgs {
        to: to.context("sign requires --to")?,
        amount: amount.context("sign requires --amount")?,
        token_type,
        fee,
        nonce: nonce.context("sign requires --nonce")?,
    })
}

fn parse_u64(flag: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .with_context(|| format!("{} must be a non-negative integer, got {}", flag, value))
}

fn no_args(name: &str, rest: &[String], command: Command) -> Result<Command> {
    if let Some(extra) = rest.first() {
        bail!("Unexpected argument for {}: {}", name, extra);
    }
    Ok(command)
}

fn optional_single(name: &str, rest: &[String]) -> Result<Option<String>> {
    match rest {
        [] => Ok(None),
        [one] => Ok(Some(one.clone())),
        _ => bail!("{} takes at most one argument", name),
    }
}

pub fn print_help() {
    println!(
        r#"dntkey: single-address DNT wallet

USAGE:
    dntkey [OPTIONS] <COMMAND> [ARGS]

OPTIONS:
    -c, --config <PATH>   Config file path (default: ./dntkey.toml)
    -h, --help            Show this help message
    -V, --version         Show version

COMMANDS:
    create [--no-mnemonic]          Create a new wallet
    import-key [HEX]                Import a 64-hex-character private key
    import-mnemonic [WORDS...]      Import a 12-word recovery phrase
    address                         Show the wallet address
    status                          Show session state
    unlock                          Unlock the session
    lock                            Lock the session
    sign --to ADDR --amount N --nonce N [--token DNT|AFC] [--fee N]
                                    Sign a transfer and print it as JSON
    verify [JSON]                   Verify a signed transaction
    export                          Reveal private key and mnemonic
    validate-address ADDR           Check an address
    settings [--rpc-endpoint URL] [--auto-lock MINUTES]
                                    Show or change settings
    change-password                 Re-encrypt under a new password
    wipe --yes                      Delete the wallet
    validate-config                 Validate the config file and exit

Secrets not given as arguments are read one per line from stdin.

ENVIRONMENT VARIABLES:
    DNTKEY_PASSWORD           Wallet password
    DNTKEY_NEW_PASSWORD       New password for change-password
    DNTKEY_DATA_DIR           Data directory path
    DNTKEY_LOG_LEVEL          Log level (error/warn/info/debug/trace)
    DNTKEY_RPC_ENDPOINT       Default ledger RPC endpoint
    DNTKEY_AUTO_LOCK_MINUTES  Default auto-lock window
"#
    );
}
