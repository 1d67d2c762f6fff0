use anyhow::Result;
use clap::{Args, Subcommand};

use crate::backend::{Backend, BackendKind};
use crate::cli::input;
use crate::config::Manifest;
use crate::keys::{extract_address, resolve, Keychain};

#[derive(Args)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommand,

    /// Keychain backend to inspect
    #[arg(long, value_enum, global = true)]
    pub backend: Option<BackendKind>,
}

#[derive(Subcommand)]
pub enum KeysCommand {
    /// Show every key with its fingerprint and user IDs
    List,

    /// Show which keys a message would be encrypted to, without encrypting
    Resolve {
        /// Sender address
        #[arg(long)]
        from: String,

        /// Recipient address (can be repeated)
        #[arg(long, required = true)]
        to: Vec<String>,
    },
}

pub fn run(args: KeysArgs, manifest: &Manifest) -> Result<()> {
    let backend = Backend::from_manifest(args.backend, manifest)?;
    match args.command {
        KeysCommand::List => cmd_list(&backend),
        KeysCommand::Resolve { from, to } => cmd_resolve(&backend, from, to),
    }
}

fn cmd_list(backend: &Backend) -> Result<()> {
    let keys = backend.list_keys()?;
    if keys.is_empty() {
        println!("No keys in keychain.");
        return Ok(());
    }

    for key in &keys {
        println!("{}", key.fingerprint);
        for uid in &key.user_ids {
            match extract_address(uid) {
                Some(_) => println!("  uid  {}", uid),
                None => println!("  uid  {} (no address, ignored)", uid),
            }
        }
    }
    Ok(())
}

fn cmd_resolve(backend: &Backend, from: String, to: Vec<String>) -> Result<()> {
    let book = input::address_book(Some(from), to)?;
    let keys = backend.list_keys()?;
    let ids = resolve(&keys, &book)?;

    println!("sender     {}", ids.sender_fingerprint());
    for fpr in ids.recipient_fingerprints() {
        println!("recipient  {}", fpr);
    }
    Ok(())
}
