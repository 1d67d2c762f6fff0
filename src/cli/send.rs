use anyhow::{bail, Context, Result};
use clap::Args;

use crate::backend::{Backend, BackendKind};
use crate::cli::input;
use crate::config::Manifest;
use crate::crypto::{seal, SignMode};
use crate::keys::{resolve, Keychain};
use crate::message::assemble;
use crate::transfer::{self, Credentials, Security, SmtpConfig, SmtpTransport};
use crate::ui::display;

#[derive(Args)]
pub struct SendArgs {
    /// SMTP server address or hostname
    #[arg(long, env = "GPGMAIL_SERVER")]
    pub server: Option<String>,

    /// SMTP server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Transport security
    #[arg(long, value_enum)]
    pub security: Option<Security>,

    /// Upgrade the connection with STARTTLS (same as --security starttls)
    #[arg(long, conflicts_with = "security")]
    pub ssl: bool,

    /// Sign the message with the sender's key
    #[arg(long)]
    pub sign: bool,

    /// Sender address (prompted if omitted)
    #[arg(long)]
    pub from: Option<String>,

    /// Recipient address; repeat or separate with spaces (prompted if omitted)
    #[arg(long)]
    pub to: Vec<String>,

    /// Keychain and encryption backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,
}

pub async fn run(args: SendArgs, manifest: &Manifest, quiet: bool) -> Result<()> {
    let smtp = smtp_config(&args, manifest);
    if !quiet {
        display::info(
            "Server:",
            &format!("{}:{} ({:?})", smtp.server, smtp.port, smtp.security),
        );
    }

    // 1. Addresses and body
    let book = input::address_book(args.from, args.to)?;
    if input::stdin_is_terminal() && !quiet {
        eprintln!("Enter message, end with ^D (Unix) or ^Z (Windows):");
    }
    let mut body = input::body_lines();
    let message = assemble(&book.sender, &book.recipients, &mut body);
    body.finish().context("failed to read the message body")?;
    if !quiet {
        display::info("Length:", &format!("{} bytes", message.to_text().len()));
    }

    // 2. Resolve every participant before touching any key material
    let backend = Backend::from_manifest(args.backend, manifest)?;
    let keys = backend.list_keys()?;
    let ids = resolve(&keys, &book)?;
    drop(keys);
    if !quiet {
        display::info("Sender key:", ids.sender_fingerprint().as_str());
        for fpr in ids.recipient_fingerprints() {
            display::info("Recipient key:", fpr.as_str());
        }
    }

    // 3. Secrets, all gathered before sealing
    let signing = if args.sign {
        let passphrase =
            input::secret_from_env_or_prompt(input::PASSPHRASE_ENV, "Keyring passphrase")?;
        if passphrase.is_none() && !quiet {
            display::warning(&format!(
                "{} is not set and there is no terminal; the signing key must already be unlocked",
                input::PASSPHRASE_ENV
            ));
        }
        SignMode::Sign { passphrase }
    } else {
        SignMode::Skip
    };
    let Some(password) =
        input::secret_from_env_or_prompt(input::PASSWORD_ENV, "Mailbox password")?
    else {
        bail!(
            "no mailbox password: set {} or run from a terminal",
            input::PASSWORD_ENV
        );
    };
    let credentials = Credentials {
        username: book.sender.clone(),
        password,
    };

    // 4. Seal
    let envelope = seal(&backend, message, ids, signing)?;

    // 5. Deliver
    SmtpTransport::new(smtp, Some(credentials))
        .send(envelope, &book.sender, &book.recipients)
        .await?;

    display::ok(&format!("message sent to {}", book.recipients.join(", ")));
    Ok(())
}

/// Flags win over the manifest, which wins over built-in defaults.
fn smtp_config(args: &SendArgs, manifest: &Manifest) -> SmtpConfig {
    let security = if args.ssl {
        Some(Security::Starttls)
    } else {
        args.security
    };

    let mut config = SmtpConfig::new(
        args.server
            .clone()
            .or_else(|| manifest.smtp.server.clone())
            .unwrap_or_else(|| transfer::DEFAULT_SERVER.to_string()),
        args.port
            .or(manifest.smtp.port)
            .unwrap_or(transfer::DEFAULT_PORT),
        security.or(manifest.smtp.security).unwrap_or_default(),
    );
    if let Some(ref helo) = manifest.smtp.helo {
        config.helo = helo.clone();
    }
    config
}
