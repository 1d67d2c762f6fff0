pub mod input;
pub mod keys;
pub mod send;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gpgmail", about = "Send encrypted and signed e-mails")]
#[command(version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show debug output, including the SMTP dialogue (never prints secrets)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Minimal output (for scripting)
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Path to a gpgmail.toml config file
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compose, encrypt and send a message
    Send(send::SendArgs),

    /// Inspect the keychain and preview key resolution
    Keys(keys::KeysArgs),

    /// Print shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}
