pub mod smtp;

use serde::Deserialize;

pub use smtp::{Credentials, SmtpConfig, SmtpTransport};

/// Default submission server and port.
pub const DEFAULT_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_PORT: u16 = 587;

/// How the SMTP session is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Plain TCP, no encryption.
    None,
    /// Upgrade with STARTTLS after the greeting.
    #[default]
    Starttls,
    /// TLS from the first byte.
    Tls,
}
