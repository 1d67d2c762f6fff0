use std::fmt;

use age::secrecy::SecretString;

use crate::error::{Error, Result};
use crate::keys::ResolvedIdentities;
use crate::message::PlaintextMessage;

use super::CryptoBackend;

/// Whether to sign, and with what passphrase to unlock the sender's key.
///
/// `Skip` cannot carry a passphrase. `Sign` may leave it unset when the
/// backend has another way to unlock the key (e.g. a running gpg-agent).
pub enum SignMode {
    Skip,
    Sign { passphrase: Option<SecretString> },
}

/// The encrypted message, ready for delivery.
pub struct SecureEnvelope {
    pub ciphertext: Vec<u8>,
    pub signed: bool,
}

impl fmt::Debug for SecureEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureEnvelope")
            .field("ciphertext", &format_args!("<{} bytes>", self.ciphertext.len()))
            .field("signed", &self.signed)
            .finish()
    }
}

/// Encrypt (and optionally sign) a message for the resolved identities.
///
/// Calls the backend exactly once. Any backend failure becomes
/// [`Error::EncryptionFailed`]; retrying is left to the caller.
pub fn seal<B: CryptoBackend>(
    backend: &B,
    plaintext: PlaintextMessage,
    ids: ResolvedIdentities,
    signing: SignMode,
) -> Result<SecureEnvelope> {
    let text = plaintext.to_text();
    drop(plaintext);

    let (signer, passphrase) = match signing {
        SignMode::Skip => (None, None),
        SignMode::Sign { passphrase } => (Some(ids.sender_fingerprint()), passphrase),
    };
    let signed = signer.is_some();

    tracing::debug!(
        "encrypting {} bytes to {} key(s){}",
        text.len(),
        ids.recipient_fingerprints().len(),
        if signed { ", signed" } else { "" }
    );

    let ciphertext = backend
        .encrypt(
            text.as_bytes(),
            ids.recipient_fingerprints(),
            signer,
            passphrase,
        )
        .map_err(Error::EncryptionFailed)?;

    if ciphertext.is_empty() {
        return Err(Error::EncryptionFailed(anyhow::anyhow!(
            "backend produced no output"
        )));
    }

    Ok(SecureEnvelope { ciphertext, signed })
}
