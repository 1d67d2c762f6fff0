use anyhow::{Context, Result};
use base64::Engine;
use sha2::{Digest, Sha256};

use super::{Fingerprint, KeyRecord};

/// A public key bundle from the native keyring: age recipient (encryption),
/// ed25519 verifying key (signatures) and the user IDs bound to them.
pub struct PublicBundle {
    pub user_ids: Vec<String>,
    pub age_recipient: age::x25519::Recipient,
    pub verifying_key: ed25519_dalek::VerifyingKey,
}

impl std::fmt::Debug for PublicBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicBundle")
            .field("fingerprint", &self.fingerprint())
            .field("user_ids", &self.user_ids)
            .finish()
    }
}

impl PublicBundle {
    /// Parse a `.pub` bundle.
    ///
    /// Format:
    /// ```text
    /// # gpgmail public key
    /// uid: Alice <alice@example.com>
    /// age: age1...
    /// sign: ed25519:<base64>
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let mut user_ids = Vec::new();
        let mut age_pubkey: Option<String> = None;
        let mut sign_pubkey: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix("uid:") {
                user_ids.push(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("age:") {
                age_pubkey = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("sign: ed25519:") {
                sign_pubkey = Some(rest.trim().to_string());
            }
        }

        let age_str = age_pubkey.context("missing 'age:' line in public key bundle")?;
        let sign_str = sign_pubkey.context("missing 'sign: ed25519:' line in public key bundle")?;

        let age_recipient: age::x25519::Recipient = age_str
            .parse()
            .map_err(|e: &str| anyhow::anyhow!("invalid age public key: {}", e))?;
        let verifying_key = decode_verifying_key(&sign_str)?;

        Ok(Self {
            user_ids,
            age_recipient,
            verifying_key,
        })
    }

    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint_from_keys(
            &self.age_recipient.to_string(),
            &base64::engine::general_purpose::STANDARD.encode(self.verifying_key.to_bytes()),
        )
    }

    pub fn to_record(&self) -> KeyRecord {
        KeyRecord {
            fingerprint: self.fingerprint(),
            user_ids: self.user_ids.clone(),
        }
    }
}

pub(crate) fn decode_verifying_key(b64: &str) -> Result<ed25519_dalek::VerifyingKey> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .context("invalid base64 in sign public key")?;
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("invalid ed25519 public key length"))?;
    ed25519_dalek::VerifyingKey::from_bytes(&array).context("invalid ed25519 public key")
}

/// Fingerprint of a bundle: upper-case hex of the first 20 bytes of
/// SHA-256 over the age recipient and the base64 verifying key.
pub fn fingerprint_from_keys(age_pubkey: &str, sign_pubkey_b64: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(age_pubkey.as_bytes());
    hasher.update(sign_pubkey_b64.as_bytes());
    let hash = hasher.finalize();
    Fingerprint::new(hex::encode_upper(&hash[..20]))
}
