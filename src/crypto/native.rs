use std::io::{Read, Write};

use age::secrecy::SecretString;
use anyhow::{bail, Context, Result};
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroizing;

use crate::keys::bundle::PublicBundle;
use crate::keys::store::KeyStore;
use crate::keys::Fingerprint;

use super::CryptoBackend;

pub const SIGNATURE_BEGIN: &str = "-----BEGIN GPGMAIL SIGNATURE-----";
pub const SIGNATURE_END: &str = "-----END GPGMAIL SIGNATURE-----";

impl CryptoBackend for KeyStore {
    fn encrypt(
        &self,
        plaintext: &[u8],
        recipients: &[Fingerprint],
        signer: Option<&Fingerprint>,
        passphrase: Option<SecretString>,
    ) -> Result<Vec<u8>> {
        let bundles = self.bundles()?;

        let mut age_recipients = Vec::with_capacity(recipients.len());
        for fpr in recipients {
            age_recipients.push(&find(&bundles, fpr)?.age_recipient);
        }
        let mut armored = age_encrypt_armored(plaintext, &age_recipients)?;

        let Some(signer) = signer else {
            return Ok(armored);
        };

        let passphrase = passphrase.context("a passphrase is required to sign")?;
        let signing_key = unlock_signing_key(self, signer, passphrase)?;
        if signing_key.verifying_key() != find(&bundles, signer)?.verifying_key {
            bail!("secret key for {} does not match its public key", signer);
        }

        if !armored.ends_with(b"\n") {
            armored.push(b'\n');
        }
        let signature = signing_key.sign(&armored);
        let block = format!(
            "{}\nSigner: {}\n\n{}\n{}\n",
            SIGNATURE_BEGIN,
            signer,
            base64::engine::general_purpose::STANDARD.encode(signature.to_bytes()),
            SIGNATURE_END
        );
        armored.extend_from_slice(block.as_bytes());
        Ok(armored)
    }
}

fn find<'a>(bundles: &'a [PublicBundle], fpr: &Fingerprint) -> Result<&'a PublicBundle> {
    bundles
        .iter()
        .find(|b| &b.fingerprint() == fpr)
        .with_context(|| format!("no public key with fingerprint {}", fpr))
}

/// Decrypt the signer's passphrase-protected ed25519 key.
///
/// The key file is an age scrypt-encrypted base64 seed. Intermediate buffers
/// are zeroized on drop.
fn unlock_signing_key(
    store: &KeyStore,
    fingerprint: &Fingerprint,
    passphrase: SecretString,
) -> Result<SigningKey> {
    let path = store.secret_key_path(fingerprint);
    let sealed = std::fs::read(&path)
        .with_context(|| format!("no secret key for {} at {}", fingerprint, path.display()))?;

    let identity = age::scrypt::Identity::new(passphrase);
    let decryptor = age::Decryptor::new(age::armor::ArmoredReader::new(&sealed[..]))
        .context("failed to read secret key header")?;
    let mut reader = decryptor
        .decrypt(std::iter::once(&identity as &dyn age::Identity))
        .map_err(|e| anyhow::anyhow!("failed to unlock signing key: {}", e))?;
    drop(identity);

    let mut encoded = Zeroizing::new(Vec::new());
    reader
        .read_to_end(&mut encoded)
        .context("failed to read secret key")?;

    let seed = Zeroizing::new(
        base64::engine::general_purpose::STANDARD
            .decode(encoded.trim_ascii())
            .context("invalid base64 in secret key")?,
    );
    let seed: Zeroizing<[u8; 32]> = Zeroizing::new(
        seed.as_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("invalid signing key length"))?,
    );
    Ok(SigningKey::from_bytes(&seed))
}

/// Encrypt to one or more age recipients with ASCII armor.
fn age_encrypt_armored(data: &[u8], recipients: &[&age::x25519::Recipient]) -> Result<Vec<u8>> {
    let encryptor =
        age::Encryptor::with_recipients(recipients.iter().map(|r| *r as &dyn age::Recipient))
            .map_err(|e| anyhow::anyhow!("cannot encrypt: {}", e))?;

    let mut encrypted = vec![];
    let armor =
        age::armor::ArmoredWriter::wrap_output(&mut encrypted, age::armor::Format::AsciiArmor)
            .context("failed to create armored writer")?;
    let mut writer = encryptor
        .wrap_output(armor)
        .context("failed to create age encryptor")?;
    writer
        .write_all(data)
        .context("failed to write age ciphertext")?;
    writer
        .finish()
        .and_then(|armor| armor.finish())
        .context("failed to finalize age encryption")?;

    Ok(encrypted)
}
