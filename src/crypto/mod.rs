pub mod envelope;
pub mod gnupg;
pub mod native;

use age::secrecy::SecretString;

use crate::keys::Fingerprint;

pub use envelope::{seal, SecureEnvelope, SignMode};

/// Encryption backend addressed purely by key fingerprints.
pub trait CryptoBackend {
    /// Encrypt `plaintext` to every recipient, signing with `signer` when given.
    ///
    /// The passphrase is moved in and dropped before this returns.
    fn encrypt(
        &self,
        plaintext: &[u8],
        recipients: &[Fingerprint],
        signer: Option<&Fingerprint>,
        passphrase: Option<SecretString>,
    ) -> anyhow::Result<Vec<u8>>;
}

impl<B: CryptoBackend + ?Sized> CryptoBackend for &B {
    fn encrypt(
        &self,
        plaintext: &[u8],
        recipients: &[Fingerprint],
        signer: Option<&Fingerprint>,
        passphrase: Option<SecretString>,
    ) -> anyhow::Result<Vec<u8>> {
        (**self).encrypt(plaintext, recipients, signer, passphrase)
    }
}
