use age::secrecy::SecretString;
use serde::Deserialize;

use crate::config::Manifest;
use crate::crypto::CryptoBackend;
use crate::error::Result;
use crate::keys::gnupg::GnuPg;
use crate::keys::store::KeyStore;
use crate::keys::{Fingerprint, KeyRecord, Keychain};

/// Which keychain and encryption engine to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The GnuPG executable and its keyring.
    #[default]
    Gnupg,
    /// The built-in age/ed25519 keyring.
    Native,
}

/// A configured backend; serves as both keychain and encryption engine.
#[derive(Debug, Clone)]
pub enum Backend {
    Gnupg(GnuPg),
    Native(KeyStore),
}

impl Backend {
    /// Build the backend selected by `kind` (or the manifest, or the default).
    pub fn from_manifest(kind: Option<BackendKind>, manifest: &Manifest) -> Result<Self> {
        let kind = kind.or(manifest.keychain.backend).unwrap_or_default();
        tracing::debug!("using {:?} backend", kind);
        Ok(match kind {
            BackendKind::Gnupg => Backend::Gnupg(GnuPg::new(
                manifest.gnupg.program.clone(),
                manifest.gnupg.homedir.clone(),
                manifest.gnupg.always_trust,
            )),
            BackendKind::Native => Backend::Native(match manifest.native.path {
                Some(ref path) => KeyStore::open_at(path.clone()),
                None => KeyStore::open()?,
            }),
        })
    }
}

impl Keychain for Backend {
    fn list_keys(&self) -> Result<Vec<KeyRecord>> {
        match self {
            Backend::Gnupg(gpg) => gpg.list_keys(),
            Backend::Native(store) => store.list_keys(),
        }
    }
}

impl CryptoBackend for Backend {
    fn encrypt(
        &self,
        plaintext: &[u8],
        recipients: &[Fingerprint],
        signer: Option<&Fingerprint>,
        passphrase: Option<SecretString>,
    ) -> anyhow::Result<Vec<u8>> {
        match self {
            Backend::Gnupg(gpg) => gpg.encrypt(plaintext, recipients, signer, passphrase),
            Backend::Native(store) => store.encrypt(plaintext, recipients, signer, passphrase),
        }
    }
}
