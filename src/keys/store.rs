use std::path::PathBuf;

use anyhow::Context;
use directories::ProjectDirs;

use crate::error::{Error, Result};

use super::bundle::PublicBundle;
use super::{Fingerprint, KeyRecord, Keychain};

/// The native keyring directory.
///
/// ```text
/// <base>/public/*.pub        public key bundles
/// <base>/secret/<FPR>.key    passphrase-protected signing keys
/// ```
#[derive(Debug, Clone)]
pub struct KeyStore {
    base_dir: PathBuf,
}

impl KeyStore {
    /// Open the keyring at the default platform data directory.
    pub fn open() -> Result<Self> {
        let dirs = ProjectDirs::from("dev", "gpgmail", "gpgmail").ok_or_else(|| {
            Error::KeychainUnavailable("could not determine data directory".to_string())
        })?;
        Ok(Self {
            base_dir: dirs.data_dir().join("keyring"),
        })
    }

    /// Open the keyring at a specific directory.
    pub fn open_at(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &std::path::Path {
        &self.base_dir
    }

    pub fn public_dir(&self) -> PathBuf {
        self.base_dir.join("public")
    }

    pub fn secret_dir(&self) -> PathBuf {
        self.base_dir.join("secret")
    }

    pub fn secret_key_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.secret_dir().join(format!("{}.key", fingerprint))
    }

    /// Load every readable public bundle, sorted by file name.
    pub fn bundles(&self) -> anyhow::Result<Vec<PublicBundle>> {
        let public_dir = self.public_dir();
        if !public_dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&public_dir)
            .with_context(|| format!("failed to read {}", public_dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("pub") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut bundles = Vec::new();
        for path in paths {
            let parsed = std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|content| PublicBundle::parse(&content));
            match parsed {
                Ok(bundle) => bundles.push(bundle),
                Err(e) => tracing::warn!("skipping {}: {:#}", path.display(), e),
            }
        }
        Ok(bundles)
    }
}

impl Keychain for KeyStore {
    fn list_keys(&self) -> Result<Vec<KeyRecord>> {
        let bundles = self
            .bundles()
            .map_err(|e| Error::KeychainUnavailable(format!("{:#}", e)))?;
        tracing::debug!(
            "native keyring {} holds {} key(s)",
            self.base_dir.display(),
            bundles.len()
        );
        Ok(bundles.iter().map(PublicBundle::to_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use tempfile::TempDir;

    fn write_bundle(store: &KeyStore, name: &str, uid: &str, seed: u8) {
        std::fs::create_dir_all(store.public_dir()).unwrap();
        let age_pub = age::x25519::Identity::generate().to_public().to_string();
        let signing = ed25519_dalek::SigningKey::from_bytes(&[seed; 32]);
        let sign_pub =
            base64::engine::general_purpose::STANDARD.encode(signing.verifying_key().to_bytes());
        std::fs::write(
            store.public_dir().join(format!("{}.pub", name)),
            format!("uid: {}\nage: {}\nsign: ed25519:{}\n", uid, age_pub, sign_pub),
        )
        .unwrap();
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::open_at(dir.path().join("nope"));
        assert!(store.list_keys().unwrap().is_empty());
    }

    #[test]
    fn lists_bundles_in_file_name_order() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::open_at(dir.path().to_path_buf());
        write_bundle(&store, "b-bob", "Bob <bob@x.com>", 2);
        write_bundle(&store, "a-alice", "Alice <alice@x.com>", 1);

        let keys = store.list_keys().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].user_ids, vec!["Alice <alice@x.com>".to_string()]);
        assert_eq!(keys[1].user_ids, vec!["Bob <bob@x.com>".to_string()]);
    }

    #[test]
    fn malformed_bundle_is_skipped() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::open_at(dir.path().to_path_buf());
        write_bundle(&store, "alice", "Alice <alice@x.com>", 1);
        std::fs::write(store.public_dir().join("broken.pub"), "uid: X <x@x.com>\n").unwrap();
        std::fs::write(store.public_dir().join("notes.txt"), "not a key").unwrap();

        let keys = store.list_keys().unwrap();
        assert_eq!(keys.len(), 1);
    }
}
