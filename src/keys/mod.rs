pub mod bundle;
pub mod gnupg;
pub mod resolve;
pub mod store;

use std::fmt;

use crate::error::Result;

pub use resolve::{extract_address, resolve, ResolvedIdentities};

/// Opaque identifier of a key within a keychain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One key as listed by a keychain: its fingerprint and the identities bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub fingerprint: Fingerprint,
    pub user_ids: Vec<String>,
}

impl KeyRecord {
    pub fn new(fingerprint: impl Into<String>, user_ids: Vec<String>) -> Self {
        Self {
            fingerprint: Fingerprint::new(fingerprint),
            user_ids,
        }
    }
}

/// A read-only source of public keys.
///
/// Implementations return a fresh snapshot on every call; nothing is cached
/// between resolutions.
pub trait Keychain {
    fn list_keys(&self) -> Result<Vec<KeyRecord>>;
}

impl<K: Keychain + ?Sized> Keychain for &K {
    fn list_keys(&self) -> Result<Vec<KeyRecord>> {
        (**self).list_keys()
    }
}
