use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::backend::BackendKind;
use crate::transfer::Security;

const LOCAL_MANIFEST: &str = ".gpgmail.toml";

/// Settings from `.gpgmail.toml` or the user config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub smtp: SmtpSection,
    pub keychain: KeychainSection,
    pub gnupg: GnupgSection,
    pub native: NativeSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SmtpSection {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub security: Option<Security>,
    pub helo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KeychainSection {
    pub backend: Option<BackendKind>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GnupgSection {
    pub program: Option<PathBuf>,
    pub homedir: Option<PathBuf>,
    pub always_trust: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NativeSection {
    pub path: Option<PathBuf>,
}

impl Manifest {
    /// Load the manifest.
    ///
    /// An explicit path must exist. Otherwise `.gpgmail.toml` in the current
    /// directory is tried, then `config.toml` in the platform config directory,
    /// and finally the defaults are used.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        if let Some(p) = config_path {
            let path = PathBuf::from(p);
            if !path.exists() {
                bail!("config file '{}' not found", path.display());
            }
            return Self::from_file(&path);
        }

        let local = PathBuf::from(LOCAL_MANIFEST);
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(dirs) = ProjectDirs::from("dev", "gpgmail", "gpgmail") {
            let user = dirs.config_dir().join("config.toml");
            if user.exists() {
                return Self::from_file(&user);
            }
        }

        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("loading config from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
