use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

use super::{KeyRecord, Keychain};

const DEFAULT_PROGRAM: &str = "gpg";

/// The GnuPG executable and the keyring it works on.
#[derive(Debug, Clone)]
pub struct GnuPg {
    program: PathBuf,
    homedir: Option<PathBuf>,
    always_trust: bool,
}

impl Default for GnuPg {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            homedir: None,
            always_trust: false,
        }
    }
}

impl GnuPg {
    pub fn new(program: Option<PathBuf>, homedir: Option<PathBuf>, always_trust: bool) -> Self {
        Self {
            program: program.unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM)),
            homedir,
            always_trust,
        }
    }

    pub fn always_trust(&self) -> bool {
        self.always_trust
    }

    /// A `gpg` invocation in batch mode against the configured home directory.
    pub(crate) fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--batch").arg("--no-tty");
        if let Some(ref homedir) = self.homedir {
            cmd.arg("--homedir").arg(homedir);
        }
        cmd
    }

    pub(crate) fn program_display(&self) -> String {
        self.program.display().to_string()
    }
}

impl Keychain for GnuPg {
    fn list_keys(&self) -> Result<Vec<KeyRecord>> {
        let output = self
            .command()
            .args(["--with-colons", "--fixed-list-mode", "--list-keys"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                Error::KeychainUnavailable(format!(
                    "cannot run '{}': {}",
                    self.program_display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::KeychainUnavailable(format!(
                "'{}' exited with {}: {}",
                self.program_display(),
                output.status,
                stderr.trim()
            )));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        let keys = parse_colon_listing(&listing);
        tracing::debug!("gpg listed {} public key(s)", keys.len());
        Ok(keys)
    }
}

/// Parse `gpg --with-colons` key listing output.
///
/// Each `pub` record starts a key. Its fingerprint is the first `fpr` record
/// that follows before any `sub` record, so subkey fingerprints are ignored.
pub fn parse_colon_listing(listing: &str) -> Vec<KeyRecord> {
    let mut keys = Vec::new();
    let mut current: Option<(Option<String>, Vec<String>)> = None;
    let mut in_subkey = false;

    for line in listing.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("pub") => {
                flush(&mut keys, current.take());
                current = Some((None, Vec::new()));
                in_subkey = false;
            }
            Some("sub") => in_subkey = true,
            Some("fpr") => {
                if let Some((fingerprint, _)) = current.as_mut() {
                    if fingerprint.is_none() && !in_subkey {
                        if let Some(fpr) = fields.get(9).filter(|f| !f.is_empty()) {
                            *fingerprint = Some(fpr.to_string());
                        }
                    }
                }
            }
            Some("uid") => {
                if let (Some((_, user_ids)), Some(uid)) = (current.as_mut(), fields.get(9)) {
                    user_ids.push(unescape(uid));
                }
            }
            _ => {}
        }
    }
    flush(&mut keys, current);
    keys
}

fn flush(keys: &mut Vec<KeyRecord>, current: Option<(Option<String>, Vec<String>)>) {
    match current {
        Some((Some(fingerprint), user_ids)) => keys.push(KeyRecord::new(fingerprint, user_ids)),
        Some((None, _)) => tracing::warn!("skipping key without a fingerprint record"),
        None => {}
    }
}

/// Decode the `\xHH` escapes gpg uses inside colon-listing fields.
fn unescape(field: &str) -> String {
    if !field.contains('\\') {
        return field.to_string();
    }

    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && bytes[i + 1] == b'x' {
            let hi = (bytes[i + 2] as char).to_digit(16);
            let lo = (bytes[i + 3] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi * 16 + lo) as u8);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
