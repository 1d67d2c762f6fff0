use std::io::Write;
use std::process::Stdio;

use age::secrecy::{ExposeSecret, SecretString};
use anyhow::{bail, Context, Result};

use crate::keys::gnupg::GnuPg;
use crate::keys::Fingerprint;

use super::CryptoBackend;

impl CryptoBackend for GnuPg {
    fn encrypt(
        &self,
        plaintext: &[u8],
        recipients: &[Fingerprint],
        signer: Option<&Fingerprint>,
        passphrase: Option<SecretString>,
    ) -> Result<Vec<u8>> {
        if recipients.is_empty() {
            bail!("no recipients to encrypt to");
        }

        let mut cmd = self.command();
        cmd.args(["--yes", "--armor", "--encrypt"]);
        if self.always_trust() {
            cmd.args(["--trust-model", "always"]);
        }
        for fpr in recipients {
            cmd.arg("--recipient").arg(fpr.as_str());
        }
        if let Some(fpr) = signer {
            cmd.arg("--sign").arg("--local-user").arg(fpr.as_str());
        }
        if passphrase.is_some() {
            cmd.args(["--pinentry-mode", "loopback", "--passphrase-fd", "0"]);
        }

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("cannot run '{}'", self.program_display()))?;

        let mut stdin = child.stdin.take().context("gpg stdin unavailable")?;

        // gpg reads the passphrase as the first line of fd 0, then the data.
        if let Some(passphrase) = passphrase {
            let written = stdin
                .write_all(passphrase.expose_secret().as_bytes())
                .and_then(|_| stdin.write_all(b"\n"));
            drop(passphrase);
            written.context("failed to pass passphrase to gpg")?;
        }

        let data = plaintext.to_vec();
        let writer = std::thread::spawn(move || -> std::io::Result<()> {
            stdin.write_all(&data)?;
            drop(stdin);
            Ok(())
        });

        let output = child
            .wait_with_output()
            .context("failed to wait for gpg")?;

        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(e).context("failed to write message to gpg"),
            Err(_) => bail!("gpg writer thread panicked"),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "'{}' exited with {}: {}",
                self.program_display(),
                output.status,
                stderr.trim()
            );
        }

        Ok(output.stdout)
    }
}
