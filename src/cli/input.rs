use std::io::{self, BufRead};

use age::secrecy::SecretString;
use anyhow::{bail, Result};
use is_terminal::IsTerminal;

use crate::message::AddressBook;

/// Environment variable holding the mailbox password.
pub const PASSWORD_ENV: &str = "GPGMAIL_PASSWORD";
/// Environment variable holding the signing key passphrase.
pub const PASSPHRASE_ENV: &str = "GPGMAIL_PASSPHRASE";

pub fn stdin_is_terminal() -> bool {
    std::io::stdin().is_terminal()
}

/// dialoguer prompts and reads secrets on the terminal behind stderr, so a
/// piped stdin does not rule out a password prompt.
pub fn can_prompt_secret() -> bool {
    std::io::stderr().is_terminal()
}

/// Use `given` if present, otherwise ask on the terminal.
pub fn line_or_prompt(given: Option<String>, prompt: &str, flag: &str) -> Result<String> {
    if let Some(value) = given {
        return Ok(value);
    }
    if !stdin_is_terminal() {
        bail!("{} is required when stdin is not a terminal", flag);
    }
    let value: String = dialoguer::Input::new().with_prompt(prompt).interact_text()?;
    Ok(value.trim().to_string())
}

/// Ask for a secret without echo. The typed value goes straight into a
/// `SecretString`.
pub fn secret_prompt(prompt: &str) -> Result<SecretString> {
    let value = dialoguer::Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()?;
    Ok(SecretString::from(value))
}

/// A secret from `env_var` if set, else a terminal prompt, else `None`.
pub fn secret_from_env_or_prompt(env_var: &str, prompt: &str) -> Result<Option<SecretString>> {
    if let Some(value) = std::env::var_os(env_var) {
        let Ok(value) = value.into_string() else {
            bail!("{} is not valid UTF-8", env_var);
        };
        return Ok(Some(SecretString::from(value)));
    }
    if !can_prompt_secret() {
        return Ok(None);
    }
    secret_prompt(prompt).map(Some)
}

/// Collect sender and recipients from flags or prompts.
///
/// Each `--to` value may itself hold several whitespace-separated addresses.
pub fn address_book(from: Option<String>, to: Vec<String>) -> Result<AddressBook> {
    let sender = line_or_prompt(from, "Message From", "--from")?;
    let recipients = if to.is_empty() {
        line_or_prompt(None, "Message To", "--to")?
    } else {
        to.join(" ")
    };

    let book = AddressBook::parse(&sender, &recipients);
    if book.sender.is_empty() {
        bail!("no sender address given");
    }
    if book.recipients.is_empty() {
        bail!("no recipient addresses given");
    }
    Ok(book)
}

/// Lines of a message body, read lazily.
///
/// Bytes that are not valid UTF-8 are replaced, so they never end the
/// message early. A read error stops the iteration and is returned by
/// [`BodyLines::finish`].
pub struct BodyLines<R> {
    reader: R,
    error: Option<io::Error>,
}

impl<R: BufRead> BodyLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            error: None,
        }
    }

    /// The read error that cut the body short, if any.
    pub fn finish(self) -> io::Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<R: BufRead> Iterator for BodyLines<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.error.is_some() {
            return None;
        }
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                }
                Some(String::from_utf8_lossy(&line).into_owned())
            }
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }
}

pub fn body_lines() -> BodyLines<io::StdinLock<'static>> {
    BodyLines::new(std::io::stdin().lock())
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Cursor, Read};

    use super::*;
    use crate::message::assemble;

    #[test]
    fn flags_take_precedence() {
        let book = address_book(
            Some("alice@x.com".to_string()),
            vec!["bob@x.com carol@x.com".to_string(), "dave@x.com".to_string()],
        )
        .unwrap();
        assert_eq!(book.sender, "alice@x.com");
        assert_eq!(book.recipients, vec!["bob@x.com", "carol@x.com", "dave@x.com"]);
    }

    #[test]
    fn blank_recipients_rejected() {
        let err = address_book(Some("alice@x.com".to_string()), vec!["  ".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("no recipient"));
    }

    #[test]
    fn line_given_skips_prompt() {
        assert_eq!(
            line_or_prompt(Some("x".to_string()), "Prompt", "--x").unwrap(),
            "x"
        );
    }

    #[test]
    fn latin1_line_does_not_end_body() {
        let mut body = BodyLines::new(Cursor::new(
            b"line one\ncaf\xe9 latin1\r\nline three\n".to_vec(),
        ));
        let lines: Vec<String> = (&mut body).collect();
        assert_eq!(
            lines,
            vec!["line one", "caf\u{FFFD} latin1", "line three"]
        );
        body.finish().unwrap();
    }

    #[test]
    fn last_line_without_newline_is_kept() {
        let lines: Vec<String> = BodyLines::new(Cursor::new(b"one\ntwo".to_vec())).collect();
        assert_eq!(lines, vec!["one", "two"]);
    }

    struct Failing {
        served: bool,
    }

    impl Read for Failing {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::other("device gone"));
            }
            self.served = true;
            let first = b"first line\n";
            buf[..first.len()].copy_from_slice(first);
            Ok(first.len())
        }
    }

    #[test]
    fn read_error_is_reported_after_assembly() {
        let mut body = BodyLines::new(BufReader::new(Failing { served: false }));
        let message = assemble("alice@x.com", &["bob@x.com".to_string()], &mut body);
        assert_eq!(message.body_lines, vec!["first line".to_string()]);

        let err = body.finish().unwrap_err();
        assert_eq!(err.to_string(), "device gone");
    }

    #[test]
    fn secret_comes_from_environment() {
        std::env::set_var("GPGMAIL_TEST_SECRET", "hunter2");
        let secret = secret_from_env_or_prompt("GPGMAIL_TEST_SECRET", "Secret").unwrap();
        std::env::remove_var("GPGMAIL_TEST_SECRET");

        use age::secrecy::ExposeSecret;
        assert_eq!(secret.unwrap().expose_secret(), "hunter2");
    }
}
