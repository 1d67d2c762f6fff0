use crate::error::{Error, Result};
use crate::message::AddressBook;

use super::{Fingerprint, KeyRecord};

/// Fingerprints for everyone taking part in one message.
///
/// Only [`resolve`] builds this, so a value always has a sender and at least
/// one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentities {
    sender_fingerprint: Fingerprint,
    recipient_fingerprints: Vec<Fingerprint>,
}

impl ResolvedIdentities {
    pub fn sender_fingerprint(&self) -> &Fingerprint {
        &self.sender_fingerprint
    }

    pub fn recipient_fingerprints(&self) -> &[Fingerprint] {
        &self.recipient_fingerprints
    }
}

/// Extract the email address from a user ID such as `Alice <alice@x.com>`.
///
/// Takes the text between the last `<` and the last `>`. Returns `None` when the
/// user ID has no such pair or the brackets are empty.
pub fn extract_address(user_id: &str) -> Option<&str> {
    let open = user_id.rfind('<')?;
    let close = user_id.rfind('>')?;
    if close <= open {
        return None;
    }
    let address = user_id[open + 1..close].trim();
    if address.is_empty() {
        None
    } else {
        Some(address)
    }
}

/// Map the sender and recipients of `book` to fingerprints from `keys`.
///
/// The last key claiming the sender address wins. A recipient fingerprint is
/// added once per matching user ID, so the same key may appear more than once.
/// Fails with [`Error::UnresolvedFingerprint`] unless both the sender and at
/// least one recipient were found.
pub fn resolve(keys: &[KeyRecord], book: &AddressBook) -> Result<ResolvedIdentities> {
    let mut sender_fingerprint = None;
    let mut recipient_fingerprints = Vec::new();

    for key in keys {
        for user_id in &key.user_ids {
            let Some(address) = extract_address(user_id) else {
                tracing::debug!("skipping user id without an address: {}", user_id);
                continue;
            };

            if address == book.sender {
                sender_fingerprint = Some(key.fingerprint.clone());
            }
            if book.recipients.iter().any(|r| r == address) {
                recipient_fingerprints.push(key.fingerprint.clone());
            }
        }
    }

    match sender_fingerprint {
        Some(sender_fingerprint) if !recipient_fingerprints.is_empty() => {
            tracing::debug!(
                "resolved sender {} and {} recipient key(s)",
                sender_fingerprint,
                recipient_fingerprints.len()
            );
            Ok(ResolvedIdentities {
                sender_fingerprint,
                recipient_fingerprints,
            })
        }
        _ => Err(Error::UnresolvedFingerprint),
    }
}
