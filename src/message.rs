/// Who a message is from and who it goes to.
///
/// Recipient order is irrelevant to key resolution but is kept as entered for
/// the `To:` header and for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBook {
    pub sender: String,
    pub recipients: Vec<String>,
}

impl AddressBook {
    pub fn new(sender: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            sender: sender.into(),
            recipients,
        }
    }

    /// Build an address book from a whitespace-separated recipient line.
    pub fn parse(sender: &str, recipients: &str) -> Self {
        Self::new(
            sender.trim(),
            recipients.split_whitespace().map(str::to_string).collect(),
        )
    }
}

/// Headers plus body lines of the message before encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaintextMessage {
    pub header_block: String,
    pub body_lines: Vec<String>,
}

impl PlaintextMessage {
    /// The message as one CRLF-delimited text blob.
    pub fn to_text(&self) -> String {
        let mut text = self.header_block.clone();
        text.push_str(&self.body_lines.join("\r\n"));
        text
    }
}

/// Build the plaintext message.
///
/// Body lines are pulled from `body` until it runs out or yields an empty
/// line; anything after the first empty line is never read.
pub fn assemble<I>(sender: &str, recipients: &[String], body: I) -> PlaintextMessage
where
    I: IntoIterator<Item = String>,
{
    let header_block = format!("From: {}\r\nTo: {}\r\n\r\n", sender, recipients.join(", "));
    let body_lines: Vec<String> = body.into_iter().take_while(|l| !l.is_empty()).collect();

    tracing::debug!("assembled message with {} body line(s)", body_lines.len());

    PlaintextMessage {
        header_block,
        body_lines,
    }
}
