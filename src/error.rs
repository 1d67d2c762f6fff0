use thiserror::Error;

/// Every terminal failure a send attempt can end with.
#[derive(Debug, Error)]
pub enum Error {
    #[error("key management backend is unavailable: {0}")]
    KeychainUnavailable(String),

    #[error("sender or recipient fingerprint could not be found in the local keychain")]
    UnresolvedFingerprint,

    /// The cause is kept whole so `{:#}` shows the backend's full chain.
    #[error("encryption failed: {0:#}")]
    EncryptionFailed(anyhow::Error),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Failures reported by the mail transport, one variant per protocol stage.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("unable to establish SMTP connection: {0}")]
    ConnectFailed(String),

    #[error("the server did not reply properly to the EHLO greeting: {0}")]
    GreetingFailed(String),

    #[error("the server did not accept the username/password combination: {0}")]
    AuthFailed(String),

    #[error("the server did not accept the sender address: {0}")]
    SenderRefused(String),

    #[error("the server refused recipient(s): {}", .0.join(", "))]
    RecipientsRefused(Vec<String>),

    #[error("invalid response from server: {0}")]
    ProtocolResponseError(String),

    #[error("the server rejected the message data: {0}")]
    DataError(String),

    #[error("the server does not support STARTTLS or offers no suitable authentication method: {0}")]
    SecureChannelUnsupported(String),

    #[error("TLS is not available: {0}")]
    SecureChannelUnavailable(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::UnresolvedFingerprint => 3,
            Error::Delivery(e) => e.exit_code(),
            Error::Unexpected(_) => 13,
            Error::EncryptionFailed(_) => 14,
            Error::KeychainUnavailable(_) => 15,
        }
    }
}

impl DeliveryError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DeliveryError::ConnectFailed(_) => 4,
            DeliveryError::GreetingFailed(_) => 5,
            DeliveryError::AuthFailed(_) => 6,
            DeliveryError::SenderRefused(_) => 7,
            DeliveryError::ProtocolResponseError(_) => 8,
            DeliveryError::RecipientsRefused(_) => 9,
            DeliveryError::DataError(_) => 10,
            DeliveryError::SecureChannelUnsupported(_) => 11,
            DeliveryError::SecureChannelUnavailable(_) => 12,
        }
    }
}

/// Exit code for an error that reached `main`.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<Error>() {
        Some(e) => e.exit_code(),
        None => match err.downcast_ref::<DeliveryError>() {
            Some(e) => e.exit_code(),
            None => 13,
        },
    }
}
