use std::future::Future;
use std::time::Duration;

use age::secrecy::{ExposeSecret, SecretString};
use lettre::transport::smtp::authentication::{Credentials as LoginCredentials, Mechanism};
use lettre::transport::smtp::client::{AsyncSmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::{Data, Mail, Rcpt, Rset};
use lettre::transport::smtp::extension::{ClientId, Extension};
use lettre::transport::smtp::Error as SmtpError;
use lettre::Address;

use crate::crypto::SecureEnvelope;
use crate::error::DeliveryError;

use super::Security;

/// Maximum time to wait for the connection or any single protocol stage.
const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub security: Security,
    /// Name announced in EHLO.
    pub helo: String,
    pub timeout: Duration,
}

impl SmtpConfig {
    pub fn new(server: impl Into<String>, port: u16, security: Security) -> Self {
        Self {
            server: server.into(),
            port,
            security,
            helo: "localhost".to_string(),
            timeout: SMTP_TIMEOUT,
        }
    }
}

/// Mailbox login. The password is cleared when this is dropped.
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Sends sealed envelopes over one SMTP session per message.
pub struct SmtpTransport {
    config: SmtpConfig,
    credentials: Option<Credentials>,
}

impl SmtpTransport {
    pub fn new(config: SmtpConfig, credentials: Option<Credentials>) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// Deliver `envelope` from `from` to every address in `to`.
    ///
    /// The envelope is consumed. If any recipient is refused the transaction
    /// is reset and nothing is sent. Credentials are dropped once the session
    /// ends, whatever the outcome.
    pub async fn send(
        mut self,
        envelope: SecureEnvelope,
        from: &str,
        to: &[String],
    ) -> Result<(), DeliveryError> {
        let credentials = self.credentials.take();
        let sender = parse_address(from).map_err(DeliveryError::SenderRefused)?;
        let recipients = to
            .iter()
            .map(|rcpt| parse_address(rcpt).map(|addr| (rcpt, addr)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DeliveryError::RecipientsRefused(vec![e]))?;

        let data = frame_message(&envelope.ciphertext, from, to);
        drop(envelope);

        let limit = self.config.timeout;
        let client_id = ClientId::Domain(self.config.helo.clone());
        let mut conn = self.connect(&client_id).await?;

        if self.config.security == Security::Starttls {
            if !conn.server_info().supports_feature(Extension::StartTls) {
                return Err(DeliveryError::SecureChannelUnsupported(
                    "server does not offer STARTTLS".to_string(),
                ));
            }
            let tls = self.tls_parameters()?;
            bounded(limit, conn.starttls(tls, &client_id))
                .await?
                .map_err(starttls_error)?;
            tracing::debug!("connection upgraded with STARTTLS");
        }

        if let Some(credentials) = credentials {
            let login = LoginCredentials::new(
                credentials.username.clone(),
                credentials.password.expose_secret().to_string(),
            );
            drop(credentials);
            bounded(limit, conn.auth(&[Mechanism::Plain, Mechanism::Login], &login))
                .await?
                .map_err(|e| {
                    if e.is_client() {
                        DeliveryError::SecureChannelUnsupported(e.to_string())
                    } else {
                        reply_error(e, DeliveryError::AuthFailed)
                    }
                })?;
            tracing::debug!("authenticated");
        }

        bounded(limit, conn.command(Mail::new(Some(sender), vec![])))
            .await?
            .map_err(|e| reply_error(e, DeliveryError::SenderRefused))?;

        let mut refused = Vec::new();
        for (rcpt, addr) in recipients {
            match bounded(limit, conn.command(Rcpt::new(addr, vec![]))).await? {
                Ok(_) => {}
                Err(e) if e.status().is_some() => refused.push(format!("{} ({})", rcpt, e)),
                Err(e) => return Err(DeliveryError::ProtocolResponseError(e.to_string())),
            }
        }
        if !refused.is_empty() {
            let _ = bounded(limit, conn.command(Rset)).await;
            return Err(DeliveryError::RecipientsRefused(refused));
        }

        bounded(limit, conn.command(Data))
            .await?
            .map_err(|e| reply_error(e, DeliveryError::DataError))?;
        let accepted = bounded(limit, conn.message(&data))
            .await?
            .map_err(|e| reply_error(e, DeliveryError::DataError))?;
        tracing::debug!("message accepted ({})", accepted.code());

        let _ = bounded(limit, conn.quit()).await;
        Ok(())
    }

    /// Open the session: TCP, implicit TLS if configured, greeting and EHLO.
    async fn connect(&self, client_id: &ClientId) -> Result<AsyncSmtpConnection, DeliveryError> {
        let implicit_tls = self.config.security == Security::Tls;
        let tls = if implicit_tls {
            Some(self.tls_parameters()?)
        } else {
            None
        };

        let target = format!("{}:{}", self.config.server, self.config.port);
        tracing::debug!("connecting to {} ({:?})", target, self.config.security);

        let connecting = AsyncSmtpConnection::connect_tokio1(
            (self.config.server.as_str(), self.config.port),
            Some(self.config.timeout),
            client_id,
            tls,
            None,
        );
        match tokio::time::timeout(self.config.timeout, connecting).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) if e.status().is_some() => Err(DeliveryError::GreetingFailed(e.to_string())),
            Ok(Err(e)) if implicit_tls && is_tls_failure(&e) => {
                Err(DeliveryError::SecureChannelUnavailable(e.to_string()))
            }
            Ok(Err(e)) => Err(DeliveryError::ConnectFailed(format!("{target}: {e}"))),
            Err(_) => Err(DeliveryError::ConnectFailed(format!(
                "timed out connecting to {target}"
            ))),
        }
    }

    fn tls_parameters(&self) -> Result<TlsParameters, DeliveryError> {
        TlsParameters::new(self.config.server.clone())
            .map_err(|e| DeliveryError::SecureChannelUnavailable(e.to_string()))
    }
}

/// Run one protocol stage under the session timeout. The outer error is the
/// timeout; the inner result is the stage's own outcome.
async fn bounded<T>(
    limit: Duration,
    stage: impl Future<Output = Result<T, SmtpError>>,
) -> Result<Result<T, SmtpError>, DeliveryError> {
    tokio::time::timeout(limit, stage).await.map_err(|_| {
        DeliveryError::ProtocolResponseError(format!(
            "no reply from server within {}s",
            limit.as_secs()
        ))
    })
}

/// A negative server reply becomes `kind`; anything else means the session broke.
fn reply_error(e: SmtpError, kind: fn(String) -> DeliveryError) -> DeliveryError {
    if e.status().is_some() {
        kind(e.to_string())
    } else {
        DeliveryError::ProtocolResponseError(e.to_string())
    }
}

fn starttls_error(e: SmtpError) -> DeliveryError {
    if e.status().is_some() {
        DeliveryError::ProtocolResponseError(e.to_string())
    } else if e.is_client() {
        DeliveryError::SecureChannelUnsupported(e.to_string())
    } else {
        DeliveryError::SecureChannelUnavailable(e.to_string())
    }
}

/// Whether a connection error came from the TLS handshake rather than TCP.
fn is_tls_failure(e: &SmtpError) -> bool {
    let mut source = std::error::Error::source(e);
    while let Some(err) = source {
        if err.is::<rustls::Error>() {
            return true;
        }
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof
            ) || io.get_ref().is_some_and(|inner| inner.is::<rustls::Error>())
            {
                return true;
            }
        }
        source = err.source();
    }
    false
}

fn parse_address(address: &str) -> Result<Address, String> {
    address
        .parse::<Address>()
        .map_err(|e| format!("{} (invalid address: {})", address, e))
}

/// Wrap the envelope in outer headers and normalise to CRLF. Dot-stuffing and
/// the terminator are added by the SMTP client.
fn frame_message(ciphertext: &[u8], from: &str, to: &[String]) -> Vec<u8> {
    let text = String::from_utf8_lossy(ciphertext);
    let mut out = format!("From: {}\r\nTo: {}\r\n\r\n", from, to.join(", "));
    out.push_str(&text.lines().collect::<Vec<_>>().join("\r\n"));
    out.into_bytes()
}
