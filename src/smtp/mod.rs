//! Upstream SMTP client.
//!
//! Every call opens one implicit-TLS (SMTPS) connection, authenticates, does
//! its work and closes the connection again. Nothing is pooled or retried and
//! there is no STARTTLS or plaintext fallback.

use lettre::{
    Address,
    address::{AddressError, Envelope},
    transport::smtp::{
        self,
        authentication::{Credentials, Mechanism},
        client::{AsyncSmtpConnection, Certificate, TlsParameters},
        commands::Ehlo,
        extension::ClientId,
        response::Response,
    },
};
use std::{fmt, time::Duration};
use thiserror::Error;
use tracing::debug;

/// Same value lettre's transports use when no timeout is configured.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

const MECHANISMS: &[Mechanism] = &[Mechanism::Plain, Mechanism::Login];

/// Reply code a healthy server answers EHLO with.
pub const EHLO_OK: u16 = 250;

/// Where and how to reach the upstream server.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Extra PEM trust anchor for private relays.
    pub root_certificate: Option<String>,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("root_certificate", &self.root_certificate.is_some())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum SmtpError {
    #[error("connection failed: {0}")]
    Connect(#[source] smtp::Error),
    #[error("authentication failed: {0}")]
    Auth(#[source] smtp::Error),
    #[error("invalid address {0:?}: {1}")]
    Address(String, #[source] AddressError),
    #[error("invalid envelope: {0}")]
    Envelope(#[source] lettre::error::Error),
    #[error("send failed: {0}")]
    Send(#[source] smtp::Error),
    #[error("EHLO failed: {0}")]
    Greeting(#[source] smtp::Error),
    /// The server answered EHLO with something other than 250.
    #[error("SMTP server returned unexpected response {code}: {reply}")]
    UnexpectedResponse { code: u16, reply: String },
}

pub struct SmtpClient<'a> {
    settings: &'a SmtpSettings,
    hello_name: ClientId,
}

impl<'a> SmtpClient<'a> {
    pub fn new(settings: &'a SmtpSettings) -> Self {
        Self {
            settings,
            hello_name: ClientId::default(),
        }
    }

    /// Relay `message` to `to` with `from` as the envelope sender.
    ///
    /// The envelope is authoritative: headers inside `message` are not read.
    pub async fn transmit(&self, from: &str, to: &[String], message: &[u8]) -> Result<(), SmtpError> {
        let envelope = build_envelope(from, to)?;

        // lettre terminates DATA with CRLF.CRLF on its own
        let message = message.strip_suffix(b"\r\n").unwrap_or(message);

        let mut conn = self.open().await?;
        let sent = conn.send(&envelope, message).await;
        let ok = sent.is_ok();
        close(conn, ok).await;

        let response = sent.map_err(SmtpError::Send)?;
        debug!("smtp accepted message: {}", reply_text(&response));
        Ok(())
    }

    /// Liveness probe: connect, authenticate and expect `250` to EHLO.
    pub async fn probe(&self) -> Result<(), SmtpError> {
        let mut conn = self.open().await?;
        let result = match conn.command(Ehlo::new(self.hello_name.clone())).await {
            Ok(response) => {
                let code = u16::from(response.code());
                if code == EHLO_OK {
                    Ok(())
                } else {
                    Err(SmtpError::UnexpectedResponse {
                        code,
                        reply: reply_text(&response),
                    })
                }
            }
            // lettre turns 4xx/5xx replies into errors; keep the code
            Err(e) => match e.status() {
                Some(code) => Err(SmtpError::UnexpectedResponse {
                    code: u16::from(code),
                    reply: e.to_string(),
                }),
                None => Err(SmtpError::Greeting(e)),
            },
        };
        close(conn, result.is_ok()).await;
        result
    }

    async fn open(&self) -> Result<AsyncSmtpConnection, SmtpError> {
        let tls = self.tls_parameters().map_err(SmtpError::Connect)?;
        debug!("smtp connect: {}:{}", self.settings.host, self.settings.port);
        let mut conn = AsyncSmtpConnection::connect_tokio1(
            (self.settings.host.as_str(), self.settings.port),
            Some(CONNECT_TIMEOUT),
            &self.hello_name,
            Some(tls),
            None,
        )
        .await
        .map_err(SmtpError::Connect)?;

        let credentials = Credentials::new(
            self.settings.username.clone(),
            self.settings.password.clone(),
        );
        if let Err(e) = conn.auth(MECHANISMS, &credentials).await {
            conn.abort().await;
            return Err(SmtpError::Auth(e));
        }
        debug!("smtp authenticated as {}", self.settings.username);
        Ok(conn)
    }

    fn tls_parameters(&self) -> Result<TlsParameters, smtp::Error> {
        let mut builder = TlsParameters::builder(self.settings.host.clone());
        if let Some(pem) = &self.settings.root_certificate {
            builder = builder.add_root_certificate(Certificate::from_pem(pem.as_bytes())?);
        }
        builder.build_rustls()
    }
}

/// QUIT after success, drop the stream after failure.
async fn close(mut conn: AsyncSmtpConnection, graceful: bool) {
    if graceful {
        if let Err(e) = conn.quit().await {
            debug!("smtp quit failed: {e}");
            conn.abort().await;
        }
    } else {
        conn.abort().await;
    }
}

fn build_envelope(from: &str, to: &[String]) -> Result<Envelope, SmtpError> {
    let sender = parse_address(from)?;
    let recipients = to
        .iter()
        .map(|r| parse_address(r))
        .collect::<Result<Vec<_>, _>>()?;
    Envelope::new(Some(sender), recipients).map_err(SmtpError::Envelope)
}

fn parse_address(raw: &str) -> Result<Address, SmtpError> {
    raw.trim()
        .parse::<Address>()
        .map_err(|e| SmtpError::Address(raw.to_string(), e))
}

fn reply_text(response: &Response) -> String {
    response.message().collect::<Vec<_>>().join("\n")
}
