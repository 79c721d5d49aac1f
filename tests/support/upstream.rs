//! Scripted SMTPS server standing in for the upstream relay.
//!
//! Implicit TLS with a throwaway self-signed certificate; supports EHLO,
//! AUTH PLAIN/LOGIN, MAIL FROM, RCPT TO, DATA, RSET, NOOP, QUIT.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use rustls::{
    ServerConfig,
    pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer},
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpListener,
};
use tokio_rustls::TlsAcceptor;

pub const USER: &str = "relay";
pub const PASS: &str = "hunter2";

const EHLO_REPLY: &str = "250-upstream.test\r\n250-AUTH PLAIN LOGIN\r\n250 OK\r\n";

#[derive(Debug, Clone)]
pub struct Delivery {
    pub from: String,
    pub rcpts: Vec<String>,
    pub data: String,
}

/// Deviations from a well-behaved server.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Reply to every EHLO after the one sent while connecting.
    pub probe_reply: Option<&'static str>,
}

pub struct FakeUpstream {
    pub port: u16,
    /// PEM certificate the client must trust.
    pub ca_pem: String,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    connections: Arc<AtomicUsize>,
}

impl FakeUpstream {
    pub async fn start(script: Script) -> Self {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["127.0.0.1".to_string(), "localhost".to_string()])
                .expect("generate certificate");
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
        let tls = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .expect("protocol versions")
            .with_no_client_auth()
            .with_single_cert(vec![cert.der().clone()], key)
            .expect("server certificate");
        let acceptor = TlsAcceptor::from(Arc::new(tls));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let deliveries = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let (d, c) = (deliveries.clone(), connections.clone());
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                c.fetch_add(1, Ordering::SeqCst);
                let (acceptor, script, deliveries) = (acceptor.clone(), script.clone(), d.clone());
                tokio::spawn(async move {
                    if let Ok(tls) = acceptor.accept(stream).await {
                        let _ = handle_client(tls, script, deliveries).await;
                    }
                });
            }
        });

        FakeUpstream {
            port,
            ca_pem: cert.pem(),
            deliveries,
            connections,
        }
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn reply<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> std::io::Result<()> {
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await
}

/// Address between angle brackets, ignoring trailing parameters.
fn path(arg: &str) -> String {
    let arg = arg.trim();
    arg.strip_prefix('<')
        .and_then(|s| s.split('>').next())
        .unwrap_or(arg)
        .to_string()
}

async fn handle_client<S>(
    stream: S,
    script: Script,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    reply(&mut writer, "220 upstream.test ESMTP ready\r\n").await?;

    let mut ehlos = 0;
    let mut authed = false;
    let mut mail_from: Option<String> = None;
    let mut rcpts: Vec<String> = Vec::new();
    let mut buf = String::new();

    loop {
        buf.clear();
        let n = reader.read_line(&mut buf).await?;
        if n == 0 {
            break;
        }
        let line = buf.trim_end_matches(['\r', '\n']);
        let upper = line.to_uppercase();

        if upper.starts_with("EHLO") || upper.starts_with("HELO") {
            ehlos += 1;
            match script.probe_reply.filter(|_| ehlos > 1) {
                Some(scripted) => reply(&mut writer, scripted).await?,
                None => reply(&mut writer, EHLO_REPLY).await?,
            }
        } else if upper.starts_with("AUTH PLAIN") {
            let token = line.split_whitespace().nth(2).unwrap_or("");
            let data = B64.decode(token)?;
            // format: "\0username\0password"
            let mut iter = data.split(|b| *b == 0);
            let _ = iter.next();
            let u = String::from_utf8_lossy(iter.next().unwrap_or_default()).to_string();
            let p = String::from_utf8_lossy(iter.next().unwrap_or_default()).to_string();
            authed = u == USER && p == PASS;
            auth_result(&mut writer, authed).await?;
        } else if upper.starts_with("AUTH LOGIN") {
            reply(&mut writer, "334 VXNlcm5hbWU6\r\n").await?; // 'Username:'
            let mut u = String::new();
            reader.read_line(&mut u).await?;
            let u = B64.decode(u.trim_end_matches(['\r', '\n']))?;
            reply(&mut writer, "334 UGFzc3dvcmQ6\r\n").await?; // 'Password:'
            let mut p = String::new();
            reader.read_line(&mut p).await?;
            let p = B64.decode(p.trim_end_matches(['\r', '\n']))?;
            authed = u == USER.as_bytes() && p == PASS.as_bytes();
            auth_result(&mut writer, authed).await?;
        } else if upper.starts_with("MAIL FROM:") {
            if !authed {
                reply(&mut writer, "530 5.7.0 Authentication required\r\n").await?;
                continue;
            }
            mail_from = Some(path(&line[10..]));
            rcpts.clear();
            reply(&mut writer, "250 OK\r\n").await?;
        } else if upper.starts_with("RCPT TO:") {
            if mail_from.is_none() {
                reply(&mut writer, "503 5.5.1 MAIL first\r\n").await?;
                continue;
            }
            rcpts.push(path(&line[8..]));
            reply(&mut writer, "250 Accepted\r\n").await?;
        } else if upper == "DATA" {
            if rcpts.is_empty() {
                reply(&mut writer, "503 5.5.1 RCPT first\r\n").await?;
                continue;
            }
            reply(&mut writer, "354 End data with <CR><LF>.<CR><LF>\r\n").await?;
            let mut data = String::new();
            loop {
                let mut line = String::new();
                let n = reader.read_line(&mut line).await?;
                if n == 0 || line == ".\r\n" || line == ".\n" {
                    break;
                }
                data.push_str(line.strip_prefix('.').unwrap_or(&line));
            }
            deliveries.lock().unwrap().push(Delivery {
                from: mail_from.take().unwrap_or_default(),
                rcpts: std::mem::take(&mut rcpts),
                data,
            });
            reply(&mut writer, "250 2.0.0 Queued\r\n").await?;
        } else if upper == "RSET" {
            mail_from = None;
            rcpts.clear();
            reply(&mut writer, "250 OK\r\n").await?;
        } else if upper == "NOOP" {
            reply(&mut writer, "250 OK\r\n").await?;
        } else if upper == "QUIT" {
            reply(&mut writer, "221 2.0.0 Bye\r\n").await?;
            break;
        } else {
            reply(&mut writer, "502 5.5.2 Command not implemented\r\n").await?;
        }
    }
    Ok(())
}

async fn auth_result<W: AsyncWrite + Unpin>(writer: &mut W, ok: bool) -> std::io::Result<()> {
    if ok {
        reply(writer, "235 2.7.0 Authentication successful\r\n").await
    } else {
        reply(writer, "535 5.7.8 Authentication credentials invalid\r\n").await
    }
}
