//! Proxy circuits and identity rotation.
//!
//! Every session talks to the archive through its own local SOCKS port of a
//! Tor instance. Rotating a circuit means asking Tor's control port for a new
//! identity (`SIGNAL NEWNYM`), after which new connections leave through a
//! different exit address.

use std::future::Future;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::Duration;

use crate::config::HarvestConfig;
use crate::error::RotationError;

/// Default SOCKS port layout: 9050, then 9052..=9070 (9051 is the control port).
pub fn default_socks_ports() -> Vec<u16> {
    std::iter::once(9050).chain(9052..=9070).collect()
}

/// One outbound relay path, bound 1:1 to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCircuit {
    pub index: usize,
    /// Local SOCKS port, `None` for a direct connection.
    pub socks_port: Option<u16>,
}

impl ProxyCircuit {
    /// `socks5h://` URL so host names are resolved on the far side of the circuit.
    pub fn proxy_url(&self, host: &str) -> Option<String> {
        self.socks_port.map(|port| format!("socks5h://{}:{}", host, port))
    }
}

impl std::fmt::Display for ProxyCircuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.socks_port {
            Some(port) => write!(f, "circuit {} (port {})", self.index, port),
            None => write!(f, "circuit {} (direct)", self.index),
        }
    }
}

/// Something that can hand a circuit a fresh exit identity.
pub trait CircuitControl: Send + Sync + 'static {
    fn rotate(
        &self,
        circuit: &ProxyCircuit,
    ) -> impl Future<Output = Result<(), RotationError>> + Send;
}

/// Client for the Tor control protocol.
#[derive(Debug, Clone)]
pub struct TorControl {
    addr: String,
    password: String,
    timeout: Duration,
}

impl TorControl {
    pub fn new(addr: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            password: password.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Authenticate and request a new identity.
    pub async fn new_identity(&self) -> Result<(), RotationError> {
        let secs = self.timeout.as_secs();
        tokio::time::timeout(self.timeout, self.exchange())
            .await
            .map_err(|_| RotationError::Timeout(secs))?
    }

    async fn exchange(&self) -> Result<(), RotationError> {
        let stream = TcpStream::connect(&self.addr).await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let auth = format!("AUTHENTICATE {}\r\n", quote(&self.password));
        write_half.write_all(auth.as_bytes()).await?;
        expect_ok(&mut reader, "AUTHENTICATE").await?;

        write_half.write_all(b"SIGNAL NEWNYM\r\n").await?;
        expect_ok(&mut reader, "SIGNAL NEWNYM").await?;

        // Best effort; the identity change already happened
        let _ = write_half.write_all(b"QUIT\r\n").await;
        Ok(())
    }
}

impl CircuitControl for TorControl {
    async fn rotate(&self, circuit: &ProxyCircuit) -> Result<(), RotationError> {
        log::debug!("Requesting new identity for {} via {}", circuit, self.addr);
        self.new_identity().await
    }
}

/// Rotation strategy chosen from configuration.
#[derive(Debug, Clone)]
pub enum Rotator {
    Tor(TorControl),
    /// Direct connections: there is no circuit to rebuild.
    Disabled,
}

impl Rotator {
    pub fn from_config(config: &HarvestConfig) -> Self {
        if config.use_proxy {
            Self::Tor(TorControl::new(
                config.control_addr(),
                config.control_password.clone(),
            ))
        } else {
            Self::Disabled
        }
    }
}

impl CircuitControl for Rotator {
    async fn rotate(&self, circuit: &ProxyCircuit) -> Result<(), RotationError> {
        match self {
            Self::Tor(tor) => tor.rotate(circuit).await,
            Self::Disabled => {
                log::debug!("Rotation disabled, keeping {}", circuit);
                Ok(())
            }
        }
    }
}

/// Read one (possibly multi-line) reply and require status 250.
async fn expect_ok<R>(reader: &mut R, command: &'static str) -> Result<(), RotationError>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(RotationError::Closed);
        }
        let trimmed = line.trim_end();
        // "250-..." and "250+..." continue the reply; "250 ..." ends it
        let is_last = trimmed.as_bytes().get(3).is_none_or(|&b| b == b' ');
        if !is_last {
            continue;
        }
        let code = trimmed.get(..3).unwrap_or(trimmed);
        let message = trimmed.get(3..).unwrap_or_default();
        if code == "250" {
            return Ok(());
        }
        return Err(RotationError::Rejected {
            command,
            code: code.to_string(),
            message: message.trim().to_string(),
        });
    }
}

/// Quote a control-protocol string argument.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
#[path = "tests/circuit_tests.rs"]
mod tests;
