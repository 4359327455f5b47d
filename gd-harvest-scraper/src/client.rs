use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio::time::Duration;

use crate::circuit::{CircuitControl, ProxyCircuit, Rotator};
use crate::config::{HarvestConfig, RetryPolicy};
use crate::error::{FetchError, HarvestError, RotationError};

const USER_AGENT: &str = concat!("gd-harvest/", env!("CARGO_PKG_VERSION"));

/// A way to GET a URL. Production code uses [`HttpSession`]; tests plug in
/// canned responses.
pub trait Transport: Send + Sync + 'static {
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// HTTP client bound to one proxy circuit.
#[derive(Debug, Clone)]
pub struct HttpSession {
    http: reqwest::Client,
}

impl HttpSession {
    /// Build a client that sends everything through `proxy_url`, or directly
    /// when `None`.
    pub fn new(proxy_url: Option<&str>, timeout: Duration) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT);
        if let Some(url) = proxy_url {
            let proxy = reqwest::Proxy::all(url).map_err(|e| FetchError::Setup(e.to_string()))?;
            builder = builder.proxy(proxy);
        } else {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|e| FetchError::Setup(e.to_string()))?;
        Ok(Self { http })
    }
}

impl Transport for HttpSession {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let transport_err = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let resp = self.http.get(url).send().await.map_err(transport_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16(), url));
        }
        let bytes = resp.bytes().await.map_err(transport_err)?;
        Ok(bytes.to_vec())
    }
}

struct Session<T> {
    circuit: ProxyCircuit,
    transport: T,
    /// Held for the duration of a request or rotation on this session.
    lease: Mutex<()>,
    requests: AtomicU64,
    rotations: AtomicU64,
}

/// Fixed table of N sessions, each bound to its own proxy circuit.
///
/// Sessions are addressed by index. Every session has its own lease lock, so
/// two callers that happen to share an index take turns instead of racing
/// on the same circuit. The pool is never resized.
pub struct SessionPool<T = HttpSession, C = Rotator> {
    sessions: Vec<Session<T>>,
    control: C,
    rotate_every: Option<u32>,
}

impl SessionPool<HttpSession, Rotator> {
    /// One proxied session per circuit, sized by [`HarvestConfig::session_count`].
    pub fn from_config(config: &HarvestConfig) -> Result<Self, HarvestError> {
        let count = config.session_count();
        let mut sessions = Vec::with_capacity(count);
        for index in 0..count {
            let circuit = ProxyCircuit {
                index,
                socks_port: if config.use_proxy {
                    config.socks_ports.get(index).copied()
                } else {
                    None
                },
            };
            let proxy = circuit.proxy_url(&config.proxy_host);
            let session = HttpSession::new(proxy.as_deref(), config.request_timeout)?;
            log::debug!("Session {} on {}", index, circuit);
            sessions.push((circuit, session));
        }
        Ok(Self::new(sessions, Rotator::from_config(config)).with_rotate_every(config.rotate_every))
    }
}

impl<T: Transport, C: CircuitControl> SessionPool<T, C> {
    pub fn new(sessions: Vec<(ProxyCircuit, T)>, control: C) -> Self {
        let sessions = sessions
            .into_iter()
            .map(|(circuit, transport)| Session {
                circuit,
                transport,
                lease: Mutex::new(()),
                requests: AtomicU64::new(0),
                rotations: AtomicU64::new(0),
            })
            .collect();
        Self {
            sessions,
            control,
            rotate_every: None,
        }
    }

    /// Rotate a session's circuit after every `n` requests on it.
    pub fn with_rotate_every(mut self, n: Option<u32>) -> Self {
        self.rotate_every = n.filter(|&n| n > 0);
        self
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn circuit(&self, index: usize) -> Option<&ProxyCircuit> {
        self.sessions.get(index).map(|s| &s.circuit)
    }

    /// Requests sent through session `index` so far.
    pub fn request_count(&self, index: usize) -> u64 {
        self.sessions
            .get(index)
            .map_or(0, |s| s.requests.load(Ordering::Relaxed))
    }

    /// Circuit rotations performed across all sessions.
    pub fn rotation_count(&self) -> u64 {
        self.sessions
            .iter()
            .map(|s| s.rotations.load(Ordering::Relaxed))
            .sum()
    }

    /// One GET through session `index`. No retries.
    pub async fn fetch(&self, index: usize, url: &str) -> Result<Vec<u8>, FetchError> {
        let session = self.session(index)?;
        let _lease = session.lease.lock().await;

        log::debug!("[session {}] GET {}", index, url);
        let result = session.transport.get(url).await;
        let sent = session.requests.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(every) = self.rotate_every
            && sent % u64::from(every) == 0
        {
            if let Err(e) = self.rotate_session(session).await {
                log::warn!("Scheduled rotation of {} failed: {}", session.circuit, e);
            }
        }
        result
    }

    /// GET with the retry policy: backoff between attempts, and a fresh
    /// circuit before retrying a blocked request.
    pub async fn fetch_with_retry(
        &self,
        index: usize,
        url: &str,
        policy: &RetryPolicy,
    ) -> Result<Vec<u8>, FetchError> {
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let err = match self.fetch(index, url).await {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };
            if !err.is_retryable() || attempt >= attempts {
                return Err(err);
            }

            log::debug!(
                "[session {}] attempt {}/{} failed: {}",
                index,
                attempt,
                attempts,
                err
            );
            if err.is_block() && policy.rotate_on_block {
                if let Err(e) = self.rotate(index).await {
                    log::warn!("Rotation after block failed: {}", e);
                }
            }
            tokio::time::sleep(policy.delay_after(attempt)).await;
            attempt += 1;
        }
    }

    /// Ask for a new identity on session `index`'s circuit.
    pub async fn rotate(&self, index: usize) -> Result<(), HarvestError> {
        let session = self.session(index)?;
        let _lease = session.lease.lock().await;
        self.rotate_session(session).await?;
        Ok(())
    }

    async fn rotate_session(&self, session: &Session<T>) -> Result<(), RotationError> {
        self.control.rotate(&session.circuit).await?;
        session.rotations.fetch_add(1, Ordering::Relaxed);
        log::info!("New identity on {}", session.circuit);
        Ok(())
    }

    fn session(&self, index: usize) -> Result<&Session<T>, FetchError> {
        self.sessions.get(index).ok_or(FetchError::NoSuchSession {
            index,
            size: self.sessions.len(),
        })
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
