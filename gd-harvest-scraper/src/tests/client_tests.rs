use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::AtomicUsize;

use super::*;

/// Transport that replays a scripted sequence of responses.
struct Scripted {
    responses: StdMutex<VecDeque<Result<Vec<u8>, u16>>>,
}

impl Scripted {
    fn new(responses: Vec<Result<&str, u16>>) -> Self {
        Self {
            responses: StdMutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(|body| body.as_bytes().to_vec()))
                    .collect(),
            ),
        }
    }
}

impl Transport for Scripted {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(body)) => Ok(body),
            Some(Err(status)) => Err(FetchError::from_status(status, url)),
            None => Err(FetchError::from_status(404, url)),
        }
    }
}

#[derive(Default)]
struct CountingControl {
    rotations: AtomicU64,
}

impl CircuitControl for CountingControl {
    async fn rotate(&self, _circuit: &ProxyCircuit) -> Result<(), RotationError> {
        self.rotations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn circuit(index: usize) -> ProxyCircuit {
    ProxyCircuit {
        index,
        socks_port: Some(9050 + index as u16),
    }
}

fn pool(transports: Vec<Scripted>) -> SessionPool<Scripted, CountingControl> {
    let sessions = transports
        .into_iter()
        .enumerate()
        .map(|(i, t)| (circuit(i), t))
        .collect();
    SessionPool::new(sessions, CountingControl::default())
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff: Duration::from_millis(1),
        rotate_on_block: true,
    }
}

#[tokio::test]
async fn test_fetch_out_of_range() {
    let pool = pool(vec![Scripted::new(vec![]), Scripted::new(vec![])]);
    let err = pool.fetch(2, "http://archive.test/").await.unwrap_err();
    assert_eq!(err, FetchError::NoSuchSession { index: 2, size: 2 });
}

#[tokio::test]
async fn test_fetch_uses_bound_session() {
    let pool = pool(vec![
        Scripted::new(vec![Ok("zero")]),
        Scripted::new(vec![Ok("one")]),
    ]);
    assert_eq!(pool.fetch(1, "http://archive.test/").await.unwrap(), b"one");
    assert_eq!(pool.fetch(0, "http://archive.test/").await.unwrap(), b"zero");
    assert_eq!(pool.request_count(0), 1);
    assert_eq!(pool.request_count(1), 1);
}

#[tokio::test]
async fn test_status_mapping() {
    assert!(matches!(
        FetchError::from_status(403, "u"),
        FetchError::Blocked { status: 403, .. }
    ));
    assert!(matches!(
        FetchError::from_status(404, "u"),
        FetchError::NotFound { .. }
    ));
    assert!(matches!(
        FetchError::from_status(503, "u"),
        FetchError::Server { status: 503, .. }
    ));
    assert!(matches!(
        FetchError::from_status(400, "u"),
        FetchError::Rejected { status: 400, .. }
    ));
    assert!(FetchError::from_status(429, "u").is_retryable());
    assert!(!FetchError::from_status(404, "u").is_retryable());
}

#[tokio::test]
async fn test_block_rotates_once_then_succeeds() {
    let pool = pool(vec![Scripted::new(vec![Err(429), Ok("<game/>")])]);
    let body = pool
        .fetch_with_retry(0, "http://archive.test/players.xml", &fast_retry())
        .await
        .unwrap();
    assert_eq!(body, b"<game/>");
    assert_eq!(pool.rotation_count(), 1);
    assert_eq!(pool.request_count(0), 2);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let pool = pool(vec![Scripted::new(vec![Err(404), Ok("late")])]);
    let err = pool
        .fetch_with_retry(0, "http://archive.test/missing.xml", &fast_retry())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::NotFound { .. }));
    assert_eq!(pool.request_count(0), 1);
    assert_eq!(pool.rotation_count(), 0);
}

#[tokio::test]
async fn test_server_error_retried_without_rotation() {
    let pool = pool(vec![Scripted::new(vec![Err(502), Err(503), Ok("ok")])]);
    let body = pool
        .fetch_with_retry(0, "http://archive.test/", &fast_retry())
        .await
        .unwrap();
    assert_eq!(body, b"ok");
    assert_eq!(pool.request_count(0), 3);
    assert_eq!(pool.rotation_count(), 0);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let pool = pool(vec![Scripted::new(vec![Err(403), Err(403), Err(403), Ok("never")])]);
    let err = pool
        .fetch_with_retry(0, "http://archive.test/", &fast_retry())
        .await
        .unwrap_err();
    assert!(err.is_block());
    assert_eq!(pool.request_count(0), 3);
    // No rotation after the final attempt
    assert_eq!(pool.rotation_count(), 2);
}

#[tokio::test]
async fn test_block_without_rotation_policy() {
    let pool = pool(vec![Scripted::new(vec![Err(429), Ok("ok")])]);
    let policy = RetryPolicy {
        rotate_on_block: false,
        ..fast_retry()
    };
    pool.fetch_with_retry(0, "http://archive.test/", &policy)
        .await
        .unwrap();
    assert_eq!(pool.rotation_count(), 0);
}

#[tokio::test]
async fn test_periodic_rotation() {
    let responses = vec![Ok("a"); 5];
    let pool = pool(vec![Scripted::new(responses)]).with_rotate_every(Some(2));
    for _ in 0..5 {
        pool.fetch(0, "http://archive.test/").await.unwrap();
    }
    assert_eq!(pool.rotation_count(), 2);
}

#[tokio::test]
async fn test_manual_rotate() {
    let pool = pool(vec![Scripted::new(vec![]), Scripted::new(vec![])]);
    pool.rotate(1).await.unwrap();
    assert_eq!(pool.rotation_count(), 1);
    assert!(pool.rotate(5).await.is_err());
}

#[test]
fn test_pool_from_config_sizes() {
    let config = HarvestConfig {
        sessions: Some(3),
        ..Default::default()
    };
    let pool = SessionPool::from_config(&config).unwrap();
    assert_eq!(pool.len(), 3);
    assert_eq!(pool.circuit(0).unwrap().socks_port, Some(9050));
    assert_eq!(pool.circuit(1).unwrap().socks_port, Some(9052));
    assert_eq!(pool.circuit(2).unwrap().socks_port, Some(9053));

    let direct = HarvestConfig {
        sessions: Some(2),
        use_proxy: false,
        ..Default::default()
    };
    let pool = SessionPool::from_config(&direct).unwrap();
    assert_eq!(pool.circuit(1).unwrap().socks_port, None);
}

/// Requests currently inside a transport, and the most seen at once.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

/// Transport that holds each request open briefly and records overlap.
struct Slow(Arc<Gauge>);

impl Transport for Slow {
    async fn get(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        let now = self.0.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.max.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.0.current.fetch_sub(1, Ordering::SeqCst);
        Ok(b"ok".to_vec())
    }
}

fn slow_pool(gauges: &[Arc<Gauge>]) -> SessionPool<Slow, CountingControl> {
    let sessions = gauges
        .iter()
        .enumerate()
        .map(|(i, g)| (circuit(i), Slow(g.clone())))
        .collect();
    SessionPool::new(sessions, CountingControl::default())
}

#[tokio::test]
async fn test_same_session_requests_take_turns() {
    let gauge = Arc::new(Gauge::default());
    let pool = slow_pool(&[gauge.clone(), Arc::new(Gauge::default())]);

    let (a, b, c) = tokio::join!(
        pool.fetch(0, "http://archive.test/a"),
        pool.fetch(0, "http://archive.test/b"),
        pool.fetch(0, "http://archive.test/c"),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(gauge.max.load(Ordering::SeqCst), 1);
    assert_eq!(pool.request_count(0), 3);
}

#[tokio::test]
async fn test_different_sessions_overlap() {
    let gauge = Arc::new(Gauge::default());
    let pool = slow_pool(&[gauge.clone(), gauge.clone()]);

    let (a, b) = tokio::join!(
        pool.fetch(0, "http://archive.test/a"),
        pool.fetch(1, "http://archive.test/b"),
    );
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(gauge.max.load(Ordering::SeqCst), 2);
}
