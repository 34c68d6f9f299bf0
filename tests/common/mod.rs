//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;

use outbound_resilience::observability::ResilienceEvent;
use outbound_resilience::resilience::Outcome;
use outbound_resilience::CircuitState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TestError {
    #[error("transient failure")]
    Transient,
    #[error("fatal failure")]
    Fatal,
}

/// Only `TestError::Transient` counts as a failure.
pub fn is_transient(outcome: Outcome<'_, u32, TestError>) -> bool {
    matches!(outcome, Outcome::Failure(TestError::Transient))
}

/// An operation that plays back scripted outcomes and counts invocations.
#[derive(Clone)]
pub struct Script {
    calls: Arc<AtomicUsize>,
    outcomes: Arc<Mutex<VecDeque<Result<u32, TestError>>>>,
    fallback: Result<u32, TestError>,
}

impl Script {
    /// Plays `outcomes` in order, then succeeds with `Ok(0)` forever.
    pub fn new(outcomes: impl IntoIterator<Item = Result<u32, TestError>>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            outcomes: Arc::new(Mutex::new(outcomes.into_iter().collect())),
            fallback: Ok(0),
        }
    }

    pub fn always(outcome: Result<u32, TestError>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            fallback: outcome,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<u32, TestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn operation(
        &self,
    ) -> impl Fn() -> std::future::Ready<Result<u32, TestError>> + Send + Sync + 'static {
        let script = self.clone();
        move || std::future::ready(script.next())
    }

    /// Like [`Script::operation`], but every attempt takes `delay`.
    pub fn slow_operation(
        &self,
        delay: Duration,
    ) -> impl Fn() -> BoxFuture<'static, Result<u32, TestError>> + Send + Sync + 'static {
        let script = self.clone();
        move || {
            let script = script.clone();
            async move {
                tokio::time::sleep(delay).await;
                script.next()
            }
            .boxed()
        }
    }
}

pub fn drain(rx: &mut UnboundedReceiver<ResilienceEvent>) -> Vec<ResilienceEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Circuit states reported by transition events, in order.
pub fn transitions(events: &[ResilienceEvent]) -> Vec<CircuitState> {
    events.iter().filter_map(|e| e.circuit_state()).collect()
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the zero-based request number and returns status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Arc<AtomicUsize>)
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        read_request_head(&mut socket).await;
                        let (status, body) = f(n).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, hits)
}

/// Start a backend that answers every request with the statuses in
/// `statuses`, then 200 once they run out.
pub async fn start_status_backend(statuses: Vec<u16>) -> (SocketAddr, Arc<AtomicUsize>) {
    let statuses = Arc::new(statuses);
    start_programmable_backend(move |n| {
        let status = statuses.get(n).copied().unwrap_or(200);
        async move { (status, format!("response {n}")) }
    })
    .await
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}
