//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use upstream_watch::health::update::DestsUpdate;
use upstream_watch::probe::types::AGENT_TOKEN;

/// Start a programmable mock serving agent on an ephemeral port.
///
/// The closure yields (status, body) per request. The request head is read
/// before responding so probers see a well-behaved HTTP/1.1 peer.
pub async fn start_programmable_agent<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Agent that always answers with a fixed status and body.
pub async fn start_agent(status: u16, body: &'static str) -> SocketAddr {
    start_programmable_agent(move || async move { (status, body.to_string()) }).await
}

/// Agent that answers ready (200 + agent token) unconditionally.
#[allow(dead_code)]
pub async fn start_ready_agent() -> SocketAddr {
    start_agent(200, AGENT_TOKEN).await
}

/// Agent that answers ready only while the flag is true.
#[allow(dead_code)]
pub async fn start_switchable_agent(ready: Arc<AtomicBool>) -> SocketAddr {
    start_programmable_agent(move || {
        let ready = ready.clone();
        async move {
            if ready.load(Ordering::SeqCst) {
                (200, AGENT_TOKEN.to_string())
            } else {
                (503, "starting".to_string())
            }
        }
    })
    .await
}

/// Agent that answers ready and forwards each request head for inspection.
#[allow(dead_code)]
pub async fn start_capture_agent() -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let (head_tx, head_rx) = mpsc::unbounded_channel();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let head_tx = head_tx.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let _ = head_tx.send(String::from_utf8_lossy(&buf[..n]).to_string());

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            AGENT_TOKEN.len(),
                            AGENT_TOKEN
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, head_rx)
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Receive the next update or panic after a generous deadline.
#[allow(dead_code)]
pub async fn next_update(updates: &mut mpsc::Receiver<DestsUpdate>) -> DestsUpdate {
    tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("timed out waiting for update")
        .expect("update stream closed")
}
