//! Reconnecting workers for the streamer's WebSocket connection and the
//! amplifier's line-oriented TCP connection. Both share the same lifecycle:
//! `disconnected -> connecting -> connected -> disconnecting -> disconnected`,
//! with exponential backoff between reconnect attempts and a cooperative
//! `stop()`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// A handle used from inside `on_connect` to push outbound frames.
#[derive(Clone)]
pub struct WsOutbound(mpsc::UnboundedSender<Message>);

impl WsOutbound {
    pub fn send(&self, message: Message) -> bool {
        self.0.send(message).is_ok()
    }

    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.send(Message::Text(text.into().into()))
    }
}

pub type WsOnConnect = Box<dyn Fn(WsOutbound) + Send + Sync + 'static>;
pub type WsOnData = Box<dyn Fn(Message) + Send + Sync + 'static>;
pub type WsOnDisconnect = Box<dyn Fn() + Send + Sync + 'static>;

/// Owns a background task that keeps a WebSocket connection alive,
/// reconnecting with exponential backoff on any transport error.
pub struct WebSocketWorker {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl WebSocketWorker {
    pub fn spawn(
        url: String,
        on_connect: WsOnConnect,
        on_data: WsOnData,
        on_disconnect: WsOnDisconnect,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_ws(url, on_connect, on_data, on_disconnect, Arc::clone(&stop)));
        WebSocketWorker { stop, task }
    }

    /// Signals the worker to stop and waits for it to exit.
    pub async fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.task.await;
    }
}

async fn run_ws(url: String, on_connect: WsOnConnect, on_data: WsOnData, on_disconnect: WsOnDisconnect, stop: Arc<AtomicBool>) {
    let mut backoff = INITIAL_BACKOFF;

    while !stop.load(Ordering::SeqCst) {
        debug!(%url, "connecting");
        let connected = tokio_tungstenite::connect_async(&url).await;

        let (ws_stream, _) = match connected {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%url, %err, "websocket connect failed, backing off");
                on_disconnect();
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
                continue;
            }
        };

        backoff = INITIAL_BACKOFF;
        let (mut write, mut read) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let pump = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if write.send(message).await.is_err() {
                    break;
                }
            }
        });

        on_connect(WsOutbound(tx));

        loop {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            match read.next().await {
                Some(Ok(message)) => on_data(message),
                Some(Err(err)) => {
                    warn!(%url, %err, "websocket read error");
                    break;
                }
                None => break,
            }
        }

        pump.abort();
        on_disconnect();

        if stop.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(backoff).await;
        backoff = next_backoff(backoff);
    }
}

/// A single received line, with the terminator stripped.
pub type TcpOnConnect = Box<dyn Fn(TcpOutbound) + Send + Sync + 'static>;
pub type TcpOnLine = Box<dyn Fn(Vec<u8>) + Send + Sync + 'static>;
pub type TcpOnDisconnect = Box<dyn Fn() + Send + Sync + 'static>;

#[derive(Clone)]
pub struct TcpOutbound(mpsc::UnboundedSender<Vec<u8>>);

impl TcpOutbound {
    pub fn send(&self, bytes: Vec<u8>) -> bool {
        self.0.send(bytes).is_ok()
    }
}

/// Reconnecting, line-oriented TCP worker. Used for the Hegel amplifier's
/// `\r`-terminated command protocol.
pub struct TcpLineWorker {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TcpLineWorker {
    pub fn spawn(
        addr: String,
        terminator: u8,
        on_connect: TcpOnConnect,
        on_line: TcpOnLine,
        on_disconnect: TcpOnDisconnect,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_tcp(addr, terminator, on_connect, on_line, on_disconnect, Arc::clone(&stop)));
        TcpLineWorker { stop, task }
    }

    pub async fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.task.await;
    }
}

async fn run_tcp(
    addr: String,
    terminator: u8,
    on_connect: TcpOnConnect,
    on_line: TcpOnLine,
    on_disconnect: TcpOnDisconnect,
    stop: Arc<AtomicBool>,
) {
    let mut backoff = INITIAL_BACKOFF;

    while !stop.load(Ordering::SeqCst) {
        debug!(%addr, "connecting");
        let stream = match TcpStream::connect(&addr).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(%addr, %err, "tcp connect failed, backing off");
                on_disconnect();
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
                continue;
            }
        };

        backoff = INITIAL_BACKOFF;
        let (mut reader, mut writer) = stream.into_split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

        let pump = tokio::spawn(async move {
            while let Some(bytes) = rx.recv().await {
                if writer.write_all(&bytes).await.is_err() {
                    break;
                }
            }
        });

        on_connect(TcpOutbound(tx));

        let mut buf = Vec::new();
        let mut chunk = [0u8; 512];
        loop {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    while let Some(pos) = buf.iter().position(|&b| b == terminator) {
                        let line: Vec<u8> = buf.drain(..=pos).collect();
                        on_line(line[..line.len() - 1].to_vec());
                    }
                }
                Err(err) => {
                    warn!(%addr, %err, "tcp read error");
                    break;
                }
            }
        }

        pump.abort();
        on_disconnect();

        if stop.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(backoff).await;
        backoff = next_backoff(backoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let mut backoff = INITIAL_BACKOFF;
        for _ in 0..10 {
            backoff = next_backoff(backoff);
        }
        assert_eq!(backoff, MAX_BACKOFF);
    }
}
