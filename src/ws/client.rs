//! WebSocket client with automatic reconnection

use super::types::{WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Read-only WebSocket client with reconnection and ping/pong keepalive
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect in a background task and return the message receiver.
    ///
    /// The task reconnects with exponential backoff until `shutdown` flips to
    /// true, the receiver is dropped, or the attempt limit is reached. The
    /// attempt counter resets after every successful handshake.
    pub fn connect(&self, shutdown: watch::Receiver<bool>) -> mpsc::Receiver<WsMessage> {
        let (tx, rx) = mpsc::channel(1024);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::run_connection_loop(config, tx, shutdown).await {
                tracing::error!(error = %e, "WebSocket connection loop failed");
            }
        });

        rx
    }

    async fn run_connection_loop(
        config: WsConfig,
        tx: mpsc::Sender<WsMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), WsError> {
        let mut attempts = 0;
        let mut delay = config.backoff.initial;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let err = match Self::connect_and_stream(&config, &tx, &mut shutdown).await {
                Ok(()) => break,
                Err(e) => e,
            };

            if matches!(err, WsError::StreamFailed(_)) {
                // The handshake succeeded, so start the backoff over
                attempts = 0;
                delay = config.backoff.initial;
            }
            attempts += 1;
            tracing::warn!(error = %err, attempt = attempts, "WebSocket error, reconnecting");

            if config.backoff.exhausted(attempts) {
                tracing::error!(attempts, "Max reconnection attempts reached");
                let _ = tx.send(WsMessage::Disconnected).await;
                return Err(WsError::MaxReconnectsExceeded);
            }
            if tx.send(WsMessage::Reconnecting { attempt: attempts }).await.is_err() {
                return Ok(());
            }

            tokio::select! {
                _ = sleep(delay) => {}
                res = shutdown.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
            }
            delay = config.backoff.next(delay);
        }

        let _ = tx.send(WsMessage::Disconnected).await;
        Ok(())
    }

    /// Stream one connection. `Ok` means the consumer is gone or shutdown
    /// was requested; every other end is an error to reconnect from.
    async fn connect_and_stream(
        config: &WsConfig,
        tx: &mpsc::Sender<WsMessage>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), WsError> {
        tracing::info!(url = %config.url, "Connecting to WebSocket");

        let (ws_stream, _response) = connect_async(&config.url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        if tx.send(WsMessage::Connected).await.is_err() {
            return Ok(());
        }

        let mut ping_interval = tokio::time::interval(config.keepalive.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut ping_sent: Option<Instant> = None;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            ping_sent = None;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            return Err(WsError::StreamFailed(format!("closed by server: {:?}", frame)));
                        }
                        Some(Err(e)) => {
                            return Err(WsError::StreamFailed(e.to_string()));
                        }
                        None => {
                            return Err(WsError::StreamFailed("stream ended".into()));
                        }
                        _ => {}
                    }
                }

                _ = ping_interval.tick() => {
                    if let Some(sent) = ping_sent {
                        if sent.elapsed() >= config.keepalive.pong_timeout {
                            return Err(WsError::StreamFailed("pong timeout".into()));
                        }
                        continue;
                    }
                    write.send(Message::Ping(Vec::new())).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    ping_sent = Some(Instant::now());
                }

                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(());
                    }
                }
            }
        }
    }
}
