//! WebSocket listener for real-time backend updates.
//!
//! Each text frame is parsed as JSON and handed to the router; the router
//! owns classification, so this module stays a dumb pipe. Connection state
//! changes are synthesized as `connection_status` payloads through the same
//! router, letting screens subscribe to transport health like any other
//! event kind.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;
use log::{debug, info, warn};
use serde_json::{Value, json};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::routing::NotificationRouter;

const RECONNECT_BASE: Duration = Duration::from_secs(3);
const RECONNECT_FACTOR: f64 = 1.5;
const MAX_RECONNECT_ATTEMPTS: u32 = 5;

pub struct WsTransport {
    router: Arc<NotificationRouter>,
    ws_url: String,
    disconnected: Arc<AtomicBool>,
}

impl WsTransport {
    pub fn new(router: Arc<NotificationRouter>, ws_url: String) -> Self {
        Self { router, ws_url, disconnected: Arc::new(AtomicBool::new(false)) }
    }

    /// Handle that stops the read loop and suppresses reconnection.
    pub fn disconnect_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.disconnected)
    }

    /// Connect and pump frames into the router until explicitly disconnected
    /// or the reconnect budget is spent. The auth token rides as a query
    /// parameter, matching the backend's channel auth.
    pub async fn run(&self, token: &str) {
        let url = format!("{}?token={}", self.ws_url, token);
        let mut attempts: u32 = 0;

        loop {
            if self.disconnected.load(Ordering::SeqCst) {
                return;
            }

            match connect_async(url.as_str()).await {
                Ok((mut ws, _)) => {
                    info!("websocket connected to {}", self.ws_url);
                    attempts = 0;
                    self.emit_status("connected", None);

                    while let Some(frame) = ws.next().await {
                        if self.disconnected.load(Ordering::SeqCst) {
                            let _ = ws.close(None).await;
                            self.emit_status("disconnected", None);
                            return;
                        }
                        match frame {
                            Ok(Message::Text(text)) => match serde_json::from_str::<Value>(&text) {
                                Ok(payload) => self.router.handle_inbound_payload(&payload),
                                Err(err) => warn!("discarding unparseable frame: {err}"),
                            },
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {}
                            Err(err) => {
                                warn!("websocket read error: {err}");
                                self.emit_status("error", Some(err.to_string()));
                                break;
                            }
                        }
                    }
                    self.emit_status("disconnected", None);
                }
                Err(err) => {
                    warn!("websocket connect failed: {err}");
                    self.emit_status("error", Some(err.to_string()));
                }
            }

            if self.disconnected.load(Ordering::SeqCst) {
                return;
            }
            if attempts >= MAX_RECONNECT_ATTEMPTS {
                warn!("max websocket reconnection attempts reached");
                return;
            }
            let backoff = reconnect_delay(attempts);
            attempts += 1;
            debug!("reconnecting in {:?} (attempt {attempts})", backoff);
            tokio::time::sleep(backoff).await;
        }
    }

    fn emit_status(&self, status: &str, error: Option<String>) {
        let mut payload = json!({
            "type": "connection_status",
            "status": status,
            "at": chrono::Utc::now().to_rfc3339(),
        });
        if let Some(error) = error {
            payload["error"] = json!(error);
        }
        self.router.handle_inbound_payload(&payload);
    }
}

fn reconnect_delay(attempt: u32) -> Duration {
    RECONNECT_BASE.mul_f64(RECONNECT_FACTOR.powi(attempt as i32))
}
