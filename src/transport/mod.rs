//! Transports that feed raw payloads into the notification router.

pub mod websocket;

pub use websocket::WsTransport;
