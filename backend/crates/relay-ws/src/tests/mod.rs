mod dispatch_loop;

use crate::{ConnectionHandle, ConnectionLimits, ConnectionRegistry};

use std::time::Duration;

use axum::extract::ws::Message;
use tokio::sync::mpsc;

pub(crate) const WRITE_TIMEOUT: Duration = Duration::from_millis(50);

pub(crate) fn registry() -> ConnectionRegistry {
    ConnectionRegistry::new(ConnectionLimits::default(), WRITE_TIMEOUT)
}

/// A handle plus the receiving end a socket task would normally drain
pub(crate) fn open_handle(capacity: usize) -> (ConnectionHandle, mpsc::Receiver<Message>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ConnectionHandle::new(tx), rx)
}

/// Collect every text frame currently buffered
pub(crate) fn drain_texts(rx: &mut mpsc::Receiver<Message>) -> Vec<String> {
    let mut texts = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Message::Text(text) = message {
            texts.push(text.to_string());
        }
    }
    texts
}
