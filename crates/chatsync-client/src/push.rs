//! WebSocket push channel.
//!
//! Frames are decoded and handed to the session one at a time, in arrival
//! order, from this single task. Every (re)connection is followed by a
//! conversation refresh so whatever was sent while the socket was down is
//! picked up from the store.

use std::time::Duration;

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message as Frame;
use tracing::{debug, info, warn};

use chatsync_shared::ServerEvent;

use crate::backend::ChatBackend;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::events::SessionListener;
use crate::session::ChatSession;

/// Exponential reconnect delay, reset after every successful connection.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// The delay to wait now; doubles the next one up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30))
    }
}

/// Keep the push channel up for as long as the caller polls this future.
pub async fn run_push_loop<B, L>(config: &ClientConfig, session: &mut ChatSession<B, L>) -> Result<()>
where
    B: ChatBackend,
    L: SessionListener,
{
    let mut backoff = Backoff::default();
    loop {
        match connect_and_drain(config, session).await {
            Ok(()) => {
                backoff.reset();
                info!(
                    unseen = session.total_unseen(),
                    online = session.online_users().count(),
                    "Push channel closed, reconnecting"
                );
            }
            Err(e) => warn!(error = %e, "Push channel failed"),
        }

        let delay = backoff.next_delay();
        debug!(delay_ms = delay.as_millis() as u64, "waiting before reconnect");
        tokio::time::sleep(delay).await;
    }
}

/// One connection: connect, then feed pushed events into `session` until
/// the socket closes. The conversation list is refreshed once the first
/// event arrives.
pub async fn connect_and_drain<B, L>(
    config: &ClientConfig,
    session: &mut ChatSession<B, L>,
) -> Result<()>
where
    B: ChatBackend,
    L: SessionListener,
{
    let (mut ws, _) = tokio_tungstenite::connect_async(config.ws_url()).await?;
    info!(url = %config.base_url, "Push channel connected");

    // The server queues the online set as soon as the connection is
    // registered, ahead of any message push. Refreshing after it arrives
    // covers everything sent while this client had no registered channel.
    let mut reconciled = false;

    while let Some(frame) = ws.next().await {
        let frame = frame?;
        if frame.is_close() {
            break;
        }
        let Some(event) = decode_frame(&frame) else {
            continue;
        };

        let name = event.name();
        if let Err(e) = session.handle_event(event).await {
            warn!(event = name, error = %e, "Failed to reconcile pushed event");
        }

        if !reconciled {
            session.refresh_conversations().await?;
            reconciled = true;
        }
    }

    Ok(())
}

/// Decode a text frame into an event. Control and binary frames, and text
/// that is not a known event, yield `None`.
fn decode_frame(frame: &Frame) -> Option<ServerEvent> {
    if !frame.is_text() {
        return None;
    }
    let text = frame.to_text().ok()?;
    match ServerEvent::from_json(text) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(error = %e, "Ignoring undecodable frame");
            None
        }
    }
}
