//! The mirror's single WebSocket connection.
//!
//! A connection is split into a writer task fed by an unbounded channel and a
//! reader task that applies inbound frames to the shared state. Dropping the
//! [`Connection`] aborts the reader and closes the channel, which lets the
//! writer flush what is queued and send a close frame.

use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use super::{apply_frame, SessionError, SessionState};
use crate::types::SessionPhase;

pub(crate) struct Connection {
    outgoing: mpsc::UnboundedSender<String>,
    open: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl Connection {
    /// Complete the handshake, publish `joined`, then start pumping frames.
    ///
    /// `joined` is published before the reader starts so that the first
    /// roster broadcast lands on top of it rather than being overwritten.
    pub(crate) async fn open(
        url: &str,
        state: Arc<watch::Sender<SessionState>>,
        epoch: Arc<AtomicU64>,
        joined: SessionState,
    ) -> Result<Self, SessionError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let generation = epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let open = Arc::new(AtomicBool::new(true));
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<String>();

        state.send_replace(joined);

        {
            let open = open.clone();
            tokio::spawn(async move {
                while let Some(text) = outgoing_rx.recv().await {
                    tracing::debug!("Sending intent: {}", text);
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        tracing::error!("Failed to send intent: {}", e);
                        open.store(false, Ordering::Release);
                        break;
                    }
                }
                let _ = sink.close().await;
            });
        }

        let reader = {
            let open = open.clone();
            tokio::spawn(async move {
                while let Some(frame) = stream.next().await {
                    match frame {
                        Ok(Message::Text(text)) => {
                            apply_frame(&state, text.as_str());
                        }
                        Ok(Message::Close(_)) => {
                            tracing::info!("Session authority closed the connection");
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!("WebSocket error: {}", e);
                            break;
                        }
                    }
                }

                open.store(false, Ordering::Release);
                // A newer connection owns the phase now
                if epoch.load(Ordering::Acquire) == generation {
                    tracing::info!("Disconnected from session, waiting for reconnect");
                    state.send_if_modified(|s| {
                        let changed = s.phase != SessionPhase::Connecting;
                        s.phase = SessionPhase::Connecting;
                        changed
                    });
                }
            })
        };

        Ok(Self {
            outgoing,
            open,
            reader,
        })
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.outgoing.is_closed()
    }

    /// Queue a frame; false if the connection is gone
    pub(crate) fn send(&self, text: String) -> bool {
        self.is_open() && self.outgoing.send(text).is_ok()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.open.store(false, Ordering::Release);
        self.reader.abort();
    }
}
