//! Mirror of a session owned by a remote authority.
//!
//! The mirror never validates game rules. It decodes what the authority sends,
//! merges it into [`SessionState`] and publishes the result to subscribers.
//! Outbound intents are fire-and-forget: if the connection is not open they
//! are dropped, not queued. Reconnecting after a loss is up to the caller.

mod connection;
mod state;

pub use state::{LocalPlayer, SessionState};

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::protocol::{InboundMessage, Intent};
use crate::types::SessionPhase;
use connection::Connection;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid session URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    Connect(String),
}

/// Where the session authority lives
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base WebSocket URL, e.g. `ws://localhost:8080` or `wss://game.example`
    pub base_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: "ws://localhost:8080".to_string(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let base_url = std::env::var("IMPOSTOR_SESSION_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::default().base_url);
        Self { base_url }
    }

    /// `{base}/ws/{code}?playerId=..&playerName=..`
    pub fn session_url(
        &self,
        session_code: &str,
        player_id: &str,
        display_name: &str,
    ) -> Result<String, SessionError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SessionError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(SessionError::InvalidUrl(format!(
                "{}: scheme must be ws or wss",
                self.base_url
            )));
        }
        url.path_segments_mut()
            .map_err(|_| SessionError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("ws")
            .push(session_code);
        url.query_pairs_mut()
            .append_pair("playerId", player_id)
            .append_pair("playerName", display_name);
        Ok(url.to_string())
    }
}

/// Decode one text frame and merge it. Returns whether the state changed.
pub(crate) fn apply_frame(state: &watch::Sender<SessionState>, text: &str) -> bool {
    tracing::debug!("Received message: {}", text);
    let message = match InboundMessage::decode(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Dropping inbound message: {}", e);
            return false;
        }
    };
    if message.is_empty() {
        return false;
    }

    state.send_if_modified(|current| {
        let before = current.clone();
        current.apply_message(message);
        *current != before
    })
}

pub struct SessionMirror {
    config: SessionConfig,
    state: Arc<watch::Sender<SessionState>>,
    /// Bumped on every connect and disconnect so a stale reader cannot
    /// touch the phase
    epoch: Arc<AtomicU64>,
    connection: Option<Connection>,
}

impl SessionMirror {
    pub fn new(config: SessionConfig) -> Self {
        let (state, _rx) = watch::channel(SessionState::default());
        Self {
            config,
            state: Arc::new(state),
            epoch: Arc::new(AtomicU64::new(0)),
            connection: None,
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_open)
    }

    /// Join a session under a freshly generated player id.
    ///
    /// Any previous connection is closed first. On success the phase is
    /// `WAITING`; on failure the mirror stays `CONNECTING` and the error is
    /// returned so the caller can decide when to retry.
    pub async fn connect(
        &mut self,
        session_code: &str,
        display_name: &str,
    ) -> Result<(), SessionError> {
        self.close();

        let player_id = ulid::Ulid::new().to_string().to_lowercase();
        let url = self
            .config
            .session_url(session_code, &player_id, display_name)?;
        tracing::info!(
            "Connecting to session {} as {} ({})",
            session_code,
            display_name,
            player_id
        );

        let joined = SessionState::joined(session_code, &player_id, display_name);
        let connection =
            Connection::open(&url, self.state.clone(), self.epoch.clone(), joined).await?;
        self.connection = Some(connection);

        tracing::info!("Connected to session {}", session_code);
        Ok(())
    }

    /// Close the connection and forget the session
    pub fn disconnect(&mut self) {
        self.close();
        self.state.send_replace(SessionState::default());
    }

    /// Drop the owned connection. The old reader is aborted before it can
    /// report the loss, so the phase is set here.
    fn close(&mut self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if self.connection.take().is_some() {
            tracing::info!("Closed session connection");
            self.state.send_if_modified(|s| {
                let changed = s.phase != SessionPhase::Connecting;
                s.phase = SessionPhase::Connecting;
                changed
            });
        }
    }

    /// Forward `{action, ...payload}` to the authority.
    ///
    /// Returns false when the intent was dropped: the connection is not open
    /// or the payload is not a JSON object.
    pub fn send_intent(&self, action: &str, payload: Option<Value>) -> bool {
        match Intent::new(action, payload) {
            Ok(intent) => self.send(&intent),
            Err(e) => {
                tracing::warn!("Dropping {} intent: {}", action, e);
                false
            }
        }
    }

    pub fn send(&self, intent: &Intent) -> bool {
        match &self.connection {
            Some(connection) if connection.send(intent.to_json()) => true,
            _ => {
                tracing::debug!("Not connected, dropping {} intent", intent.action);
                false
            }
        }
    }

    /// Merge a raw inbound frame as if it had arrived on the connection
    pub fn handle_text(&self, text: &str) -> bool {
        apply_frame(&self.state, text)
    }
}

impl Default for SessionMirror {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    fn test_session_url() {
        let config = SessionConfig {
            base_url: "ws://localhost:8080".to_string(),
        };
        let url = config.session_url("abc-123", "p1", "Ana María").unwrap();
        assert_eq!(
            url,
            "ws://localhost:8080/ws/abc-123?playerId=p1&playerName=Ana+Mar%C3%ADa"
        );

        let config = SessionConfig {
            base_url: "ws://host/game/".to_string(),
        };
        let url = config.session_url("x", "p", "n").unwrap();
        assert!(url.starts_with("ws://host/game/ws/x?"));

        let config = SessionConfig {
            base_url: "wss://game.example".to_string(),
        };
        let url = config.session_url("x", "p", "n").unwrap();
        assert_eq!(url, "wss://game.example/ws/x?playerId=p&playerName=n");

        for base_url in ["not a url", "http://localhost:8080"] {
            let config = SessionConfig {
                base_url: base_url.to_string(),
            };
            assert!(matches!(
                config.session_url("x", "p", "n"),
                Err(SessionError::InvalidUrl(_))
            ));
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("IMPOSTOR_SESSION_URL", "  wss://play.example  ");
        assert_eq!(SessionConfig::from_env().base_url, "wss://play.example");

        std::env::set_var("IMPOSTOR_SESSION_URL", "   ");
        assert_eq!(SessionConfig::from_env().base_url, "ws://localhost:8080");

        std::env::remove_var("IMPOSTOR_SESSION_URL");
        assert_eq!(SessionConfig::from_env().base_url, "ws://localhost:8080");
    }

    #[test]
    fn test_new_mirror_is_connecting() {
        let mirror = SessionMirror::default();
        assert_eq!(mirror.snapshot().phase, SessionPhase::Connecting);
        assert!(!mirror.is_connected());
    }

    #[test]
    fn test_intent_dropped_when_not_connected() {
        let mirror = SessionMirror::default();
        assert!(!mirror.send_intent("CHAT_MESSAGE", Some(json!({"message": "hi"}))));
        assert!(!mirror.send(&Intent::reset_game()));
    }

    #[test]
    fn test_unparsable_message_leaves_state_unchanged() {
        let mirror = SessionMirror::default();
        mirror.handle_text(r#"{"type":"PLAYER_JOINED","player":{"id":"a","is_leader":true}}"#);
        let before = mirror.snapshot();
        let mut rx = mirror.subscribe();

        assert!(!mirror.handle_text("{\"status\": "));
        assert!(!mirror.handle_text(r#"{"status":"PLAYING","role":"WIZARD"}"#));
        assert!(!mirror.handle_text(r#"{"type":"CHAT_MESSAGE"}"#));

        assert_eq!(mirror.snapshot(), before);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_handle_text_publishes() {
        let mirror = SessionMirror::default();
        let mut rx = mirror.subscribe();
        assert!(mirror.handle_text(r#"{"type":"CHAT_MESSAGE","from":"a","text":"b"}"#));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().messages.len(), 1);
    }

    #[test]
    fn test_disconnect_resets_state() {
        let mut mirror = SessionMirror::default();
        mirror.handle_text(r#"{"status":"VOTING"}"#);
        assert_eq!(mirror.snapshot().phase, SessionPhase::Voting);

        mirror.disconnect();
        assert_eq!(mirror.snapshot(), SessionState::default());
    }

    #[tokio::test]
    async fn test_connect_failure_stays_connecting() {
        let mut mirror = SessionMirror::new(SessionConfig {
            base_url: "ws://127.0.0.1:9".to_string(),
        });
        let result = mirror.connect("room", "Ana").await;
        assert!(matches!(result, Err(SessionError::Connect(_))));
        assert_eq!(mirror.snapshot().phase, SessionPhase::Connecting);
        assert!(!mirror.is_connected());
    }
}
