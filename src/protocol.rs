//! Wire shapes exchanged with the session authority.
//!
//! Inbound frames are not a closed tagged union: the authority tags some
//! messages with `type` and signals others only through well-known fields
//! (`status`, `role`, `players`, ...). One frame may carry several of these at
//! once, e.g. `{"status":"PLAYING","role":"IMPOSTOR","displayed_word":"..."}`.
//! [`InboundMessage::decode`] therefore parses a frame once and yields every
//! [`InboundEvent`] it contains, in a fixed order:
//!
//! 1. `PLAYER_JOINED`
//! 2. roster replacement (`players` field, with or without `PLAYER_LIST`)
//! 3. `CHAT_MESSAGE`
//! 4. `status` (phase change, round finish, or reset)
//! 5. `role` / `displayed_word`
//! 6. `VOTE_UPDATE`
//! 7. `GAME_RESET`
//!
//! A frame that is not a JSON object, or whose known fields have the wrong
//! shape, is rejected as a whole.

use crate::types::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid message format: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{kind} message is missing `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("Outbound payload must be a JSON object")]
    PayloadNotObject,
}

/// A roster entry as broadcast by the authority
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemotePlayer {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_leader: bool,
    /// Only present once roles are revealed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatLine {
    pub from: String,
    pub text: String,
}

/// What the authority reports when a round ends
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RoundOutcome {
    pub winner: Option<String>,
    pub kicked: Option<String>,
    pub role_was: Option<String>,
    /// Full roster with every role visible
    pub reveal: Option<Vec<RemotePlayer>>,
}

/// One state slice update carried by an inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    PlayerJoined(RemotePlayer),
    RosterReplaced(Vec<RemotePlayer>),
    Chat(ChatLine),
    PhaseChanged(SessionPhase),
    RoundFinished(RoundOutcome),
    RoleAssigned {
        role: Role,
        displayed_word: Option<String>,
    },
    VoteUpdate(Value),
    RoundReset,
}

/// Every field the authority is known to send, all optional
#[derive(Debug, Default, Deserialize)]
struct RawInbound {
    #[serde(rename = "type")]
    kind: Option<String>,
    player: Option<RemotePlayer>,
    players: Option<Vec<RemotePlayer>>,
    from: Option<String>,
    text: Option<String>,
    votes: Option<Value>,
    status: Option<SessionPhase>,
    winner: Option<String>,
    kicked: Option<String>,
    role_was: Option<String>,
    reveal: Option<Vec<RemotePlayer>>,
    role: Option<Role>,
    displayed_word: Option<String>,
}

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InboundMessage {
    pub events: Vec<InboundEvent>,
}

impl InboundMessage {
    /// Decode a raw text frame into all the events it carries
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawInbound = serde_json::from_str(text)?;
        let kind = raw.kind.as_deref();
        let mut events = Vec::new();

        if kind == Some("PLAYER_JOINED") {
            let player = raw.player.ok_or(ProtocolError::MissingField {
                kind: "PLAYER_JOINED",
                field: "player",
            })?;
            events.push(InboundEvent::PlayerJoined(player));
        }

        match raw.players {
            Some(players) => events.push(InboundEvent::RosterReplaced(players)),
            None if kind == Some("PLAYER_LIST") => {
                return Err(ProtocolError::MissingField {
                    kind: "PLAYER_LIST",
                    field: "players",
                })
            }
            None => {}
        }

        if kind == Some("CHAT_MESSAGE") {
            let text = raw.text.ok_or(ProtocolError::MissingField {
                kind: "CHAT_MESSAGE",
                field: "text",
            })?;
            events.push(InboundEvent::Chat(ChatLine {
                from: raw.from.unwrap_or_default(),
                text,
            }));
        }

        match raw.status {
            Some(SessionPhase::Finished) => {
                events.push(InboundEvent::RoundFinished(RoundOutcome {
                    winner: raw.winner,
                    kicked: raw.kicked,
                    role_was: raw.role_was,
                    reveal: raw.reveal,
                }));
            }
            // An untyped WAITING status is the authority's reset signal
            Some(SessionPhase::Waiting) if kind.is_none() => events.push(InboundEvent::RoundReset),
            Some(phase) => events.push(InboundEvent::PhaseChanged(phase)),
            None => {}
        }

        if let Some(role) = raw.role {
            events.push(InboundEvent::RoleAssigned {
                role,
                displayed_word: raw.displayed_word,
            });
        }

        if kind == Some("VOTE_UPDATE") {
            events.push(InboundEvent::VoteUpdate(raw.votes.unwrap_or(Value::Null)));
        }

        if kind == Some("GAME_RESET") {
            events.push(InboundEvent::RoundReset);
        }

        Ok(Self { events })
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Outbound envelope: `{"action": ..., ...payload}`
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub payload: Map<String, Value>,
}

impl Intent {
    /// Build an intent from an action name and an optional JSON object payload
    pub fn new(action: impl Into<String>, payload: Option<Value>) -> Result<Self, ProtocolError> {
        let payload = match payload {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(ProtocolError::PayloadNotObject),
        };
        Ok(Self {
            action: action.into(),
            payload,
        })
    }

    fn with_fields(action: &str, fields: Vec<(&str, Value)>) -> Self {
        Self {
            action: action.to_string(),
            payload: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// Leader asks the authority to deal a new round
    pub fn start_game(difficulty: Difficulty, category: &str, language: &str) -> Self {
        Self::with_fields(
            "START_GAME",
            vec![
                ("mode", Value::from(difficulty.as_mode())),
                ("category", Value::from(category)),
                ("language", Value::from(language)),
            ],
        )
    }

    pub fn chat(message: &str) -> Self {
        Self::with_fields("CHAT_MESSAGE", vec![("message", Value::from(message))])
    }

    pub fn cast_vote(target_id: &str) -> Self {
        Self::with_fields("CAST_VOTE", vec![("target_id", Value::from(target_id))])
    }

    pub fn reset_game() -> Self {
        Self::with_fields("RESET_GAME", Vec::new())
    }

    /// Serialize to the flat envelope. The `action` key always wins over a
    /// payload field of the same name.
    pub fn to_json(&self) -> String {
        let mut envelope = self.payload.clone();
        envelope.insert("action".to_string(), Value::from(self.action.clone()));
        Value::Object(envelope).to_string()
    }
}
