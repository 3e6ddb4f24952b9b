use serde::{Deserialize, Serialize};

use crate::protocol::{ChatLine, InboundEvent, InboundMessage, RemotePlayer, RoundOutcome};
use crate::types::*;

/// The local viewer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LocalPlayer {
    pub id: PlayerId,
    pub name: String,
    pub is_leader: bool,
    pub role: Option<Role>,
    pub word: Option<String>,
}

/// Local belief about a server-authoritative session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub session_code: SessionCode,
    pub me: LocalPlayer,
    pub players: Vec<RemotePlayer>,
    pub messages: Vec<ChatLine>,
    /// Last tally broadcast by the authority, for display only
    pub votes: Option<serde_json::Value>,
    pub winner: Option<String>,
    pub kicked: Option<String>,
    pub role_was: Option<String>,
}

impl SessionState {
    /// State right after the connection opened
    pub fn joined(session_code: &str, id: &str, name: &str) -> Self {
        Self {
            phase: SessionPhase::Waiting,
            session_code: session_code.to_string(),
            me: LocalPlayer {
                id: id.to_string(),
                name: name.to_string(),
                ..LocalPlayer::default()
            },
            ..Self::default()
        }
    }

    /// Apply every event of one inbound message, in order
    pub fn apply_message(&mut self, message: InboundMessage) {
        for event in message.events {
            self.apply(event);
        }
    }

    pub fn apply(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::PlayerJoined(player) => {
                if player.id == self.me.id {
                    self.me.is_leader = player.is_leader;
                }
                self.players.push(player);
            }
            InboundEvent::RosterReplaced(players) => {
                self.players = players;
                self.sync_leadership();
            }
            InboundEvent::Chat(line) => self.messages.push(line),
            InboundEvent::PhaseChanged(phase) => self.phase = phase,
            InboundEvent::RoundFinished(outcome) => self.finish(outcome),
            InboundEvent::RoleAssigned {
                role,
                displayed_word,
            } => {
                self.me.role = Some(role);
                self.me.word = displayed_word;
            }
            InboundEvent::VoteUpdate(votes) => {
                tracing::debug!("Votes updated: {}", votes);
                self.votes = Some(votes);
            }
            InboundEvent::RoundReset => {
                self.phase = SessionPhase::Waiting;
                self.winner = None;
                self.kicked = None;
                self.role_was = None;
                self.votes = None;
            }
        }
    }

    fn finish(&mut self, outcome: RoundOutcome) {
        self.phase = SessionPhase::Finished;
        self.winner = outcome.winner;
        self.kicked = outcome.kicked;
        self.role_was = outcome.role_was;
        if let Some(reveal) = outcome.reveal {
            self.players = reveal;
            self.sync_leadership();
        }
    }

    /// Take the local leadership flag from our roster entry, if we have one
    fn sync_leadership(&mut self) {
        if let Some(entry) = self.players.iter().find(|p| p.id == self.me.id) {
            self.me.is_leader = entry.is_leader;
        }
    }
}
