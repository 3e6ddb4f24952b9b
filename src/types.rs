use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type SessionCode = String;

/// Word shown to the impostor under normal difficulty instead of a word.
pub const IMPOSTOR_MARKER: &str = "IMPOSTOR";

/// Smallest roster that can play a round.
pub const MIN_PLAYERS: usize = 3;

/// Largest roster the offline engine deals for.
pub const MAX_PLAYERS: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Civilian,
    Impostor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    /// The impostor only learns that they are the impostor
    #[default]
    Normal,
    /// The impostor gets the trap word as a hint
    Easy,
}

impl Difficulty {
    /// Mode name the session authority expects in `START_GAME`
    pub fn as_mode(&self) -> &'static str {
        match self {
            Difficulty::Normal => "hard",
            Difficulty::Easy => "easy",
        }
    }
}

/// Phase of a server-authoritative session as seen by the mirror
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    #[default]
    Connecting,
    Waiting,
    Playing,
    Voting,
    Finished,
}

/// Phase of a local pass-and-play game
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfflinePhase {
    #[default]
    Idle,
    Setup,
    /// Device is handed from player to player, each peeks at their card
    Passing,
    Playing,
    Finished,
}

/// A real word and the decoy handed to the impostor in easy mode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WordPair {
    pub real: String,
    pub trap: String,
}

impl WordPair {
    pub fn new(real: impl Into<String>, trap: impl Into<String>) -> Self {
        Self {
            real: real.into(),
            trap: trap.into(),
        }
    }

    /// Reject pairs that would leak the real word to the impostor or make a
    /// civilian's card look like the impostor's
    pub fn check(&self) -> Result<(), String> {
        let real = self.real.trim();
        let trap = self.trap.trim();
        if real.is_empty() || trap.is_empty() {
            return Err("word pair is missing a word".to_string());
        }
        if real.eq_ignore_ascii_case(trap) {
            return Err(format!("real and trap word are both {:?}", real));
        }
        if real.eq_ignore_ascii_case(IMPOSTOR_MARKER) || trap.eq_ignore_ascii_case(IMPOSTOR_MARKER)
        {
            return Err(format!("{:?} is reserved", IMPOSTOR_MARKER));
        }
        Ok(())
    }

    /// Word displayed to a player with the given role
    pub fn word_for(&self, role: Role, difficulty: Difficulty) -> String {
        match (role, difficulty) {
            (Role::Civilian, _) => self.real.clone(),
            (Role::Impostor, Difficulty::Easy) => self.trap.clone(),
            (Role::Impostor, Difficulty::Normal) => IMPOSTOR_MARKER.to_string(),
        }
    }
}
