//! The offline game snapshot and its persisted envelope.

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Schema version of the persisted envelope
/// Version 1: initial format
/// Version 2: added `winner`
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfflineConfig {
    pub player_count: usize,
    pub category: String,
    pub difficulty: Difficulty,
    pub lang: String,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            player_count: MIN_PLAYERS,
            category: "General".to_string(),
            difficulty: Difficulty::Normal,
            lang: "en".to_string(),
        }
    }
}

/// Partial config update; `None` fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    pub player_count: Option<usize>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub lang: Option<String>,
}

impl OfflineConfig {
    pub fn apply(&mut self, patch: ConfigPatch) {
        if let Some(player_count) = patch.player_count {
            self.player_count = player_count;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(difficulty) = patch.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(lang) = patch.lang {
            self.lang = lang;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfflinePlayer {
    /// 1-based seat number
    pub id: u32,
    pub role: Role,
    /// Real word, trap word, or [`IMPOSTOR_MARKER`]
    pub word: String,
    /// Presentation only
    pub is_revealed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfflineGameState {
    pub status: OfflinePhase,
    pub config: OfflineConfig,
    pub players: Vec<OfflinePlayer>,
    pub current_player_index: usize,
    pub word_pair: WordPair,
    pub impostor_index: Option<usize>,
    pub starting_player_id: Option<u32>,
    #[serde(default)]
    pub winner: Option<Role>,
}

impl Default for OfflineGameState {
    fn default() -> Self {
        Self {
            status: OfflinePhase::Idle,
            config: OfflineConfig::default(),
            players: Vec::new(),
            current_player_index: 0,
            word_pair: WordPair::default(),
            impostor_index: None,
            starting_player_id: None,
            winner: None,
        }
    }
}

impl OfflineGameState {
    /// Player whose turn it is to look at the device
    pub fn current_player(&self) -> Option<&OfflinePlayer> {
        self.players.get(self.current_player_index)
    }

    pub fn impostor(&self) -> Option<&OfflinePlayer> {
        self.impostor_index.and_then(|i| self.players.get(i))
    }

    /// Check the roster invariants of a restored snapshot
    pub fn validate(&self) -> Result<(), String> {
        if self.players.is_empty() {
            if self.impostor_index.is_some() {
                return Err("impostor index set without a roster".to_string());
            }
            return Ok(());
        }

        if self.current_player_index >= self.players.len() {
            return Err(format!(
                "turn cursor {} outside roster of {}",
                self.current_player_index,
                self.players.len()
            ));
        }

        let impostors: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.role == Role::Impostor)
            .map(|(i, _)| i)
            .collect();
        if impostors.len() != 1 {
            return Err(format!("roster has {} impostors", impostors.len()));
        }
        if self.impostor_index != Some(impostors[0]) {
            return Err("impostor index does not match roster".to_string());
        }

        if let Some(id) = self.starting_player_id {
            if !self.players.iter().any(|p| p.id == id) {
                return Err(format!("starting player {} outside roster", id));
            }
        }

        Ok(())
    }
}

/// What gets written to durable storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub schema_version: u32,
    /// Save timestamp (ISO8601)
    pub saved_at: String,
    pub state: OfflineGameState,
}

impl PersistedSnapshot {
    pub fn new(state: OfflineGameState) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            state,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode and validate a stored blob
    pub fn decode(raw: &str) -> Result<Self, String> {
        let snapshot: Self = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        if snapshot.schema_version > SNAPSHOT_SCHEMA_VERSION {
            return Err(format!(
                "snapshot schema version {} is newer than supported version {}",
                snapshot.schema_version, SNAPSHOT_SCHEMA_VERSION
            ));
        }
        snapshot.state.validate()?;
        Ok(snapshot)
    }
}

/// How the engine obtained its starting state
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    /// Nothing was stored
    Fresh,
    /// A stored snapshot was loaded
    Resumed,
    /// Something was stored but unusable; the engine started from scratch
    Recovered { reason: String },
}

impl RestoreOutcome {
    pub fn is_recovered(&self) -> bool {
        matches!(self, RestoreOutcome::Recovered { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dealt_state() -> OfflineGameState {
        OfflineGameState {
            status: OfflinePhase::Passing,
            players: vec![
                OfflinePlayer {
                    id: 1,
                    role: Role::Civilian,
                    word: "Cat".to_string(),
                    is_revealed: false,
                },
                OfflinePlayer {
                    id: 2,
                    role: Role::Impostor,
                    word: IMPOSTOR_MARKER.to_string(),
                    is_revealed: false,
                },
                OfflinePlayer {
                    id: 3,
                    role: Role::Civilian,
                    word: "Cat".to_string(),
                    is_revealed: false,
                },
            ],
            word_pair: WordPair::new("Cat", "Dog"),
            impostor_index: Some(1),
            starting_player_id: Some(3),
            ..OfflineGameState::default()
        }
    }

    #[test]
    fn test_snapshot_uses_camel_case_keys() {
        let json = serde_json::to_value(dealt_state()).unwrap();
        assert_eq!(json["status"], "PASSING");
        assert_eq!(json["currentPlayerIndex"], 0);
        assert_eq!(json["config"]["playerCount"], 3);
        assert_eq!(json["players"][1]["isRevealed"], false);
    }

    #[test]
    fn test_decode_accepts_valid_snapshot() {
        let raw = PersistedSnapshot::new(dealt_state()).encode().unwrap();
        let decoded = PersistedSnapshot::decode(&raw).unwrap();
        assert_eq!(decoded.state, dealt_state());
    }

    #[test]
    fn test_decode_accepts_snapshot_without_winner() {
        let mut json = serde_json::to_value(PersistedSnapshot::new(dealt_state())).unwrap();
        json["schema_version"] = serde_json::json!(1);
        json["state"].as_object_mut().unwrap().remove("winner");
        let decoded = PersistedSnapshot::decode(&json.to_string()).unwrap();
        assert_eq!(decoded.state.winner, None);
    }

    #[test]
    fn test_decode_rejects_future_schema() {
        let mut snapshot = PersistedSnapshot::new(dealt_state());
        snapshot.schema_version = SNAPSHOT_SCHEMA_VERSION + 1;
        let err = PersistedSnapshot::decode(&snapshot.encode().unwrap()).unwrap_err();
        assert!(err.contains("newer than supported"));
    }

    #[test]
    fn test_validate_rejects_broken_rosters() {
        let mut state = dealt_state();
        state.current_player_index = 3;
        assert!(state.validate().unwrap_err().contains("turn cursor"));

        let mut state = dealt_state();
        state.players[0].role = Role::Impostor;
        assert!(state.validate().unwrap_err().contains("2 impostors"));

        let mut state = dealt_state();
        state.impostor_index = Some(0);
        assert!(state.validate().is_err());

        let mut state = dealt_state();
        state.starting_player_id = Some(0);
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_config_patch_merges() {
        let mut config = OfflineConfig::default();
        config.apply(ConfigPatch {
            player_count: Some(6),
            difficulty: Some(Difficulty::Easy),
            ..ConfigPatch::default()
        });
        assert_eq!(config.player_count, 6);
        assert_eq!(config.difficulty, Difficulty::Easy);
        assert_eq!(config.category, "General");
        assert_eq!(config.lang, "en");
    }
}
