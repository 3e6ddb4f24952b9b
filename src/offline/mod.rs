//! Local pass-and-play engine.
//!
//! The engine owns the whole game: it deals roles, moves the device from seat
//! to seat and records the outcome. Every mutation is written to durable
//! storage before it becomes visible, so a reload resumes the exact snapshot.
//! A failed write leaves both the stored and the in-memory state unchanged.

mod deal;
mod snapshot;

pub use deal::{deal, Deal};
pub use snapshot::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::store::{DurableStore, StoreError};
use crate::types::*;
use crate::words::{WordError, WordSupply};

pub type OfflineResult<T> = Result<T, OfflineError>;

#[derive(Debug, thiserror::Error)]
pub enum OfflineError {
    #[error("Could not fetch words: {0}")]
    WordSupply(#[from] WordError),

    #[error("Could not persist game: {0}")]
    Persist(#[from] StoreError),

    #[error("Could not encode game snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("A game is already being started")]
    StartInProgress,

    #[error("Not enough players: {count} (minimum {min})")]
    NotEnoughPlayers { count: usize, min: usize },

    #[error("Too many players: {count} (maximum {max})")]
    TooManyPlayers { count: usize, max: usize },

    #[error("{op} is not allowed while {phase:?}")]
    InvalidPhase {
        op: &'static str,
        phase: OfflinePhase,
    },

    #[error("No player with id {0}")]
    UnknownPlayer(u32),
}

/// Storage settings for the offline engine
#[derive(Debug, Clone)]
pub struct OfflineSettings {
    /// Key the snapshot is stored under
    pub storage_key: String,
    /// How long an untouched snapshot survives
    pub snapshot_ttl: Option<Duration>,
}

impl Default for OfflineSettings {
    fn default() -> Self {
        Self {
            storage_key: "impostor_offline_game".to_string(),
            snapshot_ttl: Some(Duration::from_secs(30 * 24 * 60 * 60)),
        }
    }
}

impl OfflineSettings {
    /// Load settings from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let storage_key = std::env::var("IMPOSTOR_OFFLINE_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.storage_key);

        // 0 disables expiry
        let snapshot_ttl = match std::env::var("IMPOSTOR_OFFLINE_TTL_DAYS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            Some(0) => None,
            Some(days) => Some(Duration::from_secs(days * 24 * 60 * 60)),
            None => defaults.snapshot_ttl,
        };

        Self {
            storage_key,
            snapshot_ttl,
        }
    }
}

/// Clears the in-flight flag when `start_game` returns or is dropped
struct StartGuard<'a>(&'a AtomicBool);

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct OfflineEngine {
    store: Arc<dyn DurableStore>,
    supply: Arc<dyn WordSupply>,
    settings: OfflineSettings,
    state: watch::Sender<OfflineGameState>,
    starting: AtomicBool,
    restore: RestoreOutcome,
}

impl OfflineEngine {
    /// Create an engine, resuming from storage when a usable snapshot exists
    pub fn open(
        store: Arc<dyn DurableStore>,
        supply: Arc<dyn WordSupply>,
        settings: OfflineSettings,
    ) -> Self {
        let (initial, restore) = match store.get(&settings.storage_key) {
            Ok(None) => (OfflineGameState::default(), RestoreOutcome::Fresh),
            Ok(Some(raw)) => match PersistedSnapshot::decode(&raw) {
                Ok(snapshot) => {
                    tracing::info!(
                        "Resumed offline game saved at {} in phase {:?}",
                        snapshot.saved_at,
                        snapshot.state.status
                    );
                    (snapshot.state, RestoreOutcome::Resumed)
                }
                Err(reason) => {
                    tracing::warn!("Discarding unreadable offline snapshot: {}", reason);
                    (
                        OfflineGameState::default(),
                        RestoreOutcome::Recovered { reason },
                    )
                }
            },
            Err(e) => {
                tracing::error!("Failed to read offline snapshot: {}", e);
                (
                    OfflineGameState::default(),
                    RestoreOutcome::Recovered {
                        reason: e.to_string(),
                    },
                )
            }
        };

        let (state, _rx) = watch::channel(initial);
        Self {
            store,
            supply,
            settings,
            state,
            starting: AtomicBool::new(false),
            restore,
        }
    }

    /// How the starting state was obtained
    pub fn restore_outcome(&self) -> &RestoreOutcome {
        &self.restore
    }

    /// Current snapshot
    pub fn snapshot(&self) -> OfflineGameState {
        self.state.borrow().clone()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<OfflineGameState> {
        self.state.subscribe()
    }

    pub fn is_starting(&self) -> bool {
        self.starting.load(Ordering::Acquire)
    }

    /// Fetch words, deal roles and hand the device to the first seat.
    ///
    /// Nothing changes until the word pair has arrived. A second call while
    /// one is pending fails with [`OfflineError::StartInProgress`].
    pub async fn start_game(&self, config: OfflineConfig) -> OfflineResult<()> {
        if config.player_count < MIN_PLAYERS {
            return Err(OfflineError::NotEnoughPlayers {
                count: config.player_count,
                min: MIN_PLAYERS,
            });
        }
        if config.player_count > MAX_PLAYERS {
            return Err(OfflineError::TooManyPlayers {
                count: config.player_count,
                max: MAX_PLAYERS,
            });
        }

        if self
            .starting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Ignoring start request, a game is already being started");
            return Err(OfflineError::StartInProgress);
        }
        let _guard = StartGuard(&self.starting);

        tracing::info!(
            "Starting offline game: {} players, category {} ({}), {:?}",
            config.player_count,
            config.category,
            config.lang,
            config.difficulty
        );

        let pair = self
            .supply
            .fetch_pair(&config.category, &config.lang)
            .await
            .map_err(|e| {
                tracing::error!("Word supply {} failed: {}", self.supply.name(), e);
                e
            })?;
        if let Err(reason) = pair.check() {
            tracing::error!("Word supply {} returned {:?}: {}", self.supply.name(), pair, reason);
            return Err(WordError::Unplayable(reason).into());
        }

        let dealt = deal(
            &mut rand::rng(),
            config.player_count,
            &pair,
            config.difficulty,
        );

        self.commit(|state| {
            *state = OfflineGameState {
                status: OfflinePhase::Passing,
                config,
                players: dealt.players,
                current_player_index: 0,
                word_pair: pair,
                impostor_index: Some(dealt.impostor_index),
                starting_player_id: Some(dealt.starting_player_id),
                winner: None,
            };
            Ok(())
        })
    }

    /// Deal a new round with the stored config
    pub async fn restart_game(&self) -> OfflineResult<()> {
        let config = self.state.borrow().config.clone();
        self.start_game(config).await
    }

    /// Hand the device to the next seat, or start the discussion after the last one
    pub fn next_player(&self) -> OfflineResult<()> {
        self.commit(|state| {
            if state.status != OfflinePhase::Passing {
                return Err(OfflineError::InvalidPhase {
                    op: "next_player",
                    phase: state.status,
                });
            }

            let next = state.current_player_index + 1;
            if next >= state.players.len() {
                tracing::info!("All players have seen their card, discussion starts");
                state.status = OfflinePhase::Playing;
            } else {
                state.current_player_index = next;
            }
            Ok(())
        })
    }

    pub fn finish_game(&self) -> OfflineResult<()> {
        self.commit(|state| {
            state.status = OfflinePhase::Finished;
            Ok(())
        })
    }

    /// Record which side won and finish the round
    pub fn declare_winner(&self, winner: Role) -> OfflineResult<()> {
        self.commit(|state| {
            state.winner = Some(winner);
            state.status = OfflinePhase::Finished;
            Ok(())
        })
    }

    pub fn update_config(&self, patch: ConfigPatch) -> OfflineResult<()> {
        self.commit(|state| {
            state.config.apply(patch);
            Ok(())
        })
    }

    pub fn start_setup(&self) -> OfflineResult<()> {
        self.commit(|state| {
            state.status = OfflinePhase::Setup;
            Ok(())
        })
    }

    /// Flip a seat's card face up or down
    pub fn toggle_revealed(&self, player_id: u32) -> OfflineResult<()> {
        self.commit(|state| {
            let player = state
                .players
                .iter_mut()
                .find(|p| p.id == player_id)
                .ok_or(OfflineError::UnknownPlayer(player_id))?;
            player.is_revealed = !player.is_revealed;
            Ok(())
        })
    }

    /// Back to the initial snapshot, with nothing left in storage
    pub fn reset(&self) -> OfflineResult<()> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|current| {
            if let Err(e) = self.store.clear(&self.settings.storage_key) {
                tracing::error!("Failed to clear offline snapshot: {}", e);
                outcome = Err(e.into());
                return false;
            }
            let initial = OfflineGameState::default();
            let changed = *current != initial;
            *current = initial;
            changed
        });
        outcome
    }

    /// Apply `op` to a copy of the state, persist it, then publish it.
    /// Subscribers are only woken when the snapshot actually changed.
    fn commit<F>(&self, op: F) -> OfflineResult<()>
    where
        F: FnOnce(&mut OfflineGameState) -> OfflineResult<()>,
    {
        let mut outcome = Ok(());
        self.state.send_if_modified(|current| {
            let mut next = current.clone();
            if let Err(e) = op(&mut next).and_then(|()| self.persist(&next)) {
                outcome = Err(e);
                return false;
            }
            let changed = next != *current;
            *current = next;
            changed
        });
        outcome
    }

    fn persist(&self, state: &OfflineGameState) -> OfflineResult<()> {
        let raw = PersistedSnapshot::new(state.clone()).encode()?;
        self.store
            .set(&self.settings.storage_key, &raw, self.settings.snapshot_ttl)
            .map_err(|e| {
                tracing::error!("Failed to persist offline snapshot: {}", e);
                OfflineError::Persist(e)
            })
    }
}
