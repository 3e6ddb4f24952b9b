use rand::Rng;

use super::OfflinePlayer;
use crate::types::{Difficulty, Role, WordPair};

/// Roles and words for one round
#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    pub players: Vec<OfflinePlayer>,
    /// Index into `players`
    pub impostor_index: usize,
    /// Player id (1-based) who opens the discussion
    pub starting_player_id: u32,
}

/// Deal a round for `player_count` players. `player_count` must be non-zero.
pub fn deal<R: Rng + ?Sized>(
    rng: &mut R,
    player_count: usize,
    pair: &WordPair,
    difficulty: Difficulty,
) -> Deal {
    let impostor_index = rng.random_range(0..player_count);
    let starting_index = rng.random_range(0..player_count);

    let players: Vec<OfflinePlayer> = (0..player_count)
        .zip(1u32..)
        .map(|(i, id)| {
            let role = if i == impostor_index {
                Role::Impostor
            } else {
                Role::Civilian
            };
            OfflinePlayer {
                id,
                role,
                word: pair.word_for(role, difficulty),
                is_revealed: false,
            }
        })
        .collect();

    let starting_player_id = players[starting_index].id;
    Deal {
        players,
        impostor_index,
        starting_player_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IMPOSTOR_MARKER;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_exactly_one_impostor_for_all_sizes() {
        let pair = WordPair::new("Cat", "Dog");
        let mut rng = StdRng::seed_from_u64(7);
        for count in 3..=20 {
            for _ in 0..25 {
                let deal = deal(&mut rng, count, &pair, Difficulty::Normal);
                assert_eq!(deal.players.len(), count);
                let impostors: Vec<_> = deal
                    .players
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.role == Role::Impostor)
                    .collect();
                assert_eq!(impostors.len(), 1);
                assert_eq!(impostors[0].0, deal.impostor_index);
                assert!(deal
                    .players
                    .iter()
                    .any(|p| p.id == deal.starting_player_id));
                assert!(deal.starting_player_id >= 1);
            }
        }
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut rng = StdRng::seed_from_u64(1);
        let deal = deal(&mut rng, 5, &WordPair::new("a", "b"), Difficulty::Easy);
        let ids: Vec<u32> = deal.players.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(deal.players.iter().all(|p| !p.is_revealed));
    }

    #[test]
    fn test_words_by_difficulty() {
        let pair = WordPair::new("Cat", "Dog");
        let mut rng = StdRng::seed_from_u64(42);

        let normal = deal(&mut rng, 4, &pair, Difficulty::Normal);
        for p in &normal.players {
            match p.role {
                Role::Civilian => assert_eq!(p.word, "Cat"),
                Role::Impostor => assert_eq!(p.word, IMPOSTOR_MARKER),
            }
        }

        let easy = deal(&mut rng, 4, &pair, Difficulty::Easy);
        for p in &easy.players {
            match p.role {
                Role::Civilian => assert_eq!(p.word, "Cat"),
                Role::Impostor => assert_eq!(p.word, "Dog"),
            }
        }
    }

    #[test]
    fn test_impostor_position_covers_all_seats() {
        let pair = WordPair::new("Cat", "Dog");
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[deal(&mut rng, 3, &pair, Difficulty::Normal).impostor_index] = true;
        }
        assert_eq!(seen, [true, true, true]);
    }
}
