//! Open-ended word pairs from the Datamuse API.
//!
//! A random seed word becomes the real word; a word Datamuse relates to it
//! (trigger association or synonym) becomes the trap.

use super::*;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Deserialize;

/// Category name that selects this supply on the word service
pub const INFINITE_CATEGORY: &str = "✨ Infinite";

const MAX_ATTEMPTS: usize = 3;

const SEEDS_EN: &[&str] = &[
    "fire", "water", "earth", "wind", "magic", "science", "space", "time", "love", "war", "peace",
    "king", "queen", "apple", "banana", "car", "house", "dog", "cat", "bird", "fish", "book",
    "computer", "phone", "music", "art", "city", "forest", "mountain", "ocean", "river", "desert",
    "snow", "rain", "robot", "alien", "ghost", "vampire", "coffee", "tea", "pizza", "cake",
    "doctor", "teacher", "police", "thief", "judge", "actor", "singer",
];

const SEEDS_ES: &[&str] = &[
    "fuego", "agua", "tierra", "viento", "magia", "ciencia", "espacio", "tiempo", "amor", "rey",
    "reina", "manzana", "coche", "casa", "perro", "gato", "libro", "música", "arte", "ciudad",
    "bosque", "montaña", "océano", "río", "desierto", "nieve", "lluvia", "robot", "fantasma",
    "vampiro", "café", "pizza", "pastel", "doctor", "profesor", "policía", "ladrón", "juez",
    "actor", "cantante",
];

#[derive(Debug, Deserialize)]
struct DatamuseWord {
    word: String,
}

pub struct DatamuseSupply {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl DatamuseSupply {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    async fn related(&self, seed: &str, relation: &str, lang: &str) -> WordResult<Vec<String>> {
        let url = format!("{}/words", self.base_url);
        let mut query = vec![(relation, seed), ("max", "20")];
        if lang == "es" {
            query.push(("v", "es"));
        }

        let response = tokio::time::timeout(
            self.timeout,
            self.client.get(&url).query(&query).send(),
        )
        .await
        .map_err(|_| WordError::Timeout(self.timeout))?
        .map_err(|e| WordError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WordError::Status(response.status().as_u16()));
        }

        let words: Vec<DatamuseWord> = response
            .json()
            .await
            .map_err(|e| WordError::ParseError(e.to_string()))?;
        Ok(words.into_iter().map(|w| w.word).collect())
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl WordSupply for DatamuseSupply {
    async fn fetch_pair(&self, category: &str, lang: &str) -> WordResult<WordPair> {
        let seeds = if lang == "es" { SEEDS_ES } else { SEEDS_EN };
        let mut last_error = WordError::Empty {
            category: category.to_string(),
            lang: lang.to_string(),
        };

        for attempt in 1..=MAX_ATTEMPTS {
            let (seed, relation) = {
                let mut rng = rand::rng();
                let seed = seeds.choose(&mut rng).copied().unwrap_or("time");
                // Synonyms make for a harder round than associations
                let relation = if rng.random_bool(0.5) {
                    "rel_syn"
                } else {
                    "rel_trg"
                };
                (seed, relation)
            };

            let related = match self.related(seed, relation, lang).await {
                Ok(related) => related,
                Err(e) => {
                    tracing::warn!("Datamuse attempt {} for {:?} failed: {}", attempt, seed, e);
                    last_error = e;
                    continue;
                }
            };

            let candidates: Vec<&String> = related
                .iter()
                .filter(|w| !w.trim().is_empty() && !w.eq_ignore_ascii_case(seed))
                .collect();
            let trap = {
                let mut rng = rand::rng();
                candidates.choose(&mut rng).map(|w| capitalize(w))
            };

            match trap {
                Some(trap) => {
                    let pair = WordPair::new(capitalize(seed), trap);
                    if pair.check().is_ok() {
                        tracing::debug!("Datamuse pair {:?} via {}", pair, relation);
                        return Ok(pair);
                    }
                }
                None => tracing::debug!("Datamuse had nothing related to {:?}", seed),
            }
            last_error = WordError::Empty {
                category: category.to_string(),
                lang: lang.to_string(),
            };
        }

        Err(last_error)
    }

    fn name(&self) -> &str {
        "datamuse"
    }
}
