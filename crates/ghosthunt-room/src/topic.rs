//! Topic pairs and the deck rounds draw from.
//!
//! The deck is loaded once before the server accepts traffic and shared
//! read-only by every room.

use std::path::Path;
use std::sync::Arc;

use rand::Rng;

use crate::TopicError;

/// Two related topics. One side goes to the majority, the other to the
/// ghost; which is which is decided per round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPair {
    a: String,
    b: String,
}

impl TopicPair {
    /// Builds a pair. Both sides must be non-empty and different, or a
    /// round could not tell the ghost apart.
    pub fn new(
        a: impl Into<String>,
        b: impl Into<String>,
    ) -> Result<Self, &'static str> {
        let (a, b) = (a.into(), b.into());
        if a.is_empty() || b.is_empty() {
            return Err("topic must not be empty");
        }
        if a == b {
            return Err("both topics are identical");
        }
        Ok(Self { a, b })
    }

    pub fn a(&self) -> &str {
        &self.a
    }

    pub fn b(&self) -> &str {
        &self.b
    }

    /// Returns `true` if `{x, y}` is this pair, in either order.
    pub fn matches(&self, x: &str, y: &str) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }
}

/// The shared, immutable list of topic pairs.
///
/// Cloning is cheap (`Arc`), so every room actor holds its own handle.
#[derive(Debug, Clone, Default)]
pub struct TopicDeck {
    pairs: Arc<[TopicPair]>,
}

impl TopicDeck {
    pub fn new(pairs: Vec<TopicPair>) -> Self {
        Self {
            pairs: pairs.into(),
        }
    }

    /// Parses one `topicA,topicB` pair per line.
    ///
    /// Whitespace around each topic is trimmed and blank lines are
    /// skipped. Only the first comma splits, so the second topic may
    /// itself contain commas.
    ///
    /// # Errors
    /// Returns [`TopicError::Malformed`] with the 1-based line number of
    /// the first bad line.
    pub fn parse(text: &str) -> Result<Self, TopicError> {
        let mut pairs = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let (a, b) = line.split_once(',').ok_or(TopicError::Malformed {
                line: idx + 1,
                reason: "expected `topicA,topicB`",
            })?;
            let pair = TopicPair::new(a.trim(), b.trim()).map_err(|reason| {
                TopicError::Malformed {
                    line: idx + 1,
                    reason,
                }
            })?;
            pairs.push(pair);
        }
        Ok(Self::new(pairs))
    }

    /// Reads and parses a topic file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TopicError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let deck = Self::parse(&text)?;
        tracing::info!(
            path = %path.as_ref().display(),
            pairs = deck.len(),
            "topics loaded"
        );
        Ok(deck)
    }

    /// Picks one pair uniformly at random. `None` if the deck is empty.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&TopicPair> {
        if self.pairs.is_empty() {
            return None;
        }
        self.pairs.get(rng.random_range(0..self.pairs.len()))
    }

    pub fn pairs(&self) -> &[TopicPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
