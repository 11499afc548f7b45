use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::state::words::sanitize;

/// One quiz unit: a quote to uncover plus the paragraph shown before the first attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Quote the player is trying to reveal.
    pub quote: String,
    /// Author credited for the quote.
    pub author: String,
    /// Generated paragraph displayed before any attempt.
    pub seed_content: String,
    /// Sanitized quote tokens, duplicates kept positionally.
    pub words: Vec<String>,
}

impl Challenge {
    /// Build a challenge, deriving its target words from the quote.
    pub fn new(
        quote: impl Into<String>,
        author: impl Into<String>,
        seed_content: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let quote = quote.into();
        let words = sanitize(&quote);
        if words.is_empty() {
            return Err(CatalogError::EmptyQuote(quote));
        }

        Ok(Self {
            quote,
            author: author.into(),
            seed_content: seed_content.into(),
            words,
        })
    }
}

/// Failures raised while reading or replacing the challenge catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Requested challenge index is past the end of the catalog.
    #[error("challenge index {index} out of range (catalog holds {size})")]
    OutOfRange {
        /// Index that was asked for.
        index: usize,
        /// Challenges in the catalog.
        size: usize,
    },
    /// Replacement batch does not hold exactly the configured daily count.
    #[error("expected {expected} challenges, got {actual}")]
    SizeMismatch {
        /// Configured daily count.
        expected: usize,
        /// Challenges in the refused batch.
        actual: usize,
    },
    /// Quote produced no target words.
    #[error("quote `{0}` has no playable words")]
    EmptyQuote(String),
}

/// Immutable view of one catalog edition.
#[derive(Debug)]
pub struct CatalogSnapshot {
    edition: u64,
    challenges: Vec<Arc<Challenge>>,
}

impl CatalogSnapshot {
    /// Edition counter, bumped on every successful replacement.
    pub fn edition(&self) -> u64 {
        self.edition
    }

    /// Number of challenges in this edition.
    pub fn size(&self) -> usize {
        self.challenges.len()
    }

    /// Challenge stored at `index`.
    pub fn get(&self, index: usize) -> Result<Arc<Challenge>, CatalogError> {
        self.challenges
            .get(index)
            .cloned()
            .ok_or(CatalogError::OutOfRange {
                index,
                size: self.challenges.len(),
            })
    }

    /// Iterate over the challenges in order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Challenge>> {
        self.challenges.iter()
    }
}

/// Active daily challenges, swapped wholesale on rotation.
pub struct Catalog {
    daily_count: usize,
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl Catalog {
    /// Create a catalog seeded with an initial batch.
    pub fn new(daily_count: usize, initial: Vec<Challenge>) -> Result<Self, CatalogError> {
        check_size(daily_count, initial.len())?;
        Ok(Self {
            daily_count,
            current: RwLock::new(Arc::new(CatalogSnapshot {
                edition: 0,
                challenges: initial.into_iter().map(Arc::new).collect(),
            })),
        })
    }

    /// Clone a handle to the active edition. No lock is held once this returns.
    pub async fn current(&self) -> Arc<CatalogSnapshot> {
        self.current.read().await.clone()
    }

    /// Challenge at `index` in the active edition.
    pub async fn get(&self, index: usize) -> Result<Arc<Challenge>, CatalogError> {
        self.current.read().await.get(index)
    }

    /// Number of challenges in the active edition.
    pub async fn size(&self) -> usize {
        self.current.read().await.size()
    }

    /// Configured number of challenges per day.
    pub fn daily_count(&self) -> usize {
        self.daily_count
    }

    /// Swap in a new batch, returning the new edition number.
    pub async fn replace(&self, challenges: Vec<Challenge>) -> Result<u64, CatalogError> {
        check_size(self.daily_count, challenges.len())?;
        let challenges = challenges.into_iter().map(Arc::new).collect();

        let mut guard = self.current.write().await;
        let edition = guard.edition + 1;
        *guard = Arc::new(CatalogSnapshot {
            edition,
            challenges,
        });
        Ok(edition)
    }
}

fn check_size(expected: usize, actual: usize) -> Result<(), CatalogError> {
    if expected != actual {
        return Err(CatalogError::SizeMismatch { expected, actual });
    }
    Ok(())
}
