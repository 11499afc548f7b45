//! Providers of the daily challenge batch.

use std::sync::Arc;

use futures::future::{self, BoxFuture};
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    dao::{
        generator::TextGenerator,
        quotes::{QuotesClient, QuotesError},
    },
    state::{
        challenge::{CatalogError, Challenge},
        words::sanitize,
    },
};

/// Seed text used when a paragraph could not be generated.
pub const CONTENT_UNAVAILABLE: &str = "Content unavailable.";

/// Failures raised while assembling a batch.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Quote provider failed.
    #[error(transparent)]
    Quotes(#[from] QuotesError),
    /// Not enough playable quotes to fill the batch.
    #[error("need {wanted} playable quotes, found {found}")]
    NotEnough {
        /// Challenges requested.
        wanted: usize,
        /// Playable quotes received.
        found: usize,
    },
    /// A challenge could not be built.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Something able to produce `count` ready-to-play challenges.
pub trait ChallengeSource: Send + Sync {
    /// Build a fresh batch of `count` challenges.
    fn fetch(&self, count: usize) -> BoxFuture<'static, Result<Vec<Challenge>, SourceError>>;
}

/// Pulls quotes from the quote provider and generates a seed paragraph for each.
pub struct RemoteChallengeSource {
    quotes: QuotesClient,
    generator: Arc<dyn TextGenerator>,
    seed_prompt: Arc<str>,
}

impl RemoteChallengeSource {
    /// Source asking `generator` for a seed paragraph with `seed_prompt` for every quote.
    pub fn new(
        quotes: QuotesClient,
        generator: Arc<dyn TextGenerator>,
        seed_prompt: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            quotes,
            generator,
            seed_prompt: seed_prompt.into(),
        }
    }
}

impl ChallengeSource for RemoteChallengeSource {
    fn fetch(&self, count: usize) -> BoxFuture<'static, Result<Vec<Challenge>, SourceError>> {
        let quotes = self.quotes.clone();
        let generator = self.generator.clone();
        let seed_prompt = self.seed_prompt.clone();

        Box::pin(async move {
            let playable: Vec<_> = quotes
                .fetch()
                .await?
                .into_iter()
                .filter(|quote| !sanitize(&quote.quote).is_empty())
                .take(count)
                .collect();
            if playable.len() < count {
                return Err(SourceError::NotEnough {
                    wanted: count,
                    found: playable.len(),
                });
            }

            let seeds = future::join_all(
                playable
                    .iter()
                    .map(|_| generator.complete(seed_prompt.to_string())),
            )
            .await;

            playable
                .into_iter()
                .zip(seeds)
                .enumerate()
                .map(|(index, (quote, seed))| {
                    let seed = seed.unwrap_or_else(|err| {
                        warn!(index, error = %err, "seed paragraph generation failed");
                        CONTENT_UNAVAILABLE.to_owned()
                    });
                    debug!(index, author = %quote.author, "challenge assembled");
                    Challenge::new(quote.quote, quote.author, seed).map_err(SourceError::from)
                })
                .collect()
        })
    }
}

/// Quote, author and seed paragraph bundled with the binary.
const BUILTIN: &[(&str, &str, &str)] = &[
    (
        "When you reach the end of your rope, tie a knot in it and hang on.",
        "Franklin D. Roosevelt",
        "Sailors have relied on a few dozen knots for centuries. The bowline forms a fixed loop \
         that will not slip or bind under load, which is why rescuers still tie it around a \
         person before hauling them out of a crevasse. A good knot keeps most of the strength \
         of the rope, while a poor one can halve it.",
    ),
    (
        "In the middle of difficulty lies opportunity.",
        "Albert Einstein",
        "The Great Fire of London in 1666 destroyed more than thirteen thousand houses, yet it \
         also cleared the way for brick construction, wider streets and the fifty one churches \
         rebuilt under Christopher Wren, including the domed cathedral of Saint Paul that still \
         dominates the skyline.",
    ),
    (
        "It always seems impossible until it's done.",
        "Nelson Mandela",
        "Before 1954 many runners believed a human could not cover a mile in under four minutes. \
         Roger Bannister did it at Oxford with a time of three minutes fifty nine point four \
         seconds, and within a few years dozens of athletes had repeated the feat.",
    ),
    (
        "The journey of a thousand miles begins with one step.",
        "Lao Tzu",
        "The Appalachian Trail runs for roughly two thousand two hundred miles through fourteen \
         states. Fewer than one in four people who set out to walk its full length in a single \
         season reach the end, and most of them take between five and seven months.",
    ),
    (
        "Well done is better than well said.",
        "Benjamin Franklin",
        "Printers in colonial America set every page by hand, picking metal letters from a case \
         and locking them into a frame. An experienced compositor could set about fifteen hundred \
         characters an hour, so a single newspaper issue took a small team most of a day.",
    ),
    (
        "Simplicity is the ultimate sophistication.",
        "Leonardo da Vinci",
        "The paper clip as we know it, with its double oval loop, was never patented in that \
         form. Its design is so efficient that it has barely changed since the late nineteenth \
         century, and billions are still produced every year around the world.",
    ),
    (
        "Knowing yourself is the beginning of all wisdom.",
        "Aristotle",
        "The temple of Apollo at Delphi carried a short inscription over its entrance telling \
         visitors to know themselves. Pilgrims travelled for weeks to consult the oracle there, \
         whose answers were famously ambiguous and open to more than one reading.",
    ),
    (
        "What we think, we become.",
        "Buddha",
        "Researchers studying placebo effects have found that patients told a pill is expensive \
         often report stronger relief than those told it is cheap, even when both pills contain \
         nothing but sugar. Expectation alone measurably changes how the body responds.",
    ),
];

/// Offline source drawing from a bundled list, in random order.
#[derive(Default)]
pub struct BuiltinChallengeSource;

impl ChallengeSource for BuiltinChallengeSource {
    fn fetch(&self, count: usize) -> BoxFuture<'static, Result<Vec<Challenge>, SourceError>> {
        Box::pin(async move {
            if count > BUILTIN.len() {
                return Err(SourceError::NotEnough {
                    wanted: count,
                    found: BUILTIN.len(),
                });
            }

            let mut picks: Vec<_> = BUILTIN.iter().collect();
            picks.shuffle(&mut rand::rng());
            picks
                .into_iter()
                .take(count)
                .map(|(quote, author, seed)| {
                    Challenge::new(*quote, *author, *seed).map_err(SourceError::from)
                })
                .collect()
        })
    }
}
