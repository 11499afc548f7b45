//! Daily challenge rotation: fetch a new batch, then archive and clear sessions and publish it.

use std::{sync::Arc, time::Duration};

use time::{OffsetDateTime, PrimitiveDateTime, Time, format_description::well_known::Rfc3339};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{
    services::{
        archive_service,
        challenge_source::{ChallengeSource, SourceError},
    },
    state::{SharedState, challenge::Challenge},
};

/// Bounded exponential backoff used when fetching a new batch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Fetch calls made before giving up, the first one included.
    pub max_attempts: u32,
    /// Pause after the first failure.
    pub initial_delay: Duration,
    /// Upper bound of the doubling pause.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// What one rotation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationReport {
    /// Sessions removed from the store.
    pub cleared: usize,
    /// Of those, how many snapshots reached the store.
    pub archived: usize,
    /// New catalog edition, `None` when the previous catalog was kept.
    pub edition: Option<u64>,
}

/// First rotation instant strictly after `now`.
pub fn next_rotation(now: OffsetDateTime, hour_utc: u8) -> OffsetDateTime {
    let now = now.to_offset(time::UtcOffset::UTC);
    let at = Time::from_hms(hour_utc, 0, 0).unwrap_or(Time::MIDNIGHT);
    let today = PrimitiveDateTime::new(now.date(), at).assume_utc();
    if today > now {
        today
    } else {
        today + time::Duration::days(1)
    }
}

/// Sleep until each daily boundary and rotate. Only returns with the process.
pub async fn run(state: SharedState) {
    let policy = RetryPolicy::default();
    loop {
        let now = OffsetDateTime::now_utc();
        let next = next_rotation(now, state.config().rotation_hour_utc);
        info!(
            next = %next.format(&Rfc3339).unwrap_or_else(|_| next.to_string()),
            "next challenge rotation scheduled"
        );
        sleep(Duration::try_from(next - now).unwrap_or_default()).await;

        rotate(&state, &policy).await;
    }
}

/// Fetch a fresh batch, then clear and archive every session and swap the batch in.
///
/// The fetch runs first so sessions keep playing while it retries; clearing and
/// publishing follow back to back. A failed fetch still clears the sessions and
/// keeps the previous catalog authoritative until the next tick.
pub async fn rotate(state: &SharedState, policy: &RetryPolicy) -> RotationReport {
    let count = state.catalog().daily_count();
    let fetched = fetch_with_retry(state.challenge_source(), count, policy).await;

    let cleared = state.sessions().clear_all().await;
    let edition = match fetched {
        Ok(challenges) => match state.catalog().replace(challenges).await {
            Ok(edition) => {
                info!(edition, count, "challenge catalog rotated");
                Some(edition)
            }
            Err(err) => {
                error!(error = %err, "fetched batch refused; keeping previous catalog");
                None
            }
        },
        Err(err) => {
            error!(error = %err, "challenge fetch failed; keeping previous catalog");
            None
        }
    };

    let archived = archive_service::archive_sessions(state, &cleared).await;
    info!(cleared = cleared.len(), archived, "sessions cleared for rotation");

    if edition.is_some() {
        let catalog = state.catalog().current().await;
        if let Err(err) = archive_service::archive_batch(state, &catalog).await {
            warn!(error = %err, "failed to archive challenge batch");
        }
    }

    RotationReport {
        cleared: cleared.len(),
        archived,
        edition,
    }
}

/// Fetch `count` challenges, retrying with exponential backoff.
pub async fn fetch_with_retry(
    source: Arc<dyn ChallengeSource>,
    count: usize,
    policy: &RetryPolicy,
) -> Result<Vec<Challenge>, SourceError> {
    let mut delay = policy.initial_delay;
    let mut attempt = 1;
    loop {
        match source.fetch(count).await {
            Ok(challenges) => return Ok(challenges),
            Err(err) if attempt >= policy.max_attempts => return Err(err),
            Err(err) => {
                warn!(attempt, error = %err, "challenge fetch attempt failed; retrying");
                sleep(delay).await;
                delay = (delay * 2).min(policy.max_delay);
                attempt += 1;
            }
        }
    }
}

/// Load the first catalog: `primary` first, `fallback` when it fails.
pub async fn initial_challenges(
    primary: Arc<dyn ChallengeSource>,
    fallback: Arc<dyn ChallengeSource>,
    count: usize,
) -> Result<Vec<Challenge>, SourceError> {
    match primary.fetch(count).await {
        Ok(challenges) => Ok(challenges),
        Err(err) => {
            warn!(error = %err, "remote challenges unavailable; using bundled quotes");
            fallback.fetch(count).await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use futures::future::BoxFuture;
    use time::macros::datetime;

    use super::*;
    use crate::state::challenge::tests::sample_challenges;

    /// Fails the first `failures` calls, then succeeds.
    struct FlakySource {
        failures: u32,
        calls: AtomicU32,
    }

    impl ChallengeSource for FlakySource {
        fn fetch(&self, count: usize) -> BoxFuture<'static, Result<Vec<Challenge>, SourceError>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = call < self.failures;
            Box::pin(async move {
                if fail {
                    Err(SourceError::NotEnough {
                        wanted: count,
                        found: 0,
                    })
                } else {
                    Ok(sample_challenges(count))
                }
            })
        }
    }

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn next_rotation_is_later_today_or_tomorrow() {
        let morning = datetime!(2024-03-10 08:30 UTC);
        assert_eq!(next_rotation(morning, 12), datetime!(2024-03-10 12:00 UTC));
        assert_eq!(next_rotation(morning, 0), datetime!(2024-03-11 0:00 UTC));

        let on_the_hour = datetime!(2024-03-10 12:00 UTC);
        assert_eq!(next_rotation(on_the_hour, 12), datetime!(2024-03-11 12:00 UTC));
    }

    #[test]
    fn next_rotation_uses_utc_for_offset_clocks() {
        let local = datetime!(2024-03-10 23:30 +02:00);
        assert_eq!(next_rotation(local, 0), datetime!(2024-03-11 0:00 UTC));
    }

    #[tokio::test]
    async fn fetch_retries_until_success() {
        let source = Arc::new(FlakySource {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let challenges = fetch_with_retry(source.clone(), 3, &instant_policy(5))
            .await
            .unwrap();
        assert_eq!(challenges.len(), 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fetch_gives_up_after_max_attempts() {
        let source = Arc::new(FlakySource {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        });
        assert!(fetch_with_retry(source.clone(), 3, &instant_policy(4)).await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn initial_challenges_fall_back() {
        let broken = Arc::new(FlakySource {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let working = Arc::new(FlakySource {
            failures: 0,
            calls: AtomicU32::new(0),
        });
        let challenges = initial_challenges(broken, working.clone(), 2).await.unwrap();
        assert_eq!(challenges.len(), 2);
        assert_eq!(working.calls.load(Ordering::SeqCst), 1);
    }
}
