use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use dashmap::{DashMap, mapref::entry::Entry as MapEntry};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::state::{
    challenge::{CatalogError, CatalogSnapshot, Challenge},
    progress::{self, Outcome},
    words::sanitize,
};

/// One round trip: what the player typed and what came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Literal text submitted by the player (empty for the seed slot).
    pub input: String,
    /// Generated text returned for that input.
    pub content: String,
}

/// Failures raised by session lookups, validation and mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No session is stored under the requested id.
    #[error("session not found")]
    NotFound,
    /// Session is bound to a previous catalog edition or a different word count.
    #[error("session is bound to an outdated challenge")]
    Stale,
    /// Another request was accepted too recently.
    #[error("too many requests; retry in {remaining_ms} ms")]
    CoolingDown {
        /// Time left before another guess is accepted.
        remaining_ms: u64,
    },
    /// A generation request is already running for this session.
    #[error("a generation request is already in flight")]
    InFlight,
    /// Player submitted nothing.
    #[error("input must not be empty")]
    EmptyInput,
    /// No attempt is accepted once the challenge is complete.
    #[error("challenge already complete")]
    AlreadyComplete,
    /// Input shares no word with the latest generated paragraph.
    #[error("input must continue the latest paragraph")]
    NotContinuation,
    /// Advancement requested before the current challenge was finished.
    #[error("current challenge is not complete")]
    NotComplete,
    /// The session already plays the last challenge of the day.
    #[error("no more challenges available today")]
    NoMoreChallenges,
    /// Catalog lookup failed while binding the session.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// Broken internal invariant; never caused by player input.
    #[error("session invariant violated: {0}")]
    Invariant(String),
}

/// Ticket returned when a POST is accepted; identifies the binding it was made against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// Session id the ticket belongs to.
    pub session_id: String,
    /// Store binding number at claim time.
    pub binding: u64,
    /// Challenge index being played.
    pub challenge_index: usize,
}

/// Result of folding a finished generation into a session.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// Number of target words revealed by this attempt.
    pub revealed: usize,
    /// Attempts consumed after this one.
    pub attempts: usize,
    /// Copy of the session when this attempt completed the challenge.
    pub finished: Option<Session>,
}

/// Per-player game state for the current day.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    binding: u64,
    edition: u64,
    challenge_index: usize,
    progress: Vec<bool>,
    history: Vec<Entry>,
    attempts: usize,
    max_attempts: usize,
    last_accessed: Instant,
    in_flight: bool,
}

impl Session {
    fn new(
        id: String,
        binding: u64,
        edition: u64,
        challenge_index: usize,
        challenge: &Challenge,
        max_attempts: usize,
    ) -> Self {
        let mut session = Self {
            id,
            binding,
            edition,
            challenge_index,
            progress: Vec::new(),
            history: Vec::with_capacity(max_attempts + 1),
            attempts: 0,
            max_attempts,
            last_accessed: Instant::now(),
            in_flight: false,
        };
        session.reset_for(challenge);
        session
    }

    fn reset_for(&mut self, challenge: &Challenge) {
        self.progress = progress::initial_progress(&challenge.words);
        self.history.clear();
        self.history.push(Entry {
            input: String::new(),
            content: challenge.seed_content.clone(),
        });
        self.attempts = 0;
    }

    /// Opaque session identifier carried by the cookie.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Index of the challenge being played.
    pub fn challenge_index(&self) -> usize {
        self.challenge_index
    }

    /// Per-word satisfaction flags.
    pub fn progress(&self) -> &[bool] {
        &self.progress
    }

    /// Seed entry followed by every consumed attempt.
    pub fn history(&self) -> &[Entry] {
        &self.history
    }

    /// Attempts consumed on the current challenge.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Whether a generation request is currently running.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Last time an attempt was recorded (or the session was created).
    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    /// Most recent generated paragraph shown to the player.
    pub fn latest_content(&self) -> &str {
        self.history
            .last()
            .map(|entry| entry.content.as_str())
            .unwrap_or_default()
    }

    /// Whether every word is found or the attempt budget is spent.
    pub fn is_complete(&self) -> bool {
        progress::is_complete(&self.progress, self.attempts, self.max_attempts)
    }

    /// End state used when persisting the session.
    pub fn outcome(&self) -> Outcome {
        progress::outcome(&self.progress, self.attempts, self.max_attempts)
    }

    /// Whether the session still matches the given catalog edition.
    pub fn is_bound_to(&self, catalog: &CatalogSnapshot) -> bool {
        self.edition == catalog.edition()
            && catalog
                .get(self.challenge_index)
                .is_ok_and(|challenge| challenge.words.len() == self.progress.len())
    }

    /// Validate a submission and mark the session in flight when it is accepted.
    pub fn claim(
        &mut self,
        catalog: &CatalogSnapshot,
        input: &str,
        cooldown: Duration,
    ) -> Result<Claim, SessionError> {
        if !self.is_bound_to(catalog) {
            return Err(SessionError::Stale);
        }

        let elapsed = self.last_accessed.elapsed();
        if elapsed < cooldown {
            let remaining_ms = (cooldown - elapsed).as_millis().try_into().unwrap_or(u64::MAX);
            return Err(SessionError::CoolingDown { remaining_ms });
        }

        if self.in_flight {
            return Err(SessionError::InFlight);
        }

        if input.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }

        if self.is_complete() {
            return Err(SessionError::AlreadyComplete);
        }

        if !self.continues_latest(input) {
            return Err(SessionError::NotContinuation);
        }

        self.in_flight = true;
        Ok(Claim {
            session_id: self.id.clone(),
            binding: self.binding,
            challenge_index: self.challenge_index,
        })
    }

    fn continues_latest(&self, input: &str) -> bool {
        let latest = sanitize(self.latest_content());
        sanitize(input)
            .iter()
            .any(|token| latest.iter().any(|word| word == token))
    }

    /// Append a finished attempt and update progress against `words`.
    pub fn record_attempt(
        &mut self,
        input: String,
        content: String,
        words: &[String],
    ) -> Result<AttemptRecord, SessionError> {
        if self.attempts >= self.max_attempts {
            return Err(SessionError::Invariant(format!(
                "attempt recorded past the limit of {}",
                self.max_attempts
            )));
        }
        if words.len() != self.progress.len() {
            return Err(SessionError::Invariant(format!(
                "progress holds {} flags for {} target words",
                self.progress.len(),
                words.len()
            )));
        }

        let revealed = progress::apply_matches(&mut self.progress, words, &content);
        self.history.push(Entry { input, content });
        self.attempts += 1;
        self.last_accessed = Instant::now();
        self.in_flight = false;

        if self.attempts != self.history.len() - 1 {
            return Err(SessionError::Invariant(format!(
                "{} attempts recorded against {} history entries",
                self.attempts,
                self.history.len()
            )));
        }

        Ok(AttemptRecord {
            revealed,
            attempts: self.attempts,
            finished: self.is_complete().then(|| self.clone()),
        })
    }

    /// Move to the next challenge of the day, resetting per-challenge state.
    pub fn advance(&mut self, catalog: &CatalogSnapshot) -> Result<(), SessionError> {
        if !self.is_bound_to(catalog) {
            return Err(SessionError::Stale);
        }
        if !self.is_complete() {
            return Err(SessionError::NotComplete);
        }
        if self.in_flight {
            return Err(SessionError::InFlight);
        }

        let next = self.challenge_index + 1;
        if next >= catalog.size() {
            return Err(SessionError::NoMoreChallenges);
        }

        let challenge = catalog.get(next)?;
        self.challenge_index = next;
        self.reset_for(&challenge);
        Ok(())
    }
}

/// Concurrent registry of sessions keyed by their cookie id.
///
/// In-place mutation goes through per-entry exclusive guards of the sharded map,
/// so players never contend on a single mutex. Membership changes (insert and
/// the rotation-wide clear) additionally go through `membership`, which makes
/// [`SessionStore::clear_all`] atomic with respect to concurrent inserts.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    membership: RwLock<()>,
    next_binding: AtomicU64,
    max_attempts: usize,
}

impl SessionStore {
    /// Create an empty store enforcing `max_attempts` per challenge.
    pub fn new(max_attempts: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            membership: RwLock::new(()),
            next_binding: AtomicU64::new(1),
            max_attempts,
        }
    }

    /// Attempt budget per challenge.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    fn fresh_session(&self, id: String, catalog: &CatalogSnapshot) -> Result<Session, SessionError> {
        let challenge = catalog.get(0)?;
        let binding = self.next_binding.fetch_add(1, Ordering::Relaxed);
        Ok(Session::new(
            id,
            binding,
            catalog.edition(),
            0,
            &challenge,
            self.max_attempts,
        ))
    }

    /// Return the session for `id`, rebinding it to challenge 0 when absent or stale.
    ///
    /// The second element is the stale session a rebind replaced, handed back so
    /// its play can still be archived.
    pub async fn get_or_create(
        &self,
        id: &str,
        catalog: &CatalogSnapshot,
    ) -> Result<(Session, Option<Session>), SessionError> {
        let _gate = self.membership.read().await;

        match self.sessions.entry(id.to_owned()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_bound_to(catalog) {
                    return Ok((occupied.get().clone(), None));
                }
                let fresh = self.fresh_session(id.to_owned(), catalog)?;
                let evicted = occupied.insert(fresh.clone());
                Ok((fresh, Some(evicted)))
            }
            MapEntry::Vacant(vacant) => {
                let fresh = self.fresh_session(id.to_owned(), catalog)?;
                vacant.insert(fresh.clone());
                Ok((fresh, None))
            }
        }
    }

    /// Mint a new unguessable id and store a fresh session under it.
    pub async fn create(&self, catalog: &CatalogSnapshot) -> Result<Session, SessionError> {
        let id = Uuid::new_v4().simple().to_string();
        let fresh = self.fresh_session(id.clone(), catalog)?;

        let _gate = self.membership.read().await;
        match self.sessions.entry(id) {
            MapEntry::Vacant(vacant) => {
                vacant.insert(fresh.clone());
                Ok(fresh)
            }
            MapEntry::Occupied(occupied) => Err(SessionError::Invariant(format!(
                "session id `{}` minted twice",
                occupied.key()
            ))),
        }
    }

    /// Read-only copy of the session stored under `id`.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Whether a session is stored under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Run `f` with exclusive access to one session; `None` when the id is unknown.
    pub fn with_exclusive<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.sessions.get_mut(id).map(|mut entry| f(entry.value_mut()))
    }

    /// Fold a finished generation into the session the claim was made against.
    ///
    /// Returns `Ok(None)` when the session vanished or was rebound in the meantime;
    /// the late result is then dropped instead of resurrecting stale state.
    pub fn finish_attempt(
        &self,
        claim: &Claim,
        input: String,
        content: String,
        words: &[String],
    ) -> Result<Option<AttemptRecord>, SessionError> {
        self.with_exclusive(&claim.session_id, |session| {
            if session.binding != claim.binding
                || session.challenge_index != claim.challenge_index
            {
                return Ok(None);
            }
            session.record_attempt(input, content, words).map(Some)
        })
        .unwrap_or(Ok(None))
    }

    /// Clear the in-flight flag set by `claim`, if it still applies.
    pub fn release(&self, claim: &Claim) {
        self.with_exclusive(&claim.session_id, |session| {
            if session.binding == claim.binding {
                session.in_flight = false;
            }
        });
    }

    /// Atomically empty the store and hand back every session it held.
    pub async fn clear_all(&self) -> Vec<Session> {
        let _gate = self.membership.write().await;
        let ids: Vec<String> = self
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        ids.into_iter()
            .filter_map(|id| self.sessions.remove(&id).map(|(_, session)| session))
            .collect()
    }

    /// Number of sessions that recorded activity within `window`.
    pub fn count_active(&self, window: Duration) -> usize {
        self.sessions
            .iter()
            .filter(|entry| entry.last_accessed.elapsed() < window)
            .count()
    }

    /// Total number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no session.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::state::challenge::{Catalog, tests::sample_challenges};

    const MAX_ATTEMPTS: usize = 3;

    async fn catalog(count: usize) -> Catalog {
        Catalog::new(count, sample_challenges(count)).unwrap()
    }

    /// First word of the seed paragraph, always a valid continuation.
    const CONTINUATION: &str = "Seed me please";

    #[tokio::test]
    async fn fresh_session_is_seeded() {
        let catalog = catalog(2).await;
        let snapshot = catalog.current().await;
        let store = SessionStore::new(MAX_ATTEMPTS);

        let session = store.get_or_create("abc", &snapshot).await.unwrap().0;
        let challenge = snapshot.get(0).unwrap();

        assert_eq!(session.id(), "abc");
        assert_eq!(session.challenge_index(), 0);
        assert_eq!(session.attempts(), 0);
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.latest_content(), challenge.seed_content);
        assert_eq!(session.progress().len(), challenge.words.len());
        assert!(!session.in_flight());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn get_or_create_returns_existing_binding() {
        let catalog = catalog(2).await;
        let snapshot = catalog.current().await;
        let store = SessionStore::new(MAX_ATTEMPTS);

        let first = store.get_or_create("abc", &snapshot).await.unwrap().0;
        let second = store.get_or_create("abc", &snapshot).await.unwrap().0;
        assert_eq!(first.binding, second.binding);
    }

    #[tokio::test]
    async fn stale_session_is_rebound_after_rotation() {
        let catalog = catalog(2).await;
        let store = SessionStore::new(MAX_ATTEMPTS);
        let (old, _) = store
            .get_or_create("abc", &*catalog.current().await)
            .await
            .unwrap();

        catalog.replace(sample_challenges(2)).await.unwrap();
        let snapshot = catalog.current().await;
        assert!(!old.is_bound_to(&snapshot));

        let (fresh, evicted) = store.get_or_create("abc", &snapshot).await.unwrap();
        assert_ne!(old.binding, fresh.binding);
        assert!(fresh.is_bound_to(&snapshot));
        assert_eq!(evicted.map(|session| session.binding), Some(old.binding));
    }

    #[tokio::test]
    async fn created_ids_are_unique_and_opaque() {
        let catalog = catalog(1).await;
        let snapshot = catalog.current().await;
        let store = SessionStore::new(MAX_ATTEMPTS);

        let a = store.create(&snapshot).await.unwrap();
        let b = store.create(&snapshot).await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().len(), 32);
        assert!(store.contains(a.id()) && store.contains(b.id()));
    }

    #[tokio::test]
    async fn claim_rejections_follow_precedence() {
        let catalog = catalog(1).await;
        let snapshot = catalog.current().await;
        let store = SessionStore::new(MAX_ATTEMPTS);
        store.get_or_create("abc", &snapshot).await.unwrap();

        let cooling = store
            .with_exclusive("abc", |s| s.claim(&snapshot, CONTINUATION, Duration::from_secs(60)))
            .unwrap();
        assert!(matches!(cooling, Err(SessionError::CoolingDown { .. })));

        let empty = store
            .with_exclusive("abc", |s| s.claim(&snapshot, "   ", Duration::ZERO))
            .unwrap();
        assert_eq!(empty, Err(SessionError::EmptyInput));

        let unrelated = store
            .with_exclusive("abc", |s| s.claim(&snapshot, "zebra", Duration::ZERO))
            .unwrap();
        assert_eq!(unrelated, Err(SessionError::NotContinuation));

        let claim = store
            .with_exclusive("abc", |s| s.claim(&snapshot, CONTINUATION, Duration::ZERO))
            .unwrap()
            .unwrap();
        assert_eq!(claim.session_id, "abc");

        let twice = store
            .with_exclusive("abc", |s| s.claim(&snapshot, CONTINUATION, Duration::ZERO))
            .unwrap();
        assert_eq!(twice, Err(SessionError::InFlight));

        store.release(&claim);
        assert!(!store.get("abc").unwrap().in_flight());
    }

    #[tokio::test]
    async fn attempts_track_history_and_exhaust() {
        let catalog = catalog(1).await;
        let snapshot = catalog.current().await;
        let words = snapshot.get(0).unwrap().words.clone();
        let store = SessionStore::new(MAX_ATTEMPTS);
        store.get_or_create("abc", &snapshot).await.unwrap();

        for round in 1..=MAX_ATTEMPTS {
            let claim = store
                .with_exclusive("abc", |s| s.claim(&snapshot, "seed", Duration::ZERO))
                .unwrap()
                .unwrap();
            let record = store
                .finish_attempt(&claim, "seed".into(), "seed again and again".into(), &words)
                .unwrap()
                .unwrap();
            assert_eq!(record.attempts, round);

            let session = store.get("abc").unwrap();
            assert_eq!(session.attempts(), session.history().len() - 1);
            assert!(!session.in_flight());
        }

        let session = store.get("abc").unwrap();
        assert!(session.is_complete());
        assert_eq!(session.outcome(), Outcome::Exhausted);

        let rejected = store
            .with_exclusive("abc", |s| s.claim(&snapshot, "seed", Duration::ZERO))
            .unwrap();
        assert_eq!(rejected, Err(SessionError::AlreadyComplete));
    }

    #[tokio::test]
    async fn finishing_against_vanished_or_rebound_session_is_noop() {
        let catalog = catalog(1).await;
        let snapshot = catalog.current().await;
        let words = snapshot.get(0).unwrap().words.clone();
        let store = SessionStore::new(MAX_ATTEMPTS);
        store.get_or_create("abc", &snapshot).await.unwrap();

        let claim = store
            .with_exclusive("abc", |s| s.claim(&snapshot, "seed", Duration::ZERO))
            .unwrap()
            .unwrap();

        let cleared = store.clear_all().await;
        assert_eq!(cleared.len(), 1);
        let late = store
            .finish_attempt(&claim, "seed".into(), "text".into(), &words)
            .unwrap();
        assert!(late.is_none());
        assert!(store.is_empty());

        store.get_or_create("abc", &snapshot).await.unwrap();
        let late = store
            .finish_attempt(&claim, "seed".into(), "text".into(), &words)
            .unwrap();
        assert!(late.is_none());
        assert_eq!(store.get("abc").unwrap().attempts(), 0);
    }

    #[tokio::test]
    async fn record_attempt_refuses_past_limit() {
        let catalog = catalog(1).await;
        let snapshot = catalog.current().await;
        let challenge = snapshot.get(0).unwrap();
        let mut session = Session::new("x".into(), 1, 0, 0, &challenge, 1);

        session
            .record_attempt("a".into(), "b".into(), &challenge.words)
            .unwrap();
        let err = session
            .record_attempt("a".into(), "b".into(), &challenge.words)
            .unwrap_err();
        assert!(matches!(err, SessionError::Invariant(_)));

        let err = Session::new("y".into(), 2, 0, 0, &challenge, 5)
            .record_attempt("a".into(), "b".into(), &["only".to_string()])
            .unwrap_err();
        assert!(matches!(err, SessionError::Invariant(_)));
    }

    #[tokio::test]
    async fn advance_requires_completion_and_stops_at_last() {
        let catalog = catalog(2).await;
        let snapshot = catalog.current().await;
        let first = snapshot.get(0).unwrap();
        let mut session = Session::new("x".into(), 1, 0, 0, &first, 5);

        assert_eq!(session.advance(&snapshot), Err(SessionError::NotComplete));

        session
            .record_attempt("q".into(), first.quote.clone(), &first.words)
            .unwrap();
        assert_eq!(session.outcome(), Outcome::Solved);
        session.advance(&snapshot).unwrap();

        assert_eq!(session.challenge_index(), 1);
        assert_eq!(session.attempts(), 0);
        assert_eq!(session.history().len(), 1);
        assert!(!session.is_complete());

        let second = snapshot.get(1).unwrap();
        session
            .record_attempt("q".into(), second.quote.clone(), &second.words)
            .unwrap();
        let before = session.clone();
        assert_eq!(
            session.advance(&snapshot),
            Err(SessionError::NoMoreChallenges)
        );
        assert_eq!(session.challenge_index(), before.challenge_index());
        assert_eq!(session.attempts(), before.attempts());
        assert_eq!(session.history(), before.history());
        assert_eq!(session.progress(), before.progress());
    }

    #[tokio::test]
    async fn count_active_uses_recency_window() {
        let catalog = catalog(1).await;
        let snapshot = catalog.current().await;
        let store = SessionStore::new(MAX_ATTEMPTS);
        store.create(&snapshot).await.unwrap();
        store.create(&snapshot).await.unwrap();

        assert_eq!(store.count_active(Duration::from_secs(600)), 2);
        assert_eq!(store.count_active(Duration::ZERO), 0);
    }

    #[tokio::test]
    async fn concurrent_claims_admit_exactly_one() {
        let catalog = catalog(1).await;
        let snapshot = catalog.current().await;
        let store = Arc::new(SessionStore::new(MAX_ATTEMPTS));
        store.get_or_create("abc", &snapshot).await.unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let snapshot = snapshot.clone();
                tokio::spawn(async move {
                    store
                        .with_exclusive("abc", |s| s.claim(&snapshot, "seed", Duration::ZERO))
                        .unwrap()
                })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(err) => assert_eq!(err, SessionError::InFlight),
            }
        }
        assert_eq!(accepted, 1);
    }
}
