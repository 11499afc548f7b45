//! Relays one guess through the text generator and folds the result into the session.

use std::{io, sync::Arc};

use futures::{StreamExt, stream::BoxStream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use crate::{
    dao::generator::{GenerationError, GenerationEvent, GenerationResult},
    error::ServiceError,
    services::archive_service,
    state::{
        SharedState,
        challenge::Challenge,
        session::{Claim, SessionError},
        stream::{StreamEvent, StreamPhase, StreamTracker},
    },
};

/// Body chunks handed to the HTTP layer. An `Err` aborts the chunked response.
pub type GuessStream = ReceiverStream<Result<String, io::Error>>;

type Upstream = BoxStream<'static, GenerationResult<GenerationEvent>>;

const RELAY_BUFFER: usize = 16;

/// Clears the in-flight flag on every exit path, panics included.
struct InFlightGuard {
    state: SharedState,
    claim: Option<Claim>,
}

impl InFlightGuard {
    fn new(state: SharedState, claim: Claim) -> Self {
        Self {
            state,
            claim: Some(claim),
        }
    }

    fn claim(&self) -> Option<&Claim> {
        self.claim.as_ref()
    }

    /// The flag was already cleared by recording the attempt.
    fn disarm(&mut self) {
        self.claim = None;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(claim) = self.claim.take() {
            self.state.sessions().release(&claim);
            debug!(session_id = %claim.session_id, "in-flight claim released");
        }
    }
}

/// Validate a guess, start generation and return the stream of fragments.
///
/// Nothing is streamed until the generator produced its first fragment, so an
/// upstream failure at that point still surfaces as an error status.
pub async fn submit_guess(
    state: &SharedState,
    session_id: Option<&str>,
    input: String,
) -> Result<GuessStream, ServiceError> {
    let id = session_id.ok_or_else(|| ServiceError::Unauthorized("missing session".into()))?;
    let catalog = state.catalog().current().await;
    let cooldown = state.config().cooldown;

    let claim = state
        .sessions()
        .with_exclusive(id, |session| session.claim(&catalog, &input, cooldown))
        .ok_or(SessionError::NotFound)??;
    let guard = InFlightGuard::new(state.clone(), claim.clone());
    let challenge = catalog.get(claim.challenge_index)?;

    let mut tracker = StreamTracker::new();
    advance(&mut tracker, StreamEvent::Requested);
    info!(session_id = %id, challenge = claim.challenge_index, "generation requested");

    let mut upstream = state.generator().stream(input.clone());
    let first = match upstream.next().await {
        Some(Ok(event)) => event,
        Some(Err(err)) => {
            reject(&mut tracker, id, &err);
            return Err(err.into());
        }
        None => {
            reject(&mut tracker, id, &GenerationError::Empty);
            return Err(GenerationError::Empty.into());
        }
    };
    if matches!(&first, GenerationEvent::Completed(text) if text.trim().is_empty()) {
        reject(&mut tracker, id, &GenerationError::Empty);
        return Err(GenerationError::Empty.into());
    }

    let (tx, rx) = mpsc::channel(RELAY_BUFFER);
    let relay = Relay {
        state: state.clone(),
        guard,
        challenge,
        input,
        tracker,
        tx,
    };
    tokio::spawn(relay.run(first, upstream));

    Ok(ReceiverStream::new(rx))
}

struct Relay {
    state: SharedState,
    guard: InFlightGuard,
    challenge: Arc<Challenge>,
    input: String,
    tracker: StreamTracker,
    tx: mpsc::Sender<Result<String, io::Error>>,
}

impl Relay {
    async fn run(mut self, first: GenerationEvent, mut upstream: Upstream) {
        let Some(session_id) = self.guard.claim().map(|claim| claim.session_id.clone()) else {
            return;
        };

        let mut text = String::new();
        let mut next = Some(Ok(first));
        let completed = loop {
            match next {
                Some(Ok(GenerationEvent::Fragment(fragment))) => {
                    advance(&mut self.tracker, StreamEvent::Fragment);
                    text.push_str(&fragment);
                    if self.tx.send(Ok(fragment)).await.is_err() {
                        self.abort(&session_id);
                        return;
                    }
                }
                Some(Ok(GenerationEvent::Completed(full))) => break Some(full),
                Some(Err(err)) => {
                    reject(&mut self.tracker, &session_id, &err);
                    let _ = self.tx.send(Err(io::Error::other(err))).await;
                    return;
                }
                None => break None,
            }

            let polled = tokio::select! {
                _ = self.tx.closed() => None,
                item = upstream.next() => Some(item),
            };
            let Some(item) = polled else {
                self.abort(&session_id);
                return;
            };
            next = item;
        };
        // Dropping the upstream closes the backend connection before we touch the session.
        drop(upstream);

        let content = completed.filter(|full| !full.is_empty()).unwrap_or(text);
        if content.trim().is_empty() {
            reject(&mut self.tracker, &session_id, &GenerationError::Empty);
            let _ = self.tx.send(Err(io::Error::other(GenerationError::Empty))).await;
            return;
        }
        // Backends that only report the full text still owe the client one chunk.
        if self.tracker.fragments() == 0 {
            if self.tx.send(Ok(content.clone())).await.is_err() {
                self.abort(&session_id);
                return;
            }
            advance(&mut self.tracker, StreamEvent::Fragment);
        }
        advance(&mut self.tracker, StreamEvent::Ended);

        self.finalize(&session_id, content).await;
    }

    async fn finalize(&mut self, session_id: &str, content: String) {
        let Some(claim) = self.guard.claim().cloned() else {
            return;
        };
        let input = std::mem::take(&mut self.input);

        match self
            .state
            .sessions()
            .finish_attempt(&claim, input, content, &self.challenge.words)
        {
            Ok(Some(record)) => {
                self.guard.disarm();
                advance(&mut self.tracker, StreamEvent::Recorded);
                info!(
                    session_id = %session_id,
                    revealed = record.revealed,
                    attempts = record.attempts,
                    fragments = self.tracker.fragments(),
                    "attempt recorded"
                );
                if let Some(finished) = record.finished {
                    if let Err(err) = archive_service::archive_session(&self.state, &finished).await
                    {
                        warn!(session_id = %session_id, error = %err, "failed to archive finished session");
                    }
                }
            }
            Ok(None) => {
                self.guard.disarm();
                advance(&mut self.tracker, StreamEvent::Recorded);
                info!(session_id = %session_id, "session rotated away; result dropped");
            }
            Err(err) => {
                advance(&mut self.tracker, StreamEvent::Rejected);
                error!(session_id = %session_id, error = %err, "failed to record attempt");
                let _ = self.tx.send(Err(io::Error::other(err))).await;
            }
        }
    }

    fn abort(&mut self, session_id: &str) {
        advance(&mut self.tracker, StreamEvent::Disconnected);
        info!(
            session_id = %session_id,
            fragments = self.tracker.fragments(),
            "client disconnected; attempt discarded"
        );
    }
}

fn reject(tracker: &mut StreamTracker, session_id: &str, err: &GenerationError) {
    if tracker.phase() != StreamPhase::Finalizing {
        advance(tracker, StreamEvent::Ended);
    }
    advance(tracker, StreamEvent::Rejected);
    warn!(session_id = %session_id, error = %err, "generation failed; attempt not consumed");
}

fn advance(tracker: &mut StreamTracker, event: StreamEvent) {
    if let Err(err) = tracker.apply(event) {
        error!(error = %err, "stream phase tracking out of order");
    }
}
