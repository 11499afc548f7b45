use thiserror::Error;

/// Phases a single generation request goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Nothing started yet.
    Idle,
    /// Session claimed and generation requested; no fragment received.
    Requesting,
    /// Fragments are being relayed to the client.
    Streaming,
    /// Generation ended; folding the result into the session.
    Finalizing,
    /// Attempt recorded.
    Done,
    /// Upstream failure; attempt not consumed.
    Failed,
    /// Client went away; attempt not consumed.
    Aborted,
}

/// Events driving a [`StreamPhase`] forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    /// Preconditions passed and the generator was called.
    Requested,
    /// A fragment arrived from the generator.
    Fragment,
    /// The generator signalled the end of its output, successfully or not.
    Ended,
    /// The result was written to the session.
    Recorded,
    /// The generator failed or produced nothing.
    Rejected,
    /// The client disconnected.
    Disconnected,
}

/// Error returned when an event does not apply to the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid stream transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidStreamTransition {
    /// Phase the request was in.
    pub from: StreamPhase,
    /// Event that was refused.
    pub event: StreamEvent,
}

impl StreamPhase {
    /// Compute the phase reached by applying `event`.
    pub fn next(self, event: StreamEvent) -> Result<StreamPhase, InvalidStreamTransition> {
        use StreamEvent as E;
        use StreamPhase as P;

        let next = match (self, event) {
            (P::Idle, E::Requested) => P::Requesting,
            (P::Requesting | P::Streaming, E::Fragment) => P::Streaming,
            (P::Requesting | P::Streaming, E::Ended) => P::Finalizing,
            (P::Requesting | P::Streaming, E::Disconnected) => P::Aborted,
            (P::Finalizing, E::Recorded) => P::Done,
            (P::Finalizing, E::Rejected) => P::Failed,
            (from, event) => return Err(InvalidStreamTransition { from, event }),
        };
        Ok(next)
    }

    /// Whether no further event is accepted.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Aborted)
    }
}

/// Tracks the phase of one request, refusing out-of-order events.
#[derive(Debug)]
pub struct StreamTracker {
    phase: StreamPhase,
    fragments: usize,
}

impl StreamTracker {
    /// Start tracking from [`StreamPhase::Idle`].
    pub fn new() -> Self {
        Self {
            phase: StreamPhase::Idle,
            fragments: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Number of fragments relayed so far.
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Apply `event`, returning the new phase.
    pub fn apply(&mut self, event: StreamEvent) -> Result<StreamPhase, InvalidStreamTransition> {
        self.phase = self.phase.next(event)?;
        if event == StreamEvent::Fragment {
            self.fragments += 1;
        }
        Ok(self.phase)
    }
}

impl Default for StreamTracker {
    fn default() -> Self {
        Self::new()
    }
}
