use std::fmt;

use itertools::Itertools;
use thiserror::Error;

use crate::core::method::MethodIdentity;

#[derive(Debug, Error)]
pub enum MulticastError {
    /// The host the proxy was bound to no longer exists.
    #[error("Slot provider was released")]
    SlotReleased,

    #[error(transparent)]
    ListenerFailures(#[from] DispatchFailures),
}

/// Error returned by one listener while a call was fanned out.
#[derive(Debug)]
pub struct ListenerFailure {
    /// Position of the listener in the dispatch order, original delegate first.
    pub position: usize,
    /// Whether this listener's answer was the one to be returned to the host.
    pub first_responder: bool,
    pub error: eyre::Report,
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener #{}", self.position)?;
        if self.first_responder {
            f.write_str(" (first responder)")?;
        }
        write!(f, ": {:#}", self.error)
    }
}

/// All failures of one dispatch, reported once every listener was called.
#[derive(Debug, Error)]
#[error(
    "{} of {} listener(s) failed on {}: {}",
    .failures.len(),
    .invoked,
    .method,
    .failures.iter().join("; ")
)]
pub struct DispatchFailures {
    pub method: MethodIdentity,
    pub invoked: usize,
    pub failures: Vec<ListenerFailure>,
}

impl DispatchFailures {
    pub fn first_responder_failed(&self) -> bool {
        self.failures.iter().any(|f| f.first_responder)
    }
}
