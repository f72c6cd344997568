//! Error types.
//!
//! A rejected [`Deferred`](crate::Deferred) carries an [`Error`]. Because a
//! single rejection flows into every dependent deferred, `Error` is cheap to
//! clone: task errors and panic messages are reference counted.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The reason a deferred computation was rejected.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The submitted function returned an error.
    #[error("task failed: {0}")]
    TaskFailure(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// The submitted function panicked.
    ///
    /// The worker thread that ran it keeps serving its queue.
    #[error("task panicked: {0}")]
    Panicked(Arc<str>),

    /// `any_of` or `all_of` was called without any deferred.
    #[error("cannot aggregate an empty set of deferred values")]
    EmptyAggregate,

    /// The executor the work was bound to has been shut down.
    #[error("executor was closed")]
    Closed,
}

impl Error {
    /// Wraps an arbitrary error as a [`TaskFailure`](Error::TaskFailure).
    pub fn failure<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::TaskFailure(Arc::new(error))
    }

    /// Creates a [`TaskFailure`](Error::TaskFailure) from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Error::failure(Message(message.to_string()))
    }

    /// Converts a panic payload caught by `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message: Arc<str> = if let Some(s) = payload.downcast_ref::<&'static str>() {
            Arc::from(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Arc::from(s.as_str())
        } else {
            Arc::from("Box<dyn Any>")
        };

        Error::Panicked(message)
    }

    /// Returns `true` for [`TaskFailure`](Error::TaskFailure) and
    /// [`Panicked`](Error::Panicked), i.e. errors raised by user code.
    pub fn is_task_error(&self) -> bool {
        matches!(self, Error::TaskFailure(_) | Error::Panicked(_))
    }
}

impl From<Closed> for Error {
    fn from(_: Closed) -> Self {
        Error::Closed
    }
}

/// Returned by [`Executor::execute`](crate::Executor::execute) when the
/// executor no longer accepts work.
#[derive(Error, Copy, Clone, Debug, Eq, PartialEq)]
#[error("closed")]
pub struct Closed(pub(crate) ());

/// Errors raised while building or using a [`TurnAlternator`](crate::TurnAlternator).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationError {
    /// The rotation has no participants.
    #[error("rotation has no participants")]
    Empty,

    /// The same participant appears twice in the rotation.
    #[error("participant appears more than once in the rotation")]
    Duplicate,

    /// The designated starter is not part of the rotation.
    #[error("starter is not a participant of the rotation")]
    UnknownStarter,

    /// A turn was requested for an id outside the rotation.
    #[error("unknown participant")]
    UnknownParticipant,
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}
