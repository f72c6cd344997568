use crate::error::RotationError;
use crate::loom::sync::{Condvar, Mutex, MutexGuard};
use crate::loom::{lock, wait_while};

use std::fmt;

/// Enforces strict round-robin turns between a fixed set of participants.
///
/// Each participant runs on its own thread and calls
/// [`acquire_turn`](Self::acquire_turn) with its id. The call blocks until
/// the rotation reaches that id; the holder performs its action while
/// holding the returned [`Turn`], then [`advance`](Turn::advance)s it to the
/// next participant. The global order of actions is therefore always
/// `p0, p1, ..., pk, p0, p1, ...` regardless of how the OS schedules the
/// threads.
///
/// ```rust
/// use pactum::TurnAlternator;
/// use std::sync::{Arc, Mutex};
/// use std::thread;
///
/// let turns = Arc::new(TurnAlternator::new(['a', 'b'], &'a').unwrap());
/// let log = Arc::new(Mutex::new(String::new()));
///
/// let threads: Vec<_> = ['a', 'b']
///     .into_iter()
///     .map(|id| {
///         let (turns, log) = (turns.clone(), log.clone());
///         thread::spawn(move || {
///             for _ in 0..3 {
///                 turns.take_turn(&id, || log.lock().unwrap().push(id)).unwrap();
///             }
///         })
///     })
///     .collect();
///
/// for thread in threads {
///     thread.join().unwrap();
/// }
/// assert_eq!(*log.lock().unwrap(), "ababab");
/// ```
pub struct TurnAlternator<P> {
    /// Rotation order.
    participants: Vec<P>,

    rotation: Mutex<Rotation>,

    /// Woken on every hand-off; waiters re-check whose turn it is.
    condvar: Condvar,
}

struct Rotation {
    /// Index into `participants` of the current turn holder.
    current: usize,

    /// Number of hand-offs so far.
    generation: u64,
}

impl<P: PartialEq> TurnAlternator<P> {
    /// Creates a rotation over `participants`, in order, starting with
    /// `starter`.
    ///
    /// # Errors
    ///
    /// Fails if the list is empty, contains the same id twice, or does not
    /// contain `starter`.
    pub fn new(
        participants: impl IntoIterator<Item = P>,
        starter: &P,
    ) -> Result<Self, RotationError> {
        let participants: Vec<P> = participants.into_iter().collect();

        if participants.is_empty() {
            return Err(RotationError::Empty);
        }

        let has_duplicate = participants
            .iter()
            .enumerate()
            .any(|(i, p)| participants[i + 1..].contains(p));
        if has_duplicate {
            return Err(RotationError::Duplicate);
        }

        let current = participants
            .iter()
            .position(|p| p == starter)
            .ok_or(RotationError::UnknownStarter)?;

        Ok(Self {
            participants,
            rotation: Mutex::new(Rotation {
                current,
                generation: 0,
            }),
            condvar: Condvar::new(),
        })
    }

    /// Blocks until it is `id`'s turn.
    ///
    /// The returned [`Turn`] keeps the alternator locked while the holder
    /// acts. Wakeups are predicate checked, so spurious wakeups and
    /// hand-offs to other participants put the caller back to sleep.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::UnknownParticipant`] if `id` is not part of
    /// the rotation.
    ///
    /// # Deadlocks
    ///
    /// While the [`Turn`] is alive, [`current`](Self::current),
    /// [`generation`](Self::generation) and the `Debug` impl block on the
    /// same lock; calling them from the holder's thread never returns. Use
    /// [`Turn::participant`] and [`Turn::generation`] instead.
    pub fn acquire_turn(&self, id: &P) -> Result<Turn<'_, P>, RotationError> {
        let index = self
            .participants
            .iter()
            .position(|p| p == id)
            .ok_or(RotationError::UnknownParticipant)?;

        let rotation = wait_while(&self.condvar, lock(&self.rotation), |rotation| {
            rotation.current != index
        });

        Ok(Turn {
            alternator: self,
            rotation,
        })
    }

    /// Waits for `id`'s turn, runs `action`, and passes the turn on.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::UnknownParticipant`] if `id` is not part of
    /// the rotation.
    ///
    /// # Deadlocks
    ///
    /// `action` runs with the alternator locked. It must not call
    /// [`current`](Self::current), [`generation`](Self::generation), the
    /// `Debug` impl or `acquire_turn` on the same alternator.
    pub fn take_turn<R>(&self, id: &P, action: impl FnOnce() -> R) -> Result<R, RotationError> {
        let turn = self.acquire_turn(id)?;
        let out = action();
        turn.advance();
        Ok(out)
    }
}

impl<P> TurnAlternator<P> {
    /// The participants in rotation order.
    pub fn participants(&self) -> &[P] {
        &self.participants
    }

    /// Number of completed hand-offs.
    pub fn generation(&self) -> u64 {
        lock(&self.rotation).generation
    }
}

impl<P: Clone> TurnAlternator<P> {
    /// The participant whose turn it is.
    pub fn current(&self) -> P {
        let current = lock(&self.rotation).current;
        self.participants[current].clone()
    }
}

impl<P: fmt::Debug> fmt::Debug for TurnAlternator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rotation = lock(&self.rotation);
        f.debug_struct("TurnAlternator")
            .field("participants", &self.participants)
            .field("current", &self.participants[rotation.current])
            .field("generation", &rotation.generation)
            .finish()
    }
}

/// The turn of one participant of a [`TurnAlternator`].
///
/// Holds the alternator's lock. Call [`advance`](Self::advance) once the
/// action is done; dropping a `Turn` without advancing releases the lock
/// but keeps the turn with the same participant.
#[must_use = "dropping a turn without advancing it keeps the turn with the holder"]
pub struct Turn<'a, P> {
    alternator: &'a TurnAlternator<P>,
    rotation: MutexGuard<'a, Rotation>,
}

impl<P> Turn<'_, P> {
    /// The participant holding the turn.
    pub fn participant(&self) -> &P {
        &self.alternator.participants[self.rotation.current]
    }

    /// Generation at which the turn was taken.
    pub fn generation(&self) -> u64 {
        self.rotation.generation
    }

    /// Hands the turn to the next participant and wakes every waiter.
    ///
    /// The new holder is published and notified before the lock is
    /// released.
    pub fn advance(mut self) {
        let len = self.alternator.participants.len();
        self.rotation.current = (self.rotation.current + 1) % len;
        self.rotation.generation = self.rotation.generation.wrapping_add(1);

        tracing::trace!(
            next = self.rotation.current,
            generation = self.rotation.generation,
            "turn advanced"
        );

        self.alternator.condvar.notify_all();
    }
}
