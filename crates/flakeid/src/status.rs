use crate::SnowflakeId;

/// Outcome of a non-blocking generation attempt.
///
/// - [`IdGenStatus::Ready`] carries a freshly issued ID.
/// - [`IdGenStatus::Pending`] means no ID could be issued right now; the caller
///   should back off for `yield_for` milliseconds and poll again. Both
///   generators report an exhausted millisecond as `yield_for: 1`.
///   [`AtomicGenerator`] also reports a lost CAS race as `yield_for: 0`,
///   meaning "retry immediately".
///
/// [`AtomicGenerator`]: crate::AtomicGenerator
///
/// # Example
///
/// ```
/// use flakeid::{IdGenStatus, IdGenerator, LockGenerator, TimeSource};
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1
///     }
/// }
///
/// let generator = LockGenerator::new(1, FixedTime).unwrap();
/// match generator.poll_id().unwrap() {
///     IdGenStatus::Ready { id } => println!("ID: {}", id.timestamp()),
///     IdGenStatus::Pending { yield_for } => println!("Back off for: {yield_for}ms"),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated ID.
        id: SnowflakeId,
    },
    /// The sequence for the current millisecond is exhausted, or a concurrent
    /// update won the race.
    Pending {
        /// Milliseconds to wait before polling again.
        yield_for: u64,
    },
}

impl IdGenStatus {
    /// Returns the ID if one was issued.
    pub const fn ready(self) -> Option<SnowflakeId> {
        match self {
            Self::Ready { id } => Some(id),
            Self::Pending { .. } => None,
        }
    }
}
