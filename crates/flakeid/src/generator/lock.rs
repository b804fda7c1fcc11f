use core::cmp::Ordering;

use parking_lot::Mutex;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    IdGenStatus, IdGenerator, Result, SnowflakeId, TimeSource,
    generator::interface::{cold_clock_behind, compose, validate_node_id},
};

/// Generation state guarded by the generator's lock.
#[derive(Debug, Default)]
struct State {
    /// Millisecond of the last issued ID; `None` until the first ID.
    last_millis: Option<u64>,
    /// Sequence of the last issued ID within `last_millis`.
    sequence: u64,
}

impl State {
    /// Three-way step of the generation algorithm. Only mutates `self` when an
    /// ID is issued.
    fn advance(&mut self, node_id: u64, now: u64) -> Result<IdGenStatus> {
        let sequence = match self.last_millis {
            None => 0,
            Some(last) => match now.cmp(&last) {
                Ordering::Equal => {
                    if self.sequence >= SnowflakeId::max_sequence() {
                        return Ok(IdGenStatus::Pending { yield_for: 1 });
                    }
                    self.sequence + 1
                }
                Ordering::Greater => 0,
                Ordering::Less => return Err(cold_clock_behind(last, now)),
            },
        };

        let id = compose(now, node_id, sequence)?;
        self.last_millis = Some(now);
        self.sequence = sequence;
        Ok(IdGenStatus::Ready { id })
    }
}

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// All generation state lives behind a single [`parking_lot::Mutex`]. Reading
/// the clock, comparing it with the last issued millisecond, updating the
/// sequence and packing the ID all happen while the lock is held, so no two
/// callers can ever observe the same `(millisecond, sequence)` pair.
///
/// Create one per node and share it by reference or through an `Arc`.
///
/// ## Recommended When
/// - Fair access across threads is important
/// - You want sequence exhaustion to be waited out inside the critical section
///
/// ## See Also
/// - [`AtomicGenerator`]
///
/// [`AtomicGenerator`]: crate::AtomicGenerator
#[derive(Debug)]
pub struct LockGenerator<T>
where
    T: TimeSource,
{
    node_id: u64,
    state: Mutex<State>,
    time: T,
}

impl<T> LockGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`LockGenerator`] for `node_id`, reading time from
    /// `time`.
    ///
    /// The generator starts with no last-issued millisecond, so the first ID
    /// always carries sequence `0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNodeId`] if `node_id` is negative or greater
    /// than [`SnowflakeId::max_node_id`].
    ///
    /// # Example
    /// ```
    /// use flakeid::{IdGenerator, LockGenerator, SystemClock};
    ///
    /// let generator = LockGenerator::new(7, SystemClock::default()).unwrap();
    /// let id = generator.next_id().unwrap();
    /// assert_eq!(id.node_id(), 7);
    ///
    /// assert!(LockGenerator::new(1024, SystemClock::default()).is_err());
    /// ```
    ///
    /// [`Error::InvalidNodeId`]: crate::Error::InvalidNodeId
    pub fn new(node_id: i64, time: T) -> Result<Self> {
        let node_id = validate_node_id(node_id)?;
        Ok(Self {
            node_id,
            state: Mutex::new(State::default()),
            time,
        })
    }

    /// The node ID encoded into every issued ID.
    pub const fn node_id(&self) -> u64 {
        self.node_id
    }

    /// Generates the next ID.
    ///
    /// If the current millisecond's 4096 sequence values are used up, the
    /// call spins while still holding the lock until the clock reaches the
    /// next millisecond, then restarts the sequence at zero. Other callers
    /// queue behind it.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackwards`] if the clock reads earlier than the
    ///   last issued ID, including while waiting for the next millisecond.
    /// - [`Error::TimestampOverflow`] if the clock is past the layout's range.
    ///
    /// [`Error::ClockMovedBackwards`]: crate::Error::ClockMovedBackwards
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        let mut state = self.state.lock();
        loop {
            let now = self.time.current_millis();
            match state.advance(self.node_id, now)? {
                IdGenStatus::Ready { id } => return Ok(id),
                IdGenStatus::Pending { .. } => core::hint::spin_loop(),
            }
        }
    }

    /// Attempts to generate the next ID without waiting.
    ///
    /// Returns [`IdGenStatus::Pending`] with `yield_for: 1` when the current
    /// millisecond is exhausted; the lock is released before returning.
    ///
    /// # Errors
    ///
    /// Same as [`Self::next_id`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn poll_id(&self) -> Result<IdGenStatus> {
        let mut state = self.state.lock();
        let now = self.time.current_millis();
        state.advance(self.node_id, now)
    }
}

impl<T> IdGenerator for LockGenerator<T>
where
    T: TimeSource,
{
    fn node_id(&self) -> u64 {
        self.node_id()
    }

    fn poll_id(&self) -> Result<IdGenStatus> {
        self.poll_id()
    }

    fn next_id(&self) -> Result<SnowflakeId> {
        self.next_id()
    }
}
