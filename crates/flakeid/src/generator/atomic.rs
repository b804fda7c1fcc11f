use core::cmp;

use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    IdGenStatus, IdGenerator, Result, SnowflakeId, TimeSource,
    generator::interface::{cold_clock_behind, compose, validate_node_id},
};

/// Packed-state value meaning "no ID issued yet". The reserved bit is set, so
/// no real ID can ever equal it.
const NEVER: u64 = u64::MAX;

/// A lock-free Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The last issued ID is kept in a single [`AtomicU64`]; each call computes
/// the successor from the loaded value and publishes it with one
/// compare-and-swap. A lost race surfaces as [`IdGenStatus::Pending`] with
/// `yield_for: 0`, meaning "retry immediately".
///
/// Gives the same monotonicity and rollover guarantees as
/// [`LockGenerator`], trading fairness for throughput under contention.
///
/// [`LockGenerator`]: crate::LockGenerator
#[derive(Debug)]
pub struct AtomicGenerator<T>
where
    T: TimeSource,
{
    node_id: u64,
    state: AtomicU64,
    time: T,
}

impl<T> AtomicGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`AtomicGenerator`] for `node_id`, reading time from
    /// `time`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNodeId`] if `node_id` is negative or greater
    /// than [`SnowflakeId::max_node_id`].
    ///
    /// # Example
    /// ```
    /// use flakeid::{AtomicGenerator, IdGenerator, SystemClock};
    ///
    /// let generator = AtomicGenerator::new(3, SystemClock::default()).unwrap();
    /// let a = generator.next_id().unwrap();
    /// let b = generator.next_id().unwrap();
    /// assert!(a < b);
    /// ```
    ///
    /// [`Error::InvalidNodeId`]: crate::Error::InvalidNodeId
    pub fn new(node_id: i64, time: T) -> Result<Self> {
        let node_id = validate_node_id(node_id)?;
        Ok(Self {
            node_id,
            state: AtomicU64::new(NEVER),
            time,
        })
    }

    /// The node ID encoded into every issued ID.
    pub const fn node_id(&self) -> u64 {
        self.node_id
    }

    /// Attempts to generate the next ID without waiting.
    ///
    /// # Returns
    /// - `Ok(IdGenStatus::Ready { id })`: A new ID is available
    /// - `Ok(IdGenStatus::Pending { yield_for: 1 })`: the millisecond is
    ///   exhausted
    /// - `Ok(IdGenStatus::Pending { yield_for: 0 })`: another thread won the
    ///   CAS race
    ///
    /// # Errors
    /// - [`Error::ClockMovedBackwards`] if the clock reads earlier than the
    ///   last issued ID.
    /// - [`Error::TimestampOverflow`] if the clock is past the layout's range.
    ///
    /// [`Error::ClockMovedBackwards`]: crate::Error::ClockMovedBackwards
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn poll_id(&self) -> Result<IdGenStatus> {
        // Load before reading the clock: a state published by another thread
        // must never look like it is ahead of our own clock reading.
        let current_raw = self.state.load(Ordering::Acquire);
        let now = self.time.current_millis();

        let sequence = if current_raw == NEVER {
            0
        } else {
            let current = SnowflakeId::from_raw(current_raw);
            let last = current.timestamp();
            match now.cmp(&last) {
                cmp::Ordering::Equal => {
                    if current.sequence() >= SnowflakeId::max_sequence() {
                        return Ok(IdGenStatus::Pending { yield_for: 1 });
                    }
                    current.sequence() + 1
                }
                cmp::Ordering::Greater => 0,
                cmp::Ordering::Less => return Err(cold_clock_behind(last, now)),
            }
        };

        let next = compose(now, self.node_id, sequence)?;

        if self
            .state
            .compare_exchange(
                current_raw,
                next.to_raw(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
        {
            Ok(IdGenStatus::Ready { id: next })
        } else {
            Ok(IdGenStatus::Pending { yield_for: 0 })
        }
    }
}

impl<T> IdGenerator for AtomicGenerator<T>
where
    T: TimeSource,
{
    fn node_id(&self) -> u64 {
        self.node_id()
    }

    fn poll_id(&self) -> Result<IdGenStatus> {
        self.poll_id()
    }
}
