/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `flakeid` can emit.
///
/// Construction errors ([`Error::InvalidNodeId`], [`Error::EpochInFuture`])
/// are permanent for the given input. Generation errors
/// ([`Error::ClockMovedBackwards`]) are transient and leave the generator
/// untouched, so the same instance may be retried once the
/// clock has caught up.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The node ID is negative or does not fit in the node ID field.
    #[error("invalid node id {node_id}: must be within 0..={max}")]
    InvalidNodeId {
        /// The rejected node ID.
        node_id: i64,
        /// The largest node ID the layout can encode.
        max: u64,
    },

    /// The time source reported a millisecond earlier than the one used for
    /// the most recently issued ID.
    ///
    /// Issuing an ID now could produce a value smaller than one already handed
    /// out, so the generator refuses. Callers may retry after
    /// [`Error::behind_by`] milliseconds.
    #[error("clock moved backwards: last issued at {last}ms, clock now reads {now}ms")]
    ClockMovedBackwards {
        /// Timestamp of the last issued ID.
        last: u64,
        /// Timestamp currently reported by the time source.
        now: u64,
    },

    /// The time source is past the last millisecond the timestamp field can
    /// represent.
    #[error("timestamp {millis}ms does not fit in the timestamp field")]
    TimestampOverflow {
        /// The timestamp that overflowed.
        millis: u64,
    },

    /// A clock was configured with an epoch later than the current system
    /// time. Such a clock would read `0` until the epoch arrives, which stalls
    /// generation once the first millisecond's sequence is used up.
    #[error("epoch {epoch}ms is later than the current time {now}ms")]
    EpochInFuture {
        /// The rejected epoch, in milliseconds since 1970-01-01 UTC.
        epoch: u64,
        /// The system time when the epoch was checked, in the same unit.
        now: u64,
    },

    /// An externally supplied value is not a valid ID.
    #[error("invalid id: {reason}")]
    InvalidId {
        /// What was wrong with the value.
        reason: &'static str,
    },
}

impl Error {
    /// For [`Error::ClockMovedBackwards`], how many milliseconds the clock has
    /// to advance before generation can resume. Returns `None` for every other
    /// variant.
    pub const fn behind_by(&self) -> Option<u64> {
        match self {
            Self::ClockMovedBackwards { last, now } => Some(last.saturating_sub(*now)),
            _ => None,
        }
    }

    /// Whether retrying the same call later can succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ClockMovedBackwards { .. })
    }
}
