use crate::{Error, IdGenStatus, Result, SnowflakeId};

/// A minimal interface for generating Snowflake IDs.
///
/// Implementors are expected to be shared across threads (`&self` receivers)
/// and to guarantee that, for a single instance, IDs returned in call order
/// strictly increase.
pub trait IdGenerator {
    /// The node ID encoded into every ID this generator issues.
    fn node_id(&self) -> u64;

    /// Attempts to generate the next ID without waiting.
    ///
    /// The returned [`IdGenStatus`] contains either:
    /// - the newly generated ID, or
    /// - a duration to yield/sleep if the sequence for the current
    ///   millisecond is exhausted.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackwards`] if the time source reports a
    ///   millisecond earlier than the last issued ID. No state is modified.
    /// - [`Error::TimestampOverflow`] if the time source is past the range of
    ///   the timestamp field.
    fn poll_id(&self) -> Result<IdGenStatus>;

    /// Generates the next ID, waiting out sequence exhaustion.
    ///
    /// The wait is bounded by the time it takes the clock to reach the next
    /// millisecond.
    ///
    /// # Errors
    ///
    /// Same as [`IdGenerator::poll_id`]. A clock rollback is reported, never
    /// waited out.
    fn next_id(&self) -> Result<SnowflakeId> {
        loop {
            match self.poll_id()? {
                IdGenStatus::Ready { id } => return Ok(id),
                IdGenStatus::Pending { yield_for: 0 } => core::hint::spin_loop(),
                IdGenStatus::Pending { .. } => std::thread::yield_now(),
            }
        }
    }
}

/// Checks `node_id` against the node ID field width.
pub(crate) fn validate_node_id(node_id: i64) -> Result<u64> {
    let max = SnowflakeId::max_node_id();
    match u64::try_from(node_id) {
        Ok(valid) if valid <= max => Ok(valid),
        _ => Err(Error::InvalidNodeId { node_id, max }),
    }
}

/// Packs an ID, refusing timestamps the layout cannot hold.
pub(crate) fn compose(millis: u64, node_id: u64, sequence: u64) -> Result<SnowflakeId> {
    if millis > SnowflakeId::max_timestamp() {
        return Err(Error::TimestampOverflow { millis });
    }
    Ok(SnowflakeId::from_components(millis, node_id, sequence))
}

#[cold]
#[inline(never)]
pub(crate) fn cold_clock_behind(last: u64, now: u64) -> Error {
    #[cfg(feature = "tracing")]
    tracing::warn!(last, now, behind_by = last - now, "clock moved backwards");
    Error::ClockMovedBackwards { last, now }
}
