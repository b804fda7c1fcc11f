use core::time::Duration;
use std::time::SystemTime;

use crate::{CUSTOM_EPOCH, Error, Result, TimeSource};

/// Wall-clock time source offset from a fixed epoch.
///
/// Every call reads `SystemTime::now()`, so adjustments to the system clock
/// (NTP steps, manual changes) are visible to the generator. That is what
/// lets a generator notice a rollback and report
/// [`Error::ClockMovedBackwards`] instead of issuing a smaller ID.
///
/// The epoch must not be later than the system time at construction. If the
/// system clock is later stepped back past the epoch, the clock reads `0`,
/// which a generator that has already issued IDs reports as a rollback.
///
/// [`Error::ClockMovedBackwards`]: crate::Error::ClockMovedBackwards
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemClock {
    epoch: Duration,
}

impl Default for SystemClock {
    /// A clock aligned to [`CUSTOM_EPOCH`].
    fn default() -> Self {
        Self {
            epoch: CUSTOM_EPOCH,
        }
    }
}

impl SystemClock {
    /// A clock whose zero point is `epoch`, given as a [`Duration`] since
    /// 1970-01-01 UTC.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EpochInFuture`] if `epoch` is later than the current
    /// system time.
    ///
    /// # Example
    ///
    /// ```
    /// use core::time::Duration;
    /// use flakeid::{SystemClock, TimeSource, TWITTER_EPOCH};
    ///
    /// let clock = SystemClock::with_epoch(TWITTER_EPOCH).unwrap();
    /// assert!(clock.current_millis() > 0);
    ///
    /// assert!(SystemClock::with_epoch(Duration::from_millis(u64::MAX)).is_err());
    /// ```
    pub fn with_epoch(epoch: Duration) -> Result<Self> {
        let now = since_unix_epoch();
        if epoch > now {
            return Err(Error::EpochInFuture {
                epoch: as_millis(epoch),
                now: as_millis(now),
            });
        }
        Ok(Self { epoch })
    }

    /// The configured epoch.
    pub const fn epoch(&self) -> Duration {
        self.epoch
    }
}

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        since_unix_epoch()
            .checked_sub(self.epoch)
            .map_or(0, as_millis)
    }
}

fn since_unix_epoch() -> Duration {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
