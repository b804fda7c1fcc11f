use core::{future::Future, time::Duration};

use crate::{IdGenStatus, IdGenerator, Result, SnowflakeId};

/// Extension trait for generating IDs from async code on the
/// [`tokio`](https://docs.rs/tokio) runtime.
///
/// Instead of spinning the thread when the current millisecond is exhausted,
/// the returned future sleeps for the interval the generator asks for (or
/// yields to the scheduler when asked to retry immediately).
pub trait IdGeneratorAsyncExt {
    /// Returns a future that resolves to the next available ID.
    ///
    /// # Errors
    ///
    /// Resolves to an error if the generator reports one, e.g. a clock
    /// rollback. The future does not retry on errors.
    fn next_id_async(&self) -> impl Future<Output = Result<SnowflakeId>> + Send;
}

impl<G> IdGeneratorAsyncExt for G
where
    G: IdGenerator + Sync,
{
    fn next_id_async(&self) -> impl Future<Output = Result<SnowflakeId>> + Send {
        async move {
            loop {
                match self.poll_id()? {
                    IdGenStatus::Ready { id } => return Ok(id),
                    IdGenStatus::Pending { yield_for: 0 } => tokio::task::yield_now().await,
                    IdGenStatus::Pending { yield_for } => {
                        tokio::time::sleep(Duration::from_millis(yield_for)).await;
                    }
                }
            }
        }
    }
}
