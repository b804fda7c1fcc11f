use core::time::Duration;
use std::io::Write;

use anyhow::anyhow;
use flakeid::{AtomicGenerator, IdGenerator, LockGenerator, SnowflakeId};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{GenerateConfig, GeneratorKind, OutputFormat};

/// The one generator this process owns, shared by every issuing thread.
pub type SharedGenerator = Box<dyn IdGenerator + Send + Sync>;

pub fn build_generator(config: &GenerateConfig) -> anyhow::Result<SharedGenerator> {
    let clock = config.clock;
    let generator: SharedGenerator = match config.generator {
        GeneratorKind::Lock => Box::new(LockGenerator::new(config.node_id, clock)?),
        GeneratorKind::Atomic => Box::new(AtomicGenerator::new(config.node_id, clock)?),
    };
    Ok(generator)
}

/// Issues one ID, sleeping through clock rollbacks as long as the total wait
/// stays within `max_wait`. Any other error, or a rollback too large to wait
/// out, is returned unchanged.
pub fn next_id_patiently<G>(generator: &G, max_wait: Duration) -> flakeid::Result<SnowflakeId>
where
    G: IdGenerator + ?Sized,
{
    let mut waited = Duration::ZERO;
    loop {
        let err = match generator.next_id() {
            Ok(id) => return Ok(id),
            Err(err) => err,
        };
        let Some(behind_by) = err.behind_by() else {
            return Err(err);
        };

        let delay = Duration::from_millis(behind_by.max(1));
        if waited + delay > max_wait {
            return Err(err);
        }
        warn!(behind_by, "clock moved backwards, waiting for it to catch up");
        std::thread::sleep(delay);
        waited += delay;
    }
}

/// Issues `count` IDs from `threads` concurrent callers and returns them in
/// ascending order.
pub fn issue<G>(
    generator: &G,
    count: usize,
    threads: usize,
    max_wait: Duration,
) -> anyhow::Result<Vec<SnowflakeId>>
where
    G: IdGenerator + Sync + ?Sized,
{
    let threads = threads.clamp(1, count.max(1));
    let per_thread = count / threads;
    let remainder = count % threads;

    let batches = std::thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let quota = per_thread + usize::from(i < remainder);
                s.spawn(move || {
                    (0..quota)
                        .map(|_| next_id_patiently(generator, max_wait))
                        .collect::<flakeid::Result<Vec<_>>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow!("id issuing thread panicked"))
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    let mut ids = Vec::with_capacity(count);
    for batch in batches {
        ids.extend(batch?);
    }
    ids.sort_unstable();
    debug!(issued = ids.len(), threads, "issued ids");
    Ok(ids)
}

/// Field view of an ID, as printed by `--format json` and `decode`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DecodedId {
    pub id: SnowflakeId,
    pub timestamp: u64,
    /// `None` when the epoch plus the timestamp does not fit in a `u64`.
    pub unix_millis: Option<u64>,
    pub node_id: u64,
    pub sequence: u64,
}

impl DecodedId {
    pub fn new(id: SnowflakeId, epoch: Duration) -> Self {
        Self {
            id,
            timestamp: id.timestamp(),
            unix_millis: id.unix_millis(epoch),
            node_id: id.node_id(),
            sequence: id.sequence(),
        }
    }
}

pub fn write_ids<W: Write>(
    out: &mut W,
    ids: &[SnowflakeId],
    format: OutputFormat,
    epoch: Duration,
) -> anyhow::Result<()> {
    for &id in ids {
        match format {
            OutputFormat::Decimal => writeln!(out, "{id}")?,
            OutputFormat::Padded => writeln!(out, "{}", id.to_padded_string())?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, &DecodedId::new(id, epoch))?;
                writeln!(out)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

pub fn write_decoded<W: Write>(out: &mut W, id: SnowflakeId, epoch: Duration) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, &DecodedId::new(id, epoch))?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicU64, Ordering},
    };

    use flakeid::{CUSTOM_EPOCH, Error, SystemClock, TimeSource};

    use super::*;

    /// Reads 50ms, then 45ms once, then 50ms again.
    struct RollbackOnce {
        reads: AtomicU64,
    }

    impl TimeSource for RollbackOnce {
        fn current_millis(&self) -> u64 {
            match self.reads.fetch_add(1, Ordering::Relaxed) {
                1 => 45,
                _ => 50,
            }
        }
    }

    fn generate_config(generator: GeneratorKind) -> GenerateConfig {
        GenerateConfig {
            node_id: 3,
            count: 0,
            clock: SystemClock::default(),
            generator,
            format: OutputFormat::Decimal,
            threads: 1,
            max_rollback_wait: Duration::from_secs(1),
        }
    }

    #[test]
    fn issues_unique_sorted_ids_from_many_threads() {
        for kind in [GeneratorKind::Lock, GeneratorKind::Atomic] {
            let generator = build_generator(&generate_config(kind)).unwrap();
            let ids = issue(generator.as_ref(), 10_001, 4, Duration::ZERO).unwrap();

            assert_eq!(ids.len(), 10_001);
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            assert!(ids.iter().all(|id| id.node_id() == 3));
            assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 10_001);
        }
    }

    #[test]
    fn build_rejects_out_of_range_node_ids() {
        for kind in [GeneratorKind::Lock, GeneratorKind::Atomic] {
            for node_id in [-1, 1024] {
                let config = GenerateConfig {
                    node_id,
                    ..generate_config(kind)
                };
                let err = build_generator(&config).err().expect("node id accepted");
                assert_eq!(
                    err.downcast_ref::<Error>(),
                    Some(&Error::InvalidNodeId { node_id, max: 1023 })
                );
            }
        }
    }

    #[test]
    fn decoding_against_the_largest_epoch_does_not_overflow() {
        let id = SnowflakeId::from_components(1, 0, 0);
        let decoded = DecodedId::new(id, Duration::from_millis(u64::MAX));
        assert_eq!(decoded.unix_millis, None);

        let mut out = Vec::new();
        write_decoded(&mut out, id, Duration::from_millis(u64::MAX)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert!(value["unix_millis"].is_null());
        assert_eq!(value["timestamp"], 1);
    }

    #[test]
    fn issue_handles_more_threads_than_ids() {
        let generator = build_generator(&generate_config(GeneratorKind::Lock)).unwrap();
        assert_eq!(issue(generator.as_ref(), 2, 8, Duration::ZERO).unwrap().len(), 2);
        assert!(issue(generator.as_ref(), 0, 8, Duration::ZERO).unwrap().is_empty());
    }

    #[test]
    fn patiently_waits_out_a_short_rollback() {
        let time = RollbackOnce {
            reads: AtomicU64::new(0),
        };
        let generator = LockGenerator::new(1, time).unwrap();
        let first = generator.next_id().unwrap();
        let second = next_id_patiently(&generator, Duration::from_secs(1)).unwrap();
        assert!(second > first);
        assert_eq!(second.timestamp(), 50);
        assert_eq!(second.sequence(), 1);
    }

    #[test]
    fn gives_up_on_a_rollback_longer_than_allowed() {
        let time = RollbackOnce {
            reads: AtomicU64::new(0),
        };
        let generator = AtomicGenerator::new(1, time).unwrap();
        generator.next_id().unwrap();
        let err = next_id_patiently(&generator, Duration::from_millis(2)).unwrap_err();
        assert_eq!(err, Error::ClockMovedBackwards { last: 50, now: 45 });
    }

    #[test]
    fn writes_each_format() {
        let ids = [SnowflakeId::from_components(1, 2, 3)];
        let raw = ids[0].to_raw();

        let mut out = Vec::new();
        write_ids(&mut out, &ids, OutputFormat::Decimal, CUSTOM_EPOCH).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{raw}\n"));

        let mut out = Vec::new();
        write_ids(&mut out, &ids, OutputFormat::Padded, CUSTOM_EPOCH).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{raw:020}\n"));

        let mut out = Vec::new();
        write_ids(&mut out, &ids, OutputFormat::Json, CUSTOM_EPOCH).unwrap();
        let line: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(line["id"], raw);
        assert_eq!(line["timestamp"], 1);
        assert_eq!(line["node_id"], 2);
        assert_eq!(line["sequence"], 3);
        assert_eq!(line["unix_millis"], CUSTOM_EPOCH.as_millis() as u64 + 1);
    }

    #[test]
    fn decoded_fields_match_id() {
        let id = SnowflakeId::from_components(500, 1023, 4095);
        let decoded = DecodedId::new(id, Duration::from_millis(1_000));
        assert_eq!(
            decoded,
            DecodedId {
                id,
                timestamp: 500,
                unix_millis: Some(1_500),
                node_id: 1023,
                sequence: 4095,
            }
        );

        let mut out = Vec::new();
        write_decoded(&mut out, id, Duration::from_millis(1_000)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["id"], id.to_raw());
    }
}
