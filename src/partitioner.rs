//! Partitioner: selects a destination partition for a produced record.
//! The round-robin counter uses a plain atomic, the same shared-state
//! discipline `connection::topology::BrokerTopology` uses for its
//! `parking_lot::RwLock`-guarded cache.

use std::sync::atomic::{AtomicUsize, Ordering};

use siphasher::sip::SipHasher24;
use std::hash::Hasher;

use crate::error::Error;

/// Inputs available to a partitioner at selection time.
#[derive(Debug, Clone, Copy)]
pub struct PartitionerConfig<'a> {
    pub partition_count: u32,
    pub available_partitions: &'a [i32],
}

pub trait Partitioner: std::fmt::Debug + Send + Sync {
    fn partition(
        &self,
        key: Option<&[u8]>,
        config: PartitionerConfig<'_>,
    ) -> Result<i32, Error>;
}

/// Key-hash + round-robin fallback: a non-empty key is hashed with
/// SipHash-2-4 (fixed, all-zero key) and reduced modulo `partition_count`;
/// if that partition is unavailable, the next available partition in
/// cyclic order is used instead. An absent or empty key advances a shared
/// monotone counter.
#[derive(Debug, Default)]
pub struct HashRoundRobinPartitioner {
    counter: AtomicUsize,
}

impl HashRoundRobinPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    fn hash_key(key: &[u8]) -> u64 {
        let mut hasher = SipHasher24::new_with_keys(0, 0);
        hasher.write(key);
        hasher.finish()
    }
}

impl Partitioner for HashRoundRobinPartitioner {
    fn partition(
        &self,
        key: Option<&[u8]>,
        config: PartitionerConfig<'_>,
    ) -> Result<i32, Error> {
        if config.available_partitions.is_empty() {
            return Err(Error::NoAvailablePartitions);
        }

        match key {
            Some(key) if !key.is_empty() => {
                let hash = Self::hash_key(key);
                let candidate = (hash % u64::from(config.partition_count)) as i32;
                if config.available_partitions.contains(&candidate) {
                    Ok(candidate)
                } else {
                    // Next available partition in cyclic order after `candidate`.
                    let mut sorted = config.available_partitions.to_vec();
                    sorted.sort_unstable();
                    let next = sorted
                        .iter()
                        .find(|&&p| p >= candidate)
                        .copied()
                        .unwrap_or(sorted[0]);
                    Ok(next)
                }
            }
            _ => {
                let n = self.counter.fetch_add(1, Ordering::Relaxed);
                let idx = n % config.available_partitions.len();
                Ok(config.available_partitions[idx])
            }
        }
    }
}

/// Always selects a fixed partition id.
#[derive(Debug, Clone, Copy)]
pub struct ManualPartitioner {
    partition: i32,
}

impl ManualPartitioner {
    pub fn new(partition: i32) -> Result<Self, Error> {
        if partition < 0 {
            return Err(Error::Malformed(format!(
                "manual partition id must be non-negative, got {partition}"
            )));
        }
        Ok(Self { partition })
    }
}

impl Partitioner for ManualPartitioner {
    fn partition(
        &self,
        _key: Option<&[u8]>,
        config: PartitionerConfig<'_>,
    ) -> Result<i32, Error> {
        if config.available_partitions.is_empty() {
            return Err(Error::NoAvailablePartitions);
        }
        if !config.available_partitions.contains(&self.partition) {
            return Err(Error::PartitionUnavailable {
                requested: self.partition,
                available: config.available_partitions.to_vec(),
            });
        }
        Ok(self.partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(partition_count: u32, available: &[i32]) -> PartitionerConfig<'_> {
        PartitionerConfig {
            partition_count,
            available_partitions: available,
        }
    }

    #[test]
    fn test_manual_partitioner_rejects_negative_at_construction() {
        assert!(ManualPartitioner::new(-1).is_err());
    }

    #[test]
    fn test_manual_partitioner_unavailable() {
        let p = ManualPartitioner::new(5).unwrap();
        let err = p.partition(None, config(3, &[0, 1, 2])).unwrap_err();
        assert!(matches!(err, Error::PartitionUnavailable { requested: 5, .. }));
    }

    #[test]
    fn test_manual_partitioner_selects_fixed_partition() {
        let p = ManualPartitioner::new(1).unwrap();
        assert_eq!(p.partition(None, config(3, &[0, 1, 2])).unwrap(), 1);
    }

    #[test]
    fn test_no_available_partitions_fails() {
        let p = HashRoundRobinPartitioner::new();
        let err = p.partition(None, config(3, &[])).unwrap_err();
        assert!(matches!(err, Error::NoAvailablePartitions));
    }

    #[test]
    fn test_round_robin_fairness_single_thread() {
        let p = HashRoundRobinPartitioner::new();
        let got: Vec<i32> = (0..9)
            .map(|_| p.partition(None, config(3, &[0, 1, 2])).unwrap())
            .collect();
        assert_eq!(got, vec![0, 1, 2, 0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_round_robin_never_repeats_consecutively() {
        let p = HashRoundRobinPartitioner::new();
        let available = [0, 1, 2];
        let mut last = None;
        for _ in 0..20 {
            let got = p.partition(None, config(3, &available)).unwrap();
            if let Some(last) = last {
                assert_ne!(last, got);
            }
            last = Some(got);
        }
    }

    #[test]
    fn test_empty_key_treated_as_absent() {
        let p = HashRoundRobinPartitioner::new();
        let a = p.partition(Some(b""), config(3, &[0, 1, 2])).unwrap();
        let b = p.partition(Some(b""), config(3, &[0, 1, 2])).unwrap();
        // round-robin counter should have advanced between the two calls
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_partitioner_deterministic() {
        let p = HashRoundRobinPartitioner::new();
        let key = b"order-42";
        let first = p.partition(Some(key), config(8, &(0..8).collect::<Vec<_>>())).unwrap();
        for _ in 0..1000 {
            let got = p.partition(Some(key), config(8, &(0..8).collect::<Vec<_>>())).unwrap();
            assert_eq!(got, first);
        }
    }

    #[test]
    fn test_round_robin_fairness_concurrent() {
        use std::sync::Arc;
        use std::thread;

        let p = Arc::new(HashRoundRobinPartitioner::new());
        let mut handles = Vec::new();
        for _ in 0..10 {
            let p = Arc::clone(&p);
            handles.push(thread::spawn(move || {
                (0..10)
                    .map(|_| p.partition(None, config(3, &[0, 1, 2])).unwrap())
                    .collect::<Vec<_>>()
            }));
        }

        let mut counts = [0usize; 3];
        for h in handles {
            for partition in h.join().unwrap() {
                counts[partition as usize] += 1;
            }
        }

        let total: usize = counts.iter().sum();
        assert_eq!(total, 100);
        for count in counts {
            assert!((25..=40).contains(&count), "count {count} out of range");
        }
    }
}
