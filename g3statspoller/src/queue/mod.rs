/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use foldhash::fast::RandomState;
use log::warn;

use crate::types::{MetricFamily, MetricRecord};

type Partition = DashMap<u64, MetricRecord, RandomState>;

/// In-memory hand-off between collectors and the output stage.
///
/// Every enqueued record gets a key from one process wide counter. A drain
/// takes the counter value as its cut and removes only keys below it, so
/// records inserted while the drain runs stay queued for the next one.
pub struct MetricQueue {
    next_key: AtomicU64,
    partitions: [Partition; 2],
    soft_capacity: usize,
    over_capacity: AtomicBool,
}

impl Default for MetricQueue {
    fn default() -> Self {
        MetricQueue::new(0)
    }
}

impl MetricQueue {
    /// A zero `soft_capacity` disables the size warning.
    pub fn new(soft_capacity: usize) -> Self {
        MetricQueue {
            next_key: AtomicU64::new(0),
            partitions: [
                Partition::with_hasher(RandomState::default()),
                Partition::with_hasher(RandomState::default()),
            ],
            soft_capacity,
            over_capacity: AtomicBool::new(false),
        }
    }

    pub fn enqueue(&self, family: MetricFamily, record: MetricRecord) {
        let key = self.next_key.fetch_add(1, Ordering::AcqRel);
        self.partitions[family.index()].insert(key, record);
        self.check_capacity();
    }

    pub fn push(&self, record: MetricRecord) {
        self.enqueue(record.family(), record)
    }

    pub fn push_all<I>(&self, records: I)
    where
        I: IntoIterator<Item = MetricRecord>,
    {
        for record in records {
            self.push(record);
        }
    }

    fn check_capacity(&self) {
        if self.soft_capacity == 0 || self.over_capacity.load(Ordering::Relaxed) {
            return;
        }
        let len = self.len();
        if len > self.soft_capacity && !self.over_capacity.swap(true, Ordering::AcqRel) {
            warn!(
                "metric queue holds {len} records, more than the soft capacity {}",
                self.soft_capacity
            );
        }
    }

    /// Remove and return every record of `family` enqueued before this call.
    pub fn drain(&self, family: MetricFamily) -> Vec<MetricRecord> {
        let cut = self.next_key.load(Ordering::Acquire);
        let records = self.drain_partition(&self.partitions[family.index()], cut);
        self.over_capacity.store(false, Ordering::Release);
        records
    }

    /// Drain all partitions against one shared cut.
    pub fn drain_all(&self) -> Vec<MetricRecord> {
        let cut = self.next_key.load(Ordering::Acquire);
        let mut records = Vec::new();
        for partition in &self.partitions {
            records.extend(self.drain_partition(partition, cut));
        }
        self.over_capacity.store(false, Ordering::Release);
        records
    }

    fn drain_partition(&self, partition: &Partition, cut: u64) -> Vec<MetricRecord> {
        let mut keys: Vec<u64> = partition
            .iter()
            .map(|entry| *entry.key())
            .filter(|key| *key < cut)
            .collect();
        keys.sort_unstable();

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            // a concurrent drain may have taken it already
            if let Some((_, record)) = partition.remove(&key) {
                records.push(record);
            }
        }
        records
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(|p| p.is_empty())
    }

    pub fn family_len(&self, family: MetricFamily) -> usize {
        self.partitions[family.index()].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::types::{MetricTagMap, MetricValue};

    fn record(path: &str, v: u64) -> MetricRecord {
        MetricRecord::new(path, MetricValue::from(v), 1_700_000_000)
    }

    #[test]
    fn partitioned() {
        let queue = MetricQueue::default();
        queue.push(record("a", 1));
        let mut tags = MetricTagMap::new();
        tags.insert("k".to_string(), "v".to_string());
        queue.push(MetricRecord::with_tags(
            "b",
            MetricValue::ONE,
            1_700_000_000,
            tags,
        ));
        assert_eq!(queue.family_len(MetricFamily::Graphite), 1);
        assert_eq!(queue.family_len(MetricFamily::OpenTsdb), 1);

        let graphite = queue.drain(MetricFamily::Graphite);
        assert_eq!(graphite.len(), 1);
        assert_eq!(graphite[0].path, "a");
        assert_eq!(queue.len(), 1);

        let all = queue.drain_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].path, "b");
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_keeps_enqueue_order() {
        let queue = MetricQueue::default();
        for i in 0..100 {
            queue.push(record("a", i));
        }
        let values: Vec<String> = queue
            .drain_all()
            .into_iter()
            .map(|r| r.value.to_string())
            .collect();
        let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn drain_empty() {
        let queue = MetricQueue::new(10);
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn soft_capacity_never_drops() {
        let queue = MetricQueue::new(4);
        for i in 0..10 {
            queue.push(record("a", i));
        }
        assert_eq!(queue.len(), 10);
        assert_eq!(queue.drain_all().len(), 10);
    }

    #[test]
    fn concurrent_drain_no_loss_no_dup() {
        const PRODUCERS: u64 = 8;
        const PER_PRODUCER: u64 = 5000;

        let queue = Arc::new(MetricQueue::default());
        let done = Arc::new(AtomicBool::new(false));

        let mut producers = Vec::new();
        for p in 0..PRODUCERS {
            let queue = queue.clone();
            producers.push(std::thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.push(record("p", p * PER_PRODUCER + i));
                }
            }));
        }

        let drainer = {
            let queue = queue.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut seen = Vec::new();
                while !done.load(Ordering::Acquire) {
                    seen.extend(queue.drain_all());
                }
                seen
            })
        };

        for p in producers {
            p.join().unwrap();
        }
        done.store(true, Ordering::Release);
        let mut seen = drainer.join().unwrap();
        seen.extend(queue.drain_all());
        assert!(queue.is_empty());

        let total = (PRODUCERS * PER_PRODUCER) as usize;
        assert_eq!(seen.len(), total);
        let unique: HashSet<String> = seen.iter().map(|r| r.value.to_string()).collect();
        assert_eq!(unique.len(), total);
    }
}
