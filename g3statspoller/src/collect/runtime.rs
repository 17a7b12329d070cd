/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{Collect, sink};
use crate::config::collector::CollectorBaseConfig;
use crate::queue::MetricQueue;
use crate::types::{MetricPrefix, MetricRecord, MetricValue, unix_timestamp};

const AVAILABLE_METRIC: &str = "Available";

pub(crate) fn sleep_time(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// Drives one collector: collect, deliver, then sleep for what is left of the interval.
pub(crate) struct CollectorRuntime<C> {
    collector: C,
    interval: Duration,
    prefix: MetricPrefix,
    file_output: Option<PathBuf>,
    queue: Arc<MetricQueue>,
}

impl<C: Collect> CollectorRuntime<C> {
    pub(crate) fn new(
        collector: C,
        config: &CollectorBaseConfig,
        global_prefix: &str,
        queue: Arc<MetricQueue>,
    ) -> Self {
        CollectorRuntime {
            collector,
            interval: config.interval,
            prefix: MetricPrefix::new(global_prefix, &config.prefix),
            file_output: config.file_output().map(|p| p.to_path_buf()),
            queue,
        }
    }

    async fn run_once(&mut self) -> usize {
        let (mut records, available) = match self.collector.collect().await {
            Ok(records) => (records, MetricValue::ONE),
            Err(e) => {
                warn!("collector {}: collection failed: {e:?}", self.collector.name());
                (Vec::new(), MetricValue::ZERO)
            }
        };
        if self.collector.reports_availability() {
            records.push(MetricRecord::new(
                AVAILABLE_METRIC,
                available,
                unix_timestamp(),
            ));
        }

        if let Some(path) = &self.file_output {
            sink::write_file(self.collector.name(), path, &records).await;
        }

        let count = records.len();
        self.queue
            .push_all(records.into_iter().map(|r| r.prefixed(&self.prefix)));
        count
    }

    pub(crate) async fn into_running(mut self, quit: CancellationToken) {
        loop {
            let start = Instant::now();
            let collected = tokio::select! {
                biased;

                _ = quit.cancelled() => break,
                n = self.run_once() => n,
            };
            let elapsed = start.elapsed();
            info!(
                "collector {}: finished, metrics collected {collected}, collection time {} ms",
                self.collector.name(),
                elapsed.as_millis()
            );

            let wait = sleep_time(self.interval, elapsed);
            if elapsed > self.interval {
                warn!(
                    "collector {}: collection took {} ms, longer than the interval {:?}",
                    self.collector.name(),
                    elapsed.as_millis(),
                    self.interval
                );
            }

            tokio::select! {
                biased;

                _ = quit.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        info!("collector {}: stopped", self.collector.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use tokio_util::task::TaskTracker;

    struct MockCollector {
        calls: usize,
    }

    impl Collect for MockCollector {
        fn name(&self) -> &str {
            "mock"
        }

        fn reports_availability(&self) -> bool {
            true
        }

        async fn collect(&mut self) -> anyhow::Result<Vec<MetricRecord>> {
            self.calls += 1;
            if self.calls == 2 {
                return Err(anyhow!("source down"));
            }
            Ok(vec![MetricRecord::new(
                "Queries",
                MetricValue::from(self.calls),
                1,
            )])
        }
    }

    struct SlowCollector {
        starts: Arc<std::sync::Mutex<Vec<Instant>>>,
    }

    impl Collect for SlowCollector {
        fn name(&self) -> &str {
            "slow"
        }

        async fn collect(&mut self) -> anyhow::Result<Vec<MetricRecord>> {
            self.starts.lock().unwrap().push(Instant::now());
            tokio::time::sleep(Duration::from_millis(1200)).await;
            Ok(Vec::new())
        }
    }

    fn base_config() -> CollectorBaseConfig {
        config_with_interval(Duration::from_secs(10))
    }

    fn config_with_interval(interval: Duration) -> CollectorBaseConfig {
        let mut config = CollectorBaseConfig::new("Mock");
        config.interval = interval;
        config.check("mock").unwrap();
        config
    }

    #[test]
    fn sleep_after_collect() {
        let interval = Duration::from_millis(1000);
        assert_eq!(
            sleep_time(interval, Duration::from_millis(150)),
            Duration::from_millis(850)
        );
        assert_eq!(
            sleep_time(interval, Duration::from_millis(1200)),
            Duration::ZERO
        );
        assert_eq!(sleep_time(interval, interval), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn paced_runs() {
        let queue = Arc::new(MetricQueue::default());
        let runtime = CollectorRuntime::new(
            MockCollector { calls: 0 },
            &base_config(),
            "host1",
            queue.clone(),
        );
        let quit = CancellationToken::new();
        let tracker = TaskTracker::new();
        tracker.spawn(runtime.into_running(quit.clone()));

        // runs at 0s, 10s and 20s
        tokio::time::sleep(Duration::from_secs(25)).await;
        quit.cancel();
        tracker.close();
        tracker.wait().await;

        let records = queue.drain_all();
        let lines: Vec<String> = records
            .iter()
            .map(|r| format!("{} {}", r.path, r.value))
            .collect();
        assert_eq!(
            lines,
            vec![
                "host1.Mock.Queries 1",
                "host1.Mock.Available 1",
                "host1.Mock.Available 0",
                "host1.Mock.Queries 3",
                "host1.Mock.Available 1",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_no_sleep() {
        let starts = Arc::new(std::sync::Mutex::new(Vec::new()));
        let runtime = CollectorRuntime::new(
            SlowCollector {
                starts: starts.clone(),
            },
            &config_with_interval(Duration::from_secs(1)),
            "host1",
            Arc::new(MetricQueue::default()),
        );
        let quit = CancellationToken::new();
        let tracker = TaskTracker::new();
        tracker.spawn(runtime.into_running(quit.clone()));

        tokio::time::sleep(Duration::from_millis(3000)).await;
        quit.cancel();
        tracker.close();
        tracker.wait().await;

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 3);
        for pair in starts.windows(2) {
            // the next run starts right after an overrun one
            assert_eq!(pair[1] - pair[0], Duration::from_millis(1200));
        }
    }
}
