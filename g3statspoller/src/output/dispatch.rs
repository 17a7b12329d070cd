/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::task::TaskTracker;

use super::CycleBudget;
use crate::config::PollerConfig;
use crate::export::{DeliveryReport, IoTimeouts, Sender};
use crate::queue::MetricQueue;
use crate::types::MetricRecord;

static TRANSMIT_ERRORS: AtomicU64 = AtomicU64::new(0);

/// Total count of dropped chunks since process start.
pub fn transmit_errors() -> u64 {
    TRANSMIT_ERRORS.load(Ordering::Relaxed)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct CycleSummary {
    pub(crate) drained: usize,
    pub(crate) spawned: usize,
    pub(crate) finished: usize,
    pub(crate) overrun: bool,
}

/// Runs output cycles: drain the queue and fan out to every destination.
pub(crate) struct Dispatcher {
    queue: Arc<MetricQueue>,
    senders: Vec<(Arc<Sender>, IoTimeouts)>,
    budget: CycleBudget,
    workers: Arc<Semaphore>,
    tracker: TaskTracker,
    cycles: AtomicU64,
}

impl Dispatcher {
    pub(crate) fn new(
        queue: Arc<MetricQueue>,
        config: &PollerConfig,
        tracker: TaskTracker,
    ) -> Self {
        let budget = CycleBudget::from_config(&config.output);
        let hostname: Arc<str> = Arc::from(config.hostname.as_str());
        let senders = config
            .destinations
            .iter()
            .filter(|d| d.enabled())
            .map(|d| {
                let timeouts = budget.timeouts_for(d);
                let sender = Sender::new(Arc::new(d.clone()), hostname.clone());
                (Arc::new(sender), timeouts)
            })
            .collect();
        Dispatcher {
            queue,
            senders,
            budget,
            workers: Arc::new(Semaphore::new(config.output.max_workers)),
            tracker,
            cycles: AtomicU64::new(0),
        }
    }

    pub(crate) fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub(crate) async fn run_cycle(&self) -> CycleSummary {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let start = Instant::now();
        let deadline = start + self.budget.max_cycle;

        let records = self.queue.drain_all();
        let mut summary = CycleSummary {
            drained: records.len(),
            ..Default::default()
        };
        if records.is_empty() || self.senders.is_empty() {
            debug!(
                "output cycle {cycle}: {} records drained, nothing to send",
                records.len()
            );
            return summary;
        }

        let records: Arc<[MetricRecord]> = Arc::from(records);
        let mut set = JoinSet::new();
        for (sender, timeouts) in &self.senders {
            let sender = sender.clone();
            let records = records.clone();
            let workers = self.workers.clone();
            let timeouts = *timeouts;
            set.spawn(self.tracker.track_future(async move {
                let Ok(_permit) = workers.acquire_owned().await else {
                    return (sender, None);
                };
                let report = sender.send(&records, timeouts).await;
                (sender, Some(report))
            }));
            summary.spawned += 1;
        }

        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((sender, Some(report))))) => {
                    summary.finished += 1;
                    log_report(sender.name(), &report);
                }
                Ok(Some(Ok((sender, None)))) => {
                    summary.finished += 1;
                    warn!("destination {}: no worker available", sender.name());
                }
                Ok(Some(Err(e))) => {
                    summary.finished += 1;
                    warn!("output cycle {cycle}: sender task failed: {e}");
                }
                Ok(None) => break,
                Err(_) => {
                    summary.overrun = true;
                    warn!(
                        "output cycle {cycle}: {} destinations still sending after {:?}, stop waiting",
                        set.len(),
                        self.budget.max_cycle
                    );
                    // the unfinished sends go on in background
                    set.detach_all();
                    break;
                }
            }
        }

        info!(
            "output cycle {cycle}: {} records drained, {}/{} destinations finished in {} ms",
            summary.drained,
            summary.finished,
            summary.spawned,
            start.elapsed().as_millis()
        );
        summary
    }
}

fn log_report(destination: &str, report: &DeliveryReport) {
    if report.has_error() {
        let total = TRANSMIT_ERRORS.fetch_add(report.chunks_dropped as u64, Ordering::Relaxed)
            + report.chunks_dropped as u64;
        warn!(
            "destination {destination}: sent {} records in {} chunks, dropped {} records in {} chunks, {} attempts, transmit errors {total}",
            report.records_sent,
            report.chunks_sent,
            report.records_dropped,
            report.chunks_dropped,
            report.attempts
        );
    } else {
        debug!(
            "destination {destination}: sent {} records in {} chunks, {} attempts, {} skipped",
            report.records_sent, report.chunks_sent, report.attempts, report.records_skipped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::destination::load_all;
    use crate::config::output::OutputConfig;
    use crate::config::yaml::load_test_doc;
    use crate::types::MetricValue;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn poller_config(destinations: &str, output: OutputConfig) -> PollerConfig {
        let doc = load_test_doc(destinations);
        PollerConfig {
            hostname: "host1".to_string(),
            global_prefix: "host1".to_string(),
            output,
            destinations: load_all(&doc).unwrap(),
            collectors: Vec::new(),
        }
    }

    fn fill_queue(queue: &MetricQueue, n: usize) {
        for i in 0..n {
            queue.push(MetricRecord::new(format!("m{i}"), MetricValue::ONE, 1));
        }
    }

    #[tokio::test]
    async fn empty_queue() {
        let config =
            poller_config("type: graphite\nname: g1\nhost: 127.0.0.1", OutputConfig::default());
        let queue = Arc::new(MetricQueue::default());
        let dispatcher = Dispatcher::new(queue, &config, TaskTracker::new());
        let summary = dispatcher.run_cycle().await;
        assert_eq!(summary, CycleSummary::default());
        assert_eq!(dispatcher.cycles(), 1);
    }

    #[tokio::test]
    async fn independent_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let good_port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = String::new();
            stream.read_to_string(&mut buf).await.unwrap();
            buf
        });
        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let bad_port = closed.local_addr().unwrap().port();
        drop(closed);

        let config = poller_config(
            &format!(
                r#"
- type: graphite
  name: good
  host: 127.0.0.1
  port: {good_port}
  batch_size: 2
- type: graphite
  name: bad
  host: 127.0.0.1
  port: {bad_port}
- type: graphite
  name: disabled
  enable: false
  host: 127.0.0.1
  port: {bad_port}
"#
            ),
            OutputConfig::default(),
        );
        let queue = Arc::new(MetricQueue::default());
        fill_queue(&queue, 5);

        let errors_before = transmit_errors();
        let dispatcher = Dispatcher::new(queue.clone(), &config, TaskTracker::new());
        let summary = dispatcher.run_cycle().await;
        assert_eq!(summary.drained, 5);
        assert_eq!(summary.spawned, 2);
        assert_eq!(summary.finished, 2);
        assert!(!summary.overrun);
        assert!(queue.is_empty());
        assert!(transmit_errors() > errors_before);

        let received = server.await.unwrap();
        assert_eq!(received.lines().count(), 5);
        assert!(received.starts_with("m0 1 1\n"));
    }

    #[tokio::test]
    async fn cycle_overrun() {
        // accepts and never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let output = OutputConfig {
            interval: Duration::from_secs(2),
            ..Default::default()
        };
        let config = poller_config(
            &format!(
                "type: opentsdb_http\nname: h1\nurl: http://127.0.0.1:{port}/api/put\nretry_attempts: 5"
            ),
            output,
        );
        let queue = Arc::new(MetricQueue::default());
        fill_queue(&queue, 1);

        let tracker = TaskTracker::new();
        let dispatcher = Dispatcher::new(queue, &config, tracker.clone());
        let start = Instant::now();
        let summary = dispatcher.run_cycle().await;
        assert!(summary.overrun);
        assert_eq!(summary.finished, 0);
        assert!(start.elapsed() < Duration::from_secs(4));
        // the detached send is still tracked
        assert_eq!(tracker.len(), 1);
    }
}
