/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use log::info;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::PollerConfig;
use crate::config::collector::AnyCollectorConfig;
use crate::queue::MetricQueue;
use crate::types::MetricRecord;

mod runtime;
use runtime::CollectorRuntime;

mod sink;

mod agent;
mod external;
mod file_counter;
mod memory;
mod process_counter;
mod uptime;

/// A metric source polled on a fixed interval.
pub(crate) trait Collect {
    fn name(&self) -> &str;

    /// Collectors of network services emit an `Available` gauge.
    fn reports_availability(&self) -> bool {
        false
    }

    fn collect(&mut self) -> impl Future<Output = anyhow::Result<Vec<MetricRecord>>> + Send;
}

fn spawn<C>(
    collector: C,
    config: &AnyCollectorConfig,
    global_prefix: &str,
    queue: &Arc<MetricQueue>,
    quit: &CancellationToken,
    tracker: &TaskTracker,
) where
    C: Collect + Send + 'static,
{
    let runtime = CollectorRuntime::new(collector, config.base(), global_prefix, queue.clone());
    tracker.spawn(runtime.into_running(quit.clone()));
}

/// Spawn one runtime task for every enabled collector.
pub fn spawn_all(
    config: &PollerConfig,
    queue: Arc<MetricQueue>,
    quit: CancellationToken,
    tracker: &TaskTracker,
) -> usize {
    let mut count = 0;
    for c in config.collectors.iter().filter(|c| c.base().enable) {
        let name = c.name().to_string();
        let prefix = &config.global_prefix;
        match c {
            AnyCollectorConfig::Uptime(p) => {
                let collector = uptime::UptimeCollector::new(name, &p.proc_dir);
                spawn(collector, c, prefix, &queue, &quit, tracker);
            }
            AnyCollectorConfig::Memory(p) => {
                let collector = memory::MemoryCollector::new(name, &p.proc_dir);
                spawn(collector, c, prefix, &queue, &quit, tracker);
            }
            AnyCollectorConfig::FileCounter(f) => {
                let collector = file_counter::FileCounterCollector::new(name, f);
                spawn(collector, c, prefix, &queue, &quit, tracker);
            }
            AnyCollectorConfig::ProcessCounter(p) => {
                let collector = process_counter::ProcessCounterCollector::new(name, p);
                spawn(collector, c, prefix, &queue, &quit, tracker);
            }
            AnyCollectorConfig::Agent(_) => {
                let collector = agent::AgentCollector::new(name);
                spawn(collector, c, prefix, &queue, &quit, tracker);
            }
            AnyCollectorConfig::External(e) => {
                let collector = external::ExternalCollector::new(name, e);
                spawn(collector, c, prefix, &queue, &quit, tracker);
            }
        }
        info!(
            "collector {}: started as type {} with interval {:?}",
            c.name(),
            c.collector_type(),
            c.base().interval
        );
        count += 1;
    }
    count
}
