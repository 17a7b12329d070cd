/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::PollerConfig;
use crate::queue::MetricQueue;

mod budget;
pub(crate) use budget::CycleBudget;

mod dispatch;
pub use dispatch::transmit_errors;
pub(crate) use dispatch::Dispatcher;

mod scheduler;
use scheduler::OutputScheduler;

/// Spawn the output scheduler, it returns after the final flush on quit.
pub fn spawn(
    config: &PollerConfig,
    queue: Arc<MetricQueue>,
    quit: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let tracker = TaskTracker::new();
    let dispatcher = Dispatcher::new(queue, config, tracker.clone());
    let scheduler = OutputScheduler::new(Arc::new(dispatcher), &config.output, tracker);
    tokio::spawn(scheduler.into_running(quit))
}
