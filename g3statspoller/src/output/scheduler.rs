/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::Dispatcher;
use crate::config::output::OutputConfig;

/// Fires one output cycle per output interval.
pub(crate) struct OutputScheduler {
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    shutdown_wait: Duration,
    tracker: TaskTracker,
}

impl OutputScheduler {
    pub(crate) fn new(
        dispatcher: Arc<Dispatcher>,
        config: &OutputConfig,
        tracker: TaskTracker,
    ) -> Self {
        OutputScheduler {
            dispatcher,
            interval: config.interval,
            shutdown_wait: config.shutdown_wait,
            tracker,
        }
    }

    fn spawn_cycle(&self) -> JoinHandle<()> {
        let dispatcher = self.dispatcher.clone();
        self.tracker.spawn(async move {
            dispatcher.run_cycle().await;
        })
    }

    pub(crate) async fn into_running(self, quit: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut running: Option<JoinHandle<()>> = None;
        loop {
            tokio::select! {
                biased;

                _ = quit.cancelled() => break,
                _ = interval.tick() => {}
            }

            // the dispatcher deadline bounds this wait
            if let Some(handle) = running.take() {
                tokio::select! {
                    biased;

                    _ = quit.cancelled() => break,
                    _ = handle => {}
                }
            }

            running = Some(self.spawn_cycle());
        }

        info!("output scheduler: quit requested, run the final flush cycle");
        self.spawn_cycle();
        self.tracker.close();
        match tokio::time::timeout(self.shutdown_wait, self.tracker.wait()).await {
            Ok(_) => info!("output scheduler: stopped"),
            Err(_) => warn!(
                "output scheduler: forced stop with {} tasks still running after {:?}",
                self.tracker.len(),
                self.shutdown_wait
            ),
        }
    }
}
