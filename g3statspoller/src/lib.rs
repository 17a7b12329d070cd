/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use ::log::{info, warn};
use anyhow::{Context, anyhow};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub mod build;
pub mod config;
pub mod log;
pub mod opts;
pub mod queue;
pub mod signal;
pub mod types;

mod collect;
mod export;
mod hostname;
mod output;

use config::PollerConfig;
use queue::MetricQueue;

/// Run collectors and the output scheduler until a quit signal arrives.
pub async fn run(config: PollerConfig) -> anyhow::Result<()> {
    let quit = CancellationToken::new();
    signal::register(quit.clone()).context("failed to setup signal handler")?;

    if config.enabled_collectors() == 0 {
        warn!("no collector enabled");
    }
    if config.enabled_destinations() == 0 {
        warn!("no destination enabled, collected metrics will be discarded");
    }

    let queue = Arc::new(MetricQueue::new(config.output.queue_soft_capacity));

    let collectors = TaskTracker::new();
    let count = collect::spawn_all(&config, queue.clone(), quit.clone(), &collectors);
    collectors.close();
    info!("{count} collectors started");

    // stopped only after all collectors, so the final flush sees their last records
    let output_quit = CancellationToken::new();
    let output = output::spawn(&config, queue, output_quit.clone());

    quit.cancelled().await;
    collectors.wait().await;
    info!("all collectors stopped");
    output_quit.cancel();
    output
        .await
        .map_err(|e| anyhow!("output scheduler task failed: {e}"))?;

    info!(
        "exit with {} transmit errors, {} dropped log records",
        output::transmit_errors(),
        crate::log::dropped_records()
    );
    Ok(())
}
