/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::Context;
use log::{debug, error, info};

fn main() -> anyhow::Result<()> {
    let Some(proc_args) =
        g3statspoller::opts::parse_clap().context("failed to parse command line options")?
    else {
        return Ok(());
    };

    // set up process logger early, only proc args is used inside
    let _log_guard = g3statspoller::log::setup(proc_args.verbose_level)
        .context("failed to setup process logger")?;

    let config = g3statspoller::config::load(&proc_args.config_file)
        .context(format!("failed to load config, opts: {:?}", &proc_args))?;
    debug!("loaded config from {}", proc_args.config_file.display());

    if proc_args.test_config {
        info!("the format of the config file is ok");
        return Ok(());
    }

    match tokio_run(config) {
        Ok(_) => Ok(()),
        Err(e) => {
            error!("{e:?}");
            Err(e)
        }
    }
}

fn tokio_run(config: g3statspoller::config::PollerConfig) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("poller-worker")
        .build()
        .context("failed to start runtime")?;
    rt.block_on(g3statspoller::run(config))
}
