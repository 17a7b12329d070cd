/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use log::info;
use tokio_util::sync::CancellationToken;

#[cfg(unix)]
pub fn register(quit: CancellationToken) -> anyhow::Result<()> {
    use std::future::poll_fn;

    use anyhow::anyhow;
    use tokio::signal::unix::{SignalKind, signal};

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::quit(), "SIGQUIT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let mut sig = signal(kind).map_err(|e| anyhow!("failed to create {name} listener: {e}"))?;
        let quit = quit.clone();
        tokio::spawn(async move {
            if poll_fn(|cx| sig.poll_recv(cx)).await.is_some() {
                info!("got quit signal {name}");
                quit.cancel();
            }
        });
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn register(quit: CancellationToken) -> anyhow::Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("got quit signal");
            quit.cancel();
        }
    });
    Ok(())
}
