/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::format::LineFormat;
use super::{ChunkTransport, IoTimeouts, SendError};
use crate::config::destination::TcpPeerConfig;
use crate::types::MetricRecord;

/// Resolves and connects to the peer of one destination.
pub(super) struct PeerConnector {
    destination: String,
    peer_s: String,
    peer_addrs: Vec<SocketAddr>,
}

impl PeerConnector {
    pub(super) fn new(destination: &str, peer: &TcpPeerConfig) -> Self {
        PeerConnector {
            destination: destination.to_string(),
            peer_s: peer.lookup_str(),
            peer_addrs: Vec::new(),
        }
    }

    async fn select_peer(&mut self) -> Result<SocketAddr, SendError> {
        match tokio::net::lookup_host(&self.peer_s).await {
            Ok(peers) => {
                self.peer_addrs.clear();
                self.peer_addrs.extend(peers);
            }
            Err(e) => {
                if self.peer_addrs.is_empty() {
                    return Err(SendError::ResolveFailed(self.peer_s.clone(), e));
                }
                warn!(
                    "destination {}: failed to resolve {}, use the last result: {e}",
                    self.destination, self.peer_s
                );
            }
        }

        fastrand::choice(&self.peer_addrs)
            .cloned()
            .ok_or_else(|| SendError::NoPeerAddress(self.peer_s.clone()))
    }

    pub(super) async fn connect(&mut self, timeout: Duration) -> Result<TcpStream, SendError> {
        let peer = self.select_peer().await?;
        match tokio::time::timeout(timeout, TcpStream::connect(peer)).await {
            Ok(Ok(stream)) => {
                debug!("destination {}: connected to {peer}", self.destination);
                Ok(stream)
            }
            Ok(Err(e)) => Err(SendError::ConnectFailed(peer, e)),
            Err(_) => Err(SendError::ConnectTimeout(peer)),
        }
    }
}

/// Line protocol over a plain TCP connection, reused across chunks.
pub(super) struct TcpLineTransport<F> {
    connector: PeerConnector,
    formatter: F,
    timeouts: IoTimeouts,
    stream: Option<TcpStream>,
    write_buf: Vec<u8>,
}

impl<F: LineFormat> TcpLineTransport<F> {
    pub(super) fn new(
        destination: &str,
        peer: &TcpPeerConfig,
        formatter: F,
        timeouts: IoTimeouts,
    ) -> Self {
        TcpLineTransport {
            connector: PeerConnector::new(destination, peer),
            formatter,
            timeouts,
            stream: None,
            write_buf: Vec::with_capacity(2048),
        }
    }

    pub(super) async fn shutdown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = tokio::time::timeout(self.timeouts.io, stream.shutdown()).await;
        }
    }
}

impl<F> ChunkTransport for TcpLineTransport<F>
where
    F: LineFormat + Send + Sync,
{
    async fn send_chunk(&mut self, chunk: &[MetricRecord]) -> Result<(), SendError> {
        self.write_buf.clear();
        for record in chunk {
            self.formatter.serialize(record, &mut self.write_buf);
        }

        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => self.connector.connect(self.timeouts.connect).await?,
        };
        match tokio::time::timeout(self.timeouts.io, stream.write_all(&self.write_buf)).await {
            Ok(Ok(_)) => {
                self.stream = Some(stream);
                Ok(())
            }
            Ok(Err(e)) => Err(SendError::WriteFailed(e)),
            Err(_) => Err(SendError::WriteTimeout),
        }
    }
}
