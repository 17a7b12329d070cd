/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum SendError {
    #[error("failed to resolve {0}: {1}")]
    ResolveFailed(String, io::Error),
    #[error("no address found for {0}")]
    NoPeerAddress(String),
    #[error("failed to connect to {0}: {1}")]
    ConnectFailed(SocketAddr, io::Error),
    #[error("timed out connecting to {0}")]
    ConnectTimeout(SocketAddr),
    #[error("write failed: {0:?}")]
    WriteFailed(io::Error),
    #[error("write timed out")]
    WriteTimeout,
    #[error("read failed: {0:?}")]
    ReadFailed(io::Error),
    #[error("read timed out")]
    ReadTimeout,
    #[error("remote closed")]
    RemoteClosed,
    #[error("invalid response: {0}")]
    InvalidResponse(&'static str),
    #[error("too large response header, should be less than {0}")]
    TooLargeHeader(usize),
    #[error("error response: {0} {1}")]
    ErrorResponse(u16, String),
}
