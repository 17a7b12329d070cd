/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use anyhow::Context;

use chrono::Local;
use flume::{Receiver, Sender, TrySendError};
use slog::{Drain, KV, Level, OwnedKVList, Record};
use slog_scope::GlobalLoggerGuard;

const PROCESS_LOG_THREAD_NAME: &str = "log-process";
const CHANNEL_CAPACITY: usize = 4096;

static DROPPED_RECORDS: AtomicU64 = AtomicU64::new(0);

/// Log records dropped since process start as the log thread fell behind.
pub fn dropped_records() -> u64 {
    DROPPED_RECORDS.load(Ordering::Relaxed)
}

struct LogValue {
    level: Level,
    message: String,
    kv_pairs: Vec<(String, String)>,
    location: String,
}

struct KvCollector<'a>(&'a mut Vec<(String, String)>);

impl slog::Serializer for KvCollector<'_> {
    fn emit_arguments(&mut self, key: slog::Key, val: &fmt::Arguments) -> slog::Result {
        self.0.push((key.to_string(), val.to_string()));
        Ok(())
    }
}

struct AsyncDrain {
    sender: Sender<LogValue>,
}

impl Drain for AsyncDrain {
    type Ok = ();
    type Err = slog::Never;

    fn log(&self, record: &Record, logger_values: &OwnedKVList) -> Result<(), slog::Never> {
        let mut kv_pairs = Vec::new();
        let mut collector = KvCollector(&mut kv_pairs);
        let _ = record.kv().serialize(record, &mut collector);
        let _ = logger_values.serialize(record, &mut collector);

        let value = LogValue {
            level: record.level(),
            message: record.msg().to_string(),
            kv_pairs,
            location: format!("{}:{}", record.file(), record.line()),
        };
        match self.sender.try_send(value) {
            Ok(_) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                DROPPED_RECORDS.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

fn write_plain<IO: Write>(io: &mut IO, v: LogValue) -> io::Result<()> {
    write!(io, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.6f"))?;
    write!(io, " {}", v.level)?;
    for (k, v) in &v.kv_pairs {
        write!(io, " {k}: {v},")?;
    }
    if v.message.is_empty() {
        write!(io, " ()")?;
    } else {
        write!(io, " {}", v.message)?;
    }
    writeln!(io, " <{}>", v.location)
}

/// Returns once every sender is gone and all queued records are written.
fn run_io_thread<IO: Write>(receiver: Receiver<LogValue>, mut io: IO) -> IO {
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    while let Ok(v) = receiver.recv() {
        buf.clear();
        let _ = write_plain(&mut buf, v);
        while let Ok(v) = receiver.try_recv() {
            let _ = write_plain(&mut buf, v);
        }
        let _ = io.write_all(&buf);
        let _ = io.flush();
    }
    io
}

/// Keeps the process logger installed, and flushes it on drop.
pub struct LoggerGuard {
    scope_guard: Option<GlobalLoggerGuard>,
    io_thread: Option<JoinHandle<()>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        // the drain and its channel sender go away with the global logger
        drop(self.scope_guard.take());
        if let Some(handle) = self.io_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Install the process logger, the returned guard must be kept until exit.
pub fn setup(verbose_level: u8) -> anyhow::Result<LoggerGuard> {
    let (sender, receiver) = flume::bounded::<LogValue>(CHANNEL_CAPACITY);
    let io_thread = std::thread::Builder::new()
        .name(PROCESS_LOG_THREAD_NAME.to_string())
        .spawn(move || {
            run_io_thread(receiver, io::stderr());
        })
        .context("failed to spawn log io thread")?;

    let logger = slog::Logger::root(AsyncDrain { sender }, slog::o!());
    let scope_guard = slog_scope::set_global_logger(logger);

    let log_level = match verbose_level {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    };

    slog_stdlog::init_with_level(log_level).context("failed to install log bridge")?;
    Ok(LoggerGuard {
        scope_guard: Some(scope_guard),
        io_thread: Some(io_thread),
    })
}
