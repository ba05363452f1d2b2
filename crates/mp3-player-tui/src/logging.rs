//! Tracing setup: a log file plus a channel feeding the TUI log pane.
//!
//! Nothing is written to stdout while the terminal is in raw mode.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "info,mp3_player=info";

/// Install the global subscriber. Returns the receiving end of the log pane channel.
pub(crate) fn init(log_file: &Path) -> Result<Receiver<String>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("open log file {:?}", log_file))?;
    let (tx, rx) = unbounded();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .without_time()
                .with_writer(ChannelWriter::new(tx)),
        )
        .try_init()
        .context("install tracing subscriber")?;
    Ok(rx)
}

/// Sends each formatted line to a channel.
#[derive(Clone)]
pub(crate) struct ChannelWriter {
    tx: Sender<String>,
}

impl ChannelWriter {
    pub(crate) fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }
}

impl<'a> MakeWriter<'a> for ChannelWriter {
    type Writer = LineSink;

    fn make_writer(&'a self) -> Self::Writer {
        LineSink {
            tx: self.tx.clone(),
            buf: Vec::new(),
        }
    }
}

/// Buffers one event's output and ships it on drop.
pub(crate) struct LineSink {
    tx: Sender<String>,
    buf: Vec<u8>,
}

impl Write for LineSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LineSink {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buf);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            // Receiver gone means the UI exited.
            let _ = self.tx.send(line.trim_end().to_string());
        }
    }
}
