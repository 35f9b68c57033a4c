//! Dedicated writer task for the session's write pipeline.
//!
//! Producers hand fully encoded frames to an mpsc channel; a single
//! writer task owns the socket's write half and drains the channel,
//! batching frames into `write_vectored` calls. This keeps exactly one
//! write outstanding per socket, preserves per-producer submission order,
//! and coalesces concurrent producers into one syscall-driven batch.
//!
//! ```text
//! send()    ─┐
//! refresh   ─┼─► mpsc::Sender<Bytes> ─► Writer Task ─► TcpStream
//! bootstrap ─┘
//! ```
//!
//! An atomic pending counter bounds the number of enqueued frames;
//! producers that find it full wait up to a configured timeout before
//! failing with [`Error::BackpressureTimeout`].

use std::collections::VecDeque;
use std::io::IoSlice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// Default maximum pending frames before backpressure kicks in.
pub(crate) const DEFAULT_MAX_PENDING_FRAMES: usize = 1024;

/// Default channel capacity.
pub(crate) const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Default backpressure timeout.
pub(crate) const DEFAULT_BACKPRESSURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum frames to batch in a single write operation.
const MAX_BATCH_SIZE: usize = 64;

/// Interval between backpressure checks.
const CHECK_INTERVAL: Duration = Duration::from_micros(100);

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub(crate) struct WriterConfig {
    /// Maximum pending frames before backpressure kicks in.
    pub max_pending_frames: usize,
    /// Channel capacity for the frame queue.
    pub channel_capacity: usize,
    /// Timeout when waiting for backpressure to clear.
    pub backpressure_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_pending_frames: DEFAULT_MAX_PENDING_FRAMES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            backpressure_timeout: DEFAULT_BACKPRESSURE_TIMEOUT,
        }
    }
}

/// Handle for submitting frames to the writer task.
///
/// Cheaply cloneable; dropping every handle closes the channel and ends
/// the task.
#[derive(Clone)]
pub(crate) struct WriterHandle {
    tx: mpsc::Sender<Bytes>,
    pending: Arc<AtomicUsize>,
    max_pending: usize,
    timeout: Duration,
}

impl WriterHandle {
    /// Submit a frame, waiting out backpressure up to the configured
    /// timeout.
    pub(crate) async fn send(&self, frame: Bytes) -> Result<()> {
        if self.pending.load(Ordering::Acquire) >= self.max_pending {
            self.wait_for_backpressure().await?;
        }

        self.pending.fetch_add(1, Ordering::AcqRel);
        self.tx.send(frame).await.map_err(|_| {
            self.pending.fetch_sub(1, Ordering::Release);
            // Writer task gone: the session is tearing down.
            Error::RequestCanceled
        })
    }

    async fn wait_for_backpressure(&self) -> Result<()> {
        let start = Instant::now();
        loop {
            if self.pending.load(Ordering::Acquire) < self.max_pending {
                return Ok(());
            }
            if start.elapsed() > self.timeout {
                return Err(Error::BackpressureTimeout);
            }
            tokio::time::sleep(CHECK_INTERVAL).await;
        }
    }

    /// Current pending frame count.
    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

/// Spawn the writer task over a socket write half.
pub(crate) fn spawn_writer_task<W>(
    writer: W,
    config: WriterConfig,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let pending = Arc::new(AtomicUsize::new(0));

    let handle = WriterHandle {
        tx,
        pending: pending.clone(),
        max_pending: config.max_pending_frames,
        timeout: config.backpressure_timeout,
    };

    let task = tokio::spawn(writer_loop(rx, writer, pending));
    (handle, task)
}

/// Main writer loop: receive frames, batch, write.
async fn writer_loop<W>(
    mut rx: mpsc::Receiver<Bytes>,
    mut writer: W,
    pending: Arc<AtomicUsize>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let first = match rx.recv().await {
            Some(frame) => frame,
            // Channel closed, clean shutdown.
            None => return Ok(()),
        };

        let mut batch = VecDeque::with_capacity(MAX_BATCH_SIZE);
        batch.push_back(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(frame) => batch.push_back(frame),
                Err(_) => break,
            }
        }

        let batch_size = batch.len();
        write_batch(&mut writer, &mut batch).await?;
        pending.fetch_sub(batch_size, Ordering::Release);
    }
}

/// Write a batch of frames with scatter/gather I/O, handling partial
/// writes by advancing the front of the queue.
async fn write_batch<W>(writer: &mut W, batch: &mut VecDeque<Bytes>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while !batch.is_empty() {
        let slices: Vec<IoSlice<'_>> = batch.iter().map(|frame| IoSlice::new(frame)).collect();
        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }

        let mut remaining = written;
        while remaining > 0 {
            let front_len = batch
                .front()
                .map(Bytes::len)
                .expect("written bytes exceed batch");
            if front_len <= remaining {
                batch.pop_front();
                remaining -= front_len;
            } else {
                batch
                    .front_mut()
                    .expect("front checked above")
                    .advance(remaining);
                remaining = 0;
            }
        }
    }

    writer.flush().await?;
    Ok(())
}
