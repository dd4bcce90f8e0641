//! Dedicated writer task owning a connection's write half.
//!
//! Request methods frame their bytes and queue them on an mpsc channel; a
//! single task drains the channel and writes to the transport. Sends are
//! fire-and-forget from the core's perspective: the channel is the only
//! buffering, and flow control beyond it is the transport's business.
//!
//! ```text
//! subscribe()  ─┐
//! advertise()  ─┼─► mpsc::Sender<OutboundFrame> ─► writer task ─► transport
//! send_message ─┘
//! ```

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, VizwireError};
use crate::protocol::wire::{write_u32_be, LENGTH_PREFIX_SIZE};

/// Default capacity of the outbound frame queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A length-prefixed frame ready to be written.
#[derive(Debug)]
pub struct OutboundFrame {
    /// 4-byte big-endian length prefix.
    prefix: [u8; LENGTH_PREFIX_SIZE],
    /// Frame payload (JSON text or a binary record).
    payload: Bytes,
}

impl OutboundFrame {
    /// Frame a payload, computing its length prefix.
    pub fn new(payload: Bytes) -> Self {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        write_u32_be(&mut prefix, payload.len() as u32);
        Self { prefix, payload }
    }

    /// Total bytes on the wire (prefix + payload).
    pub fn size(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.payload.len()
    }
}

/// Handle for queueing frames onto the writer task.
///
/// Cheaply cloneable.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
}

impl WriterHandle {
    /// Queue a frame for writing.
    ///
    /// Waits for queue capacity; fails only once the connection is gone.
    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| VizwireError::ConnectionClosed)
    }
}

/// Spawn the writer task for a connection's write half.
pub fn spawn_writer_task<W>(
    writer: W,
    channel_capacity: usize,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(channel_capacity);
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

/// Drain queued frames and write them, flushing once per drained batch.
async fn writer_loop<W>(mut rx: mpsc::Receiver<OutboundFrame>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        write_frame(&mut writer, &frame).await?;

        // Coalesce whatever else is already queued before flushing.
        while let Ok(frame) = rx.try_recv() {
            write_frame(&mut writer, &frame).await?;
        }

        writer.flush().await?;
    }

    // Channel closed: all handles dropped, clean shutdown.
    Ok(())
}

async fn write_frame<W>(writer: &mut W, frame: &OutboundFrame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.prefix).await?;
    if !frame.payload.is_empty() {
        writer.write_all(&frame.payload).await?;
    }
    Ok(())
}
