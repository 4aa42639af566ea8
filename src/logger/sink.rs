use crate::{error::Error, logger::codec::EventLineCodec};
use bytes::BytesMut;
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tokio_util::codec::Encoder;
use tracing::debug;

/// Consumer of complete event lines.
///
/// Called exactly once per logged event, synchronously, on the calling
/// thread. Implementations own delivery, batching and any locking needed
/// to keep concurrent lines from interleaving.
pub trait LogSink: Send + Sync {
    fn write(&self, line: String) -> io::Result<()>;
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn write(&self, line: String) -> io::Result<()> {
        (**self).write(line)
    }
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn write(&self, line: String) -> io::Result<()> {
        (**self).write(line)
    }
}

/// Writes each line, newline terminated, to an [`io::Write`].
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl WriterSink<File> {
    /// Append lines to the file at `path`, creating it if needed.
    pub fn append<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn write(&self, mut line: String) -> io::Result<()> {
        line.push('\n');
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.locked().clone()
    }

    /// Remove and return the lines collected so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.locked())
    }

    fn locked(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogSink for MemorySink {
    fn write(&self, line: String) -> io::Result<()> {
        self.locked().push(line);
        Ok(())
    }
}

/// Discards every line.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn write(&self, _line: String) -> io::Result<()> {
        Ok(())
    }
}

/// Hands lines to a [`LineReceiver`], typically drained by an async task.
///
/// Writing never blocks. Once the receiver is dropped writes fail with
/// [`io::ErrorKind::BrokenPipe`].
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, LineReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, LineReceiver { rx })
    }
}

impl LogSink for ChannelSink {
    fn write(&self, line: String) -> io::Result<()> {
        self.tx
            .send(line)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "line receiver closed"))
    }
}

#[derive(Debug)]
pub struct LineReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl LineReceiver {
    /// Next line, or `None` once every [`ChannelSink`] has been dropped.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Write every line to `writer` until all senders are gone.
    ///
    /// Lines that are already queued are written together before each
    /// flush. Returns the number of lines written.
    pub async fn forward<W: AsyncWrite + Unpin>(mut self, mut writer: W) -> Result<u64, Error> {
        let mut codec = EventLineCodec::default();
        let mut buf = BytesMut::new();
        let mut count = 0;

        while let Some(line) = self.rx.recv().await {
            codec.encode(line, &mut buf)?;
            count += 1;
            while let Ok(line) = self.rx.try_recv() {
                codec.encode(line, &mut buf)?;
                count += 1;
            }

            debug!(bytes = buf.len(), "Forwarding event lines");
            writer.write_all_buf(&mut buf).await?;
            writer.flush().await?;
        }

        Ok(count)
    }
}
