//! Local IPC endpoint the comment source connects to.
//!
//! The listener is non-blocking and polled from the tick loop. Once the
//! source connects, a reader thread forwards newline-delimited lines over a
//! crossbeam channel so the scheduler only sees them at tick boundaries.

use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::thread;
use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, info, trace, warn};
use crate::events::SourceError;

/// Longest accepted line, newline included
pub const MAX_LINE_BYTES: usize = 64 * 1024;
/// How much of an overlong line is kept for diagnostics
const PREVIEW_BYTES: usize = 80;

/// Message from the reader thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpcMessage {
    Line(String),
    /// A line over `MAX_LINE_BYTES`; only its start is kept
    Overlong { preview: String, len: usize },
    /// End of stream; carries the read error if there was one
    Closed(Option<String>),
}

struct Connection {
    stream: UnixStream,
    reader: Option<thread::JoinHandle<()>>,
    rx: Receiver<IpcMessage>,
}

/// Bound socket path plus at most one accepted connection
pub struct IpcEndpoint {
    path: PathBuf,
    listener: Option<UnixListener>,
    connection: Option<Connection>,
    closed: bool,
}

impl IpcEndpoint {
    /// Bind a listener at `path`, replacing a stale socket file
    pub fn bind(path: &Path) -> Result<Self, SourceError> {
        remove_socket_file(path);

        let bind_err = |source| SourceError::Bind {
            path: path.to_path_buf(),
            source,
        };
        let listener = UnixListener::bind(path).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;

        info!(path = %path.display(), "listening for comment source");
        Ok(Self {
            path: path.to_path_buf(),
            listener: Some(listener),
            connection: None,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Accept the source's connection if it is waiting.
    /// Returns `Ok(true)` exactly once, when the connection is established.
    pub fn poll_accept(&mut self) -> Result<bool, SourceError> {
        if self.connection.is_some() {
            return Ok(false);
        }
        let Some(listener) = &self.listener else {
            return Ok(false);
        };

        let stream = match listener.accept() {
            Ok((stream, _)) => stream,
            Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(false),
            Err(err) => return Err(SourceError::Io(err)),
        };
        stream.set_nonblocking(false)?;
        let read_half = stream.try_clone()?;

        let (tx, rx) = channel::unbounded();
        let reader = thread::Builder::new()
            .name("danmaku-ipc-reader".to_string())
            .spawn(move || read_lines(read_half, tx))?;

        // one source per endpoint
        self.listener = None;
        self.connection = Some(Connection {
            stream,
            reader: Some(reader),
            rx,
        });
        info!(path = %self.path.display(), "comment source connected");
        Ok(true)
    }

    /// Messages received since the last call, without blocking
    pub fn try_iter(&self) -> impl Iterator<Item = IpcMessage> + '_ {
        self.connection
            .iter()
            .flat_map(|connection| connection.rx.try_iter())
    }

    /// Shut the stream down, join the reader, and unlink the socket file
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(mut connection) = self.connection.take() {
            if let Err(err) = connection.stream.shutdown(Shutdown::Both) {
                debug!(?err, "ipc shutdown");
            }
            if let Some(reader) = connection.reader.take() {
                if reader.join().is_err() {
                    warn!("ipc reader thread panicked");
                }
            }
        }
        self.listener = None;
        remove_socket_file(&self.path);
    }
}

impl Drop for IpcEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}

fn remove_socket_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => trace!(path = %path.display(), "removed socket file"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(?err, path = %path.display(), "could not remove socket file"),
    }
}

/// Outcome of one bounded line read
#[derive(Debug, PartialEq, Eq)]
enum ReadLine {
    Eof,
    Line,
    /// The line ran past the limit; `buf` holds its first bytes and the rest
    /// was skipped up to the next newline
    Overlong(usize),
}

fn read_line_capped<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> io::Result<ReadLine> {
    let limit = max as u64;
    let n = reader.by_ref().take(limit + 1).read_until(b'\n', buf)?;
    if n == 0 {
        return Ok(ReadLine::Eof);
    }
    if buf.len() <= max || buf.ends_with(b"\n") {
        return Ok(ReadLine::Line);
    }

    let mut len = buf.len();
    let mut skipped = Vec::new();
    loop {
        skipped.clear();
        let n = reader.by_ref().take(limit.max(1)).read_until(b'\n', &mut skipped)?;
        len += n;
        if n == 0 || skipped.ends_with(b"\n") {
            return Ok(ReadLine::Overlong(len));
        }
    }
}

fn read_lines(stream: UnixStream, tx: Sender<IpcMessage>) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match read_line_capped(&mut reader, &mut buf, MAX_LINE_BYTES) {
            Ok(ReadLine::Eof) => {
                let _ = tx.send(IpcMessage::Closed(None));
                return;
            }
            Ok(ReadLine::Line) => {
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(IpcMessage::Line(line)).is_err() {
                    return;
                }
            }
            Ok(ReadLine::Overlong(len)) => {
                let head = &buf[..PREVIEW_BYTES.min(buf.len())];
                let preview = String::from_utf8_lossy(head).into_owned();
                if tx.send(IpcMessage::Overlong { preview, len }).is_err() {
                    return;
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                let _ = tx.send(IpcMessage::Closed(Some(err.to_string())));
                return;
            }
        }
    }
}
