//! Buffered writable streams.
//!
//! A writable stream owns a detached byte buffer for the whole lifetime
//! of an open. Nothing is visible in the volume until [`close`] publishes
//! the buffer atomically as a fresh file node; a reader that opened the
//! file earlier keeps the node (and content) it already holds.
//!
//! [`close`]: WritableStream::close

use crate::volume::{DirRef, MemVolume, VolumeError};
use parking_lot::Mutex;

#[derive(Debug)]
struct StreamState {
    buf: Vec<u8>,
    cursor: u64,
    closed: bool,
}

/// A buffered writer publishing to a volume location on close.
#[derive(Debug)]
pub struct WritableStream {
    volume: MemVolume,
    root: DirRef,
    path: Vec<Vec<u8>>,
    state: Mutex<StreamState>,
}

impl WritableStream {
    pub(crate) fn new(
        volume: MemVolume,
        root: DirRef,
        path: Vec<Vec<u8>>,
        initial: Vec<u8>,
    ) -> Self {
        Self {
            volume,
            root,
            path,
            state: Mutex::new(StreamState {
                buf: initial,
                cursor: 0,
                closed: false,
            }),
        }
    }

    fn with_state<R>(
        &self,
        f: impl FnOnce(&mut StreamState) -> R,
    ) -> Result<R, VolumeError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(VolumeError::StreamClosed);
        }
        Ok(f(&mut state))
    }

    /// Writes `bytes` at `at`, or at the cursor when `at` is `None`. The
    /// buffer is zero-filled up to the write position if it lies beyond
    /// the current size. A cursor write advances the cursor to the end of
    /// the written range; a positioned write leaves it untouched.
    pub fn write(&self, bytes: &[u8], at: Option<u64>) -> Result<(), VolumeError> {
        self.with_state(|state| {
            let position = at.unwrap_or(state.cursor) as usize;
            let end = position + bytes.len();

            if end > state.buf.len() {
                state.buf.resize(end, 0);
            }
            state.buf[position..end].copy_from_slice(bytes);

            if at.is_none() {
                state.cursor = end as u64;
            }
        })
    }

    /// Reads up to `out.len()` bytes at `offset` without touching the
    /// cursor. Returns the number of bytes read; 0 at or past the end.
    pub(crate) fn read_at(&self, offset: u64, out: &mut [u8]) -> Result<usize, VolumeError> {
        self.with_state(|state| {
            let offset = offset as usize;
            let available = state.buf.len().saturating_sub(offset);
            let len = out.len().min(available);

            out[..len].copy_from_slice(&state.buf[offset..offset + len]);
            len
        })
    }

    /// Moves the cursor. Positions beyond the current size are legal; the
    /// gap is zero-filled by the next write.
    pub fn seek(&self, position: u64) -> Result<(), VolumeError> {
        self.with_state(|state| state.cursor = position)
    }

    /// The current cursor position.
    pub fn tell(&self) -> Result<u64, VolumeError> {
        self.with_state(|state| state.cursor)
    }

    /// The current buffer size in bytes.
    pub fn size(&self) -> Result<u64, VolumeError> {
        self.with_state(|state| state.buf.len() as u64)
    }

    /// Shrinks the buffer or extends it with zero bytes.
    pub fn truncate(&self, size: u64) -> Result<(), VolumeError> {
        self.with_state(|state| state.buf.resize(size as usize, 0))
    }

    /// Publishes the buffer as a fresh file node at the stream's location,
    /// creating the parent directory if it does not exist. A second close
    /// is a no-op; any other call after close fails.
    pub fn close(&self) -> Result<(), VolumeError> {
        let buf = {
            let mut state = self.state.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            std::mem::take(&mut state.buf)
        };

        self.volume
            .install_file_at(&self.root, &self.path, buf, true)
    }
}
