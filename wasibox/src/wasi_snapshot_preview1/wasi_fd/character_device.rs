//! Character devices backing descriptors 0, 1 and 2.
//!
//! The embedder supplies the actual byte source and sinks. A read on a
//! device is a suspension point: it may block the syscall while host work
//! completes, and it must observe the abort signal so cancellation can
//! interrupt a guest stuck on stdin.

use crate::abort::AbortSignal;
use parking_lot::{Condvar, Mutex};
use std::{
    collections::VecDeque,
    fmt::Debug,
    io::{stderr, stdin, stdout, IoSlice, IoSliceMut, Read, Write},
    sync::Arc,
    time::Duration,
};
use wasibox_core::wasi_snapshot_preview1::{Errno, Size, WasiResult};

/// How long a blocking device wait may go without re-checking the abort
/// signal.
const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Describes a character device.
pub trait CharacterDevice: Debug + Send + Sync + 'static {
    /// Reads data from the character device into `iovs`. Returning
    /// `Size(0)` with non-empty `iovs` signals end of input for this
    /// call. Blocks until data, end of input or cancellation
    /// (`Errno::Intr`).
    fn read(&self, iovs: &mut [IoSliceMut<'_>], abort: &AbortSignal) -> WasiResult<Size>;

    /// Writes data from `bufs` to the character device.
    fn write(&self, bufs: &[IoSlice<'_>]) -> WasiResult<Size>;

    /// Bytes currently available to read without blocking, if known.
    fn num_ready_bytes(&self) -> Option<u64> {
        None
    }

    /// Blocks until the device is readable, `timeout` elapses or the
    /// abort signal fires (`Errno::Intr`). Returns whether the device is
    /// readable. `None` means wait without a deadline.
    fn wait_ready(&self, timeout: Option<Duration>, abort: &AbortSignal) -> WasiResult<bool> {
        let _ = timeout;
        if abort.is_aborted() {
            return Err(Errno::Intr);
        }
        Ok(true)
    }
}

impl CharacterDevice for Box<dyn CharacterDevice> {
    fn read(&self, iovs: &mut [IoSliceMut<'_>], abort: &AbortSignal) -> WasiResult<Size> {
        (**self).read(iovs, abort)
    }

    fn write(&self, bufs: &[IoSlice<'_>]) -> WasiResult<Size> {
        (**self).write(bufs)
    }

    fn num_ready_bytes(&self) -> Option<u64> {
        (**self).num_ready_bytes()
    }

    fn wait_ready(&self, timeout: Option<Duration>, abort: &AbortSignal) -> WasiResult<bool> {
        (**self).wait_ready(timeout, abort)
    }
}

fn drain_into_iovs(data: &mut VecDeque<u8>, iovs: &mut [IoSliceMut<'_>]) -> u32 {
    let mut copied = 0;

    for iov in iovs {
        for byte in iov.iter_mut() {
            match data.pop_front() {
                Some(b) => {
                    *byte = b;
                    copied += 1;
                }
                None => return copied,
            }
        }
    }

    copied
}

/// The host process's standard input.
///
/// The underlying blocking read cannot be woken by the abort signal; use
/// [`QueuedStdin`] when prompt cancellation of pending reads matters.
#[derive(Debug)]
pub struct Stdin;

impl CharacterDevice for Stdin {
    fn read(&self, iovs: &mut [IoSliceMut<'_>], abort: &AbortSignal) -> WasiResult<Size> {
        if abort.is_aborted() {
            return Err(Errno::Intr);
        }

        Ok(stdin().lock().read_vectored(iovs).map(|s| Size(s as u32))?)
    }

    fn write(&self, _bufs: &[IoSlice<'_>]) -> WasiResult<Size> {
        Ok(Size(0))
    }
}

/// The host process's standard output.
#[derive(Debug)]
pub struct Stdout;

impl CharacterDevice for Stdout {
    fn read(&self, _iovs: &mut [IoSliceMut<'_>], _abort: &AbortSignal) -> WasiResult<Size> {
        Ok(Size(0))
    }

    fn write(&self, bufs: &[IoSlice<'_>]) -> WasiResult<Size> {
        Ok(stdout()
            .lock()
            .write_vectored(bufs)
            .map(|s| Size(s as u32))?)
    }

    fn num_ready_bytes(&self) -> Option<u64> {
        Some(0)
    }
}

/// The host process's standard error.
#[derive(Debug)]
pub struct Stderr;

impl CharacterDevice for Stderr {
    fn read(&self, _iovs: &mut [IoSliceMut<'_>], _abort: &AbortSignal) -> WasiResult<Size> {
        Ok(Size(0))
    }

    fn write(&self, bufs: &[IoSlice<'_>]) -> WasiResult<Size> {
        Ok(stderr()
            .lock()
            .write_vectored(bufs)
            .map(|s| Size(s as u32))?)
    }

    fn num_ready_bytes(&self) -> Option<u64> {
        Some(0)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    data: VecDeque<u8>,
    eof: bool,
}

#[derive(Debug, Default)]
struct QueueInner {
    state: Mutex<QueueState>,
    readable: Condvar,
}

/// A stdin source fed by the embedder. Reads block on a condvar until
/// bytes are pushed, input is closed or the abort signal fires, so
/// cancellation interrupts a pending read promptly.
#[derive(Debug, Clone, Default)]
pub struct QueuedStdin {
    inner: Arc<QueueInner>,
}

impl QueuedStdin {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes for the guest to read and wakes pending readers.
    pub fn push(&self, bytes: &[u8]) {
        let mut state = self.inner.state.lock();
        state.data.extend(bytes);
        self.inner.readable.notify_all();
    }

    /// Marks end of input: a pending or later read with an empty queue
    /// reports end of file.
    pub fn close_input(&self) {
        let mut state = self.inner.state.lock();
        state.eof = true;
        self.inner.readable.notify_all();
    }
}

impl CharacterDevice for QueuedStdin {
    fn read(&self, iovs: &mut [IoSliceMut<'_>], abort: &AbortSignal) -> WasiResult<Size> {
        let mut state = self.inner.state.lock();

        loop {
            if abort.is_aborted() {
                return Err(Errno::Intr);
            }
            if !state.data.is_empty() {
                return Ok(Size(drain_into_iovs(&mut state.data, iovs)));
            }
            if state.eof {
                return Ok(Size(0));
            }

            // The abort signal has its own condvar, so bound the wait and
            // poll it.
            self.inner
                .readable
                .wait_for(&mut state, ABORT_POLL_INTERVAL);
        }
    }

    fn write(&self, _bufs: &[IoSlice<'_>]) -> WasiResult<Size> {
        Ok(Size(0))
    }

    fn num_ready_bytes(&self) -> Option<u64> {
        let state = self.inner.state.lock();
        if state.data.is_empty() && state.eof {
            // End of input reads as "ready": a read returns 0 immediately.
            Some(1)
        } else {
            Some(state.data.len() as u64)
        }
    }

    fn wait_ready(&self, timeout: Option<Duration>, abort: &AbortSignal) -> WasiResult<bool> {
        let deadline = timeout.map(|timeout| std::time::Instant::now() + timeout);
        let mut state = self.inner.state.lock();

        loop {
            if abort.is_aborted() {
                return Err(Errno::Intr);
            }
            if !state.data.is_empty() || state.eof {
                return Ok(true);
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = std::time::Instant::now();
                    if now >= deadline {
                        return Ok(false);
                    }
                    (deadline - now).min(ABORT_POLL_INTERVAL)
                }
                None => ABORT_POLL_INTERVAL,
            };
            self.inner.readable.wait_for(&mut state, wait);
        }
    }
}

/// A capturing byte sink for embedders and tests.
#[derive(Debug, Clone, Default)]
pub struct SharedSink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }
}

impl CharacterDevice for SharedSink {
    fn read(&self, _iovs: &mut [IoSliceMut<'_>], _abort: &AbortSignal) -> WasiResult<Size> {
        Ok(Size(0))
    }

    fn write(&self, bufs: &[IoSlice<'_>]) -> WasiResult<Size> {
        let mut buffer = self.buffer.lock();
        let mut written = 0;

        for buf in bufs {
            buffer.extend_from_slice(buf);
            written += buf.len();
        }

        Ok(Size(written as u32))
    }

    fn num_ready_bytes(&self) -> Option<u64> {
        Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_once(device: &dyn CharacterDevice, len: usize, abort: &AbortSignal) -> WasiResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = {
            let mut iovs = [IoSliceMut::new(&mut buf[..])];
            device.read(&mut iovs, abort)?
        };
        buf.truncate(n.0 as usize);
        Ok(buf)
    }

    #[test]
    fn queued_stdin_hands_out_pushed_bytes() {
        let stdin = QueuedStdin::new();
        stdin.push(b"hello");

        let out = read_once(&stdin, 16, &AbortSignal::new()).unwrap();
        assert_eq!(out, b"hello");
        assert_eq!(stdin.num_ready_bytes(), Some(0));
    }

    #[test]
    fn queued_stdin_reports_eof_with_zero_bytes() {
        let stdin = QueuedStdin::new();
        stdin.close_input();

        let out = read_once(&stdin, 4, &AbortSignal::new()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn queued_stdin_read_is_interrupted_by_abort() {
        let stdin = QueuedStdin::new();
        let abort = AbortSignal::new();
        abort.abort();

        assert_eq!(read_once(&stdin, 4, &abort), Err(Errno::Intr));
    }

    #[test]
    fn queued_stdin_read_wakes_on_late_abort() {
        let stdin = QueuedStdin::new();
        let abort = AbortSignal::new();

        let firing = abort.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            firing.abort();
        });

        assert_eq!(read_once(&stdin, 4, &abort), Err(Errno::Intr));
        handle.join().unwrap();
    }

    #[test]
    fn queued_stdin_drains_across_iovecs() {
        let stdin = QueuedStdin::new();
        stdin.push(b"abcdef");

        let mut first = [0u8; 2];
        let mut second = [0u8; 3];
        let n = {
            let mut iovs = [IoSliceMut::new(&mut first), IoSliceMut::new(&mut second)];
            stdin.read(&mut iovs, &AbortSignal::new()).unwrap()
        };

        assert_eq!(n, Size(5));
        assert_eq!(&first, b"ab");
        assert_eq!(&second, b"cde");
        assert_eq!(stdin.num_ready_bytes(), Some(1));
    }

    #[test]
    fn wait_ready_times_out_on_silence() {
        let stdin = QueuedStdin::new();

        let ready = stdin
            .wait_ready(Some(Duration::from_millis(10)), &AbortSignal::new())
            .unwrap();
        assert!(!ready);
    }

    #[test]
    fn shared_sink_captures_writes_in_order() {
        let sink = SharedSink::new();

        sink.write(&[IoSlice::new(b"a"), IoSlice::new(b"bc")]).unwrap();
        sink.write(&[IoSlice::new(b"d")]).unwrap();

        assert_eq!(sink.contents(), b"abcd");
    }
}
