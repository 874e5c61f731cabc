//! The file descriptor table.
//!
//! Descriptors 0, 1 and 2 are the character devices; preopens follow from
//! 3 in their given order. Dynamic allocation always hands out the lowest
//! unused number at or above 3, so guests that probe descriptors get
//! deterministic answers.

use super::wasi_fd::WasiFd;
use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};
use wasibox_core::wasi_snapshot_preview1::{Errno, Fd, WasiResult};

const FIRST_DYNAMIC_FD: u32 = 3;

#[derive(Debug)]
struct FdNumbers {
    next: u32,
    free: BTreeSet<u32>,
}

impl FdNumbers {
    fn new() -> Self {
        Self {
            next: FIRST_DYNAMIC_FD,
            free: BTreeSet::new(),
        }
    }

    /// The lowest unused number at or above [`FIRST_DYNAMIC_FD`].
    fn allocate(&mut self) -> WasiResult<u32> {
        if let Some(&fd) = self.free.iter().next() {
            self.free.remove(&fd);
            return Ok(fd);
        }

        let fd = self.next;
        self.next = self.next.checked_add(1).ok_or(Errno::Nfile)?;
        Ok(fd)
    }

    fn deallocate(&mut self, fd: u32) {
        if fd >= FIRST_DYNAMIC_FD {
            self.free.insert(fd);
        }
    }

    /// Marks a specific number as used, e.g. a renumber target.
    fn claim(&mut self, fd: u32) {
        if fd < FIRST_DYNAMIC_FD {
            return;
        }

        if fd >= self.next {
            for gap in self.next..fd {
                self.free.insert(gap);
            }
            self.next = fd + 1;
        } else {
            self.free.remove(&fd);
        }
    }
}

/// Maps descriptors to open files.
#[derive(Debug)]
pub(crate) struct OpenFiles<S> {
    map: HashMap<Fd, Arc<WasiFd<S>>>,
    numbers: FdNumbers,
}

impl<S> OpenFiles<S> {
    pub(crate) fn new() -> Self {
        Self {
            map: HashMap::new(),
            numbers: FdNumbers::new(),
        }
    }

    /// Installs one of the fixed descriptors (0, 1, 2).
    pub(crate) fn insert_fixed(&mut self, fd: Fd, file: WasiFd<S>) {
        debug_assert!(fd.0 < FIRST_DYNAMIC_FD);
        self.map.insert(fd, Arc::new(file));
    }

    /// Installs a file at the lowest free descriptor.
    pub(crate) fn install(&mut self, file: WasiFd<S>) -> WasiResult<Fd> {
        let fd = Fd(self.numbers.allocate()?);
        self.map.insert(fd, Arc::new(file));
        Ok(fd)
    }

    pub(crate) fn get(&self, fd: Fd) -> WasiResult<Arc<WasiFd<S>>> {
        self.map.get(&fd).cloned().ok_or(Errno::Badf)
    }

    /// Removes a descriptor, returning the file so the caller can flush
    /// it outside the table lock.
    pub(crate) fn remove(&mut self, fd: Fd) -> WasiResult<Arc<WasiFd<S>>> {
        let file = self.map.remove(&fd).ok_or(Errno::Badf)?;
        self.numbers.deallocate(fd.0);
        Ok(file)
    }

    /// Transplants `from` onto `to`, closing `to` first if it is open.
    /// Returns the displaced file, if any, for the caller to drop outside
    /// the lock.
    pub(crate) fn renumber(&mut self, from: Fd, to: Fd) -> WasiResult<Option<Arc<WasiFd<S>>>> {
        if from == to {
            self.get(from)?;
            return Ok(None);
        }

        let file = self.map.remove(&from).ok_or(Errno::Badf)?;
        self.numbers.deallocate(from.0);
        self.numbers.claim(to.0);

        Ok(self.map.insert(to, file))
    }

    /// Empties the table, returning every open file for cleanup.
    pub(crate) fn drain(&mut self) -> Vec<Arc<WasiFd<S>>> {
        self.numbers = FdNumbers::new();
        self.map.drain().map(|(_, file)| file).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wasi_snapshot_preview1::SharedSink;
    use wasibox_core::{
        string_representation::Bytes,
        wasi_snapshot_preview1::{Fdflags, Rights},
    };

    fn sink_fd() -> WasiFd<Bytes> {
        WasiFd::from_character_device(SharedSink::new(), Fdflags::empty(), Rights::all())
    }

    #[test]
    fn allocation_starts_at_three_and_is_lowest_first() {
        let mut files = OpenFiles::<Bytes>::new();

        assert_eq!(files.install(sink_fd()).unwrap(), Fd(3));
        assert_eq!(files.install(sink_fd()).unwrap(), Fd(4));
        assert_eq!(files.install(sink_fd()).unwrap(), Fd(5));

        files.remove(Fd(4)).unwrap();
        files.remove(Fd(3)).unwrap();

        assert_eq!(files.install(sink_fd()).unwrap(), Fd(3));
        assert_eq!(files.install(sink_fd()).unwrap(), Fd(4));
        assert_eq!(files.install(sink_fd()).unwrap(), Fd(6));
    }

    #[test]
    fn get_unknown_fd_is_badf() {
        let files = OpenFiles::<Bytes>::new();
        assert_eq!(files.get(Fd(9)).unwrap_err(), Errno::Badf);
    }

    #[test]
    fn renumber_transplants_and_displaces() {
        let mut files = OpenFiles::<Bytes>::new();

        let a = files.install(sink_fd()).unwrap();
        let b = files.install(sink_fd()).unwrap();
        let moved = files.get(a).unwrap();

        let displaced = files.renumber(a, b).unwrap();
        assert!(displaced.is_some());
        assert!(Arc::ptr_eq(&files.get(b).unwrap(), &moved));
        assert_eq!(files.get(a).unwrap_err(), Errno::Badf);
    }

    #[test]
    fn renumber_to_a_closed_descriptor_claims_it() {
        let mut files = OpenFiles::<Bytes>::new();

        let a = files.install(sink_fd()).unwrap();
        assert!(files.renumber(a, Fd(7)).unwrap().is_none());
        assert!(files.get(Fd(7)).is_ok());

        // 3..=6 are free again, 7 is taken.
        assert_eq!(files.install(sink_fd()).unwrap(), Fd(3));
        assert_eq!(files.install(sink_fd()).unwrap(), Fd(4));
        assert_eq!(files.install(sink_fd()).unwrap(), Fd(5));
        assert_eq!(files.install(sink_fd()).unwrap(), Fd(6));
        assert_eq!(files.install(sink_fd()).unwrap(), Fd(8));
    }

    #[test]
    fn renumber_missing_source_is_badf() {
        let mut files = OpenFiles::<Bytes>::new();
        assert_eq!(files.renumber(Fd(3), Fd(4)).unwrap_err(), Errno::Badf);
    }

    #[test]
    fn drain_empties_the_table() {
        let mut files = OpenFiles::<Bytes>::new();

        files.install(sink_fd()).unwrap();
        files.install(sink_fd()).unwrap();

        assert_eq!(files.drain().len(), 2);
        assert_eq!(files.get(Fd(3)).unwrap_err(), Errno::Badf);
        assert_eq!(files.install(sink_fd()).unwrap(), Fd(3));
    }
}
