use wasibox_core::wasi_snapshot_preview1::{Fdflags, Rights};

use std::{
    fmt,
    sync::atomic::{AtomicU16, AtomicU64, Ordering},
};

pub(crate) struct AtomicFdflags(AtomicU16);

impl fmt::Debug for AtomicFdflags {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.get().fmt(fmt)
    }
}

impl AtomicFdflags {
    pub(crate) fn new(flags: Fdflags) -> Self {
        Self(AtomicU16::new(flags.bits()))
    }

    pub(crate) fn get(&self) -> Fdflags {
        Fdflags::from_bits_truncate(self.0.load(Ordering::Relaxed))
    }

    pub(crate) fn set(&self, flags: Fdflags) {
        self.0.store(flags.bits(), Ordering::Relaxed);
    }
}

pub(crate) struct AtomicRights(AtomicU64);

impl fmt::Debug for AtomicRights {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.get().fmt(fmt)
    }
}

impl AtomicRights {
    pub(crate) fn new(rights: Rights) -> Self {
        Self(AtomicU64::new(rights.bits()))
    }

    pub(crate) fn get(&self) -> Rights {
        Rights::from_bits_truncate(self.0.load(Ordering::Relaxed))
    }

    pub(crate) fn compare_and_swap(&self, current: Rights, new: Rights) -> bool {
        self.0
            .compare_exchange(
                current.bits(),
                new.bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .is_ok()
    }
}
