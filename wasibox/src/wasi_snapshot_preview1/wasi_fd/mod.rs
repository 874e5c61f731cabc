//! Open descriptors: character devices, files and directories.

mod character_device;

use super::atomic::{AtomicFdflags, AtomicRights};
use crate::{
    abort::AbortSignal,
    handle::{Location, Preopen},
    volume::{DirRef, FileRef, MemVolume, Node, VolumeError},
    writable::WritableStream,
};
use std::{
    io::{IoSlice, IoSliceMut},
    marker::PhantomData,
    sync::Arc,
};
use parking_lot::Mutex;
use wasibox_core::{
    string_representation::StringRepresentation,
    wasi_snapshot_preview1::{
        Device, Dircookie, Dirent, Errno, Fdflags, Fdstat, Filedelta, Filesize, Filestat,
        Filetype, Fstflags, Inode, Linkcount, Oflags, Prestat, Rights, Size, Timestamp,
        WasiResult, Whence,
    },
};

/// Rights granted on regular file descriptors.
pub const RIGHTS_REGULAR_FILE_BASE: Rights = Rights::from_bits_truncate(
    Rights::FD_DATASYNC.bits()
        | Rights::FD_READ.bits()
        | Rights::FD_SEEK.bits()
        | Rights::FD_FDSTAT_SET_FLAGS.bits()
        | Rights::FD_SYNC.bits()
        | Rights::FD_TELL.bits()
        | Rights::FD_WRITE.bits()
        | Rights::FD_ADVISE.bits()
        | Rights::FD_ALLOCATE.bits()
        | Rights::FD_FILESTAT_GET.bits()
        | Rights::FD_FILESTAT_SET_SIZE.bits()
        | Rights::FD_FILESTAT_SET_TIMES.bits()
        | Rights::POLL_FD_READWRITE.bits(),
);

/// Rights granted on directory descriptors (preopens included).
pub const RIGHTS_DIRECTORY_BASE: Rights = Rights::from_bits_truncate(
    Rights::FD_FDSTAT_SET_FLAGS.bits()
        | Rights::FD_SYNC.bits()
        | Rights::PATH_CREATE_DIRECTORY.bits()
        | Rights::PATH_CREATE_FILE.bits()
        | Rights::PATH_LINK_SOURCE.bits()
        | Rights::PATH_LINK_TARGET.bits()
        | Rights::PATH_OPEN.bits()
        | Rights::FD_READDIR.bits()
        | Rights::PATH_READLINK.bits()
        | Rights::PATH_RENAME_SOURCE.bits()
        | Rights::PATH_RENAME_TARGET.bits()
        | Rights::PATH_FILESTAT_GET.bits()
        | Rights::PATH_FILESTAT_SET_SIZE.bits()
        | Rights::PATH_FILESTAT_SET_TIMES.bits()
        | Rights::FD_FILESTAT_GET.bits()
        | Rights::FD_FILESTAT_SET_TIMES.bits()
        | Rights::PATH_SYMLINK.bits()
        | Rights::PATH_REMOVE_DIRECTORY.bits()
        | Rights::PATH_UNLINK_FILE.bits()
        | Rights::POLL_FD_READWRITE.bits(),
);

/// Rights inheritable through a directory descriptor.
pub const RIGHTS_DIRECTORY_INHERITING: Rights = Rights::from_bits_truncate(
    RIGHTS_DIRECTORY_BASE.bits() | RIGHTS_REGULAR_FILE_BASE.bits(),
);

#[allow(unreachable_pub)] // false positive
pub use character_device::{CharacterDevice, QueuedStdin, SharedSink, Stderr, Stdin, Stdout};

/// Content backing of an open regular file.
#[derive(Debug)]
enum FileBacking {
    /// Shared node in the volume; read-only descriptors.
    Node(FileRef),
    /// Detached write buffer published on close; writable descriptors.
    Stream(Arc<WritableStream>),
}

/// An open regular file: backing content, metadata node and cursor.
#[derive(Debug)]
pub(crate) struct FileFd {
    backing: FileBacking,
    node: FileRef,
    volume: MemVolume,
    cursor: Mutex<u64>,
}

impl FileFd {
    fn size(&self) -> WasiResult<u64> {
        match &self.backing {
            FileBacking::Node(node) => Ok(node.lock().bytes.len() as u64),
            FileBacking::Stream(stream) => Ok(stream.size()?),
        }
    }

    fn read_at_into(&self, offset: u64, iovs: &mut [IoSliceMut<'_>]) -> WasiResult<u32> {
        match &self.backing {
            FileBacking::Node(node) => {
                let node = node.lock();
                let mut position = offset as usize;
                let mut copied = 0u32;

                for iov in iovs.iter_mut() {
                    let available = node.bytes.len().saturating_sub(position);
                    let len = iov.len().min(available);
                    iov[..len].copy_from_slice(&node.bytes[position..position + len]);
                    position += len;
                    copied += len as u32;
                    if len < iov.len() {
                        break;
                    }
                }

                Ok(copied)
            }
            FileBacking::Stream(stream) => {
                let mut position = offset;
                let mut copied = 0u32;

                for iov in iovs.iter_mut() {
                    let len = stream.read_at(position, &mut iov[..])?;
                    position += len as u64;
                    copied += len as u32;
                    if len < iov.len() {
                        break;
                    }
                }

                Ok(copied)
            }
        }
    }

    fn write_all_at(&self, offset: u64, bufs: &[IoSlice<'_>]) -> WasiResult<u32> {
        let stream = match &self.backing {
            FileBacking::Stream(stream) => stream,
            FileBacking::Node(_) => return Err(Errno::Badf),
        };

        let mut position = offset;
        let mut written = 0u32;

        for buf in bufs {
            stream.write(buf, Some(position))?;
            position += buf.len() as u64;
            written += buf.len() as u32;
        }

        Ok(written)
    }

    pub(crate) fn stream(&self) -> Option<&Arc<WritableStream>> {
        match &self.backing {
            FileBacking::Stream(stream) => Some(stream),
            FileBacking::Node(_) => None,
        }
    }

    fn filestat(&self) -> WasiResult<Filestat> {
        let meta = self.volume.stat_node(&Node::File(self.node.clone()));
        let size = self.size()?;

        Ok(Filestat {
            dev: Device(meta.dev),
            ino: Inode(meta.ino),
            filetype: Filetype::RegularFile,
            nlink: Linkcount(meta.nlink),
            size: Filesize(size),
            atim: Timestamp(meta.atim),
            mtim: Timestamp(meta.mtim),
            ctim: Timestamp(meta.ctim),
        })
    }
}

/// An open directory.
#[derive(Debug)]
pub(crate) struct DirFd {
    location: Location,
    node: DirRef,
    /// Set on the descriptors handed out at startup; the guest discovers
    /// them through `fd_prestat_get`.
    preopened: bool,
}

impl DirFd {
    pub(crate) fn location(&self) -> &Location {
        &self.location
    }

    fn readdir(&self, cookie: Dircookie) -> WasiResult<Option<(Dirent, Vec<u8>)>> {
        let entry = self.node.lock().entry_at_or_after(cookie.0);

        Ok(entry.map(|(cookie, name, node)| {
            let meta = self.location.volume().stat_node(&node);
            let dirent = Dirent {
                d_next: Dircookie(cookie + 1),
                d_ino: Inode(meta.ino),
                d_namlen: Size(name.len() as u32),
                d_type: meta.filetype,
            };
            (dirent, name)
        }))
    }

    fn filestat(&self) -> Filestat {
        let meta = self
            .location
            .volume()
            .stat_node(&Node::Dir(self.node.clone()));

        Filestat {
            dev: Device(meta.dev),
            ino: Inode(meta.ino),
            filetype: Filetype::Directory,
            nlink: Linkcount(meta.nlink),
            size: Filesize(0),
            atim: Timestamp(meta.atim),
            mtim: Timestamp(meta.mtim),
            ctim: Timestamp(meta.ctim),
        }
    }
}

/// Result of a non-blocking readability probe.
#[derive(Debug, Copy, Clone)]
pub(crate) enum ReadReadiness {
    /// A read would deliver up to this many bytes (0 means end of file,
    /// which also reads without blocking).
    Ready(u64),
    /// A read would block.
    Pending,
}

#[derive(Debug)]
enum WasiFdInner {
    CharacterDevice(Box<dyn CharacterDevice>),
    File(FileFd),
    Dir(DirFd),
}

/// A WASI file descriptor.
#[derive(Debug)]
pub struct WasiFd<S> {
    inner: WasiFdInner,
    flags: AtomicFdflags,
    rights: AtomicRights,
    rights_inheriting: AtomicRights,
    _phantom: PhantomData<fn(S) -> S>,
}

impl<S: StringRepresentation> WasiFd<S> {
    /// Creates a WASI file descriptor from a character device.
    pub fn from_character_device<C: CharacterDevice>(
        character_device: C,
        flags: Fdflags,
        rights: Rights,
    ) -> Self {
        Self::new(
            WasiFdInner::CharacterDevice(Box::new(character_device)),
            flags,
            rights,
            Rights::empty(),
        )
    }

    /// Creates the descriptor for a preopened directory root.
    pub(crate) fn from_preopen(preopen: Arc<Preopen>) -> Self {
        let node = preopen.root().clone();
        let location = Location {
            preopen,
            path: Vec::new(),
        };

        Self::new(
            WasiFdInner::Dir(DirFd {
                location,
                node,
                preopened: true,
            }),
            Fdflags::empty(),
            RIGHTS_DIRECTORY_BASE,
            RIGHTS_DIRECTORY_INHERITING,
        )
    }

    fn new(
        inner: WasiFdInner,
        flags: Fdflags,
        rights: Rights,
        rights_inheriting: Rights,
    ) -> Self {
        WasiFd {
            inner,
            flags: AtomicFdflags::new(flags),
            rights: AtomicRights::new(rights),
            rights_inheriting: AtomicRights::new(rights_inheriting),
            _phantom: PhantomData,
        }
    }

    /// Opens the file or directory at `location`, enforcing the open
    /// flags, and returns the descriptor to install.
    pub(crate) fn open_path(
        location: Location,
        want_dir: bool,
        oflags: Oflags,
        fs_rights_base: Rights,
        fs_rights_inheriting: Rights,
        fdflags: Fdflags,
    ) -> WasiResult<Self> {
        let volume = location.volume().clone();
        let writable = fs_rights_base.contains(Rights::FD_WRITE);

        match location.lookup() {
            Ok(Node::Dir(dir)) => {
                if oflags.contains(Oflags::CREAT) && oflags.contains(Oflags::EXCL) {
                    return Err(Errno::Exist);
                }
                if oflags.contains(Oflags::TRUNC) || writable {
                    return Err(Errno::Isdir);
                }

                Ok(Self::new(
                    WasiFdInner::Dir(DirFd {
                        location,
                        node: dir,
                        preopened: false,
                    }),
                    fdflags,
                    fs_rights_base,
                    fs_rights_inheriting,
                ))
            }
            Ok(Node::File(file)) => {
                if oflags.contains(Oflags::DIRECTORY) || want_dir {
                    return Err(Errno::Notdir);
                }
                if oflags.contains(Oflags::CREAT) && oflags.contains(Oflags::EXCL) {
                    return Err(Errno::Exist);
                }

                let backing = if writable {
                    let keep_existing = !oflags.contains(Oflags::TRUNC);
                    let stream = location.file_handle().create_writable(keep_existing)?;
                    FileBacking::Stream(Arc::new(stream))
                } else {
                    if oflags.contains(Oflags::TRUNC) {
                        return Err(Errno::Inval);
                    }
                    FileBacking::Node(file.clone())
                };

                Ok(Self::new(
                    WasiFdInner::File(FileFd {
                        backing,
                        node: file,
                        volume,
                        cursor: Mutex::new(0),
                    }),
                    fdflags,
                    fs_rights_base,
                    fs_rights_inheriting,
                ))
            }
            Err(VolumeError::NotFound) => {
                if !oflags.contains(Oflags::CREAT) || oflags.contains(Oflags::DIRECTORY) || want_dir
                {
                    return Err(Errno::Noent);
                }

                let file =
                    volume.create_file_at(location.root(), &location.path, false)?;
                let stream = location.file_handle().create_writable(false)?;

                Ok(Self::new(
                    WasiFdInner::File(FileFd {
                        backing: FileBacking::Stream(Arc::new(stream)),
                        node: file,
                        volume,
                        cursor: Mutex::new(0),
                    }),
                    fdflags,
                    fs_rights_base,
                    fs_rights_inheriting,
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) fn check_rights(&self, required: Rights) -> WasiResult<()> {
        Self::check_rights_with(self.rights.get(), required)
    }

    fn check_rights_with(actual: Rights, required: Rights) -> WasiResult<()> {
        if actual.contains(required) {
            Ok(())
        } else {
            Err(Errno::Notcapable)
        }
    }

    pub(crate) fn rights(&self) -> Rights {
        self.rights.get()
    }

    pub(crate) fn rights_inheriting(&self) -> Rights {
        self.rights_inheriting.get()
    }

    /// The directory behind this descriptor, for path-based syscalls.
    pub(crate) fn dir(&self) -> WasiResult<&DirFd> {
        match &self.inner {
            WasiFdInner::Dir(dir) => Ok(dir),
            WasiFdInner::File(_) => Err(Errno::Notdir),
            WasiFdInner::CharacterDevice(_) => Err(Errno::Notdir),
        }
    }

    /// The writable stream behind this descriptor, if any. Used to flush
    /// on close and at run termination.
    pub(crate) fn writable_stream(&self) -> Option<Arc<WritableStream>> {
        match &self.inner {
            WasiFdInner::File(file) => file.stream().cloned(),
            _ => None,
        }
    }

    fn get_filetype(&self) -> Filetype {
        match &self.inner {
            WasiFdInner::CharacterDevice(_) => Filetype::CharacterDevice,
            WasiFdInner::File(_) => Filetype::RegularFile,
            WasiFdInner::Dir(_) => Filetype::Directory,
        }
    }

    pub(crate) fn advise(&self, _offset: Filesize, _len: Filesize) -> WasiResult<()> {
        self.check_rights(Rights::FD_ADVISE)?;

        match &self.inner {
            // Access-pattern hints have no effect on an in-memory store.
            WasiFdInner::File(_) => Ok(()),
            _ => Err(Errno::Badf),
        }
    }

    pub(crate) fn allocate(&self, _offset: Filesize, _len: Filesize) -> WasiResult<()> {
        self.check_rights(Rights::FD_ALLOCATE)?;

        match &self.inner {
            // Space reservation always succeeds on an in-memory store.
            WasiFdInner::File(_) => Ok(()),
            _ => Err(Errno::Badf),
        }
    }

    pub(crate) fn datasync(&self) -> WasiResult<()> {
        self.check_rights(Rights::FD_DATASYNC)?;
        Ok(())
    }

    pub(crate) fn sync(&self) -> WasiResult<()> {
        self.check_rights(Rights::FD_SYNC)?;
        Ok(())
    }

    pub(crate) fn fdstat_get(&self) -> WasiResult<Fdstat> {
        Ok(Fdstat {
            fs_filetype: self.get_filetype(),
            fs_flags: self.flags.get(),
            fs_rights_base: self.rights.get(),
            fs_rights_inheriting: self.rights_inheriting.get(),
        })
    }

    pub(crate) fn fdstat_set_flags(&self, flags: Fdflags) -> WasiResult<()> {
        self.check_rights(Rights::FD_FDSTAT_SET_FLAGS)?;

        self.flags.set(flags);
        Ok(())
    }

    pub(crate) fn fdstat_set_rights(
        &self,
        rights: Rights,
        rights_inheriting: Rights,
    ) -> WasiResult<()> {
        loop {
            let old_rights = self.rights.get();
            let old_rights_inheriting = self.rights_inheriting.get();

            if !old_rights.contains(rights) || !old_rights_inheriting.contains(rights_inheriting) {
                break Err(Errno::Notcapable);
            }

            if self.rights.compare_and_swap(old_rights, rights)
                && self
                    .rights_inheriting
                    .compare_and_swap(old_rights_inheriting, rights_inheriting)
            {
                break Ok(());
            }
        }
    }

    pub(crate) fn filestat_get(&self) -> WasiResult<Filestat> {
        self.check_rights(Rights::FD_FILESTAT_GET)?;

        match &self.inner {
            WasiFdInner::CharacterDevice(_) => Ok(Filestat {
                dev: Device(0),
                ino: Inode(0),
                filetype: Filetype::CharacterDevice,
                nlink: Linkcount(1),
                size: Filesize(0),
                atim: Timestamp(0),
                mtim: Timestamp(0),
                ctim: Timestamp(0),
            }),
            WasiFdInner::File(file) => file.filestat(),
            WasiFdInner::Dir(dir) => Ok(dir.filestat()),
        }
    }

    pub(crate) fn filestat_set_size(&self, size: Filesize) -> WasiResult<()> {
        self.check_rights(Rights::FD_FILESTAT_SET_SIZE)?;

        match &self.inner {
            WasiFdInner::File(file) => match &file.backing {
                FileBacking::Stream(stream) => Ok(stream.truncate(size.0)?),
                FileBacking::Node(node) => {
                    let now = file.volume.now();
                    let mut node = node.lock();
                    node.bytes.resize(size.0 as usize, 0);
                    node.times.mtim = now;
                    node.times.ctim = now;
                    Ok(())
                }
            },
            _ => Err(Errno::Badf),
        }
    }

    pub(crate) fn filestat_set_times(
        &self,
        atim: Timestamp,
        mtim: Timestamp,
        fst_flags: Fstflags,
    ) -> WasiResult<()> {
        self.check_rights(Rights::FD_FILESTAT_SET_TIMES)?;

        let (volume, node) = match &self.inner {
            WasiFdInner::File(file) => (&file.volume, Node::File(file.node.clone())),
            WasiFdInner::Dir(dir) => (
                dir.location.volume(),
                Node::Dir(dir.node.clone()),
            ),
            WasiFdInner::CharacterDevice(_) => return Err(Errno::Badf),
        };

        let (atim, mtim) = resolve_fst_times(volume, atim, mtim, fst_flags)?;
        volume.set_node_times(&node, atim, mtim);
        Ok(())
    }

    pub(crate) fn read(
        &self,
        iovs: &mut [IoSliceMut<'_>],
        abort: &AbortSignal,
    ) -> WasiResult<Size> {
        self.check_rights(Rights::FD_READ)?;

        match &self.inner {
            WasiFdInner::CharacterDevice(device) => device.read(iovs, abort),
            WasiFdInner::File(file) => {
                let mut cursor = file.cursor.lock();
                let read = file.read_at_into(*cursor, iovs)?;
                *cursor += read as u64;
                Ok(Size(read))
            }
            WasiFdInner::Dir(_) => Err(Errno::Isdir),
        }
    }

    pub(crate) fn pread(
        &self,
        iovs: &mut [IoSliceMut<'_>],
        offset: Filesize,
    ) -> WasiResult<Size> {
        self.check_rights(Rights::FD_READ | Rights::FD_SEEK)?;

        match &self.inner {
            WasiFdInner::File(file) => Ok(Size(file.read_at_into(offset.0, iovs)?)),
            WasiFdInner::Dir(_) => Err(Errno::Isdir),
            WasiFdInner::CharacterDevice(_) => Err(Errno::Spipe),
        }
    }

    pub(crate) fn write(&self, bufs: &[IoSlice<'_>]) -> WasiResult<Size> {
        self.check_rights(Rights::FD_WRITE)?;

        match &self.inner {
            WasiFdInner::CharacterDevice(device) => device.write(bufs),
            WasiFdInner::File(file) => {
                let mut cursor = file.cursor.lock();
                let position = if self.flags.get().contains(Fdflags::APPEND) {
                    file.size()?
                } else {
                    *cursor
                };

                let written = file.write_all_at(position, bufs)?;
                *cursor = position + written as u64;
                Ok(Size(written))
            }
            WasiFdInner::Dir(_) => Err(Errno::Isdir),
        }
    }

    pub(crate) fn pwrite(&self, bufs: &[IoSlice<'_>], offset: Filesize) -> WasiResult<Size> {
        self.check_rights(Rights::FD_WRITE | Rights::FD_SEEK)?;

        match &self.inner {
            WasiFdInner::File(file) => Ok(Size(file.write_all_at(offset.0, bufs)?)),
            WasiFdInner::Dir(_) => Err(Errno::Isdir),
            WasiFdInner::CharacterDevice(_) => Err(Errno::Spipe),
        }
    }

    pub(crate) fn seek(&self, offset: Filedelta, whence: Whence) -> WasiResult<Filesize> {
        {
            let rights = self.rights.get();

            if let Err(err) = Self::check_rights_with(rights, Rights::FD_SEEK) {
                if whence == Whence::Cur && offset.0 == 0 {
                    Self::check_rights_with(rights, Rights::FD_TELL)?;
                } else {
                    return Err(err);
                }
            }
        }

        let file = match &self.inner {
            WasiFdInner::File(file) => file,
            WasiFdInner::Dir(_) => return Err(Errno::Isdir),
            WasiFdInner::CharacterDevice(_) => return Err(Errno::Spipe),
        };

        let mut cursor = file.cursor.lock();
        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => *cursor,
            Whence::End => file.size()?,
        };

        let position = if offset.0 >= 0 {
            base.checked_add(offset.0 as u64)
        } else {
            base.checked_sub(offset.0.unsigned_abs())
        }
        .ok_or(Errno::Inval)?;

        *cursor = position;
        Ok(Filesize(position))
    }

    pub(crate) fn tell(&self) -> WasiResult<Filesize> {
        {
            let rights = self.rights.get();

            if Self::check_rights_with(rights, Rights::FD_TELL).is_err() {
                Self::check_rights_with(rights, Rights::FD_SEEK)?;
            }
        }

        match &self.inner {
            WasiFdInner::File(file) => Ok(Filesize(*file.cursor.lock())),
            WasiFdInner::Dir(_) => Err(Errno::Isdir),
            WasiFdInner::CharacterDevice(_) => Err(Errno::Spipe),
        }
    }

    pub(crate) fn readdir(&self, cookie: Dircookie) -> WasiResult<Option<(Dirent, Vec<u8>)>> {
        self.check_rights(Rights::FD_READDIR)?;

        match &self.inner {
            WasiFdInner::Dir(dir) => dir.readdir(cookie),
            _ => Err(Errno::Notdir),
        }
    }

    pub(crate) fn prestat_get(&self) -> WasiResult<Prestat> {
        match &self.inner {
            WasiFdInner::Dir(dir) if dir.preopened => Ok(Prestat::Dir {
                pr_name_len: Size(dir.location.preopen.guest_path().len() as u32),
            }),
            _ => Err(Errno::Badf),
        }
    }

    pub(crate) fn prestat_dir_name(&self) -> WasiResult<Vec<u8>> {
        match &self.inner {
            WasiFdInner::Dir(dir) if dir.preopened => {
                Ok(dir.location.preopen.guest_path().to_vec())
            }
            _ => Err(Errno::Badf),
        }
    }

    /// Whether a read on this descriptor would complete without blocking,
    /// and how many bytes it could deliver.
    pub(crate) fn read_readiness(&self) -> WasiResult<ReadReadiness> {
        self.check_rights(Rights::POLL_FD_READWRITE)?;

        match &self.inner {
            WasiFdInner::CharacterDevice(device) => Ok(match device.num_ready_bytes() {
                // Readiness unknown; report readable so the guest issues
                // the read and blocks there instead.
                None => ReadReadiness::Ready(1),
                Some(0) => ReadReadiness::Pending,
                Some(n) => ReadReadiness::Ready(n),
            }),
            WasiFdInner::File(file) => {
                let remaining = file.size()?.saturating_sub(*file.cursor.lock());
                Ok(ReadReadiness::Ready(remaining))
            }
            WasiFdInner::Dir(_) => Err(Errno::Badf),
        }
    }

    /// Whether a write on this descriptor would complete without
    /// blocking. Always true for the in-memory backends.
    pub(crate) fn write_readiness(&self) -> WasiResult<u64> {
        self.check_rights(Rights::POLL_FD_READWRITE)?;

        match &self.inner {
            WasiFdInner::Dir(_) => Err(Errno::Badf),
            _ => Ok(0),
        }
    }

    /// Blocks until the descriptor is readable, the timeout elapses or
    /// the abort signal fires.
    pub(crate) fn wait_read_ready(
        &self,
        timeout: Option<std::time::Duration>,
        abort: &AbortSignal,
    ) -> WasiResult<bool> {
        match &self.inner {
            WasiFdInner::CharacterDevice(device) => device.wait_ready(timeout, abort),
            _ => Ok(true),
        }
    }

    /// Flushes the backing writable stream, if any. Called when the
    /// descriptor is closed and at run termination.
    pub(crate) fn flush_on_close(&self) -> WasiResult<()> {
        if let Some(stream) = self.writable_stream() {
            stream.close()?;
        }
        Ok(())
    }
}

/// Resolves explicit/now fstflags into concrete timestamps. Asking for
/// both the explicit and the "now" variant of the same stamp is invalid.
pub(crate) fn resolve_fst_times(
    volume: &MemVolume,
    atim: Timestamp,
    mtim: Timestamp,
    fst_flags: Fstflags,
) -> WasiResult<(Option<u64>, Option<u64>)> {
    if fst_flags.contains(Fstflags::ATIM | Fstflags::ATIM_NOW)
        || fst_flags.contains(Fstflags::MTIM | Fstflags::MTIM_NOW)
    {
        return Err(Errno::Inval);
    }

    let now = volume.now();

    let atim = if fst_flags.contains(Fstflags::ATIM) {
        Some(atim.0)
    } else if fst_flags.contains(Fstflags::ATIM_NOW) {
        Some(now)
    } else {
        None
    };

    let mtim = if fst_flags.contains(Fstflags::MTIM) {
        Some(mtim.0)
    } else if fst_flags.contains(Fstflags::MTIM_NOW) {
        Some(now)
    } else {
        None
    };

    Ok((atim, mtim))
}
