//! High-level abstraction for executing binaries conforming to WASI
//! snapshot preview 1.
//!
//! [`WasiHost`] implements the full syscall surface against an in-memory
//! volume and embedder-supplied character devices, and drives the guest
//! through its `_start` entry. Cancellation is polled on every syscall
//! entry and inside the blocking points; an observed abort fails the
//! in-flight syscall with `Errno::Intr`, which the ABI adapter turns into
//! an unwind carrying exit code 130.

mod atomic;
mod open_files;
mod wasi_fd;

use crate::{
    abort::AbortSignal,
    error::RunError,
    handle::{self, Location, Preopen},
    os,
};
use log::{debug, trace, warn};
use open_files::OpenFiles;
use parking_lot::Mutex;
use std::{
    convert::Infallible,
    fs::File,
    io::{IoSlice, IoSliceMut, Read},
    marker::PhantomData,
    path::Path,
    sync::Arc,
    time::Duration,
};
use wasi_fd::ReadReadiness;
use wasibox_core::{
    string_representation::StringRepresentation,
    wasi_snapshot_preview1::{
        native, Advice, Clockid, Dircookie, Dirent, Errno, Event, EventFdReadwrite, Eventtype,
        Exitcode, Fd, Fdflags, Fdstat, Filedelta, Filesize, Filestat, Filetype, Fstflags, Inode,
        Linkcount, Lookupflags, Oflags, Prestat, Riflags, Rights, Roflags, Sdflags, Siflags,
        Signal, Size, Subscription, SubscriptionClock, SubscriptionU, Timestamp, Userdata,
        WasiImports, WasiImportsExt, WasiResult, Whence,
    },
};

pub use wasi_fd::{
    CharacterDevice, QueuedStdin, SharedSink, Stderr, Stdin, Stdout, WasiFd,
    RIGHTS_DIRECTORY_BASE, RIGHTS_DIRECTORY_INHERITING, RIGHTS_REGULAR_FILE_BASE,
};
pub use wasibox_core::wasi_snapshot_preview1::*;

use wasibox_core::wasi_snapshot_preview1::Device;

/// The character devices to install on descriptors 0, 1 and 2.
#[derive(Debug)]
pub struct StdioDevices {
    stdin: Box<dyn CharacterDevice>,
    stdout: Box<dyn CharacterDevice>,
    stderr: Box<dyn CharacterDevice>,
}

impl StdioDevices {
    /// Wires the given devices.
    pub fn new(
        stdin: impl CharacterDevice,
        stdout: impl CharacterDevice,
        stderr: impl CharacterDevice,
    ) -> Self {
        Self {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        }
    }

    /// Wires the host process's own stdio.
    pub fn host() -> Self {
        Self::new(Stdin, Stdout, Stderr)
    }
}

/// Host functions for WASI.
#[derive(Debug)]
pub struct WasiHost<S: StringRepresentation> {
    arguments: Vec<S::Owned>,
    environment: Vec<S::Owned>,
    preopens: Vec<Arc<Preopen>>,
    open_files: Mutex<OpenFiles<S>>,
    abort: AbortSignal,
    _phantom: PhantomData<fn(S) -> S>,
}

impl<S: StringRepresentation> WasiHost<S> {
    /// Creates a new WASI host. Descriptors 0/1/2 are the given stdio
    /// devices; the preopens follow from descriptor 3 in order.
    pub fn new(
        arguments: impl IntoIterator<Item = impl Into<S::Owned>>,
        environment: impl IntoIterator<Item = impl Into<S::Owned>>,
        stdio: StdioDevices,
        preopens: impl IntoIterator<Item = Preopen>,
        abort: AbortSignal,
    ) -> Arc<Self> {
        let arguments = arguments.into_iter().map(|s| s.into()).collect();
        let environment = environment.into_iter().map(|s| s.into()).collect();

        let preopens: Vec<Arc<Preopen>> = preopens.into_iter().map(Arc::new).collect();

        let mut open_files = OpenFiles::new();
        open_files.insert_fixed(
            Fd(0),
            WasiFd::from_character_device(stdio.stdin, Fdflags::empty(), Rights::all()),
        );
        open_files.insert_fixed(
            Fd(1),
            WasiFd::from_character_device(stdio.stdout, Fdflags::empty(), Rights::all()),
        );
        open_files.insert_fixed(
            Fd(2),
            WasiFd::from_character_device(stdio.stderr, Fdflags::empty(), Rights::all()),
        );

        for preopen in &preopens {
            // Cannot fail on a fresh table.
            open_files
                .install(WasiFd::from_preopen(preopen.clone()))
                .ok();
        }

        Arc::new(WasiHost {
            arguments,
            environment,
            preopens,
            open_files: Mutex::new(open_files),
            abort,
            _phantom: PhantomData,
        })
    }

    /// The cancellation signal this host observes.
    pub fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    /// Runs a WASM file on this WASI host.
    pub fn run_file(
        self: Arc<Self>,
        wasm_file: impl AsRef<Path>,
    ) -> Result<native::exitcode, RunError> {
        let mut wasm_binary = Vec::new();

        {
            let mut file = File::open(&wasm_file)?;
            file.read_to_end(&mut wasm_binary)?;
        }

        self.run_binary(&wasm_binary[..])
    }

    /// Runs a WASM binary from memory on this WASI host. Returns the
    /// guest's exit code: the `proc_exit` value, 0 on a normal return, or
    /// 130 when the abort signal interrupted the guest. Every descriptor
    /// still open when the guest stops is closed, which flushes pending
    /// writable streams.
    pub fn run_binary(
        self: Arc<Self>,
        wasm_binary: &[u8],
    ) -> Result<native::exitcode, RunError> {
        let result = self.clone().run_binary_inner(wasm_binary);
        self.close_all();
        result
    }

    fn run_binary_inner(
        self: Arc<Self>,
        wasm_binary: &[u8],
    ) -> Result<native::exitcode, RunError> {
        use wasmer_runtime::{instantiate, Func};

        let instance = {
            let import_object = self.into_imports();
            instantiate(wasm_binary, &import_object)
                .map_err(|e| RunError::Instantiate(e.to_string()))?
        };

        let start: Func<'_, ()> = instance
            .func("_start")
            .map_err(|e| RunError::MissingStart(e.to_string()))?;

        debug!("entering guest _start");
        match start.call() {
            Ok(()) => Ok(0),
            Err(e) => match e.0.downcast_ref::<native::exitcode>() {
                Some(&code) => {
                    debug!("guest exited with code {}", code);
                    Ok(code)
                }
                None => Err(RunError::Trap(e.to_string())),
            },
        }
    }

    /// Closes every open descriptor, flushing writable streams. Called at
    /// run termination on every exit path.
    pub fn close_all(&self) {
        let files = self.open_files.lock().drain();

        for file in files {
            if let Err(errno) = file.flush_on_close() {
                warn!("flush on close failed: {:?}", errno);
            }
        }
    }

    fn intr_guard(&self) -> WasiResult<()> {
        if self.abort.is_aborted() {
            Err(Errno::Intr)
        } else {
            Ok(())
        }
    }

    fn with_fd<R>(&self, fd: Fd, f: impl FnOnce(&WasiFd<S>) -> WasiResult<R>) -> WasiResult<R> {
        let fd = self.open_files.lock().get(fd);
        fd.and_then(|fd| f(&fd))
    }

    /// Resolves a syscall path argument against the descriptor it was
    /// passed with. Absolute paths go through the preopen table (longest
    /// prefix wins); relative paths resolve against the directory behind
    /// `fd`. `rights` are required on the descriptor either way.
    fn resolve(
        &self,
        fd: Fd,
        path: &S::Borrowed,
        rights: Rights,
    ) -> WasiResult<(Location, bool)> {
        let split = handle::split_path(S::borrowed_as_bytes(path))?;

        let (preopen, base, rel) = if split.absolute {
            self.with_fd(fd, |file| {
                file.dir()?;
                file.check_rights(rights)
            })?;

            let (preopen, rel) = handle::find_rel_path(&self.preopens, &split.components)?;
            (preopen.clone(), Vec::new(), rel)
        } else {
            let location = self.with_fd(fd, |file| {
                file.check_rights(rights)?;
                Ok(file.dir()?.location().clone())
            })?;
            (location.preopen, location.path, split.components)
        };

        let path = handle::normalize(&base, &rel)?;
        Ok((
            Location { preopen, path },
            split.want_dir,
        ))
    }

    fn filestat_from_location(&self, location: &Location, want_dir: bool) -> WasiResult<Filestat> {
        let meta = location
            .volume()
            .stat_at(location.root(), &location.path)
            .map_err(Errno::from)?;

        if want_dir && meta.filetype != Filetype::Directory {
            return Err(Errno::Notdir);
        }

        Ok(Filestat {
            dev: Device(meta.dev),
            ino: Inode(meta.ino),
            filetype: meta.filetype,
            nlink: Linkcount(meta.nlink),
            size: Filesize(meta.size),
            atim: Timestamp(meta.atim),
            mtim: Timestamp(meta.mtim),
            ctim: Timestamp(meta.ctim),
        })
    }

    /// Nanoseconds until a clock subscription is due; 0 if already due.
    fn clock_remaining(clock: &SubscriptionClock) -> WasiResult<u64> {
        use wasibox_core::wasi_snapshot_preview1::Subclockflags;

        if clock
            .flags
            .contains(Subclockflags::SUBSCRIPTION_CLOCK_ABSTIME)
        {
            let now = os::preview1_clock_time_get(clock.id, clock.precision)?;
            Ok(clock.timeout.0.saturating_sub(now.0))
        } else {
            Ok(clock.timeout.0)
        }
    }

    fn clock_event(userdata: Userdata) -> Event {
        Event {
            userdata,
            error: Errno::Success,
            kind: Eventtype::Clock,
            fd_readwrite: EventFdReadwrite::default(),
        }
    }

    fn fd_event(userdata: Userdata, kind: Eventtype, nbytes: u64) -> Event {
        Event {
            userdata,
            error: Errno::Success,
            kind,
            fd_readwrite: EventFdReadwrite {
                nbytes: Filesize(nbytes),
                flags: Default::default(),
            },
        }
    }

    fn error_event(userdata: Userdata, kind: Eventtype, errno: Errno) -> Event {
        Event {
            userdata,
            error: errno,
            kind,
            fd_readwrite: EventFdReadwrite::default(),
        }
    }
}

impl<S: StringRepresentation> WasiImports for WasiHost<S> {
    type StringRepresentation = S;

    fn args_get(&self) -> WasiResult<&[S::Owned]> {
        self.intr_guard()?;
        Ok(&self.arguments[..])
    }

    fn environ_get(&self) -> WasiResult<&[S::Owned]> {
        self.intr_guard()?;
        Ok(&self.environment[..])
    }

    fn clock_res_get(&self, id: Clockid) -> WasiResult<Timestamp> {
        self.intr_guard()?;
        os::preview1_clock_res_get(id)
    }

    fn clock_time_get(&self, id: Clockid, precision: Timestamp) -> WasiResult<Timestamp> {
        self.intr_guard()?;
        os::preview1_clock_time_get(id, precision)
    }

    fn fd_advise(&self, fd: Fd, offset: Filesize, len: Filesize, _advice: Advice) -> WasiResult<()> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.advise(offset, len))
    }

    fn fd_allocate(&self, fd: Fd, offset: Filesize, len: Filesize) -> WasiResult<()> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.allocate(offset, len))
    }

    fn fd_close(&self, fd: Fd) -> WasiResult<()> {
        self.intr_guard()?;
        trace!("fd_close({})", fd.0);

        let file = self.open_files.lock().remove(fd)?;

        // Flush (and drop) outside of the table lock.
        file.flush_on_close()
    }

    fn fd_datasync(&self, fd: Fd) -> WasiResult<()> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.datasync())
    }

    fn fd_fdstat_get(&self, fd: Fd) -> WasiResult<Fdstat> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.fdstat_get())
    }

    fn fd_fdstat_set_flags(&self, fd: Fd, flags: Fdflags) -> WasiResult<()> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.fdstat_set_flags(flags))
    }

    fn fd_fdstat_set_rights(
        &self,
        fd: Fd,
        fs_rights_base: Rights,
        fs_rights_inheriting: Rights,
    ) -> WasiResult<()> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| {
            fd.fdstat_set_rights(fs_rights_base, fs_rights_inheriting)
        })
    }

    fn fd_filestat_get(&self, fd: Fd) -> WasiResult<Filestat> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.filestat_get())
    }

    fn fd_filestat_set_size(&self, fd: Fd, size: Filesize) -> WasiResult<()> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.filestat_set_size(size))
    }

    fn fd_filestat_set_times(
        &self,
        fd: Fd,
        atim: Timestamp,
        mtim: Timestamp,
        fst_flags: Fstflags,
    ) -> WasiResult<()> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.filestat_set_times(atim, mtim, fst_flags))
    }

    fn fd_pread(
        &self,
        fd: Fd,
        iovs: &mut [IoSliceMut<'_>],
        offset: Filesize,
    ) -> WasiResult<Size> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.pread(iovs, offset))
    }

    fn fd_prestat_get(&self, fd: Fd) -> WasiResult<Prestat> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.prestat_get())
    }

    fn fd_prestat_dir_name(&self, fd: Fd) -> WasiResult<S::Owned> {
        self.intr_guard()?;
        let name = self.with_fd(fd, |fd| fd.prestat_dir_name())?;
        S::owned_from_bytes(name).map_err(|_| Errno::Inval)
    }

    fn fd_pwrite(&self, fd: Fd, bufs: &[IoSlice<'_>], offset: Filesize) -> WasiResult<Size> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.pwrite(bufs, offset))
    }

    fn fd_read(&self, fd: Fd, iovs: &mut [IoSliceMut<'_>]) -> WasiResult<Size> {
        self.intr_guard()?;
        trace!("fd_read({})", fd.0);
        self.with_fd(fd, |file| file.read(iovs, &self.abort))
    }

    fn fd_readdir(&self, fd: Fd, cookie: Dircookie) -> WasiResult<Option<(Dirent, S::Owned)>> {
        self.intr_guard()?;

        let entry = self.with_fd(fd, |fd| fd.readdir(cookie))?;
        entry
            .map(|(dirent, name)| {
                let name = S::owned_from_bytes(name).map_err(|_| Errno::Inval)?;
                Ok((dirent, name))
            })
            .transpose()
    }

    fn fd_renumber(&self, fd: Fd, to: Fd) -> WasiResult<()> {
        self.intr_guard()?;
        trace!("fd_renumber({} -> {})", fd.0, to.0);

        let displaced = self.open_files.lock().renumber(fd, to)?;

        // The displaced descriptor is closed; flush it outside the lock.
        if let Some(file) = displaced {
            file.flush_on_close()?;
        }
        Ok(())
    }

    fn fd_seek(&self, fd: Fd, offset: Filedelta, whence: Whence) -> WasiResult<Filesize> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.seek(offset, whence))
    }

    fn fd_sync(&self, fd: Fd) -> WasiResult<()> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.sync())
    }

    fn fd_tell(&self, fd: Fd) -> WasiResult<Filesize> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.tell())
    }

    fn fd_write(&self, fd: Fd, bufs: &[IoSlice<'_>]) -> WasiResult<Size> {
        self.intr_guard()?;
        self.with_fd(fd, |fd| fd.write(bufs))
    }

    fn path_create_directory(&self, fd: Fd, path: &S::Borrowed) -> WasiResult<()> {
        self.intr_guard()?;

        let (location, _) = self.resolve(fd, path, Rights::PATH_CREATE_DIRECTORY)?;
        trace!("path_create_directory: {} component(s)", location.path.len());

        location
            .volume()
            .create_dir_at(location.root(), &location.path, false)
            .map_err(Errno::from)
    }

    fn path_filestat_get(
        &self,
        fd: Fd,
        _flags: Lookupflags,
        path: &S::Borrowed,
    ) -> WasiResult<Filestat> {
        self.intr_guard()?;

        let (location, want_dir) = self.resolve(fd, path, Rights::PATH_FILESTAT_GET)?;
        self.filestat_from_location(&location, want_dir)
    }

    fn path_filestat_set_times(
        &self,
        fd: Fd,
        _flags: Lookupflags,
        path: &S::Borrowed,
        atim: Timestamp,
        mtim: Timestamp,
        fst_flags: Fstflags,
    ) -> WasiResult<()> {
        self.intr_guard()?;

        let (location, _) = self.resolve(fd, path, Rights::PATH_FILESTAT_SET_TIMES)?;
        let (atim, mtim) =
            wasi_fd::resolve_fst_times(location.volume(), atim, mtim, fst_flags)?;

        location
            .volume()
            .set_times_at(location.root(), &location.path, atim, mtim)
            .map_err(Errno::from)
    }

    fn path_link(
        &self,
        _old_fd: Fd,
        _old_flags: Lookupflags,
        _old_path: &S::Borrowed,
        _new_fd: Fd,
        _new_path: &S::Borrowed,
    ) -> WasiResult<()> {
        self.intr_guard()?;
        // The volume has no hard links.
        Err(Errno::Notsup)
    }

    fn path_open(
        &self,
        fd: Fd,
        _dirflags: Lookupflags,
        path: &S::Borrowed,
        oflags: Oflags,
        fs_rights_base: Rights,
        fs_rights_inheriting: Rights,
        fdflags: Fdflags,
    ) -> WasiResult<Fd> {
        self.intr_guard()?;

        // Stage the dirfd-side rights the way path_open requires before
        // resolving anything.
        self.with_fd(fd, |file| {
            let rights = file.rights();

            let check = |required: Rights| -> WasiResult<()> {
                if rights.contains(required) {
                    Ok(())
                } else {
                    Err(Errno::Notcapable)
                }
            };

            check(Rights::PATH_OPEN)?;
            if fdflags.contains(Fdflags::DSYNC) && check(Rights::FD_DATASYNC).is_err() {
                check(Rights::FD_SYNC)?;
            }
            if fdflags.contains(Fdflags::RSYNC) {
                check(Rights::FD_SYNC)?;
            }
            if oflags.contains(Oflags::CREAT) {
                check(Rights::PATH_CREATE_FILE)?;
            }
            if oflags.contains(Oflags::TRUNC) {
                check(Rights::PATH_FILESTAT_SET_SIZE)?;
            }

            let inheriting = file.rights_inheriting();
            if !inheriting.contains(fs_rights_base) || !inheriting.contains(fs_rights_inheriting) {
                return Err(Errno::Notcapable);
            }

            Ok(())
        })?;

        let (location, want_dir) = self.resolve(fd, path, Rights::PATH_OPEN)?;
        let file = WasiFd::open_path(
            location,
            want_dir,
            oflags,
            fs_rights_base,
            fs_rights_inheriting,
            fdflags,
        )?;

        let new_fd = self.open_files.lock().install(file)?;
        trace!("path_open -> fd {}", new_fd.0);
        Ok(new_fd)
    }

    fn path_readlink(&self, _fd: Fd, _path: &S::Borrowed) -> WasiResult<S::Owned> {
        self.intr_guard()?;
        // The volume has no symbolic links.
        Err(Errno::Notsup)
    }

    fn path_remove_directory(&self, fd: Fd, path: &S::Borrowed) -> WasiResult<()> {
        self.intr_guard()?;

        let (location, _) = self.resolve(fd, path, Rights::PATH_REMOVE_DIRECTORY)?;
        location
            .volume()
            .remove_dir_at(location.root(), &location.path)
            .map_err(Errno::from)
    }

    fn path_rename(
        &self,
        fd: Fd,
        old_path: &S::Borrowed,
        new_fd: Fd,
        new_path: &S::Borrowed,
    ) -> WasiResult<()> {
        self.intr_guard()?;

        let (src, _) = self.resolve(fd, old_path, Rights::PATH_RENAME_SOURCE)?;
        let (dst, _) = self.resolve(new_fd, new_path, Rights::PATH_RENAME_TARGET)?;

        if !src.volume().same_volume(dst.volume()) {
            return Err(Errno::Xdev);
        }

        src.volume()
            .rename_at(src.root(), &src.path, dst.root(), &dst.path)
            .map_err(Errno::from)
    }

    fn path_symlink(
        &self,
        _old_path: &S::Borrowed,
        _fd: Fd,
        _new_path: &S::Borrowed,
    ) -> WasiResult<()> {
        self.intr_guard()?;
        // The volume has no symbolic links.
        Err(Errno::Notsup)
    }

    fn path_unlink_file(&self, fd: Fd, path: &S::Borrowed) -> WasiResult<()> {
        self.intr_guard()?;

        let (location, _) = self.resolve(fd, path, Rights::PATH_UNLINK_FILE)?;
        location
            .volume()
            .unlink_at(location.root(), &location.path)
            .map_err(Errno::from)
    }

    fn poll_oneoff(&self, subscriptions: &[Subscription]) -> WasiResult<Vec<Event>> {
        self.intr_guard()?;

        if subscriptions.is_empty() {
            return Err(Errno::Inval);
        }

        let mut events = Vec::new();
        let mut nearest_clock: Option<(u64, Userdata)> = None;
        let mut read_waiters: Vec<(Userdata, Fd)> = Vec::new();

        for subscription in subscriptions {
            match subscription.u {
                SubscriptionU::Clock(ref clock) => {
                    let remaining = Self::clock_remaining(clock)?;
                    if remaining == 0 {
                        events.push(Self::clock_event(subscription.userdata));
                    } else {
                        let nearer = match nearest_clock {
                            Some((current, _)) => remaining < current,
                            None => true,
                        };
                        if nearer {
                            nearest_clock = Some((remaining, subscription.userdata));
                        }
                    }
                }
                SubscriptionU::FdRead(ref target) => {
                    let fd = target.file_descriptor;
                    match self.with_fd(fd, |file| file.read_readiness()) {
                        Ok(ReadReadiness::Ready(nbytes)) => {
                            events.push(Self::fd_event(
                                subscription.userdata,
                                Eventtype::FdRead,
                                nbytes,
                            ));
                        }
                        Ok(ReadReadiness::Pending) => {
                            read_waiters.push((subscription.userdata, fd));
                        }
                        Err(errno) => {
                            events.push(Self::error_event(
                                subscription.userdata,
                                Eventtype::FdRead,
                                errno,
                            ));
                        }
                    }
                }
                SubscriptionU::FdWrite(ref target) => {
                    let fd = target.file_descriptor;
                    match self.with_fd(fd, |file| file.write_readiness()) {
                        Ok(nbytes) => {
                            events.push(Self::fd_event(
                                subscription.userdata,
                                Eventtype::FdWrite,
                                nbytes,
                            ));
                        }
                        Err(errno) => {
                            events.push(Self::error_event(
                                subscription.userdata,
                                Eventtype::FdWrite,
                                errno,
                            ));
                        }
                    }
                }
            }
        }

        if !events.is_empty() {
            return Ok(events);
        }

        // Nothing is ready: block on the first pending reader or sleep
        // until the nearest clock deadline.
        let timeout = nearest_clock.map(|(remaining, _)| Duration::from_nanos(remaining));

        if let Some(&(userdata, fd)) = read_waiters.first() {
            let ready =
                self.with_fd(fd, |file| file.wait_read_ready(timeout, &self.abort))?;

            if ready {
                let nbytes = match self.with_fd(fd, |file| file.read_readiness())? {
                    ReadReadiness::Ready(nbytes) => nbytes,
                    ReadReadiness::Pending => 0,
                };
                events.push(Self::fd_event(userdata, Eventtype::FdRead, nbytes));
            } else if let Some((_, clock_userdata)) = nearest_clock {
                events.push(Self::clock_event(clock_userdata));
            }
        } else if let Some((remaining, userdata)) = nearest_clock {
            if self.abort.wait_timeout(Duration::from_nanos(remaining)) {
                return Err(Errno::Intr);
            }
            events.push(Self::clock_event(userdata));
        }

        Ok(events)
    }

    fn proc_exit(&self, c: Exitcode) -> Result<Infallible, Exitcode> {
        Err(c)
    }

    fn proc_raise(&self, _: Signal) -> WasiResult<()> {
        Err(Errno::Nosys)
    }

    fn random_get(&self, buf: &mut [u8]) -> WasiResult<()> {
        self.intr_guard()?;
        getrandom::getrandom(buf).map_err(|_| Errno::Io)
    }

    fn sched_yield(&self) -> WasiResult<()> {
        self.intr_guard()?;
        std::thread::yield_now();
        Ok(())
    }

    fn sock_recv(
        &self,
        _fd: Fd,
        _ri_data: &mut [IoSliceMut<'_>],
        _ri_flags: Riflags,
    ) -> WasiResult<(Size, Roflags)> {
        Err(Errno::Notsup)
    }

    fn sock_send(&self, _fd: Fd, _si_data: &[IoSlice<'_>], _si_flags: Siflags) -> WasiResult<Size> {
        Err(Errno::Notsup)
    }

    fn sock_shutdown(&self, _fd: Fd, _how: Sdflags) -> WasiResult<()> {
        Err(Errno::Notsup)
    }
}

