//! Adapter between the raw ABI and the typed [`WasiImports`] trait.
//!
//! Every import decodes its arguments from the native representation,
//! bounds-checks all guest pointers before touching host state, calls the
//! typed trait and encodes the result back. Two conditions unwind the
//! guest instead of returning an errno: `proc_exit`, and a syscall
//! failing with [`Errno::Intr`] (cancellation observed) — both travel
//! through wasmer's host error channel as a `native::exitcode` that the
//! run loop downcasts.

use super::{
    native, Clockid, Dircookie, Errno, Exitcode, Fd, Fdflags, Filedelta, Filesize, Fstflags,
    Lookupflags, Oflags, Rights, Sdflags, Siflags, Subscription, Timestamp, WasiImports,
    WasiValue, Whence, EXITCODE_INTERRUPTED,
};
use crate::{
    memory::{MemoryFault, WasmSlicePtr, WasmValue, WasmValuePtr},
    string_representation::StringRepresentation,
};
use std::{
    cell::Cell,
    cmp::min,
    io::{IoSlice, IoSliceMut},
    sync::Arc,
};
use wasmer_runtime_core::{func, import::ImportObject, imports, memory::Memory, vm::Ctx};

/// Result type of the adapter methods: `Err` carries an exit code through
/// wasmer's host error channel and terminates the guest.
type HostResult<T> = Result<T, native::exitcode>;

/// Extension methods for the [`WasiImports`](super::WasiImports) trait.
pub trait WasiImportsExt {
    /// Generates the wasmer imports for this object.
    fn into_imports(self) -> ImportObject;
}

impl<T: WasiImports> WasiImportsExt for T {
    fn into_imports(self) -> ImportObject {
        Arc::new(self).into_imports()
    }
}

struct NativeWasiAdapter<T>(Arc<T>);

impl<T> Clone for NativeWasiAdapter<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

macro_rules! try0 {
    ($e:expr) => {
        match $e {
            Ok(val) => val,
            Err(_) => return Ok(native::errno_inval),
        }
    };
}

macro_rules! try1 {
    ($e:expr) => {
        match $e {
            Ok(val) => val,
            Err(_) => return Ok((native::errno_inval, Default::default())),
        }
    };
}

macro_rules! try2 {
    ($e:expr) => {
        match $e {
            Ok(val) => val,
            Err(_) => return Ok((native::errno_inval, Default::default(), Default::default())),
        }
    };
}

macro_rules! fault0 {
    ($e:expr) => {
        match $e {
            Ok(val) => val,
            Err(MemoryFault { .. }) => return Ok(native::errno_fault),
        }
    };
}

macro_rules! fault1 {
    ($e:expr) => {
        match $e {
            Ok(val) => val,
            Err(MemoryFault { .. }) => return Ok((native::errno_fault, Default::default())),
        }
    };
}

macro_rules! to_result0 {
    ($e:expr) => {
        match $e {
            Ok(()) => Ok(native::errno_success),
            Err(Errno::Intr) => Err(EXITCODE_INTERRUPTED),
            Err(err) => Ok(err.to_native()),
        }
    };
}

macro_rules! to_result1 {
    ($e:expr) => {
        match $e {
            Ok(val) => Ok((native::errno_success, val.to_native())),
            Err(Errno::Intr) => Err(EXITCODE_INTERRUPTED),
            Err(err) => Ok((err.to_native(), Default::default())),
        }
    };
}

macro_rules! to_result2 {
    ($e:expr) => {
        match $e {
            Ok((val1, val2)) => Ok((native::errno_success, val1.to_native(), val2.to_native())),
            Err(Errno::Intr) => Err(EXITCODE_INTERRUPTED),
            Err(err) => Ok((err.to_native(), Default::default(), Default::default())),
        }
    };
}

impl<T: WasiImports> NativeWasiAdapter<T> {
    fn fill_bufs(
        strings: &[<T::StringRepresentation as StringRepresentation>::Owned],
        memory: &Memory,
        ptrs: WasmSlicePtr<WasmSlicePtr<u8>>,
        buf: WasmSlicePtr<u8>,
    ) -> Result<(), MemoryFault> {
        let ptrs = ptrs.with(memory, strings.len() as u32)?;
        let mut index = 0;

        for (i, s) in strings.iter().enumerate() {
            let s = T::StringRepresentation::owned_as_bytes(s);
            let len = s.len() as u32;

            let entry = buf.add(index);
            ptrs.write(i as u32, entry);

            let entry = entry.with(memory, len + 1)?;
            for (i, b) in s.iter().copied().enumerate() {
                entry.write(i as u32, b);
            }
            entry.write(len, 0);

            index += len + 1;
        }

        Ok(())
    }

    fn sizes_of(
        strings: &[<T::StringRepresentation as StringRepresentation>::Owned],
    ) -> (native::size, native::size) {
        (
            strings.len() as u32,
            strings
                .iter()
                .map(|s| T::StringRepresentation::owned_as_bytes(s).len() as u32 + 1)
                .sum(),
        )
    }

    fn read_from_bufs(
        memory: &Memory,
        iovs: WasmSlicePtr<native::ciovec>,
        iovs_len: native::size,
    ) -> Result<Vec<Vec<u8>>, MemoryFault> {
        let iovs = iovs.with(memory, iovs_len)?;

        (0..iovs_len)
            .map(|i| {
                let native::ciovec { buf, buf_len } = iovs.read(i);
                let iov = buf.with(memory, buf_len)?;

                Ok((0..buf_len).map(|i| iov.read(i)).collect())
            })
            .collect()
    }

    fn read_from_buf(
        memory: &Memory,
        buf: WasmSlicePtr<u8>,
        buf_len: native::size,
    ) -> Result<Vec<u8>, MemoryFault> {
        let buf = buf.with(memory, buf_len)?;

        Ok((0..buf_len).map(|i| buf.read(i)).collect())
    }

    fn read_string_from_buf(
        memory: &Memory,
        buf: WasmSlicePtr<u8>,
        buf_len: native::size,
    ) -> Result<Result<<T::StringRepresentation as StringRepresentation>::Owned, ()>, MemoryFault>
    {
        let bytes = Self::read_from_buf(memory, buf, buf_len)?;

        Ok(T::StringRepresentation::owned_from_bytes(bytes))
    }

    /// Runs `f` against scratch buffers matching the guest's iovecs, then
    /// copies the first `size_of(&result)` bytes back into guest memory.
    /// All iovec regions are validated before `f` runs.
    fn write_to_bufs<R>(
        memory: &Memory,
        iovs: WasmSlicePtr<native::iovec>,
        iovs_len: native::size,
        f: impl FnOnce(&mut [IoSliceMut<'_>]) -> R,
        size_of: impl Fn(&R) -> native::size,
    ) -> Result<R, MemoryFault> {
        let iovecs: Vec<_> = {
            let iovs = iovs.with(memory, iovs_len)?;
            (0..iovs_len).map(|i| iovs.read(i)).collect()
        };

        let regions = iovecs
            .iter()
            .map(|iov| iov.buf.with(memory, iov.buf_len))
            .collect::<Result<Vec<_>, _>>()?;

        let mut bufs: Vec<_> = iovecs
            .iter()
            .map(|iov| vec![0u8; iov.buf_len as usize])
            .collect();

        let result = {
            let mut slices: Vec<_> = bufs.iter_mut().map(|v| IoSliceMut::new(&mut v[..])).collect();
            f(&mut slices[..])
        };
        let size = size_of(&result);

        let mut copied = 0;
        'outer: for (region, buf) in regions.iter().zip(&bufs) {
            for (j, byte) in buf.iter().copied().enumerate() {
                if copied >= size {
                    break 'outer;
                }

                region.write(j as u32, byte);
                copied += 1;
            }
        }

        Ok(result)
    }

    /// Runs `f` against a scratch buffer of `buf_len` bytes, then copies the
    /// first `size_of(&result)` bytes back into guest memory.
    fn write_to_buf<R>(
        memory: &Memory,
        buf: WasmSlicePtr<u8>,
        buf_len: native::size,
        f: impl FnOnce(&mut [u8]) -> R,
        size_of: impl Fn(&R) -> native::size,
    ) -> Result<R, MemoryFault> {
        let region = buf.with(memory, buf_len)?;

        let mut scratch = vec![0u8; buf_len as usize];
        let result = f(&mut scratch[..]);
        let size = min(size_of(&result), buf_len);

        for (i, byte) in scratch[..size as usize].iter().copied().enumerate() {
            region.write(i as u32, byte);
        }

        Ok(result)
    }

    fn args_get(
        &self,
        ctx: &mut Ctx,
        argv: WasmSlicePtr<WasmSlicePtr<u8>>,
        argv_buf: WasmSlicePtr<u8>,
    ) -> HostResult<native::errno> {
        let strings = match self.0.args_get() {
            Ok(strings) => strings,
            Err(Errno::Intr) => return Err(EXITCODE_INTERRUPTED),
            Err(err) => return Ok(err.to_native()),
        };

        fault0!(Self::fill_bufs(strings, ctx.memory(0), argv, argv_buf));
        Ok(native::errno_success)
    }

    fn args_sizes_get(
        &self,
        _ctx: &mut Ctx,
    ) -> HostResult<(native::errno, native::size, native::size)> {
        match self.0.args_get() {
            Ok(strings) => {
                let (count, len) = Self::sizes_of(strings);
                Ok((native::errno_success, count, len))
            }
            Err(Errno::Intr) => Err(EXITCODE_INTERRUPTED),
            Err(err) => Ok((err.to_native(), 0, 0)),
        }
    }

    fn environ_get(
        &self,
        ctx: &mut Ctx,
        environ: WasmSlicePtr<WasmSlicePtr<u8>>,
        environ_buf: WasmSlicePtr<u8>,
    ) -> HostResult<native::errno> {
        let strings = match self.0.environ_get() {
            Ok(strings) => strings,
            Err(Errno::Intr) => return Err(EXITCODE_INTERRUPTED),
            Err(err) => return Ok(err.to_native()),
        };

        fault0!(Self::fill_bufs(strings, ctx.memory(0), environ, environ_buf));
        Ok(native::errno_success)
    }

    fn environ_sizes_get(
        &self,
        _ctx: &mut Ctx,
    ) -> HostResult<(native::errno, native::size, native::size)> {
        match self.0.environ_get() {
            Ok(strings) => {
                let (count, len) = Self::sizes_of(strings);
                Ok((native::errno_success, count, len))
            }
            Err(Errno::Intr) => Err(EXITCODE_INTERRUPTED),
            Err(err) => Ok((err.to_native(), 0, 0)),
        }
    }

    fn clock_res_get(
        &self,
        _ctx: &mut Ctx,
        id: native::clockid,
    ) -> HostResult<(native::errno, native::timestamp)> {
        let id = try1!(Clockid::from_native(id));

        to_result1!(self.0.clock_res_get(id))
    }

    fn clock_time_get(
        &self,
        _ctx: &mut Ctx,
        id: native::clockid,
        precision: native::timestamp,
    ) -> HostResult<(native::errno, native::timestamp)> {
        let id = try1!(Clockid::from_native(id));

        to_result1!(self.0.clock_time_get(id, Timestamp(precision)))
    }

    fn fd_advise(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
        offset: native::filesize,
        len: native::filesize,
        advice: native::advice,
    ) -> HostResult<native::errno> {
        let advice = try0!(super::Advice::from_native(advice));

        to_result0!(self
            .0
            .fd_advise(Fd(fd), Filesize(offset), Filesize(len), advice))
    }

    fn fd_allocate(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
        offset: native::filesize,
        len: native::filesize,
    ) -> HostResult<native::errno> {
        to_result0!(self.0.fd_allocate(Fd(fd), Filesize(offset), Filesize(len)))
    }

    fn fd_close(&self, _ctx: &mut Ctx, fd: native::fd) -> HostResult<native::errno> {
        to_result0!(self.0.fd_close(Fd(fd)))
    }

    fn fd_datasync(&self, _ctx: &mut Ctx, fd: native::fd) -> HostResult<native::errno> {
        to_result0!(self.0.fd_datasync(Fd(fd)))
    }

    fn fd_fdstat_get(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
    ) -> HostResult<(native::errno, native::fdstat)> {
        to_result1!(self.0.fd_fdstat_get(Fd(fd)))
    }

    fn fd_fdstat_set_flags(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
        flags: native::fdflags,
    ) -> HostResult<native::errno> {
        let flags = try0!(Fdflags::from_native(flags));

        to_result0!(self.0.fd_fdstat_set_flags(Fd(fd), flags))
    }

    fn fd_fdstat_set_rights(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
        fs_rights_base: native::rights,
        fs_rights_inheriting: native::rights,
    ) -> HostResult<native::errno> {
        let fs_rights_base = try0!(Rights::from_native(fs_rights_base));
        let fs_rights_inheriting = try0!(Rights::from_native(fs_rights_inheriting));

        to_result0!(self
            .0
            .fd_fdstat_set_rights(Fd(fd), fs_rights_base, fs_rights_inheriting))
    }

    fn fd_filestat_get(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
    ) -> HostResult<(native::errno, native::filestat)> {
        to_result1!(self.0.fd_filestat_get(Fd(fd)))
    }

    fn fd_filestat_set_size(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
        size: native::filesize,
    ) -> HostResult<native::errno> {
        to_result0!(self.0.fd_filestat_set_size(Fd(fd), Filesize(size)))
    }

    fn fd_filestat_set_times(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
        atim: native::timestamp,
        mtim: native::timestamp,
        fst_flags: native::fstflags,
    ) -> HostResult<native::errno> {
        let fst_flags = try0!(Fstflags::from_native(fst_flags));

        to_result0!(self
            .0
            .fd_filestat_set_times(Fd(fd), Timestamp(atim), Timestamp(mtim), fst_flags))
    }

    fn fd_pread(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        iovs: WasmSlicePtr<native::iovec>,
        iovs_len: native::size,
        offset: native::filesize,
    ) -> HostResult<(native::errno, native::size)> {
        let result = fault1!(Self::write_to_bufs(
            ctx.memory(0),
            iovs,
            iovs_len,
            |bufs| self.0.fd_pread(Fd(fd), bufs, Filesize(offset)),
            |r| match r {
                Ok(size) => size.0,
                Err(_) => 0,
            },
        ));

        to_result1!(result)
    }

    fn fd_prestat_get(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
    ) -> HostResult<(native::errno, native::prestat)> {
        to_result1!(self.0.fd_prestat_get(Fd(fd)))
    }

    fn fd_prestat_dir_name(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        path: WasmSlicePtr<u8>,
        path_len: native::size,
    ) -> HostResult<native::errno> {
        let dirname = match self.0.fd_prestat_dir_name(Fd(fd)) {
            Ok(s) => s,
            Err(Errno::Intr) => return Err(EXITCODE_INTERRUPTED),
            Err(err) => return Ok(err.to_native()),
        };
        let dirname = T::StringRepresentation::owned_as_bytes(&dirname);

        let (errno, _) = fault0!(Self::write_to_buf(
            ctx.memory(0),
            path,
            path_len,
            |buf| {
                if dirname.len() > buf.len() {
                    (native::errno_overflow, 0)
                } else {
                    buf[..dirname.len()].copy_from_slice(dirname);
                    (native::errno_success, dirname.len() as u32)
                }
            },
            |s| s.1,
        ));

        Ok(errno)
    }

    fn fd_pwrite(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        iovs: WasmSlicePtr<native::ciovec>,
        iovs_len: native::size,
        offset: native::filesize,
    ) -> HostResult<(native::errno, native::size)> {
        let data = fault1!(Self::read_from_bufs(ctx.memory(0), iovs, iovs_len));
        let slices: Vec<_> = data.iter().map(|v| IoSlice::new(&v[..])).collect();

        to_result1!(self.0.fd_pwrite(Fd(fd), &slices[..], Filesize(offset)))
    }

    fn fd_read(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        iovs: WasmSlicePtr<native::iovec>,
        iovs_len: native::size,
    ) -> HostResult<(native::errno, native::size)> {
        let result = fault1!(Self::write_to_bufs(
            ctx.memory(0),
            iovs,
            iovs_len,
            |bufs| self.0.fd_read(Fd(fd), bufs),
            |r| match r {
                Ok(size) => size.0,
                Err(_) => 0,
            },
        ));

        to_result1!(result)
    }

    fn fd_readdir(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        buf: WasmSlicePtr<u8>,
        buf_len: native::size,
        cookie: native::dircookie,
    ) -> HostResult<(native::errno, native::size)> {
        let memory = ctx.memory(0);
        let buf = fault1!(buf.with(memory, buf_len));

        let mut cookie = Dircookie(cookie);
        let mut dirent_scratch = [0u8; native::dirent::SIZE as usize];
        let mut offset = 0;

        'outer: while offset < buf_len {
            let (entry, name) = match self.0.fd_readdir(Fd(fd), cookie) {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(Errno::Intr) => return Err(EXITCODE_INTERRUPTED),
                Err(err) => return Ok((err.to_native(), 0)),
            };
            let name = T::StringRepresentation::owned_as_bytes(&name);

            entry
                .to_native()
                .write(Cell::from_mut(&mut dirent_scratch[..]).as_slice_of_cells());

            for byte in dirent_scratch.iter().copied() {
                buf.write(offset, byte);
                offset += 1;
                if offset == buf_len {
                    break 'outer;
                }
            }

            for byte in name.iter().copied() {
                buf.write(offset, byte);
                offset += 1;
                if offset == buf_len {
                    break 'outer;
                }
            }

            cookie = entry.d_next;
        }

        Ok((native::errno_success, offset))
    }

    fn fd_renumber(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
        to: native::fd,
    ) -> HostResult<native::errno> {
        to_result0!(self.0.fd_renumber(Fd(fd), Fd(to)))
    }

    fn fd_seek(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
        offset: native::filedelta,
        whence: native::whence,
    ) -> HostResult<(native::errno, native::filesize)> {
        let whence = try1!(Whence::from_native(whence));

        to_result1!(self.0.fd_seek(Fd(fd), Filedelta(offset), whence))
    }

    fn fd_sync(&self, _ctx: &mut Ctx, fd: native::fd) -> HostResult<native::errno> {
        to_result0!(self.0.fd_sync(Fd(fd)))
    }

    fn fd_tell(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
    ) -> HostResult<(native::errno, native::filesize)> {
        to_result1!(self.0.fd_tell(Fd(fd)))
    }

    fn fd_write(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        iovs: WasmSlicePtr<native::ciovec>,
        iovs_len: native::size,
    ) -> HostResult<(native::errno, native::size)> {
        let data = fault1!(Self::read_from_bufs(ctx.memory(0), iovs, iovs_len));
        let slices: Vec<_> = data.iter().map(|v| IoSlice::new(&v[..])).collect();

        to_result1!(self.0.fd_write(Fd(fd), &slices[..]))
    }

    fn path_create_directory(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        path: WasmSlicePtr<u8>,
        path_len: native::size,
    ) -> HostResult<native::errno> {
        let path = try0!(fault0!(Self::read_string_from_buf(
            ctx.memory(0),
            path,
            path_len
        )));

        to_result0!(self
            .0
            .path_create_directory(Fd(fd), T::StringRepresentation::borrow(&path)))
    }

    fn path_filestat_get(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        flags: native::lookupflags,
        path: WasmSlicePtr<u8>,
        path_len: native::size,
    ) -> HostResult<(native::errno, native::filestat)> {
        let flags = try1!(Lookupflags::from_native(flags));
        let path = try1!(fault1!(Self::read_string_from_buf(
            ctx.memory(0),
            path,
            path_len
        )));

        to_result1!(self
            .0
            .path_filestat_get(Fd(fd), flags, T::StringRepresentation::borrow(&path)))
    }

    fn path_filestat_set_times(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        flags: native::lookupflags,
        path: WasmSlicePtr<u8>,
        path_len: native::size,
        atim: native::timestamp,
        mtim: native::timestamp,
        fst_flags: native::fstflags,
    ) -> HostResult<native::errno> {
        let flags = try0!(Lookupflags::from_native(flags));
        let fst_flags = try0!(Fstflags::from_native(fst_flags));
        let path = try0!(fault0!(Self::read_string_from_buf(
            ctx.memory(0),
            path,
            path_len
        )));

        to_result0!(self.0.path_filestat_set_times(
            Fd(fd),
            flags,
            T::StringRepresentation::borrow(&path),
            Timestamp(atim),
            Timestamp(mtim),
            fst_flags,
        ))
    }

    fn path_link(
        &self,
        ctx: &mut Ctx,
        old_fd: native::fd,
        old_flags: native::lookupflags,
        old_path: WasmSlicePtr<u8>,
        old_path_len: native::size,
        new_fd: native::fd,
        new_path: WasmSlicePtr<u8>,
        new_path_len: native::size,
    ) -> HostResult<native::errno> {
        let memory = ctx.memory(0);

        let old_flags = try0!(Lookupflags::from_native(old_flags));
        let old_path = try0!(fault0!(Self::read_string_from_buf(
            memory,
            old_path,
            old_path_len
        )));
        let new_path = try0!(fault0!(Self::read_string_from_buf(
            memory,
            new_path,
            new_path_len
        )));

        to_result0!(self.0.path_link(
            Fd(old_fd),
            old_flags,
            T::StringRepresentation::borrow(&old_path),
            Fd(new_fd),
            T::StringRepresentation::borrow(&new_path),
        ))
    }

    fn path_open(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        dirflags: native::lookupflags,
        path: WasmSlicePtr<u8>,
        path_len: native::size,
        oflags: native::oflags,
        fs_rights_base: native::rights,
        fs_rights_inheriting: native::rights,
        fdflags: native::fdflags,
    ) -> HostResult<(native::errno, native::fd)> {
        let dirflags = try1!(Lookupflags::from_native(dirflags));
        let oflags = try1!(Oflags::from_native(oflags));
        let fs_rights_base = try1!(Rights::from_native(fs_rights_base));
        let fs_rights_inheriting = try1!(Rights::from_native(fs_rights_inheriting));
        let fdflags = try1!(Fdflags::from_native(fdflags));
        let path = try1!(fault1!(Self::read_string_from_buf(
            ctx.memory(0),
            path,
            path_len
        )));

        to_result1!(self.0.path_open(
            Fd(fd),
            dirflags,
            T::StringRepresentation::borrow(&path),
            oflags,
            fs_rights_base,
            fs_rights_inheriting,
            fdflags,
        ))
    }

    fn path_readlink(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        path: WasmSlicePtr<u8>,
        path_len: native::size,
        buf: WasmSlicePtr<u8>,
        buf_len: native::size,
    ) -> HostResult<(native::errno, native::size)> {
        let memory = ctx.memory(0);
        let path = try1!(fault1!(Self::read_string_from_buf(memory, path, path_len)));

        let target = match self
            .0
            .path_readlink(Fd(fd), T::StringRepresentation::borrow(&path))
        {
            Ok(target) => target,
            Err(Errno::Intr) => return Err(EXITCODE_INTERRUPTED),
            Err(err) => return Ok((err.to_native(), 0)),
        };
        let target = T::StringRepresentation::owned_as_bytes(&target);

        let result = fault1!(Self::write_to_buf(
            memory,
            buf,
            buf_len,
            |buf| {
                let len = min(buf.len(), target.len());
                buf[..len].copy_from_slice(&target[..len]);
                len as u32
            },
            |len| *len,
        ));

        Ok((native::errno_success, result))
    }

    fn path_remove_directory(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        path: WasmSlicePtr<u8>,
        path_len: native::size,
    ) -> HostResult<native::errno> {
        let path = try0!(fault0!(Self::read_string_from_buf(
            ctx.memory(0),
            path,
            path_len
        )));

        to_result0!(self
            .0
            .path_remove_directory(Fd(fd), T::StringRepresentation::borrow(&path)))
    }

    fn path_rename(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        old_path: WasmSlicePtr<u8>,
        old_path_len: native::size,
        new_fd: native::fd,
        new_path: WasmSlicePtr<u8>,
        new_path_len: native::size,
    ) -> HostResult<native::errno> {
        let memory = ctx.memory(0);

        let old_path = try0!(fault0!(Self::read_string_from_buf(
            memory,
            old_path,
            old_path_len
        )));
        let new_path = try0!(fault0!(Self::read_string_from_buf(
            memory,
            new_path,
            new_path_len
        )));

        to_result0!(self.0.path_rename(
            Fd(fd),
            T::StringRepresentation::borrow(&old_path),
            Fd(new_fd),
            T::StringRepresentation::borrow(&new_path),
        ))
    }

    fn path_symlink(
        &self,
        ctx: &mut Ctx,
        old_path: WasmSlicePtr<u8>,
        old_path_len: native::size,
        fd: native::fd,
        new_path: WasmSlicePtr<u8>,
        new_path_len: native::size,
    ) -> HostResult<native::errno> {
        let memory = ctx.memory(0);

        let old_path = try0!(fault0!(Self::read_string_from_buf(
            memory,
            old_path,
            old_path_len
        )));
        let new_path = try0!(fault0!(Self::read_string_from_buf(
            memory,
            new_path,
            new_path_len
        )));

        to_result0!(self.0.path_symlink(
            T::StringRepresentation::borrow(&old_path),
            Fd(fd),
            T::StringRepresentation::borrow(&new_path),
        ))
    }

    fn path_unlink_file(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        path: WasmSlicePtr<u8>,
        path_len: native::size,
    ) -> HostResult<native::errno> {
        let path = try0!(fault0!(Self::read_string_from_buf(
            ctx.memory(0),
            path,
            path_len
        )));

        to_result0!(self
            .0
            .path_unlink_file(Fd(fd), T::StringRepresentation::borrow(&path)))
    }

    fn poll_oneoff(
        &self,
        ctx: &mut Ctx,
        subscriptions: WasmSlicePtr<native::subscription>,
        out: WasmSlicePtr<native::event>,
        nsubscriptions: native::size,
    ) -> HostResult<(native::errno, native::size)> {
        let memory = ctx.memory(0);

        let subscriptions = fault1!(subscriptions.with(memory, nsubscriptions));
        let out = fault1!(out.with(memory, nsubscriptions));

        let subscriptions: Vec<_> = try1!((0..nsubscriptions)
            .map(|i| Subscription::from_native(subscriptions.read(i)))
            .collect::<Result<_, _>>());

        let mut events = match self.0.poll_oneoff(&subscriptions[..]) {
            Ok(events) => events,
            Err(Errno::Intr) => return Err(EXITCODE_INTERRUPTED),
            Err(err) => return Ok((err.to_native(), 0)),
        };
        events.truncate(nsubscriptions as usize);

        for (i, event) in events.iter().enumerate() {
            out.write(i as u32, event.to_native());
        }

        Ok((native::errno_success, events.len() as u32))
    }

    fn proc_exit(&self, _ctx: &mut Ctx, rval: native::exitcode) -> HostResult<()> {
        match self.0.proc_exit(Exitcode(rval)) {
            Ok(never) => match never {},
            Err(code) => Err(code.0),
        }
    }

    fn proc_raise(&self, _ctx: &mut Ctx, sig: native::signal) -> HostResult<native::errno> {
        let sig = try0!(super::Signal::from_native(sig));

        to_result0!(self.0.proc_raise(sig))
    }

    fn random_get(
        &self,
        ctx: &mut Ctx,
        buf: WasmSlicePtr<u8>,
        buf_len: native::size,
    ) -> HostResult<native::errno> {
        let result = fault0!(Self::write_to_buf(
            ctx.memory(0),
            buf,
            buf_len,
            |buf| self.0.random_get(buf),
            |r| if r.is_ok() { buf_len } else { 0 },
        ));

        to_result0!(result)
    }

    fn sched_yield(&self, _ctx: &mut Ctx) -> HostResult<native::errno> {
        to_result0!(self.0.sched_yield())
    }

    fn sock_recv(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        ri_data: WasmSlicePtr<native::iovec>,
        ri_data_len: native::size,
        ri_flags: native::riflags,
    ) -> HostResult<(native::errno, native::size, native::roflags)> {
        let ri_flags = try2!(super::Riflags::from_native(ri_flags));

        let result = match Self::write_to_bufs(
            ctx.memory(0),
            ri_data,
            ri_data_len,
            |bufs| self.0.sock_recv(Fd(fd), bufs, ri_flags),
            |r| match r {
                Ok((size, _)) => size.0,
                Err(_) => 0,
            },
        ) {
            Ok(result) => result,
            Err(MemoryFault { .. }) => {
                return Ok((native::errno_fault, Default::default(), Default::default()))
            }
        };

        to_result2!(result)
    }

    fn sock_send(
        &self,
        ctx: &mut Ctx,
        fd: native::fd,
        si_data: WasmSlicePtr<native::ciovec>,
        si_data_len: native::size,
        si_flags: native::siflags,
    ) -> HostResult<(native::errno, native::size)> {
        let data = fault1!(Self::read_from_bufs(ctx.memory(0), si_data, si_data_len));
        let slices: Vec<_> = data.iter().map(|v| IoSlice::new(&v[..])).collect();

        to_result1!(self.0.sock_send(Fd(fd), &slices[..], Siflags(si_flags)))
    }

    fn sock_shutdown(
        &self,
        _ctx: &mut Ctx,
        fd: native::fd,
        how: native::sdflags,
    ) -> HostResult<native::errno> {
        let how = try0!(Sdflags::from_native(how));

        to_result0!(self.0.sock_shutdown(Fd(fd), how))
    }
}

/// Registers an import whose wasm-level results beyond the errno are
/// written through trailing out-pointers, which is how multi-result WASI
/// functions are lowered in the preview 1 ABI.
macro_rules! import_fn {
    ($adapter:ident . $name:ident ( $($arg:ident : $ty:ty),* )) => {
        func!({
            let this = $adapter.clone();
            move |ctx: &mut Ctx $(, $arg: $ty)*| -> Result<native::errno, native::exitcode> {
                this.$name(ctx $(, $arg)*)
            }
        })
    };
    // The two-pointer arm must come first: a `(A, B)` tuple would also
    // match a bare `$ret:ty`.
    ($adapter:ident . $name:ident ( $($arg:ident : $ty:ty),* ) -> ($ret1:ty, $ret2:ty)) => {
        func!({
            let this = $adapter.clone();
            move |ctx: &mut Ctx $(, $arg: $ty)*, ret1: WasmValuePtr<$ret1>, ret2: WasmValuePtr<$ret2>|
                -> Result<native::errno, native::exitcode>
            {
                let memory_ok = ret1.read(ctx.memory(0)).is_ok() && ret2.read(ctx.memory(0)).is_ok();
                if !memory_ok {
                    return Ok(native::errno_fault);
                }

                let (errno, value1, value2) = this.$name(ctx $(, $arg)*)?;
                if errno == native::errno_success {
                    ret1.write(ctx.memory(0), value1).ok();
                    ret2.write(ctx.memory(0), value2).ok();
                }
                Ok(errno)
            }
        })
    };
    ($adapter:ident . $name:ident ( $($arg:ident : $ty:ty),* ) -> $ret:ty) => {
        func!({
            let this = $adapter.clone();
            move |ctx: &mut Ctx $(, $arg: $ty)*, ret: WasmValuePtr<$ret>|
                -> Result<native::errno, native::exitcode>
            {
                if ret.read(ctx.memory(0)).is_err() {
                    return Ok(native::errno_fault);
                }

                let (errno, value) = this.$name(ctx $(, $arg)*)?;
                if errno == native::errno_success {
                    ret.write(ctx.memory(0), value).ok();
                }
                Ok(errno)
            }
        })
    };
}

impl<T: WasiImports> WasiImportsExt for Arc<T> {
    fn into_imports(self) -> ImportObject {
        let adapter = NativeWasiAdapter(self);

        let mut imports = imports! {
            "wasi_snapshot_preview1" => {
                "args_get" => import_fn!(adapter.args_get(argv: WasmSlicePtr<WasmSlicePtr<u8>>, argv_buf: WasmSlicePtr<u8>)),
                "args_sizes_get" => import_fn!(adapter.args_sizes_get() -> (native::size, native::size)),
                "environ_get" => import_fn!(adapter.environ_get(environ: WasmSlicePtr<WasmSlicePtr<u8>>, environ_buf: WasmSlicePtr<u8>)),
                "environ_sizes_get" => import_fn!(adapter.environ_sizes_get() -> (native::size, native::size)),
                "clock_res_get" => import_fn!(adapter.clock_res_get(id: native::clockid) -> native::timestamp),
                "clock_time_get" => import_fn!(adapter.clock_time_get(id: native::clockid, precision: native::timestamp) -> native::timestamp),
                "fd_advise" => import_fn!(adapter.fd_advise(fd: native::fd, offset: native::filesize, len: native::filesize, advice: native::advice)),
                "fd_allocate" => import_fn!(adapter.fd_allocate(fd: native::fd, offset: native::filesize, len: native::filesize)),
                "fd_close" => import_fn!(adapter.fd_close(fd: native::fd)),
                "fd_datasync" => import_fn!(adapter.fd_datasync(fd: native::fd)),
                "fd_fdstat_get" => import_fn!(adapter.fd_fdstat_get(fd: native::fd) -> native::fdstat),
                "fd_fdstat_set_flags" => import_fn!(adapter.fd_fdstat_set_flags(fd: native::fd, flags: native::fdflags)),
                "fd_fdstat_set_rights" => import_fn!(adapter.fd_fdstat_set_rights(fd: native::fd, fs_rights_base: native::rights, fs_rights_inheriting: native::rights)),
                "fd_filestat_get" => import_fn!(adapter.fd_filestat_get(fd: native::fd) -> native::filestat),
                "fd_filestat_set_size" => import_fn!(adapter.fd_filestat_set_size(fd: native::fd, size: native::filesize)),
                "fd_filestat_set_times" => import_fn!(adapter.fd_filestat_set_times(fd: native::fd, atim: native::timestamp, mtim: native::timestamp, fst_flags: native::fstflags)),
                "fd_pread" => import_fn!(adapter.fd_pread(fd: native::fd, iovs: WasmSlicePtr<native::iovec>, iovs_len: native::size, offset: native::filesize) -> native::size),
                "fd_prestat_get" => import_fn!(adapter.fd_prestat_get(fd: native::fd) -> native::prestat),
                "fd_prestat_dir_name" => import_fn!(adapter.fd_prestat_dir_name(fd: native::fd, path: WasmSlicePtr<u8>, path_len: native::size)),
                "fd_pwrite" => import_fn!(adapter.fd_pwrite(fd: native::fd, iovs: WasmSlicePtr<native::ciovec>, iovs_len: native::size, offset: native::filesize) -> native::size),
                "fd_read" => import_fn!(adapter.fd_read(fd: native::fd, iovs: WasmSlicePtr<native::iovec>, iovs_len: native::size) -> native::size),
                "fd_readdir" => import_fn!(adapter.fd_readdir(fd: native::fd, buf: WasmSlicePtr<u8>, buf_len: native::size, cookie: native::dircookie) -> native::size),
                "fd_renumber" => import_fn!(adapter.fd_renumber(fd: native::fd, to: native::fd)),
                "fd_seek" => import_fn!(adapter.fd_seek(fd: native::fd, offset: native::filedelta, whence: native::whence) -> native::filesize),
                "fd_sync" => import_fn!(adapter.fd_sync(fd: native::fd)),
                "fd_tell" => import_fn!(adapter.fd_tell(fd: native::fd) -> native::filesize),
                "fd_write" => import_fn!(adapter.fd_write(fd: native::fd, iovs: WasmSlicePtr<native::ciovec>, iovs_len: native::size) -> native::size),
                "path_create_directory" => import_fn!(adapter.path_create_directory(fd: native::fd, path: WasmSlicePtr<u8>, path_len: native::size)),
                "path_filestat_get" => import_fn!(adapter.path_filestat_get(fd: native::fd, flags: native::lookupflags, path: WasmSlicePtr<u8>, path_len: native::size) -> native::filestat),
                "path_filestat_set_times" => import_fn!(adapter.path_filestat_set_times(fd: native::fd, flags: native::lookupflags, path: WasmSlicePtr<u8>, path_len: native::size, atim: native::timestamp, mtim: native::timestamp, fst_flags: native::fstflags)),
                "path_link" => import_fn!(adapter.path_link(old_fd: native::fd, old_flags: native::lookupflags, old_path: WasmSlicePtr<u8>, old_path_len: native::size, new_fd: native::fd, new_path: WasmSlicePtr<u8>, new_path_len: native::size)),
                "path_open" => import_fn!(adapter.path_open(fd: native::fd, dirflags: native::lookupflags, path: WasmSlicePtr<u8>, path_len: native::size, oflags: native::oflags, fs_rights_base: native::rights, fs_rights_inheriting: native::rights, fdflags: native::fdflags) -> native::fd),
                "path_readlink" => import_fn!(adapter.path_readlink(fd: native::fd, path: WasmSlicePtr<u8>, path_len: native::size, buf: WasmSlicePtr<u8>, buf_len: native::size) -> native::size),
                "path_remove_directory" => import_fn!(adapter.path_remove_directory(fd: native::fd, path: WasmSlicePtr<u8>, path_len: native::size)),
                "path_rename" => import_fn!(adapter.path_rename(fd: native::fd, old_path: WasmSlicePtr<u8>, old_path_len: native::size, new_fd: native::fd, new_path: WasmSlicePtr<u8>, new_path_len: native::size)),
                "path_symlink" => import_fn!(adapter.path_symlink(old_path: WasmSlicePtr<u8>, old_path_len: native::size, fd: native::fd, new_path: WasmSlicePtr<u8>, new_path_len: native::size)),
                "path_unlink_file" => import_fn!(adapter.path_unlink_file(fd: native::fd, path: WasmSlicePtr<u8>, path_len: native::size)),
                "poll_oneoff" => import_fn!(adapter.poll_oneoff(subscriptions: WasmSlicePtr<native::subscription>, out: WasmSlicePtr<native::event>, nsubscriptions: native::size) -> native::size),
                "proc_exit" => func!({
                    let this = adapter.clone();
                    move |ctx: &mut Ctx, rval: native::exitcode| -> Result<(), native::exitcode> {
                        this.proc_exit(ctx, rval)
                    }
                }),
                "proc_raise" => import_fn!(adapter.proc_raise(sig: native::signal)),
                "random_get" => import_fn!(adapter.random_get(buf: WasmSlicePtr<u8>, buf_len: native::size)),
                "sched_yield" => import_fn!(adapter.sched_yield()),
                "sock_recv" => import_fn!(adapter.sock_recv(fd: native::fd, ri_data: WasmSlicePtr<native::iovec>, ri_data_len: native::size, ri_flags: native::riflags) -> (native::size, native::roflags)),
                "sock_send" => import_fn!(adapter.sock_send(fd: native::fd, si_data: WasmSlicePtr<native::ciovec>, si_data_len: native::size, si_flags: native::siflags) -> native::size),
                "sock_shutdown" => import_fn!(adapter.sock_shutdown(fd: native::fd, how: native::sdflags)),
            },
        };
        imports.allow_missing_functions = true;

        imports
    }
}
