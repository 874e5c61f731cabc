//! Raw wire representation of the WASI snapshot preview 1 ABI.
//!
//! Integer aliases, numeric constants and the wire structs with their
//! exact preview 1 layouts. Everything the guest reads or writes goes
//! through the [`WasmValue`] impls in this module, so the byte offsets
//! below are the single source of truth for the ABI.

#![allow(missing_docs, non_camel_case_types)]

use crate::memory::{WasmSlicePtr, WasmValue};
use std::cell::Cell;

pub type size = u32;
pub type filesize = u64;
pub type filedelta = i64;
pub type timestamp = u64;
pub type clockid = u32;
pub type errno = u16;
pub type rights = u64;
pub type fd = u32;
pub type whence = u8;
pub type dircookie = u64;
pub type dirnamlen = u32;
pub type inode = u64;
pub type device = u64;
pub type linkcount = u64;
pub type filetype = u8;
pub type fdflags = u16;
pub type fstflags = u16;
pub type lookupflags = u32;
pub type oflags = u16;
pub type advice = u8;
pub type preopentype = u8;
pub type eventtype = u8;
pub type eventrwflags = u16;
pub type subclockflags = u16;
pub type userdata = u64;
pub type signal = u8;
pub type riflags = u16;
pub type roflags = u16;
pub type siflags = u16;
pub type sdflags = u8;
pub type exitcode = u32;

pub const errno_success: errno = 0;
pub const errno_2big: errno = 1;
pub const errno_acces: errno = 2;
pub const errno_addrinuse: errno = 3;
pub const errno_addrnotavail: errno = 4;
pub const errno_afnosupport: errno = 5;
pub const errno_again: errno = 6;
pub const errno_already: errno = 7;
pub const errno_badf: errno = 8;
pub const errno_badmsg: errno = 9;
pub const errno_busy: errno = 10;
pub const errno_canceled: errno = 11;
pub const errno_child: errno = 12;
pub const errno_connaborted: errno = 13;
pub const errno_connrefused: errno = 14;
pub const errno_connreset: errno = 15;
pub const errno_deadlk: errno = 16;
pub const errno_destaddrreq: errno = 17;
pub const errno_dom: errno = 18;
pub const errno_dquot: errno = 19;
pub const errno_exist: errno = 20;
pub const errno_fault: errno = 21;
pub const errno_fbig: errno = 22;
pub const errno_hostunreach: errno = 23;
pub const errno_idrm: errno = 24;
pub const errno_ilseq: errno = 25;
pub const errno_inprogress: errno = 26;
pub const errno_intr: errno = 27;
pub const errno_inval: errno = 28;
pub const errno_io: errno = 29;
pub const errno_isconn: errno = 30;
pub const errno_isdir: errno = 31;
pub const errno_loop: errno = 32;
pub const errno_mfile: errno = 33;
pub const errno_mlink: errno = 34;
pub const errno_msgsize: errno = 35;
pub const errno_multihop: errno = 36;
pub const errno_nametoolong: errno = 37;
pub const errno_netdown: errno = 38;
pub const errno_netreset: errno = 39;
pub const errno_netunreach: errno = 40;
pub const errno_nfile: errno = 41;
pub const errno_nobufs: errno = 42;
pub const errno_nodev: errno = 43;
pub const errno_noent: errno = 44;
pub const errno_noexec: errno = 45;
pub const errno_nolck: errno = 46;
pub const errno_nolink: errno = 47;
pub const errno_nomem: errno = 48;
pub const errno_nomsg: errno = 49;
pub const errno_noprotoopt: errno = 50;
pub const errno_nospc: errno = 51;
pub const errno_nosys: errno = 52;
pub const errno_notconn: errno = 53;
pub const errno_notdir: errno = 54;
pub const errno_notempty: errno = 55;
pub const errno_notrecoverable: errno = 56;
pub const errno_notsock: errno = 57;
pub const errno_notsup: errno = 58;
pub const errno_notty: errno = 59;
pub const errno_nxio: errno = 60;
pub const errno_overflow: errno = 61;
pub const errno_ownerdead: errno = 62;
pub const errno_perm: errno = 63;
pub const errno_pipe: errno = 64;
pub const errno_proto: errno = 65;
pub const errno_protonosupport: errno = 66;
pub const errno_prototype: errno = 67;
pub const errno_range: errno = 68;
pub const errno_rofs: errno = 69;
pub const errno_spipe: errno = 70;
pub const errno_srch: errno = 71;
pub const errno_stale: errno = 72;
pub const errno_timedout: errno = 73;
pub const errno_txtbsy: errno = 74;
pub const errno_xdev: errno = 75;
pub const errno_notcapable: errno = 76;

pub const clockid_realtime: clockid = 0;
pub const clockid_monotonic: clockid = 1;
pub const clockid_process_cputime_id: clockid = 2;
pub const clockid_thread_cputime_id: clockid = 3;

pub const filetype_unknown: filetype = 0;
pub const filetype_block_device: filetype = 1;
pub const filetype_character_device: filetype = 2;
pub const filetype_directory: filetype = 3;
pub const filetype_regular_file: filetype = 4;
pub const filetype_socket_dgram: filetype = 5;
pub const filetype_socket_stream: filetype = 6;
pub const filetype_symbolic_link: filetype = 7;

pub const whence_set: whence = 0;
pub const whence_cur: whence = 1;
pub const whence_end: whence = 2;

pub const advice_normal: advice = 0;
pub const advice_sequential: advice = 1;
pub const advice_random: advice = 2;
pub const advice_willneed: advice = 3;
pub const advice_dontneed: advice = 4;
pub const advice_noreuse: advice = 5;

pub const oflags_creat: oflags = 1 << 0;
pub const oflags_directory: oflags = 1 << 1;
pub const oflags_excl: oflags = 1 << 2;
pub const oflags_trunc: oflags = 1 << 3;

pub const fdflags_append: fdflags = 1 << 0;
pub const fdflags_dsync: fdflags = 1 << 1;
pub const fdflags_nonblock: fdflags = 1 << 2;
pub const fdflags_rsync: fdflags = 1 << 3;
pub const fdflags_sync: fdflags = 1 << 4;

pub const fstflags_atim: fstflags = 1 << 0;
pub const fstflags_atim_now: fstflags = 1 << 1;
pub const fstflags_mtim: fstflags = 1 << 2;
pub const fstflags_mtim_now: fstflags = 1 << 3;

pub const lookupflags_symlink_follow: lookupflags = 1 << 0;

pub const rights_fd_datasync: rights = 1 << 0;
pub const rights_fd_read: rights = 1 << 1;
pub const rights_fd_seek: rights = 1 << 2;
pub const rights_fd_fdstat_set_flags: rights = 1 << 3;
pub const rights_fd_sync: rights = 1 << 4;
pub const rights_fd_tell: rights = 1 << 5;
pub const rights_fd_write: rights = 1 << 6;
pub const rights_fd_advise: rights = 1 << 7;
pub const rights_fd_allocate: rights = 1 << 8;
pub const rights_path_create_directory: rights = 1 << 9;
pub const rights_path_create_file: rights = 1 << 10;
pub const rights_path_link_source: rights = 1 << 11;
pub const rights_path_link_target: rights = 1 << 12;
pub const rights_path_open: rights = 1 << 13;
pub const rights_fd_readdir: rights = 1 << 14;
pub const rights_path_readlink: rights = 1 << 15;
pub const rights_path_rename_source: rights = 1 << 16;
pub const rights_path_rename_target: rights = 1 << 17;
pub const rights_path_filestat_get: rights = 1 << 18;
pub const rights_path_filestat_set_size: rights = 1 << 19;
pub const rights_path_filestat_set_times: rights = 1 << 20;
pub const rights_fd_filestat_get: rights = 1 << 21;
pub const rights_fd_filestat_set_size: rights = 1 << 22;
pub const rights_fd_filestat_set_times: rights = 1 << 23;
pub const rights_path_symlink: rights = 1 << 24;
pub const rights_path_remove_directory: rights = 1 << 25;
pub const rights_path_unlink_file: rights = 1 << 26;
pub const rights_poll_fd_readwrite: rights = 1 << 27;
pub const rights_sock_shutdown: rights = 1 << 28;

pub const preopentype_dir: preopentype = 0;

pub const eventtype_clock: eventtype = 0;
pub const eventtype_fd_read: eventtype = 1;
pub const eventtype_fd_write: eventtype = 2;

pub const eventrwflags_fd_readwrite_hangup: eventrwflags = 1 << 0;

pub const subclockflags_subscription_clock_abstime: subclockflags = 1 << 0;

pub const riflags_recv_peek: riflags = 1 << 0;
pub const riflags_recv_waitall: riflags = 1 << 1;

pub const roflags_recv_data_truncated: roflags = 1 << 0;

pub const sdflags_rd: sdflags = 1 << 0;
pub const sdflags_wr: sdflags = 1 << 1;

pub const signal_none: signal = 0;
pub const signal_hup: signal = 1;
pub const signal_int: signal = 2;
pub const signal_quit: signal = 3;
pub const signal_ill: signal = 4;
pub const signal_trap: signal = 5;
pub const signal_abrt: signal = 6;
pub const signal_bus: signal = 7;
pub const signal_fpe: signal = 8;
pub const signal_kill: signal = 9;
pub const signal_usr1: signal = 10;
pub const signal_segv: signal = 11;
pub const signal_usr2: signal = 12;
pub const signal_pipe: signal = 13;
pub const signal_alrm: signal = 14;
pub const signal_term: signal = 15;
pub const signal_chld: signal = 16;
pub const signal_cont: signal = 17;
pub const signal_stop: signal = 18;
pub const signal_tstp: signal = 19;
pub const signal_ttin: signal = 20;
pub const signal_ttou: signal = 21;
pub const signal_urg: signal = 22;
pub const signal_xcpu: signal = 23;
pub const signal_xfsz: signal = 24;
pub const signal_vtalrm: signal = 25;
pub const signal_prof: signal = 26;
pub const signal_winch: signal = 27;
pub const signal_poll: signal = 28;
pub const signal_pwr: signal = 29;
pub const signal_sys: signal = 30;

fn zero(mem: &[Cell<u8>]) {
    for cell in mem {
        cell.set(0);
    }
}

/// A region of guest memory to read into. 8 bytes.
#[derive(Debug, Copy, Clone)]
pub struct iovec {
    pub buf: WasmSlicePtr<u8>,
    pub buf_len: size,
}

impl WasmValue for iovec {
    const SIZE: u32 = 8;
    const ARRAY_OFFSET: u32 = 8;

    fn read(mem: &[Cell<u8>]) -> Self {
        Self {
            buf: WasmValue::read(&mem[0..4]),
            buf_len: WasmValue::read(&mem[4..8]),
        }
    }

    fn write(self, mem: &[Cell<u8>]) {
        self.buf.write(&mem[0..4]);
        self.buf_len.write(&mem[4..8]);
    }
}

/// A region of guest memory to write from. 8 bytes.
#[derive(Debug, Copy, Clone)]
pub struct ciovec {
    pub buf: WasmSlicePtr<u8>,
    pub buf_len: size,
}

impl WasmValue for ciovec {
    const SIZE: u32 = 8;
    const ARRAY_OFFSET: u32 = 8;

    fn read(mem: &[Cell<u8>]) -> Self {
        Self {
            buf: WasmValue::read(&mem[0..4]),
            buf_len: WasmValue::read(&mem[4..8]),
        }
    }

    fn write(self, mem: &[Cell<u8>]) {
        self.buf.write(&mem[0..4]);
        self.buf_len.write(&mem[4..8]);
    }
}

/// File descriptor attributes. 24 bytes.
#[derive(Debug, Copy, Clone, Default)]
pub struct fdstat {
    pub fs_filetype: filetype,
    pub fs_flags: fdflags,
    pub fs_rights_base: rights,
    pub fs_rights_inheriting: rights,
}

impl WasmValue for fdstat {
    const SIZE: u32 = 24;
    const ARRAY_OFFSET: u32 = 24;

    fn read(mem: &[Cell<u8>]) -> Self {
        Self {
            fs_filetype: WasmValue::read(&mem[0..1]),
            fs_flags: WasmValue::read(&mem[2..4]),
            fs_rights_base: WasmValue::read(&mem[8..16]),
            fs_rights_inheriting: WasmValue::read(&mem[16..24]),
        }
    }

    fn write(self, mem: &[Cell<u8>]) {
        zero(mem);
        self.fs_filetype.write(&mem[0..1]);
        self.fs_flags.write(&mem[2..4]);
        self.fs_rights_base.write(&mem[8..16]);
        self.fs_rights_inheriting.write(&mem[16..24]);
    }
}

/// File or directory attributes. 64 bytes.
#[derive(Debug, Copy, Clone, Default)]
pub struct filestat {
    pub dev: device,
    pub ino: inode,
    pub filetype: filetype,
    pub nlink: linkcount,
    pub size: filesize,
    pub atim: timestamp,
    pub mtim: timestamp,
    pub ctim: timestamp,
}

impl WasmValue for filestat {
    const SIZE: u32 = 64;
    const ARRAY_OFFSET: u32 = 64;

    fn read(mem: &[Cell<u8>]) -> Self {
        Self {
            dev: WasmValue::read(&mem[0..8]),
            ino: WasmValue::read(&mem[8..16]),
            filetype: WasmValue::read(&mem[16..17]),
            nlink: WasmValue::read(&mem[24..32]),
            size: WasmValue::read(&mem[32..40]),
            atim: WasmValue::read(&mem[40..48]),
            mtim: WasmValue::read(&mem[48..56]),
            ctim: WasmValue::read(&mem[56..64]),
        }
    }

    fn write(self, mem: &[Cell<u8>]) {
        zero(mem);
        self.dev.write(&mem[0..8]);
        self.ino.write(&mem[8..16]);
        self.filetype.write(&mem[16..17]);
        self.nlink.write(&mem[24..32]);
        self.size.write(&mem[32..40]);
        self.atim.write(&mem[40..48]);
        self.mtim.write(&mem[48..56]);
        self.ctim.write(&mem[56..64]);
    }
}

/// Description of a preopened capability. 8 bytes.
#[derive(Debug, Copy, Clone, Default)]
pub struct prestat {
    pub tag: preopentype,
    pub pr_name_len: size,
}

impl WasmValue for prestat {
    const SIZE: u32 = 8;
    const ARRAY_OFFSET: u32 = 8;

    fn read(mem: &[Cell<u8>]) -> Self {
        Self {
            tag: WasmValue::read(&mem[0..1]),
            pr_name_len: WasmValue::read(&mem[4..8]),
        }
    }

    fn write(self, mem: &[Cell<u8>]) {
        zero(mem);
        self.tag.write(&mem[0..1]);
        self.pr_name_len.write(&mem[4..8]);
    }
}

/// Directory entry header, followed by the raw name bytes. 24 bytes.
#[derive(Debug, Copy, Clone, Default)]
pub struct dirent {
    pub d_next: dircookie,
    pub d_ino: inode,
    pub d_namlen: dirnamlen,
    pub d_type: filetype,
}

impl WasmValue for dirent {
    const SIZE: u32 = 24;
    const ARRAY_OFFSET: u32 = 24;

    fn read(mem: &[Cell<u8>]) -> Self {
        Self {
            d_next: WasmValue::read(&mem[0..8]),
            d_ino: WasmValue::read(&mem[8..16]),
            d_namlen: WasmValue::read(&mem[16..20]),
            d_type: WasmValue::read(&mem[20..21]),
        }
    }

    fn write(self, mem: &[Cell<u8>]) {
        zero(mem);
        self.d_next.write(&mem[0..8]);
        self.d_ino.write(&mem[8..16]);
        self.d_namlen.write(&mem[16..20]);
        self.d_type.write(&mem[20..21]);
    }
}

/// Clock subscription payload of a `subscription`.
#[derive(Debug, Copy, Clone, Default)]
pub struct subscription_clock {
    pub id: clockid,
    pub timeout: timestamp,
    pub precision: timestamp,
    pub flags: subclockflags,
}

/// A `poll_oneoff` subscription. 48 bytes; the payload at offset 16 is a
/// union discriminated by the tag at offset 8, so both interpretations
/// are decoded and the typed layer picks one.
#[derive(Debug, Copy, Clone, Default)]
pub struct subscription {
    pub userdata: userdata,
    pub tag: eventtype,
    pub clock: subscription_clock,
    pub fd: fd,
}

impl WasmValue for subscription {
    const SIZE: u32 = 48;
    const ARRAY_OFFSET: u32 = 48;

    fn read(mem: &[Cell<u8>]) -> Self {
        Self {
            userdata: WasmValue::read(&mem[0..8]),
            tag: WasmValue::read(&mem[8..9]),
            clock: subscription_clock {
                id: WasmValue::read(&mem[16..20]),
                timeout: WasmValue::read(&mem[24..32]),
                precision: WasmValue::read(&mem[32..40]),
                flags: WasmValue::read(&mem[40..42]),
            },
            fd: WasmValue::read(&mem[16..20]),
        }
    }

    fn write(self, mem: &[Cell<u8>]) {
        zero(mem);
        self.userdata.write(&mem[0..8]);
        self.tag.write(&mem[8..9]);
        if self.tag == eventtype_clock {
            self.clock.id.write(&mem[16..20]);
            self.clock.timeout.write(&mem[24..32]);
            self.clock.precision.write(&mem[32..40]);
            self.clock.flags.write(&mem[40..42]);
        } else {
            self.fd.write(&mem[16..20]);
        }
    }
}

/// A `poll_oneoff` event. 32 bytes.
#[derive(Debug, Copy, Clone, Default)]
pub struct event {
    pub userdata: userdata,
    pub error: errno,
    pub r#type: eventtype,
    pub fd_readwrite_nbytes: filesize,
    pub fd_readwrite_flags: eventrwflags,
}

impl WasmValue for event {
    const SIZE: u32 = 32;
    const ARRAY_OFFSET: u32 = 32;

    fn read(mem: &[Cell<u8>]) -> Self {
        Self {
            userdata: WasmValue::read(&mem[0..8]),
            error: WasmValue::read(&mem[8..10]),
            r#type: WasmValue::read(&mem[10..11]),
            fd_readwrite_nbytes: WasmValue::read(&mem[16..24]),
            fd_readwrite_flags: WasmValue::read(&mem[24..26]),
        }
    }

    fn write(self, mem: &[Cell<u8>]) {
        zero(mem);
        self.userdata.write(&mem[0..8]);
        self.error.write(&mem[8..10]);
        self.r#type.write(&mem[10..11]);
        self.fd_readwrite_nbytes.write(&mem[16..24]);
        self.fd_readwrite_flags.write(&mem[24..26]);
    }
}
