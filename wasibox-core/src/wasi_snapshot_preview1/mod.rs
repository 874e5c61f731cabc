//! Types and interfaces for WASI snapshot preview 1.
//!
//! The [`native`] module holds the raw wire representation; this module
//! wraps it in typed Rust values. Conversions in both directions go
//! through [`WasiValue`]: `from_native` validates (enum variants and flag
//! bits the ABI does not define are rejected), `to_native` is total.

pub mod native;

mod adapter;

pub use adapter::WasiImportsExt;

use crate::string_representation::StringRepresentation;
use std::{
    convert::Infallible,
    fmt,
    io::{IoSlice, IoSliceMut},
};

/// Result type for WASI methods.
pub type WasiResult<T> = Result<T, Errno>;

/// Owned string type of a host's string representation.
pub type OwnedString<T> =
    <<T as WasiImports>::StringRepresentation as StringRepresentation>::Owned;
/// Borrowed string type of a host's string representation.
pub type BorrowedString<T> =
    <<T as WasiImports>::StringRepresentation as StringRepresentation>::Borrowed;

/// Exit code reported by the run loop when the guest is cancelled from
/// the outside: 128 + SIGINT, the shell convention for an interrupt.
pub const EXITCODE_INTERRUPTED: native::exitcode = 130;

/// Error produced when a native value has no typed representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidNativeValue {
    type_name: &'static str,
}

impl InvalidNativeValue {
    fn new(type_name: &'static str) -> Self {
        Self { type_name }
    }
}

impl fmt::Display for InvalidNativeValue {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "native value has no {} representation", self.type_name)
    }
}

impl std::error::Error for InvalidNativeValue {}

/// Conversion between the typed and the native WASM representation of a
/// WASI value.
pub trait WasiValue: Sized {
    /// The native WASM type.
    type NativeType: Copy + fmt::Debug;

    /// Converts a native WASM value to its typed representation.
    fn from_native(native: Self::NativeType) -> Result<Self, InvalidNativeValue>;
    /// Converts a typed value to its native WASM representation.
    fn to_native(self) -> Self::NativeType;
}

macro_rules! wasi_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $native:ident {
            $($variant:ident = $value:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[non_exhaustive]
        pub enum $name {
            $(
                #[allow(missing_docs)]
                $variant,
            )+
        }

        impl WasiValue for $name {
            type NativeType = native::$native;

            fn from_native(native: Self::NativeType) -> Result<Self, InvalidNativeValue> {
                match native {
                    $(v if v == native::$value => Ok(Self::$variant),)+
                    _ => Err(InvalidNativeValue::new(stringify!($name))),
                }
            }

            fn to_native(self) -> Self::NativeType {
                match self {
                    $(Self::$variant => native::$value),+
                }
            }
        }
    };
}

macro_rules! wasi_newtype {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($native:ident);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub native::$native);

        impl WasiValue for $name {
            type NativeType = native::$native;

            fn from_native(native: Self::NativeType) -> Result<Self, InvalidNativeValue> {
                Ok(Self(native))
            }

            fn to_native(self) -> Self::NativeType {
                self.0
            }
        }
    };
}

macro_rules! wasi_flags {
    (
        $(#[$meta:meta])*
        pub struct $name:ident : $native:ident {
            $($flag:ident = $value:ident;)+
        }
    ) => {
        bitflags::bitflags! {
            $(#[$meta])*
            pub struct $name: native::$native {
                $(
                    #[allow(missing_docs)]
                    const $flag = native::$value;
                )+
            }
        }

        impl WasiValue for $name {
            type NativeType = native::$native;

            fn from_native(native: Self::NativeType) -> Result<Self, InvalidNativeValue> {
                Self::from_bits(native).ok_or_else(|| InvalidNativeValue::new(stringify!($name)))
            }

            fn to_native(self) -> Self::NativeType {
                self.bits()
            }
        }
    };
}

wasi_enum! {
    /// Error codes returned by WASI functions.
    pub enum Errno : errno {
        Success = errno_success,
        TooBig = errno_2big,
        Acces = errno_acces,
        Addrinuse = errno_addrinuse,
        Addrnotavail = errno_addrnotavail,
        Afnosupport = errno_afnosupport,
        Again = errno_again,
        Already = errno_already,
        Badf = errno_badf,
        Badmsg = errno_badmsg,
        Busy = errno_busy,
        Canceled = errno_canceled,
        Child = errno_child,
        Connaborted = errno_connaborted,
        Connrefused = errno_connrefused,
        Connreset = errno_connreset,
        Deadlk = errno_deadlk,
        Destaddrreq = errno_destaddrreq,
        Dom = errno_dom,
        Dquot = errno_dquot,
        Exist = errno_exist,
        Fault = errno_fault,
        Fbig = errno_fbig,
        Hostunreach = errno_hostunreach,
        Idrm = errno_idrm,
        Ilseq = errno_ilseq,
        Inprogress = errno_inprogress,
        Intr = errno_intr,
        Inval = errno_inval,
        Io = errno_io,
        Isconn = errno_isconn,
        Isdir = errno_isdir,
        Loop = errno_loop,
        Mfile = errno_mfile,
        Mlink = errno_mlink,
        Msgsize = errno_msgsize,
        Multihop = errno_multihop,
        Nametoolong = errno_nametoolong,
        Netdown = errno_netdown,
        Netreset = errno_netreset,
        Netunreach = errno_netunreach,
        Nfile = errno_nfile,
        Nobufs = errno_nobufs,
        Nodev = errno_nodev,
        Noent = errno_noent,
        Noexec = errno_noexec,
        Nolck = errno_nolck,
        Nolink = errno_nolink,
        Nomem = errno_nomem,
        Nomsg = errno_nomsg,
        Noprotoopt = errno_noprotoopt,
        Nospc = errno_nospc,
        Nosys = errno_nosys,
        Notconn = errno_notconn,
        Notdir = errno_notdir,
        Notempty = errno_notempty,
        Notrecoverable = errno_notrecoverable,
        Notsock = errno_notsock,
        Notsup = errno_notsup,
        Notty = errno_notty,
        Nxio = errno_nxio,
        Overflow = errno_overflow,
        Ownerdead = errno_ownerdead,
        Perm = errno_perm,
        Pipe = errno_pipe,
        Proto = errno_proto,
        Protonosupport = errno_protonosupport,
        Prototype = errno_prototype,
        Range = errno_range,
        Rofs = errno_rofs,
        Spipe = errno_spipe,
        Srch = errno_srch,
        Stale = errno_stale,
        Timedout = errno_timedout,
        Txtbsy = errno_txtbsy,
        Xdev = errno_xdev,
        Notcapable = errno_notcapable,
    }
}

impl From<std::io::Error> for Errno {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::NotFound => Errno::Noent,
            ErrorKind::PermissionDenied => Errno::Acces,
            ErrorKind::AlreadyExists => Errno::Exist,
            ErrorKind::InvalidInput => Errno::Inval,
            ErrorKind::Interrupted => Errno::Intr,
            ErrorKind::WouldBlock => Errno::Again,
            ErrorKind::UnexpectedEof => Errno::Io,
            _ => Errno::Io,
        }
    }
}

wasi_enum! {
    /// Identifiers for clocks.
    pub enum Clockid : clockid {
        Realtime = clockid_realtime,
        Monotonic = clockid_monotonic,
        ProcessCputimeId = clockid_process_cputime_id,
        ThreadCputimeId = clockid_thread_cputime_id,
    }
}

wasi_enum! {
    /// The position relative to which to set the offset of the file descriptor.
    pub enum Whence : whence {
        Set = whence_set,
        Cur = whence_cur,
        End = whence_end,
    }
}

wasi_enum! {
    /// The type of a file descriptor or file.
    pub enum Filetype : filetype {
        Unknown = filetype_unknown,
        BlockDevice = filetype_block_device,
        CharacterDevice = filetype_character_device,
        Directory = filetype_directory,
        RegularFile = filetype_regular_file,
        SocketDgram = filetype_socket_dgram,
        SocketStream = filetype_socket_stream,
        SymbolicLink = filetype_symbolic_link,
    }
}

wasi_enum! {
    /// File or memory access pattern advisory information.
    pub enum Advice : advice {
        Normal = advice_normal,
        Sequential = advice_sequential,
        Random = advice_random,
        Willneed = advice_willneed,
        Dontneed = advice_dontneed,
        Noreuse = advice_noreuse,
    }
}

wasi_enum! {
    /// Type of a subscription to an event or its occurrence.
    pub enum Eventtype : eventtype {
        Clock = eventtype_clock,
        FdRead = eventtype_fd_read,
        FdWrite = eventtype_fd_write,
    }
}

wasi_enum! {
    /// Signal condition.
    pub enum Signal : signal {
        None = signal_none,
        Hup = signal_hup,
        Int = signal_int,
        Quit = signal_quit,
        Ill = signal_ill,
        Trap = signal_trap,
        Abrt = signal_abrt,
        Bus = signal_bus,
        Fpe = signal_fpe,
        Kill = signal_kill,
        Usr1 = signal_usr1,
        Segv = signal_segv,
        Usr2 = signal_usr2,
        Pipe = signal_pipe,
        Alrm = signal_alrm,
        Term = signal_term,
        Chld = signal_chld,
        Cont = signal_cont,
        Stop = signal_stop,
        Tstp = signal_tstp,
        Ttin = signal_ttin,
        Ttou = signal_ttou,
        Urg = signal_urg,
        Xcpu = signal_xcpu,
        Xfsz = signal_xfsz,
        Vtalrm = signal_vtalrm,
        Prof = signal_prof,
        Winch = signal_winch,
        Poll = signal_poll,
        Pwr = signal_pwr,
        Sys = signal_sys,
    }
}

wasi_newtype! {
    /// A file descriptor handle.
    pub struct Fd(fd);
}

wasi_newtype! {
    /// A size or byte count.
    pub struct Size(size);
}

wasi_newtype! {
    /// A non-negative file size or length of a region within a file.
    pub struct Filesize(filesize);
}

wasi_newtype! {
    /// A relative offset within a file.
    pub struct Filedelta(filedelta);
}

wasi_newtype! {
    /// Timestamp in nanoseconds.
    pub struct Timestamp(timestamp);
}

wasi_newtype! {
    /// A reference to the offset of a directory entry.
    pub struct Dircookie(dircookie);
}

wasi_newtype! {
    /// User-provided value that may be attached to objects that is
    /// retained when extracted from the implementation.
    pub struct Userdata(userdata);
}

wasi_newtype! {
    /// Exit code generated by a process when exiting.
    pub struct Exitcode(exitcode);
}

wasi_newtype! {
    /// File serial number that is unique within its file system.
    pub struct Inode(inode);
}

wasi_newtype! {
    /// Identifier for a device containing a file system.
    pub struct Device(device);
}

wasi_newtype! {
    /// Number of hard links to an inode.
    pub struct Linkcount(linkcount);
}

wasi_flags! {
    /// File descriptor rights, determining which actions may be performed.
    pub struct Rights : rights {
        FD_DATASYNC = rights_fd_datasync;
        FD_READ = rights_fd_read;
        FD_SEEK = rights_fd_seek;
        FD_FDSTAT_SET_FLAGS = rights_fd_fdstat_set_flags;
        FD_SYNC = rights_fd_sync;
        FD_TELL = rights_fd_tell;
        FD_WRITE = rights_fd_write;
        FD_ADVISE = rights_fd_advise;
        FD_ALLOCATE = rights_fd_allocate;
        PATH_CREATE_DIRECTORY = rights_path_create_directory;
        PATH_CREATE_FILE = rights_path_create_file;
        PATH_LINK_SOURCE = rights_path_link_source;
        PATH_LINK_TARGET = rights_path_link_target;
        PATH_OPEN = rights_path_open;
        FD_READDIR = rights_fd_readdir;
        PATH_READLINK = rights_path_readlink;
        PATH_RENAME_SOURCE = rights_path_rename_source;
        PATH_RENAME_TARGET = rights_path_rename_target;
        PATH_FILESTAT_GET = rights_path_filestat_get;
        PATH_FILESTAT_SET_SIZE = rights_path_filestat_set_size;
        PATH_FILESTAT_SET_TIMES = rights_path_filestat_set_times;
        FD_FILESTAT_GET = rights_fd_filestat_get;
        FD_FILESTAT_SET_SIZE = rights_fd_filestat_set_size;
        FD_FILESTAT_SET_TIMES = rights_fd_filestat_set_times;
        PATH_SYMLINK = rights_path_symlink;
        PATH_REMOVE_DIRECTORY = rights_path_remove_directory;
        PATH_UNLINK_FILE = rights_path_unlink_file;
        POLL_FD_READWRITE = rights_poll_fd_readwrite;
        SOCK_SHUTDOWN = rights_sock_shutdown;
    }
}

wasi_flags! {
    /// File descriptor flags.
    pub struct Fdflags : fdflags {
        APPEND = fdflags_append;
        DSYNC = fdflags_dsync;
        NONBLOCK = fdflags_nonblock;
        RSYNC = fdflags_rsync;
        SYNC = fdflags_sync;
    }
}

wasi_flags! {
    /// Open flags used by `path_open`.
    pub struct Oflags : oflags {
        CREAT = oflags_creat;
        DIRECTORY = oflags_directory;
        EXCL = oflags_excl;
        TRUNC = oflags_trunc;
    }
}

wasi_flags! {
    /// Flags determining the method of how paths are resolved.
    pub struct Lookupflags : lookupflags {
        SYMLINK_FOLLOW = lookupflags_symlink_follow;
    }
}

wasi_flags! {
    /// Which file time attributes to adjust.
    pub struct Fstflags : fstflags {
        ATIM = fstflags_atim;
        ATIM_NOW = fstflags_atim_now;
        MTIM = fstflags_mtim;
        MTIM_NOW = fstflags_mtim_now;
    }
}

wasi_flags! {
    /// Flags provided to `sock_recv`.
    pub struct Riflags : riflags {
        RECV_PEEK = riflags_recv_peek;
        RECV_WAITALL = riflags_recv_waitall;
    }
}

wasi_flags! {
    /// Flags returned by `sock_recv`.
    pub struct Roflags : roflags {
        RECV_DATA_TRUNCATED = roflags_recv_data_truncated;
    }
}

wasi_flags! {
    /// Which channels on a socket to shut down.
    pub struct Sdflags : sdflags {
        RD = sdflags_rd;
        WR = sdflags_wr;
    }
}

wasi_newtype! {
    /// Flags provided to `sock_send`. As there are currently no flags defined,
    /// it must be set to zero.
    pub struct Siflags(siflags);
}

wasi_flags! {
    /// The state of the file descriptor subscribed to with `Eventtype::FdRead`
    /// or `Eventtype::FdWrite`.
    pub struct Eventrwflags : eventrwflags {
        FD_READWRITE_HANGUP = eventrwflags_fd_readwrite_hangup;
    }
}

wasi_flags! {
    /// Flags determining how a clock subscription's timeout is interpreted.
    pub struct Subclockflags : subclockflags {
        SUBSCRIPTION_CLOCK_ABSTIME = subclockflags_subscription_clock_abstime;
    }
}

/// File descriptor attributes.
#[derive(Debug, Copy, Clone)]
pub struct Fdstat {
    /// File type.
    pub fs_filetype: Filetype,
    /// File descriptor flags.
    pub fs_flags: Fdflags,
    /// Rights that apply to this file descriptor.
    pub fs_rights_base: Rights,
    /// Maximum set of rights that may be installed on new file descriptors
    /// that are created through this file descriptor, e.g. through `path_open`.
    pub fs_rights_inheriting: Rights,
}

impl WasiValue for Fdstat {
    type NativeType = native::fdstat;

    fn from_native(native: Self::NativeType) -> Result<Self, InvalidNativeValue> {
        Ok(Self {
            fs_filetype: Filetype::from_native(native.fs_filetype)?,
            fs_flags: Fdflags::from_native(native.fs_flags)?,
            fs_rights_base: Rights::from_native(native.fs_rights_base)?,
            fs_rights_inheriting: Rights::from_native(native.fs_rights_inheriting)?,
        })
    }

    fn to_native(self) -> Self::NativeType {
        native::fdstat {
            fs_filetype: self.fs_filetype.to_native(),
            fs_flags: self.fs_flags.to_native(),
            fs_rights_base: self.fs_rights_base.to_native(),
            fs_rights_inheriting: self.fs_rights_inheriting.to_native(),
        }
    }
}

/// File attributes.
#[derive(Debug, Copy, Clone)]
pub struct Filestat {
    /// Device ID of device containing the file.
    pub dev: Device,
    /// File serial number.
    pub ino: Inode,
    /// File type.
    pub filetype: Filetype,
    /// Number of hard links to the file.
    pub nlink: Linkcount,
    /// For regular files, the file size in bytes. For symbolic links, the
    /// length in bytes of the pathname contained in the symbolic link.
    pub size: Filesize,
    /// Last data access timestamp.
    pub atim: Timestamp,
    /// Last data modification timestamp.
    pub mtim: Timestamp,
    /// Last file status change timestamp.
    pub ctim: Timestamp,
}

impl WasiValue for Filestat {
    type NativeType = native::filestat;

    fn from_native(native: Self::NativeType) -> Result<Self, InvalidNativeValue> {
        Ok(Self {
            dev: Device(native.dev),
            ino: Inode(native.ino),
            filetype: Filetype::from_native(native.filetype)?,
            nlink: Linkcount(native.nlink),
            size: Filesize(native.size),
            atim: Timestamp(native.atim),
            mtim: Timestamp(native.mtim),
            ctim: Timestamp(native.ctim),
        })
    }

    fn to_native(self) -> Self::NativeType {
        native::filestat {
            dev: self.dev.0,
            ino: self.ino.0,
            filetype: self.filetype.to_native(),
            nlink: self.nlink.0,
            size: self.size.0,
            atim: self.atim.0,
            mtim: self.mtim.0,
            ctim: self.ctim.0,
        }
    }
}

/// Information about a pre-opened capability.
#[derive(Debug, Copy, Clone)]
pub enum Prestat {
    /// A pre-opened directory; the guest asks for the name separately via
    /// `fd_prestat_dir_name`.
    Dir {
        /// The length of the directory name for use with `fd_prestat_dir_name`.
        pr_name_len: Size,
    },
}

impl WasiValue for Prestat {
    type NativeType = native::prestat;

    fn from_native(native: Self::NativeType) -> Result<Self, InvalidNativeValue> {
        match native.tag {
            t if t == native::preopentype_dir => Ok(Prestat::Dir {
                pr_name_len: Size(native.pr_name_len),
            }),
            _ => Err(InvalidNativeValue::new("Prestat")),
        }
    }

    fn to_native(self) -> Self::NativeType {
        match self {
            Prestat::Dir { pr_name_len } => native::prestat {
                tag: native::preopentype_dir,
                pr_name_len: pr_name_len.0,
            },
        }
    }
}

/// A directory entry.
#[derive(Debug, Copy, Clone)]
pub struct Dirent {
    /// The offset of the next directory entry stored in this directory.
    pub d_next: Dircookie,
    /// The serial number of the file referred to by this directory entry.
    pub d_ino: Inode,
    /// The length of the name of the directory entry.
    pub d_namlen: Size,
    /// The type of the file referred to by this directory entry.
    pub d_type: Filetype,
}

impl WasiValue for Dirent {
    type NativeType = native::dirent;

    fn from_native(native: Self::NativeType) -> Result<Self, InvalidNativeValue> {
        Ok(Self {
            d_next: Dircookie(native.d_next),
            d_ino: Inode(native.d_ino),
            d_namlen: Size(native.d_namlen),
            d_type: Filetype::from_native(native.d_type)?,
        })
    }

    fn to_native(self) -> Self::NativeType {
        native::dirent {
            d_next: self.d_next.0,
            d_ino: self.d_ino.0,
            d_namlen: self.d_namlen.0,
            d_type: self.d_type.to_native(),
        }
    }
}

/// Payload of a clock subscription.
#[derive(Debug, Copy, Clone)]
pub struct SubscriptionClock {
    /// The clock against which to compare the timestamp.
    pub id: Clockid,
    /// The absolute or relative timestamp.
    pub timeout: Timestamp,
    /// The amount of time that the implementation may wait additionally to
    /// coalesce with other events.
    pub precision: Timestamp,
    /// Whether the timeout is absolute or relative.
    pub flags: Subclockflags,
}

/// Payload of a file descriptor subscription.
#[derive(Debug, Copy, Clone)]
pub struct SubscriptionFdReadwrite {
    /// The file descriptor on which to wait for it to become ready.
    pub file_descriptor: Fd,
}

/// The condition a `poll_oneoff` subscription waits on.
#[derive(Debug, Copy, Clone)]
pub enum SubscriptionU {
    /// Wait for a clock to reach a timestamp.
    Clock(SubscriptionClock),
    /// Wait for a file descriptor to have data available for reading.
    FdRead(SubscriptionFdReadwrite),
    /// Wait for a file descriptor to have capacity available for writing.
    FdWrite(SubscriptionFdReadwrite),
}

/// Subscription to an event.
#[derive(Debug, Copy, Clone)]
pub struct Subscription {
    /// User-provided value that is attached to the subscription and
    /// returned through `Event::userdata`.
    pub userdata: Userdata,
    /// The type of the event to which to subscribe and its payload.
    pub u: SubscriptionU,
}

impl WasiValue for Subscription {
    type NativeType = native::subscription;

    fn from_native(native: Self::NativeType) -> Result<Self, InvalidNativeValue> {
        let u = match Eventtype::from_native(native.tag)? {
            Eventtype::Clock => SubscriptionU::Clock(SubscriptionClock {
                id: Clockid::from_native(native.clock.id)?,
                timeout: Timestamp(native.clock.timeout),
                precision: Timestamp(native.clock.precision),
                flags: Subclockflags::from_native(native.clock.flags)?,
            }),
            Eventtype::FdRead => SubscriptionU::FdRead(SubscriptionFdReadwrite {
                file_descriptor: Fd(native.fd),
            }),
            Eventtype::FdWrite => SubscriptionU::FdWrite(SubscriptionFdReadwrite {
                file_descriptor: Fd(native.fd),
            }),
        };

        Ok(Self {
            userdata: Userdata(native.userdata),
            u,
        })
    }

    fn to_native(self) -> Self::NativeType {
        let mut native = native::subscription {
            userdata: self.userdata.0,
            ..Default::default()
        };

        match self.u {
            SubscriptionU::Clock(clock) => {
                native.tag = native::eventtype_clock;
                native.clock = native::subscription_clock {
                    id: clock.id.to_native(),
                    timeout: clock.timeout.0,
                    precision: clock.precision.0,
                    flags: clock.flags.to_native(),
                };
            }
            SubscriptionU::FdRead(fd) => {
                native.tag = native::eventtype_fd_read;
                native.fd = fd.file_descriptor.0;
            }
            SubscriptionU::FdWrite(fd) => {
                native.tag = native::eventtype_fd_write;
                native.fd = fd.file_descriptor.0;
            }
        }

        native
    }
}

/// The contents of an `Event` for the `FdRead` and `FdWrite` variants.
#[derive(Debug, Copy, Clone, Default)]
pub struct EventFdReadwrite {
    /// The number of bytes available for reading or writing.
    pub nbytes: Filesize,
    /// The state of the file descriptor.
    pub flags: Eventrwflags,
}

impl Default for Eventrwflags {
    fn default() -> Self {
        Eventrwflags::empty()
    }
}

/// An event that occurred.
#[derive(Debug, Copy, Clone)]
pub struct Event {
    /// User-provided value that got attached to `Subscription::userdata`.
    pub userdata: Userdata,
    /// If non-zero, an error that occurred while processing the
    /// subscription request.
    pub error: Errno,
    /// The type of the event that occurred.
    pub kind: Eventtype,
    /// The contents of the event, if it is a `FdRead` or `FdWrite` event.
    pub fd_readwrite: EventFdReadwrite,
}

impl WasiValue for Event {
    type NativeType = native::event;

    fn from_native(native: Self::NativeType) -> Result<Self, InvalidNativeValue> {
        Ok(Self {
            userdata: Userdata(native.userdata),
            error: Errno::from_native(native.error)?,
            kind: Eventtype::from_native(native.r#type)?,
            fd_readwrite: EventFdReadwrite {
                nbytes: Filesize(native.fd_readwrite_nbytes),
                flags: Eventrwflags::from_native(native.fd_readwrite_flags)?,
            },
        })
    }

    fn to_native(self) -> Self::NativeType {
        native::event {
            userdata: self.userdata.0,
            error: self.error.to_native(),
            r#type: self.kind.to_native(),
            fd_readwrite_nbytes: self.fd_readwrite.nbytes.0,
            fd_readwrite_flags: self.fd_readwrite.flags.to_native(),
        }
    }
}

/// Functions necessary to satisfy the WASI specification.
pub trait WasiImports: Send + Sync + 'static {
    /// The string representation used for path and name arguments.
    type StringRepresentation: StringRepresentation;

    /// Gets the command-line parameters.
    fn args_get(&self) -> WasiResult<&[OwnedString<Self>]>;

    /// Gets the environment. It is common convention that each string is of
    /// the form `key=value`.
    fn environ_get(&self) -> WasiResult<&[OwnedString<Self>]>;

    /// Return the resolution of a clock. Implementations are required to
    /// provide a non-zero value for supported clocks. For unsupported clocks,
    /// return `Err(Errno::Inval)`.
    ///
    /// Note: This is similar to `clock_getres` in POSIX.
    fn clock_res_get(&self, id: Clockid) -> WasiResult<Timestamp>;

    /// Return the time value of a clock.
    ///
    /// Note: This is similar to `clock_gettime` in POSIX.
    fn clock_time_get(&self, id: Clockid, precision: Timestamp) -> WasiResult<Timestamp>;

    /// Provide file advisory information on a file descriptor.
    ///
    /// Note: This is similar to `posix_fadvise` in POSIX.
    fn fd_advise(&self, fd: Fd, offset: Filesize, len: Filesize, advice: Advice) -> WasiResult<()>;

    /// Force the allocation of space in a file.
    ///
    /// Note: This is similar to `posix_fallocate` in POSIX.
    fn fd_allocate(&self, fd: Fd, offset: Filesize, len: Filesize) -> WasiResult<()>;

    /// Close a file descriptor.
    ///
    /// Note: This is similar to `close` in POSIX.
    fn fd_close(&self, fd: Fd) -> WasiResult<()>;

    /// Synchronize the data of a file to disk.
    ///
    /// Note: This is similar to `fdatasync` in POSIX.
    fn fd_datasync(&self, fd: Fd) -> WasiResult<()>;

    /// Get the attributes of a file descriptor.
    ///
    /// Note: This returns similar flags to `fcntl(fd, F_GETFL)` in POSIX, as
    /// well as additional fields.
    fn fd_fdstat_get(&self, fd: Fd) -> WasiResult<Fdstat>;

    /// Adjust the flags associated with a file descriptor.
    ///
    /// Note: This is similar to `fcntl(fd, F_SETFL, flags)` in POSIX.
    fn fd_fdstat_set_flags(&self, fd: Fd, flags: Fdflags) -> WasiResult<()>;

    /// Adjust the rights associated with a file descriptor. This can only be
    /// used to remove rights, and returns `Err(Errno::Notcapable)` if called
    /// in a way that would attempt to add rights.
    fn fd_fdstat_set_rights(
        &self,
        fd: Fd,
        fs_rights_base: Rights,
        fs_rights_inheriting: Rights,
    ) -> WasiResult<()>;

    /// Return the attributes of an open file.
    fn fd_filestat_get(&self, fd: Fd) -> WasiResult<Filestat>;

    /// Adjust the size of an open file. If this increases the file's size, the
    /// extra bytes are filled with zeros.
    ///
    /// Note: This is similar to `ftruncate` in POSIX.
    fn fd_filestat_set_size(&self, fd: Fd, size: Filesize) -> WasiResult<()>;

    /// Adjust the timestamps of an open file or directory.
    ///
    /// Note: This is similar to `futimens` in POSIX.
    fn fd_filestat_set_times(
        &self,
        fd: Fd,
        atim: Timestamp,
        mtim: Timestamp,
        fst_flags: Fstflags,
    ) -> WasiResult<()>;

    /// Read from a file descriptor, without using and updating the file
    /// descriptor's offset.
    ///
    /// Note: This is similar to `preadv` in POSIX.
    fn fd_pread(
        &self,
        fd: Fd,
        iovs: &mut [IoSliceMut<'_>],
        offset: Filesize,
    ) -> WasiResult<Size>;

    /// Return a description of the given preopened file descriptor.
    fn fd_prestat_get(&self, fd: Fd) -> WasiResult<Prestat>;

    /// Return the directory name of the given preopened file descriptor.
    fn fd_prestat_dir_name(&self, fd: Fd) -> WasiResult<OwnedString<Self>>;

    /// Write to a file descriptor, without using and updating the file
    /// descriptor's offset.
    ///
    /// Note: This is similar to `pwritev` in POSIX.
    fn fd_pwrite(&self, fd: Fd, bufs: &[IoSlice<'_>], offset: Filesize) -> WasiResult<Size>;

    /// Read from a file descriptor.
    ///
    /// Note: This is similar to `readv` in POSIX.
    fn fd_read(&self, fd: Fd, iovs: &mut [IoSliceMut<'_>]) -> WasiResult<Size>;

    /// Read one directory entry from a directory.
    ///
    /// The cookie of the first entry in a directory is always `Dircookie(0)`.
    fn fd_readdir(&self, fd: Fd, cookie: Dircookie)
        -> WasiResult<Option<(Dirent, OwnedString<Self>)>>;

    /// Atomically replace a file descriptor by renumbering another file
    /// descriptor onto it. If the target descriptor is open, it is closed
    /// first.
    fn fd_renumber(&self, fd: Fd, to: Fd) -> WasiResult<()>;

    /// Move the offset of a file descriptor.
    ///
    /// Note: This is similar to `lseek` in POSIX.
    fn fd_seek(&self, fd: Fd, offset: Filedelta, whence: Whence) -> WasiResult<Filesize>;

    /// Synchronize the data and metadata of a file to disk.
    ///
    /// Note: This is similar to `fsync` in POSIX.
    fn fd_sync(&self, fd: Fd) -> WasiResult<()>;

    /// Return the current offset of a file descriptor.
    ///
    /// Note: This is similar to `lseek(fd, 0, SEEK_CUR)` in POSIX.
    fn fd_tell(&self, fd: Fd) -> WasiResult<Filesize>;

    /// Write to a file descriptor.
    ///
    /// Note: This is similar to `writev` in POSIX.
    fn fd_write(&self, fd: Fd, bufs: &[IoSlice<'_>]) -> WasiResult<Size>;

    /// Create a directory.
    ///
    /// Note: This is similar to `mkdirat` in POSIX.
    fn path_create_directory(&self, fd: Fd, path: &BorrowedString<Self>) -> WasiResult<()>;

    /// Return the attributes of a file or directory.
    ///
    /// Note: This is similar to `stat` in POSIX.
    fn path_filestat_get(
        &self,
        fd: Fd,
        flags: Lookupflags,
        path: &BorrowedString<Self>,
    ) -> WasiResult<Filestat>;

    /// Adjust the timestamps of a file or directory.
    ///
    /// Note: This is similar to `utimensat` in POSIX.
    fn path_filestat_set_times(
        &self,
        fd: Fd,
        flags: Lookupflags,
        path: &BorrowedString<Self>,
        atim: Timestamp,
        mtim: Timestamp,
        fst_flags: Fstflags,
    ) -> WasiResult<()>;

    /// Create a hard link.
    ///
    /// Note: This is similar to `linkat` in POSIX.
    fn path_link(
        &self,
        old_fd: Fd,
        old_flags: Lookupflags,
        old_path: &BorrowedString<Self>,
        new_fd: Fd,
        new_path: &BorrowedString<Self>,
    ) -> WasiResult<()>;

    /// Open a file or directory.
    ///
    /// Note: This is similar to `openat` in POSIX.
    fn path_open(
        &self,
        fd: Fd,
        dirflags: Lookupflags,
        path: &BorrowedString<Self>,
        oflags: Oflags,
        fs_rights_base: Rights,
        fs_rights_inheriting: Rights,
        fdflags: Fdflags,
    ) -> WasiResult<Fd>;

    /// Read the contents of a symbolic link.
    ///
    /// Note: This is similar to `readlinkat` in POSIX.
    fn path_readlink(&self, fd: Fd, path: &BorrowedString<Self>)
        -> WasiResult<OwnedString<Self>>;

    /// Remove a directory. Return `Err(Errno::Notempty)` if the directory is
    /// not empty.
    ///
    /// Note: This is similar to `unlinkat(fd, path, AT_REMOVEDIR)` in POSIX.
    fn path_remove_directory(&self, fd: Fd, path: &BorrowedString<Self>) -> WasiResult<()>;

    /// Rename a file or directory.
    ///
    /// Note: This is similar to `renameat` in POSIX.
    fn path_rename(
        &self,
        fd: Fd,
        old_path: &BorrowedString<Self>,
        new_fd: Fd,
        new_path: &BorrowedString<Self>,
    ) -> WasiResult<()>;

    /// Create a symbolic link.
    ///
    /// Note: This is similar to `symlinkat` in POSIX.
    fn path_symlink(
        &self,
        old_path: &BorrowedString<Self>,
        fd: Fd,
        new_path: &BorrowedString<Self>,
    ) -> WasiResult<()>;

    /// Unlink a file. Return `Err(Errno::Isdir)` if the path refers to a
    /// directory.
    ///
    /// Note: This is similar to `unlinkat(fd, path, 0)` in POSIX.
    fn path_unlink_file(&self, fd: Fd, path: &BorrowedString<Self>) -> WasiResult<()>;

    /// Concurrently poll for the occurrence of a set of events.
    fn poll_oneoff(&self, subscriptions: &[Subscription]) -> WasiResult<Vec<Event>>;

    /// Terminate the process normally. An exit code of 0 indicates successful
    /// termination of the program. The meanings of other values is dependent
    /// on the environment.
    ///
    /// Implementations should always return `Err(rval)`.
    fn proc_exit(&self, rval: Exitcode) -> Result<Infallible, Exitcode>;

    /// Send a signal to the process of the calling thread.
    ///
    /// Note: This is similar to `raise` in POSIX.
    fn proc_raise(&self, sig: Signal) -> WasiResult<()>;

    /// Write high-quality random data into a buffer.
    fn random_get(&self, buf: &mut [u8]) -> WasiResult<()>;

    /// Temporarily yield execution of the calling thread.
    ///
    /// Note: This is similar to `sched_yield` in POSIX.
    fn sched_yield(&self) -> WasiResult<()>;

    /// Receive a message from a socket.
    ///
    /// Note: This is similar to `recv` in POSIX, though it also supports
    /// reading the data into multiple buffers in the manner of `readv`.
    fn sock_recv(
        &self,
        fd: Fd,
        ri_data: &mut [IoSliceMut<'_>],
        ri_flags: Riflags,
    ) -> WasiResult<(Size, Roflags)>;

    /// Send a message on a socket.
    ///
    /// Note: This is similar to `send` in POSIX, though it also supports
    /// writing the data from multiple buffers in the manner of `writev`.
    fn sock_send(&self, fd: Fd, si_data: &[IoSlice<'_>], si_flags: Siflags) -> WasiResult<Size>;

    /// Shut down socket send and receive channels.
    ///
    /// Note: This is similar to `shutdown` in POSIX.
    fn sock_shutdown(&self, fd: Fd, how: Sdflags) -> WasiResult<()>;
}
