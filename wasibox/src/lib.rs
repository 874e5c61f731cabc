//! A WASI snapshot preview 1 host over an in-memory file system.
//!
//! The host executes a WebAssembly guest whose only view of the world is
//! a virtual POSIX-style volume ([`MemVolume`]), character devices for
//! stdin/stdout/stderr supplied by the embedder, monotonic and realtime
//! clocks, and a cooperative cancellation signal ([`AbortSignal`]). The
//! guest is run to completion by [`WasiHost::run_binary`]; blocking host
//! work (stdin reads, clock waits in `poll_oneoff`) happens inside the
//! syscall while the guest logically waits, and cancellation is observed
//! between syscalls and at those blocking points.
//!
//! [`MemVolume`]: volume::MemVolume
//! [`AbortSignal`]: abort::AbortSignal
//! [`WasiHost::run_binary`]: wasi_snapshot_preview1::WasiHost::run_binary

#![forbid(rust_2018_idioms, future_incompatible, elided_lifetimes_in_paths)]
#![warn(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    variant_size_differences
)]

pub mod abort;
pub mod error;
pub mod handle;
mod os;
pub mod volume;
pub mod wasi_snapshot_preview1;
pub mod writable;

pub use wasibox_core::string_representation;
