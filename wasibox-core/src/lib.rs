//! ABI layer for the wasibox WASI host.
//!
//! This crate defines the WASI snapshot preview 1 wire types with their
//! exact in-memory layouts, the marshalling primitives used to move them
//! across the guest's linear memory boundary, and the [`WasiImports`]
//! trait that a host implements to satisfy the syscall surface. The
//! [`WasiImportsExt::into_imports`] adapter turns any implementation into
//! a wasmer import object under the `wasi_snapshot_preview1` namespace.
//!
//! [`WasiImports`]: wasi_snapshot_preview1::WasiImports
//! [`WasiImportsExt::into_imports`]: wasi_snapshot_preview1::WasiImportsExt::into_imports

#![forbid(rust_2018_idioms, future_incompatible, elided_lifetimes_in_paths)]
#![warn(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    missing_docs,
    unreachable_pub,
    unused_import_braces,
    unused_qualifications,
    variant_size_differences
)]

pub mod memory;
pub mod string_representation;
pub mod wasi_snapshot_preview1;
