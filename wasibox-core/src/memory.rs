//! Marshalling primitives for the guest's linear memory.
//!
//! All guest pointers are 32-bit offsets into a single linear memory.
//! Integer encodings are little-endian. A fresh view of the memory is
//! taken on every access, so the memory may grow between syscalls without
//! invalidating any pointer value. Accesses outside the current memory
//! size fail with [`MemoryFault`], which the syscall adapter reports to
//! the guest as `errno_fault`.

use std::{cell::Cell, fmt, marker::PhantomData, mem};
use wasmer_runtime_core::memory::Memory;

/// Error produced by an out-of-bounds guest memory access.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryFault {
    /// Start offset of the failed access.
    pub offset: u64,
    /// Length of the failed access in bytes.
    pub len: u64,
    /// Size of the linear memory at the time of the access.
    pub memory_size: u64,
}

impl fmt::Display for MemoryFault {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "guest memory access of {} bytes at offset {} is outside the {}-byte linear memory",
            self.len, self.offset, self.memory_size
        )
    }
}

impl std::error::Error for MemoryFault {}

trait MemoryExt {
    fn as_cell_slice(&self) -> &[Cell<u8>];
}

impl MemoryExt for Memory {
    fn as_cell_slice(&self) -> &[Cell<u8>] {
        let memory_view = self.view::<u8>();
        let result = &*memory_view;
        // Safety: result actually borrows from self, not from memory_view.
        //         This is a limitation of deref, and this should be fixed in
        //         wasmer_runtime_core by providing a method for this.
        unsafe { std::slice::from_raw_parts(result.as_ptr(), result.len()) }
    }
}

fn checked_range(
    memory: &[Cell<u8>],
    offset: u32,
    len: u64,
) -> Result<&[Cell<u8>], MemoryFault> {
    let start = offset as u64;
    let end = start + len;

    if end <= memory.len() as u64 {
        Ok(&memory[start as usize..end as usize])
    } else {
        Err(MemoryFault {
            offset: start,
            len,
            memory_size: memory.len() as u64,
        })
    }
}

/// A value that can be stored in WASM linear memory.
pub trait WasmValue: fmt::Debug + Copy {
    /// Size of the value in bytes.
    const SIZE: u32;
    /// Offset between two elements of this type inside an array.
    const ARRAY_OFFSET: u32;

    /// Reads the value from a slice of exactly [`Self::SIZE`] bytes.
    ///
    /// [`Self::SIZE`]: WasmValue::SIZE
    fn read(mem: &[Cell<u8>]) -> Self;
    /// Writes the value to a slice of exactly [`Self::SIZE`] bytes.
    ///
    /// [`Self::SIZE`]: WasmValue::SIZE
    fn write(self, mem: &[Cell<u8>]);
}

macro_rules! primitive_wasmvalue_impl {
    ($t:ty) => {
        impl WasmValue for $t {
            const SIZE: u32 = mem::size_of::<$t>() as u32;
            const ARRAY_OFFSET: u32 = mem::size_of::<$t>() as u32;

            fn read(mem: &[Cell<u8>]) -> Self {
                let mut bytes = [0u8; mem::size_of::<Self>()];
                for (byte, cell) in bytes.iter_mut().zip(mem) {
                    *byte = cell.get();
                }
                Self::from_le_bytes(bytes)
            }

            fn write(self, mem: &[Cell<u8>]) {
                for (byte, cell) in self.to_le_bytes().iter().zip(mem) {
                    cell.set(*byte);
                }
            }
        }
    };
}

primitive_wasmvalue_impl!(u8);
primitive_wasmvalue_impl!(i8);
primitive_wasmvalue_impl!(u16);
primitive_wasmvalue_impl!(i16);
primitive_wasmvalue_impl!(u32);
primitive_wasmvalue_impl!(i32);
primitive_wasmvalue_impl!(u64);
primitive_wasmvalue_impl!(i64);

/// Pointer to a single WASM value.
#[derive(Debug, Copy, Clone)]
pub struct WasmValuePtr<T: WasmValue> {
    offset: u32,
    _phantom: PhantomData<fn(T) -> T>,
}

impl<T: WasmValue> WasmValuePtr<T> {
    /// Creates a pointer from a raw guest offset.
    pub fn from_offset(offset: u32) -> Self {
        WasmValuePtr {
            offset,
            _phantom: PhantomData,
        }
    }

    /// Reads the value from WASM memory.
    pub fn read(self, memory: &Memory) -> Result<T, MemoryFault> {
        let mem = checked_range(memory.as_cell_slice(), self.offset, T::SIZE as u64)?;
        Ok(T::read(mem))
    }

    /// Writes the value to WASM memory.
    pub fn write(self, memory: &Memory, value: T) -> Result<(), MemoryFault> {
        let mem = checked_range(memory.as_cell_slice(), self.offset, T::SIZE as u64)?;
        value.write(mem);
        Ok(())
    }
}

/// Pointer to the start of an array of WASM values.
#[derive(Debug, Copy, Clone)]
pub struct WasmSlicePtr<T: WasmValue> {
    offset: u32,
    _phantom: PhantomData<fn(T) -> T>,
}

impl<T: WasmValue> WasmSlicePtr<T> {
    /// Creates a pointer from a raw guest offset.
    pub fn from_offset(offset: u32) -> Self {
        WasmSlicePtr {
            offset,
            _phantom: PhantomData,
        }
    }

    /// Borrows the `length`-element region of WASM memory this pointer
    /// refers to. The whole region is bounds-checked up front; element
    /// accesses on the returned slice cannot fault.
    pub fn with(self, memory: &Memory, length: u32) -> Result<WasmMemorySlice<'_, T>, MemoryFault> {
        let len = length as u64 * T::ARRAY_OFFSET as u64;
        let memory = checked_range(memory.as_cell_slice(), self.offset, len)?;

        Ok(WasmMemorySlice {
            memory,
            _phantom: PhantomData,
        })
    }

    /// Adds an element offset to this pointer.
    pub fn add(self, offset: u32) -> WasmSlicePtr<T> {
        WasmSlicePtr {
            offset: self.offset + offset * T::ARRAY_OFFSET,
            _phantom: PhantomData,
        }
    }
}

/// A bounds-checked region of WASM memory holding an array of values.
#[derive(Debug)]
pub struct WasmMemorySlice<'a, T: WasmValue> {
    memory: &'a [Cell<u8>],
    _phantom: PhantomData<fn(T) -> T>,
}

impl<'a, T: WasmValue> WasmMemorySlice<'a, T> {
    fn element(&self, index: u32) -> &[Cell<u8>] {
        let start = (index * T::ARRAY_OFFSET) as usize;
        let end = start + T::SIZE as usize;

        &self.memory[start..end]
    }

    /// Reads the i'th value.
    pub fn read(&self, index: u32) -> T {
        T::read(self.element(index))
    }

    /// Writes the i'th value.
    pub fn write(&self, index: u32, value: T) {
        T::write(value, self.element(index));
    }
}

impl<T: WasmValue> WasmValue for WasmValuePtr<T> {
    const SIZE: u32 = mem::size_of::<u32>() as u32;
    const ARRAY_OFFSET: u32 = mem::size_of::<u32>() as u32;

    fn read(mem: &[Cell<u8>]) -> Self {
        WasmValuePtr {
            offset: WasmValue::read(mem),
            _phantom: PhantomData,
        }
    }

    fn write(self, mem: &[Cell<u8>]) {
        self.offset.write(mem)
    }
}

impl<T: WasmValue> WasmValue for WasmSlicePtr<T> {
    const SIZE: u32 = mem::size_of::<u32>() as u32;
    const ARRAY_OFFSET: u32 = mem::size_of::<u32>() as u32;

    fn read(mem: &[Cell<u8>]) -> Self {
        WasmSlicePtr {
            offset: WasmValue::read(mem),
            _phantom: PhantomData,
        }
    }

    fn write(self, mem: &[Cell<u8>]) {
        self.offset.write(mem)
    }
}

unsafe impl<T: WasmValue> wasmer_runtime_core::types::WasmExternType for WasmValuePtr<T> {
    type Native = i32;

    fn from_native(native: Self::Native) -> Self {
        Self {
            offset: native as u32,
            _phantom: PhantomData,
        }
    }

    fn to_native(self) -> Self::Native {
        self.offset as i32
    }
}

unsafe impl<T: WasmValue> wasmer_runtime_core::types::WasmExternType for WasmSlicePtr<T> {
    type Native = i32;

    fn from_native(native: Self::Native) -> Self {
        Self {
            offset: native as u32,
            _phantom: PhantomData,
        }
    }

    fn to_native(self) -> Self::Native {
        self.offset as i32
    }
}
