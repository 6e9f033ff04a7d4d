use core::ops::{Add, Sub};

use crate::layout::SECTOR_SIZE;

/// A 32-bit physical address. Arithmetic wraps, matching what raw pointer
/// math does on the target; the loader never checks destinations against
/// the amount of installed memory.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct PhysicalAddress(u32);

impl PhysicalAddress {
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Fold a linked address into the range that is reachable without paging
    pub const fn masked(&self, mask: u32) -> Self {
        Self(self.0 & mask)
    }
}

impl Add<u32> for PhysicalAddress {
    type Output = PhysicalAddress;

    fn add(self, rhs: u32) -> Self::Output {
        Self::new(self.0.wrapping_add(rhs))
    }
}

impl Sub<u32> for PhysicalAddress {
    type Output = PhysicalAddress;

    fn sub(self, rhs: u32) -> Self::Output {
        Self::new(self.0.wrapping_sub(rhs))
    }
}

impl core::fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PhysicalAddress({:#010X})", self.0)
    }
}

/// Byte-level access to physical memory. The loader uses it to land sectors
/// at their final address and to inspect the staged image header.
///
/// Nothing here hands out references into physical memory: a destination
/// may be address 0 or may wrap past the top of the address space, and both
/// are legal targets for a trusted image.
pub trait PhysicalMemory {
    /// Fill `buffer` with the bytes starting at `address`
    fn read_bytes(&self, address: PhysicalAddress, buffer: &mut [u8]);

    /// Store one sector's worth of bytes starting at `address`
    fn write_sector(&mut self, address: PhysicalAddress, sector: &[u8; SECTOR_SIZE]);
}

/// Physical memory as seen by the CPU with paging disabled: every address is
/// its own pointer.
pub struct IdentityMapped {
    _private: (),
}

impl IdentityMapped {
    /// # Safety
    ///
    /// Paging must be off, and every address later handed to this accessor
    /// must be RAM that nothing else (including the running loader's own
    /// code and stack) depends on.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }

    fn byte_ptr(address: PhysicalAddress, index: usize) -> *mut u8 {
        (address + index as u32).as_u32() as usize as *mut u8
    }
}

impl PhysicalMemory for IdentityMapped {
    fn read_bytes(&self, address: PhysicalAddress, buffer: &mut [u8]) {
        for (index, byte) in buffer.iter_mut().enumerate() {
            // volatile accesses may target memory outside any Rust
            // allocation, including address 0
            *byte = unsafe { core::ptr::read_volatile(Self::byte_ptr(address, index)) };
        }
    }

    fn write_sector(&mut self, address: PhysicalAddress, sector: &[u8; SECTOR_SIZE]) {
        for (index, byte) in sector.iter().enumerate() {
            unsafe { core::ptr::write_volatile(Self::byte_ptr(address, index), *byte) };
        }
    }
}
