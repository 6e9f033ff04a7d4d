//! Fixed memory map and disk layout. Nothing here is allocated; every region
//! is a physical address agreed on with the earlier boot stage and the kernel
//! linker script.

use crate::memory::PhysicalAddress;

pub const SECTOR_SIZE: usize = 512;

/// Sector 0 holds the boot sector itself
pub const BOOT_SECTOR: u32 = 0;

#[derive(Copy, Clone, Debug)]
pub struct BootLayout {
    /// Where the leading sectors of the image are staged, so the header and
    /// program header table can be inspected before the real destinations
    /// are known.
    pub scratch: PhysicalAddress,
    /// How many sectors of the image are staged into scratch
    pub header_sectors: u32,
    /// Paging is off, so linked virtual addresses are folded into the low
    /// physical range with this mask.
    pub address_mask: u32,
    /// Device sector holding byte 0 of the image
    pub first_image_sector: u32,
}

impl BootLayout {
    pub const PC: BootLayout = BootLayout {
        scratch: PhysicalAddress::new(0x10000),
        header_sectors: 8,
        address_mask: 0x00ff_ffff,
        first_image_sector: BOOT_SECTOR + 1,
    };

    pub const fn scratch_size(&self) -> usize {
        self.header_sectors as usize * SECTOR_SIZE
    }
}
