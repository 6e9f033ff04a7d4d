//! Turns a byte range of the image into whole-sector reads.
//!
//! Reads are sector-granular, so the copy starts at the sector boundary
//! enclosing `source_offset` and may run up to `SECTOR_SIZE - 1` bytes past
//! the requested end. Segments are loaded in increasing address order, so the
//! spill is expected to land in memory that a later segment overwrites or
//! that nothing uses. Nothing stops a spill from clobbering an earlier
//! segment placed just above it.

use crate::disk::BlockDevice;
use crate::layout::SECTOR_SIZE;
use crate::memory::{PhysicalAddress, PhysicalMemory};

const SECTOR_BYTES: u32 = SECTOR_SIZE as u32;

/// The sequence of `(destination, sector)` pairs needed to bring
/// `byte_count` bytes at `source_offset` of the image into memory at
/// `destination`.
#[derive(Clone, Debug)]
pub struct SectorSpan {
    next_address: PhysicalAddress,
    next_sector: u32,
    end: PhysicalAddress,
}

impl SectorSpan {
    /// `first_image_sector` is the device sector holding image offset 0.
    pub fn new(
        destination: PhysicalAddress,
        byte_count: u32,
        source_offset: u32,
        first_image_sector: u32,
    ) -> Self {
        let end = destination + byte_count;
        Self {
            next_address: destination - source_offset % SECTOR_BYTES,
            next_sector: source_offset / SECTOR_BYTES + first_image_sector,
            end,
        }
    }
}

impl Iterator for SectorSpan {
    type Item = (PhysicalAddress, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_address >= self.end {
            return None;
        }
        let item = (self.next_address, self.next_sector);
        self.next_address = self.next_address + SECTOR_BYTES;
        self.next_sector = self.next_sector.wrapping_add(1);
        Some(item)
    }
}

/// Copy a byte range of the image to its load address, one sector per read.
/// Returns the number of sectors read.
pub fn load_segment<D: BlockDevice, M: PhysicalMemory>(
    disk: &mut D,
    memory: &mut M,
    destination: PhysicalAddress,
    byte_count: u32,
    source_offset: u32,
    first_image_sector: u32,
) -> u32 {
    let mut sectors = 0;
    let mut sector = [0u8; SECTOR_SIZE];
    let span = SectorSpan::new(destination, byte_count, source_offset, first_image_sector);
    for (address, lba) in span {
        disk.read_sector(lba, &mut sector);
        memory.write_sector(address, &sector);
        sectors += 1;
    }
    sectors
}
