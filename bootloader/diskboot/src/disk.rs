use crate::layout::SECTOR_SIZE;

/// Trait abstracting a sector-addressable storage device.
/// On hardware, this is backed by the ATA PIO driver.
/// In tests, it can be backed by an in-memory disk image.
///
/// Every call names an absolute sector, so reads never depend on a previous
/// read having happened. There is no error path: a device that cannot
/// complete the read is expected to hang rather than return.
pub trait BlockDevice {
    fn read_sector(&mut self, lba: u32, buffer: &mut [u8; SECTOR_SIZE]);
}
