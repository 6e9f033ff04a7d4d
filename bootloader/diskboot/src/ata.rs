//! Polling ATA PIO driver for the master drive on the primary channel.
//! Only one command is ever in flight, and only READ SECTORS is issued.

use crate::disk::BlockDevice;
use crate::layout::SECTOR_SIZE;
use crate::port::PortIo;

pub const PRIMARY_BASE_PORT: u16 = 0x1f0;

const REG_DATA: u16 = 0;
const REG_SECTOR_COUNT: u16 = 2;
const REG_LBA_LOW: u16 = 3;
const REG_LBA_MID: u16 = 4;
const REG_LBA_HIGH: u16 = 5;
const REG_DRIVE: u16 = 6;
/// Reads return status, writes issue a command
const REG_STATUS_COMMAND: u16 = 7;

pub const STATUS_BUSY: u8 = 0x80;
pub const STATUS_READY: u8 = 0x40;

/// LBA addressing, master drive. The low nibble carries LBA bits 24-27.
const DRIVE_LBA_MASTER: u8 = 0xe0;

#[repr(u8)]
pub enum AtaCommand {
    ReadSectors = 0x20,
}

/// A single ATA channel, driven entirely through polling. Commands are
/// issued one sector at a time using 28-bit LBA addressing.
pub struct AtaPio<P: PortIo> {
    io: P,
    base_port: u16,
}

impl<P: PortIo> AtaPio<P> {
    pub fn primary(io: P) -> Self {
        Self::new(io, PRIMARY_BASE_PORT)
    }

    pub fn new(io: P, base_port: u16) -> Self {
        Self { io, base_port }
    }

    /// Hand back the port accessor, once the disk is no longer needed
    pub fn into_inner(self) -> P {
        self.io
    }

    /// Spin until the drive reports ready and not busy. There is no timeout:
    /// if the drive never comes ready, there is nobody left to report to.
    fn wait_ready(&mut self) {
        let status_port = self.base_port + REG_STATUS_COMMAND;
        while self.io.read_u8(status_port) & (STATUS_BUSY | STATUS_READY) != STATUS_READY {
            core::hint::spin_loop();
        }
    }

    fn issue_read(&mut self, lba: u32) {
        let base = self.base_port;
        self.io.write_u8(base + REG_SECTOR_COUNT, 1);
        self.io.write_u8(base + REG_LBA_LOW, lba as u8);
        self.io.write_u8(base + REG_LBA_MID, (lba >> 8) as u8);
        self.io.write_u8(base + REG_LBA_HIGH, (lba >> 16) as u8);
        let drive = DRIVE_LBA_MASTER | ((lba >> 24) as u8 & 0x0f);
        self.io.write_u8(base + REG_DRIVE, drive);
        self.io.write_u8(base + REG_STATUS_COMMAND, AtaCommand::ReadSectors as u8);
    }
}

impl<P: PortIo> BlockDevice for AtaPio<P> {
    fn read_sector(&mut self, lba: u32, buffer: &mut [u8; SECTOR_SIZE]) {
        self.wait_ready();
        self.issue_read(lba);
        self.wait_ready();

        let data_port = self.base_port + REG_DATA;
        for pair in buffer.chunks_exact_mut(2) {
            // ATA spec suggests reading one word at a time
            let data = self.io.read_u16(data_port);
            pair[0] = data as u8;
            pair[1] = (data >> 8) as u8;
        }
    }
}
