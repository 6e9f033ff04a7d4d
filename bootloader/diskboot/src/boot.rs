//! The load-and-jump sequence. Each stage moves strictly forward; the only
//! branch is the magic check, which picks between loading segments and
//! failing.

use crate::disk::BlockDevice;
use crate::elf::{validate_magic, ElfHeader, FileHeader, ProgramHeader, PROGRAM_HEADER_SIZE};
use crate::error::BootError;
use crate::layout::BootLayout;
use crate::log::TaggedLogger;
use crate::memory::{PhysicalAddress, PhysicalMemory};
use crate::port::PortIo;
use crate::segment::load_segment;
use crate::signal::signal_failure;

const LOGGER: TaggedLogger = TaggedLogger::new("BOOT", 36);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Stage the leading sectors of the image into scratch
    LoadHeader,
    /// Check the format tag of the staged header
    Validate,
    /// Copy every program segment to its load address
    LoadSegments,
    /// Everything is in place; control goes to the kernel entry
    Jump(PhysicalAddress),
    Fail(BootError),
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Jump(_) | Stage::Fail(_))
    }
}

/// What the caller must do once the loader is finished. Neither outcome
/// returns on real hardware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handoff {
    /// Call this address with no arguments
    Enter(PhysicalAddress),
    /// Raise the failure signal and stop
    Halt(BootError),
}

pub struct Bootloader<D: BlockDevice, M: PhysicalMemory> {
    disk: D,
    memory: M,
    layout: BootLayout,
    stage: Stage,
    /// Bounds of the program header table, fixed once the magic is accepted
    program_header_offset: u32,
    program_header_count: u16,
}

impl<D: BlockDevice, M: PhysicalMemory> Bootloader<D, M> {
    pub fn new(disk: D, memory: M, layout: BootLayout) -> Self {
        Self {
            disk,
            memory,
            layout,
            stage: Stage::LoadHeader,
            program_header_offset: 0,
            program_header_count: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn into_parts(self) -> (D, M) {
        (self.disk, self.memory)
    }

    /// Perform the current stage and move to the next one. Terminal stages
    /// are left as they are.
    pub fn step(&mut self) -> Stage {
        self.stage = match self.stage {
            Stage::LoadHeader => {
                self.load_header();
                Stage::Validate
            }
            Stage::Validate => match self.validate() {
                Ok(()) => Stage::LoadSegments,
                Err(err) => {
                    LOGGER.log(format_args!("{}", err));
                    Stage::Fail(err)
                }
            },
            Stage::LoadSegments => {
                self.load_segments();
                let entry = self.entry_address();
                LOGGER.log(format_args!("enter kernel at {:#010X}", entry.as_u32()));
                Stage::Jump(entry)
            }
            terminal => terminal,
        };
        self.stage
    }

    /// Step until a terminal stage is reached
    pub fn run(&mut self) -> Handoff {
        loop {
            match self.step() {
                Stage::Jump(entry) => return Handoff::Enter(entry),
                Stage::Fail(err) => return Handoff::Halt(err),
                _ => (),
            }
        }
    }

    /// The image header as it currently sits in scratch
    fn staged_header(&self) -> ElfHeader {
        let mut header = ElfHeader::default();
        self.memory.read_bytes(self.layout.scratch, header.as_buffer_mut());
        header
    }

    fn load_header(&mut self) {
        let sectors = load_segment(
            &mut self.disk,
            &mut self.memory,
            self.layout.scratch,
            self.layout.scratch_size() as u32,
            0,
            self.layout.first_image_sector,
        );
        LOGGER.log(format_args!(
            "staged {} sectors at {:#010X}",
            sectors,
            self.layout.scratch.as_u32(),
        ));
    }

    fn validate(&mut self) -> Result<(), BootError> {
        let header = self.staged_header();
        let magic = header.magic;
        validate_magic(&magic.to_le_bytes())?;
        self.program_header_offset = header.program_header_offset;
        self.program_header_count = header.program_header_count;
        Ok(())
    }

    /// Walk the program header table in file order. Each entry is read out
    /// of scratch right before it is loaded, and segment types and flags are
    /// not consulted.
    fn load_segments(&mut self) {
        let table = self.layout.scratch + self.program_header_offset;
        for index in 0..self.program_header_count as u32 {
            let mut program_header = ProgramHeader::default();
            let entry = table + index * PROGRAM_HEADER_SIZE as u32;
            self.memory.read_bytes(entry, program_header.as_buffer_mut());

            let destination = PhysicalAddress::new(program_header.virtual_address)
                .masked(self.layout.address_mask);
            let size = program_header.memory_size;
            let offset = program_header.offset;

            let sectors = load_segment(
                &mut self.disk,
                &mut self.memory,
                destination,
                size,
                offset,
                self.layout.first_image_sector,
            );
            LOGGER.log(format_args!(
                "segment {}: {:#x} bytes from {:#x} to {:#010X} ({} sectors)",
                index,
                size,
                offset,
                destination.as_u32(),
                sectors,
            ));
        }
    }

    /// Read after every segment has landed: a segment loaded over scratch
    /// replaces the entry point that gets used.
    fn entry_address(&self) -> PhysicalAddress {
        let entry_point = self.staged_header().entry_point;
        PhysicalAddress::new(entry_point).masked(self.layout.address_mask)
    }
}

/// Run the whole sequence with the fixed PC layout
pub fn boot<D: BlockDevice, M: PhysicalMemory>(disk: D, memory: M) -> Handoff {
    Bootloader::new(disk, memory, BootLayout::PC).run()
}

/// Carry out the side effects of a finished boot. On failure the signal goes
/// out on `io` and `None` comes back, leaving the caller only to spin; on
/// success the entry address comes back untouched.
pub fn finish<P: PortIo>(handoff: Handoff, io: &mut P) -> Option<PhysicalAddress> {
    match handoff {
        Handoff::Enter(entry) => Some(entry),
        Handoff::Halt(_) => {
            signal_failure(io);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SECTOR_SIZE;

    /// A disk image held in memory; sector 0 is the boot sector
    struct ImageDisk {
        sectors: Vec<u8>,
        reads: Vec<u32>,
    }

    impl ImageDisk {
        fn with_image(image: &[u8]) -> Self {
            let mut sectors = vec![0u8; SECTOR_SIZE];
            sectors.extend_from_slice(image);
            let padded = (sectors.len() + SECTOR_SIZE - 1) / SECTOR_SIZE * SECTOR_SIZE;
            sectors.resize(padded.max(SECTOR_SIZE * 64), 0);
            Self {
                sectors,
                reads: Vec::new(),
            }
        }
    }

    impl BlockDevice for ImageDisk {
        fn read_sector(&mut self, lba: u32, buffer: &mut [u8; SECTOR_SIZE]) {
            self.reads.push(lba);
            let start = lba as usize * SECTOR_SIZE;
            buffer.copy_from_slice(&self.sectors[start..start + SECTOR_SIZE]);
        }
    }

    struct Ram(Vec<u8>);

    impl PhysicalMemory for Ram {
        fn read_bytes(&self, address: PhysicalAddress, buffer: &mut [u8]) {
            let start = address.as_u32() as usize;
            buffer.copy_from_slice(&self.0[start..start + buffer.len()]);
        }

        fn write_sector(&mut self, address: PhysicalAddress, sector: &[u8; SECTOR_SIZE]) {
            let start = address.as_u32() as usize;
            self.0[start..start + SECTOR_SIZE].copy_from_slice(sector);
        }
    }

    fn small_layout() -> BootLayout {
        BootLayout {
            scratch: PhysicalAddress::new(0x1000),
            header_sectors: 2,
            address_mask: 0xffff,
            first_image_sector: 1,
        }
    }

    fn image_with_segment(entry: u32, address: u32, offset: u32, size: u32) -> Vec<u8> {
        let mut image = vec![0u8; 0x800];
        image[0..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
        image[0x18..0x1c].copy_from_slice(&entry.to_le_bytes());
        image[0x1c..0x20].copy_from_slice(&52u32.to_le_bytes());
        image[0x2c..0x2e].copy_from_slice(&1u16.to_le_bytes());
        let ph = 52;
        image[ph..ph + 4].copy_from_slice(&1u32.to_le_bytes());
        image[ph + 4..ph + 8].copy_from_slice(&offset.to_le_bytes());
        image[ph + 8..ph + 12].copy_from_slice(&address.to_le_bytes());
        image[ph + 20..ph + 24].copy_from_slice(&size.to_le_bytes());
        image
    }

    #[test]
    fn walks_stages_in_order() {
        let image = image_with_segment(0xc000_2010, 0xc000_2000, 0x400, 0x200);
        let mut loader = Bootloader::new(
            ImageDisk::with_image(&image),
            Ram(vec![0; 0x4000]),
            small_layout(),
        );

        assert_eq!(loader.stage(), Stage::LoadHeader);
        assert_eq!(loader.step(), Stage::Validate);
        assert_eq!(loader.step(), Stage::LoadSegments);
        let done = loader.step();
        assert_eq!(done, Stage::Jump(PhysicalAddress::new(0x2010)));
        assert!(done.is_terminal());
        // terminal stages stay put
        assert_eq!(loader.step(), done);

        let (disk, _) = loader.into_parts();
        assert_eq!(disk.reads, vec![1, 2, 3]);
    }

    #[test]
    fn bad_magic_stops_before_segments() {
        let mut image = image_with_segment(0x2010, 0x2000, 0x400, 0x200);
        image[1] = b'X';
        let mut loader = Bootloader::new(
            ImageDisk::with_image(&image),
            Ram(vec![0; 0x4000]),
            small_layout(),
        );

        let handoff = loader.run();
        assert!(matches!(handoff, Handoff::Halt(BootError::InvalidImage { .. })));
        assert!(matches!(loader.stage(), Stage::Fail(_)));
        let (disk, _) = loader.into_parts();
        assert_eq!(disk.reads, vec![1, 2]);
    }

    #[test]
    fn segment_types_are_ignored() {
        let mut image = image_with_segment(0x2000, 0x2000, 0x400, 0x10);
        // PT_NULL with no flags still gets loaded
        image[52..56].copy_from_slice(&0u32.to_le_bytes());
        image[0x400..0x410].copy_from_slice(b"segment payload!");
        let mut loader = Bootloader::new(
            ImageDisk::with_image(&image),
            Ram(vec![0; 0x4000]),
            small_layout(),
        );

        assert_eq!(loader.run(), Handoff::Enter(PhysicalAddress::new(0x2000)));
        let mut landed = [0u8; 16];
        loader.memory().read_bytes(PhysicalAddress::new(0x2000), &mut landed);
        assert_eq!(&landed, b"segment payload!");
    }

    #[test]
    fn entry_is_read_after_segments_land() {
        // the only segment is loaded over scratch, bringing its own entry field
        let mut image = image_with_segment(0x2000, 0x1000, 0x400, 0x200);
        image[0x418..0x41c].copy_from_slice(&0xc000_3000u32.to_le_bytes());
        let mut loader = Bootloader::new(
            ImageDisk::with_image(&image),
            Ram(vec![0; 0x4000]),
            small_layout(),
        );

        assert_eq!(loader.run(), Handoff::Enter(PhysicalAddress::new(0x3000)));
    }

    struct SignalRecorder {
        writes: Vec<(u16, u16)>,
    }

    impl PortIo for SignalRecorder {
        fn read_u8(&mut self, _port: u16) -> u8 {
            panic!("nothing is read when finishing");
        }

        fn write_u8(&mut self, port: u16, _value: u8) {
            panic!("unexpected byte write to {:#x}", port);
        }

        fn read_u16(&mut self, _port: u16) -> u16 {
            panic!("nothing is read when finishing");
        }

        fn write_u16(&mut self, port: u16, value: u16) {
            self.writes.push((port, value));
        }
    }

    #[test]
    fn finish_halt_raises_signal_once() {
        let mut io = SignalRecorder { writes: Vec::new() };
        let halt = Handoff::Halt(BootError::InvalidImage { found: 0 });

        assert_eq!(finish(halt, &mut io), None);
        assert_eq!(io.writes, vec![(0x8a00, 0x8a00), (0x8a00, 0x8e00)]);
    }

    #[test]
    fn finish_enter_is_silent() {
        let mut io = SignalRecorder { writes: Vec::new() };
        let entry = PhysicalAddress::new(0x100000);

        assert_eq!(finish(Handoff::Enter(entry), &mut io), Some(entry));
        assert!(io.writes.is_empty());
    }
}
