//! The parts of the 32-bit ELF format the loader consumes: the file header
//! and the program header table. Section headers are never looked at.

use crate::error::BootError;

/// "\x7fELF" read as a little-endian u32
pub const ELF_MAGIC: u32 = 0x464c_457f;

pub const ELF_HEADER_SIZE: usize = core::mem::size_of::<ElfHeader>();
pub const PROGRAM_HEADER_SIZE: usize = core::mem::size_of::<ProgramHeader>();

#[derive(Default, Clone, Copy)]
#[repr(C, packed)]
pub struct ElfHeader {
    pub magic: u32,
    /// 1 indicates 32-bit, 2 indicates 64-bit
    pub bit_class: u8,
    /// 1 indicates little-endian, 2 indicates big-endian
    pub endianness: u8,
    pub id_version: u8,
    pub os_abi: u8,
    pub abi_version: u8,
    pub _padding: [u8; 7],
    pub object_file_type: u16,
    pub machine: u16,
    pub elf_version: u32,
    /// Address of entry point
    pub entry_point: u32,
    /// Pointer to the program header table, as an offset from the start of the file
    pub program_header_offset: u32,
    pub section_header_offset: u32,
    pub flags: u32,
    /// Size of this header, typically 52 bytes
    pub header_size: u16,
    pub program_header_size: u16,
    /// Number of entries in the program header table
    pub program_header_count: u16,
    pub section_header_size: u16,
    pub section_header_count: u16,
    pub section_name_index: u16,
}

impl FileHeader for ElfHeader {}

#[derive(Default, Clone, Copy)]
#[repr(C, packed)]
pub struct ProgramHeader {
    /// Type of segment. The loader copies every entry regardless
    pub segment_type: u32,
    /// Offset of the segment in the file
    pub offset: u32,
    /// Virtual address of the segment in memory
    pub virtual_address: u32,
    pub physical_address: u32,
    /// Size of the segment in the file
    pub file_size: u32,
    /// Size of the segment in memory
    pub memory_size: u32,
    pub flags: u32,
    pub alignment: u32,
}

impl FileHeader for ProgramHeader {}

/// Fixed-layout on-disk structures, filled in place from raw bytes
pub trait FileHeader
where
    Self: Sized,
{
    fn as_buffer_mut(&mut self) -> &mut [u8] {
        let len = core::mem::size_of::<Self>();
        let ptr = self as *mut Self as *mut u8;
        unsafe { core::slice::from_raw_parts_mut(ptr, len) }
    }
}

/// Check the format tag at the front of a staged image. Only the first four
/// bytes are looked at; nothing else about the image is verified.
pub fn validate_magic(bytes: &[u8]) -> Result<(), BootError> {
    let mut tag = [0u8; 4];
    let available = bytes.len().min(4);
    tag[..available].copy_from_slice(&bytes[..available]);
    let found = u32::from_le_bytes(tag);
    if available == 4 && found == ELF_MAGIC {
        Ok(())
    } else {
        Err(BootError::InvalidImage { found })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_sizes_match_elf32() {
        assert_eq!(ELF_HEADER_SIZE, 52);
        assert_eq!(PROGRAM_HEADER_SIZE, 32);
    }

    #[test]
    fn accepts_elf_magic() {
        assert_eq!(validate_magic(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]), Ok(()));
    }

    #[test]
    fn rejects_anything_else() {
        assert_eq!(
            validate_magic(b"MZ\x90\x00"),
            Err(BootError::InvalidImage { found: 0x0090_5a4d }),
        );
        assert!(validate_magic(&[0x7f, b'E', b'L', b'f']).is_err());
        assert!(validate_magic(&[0x7f, b'E', b'L']).is_err());
        assert!(validate_magic(&[0u8; 512]).is_err());
    }

    #[test]
    fn reads_header_fields() {
        let mut raw = [0u8; 64];
        raw[0..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
        raw[0x18..0x1c].copy_from_slice(&0xc010_000cu32.to_le_bytes());
        raw[0x1c..0x20].copy_from_slice(&52u32.to_le_bytes());
        raw[0x2c..0x2e].copy_from_slice(&3u16.to_le_bytes());

        let mut header = ElfHeader::default();
        header.as_buffer_mut().copy_from_slice(&raw[..ELF_HEADER_SIZE]);
        let magic = header.magic;
        let entry = header.entry_point;
        let offset = header.program_header_offset;
        let count = header.program_header_count;
        assert_eq!(magic, ELF_MAGIC);
        assert_eq!(entry, 0xc010_000c);
        assert_eq!(offset, 52);
        assert_eq!(count, 3);
    }

    #[test]
    fn reads_program_header_fields() {
        let mut raw = [0u8; 32];
        raw[4..8].copy_from_slice(&0x1000u32.to_le_bytes());
        raw[8..12].copy_from_slice(&0xc010_0000u32.to_le_bytes());
        raw[20..24].copy_from_slice(&0x2345u32.to_le_bytes());

        let mut ph = ProgramHeader::default();
        ph.as_buffer_mut().copy_from_slice(&raw);
        let offset = ph.offset;
        let address = ph.virtual_address;
        let size = ph.memory_size;
        assert_eq!(offset, 0x1000);
        assert_eq!(address, 0xc010_0000);
        assert_eq!(size, 0x2345);
    }
}
