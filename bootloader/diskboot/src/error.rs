/// Everything that can stop the loader short of the kernel entry point.
///
/// A device that never becomes ready is not represented here: the ATA driver
/// polls forever and the failure looks like a hang.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// The first four bytes of the image were not the ELF magic
    InvalidImage { found: u32 },
}

impl core::fmt::Display for BootError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BootError::InvalidImage { found } => {
                write!(f, "invalid image magic {:#010X}", found)
            }
        }
    }
}
