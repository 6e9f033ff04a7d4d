/// Access to the x86 IO address space. The loader only ever talks to hardware
/// through this trait, so the ATA driver and failure signal can be driven by
/// an emulated register file in tests.
pub trait PortIo {
    fn read_u8(&mut self, port: u16) -> u8;
    fn write_u8(&mut self, port: u16, value: u8);
    fn read_u16(&mut self, port: u16) -> u16;
    fn write_u16(&mut self, port: u16, value: u16);
}

/// The x86 processor family has two address spaces: memory and IO
/// IO addresses are called Ports, and are used to interface directly with
/// low-level hardware. Nothing else is available this early in boot, so the
/// disk and the debug channels are all driven through them.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct Port(u16);

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl Port {
    pub const fn new(number: u16) -> Self {
        Self(number)
    }

    pub fn write_u8(&self, value: u8) {
        unsafe {
            // writing to a variable port is only possible through the DX and AL
            // registers
            core::arch::asm!(
                "out dx, al",
                in("dx") self.0,
                in("al") value,
                options(nomem, nostack, preserves_flags),
            );
        }
    }

    pub fn read_u8(&self) -> u8 {
        let value: u8;
        unsafe {
            core::arch::asm!(
                "in al, dx",
                out("al") value,
                in("dx") self.0,
                options(nomem, nostack, preserves_flags),
            );
        }
        value
    }

    pub fn write_u16(&self, value: u16) {
        unsafe {
            core::arch::asm!(
                "out dx, ax",
                in("dx") self.0,
                in("ax") value,
                options(nomem, nostack, preserves_flags),
            );
        }
    }

    pub fn read_u16(&self) -> u16 {
        let value: u16;
        unsafe {
            core::arch::asm!(
                "in ax, dx",
                out("ax") value,
                in("dx") self.0,
                options(nomem, nostack, preserves_flags),
            );
        }
        value
    }
}

/// The real IO bus
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub struct X86PortIo {
    _private: (),
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl X86PortIo {
    /// # Safety
    ///
    /// Must run at a privilege level allowed to execute `in` / `out`, and the
    /// caller takes responsibility for whatever the ports it touches control.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl PortIo for X86PortIo {
    fn read_u8(&mut self, port: u16) -> u8 {
        Port::new(port).read_u8()
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        Port::new(port).write_u8(value)
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        Port::new(port).read_u16()
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        Port::new(port).write_u16(value)
    }
}
