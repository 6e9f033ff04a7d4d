//! Boot sector payload. The assembly prelude that runs first enables
//! protected mode with flat segments, sets up a stack below 0x7c00, and calls
//! `bootmain`. From here the kernel image is read from sector 1 onward and
//! started.

#![no_std]
#![no_main]

use diskboot::ata::AtaPio;
use diskboot::boot::{finish, Bootloader};
use diskboot::layout::BootLayout;
use diskboot::memory::{IdentityMapped, PhysicalAddress};
use diskboot::port::X86PortIo;

#[no_mangle]
pub extern "C" fn bootmain() -> ! {
    // SAFETY: we are alone on the machine, in ring 0, with paging off. The
    // kernel image is linked to land clear of this sector and its stack.
    let disk = AtaPio::primary(unsafe { X86PortIo::new() });
    let memory = unsafe { IdentityMapped::new() };

    let mut loader = Bootloader::new(disk, memory, BootLayout::PC);
    let handoff = loader.run();
    let (disk, _) = loader.into_parts();
    let mut io = disk.into_inner();

    match finish(handoff, &mut io) {
        Some(entry) => unsafe { enter_kernel(entry) },
        None => loop {},
    }
}

/// Transfer control to the loaded image. Nothing comes back.
unsafe fn enter_kernel(entry: PhysicalAddress) -> ! {
    let kernel_start: extern "C" fn() -> ! =
        core::mem::transmute(entry.as_u32() as usize as *const ());
    kernel_start()
}

#[panic_handler]
pub fn panic(info: &core::panic::PanicInfo) -> ! {
    diskboot::bprintln!("PANIC {}", info);

    loop {}
}
