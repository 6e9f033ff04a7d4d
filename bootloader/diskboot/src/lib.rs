//! First-stage disk loader. Once the earlier stage has entered protected mode
//! and set up a stack, `bootmain` uses this library to pull an ELF kernel off
//! the primary ATA disk and jump into it.
//!
//! Every hardware touchpoint goes through a trait (`PortIo`, `BlockDevice`,
//! `PhysicalMemory`), so the whole boot sequence can also run on a host
//! against emulated hardware.

#![cfg_attr(not(test), no_std)]

#[macro_use]
pub mod log;

pub mod ata;
pub mod boot;
pub mod disk;
pub mod elf;
pub mod error;
pub mod layout;
pub mod memory;
pub mod port;
pub mod segment;
pub mod signal;
