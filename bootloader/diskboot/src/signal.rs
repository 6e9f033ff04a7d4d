//! Failure side-channel. Emulators and debug harnesses watch this port; no
//! software ever reads it back.

use crate::port::PortIo;

pub const FAILURE_PORT: u16 = 0x8a00;

/// Written to `FAILURE_PORT` in this order
pub const FAILURE_SEQUENCE: [u16; 2] = [0x8a00, 0x8e00];

pub fn signal_failure<P: PortIo>(io: &mut P) {
    for value in FAILURE_SEQUENCE {
        io.write_u16(FAILURE_PORT, value);
    }
}
