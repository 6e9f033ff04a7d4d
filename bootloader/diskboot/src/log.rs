//! Debug output over COM1. Only compiled in with the `trace` feature; in a
//! normal build the macros format nothing and the boot sector stays silent.

use core::fmt;

#[cfg(all(feature = "trace", any(target_arch = "x86", target_arch = "x86_64")))]
mod serial {
    use core::fmt::{self, Write};

    use crate::port::Port;

    const COM1: u16 = 0x3f8;
    const STATUS_TRANSMIT_BUFFER_EMPTY: u8 = 1 << 5;

    static SERIAL: spin::Once<SerialPort> = spin::Once::new();

    pub struct SerialPort {
        /// Writing to data sends to the transmit buffer
        data: Port,
        interrupt_enable: Port,
        fifo_control: Port,
        /// Determines the behavior and format of data on the wire
        line_control: Port,
        modem_control: Port,
        line_status: Port,
    }

    impl SerialPort {
        pub const fn new(base_port: u16) -> Self {
            Self {
                data: Port::new(base_port),
                interrupt_enable: Port::new(base_port + 1),
                fifo_control: Port::new(base_port + 2),
                line_control: Port::new(base_port + 3),
                modem_control: Port::new(base_port + 4),
                line_status: Port::new(base_port + 5),
            }
        }

        pub fn init(&self) {
            // nothing is serviced during boot
            self.interrupt_enable.write_u8(0);

            // Enable divisor latch access, allowing the baud rate to be changed
            self.line_control.write_u8(0x80);
            self.data.write_u8(0x03); // 115200 / 3 = 38,400 baud
            self.interrupt_enable.write_u8(0);

            // 8 bits, no parity, 1 stop bit
            self.line_control.write_u8(0x03);
            self.fifo_control.write_u8(0xc7);
            self.modem_control.write_u8(0x03);
        }

        pub fn send_byte(&self, byte: u8) {
            while (self.line_status.read_u8() & STATUS_TRANSMIT_BUFFER_EMPTY) == 0 {}
            self.data.write_u8(byte);
        }
    }

    struct Writer<'a>(&'a SerialPort);

    impl Write for Writer<'_> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            for byte in s.bytes() {
                self.0.send_byte(byte);
            }
            Ok(())
        }
    }

    pub fn write(args: fmt::Arguments) {
        let port = SERIAL.call_once(|| {
            let port = SerialPort::new(COM1);
            port.init();
            port
        });
        // the UART cannot fail a write, it can only stall
        let _ = Writer(port).write_fmt(args);
    }
}

pub fn _bprint(args: fmt::Arguments) {
    #[cfg(all(feature = "trace", any(target_arch = "x86", target_arch = "x86_64")))]
    serial::write(args);
    #[cfg(not(all(feature = "trace", any(target_arch = "x86", target_arch = "x86_64"))))]
    let _ = args;
}

#[macro_export]
macro_rules! bprint {
    ($($arg:tt)*) => ($crate::log::_bprint(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! bprintln {
    () => ($crate::bprint!("\n"));
    ($($arg:tt)*) => ($crate::bprint!("{}\n", format_args!($($arg)*)));
}

/// Prefixes every line with a fixed-width colored tag, so output from the
/// loader can be told apart from whatever the kernel prints later on the
/// same port.
pub struct TaggedLogger {
    tag: [u8; 8],
    color: u8,
}

impl TaggedLogger {
    pub const fn new(tag_str: &str, color: u8) -> Self {
        let tag_bytes = tag_str.as_bytes();
        let mut tag = [0x20u8; 8];
        let copy_len = if tag_bytes.len() < 8 {
            tag_bytes.len()
        } else {
            8
        };
        // copy from slice is not const stable yet
        let mut i = 0;
        while i < copy_len {
            tag[i] = tag_bytes[i];
            i += 1;
        }
        TaggedLogger { tag, color }
    }

    pub fn tag(&self) -> &str {
        core::str::from_utf8(&self.tag).unwrap_or("????????")
    }

    pub fn log(&self, args: fmt::Arguments) {
        bprint!("\x1b[{}m{}\x1b[0m: ", self.color, self.tag());
        _bprint(args);
        bprint!("\n");
    }
}

#[cfg(test)]
mod tests {
    use super::TaggedLogger;

    #[test]
    fn tags_are_padded_and_truncated() {
        assert_eq!(TaggedLogger::new("BOOT", 36).tag(), "BOOT    ");
        assert_eq!(TaggedLogger::new("SEGMENTLOADER", 36).tag(), "SEGMENTL");
    }
}
