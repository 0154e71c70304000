//! Inline rendering of non-printable bytes as `[XX]`

use std::io::{self, Write};

/// Whether a byte is echoed as-is: printable ASCII, CR or LF
pub fn is_displayable(byte: u8) -> bool {
    matches!(byte, b'\r' | b'\n' | 0x20..=0x7e)
}

/// Write `bytes` to `out`, replacing every non-displayable byte with a
/// bracketed two-digit upper-case hex escape.
pub fn write_escaped<W: Write + ?Sized>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    let mut start = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        if !is_displayable(byte) {
            out.write_all(&bytes[start..i])?;
            write!(out, "[{:02X}]", byte)?;
            start = i + 1;
        }
    }
    out.write_all(&bytes[start..])
}
