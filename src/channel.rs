//! Buffered input/output channel
//!
//! Owns the bounded buffer pair the line formatter works on: a
//! sentinel-terminated input buffer filled one block at a time, and an
//! output buffer sized for the worst-case escape expansion so the
//! formatter never needs a bounds check mid-scan.

use std::io::{self, Read, Write};

use crate::format::LINE_COUNTER_WIDTH;

/// Fallback transfer size when a descriptor reports no preferred I/O
/// size, and the floor applied to the sizes it does report.
pub const DEFAULT_BLOCK_SIZE: usize = 128 * 1024;

/// An I/O failure, tagged with the side it happened on. Read failures
/// abort only the current file; write failures abort the whole run.
#[derive(Debug)]
pub enum ChannelError {
    Read(io::Error),
    Write(io::Error),
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelError::Read(err) => write!(f, "read error: {}", err),
            ChannelError::Write(err) => write!(f, "write error: {}", err),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelError::Read(err) | ChannelError::Write(err) => Some(err),
        }
    }
}

/// One `read` call into `buf`, retried on EINTR.
pub fn read_block(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Block-buffered pipe between one source and the sink.
///
/// The input buffer holds one extra cell past the filled region, always
/// set to a newline, so scanning loops can treat end-of-buffer and a
/// real newline uniformly. The output side accumulates bytes until at
/// least one full block is pending, then flushes block-sized chunks.
pub struct BufferedChannel<'a> {
    reader: &'a mut dyn Read,
    writer: &'a mut dyn Write,
    /// Raw descriptor of the reader, when one exists, for the input
    /// readiness probe.
    reader_fd: Option<i32>,
    insize: usize,
    outsize: usize,
    inbuf: Vec<u8>,
    outbuf: Vec<u8>,
    /// Next unread input byte. Starts past `in_end` to force a fill.
    in_pos: usize,
    /// Index of the sentinel cell, i.e. the number of valid input bytes.
    in_end: usize,
    /// Number of pending output bytes.
    out_len: usize,
    probe_input: bool,
}

impl<'a> BufferedChannel<'a> {
    /// Worst-case output capacity for the formatter, given the two
    /// block sizes.
    ///
    /// Pending output is flushed when the input buffer empties or a
    /// newline appears, leaving at most `outsize - 1` bytes behind; a
    /// full input block may then expand fourfold (`M-^X` notation),
    /// and a line number may be emitted first.
    pub fn formatter_capacity(insize: usize, outsize: usize) -> usize {
        outsize - 1 + insize * 4 + LINE_COUNTER_WIDTH
    }

    /// Build a channel over an already open source/sink pair. `insize`
    /// and `outsize` are the preferred transfer sizes of the two sides.
    pub fn new(
        reader: &'a mut dyn Read,
        writer: &'a mut dyn Write,
        reader_fd: Option<i32>,
        insize: usize,
        outsize: usize,
    ) -> Self {
        Self {
            reader,
            writer,
            reader_fd,
            insize,
            outsize,
            inbuf: vec![0; insize + 1],
            outbuf: vec![0; Self::formatter_capacity(insize, outsize)],
            in_pos: 1,
            in_end: 0,
            out_len: 0,
            probe_input: true,
        }
    }

    /// True once the sentinel has been consumed: the next `take_byte`
    /// needs a refill first.
    #[inline]
    pub fn input_exhausted(&self) -> bool {
        self.in_pos > self.in_end
    }

    /// Consume the next input byte. The sentinel keeps this in bounds
    /// for exactly one call past the valid region.
    #[inline]
    pub fn take_byte(&mut self) -> u8 {
        let byte = self.inbuf[self.in_pos];
        self.in_pos += 1;
        byte
    }

    /// Look at the next unread byte without consuming it.
    #[inline]
    pub fn peek_byte(&self) -> u8 {
        self.inbuf[self.in_pos]
    }

    /// Read the next block, reset the input cursor, and re-append the
    /// sentinel newline. Returns the number of bytes read; zero is end
    /// of file.
    pub fn fill(&mut self) -> Result<usize, ChannelError> {
        let n = read_block(self.reader, &mut self.inbuf[..self.insize])
            .map_err(ChannelError::Read)?;
        self.in_end = n;
        self.inbuf[n] = b'\n';
        self.in_pos = 0;
        Ok(n)
    }

    /// Refill the input buffer, flushing pending output first unless
    /// more input is already waiting. Batching writes while the source
    /// keeps data coming is a throughput heuristic only; platforms
    /// without the readiness probe always flush before reading.
    pub fn refill(&mut self) -> Result<usize, ChannelError> {
        if !self.input_ready().unwrap_or(false) {
            self.write_pending()?;
        }
        self.fill()
    }

    /// Whether the source has input available without blocking. `None`
    /// when the platform or descriptor does not support the probe.
    fn input_ready(&mut self) -> Option<bool> {
        #[cfg(unix)]
        {
            if !self.probe_input {
                return None;
            }
            let fd = self.reader_fd?;
            let mut pending: libc::c_int = 0;
            let rc = unsafe { libc::ioctl(fd, libc::FIONREAD, &mut pending) };
            if rc < 0 {
                // Pipes and special files reject FIONREAD on some
                // systems; fall back to always-flush-before-read.
                self.probe_input = false;
                return None;
            }
            Some(pending != 0)
        }
        #[cfg(not(unix))]
        {
            let _ = self.reader_fd;
            self.probe_input = false;
            None
        }
    }

    /// Append one byte to the pending output.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.outbuf[self.out_len] = byte;
        self.out_len += 1;
    }

    /// Append a short byte sequence to the pending output.
    pub fn push_slice(&mut self, bytes: &[u8]) {
        self.outbuf[self.out_len..self.out_len + bytes.len()].copy_from_slice(bytes);
        self.out_len += bytes.len();
    }

    /// Number of pending output bytes.
    pub fn pending(&self) -> usize {
        self.out_len
    }

    /// While at least one full block is pending, write block-sized
    /// chunks, then move the remainder to the buffer start. At most
    /// `outsize - 1` bytes stay behind.
    pub fn flush_full_blocks(&mut self) -> Result<(), ChannelError> {
        if self.out_len < self.outsize {
            return Ok(());
        }
        let mut wp = 0;
        while self.out_len - wp >= self.outsize {
            self.writer
                .write_all(&self.outbuf[wp..wp + self.outsize])
                .map_err(ChannelError::Write)?;
            wp += self.outsize;
        }
        self.outbuf.copy_within(wp..self.out_len, 0);
        self.out_len -= wp;
        Ok(())
    }

    /// Write out whatever has accumulated, down to empty.
    pub fn write_pending(&mut self) -> Result<(), ChannelError> {
        if self.out_len > 0 {
            self.writer
                .write_all(&self.outbuf[..self.out_len])
                .map_err(ChannelError::Write)?;
            self.out_len = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn channel<'a>(
        reader: &'a mut Cursor<Vec<u8>>,
        writer: &'a mut Vec<u8>,
        insize: usize,
        outsize: usize,
    ) -> BufferedChannel<'a> {
        BufferedChannel::new(reader, writer, None, insize, outsize)
    }

    #[test]
    fn test_new_channel_forces_initial_fill() {
        let mut reader = Cursor::new(b"ab".to_vec());
        let mut writer = Vec::new();
        let ch = channel(&mut reader, &mut writer, 4, 4);
        assert!(ch.input_exhausted());
    }

    #[test]
    fn test_fill_appends_sentinel_newline() {
        let mut reader = Cursor::new(b"ab".to_vec());
        let mut writer = Vec::new();
        let mut ch = channel(&mut reader, &mut writer, 4, 4);
        assert_eq!(ch.fill().unwrap(), 2);
        assert_eq!(ch.take_byte(), b'a');
        assert_eq!(ch.take_byte(), b'b');
        assert!(!ch.input_exhausted());
        // The sentinel itself reads as a newline, then the buffer is dry.
        assert_eq!(ch.take_byte(), b'\n');
        assert!(ch.input_exhausted());
    }

    #[test]
    fn test_fill_at_eof_returns_zero() {
        let mut reader = Cursor::new(Vec::new());
        let mut writer = Vec::new();
        let mut ch = channel(&mut reader, &mut writer, 4, 4);
        assert_eq!(ch.fill().unwrap(), 0);
    }

    #[test]
    fn test_flush_full_blocks_leaves_remainder() {
        let mut reader = Cursor::new(Vec::new());
        let mut writer = Vec::new();
        let mut ch = channel(&mut reader, &mut writer, 4, 4);
        ch.push_slice(b"abcdefghij"); // two full blocks + 2 bytes
        ch.flush_full_blocks().unwrap();
        assert_eq!(ch.pending(), 2);
        ch.write_pending().unwrap();
        assert_eq!(ch.pending(), 0);
        drop(ch);
        assert_eq!(writer, b"abcdefghij");
    }

    #[test]
    fn test_flush_below_one_block_is_a_no_op() {
        let mut reader = Cursor::new(Vec::new());
        let mut writer = Vec::new();
        let mut ch = channel(&mut reader, &mut writer, 4, 4);
        ch.push_slice(b"abc");
        ch.flush_full_blocks().unwrap();
        assert_eq!(ch.pending(), 3);
        drop(ch);
        assert!(writer.is_empty());
    }

    #[test]
    fn test_formatter_capacity_formula() {
        assert_eq!(
            BufferedChannel::formatter_capacity(8, 4),
            4 - 1 + 8 * 4 + LINE_COUNTER_WIDTH
        );
    }

    #[test]
    fn test_peek_sees_next_unread_byte() {
        let mut reader = Cursor::new(b"xy".to_vec());
        let mut writer = Vec::new();
        let mut ch = channel(&mut reader, &mut writer, 4, 4);
        ch.fill().unwrap();
        assert_eq!(ch.peek_byte(), b'x');
        assert_eq!(ch.take_byte(), b'x');
        assert_eq!(ch.peek_byte(), b'y');
    }
}
