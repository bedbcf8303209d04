//! Line formatter
//!
//! The per-character state machine behind line numbering, blank-line
//! squeezing, end-of-line markers, tab markers, and non-printing
//! escapes. Consumes from a [`BufferedChannel`]'s input side and
//! produces into its output side. Counter and blank-run state live here
//! and persist across files within one run.

use crate::channel::{BufferedChannel, ChannelError};
use crate::options::RunOptions;

/// Width of the line-number buffer, counting the trailing tab. An 18
/// digit counter outlives any realistic run.
pub const LINE_COUNTER_WIDTH: usize = 19;

/// Index of the rightmost (least significant) digit cell.
const LAST_DIGIT: usize = LINE_COUNTER_WIDTH - 2;

/// Offset where the print window starts for counts up to 999999.
const INITIAL_PRINT_FROM: usize = LINE_COUNTER_WIDTH - 7;

/// Fixed-width decimal line counter.
///
/// Digits are kept right-aligned as ASCII in a bounded buffer ending in
/// a tab. Incrementing propagates carries leftward, growing the digit
/// span as needed; once every cell is a digit, the leftmost cell is
/// replaced by a `>` overflow marker instead of overrunning the buffer.
/// The print window only ever widens.
pub struct LineCounter {
    buf: [u8; LINE_COUNTER_WIDTH],
    /// Position in `buf` where printing starts.
    print_from: usize,
    /// Position of the first (most significant) digit.
    first_digit: usize,
}

impl LineCounter {
    /// A counter at zero, displayed as the literal digit `0`.
    pub fn new() -> Self {
        let mut buf = [b' '; LINE_COUNTER_WIDTH];
        buf[LAST_DIGIT] = b'0';
        buf[LINE_COUNTER_WIDTH - 1] = b'\t';
        Self {
            buf,
            print_from: INITIAL_PRINT_FROM,
            first_digit: LAST_DIGIT,
        }
    }

    /// Advance to the next line number.
    pub fn advance(&mut self) {
        let mut i = LAST_DIGIT;
        loop {
            if self.buf[i] < b'9' {
                self.buf[i] += 1;
                return;
            }
            self.buf[i] = b'0';
            if i == self.first_digit {
                break;
            }
            i -= 1;
        }
        if self.first_digit > 0 {
            self.first_digit -= 1;
            self.buf[self.first_digit] = b'1';
        } else {
            self.buf[0] = b'>';
        }
        if self.first_digit < self.print_from {
            self.print_from -= 1;
        }
    }

    /// The bytes to emit for the current value: a right-aligned number
    /// followed by a tab.
    pub fn window(&self) -> &[u8] {
        &self.buf[self.print_from..]
    }

    /// A counter with every digit cell at nine, one step from digit
    /// exhaustion.
    #[cfg(test)]
    fn nearly_exhausted() -> Self {
        let mut counter = Self::new();
        for cell in &mut counter.buf[..=LAST_DIGIT] {
            *cell = b'9';
        }
        counter.first_digit = 0;
        counter.print_from = 0;
        counter
    }
}

impl Default for LineCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// How many consecutive newline bytes have just been processed. Drives
/// the squeezing and numbering decisions, and persists across files: a
/// trailing blank line in one file and a leading blank line in the next
/// are seen as consecutive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankRun {
    /// A content span is open; the next newline merely terminates it.
    MidLine,
    /// Start of the stream, or a content line's terminator has been
    /// consumed. A newline here begins a blank line.
    AtLineStart,
    /// Exactly one newline consumed since the last content.
    AfterOneNewline,
    /// Two or more consecutive newlines; saturating. The squeeze option
    /// suppresses further blank lines in this state.
    AfterManyNewlines,
}

impl BlankRun {
    /// State after consuming one more newline byte.
    fn after_newline(self) -> Self {
        match self {
            BlankRun::MidLine => BlankRun::AtLineStart,
            BlankRun::AtLineStart => BlankRun::AfterOneNewline,
            BlankRun::AfterOneNewline | BlankRun::AfterManyNewlines => {
                BlankRun::AfterManyNewlines
            }
        }
    }

    /// Whether the newline that produced this state ended a blank line
    /// (rather than terminating a content span).
    fn ended_blank_line(self) -> bool {
        matches!(self, BlankRun::AfterOneNewline | BlankRun::AfterManyNewlines)
    }
}

/// The formatting engine for one run. Holds the state that must outlive
/// individual files.
pub struct LineFormatter {
    counter: LineCounter,
    blank: BlankRun,
}

impl LineFormatter {
    pub fn new() -> Self {
        Self {
            counter: LineCounter::new(),
            blank: BlankRun::AtLineStart,
        }
    }

    fn emit_line_number(&mut self, channel: &mut BufferedChannel<'_>) {
        self.counter.advance();
        channel.push_slice(self.counter.window());
    }

    /// Copy one source through the channel, applying the formatting
    /// options, until the source is exhausted. Counter and blank-run
    /// state carry over into the next call.
    ///
    /// Read failures abort this file with pending output flushed; write
    /// failures are fatal to the run.
    pub fn format_stream(
        &mut self,
        channel: &mut BufferedChannel<'_>,
        options: &RunOptions,
    ) -> Result<(), ChannelError> {
        let mut ch: u8;
        loop {
            // Newline-run handling: loops for as long as the fetched
            // bytes are newlines, real or sentinel.
            loop {
                channel.flush_full_blocks()?;
                if channel.input_exhausted() {
                    // The last byte taken was the sentinel.
                    match channel.refill() {
                        Ok(0) => {
                            channel.write_pending()?;
                            return Ok(());
                        }
                        Ok(_) => {}
                        Err(err) => {
                            if matches!(err, ChannelError::Read(_)) {
                                channel.write_pending()?;
                            }
                            return Err(err);
                        }
                    }
                } else {
                    // A real newline byte.
                    self.blank = self.blank.after_newline();
                    if self.blank.ended_blank_line() {
                        if self.blank == BlankRun::AfterManyNewlines
                            && options.squeeze_blank
                        {
                            // Swallow the repeated blank line entirely.
                            ch = channel.take_byte();
                            if ch == b'\n' {
                                continue;
                            }
                            break;
                        }
                        if options.number && !options.number_nonblank {
                            self.emit_line_number(channel);
                        }
                    }
                    if options.show_ends {
                        channel.push(b'$');
                    }
                    channel.push(b'\n');
                }
                ch = channel.take_byte();
                if ch != b'\n' {
                    break;
                }
            }

            // Start of a content span. A refill mid-line lands here with
            // the blank-run state still `MidLine`, so continuation bytes
            // of an interrupted line are never renumbered.
            if self.blank != BlankRun::MidLine && options.number {
                self.emit_line_number(channel);
            }

            if options.show_nonprinting {
                loop {
                    match ch {
                        32..=126 => channel.push(ch),
                        127 => channel.push_slice(b"^?"),
                        128..=255 => {
                            channel.push_slice(b"M-");
                            let low = ch - 128;
                            if low >= 32 {
                                if low < 127 {
                                    channel.push(low);
                                } else {
                                    channel.push_slice(b"^?");
                                }
                            } else {
                                channel.push(b'^');
                                channel.push(low + 64);
                            }
                        }
                        b'\t' if !options.show_tabs => channel.push(b'\t'),
                        b'\n' => {
                            self.blank = BlankRun::MidLine;
                            break;
                        }
                        _ => {
                            channel.push(b'^');
                            channel.push(ch + 64);
                        }
                    }
                    ch = channel.take_byte();
                }
            } else {
                loop {
                    if ch == b'\t' && options.show_tabs {
                        channel.push_slice(b"^I");
                    } else if ch != b'\n' {
                        if ch == b'\r' && channel.peek_byte() == b'\n' && options.show_ends {
                            // Render the CR of a CRLF pair as ^M so the $
                            // lands after it, not before.
                            channel.push_slice(b"^M");
                        } else {
                            channel.push(ch);
                        }
                    } else {
                        self.blank = BlankRun::MidLine;
                        break;
                    }
                    ch = channel.take_byte();
                }
            }
        }
    }
}

impl Default for LineFormatter {
    fn default() -> Self {
        Self::new()
    }
}
