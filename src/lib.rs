//! # flipcat
//!
//! A streaming text-transformation pipeline in the shape of `cat`: it
//! copies one or more byte streams to a single output stream, applying
//! one of two mutually exclusive behaviors.
//!
//! ## Upside-down transcoding
//!
//! With no formatting option active, every ASCII letter is replaced by
//! a lookalike "flipped" Unicode glyph:
//!
//! ```text
//! hello  ->  ɥǝʃʃo
//! ```
//!
//! Every other byte, including bytes of pre-existing multibyte
//! sequences, is copied through unchanged.
//!
//! ## Line formatting
//!
//! With any formatting option active the letters pass through verbatim
//! and the classic line-oriented behaviors apply instead: line
//! numbering, non-blank-only numbering, blank-line squeezing, `$`
//! end-of-line markers, `^I` tab markers, and `^`/`M-` escaping of
//! non-printing bytes.
//!
//! ## Structure
//!
//! - [`glyph`]: the fixed lookup tables and the UTF-8 lead classifier
//! - [`transcode`]: the two-pass block transform over the tables
//! - [`channel`]: bounded buffer pair with sentinel-terminated input
//! - [`format`]: the per-character formatting state machine
//! - [`pipeline`]: per-file orchestration and outcome aggregation
//! - [`options`]: the immutable per-run switches
//!
//! Processing is strictly sequential: files are copied one at a time in
//! the order given, and the formatter's counter and blank-run state
//! carry across file boundaries within a run.

pub mod channel;
pub mod format;
pub mod glyph;
pub mod options;
pub mod pipeline;
pub mod transcode;

pub use channel::{BufferedChannel, ChannelError, DEFAULT_BLOCK_SIZE};
pub use format::{BlankRun, LineCounter, LineFormatter};
pub use glyph::EncodingError;
pub use options::RunOptions;
pub use pipeline::{FatalError, FileError, FileFailure, FileId, Pipeline, Sink, Source};
pub use transcode::flip_block;
