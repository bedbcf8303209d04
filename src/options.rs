//! Per-run formatting options

/// Formatting switches for one run, immutable once the run starts.
///
/// When no switch is set the case-flip transcoder handles the copy;
/// setting any switch selects the line formatter instead. The two
/// behaviors never compose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Number all output lines (`-n`).
    pub number: bool,
    /// Number nonempty output lines only; overrides plain numbering (`-b`).
    pub number_nonblank: bool,
    /// Collapse runs of two or more empty lines to one (`-s`).
    pub squeeze_blank: bool,
    /// Display `$` at the end of each line (`-E`).
    pub show_ends: bool,
    /// Display TAB characters as `^I` (`-T`).
    pub show_tabs: bool,
    /// Use `^` and `M-` notation, except for LFD and TAB (`-v`).
    pub show_nonprinting: bool,
}

impl RunOptions {
    /// True when any line-formatting behavior is requested. Decides the
    /// transcoder-vs-formatter path split.
    pub fn any_format(&self) -> bool {
        self.number
            || self.show_ends
            || self.show_nonprinting
            || self.show_tabs
            || self.squeeze_blank
    }

    /// Apply the derived flags: non-blank numbering implies numbering.
    /// The caret combination options (`-e`, `-t`, `-A`) are expanded by
    /// the command-line layer before a `RunOptions` is built.
    pub fn normalized(mut self) -> Self {
        if self.number_nonblank {
            self.number = true;
        }
        self
    }
}
