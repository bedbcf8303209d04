//! flipcat CLI
//!
//! Upside down concatenate FILE(s) to standard output. Without any
//! formatting option, ASCII letters are rendered as lookalike flipped
//! glyphs; with one, the classic line-formatting behaviors apply
//! instead.

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use flipcat::{Pipeline, RunOptions, Sink, Source};

#[derive(Parser, Debug)]
#[command(name = "flipcat")]
#[command(version)]
#[command(about = "Upside down concatenate FILE(s) to standard output")]
#[command(after_help = "With no FILE, or when FILE is -, read standard input.\n\n\
Examples:\n  flipcat f - g  Output f's contents, then standard input, then g's contents.\n  \
flipcat        Copy standard input to standard output.")]
struct Cli {
    /// Equivalent to -vET
    #[arg(short = 'A', long = "show-all")]
    show_all: bool,

    /// Number nonempty output lines, overrides -n
    #[arg(short = 'b', long = "number-nonblank")]
    number_nonblank: bool,

    /// Equivalent to -vE
    #[arg(short = 'e')]
    show_ends_nonprinting: bool,

    /// Display $ at end of each line
    #[arg(short = 'E', long = "show-ends")]
    show_ends: bool,

    /// Number all output lines
    #[arg(short = 'n', long = "number")]
    number: bool,

    /// Suppress repeated empty output lines
    #[arg(short = 's', long = "squeeze-blank")]
    squeeze_blank: bool,

    /// Equivalent to -vT
    #[arg(short = 't')]
    show_tabs_nonprinting: bool,

    /// Display TAB characters as ^I
    #[arg(short = 'T', long = "show-tabs")]
    show_tabs: bool,

    /// (ignored)
    #[arg(short = 'u')]
    unbuffered: bool,

    /// Use ^ and M- notation, except for LFD and TAB
    #[arg(short = 'v', long = "show-nonprinting")]
    show_nonprinting: bool,

    /// Files to concatenate; - means standard input
    files: Vec<String>,
}

impl Cli {
    /// Expand the combination options into the six core switches.
    fn run_options(&self) -> RunOptions {
        RunOptions {
            number: self.number,
            number_nonblank: self.number_nonblank,
            squeeze_blank: self.squeeze_blank,
            show_ends: self.show_ends | self.show_ends_nonprinting | self.show_all,
            show_tabs: self.show_tabs | self.show_tabs_nonprinting | self.show_all,
            show_nonprinting: self.show_nonprinting
                | self.show_ends_nonprinting
                | self.show_tabs_nonprinting
                | self.show_all,
        }
        .normalized()
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // -u is accepted for compatibility; output is always unbuffered.
    let _ = cli.unbuffered;

    let mut sink = Sink::stdout().context("standard output")?;

    let names = if cli.files.is_empty() {
        vec!["-".to_string()]
    } else {
        cli.files.clone()
    };

    // Files that fail to open are reported and skipped, like any other
    // per-file failure.
    let mut ok = true;
    let mut sources = Vec::new();
    for name in &names {
        match Source::open(name) {
            Ok(source) => sources.push(source),
            Err(err) => {
                eprintln!("flipcat: {}: {}", name, err);
                ok = false;
            }
        }
    }

    let mut pipeline = Pipeline::new(cli.run_options());
    match pipeline.run(sources, &mut sink) {
        Ok(failures) => {
            for failure in &failures {
                eprintln!("flipcat: {}", failure);
            }
            ok &= failures.is_empty();
        }
        Err(err) => {
            eprintln!("flipcat: {}", err);
            return Ok(ExitCode::FAILURE);
        }
    }

    sink.writer.flush().context("write error")?;

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
