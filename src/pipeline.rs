//! Run orchestration
//!
//! Drives a whole run over an ordered list of already open sources:
//! picks the transcoder or formatter path from the options, sizes the
//! buffers from each side's preferred block size, guards against a
//! source being the same regular file as the sink, and folds per-file
//! outcomes into one run-level result.

use std::fs::File;
use std::io::{self, Read, Write};

use crate::channel::{read_block, BufferedChannel, ChannelError, DEFAULT_BLOCK_SIZE};
use crate::format::LineFormatter;
use crate::glyph::EncodingError;
use crate::options::RunOptions;
use crate::transcode::flip_block;

/// Device and inode pair identifying a regular file for the same-file
/// guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileId {
    pub device: u64,
    pub inode: u64,
}

/// One input stream handed to the run, already open. `-` conventionally
/// names standard input.
pub struct Source {
    /// Display name for diagnostics.
    pub name: String,
    pub reader: Box<dyn Read>,
    /// Preferred read size for this descriptor.
    pub block_size: usize,
    /// Identity of the underlying regular file, when there is one.
    pub id: Option<FileId>,
    /// Whether the descriptor's read position is before its end.
    pub has_unread: bool,
    /// Raw Unix descriptor backing `reader`, for the readiness probe.
    pub fd: Option<i32>,
}

/// The single output stream for the run.
pub struct Sink {
    pub writer: Box<dyn Write>,
    /// Preferred write size for this descriptor.
    pub block_size: usize,
    /// Identity when the sink is a regular file; enables the same-file
    /// guard.
    pub id: Option<FileId>,
}

/// Why one source failed. The run continues past these.
#[derive(Debug)]
pub enum FileError {
    /// Reading the source failed.
    Read(io::Error),
    /// The source is the same nonempty regular file as the sink;
    /// copying it onto itself would only exhaust the output device.
    InputIsOutput,
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileError::Read(err) => write!(f, "{}", err),
            FileError::InputIsOutput => write!(f, "input file is output file"),
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::Read(err) => Some(err),
            FileError::InputIsOutput => None,
        }
    }
}

/// One recovered per-file failure, reported back to the caller's
/// diagnostics layer.
#[derive(Debug)]
pub struct FileFailure {
    pub name: String,
    pub error: FileError,
}

impl std::fmt::Display for FileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.error)
    }
}

/// Failures that abort the whole run immediately. Continuing past a
/// sink failure would silently truncate output.
#[derive(Debug)]
pub enum FatalError {
    Write(io::Error),
    Encoding(EncodingError),
}

impl std::fmt::Display for FatalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FatalError::Write(err) => write!(f, "write error: {}", err),
            FatalError::Encoding(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for FatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FatalError::Write(err) => Some(err),
            FatalError::Encoding(err) => Some(err),
        }
    }
}

enum CopyError {
    File(FileError),
    Fatal(FatalError),
}

impl From<ChannelError> for CopyError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Read(err) => CopyError::File(FileError::Read(err)),
            ChannelError::Write(err) => CopyError::Fatal(FatalError::Write(err)),
        }
    }
}

/// Orchestrates one run. Formatter state is shared across files, so a
/// blank run or line count spans file boundaries; the transcoder path
/// reuses one buffer across files.
pub struct Pipeline {
    options: RunOptions,
    formatter: LineFormatter,
    flip_buf: Vec<u8>,
}

impl Pipeline {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options: options.normalized(),
            formatter: LineFormatter::new(),
            flip_buf: Vec::new(),
        }
    }

    /// Copy every source to the sink, in order, one at a time. Output
    /// for each file is fully flushed before the next file is read.
    ///
    /// Returns the recovered per-file failures; an empty list means the
    /// whole run succeeded. Write and encoding failures abort the run.
    pub fn run(
        &mut self,
        sources: Vec<Source>,
        sink: &mut Sink,
    ) -> Result<Vec<FileFailure>, FatalError> {
        let mut failures = Vec::new();
        for mut source in sources {
            match self.copy_one(&mut source, sink) {
                Ok(()) => {}
                Err(CopyError::File(error)) => failures.push(FileFailure {
                    name: source.name.clone(),
                    error,
                }),
                Err(CopyError::Fatal(error)) => return Err(error),
            }
        }
        Ok(failures)
    }

    fn copy_one(&mut self, source: &mut Source, sink: &mut Sink) -> Result<(), CopyError> {
        if let (Some(source_id), Some(sink_id)) = (source.id, sink.id) {
            if source_id == sink_id && source.has_unread {
                return Err(CopyError::File(FileError::InputIsOutput));
            }
        }

        let outsize = sink.block_size;
        if !self.options.any_format() {
            let insize = source.block_size.max(outsize);
            if self.flip_buf.len() < insize {
                self.flip_buf.resize(insize, 0);
            }
            loop {
                let n = read_block(source.reader.as_mut(), &mut self.flip_buf[..insize])
                    .map_err(|err| CopyError::File(FileError::Read(err)))?;
                if n == 0 {
                    return Ok(());
                }
                let block = flip_block(&self.flip_buf[..n])
                    .map_err(|err| CopyError::Fatal(FatalError::Encoding(err)))?;
                sink.writer
                    .write_all(&block)
                    .map_err(|err| CopyError::Fatal(FatalError::Write(err)))?;
            }
        } else {
            let mut channel = BufferedChannel::new(
                source.reader.as_mut(),
                sink.writer.as_mut(),
                source.fd,
                source.block_size,
                outsize,
            );
            self.formatter.format_stream(&mut channel, &self.options)?;
            Ok(())
        }
    }
}

/// Preferred transfer size for a descriptor, floored at the default.
#[cfg(unix)]
fn io_block_size(metadata: &std::fs::Metadata) -> usize {
    use std::os::unix::fs::MetadataExt;
    (metadata.blksize() as usize).max(DEFAULT_BLOCK_SIZE)
}

#[cfg(not(unix))]
fn io_block_size(_metadata: &std::fs::Metadata) -> usize {
    DEFAULT_BLOCK_SIZE
}

#[cfg(unix)]
fn file_id(metadata: &std::fs::Metadata) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    metadata.is_file().then(|| FileId {
        device: metadata.dev(),
        inode: metadata.ino(),
    })
}

#[cfg(not(unix))]
fn file_id(_metadata: &std::fs::Metadata) -> Option<FileId> {
    None
}

/// Advise the kernel that `fd` will be read sequentially. Best effort.
#[cfg(target_os = "linux")]
fn advise_sequential(fd: i32) {
    unsafe {
        libc::posix_fadvise(fd, 0, 0, libc::POSIX_FADV_SEQUENTIAL);
    }
}

#[cfg(not(target_os = "linux"))]
fn advise_sequential(_fd: i32) {}

impl Source {
    /// Open a named input, `-` meaning standard input. Captures the
    /// descriptor's preferred block size and its identity for the
    /// same-file guard.
    pub fn open(name: &str) -> io::Result<Source> {
        if name == "-" {
            return Source::stdin();
        }
        let mut file = File::open(name)?;
        let metadata = file.metadata()?;
        let id = file_id(&metadata);
        let has_unread = id.is_some() && {
            use std::io::Seek;
            file.stream_position()? < metadata.len()
        };
        let block_size = io_block_size(&metadata);
        let fd = raw_fd(&file);
        if let Some(fd) = fd {
            advise_sequential(fd);
        }
        Ok(Source {
            name: name.to_string(),
            reader: Box::new(file),
            block_size,
            id,
            has_unread,
            fd,
        })
    }

    /// Standard input as a source. May be used several times in one
    /// run; each use continues from the current offset.
    pub fn stdin() -> io::Result<Source> {
        #[cfg(unix)]
        {
            let stat = fd_stat(libc::STDIN_FILENO)?;
            let is_regular = stat.st_mode & libc::S_IFMT == libc::S_IFREG;
            let id = is_regular.then(|| FileId {
                device: stat.st_dev as u64,
                inode: stat.st_ino as u64,
            });
            let has_unread = id.is_some() && {
                let pos = unsafe { libc::lseek(libc::STDIN_FILENO, 0, libc::SEEK_CUR) };
                pos >= 0 && pos < stat.st_size as i64
            };
            let block_size = (stat.st_blksize as usize).max(DEFAULT_BLOCK_SIZE);
            Ok(Source {
                name: "-".to_string(),
                reader: Box::new(io::stdin()),
                block_size,
                id,
                has_unread,
                fd: Some(libc::STDIN_FILENO),
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Source {
                name: "-".to_string(),
                reader: Box::new(io::stdin()),
                block_size: DEFAULT_BLOCK_SIZE,
                id: None,
                has_unread: false,
                fd: None,
            })
        }
    }
}

impl Sink {
    /// Standard output as the sink, with its identity captured for the
    /// same-file guard.
    pub fn stdout() -> io::Result<Sink> {
        #[cfg(unix)]
        {
            let stat = fd_stat(libc::STDOUT_FILENO)?;
            let is_regular = stat.st_mode & libc::S_IFMT == libc::S_IFREG;
            Ok(Sink {
                writer: Box::new(io::stdout()),
                block_size: (stat.st_blksize as usize).max(DEFAULT_BLOCK_SIZE),
                id: is_regular.then(|| FileId {
                    device: stat.st_dev as u64,
                    inode: stat.st_ino as u64,
                }),
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Sink {
                writer: Box::new(io::stdout()),
                block_size: DEFAULT_BLOCK_SIZE,
                id: None,
            })
        }
    }
}

#[cfg(unix)]
fn raw_fd(file: &File) -> Option<i32> {
    use std::os::unix::io::AsRawFd;
    Some(file.as_raw_fd())
}

#[cfg(not(unix))]
fn raw_fd(_file: &File) -> Option<i32> {
    None
}

#[cfg(unix)]
fn fd_stat(fd: i32) -> io::Result<libc::stat> {
    let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();
    if unsafe { libc::fstat(fd, stat.as_mut_ptr()) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { stat.assume_init() })
}
