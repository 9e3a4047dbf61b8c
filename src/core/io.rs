//! Text input layer
//!
//! Opens link and BED files that may be plain, gzip or bzip2 compressed.
//! Plain files above [`MMAP_THRESHOLD`] are memory mapped; everything else is
//! read through a large `BufReader`. Records are split on tabs with `memchr`
//! without allocating.

use memchr::memchr;
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Default buffer size for BufReader (128KB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Buffer size for plain files between 10MB and the mmap threshold (1MB)
pub const LARGE_BUFFER_SIZE: usize = 1024 * 1024;

/// Plain files at least this large are memory mapped (100MB)
pub const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Records between progress log lines
pub const LINE_PROGRESS_INTERVAL: usize = 1_000_000;

/// Reader over a plain file, buffered or memory mapped by size
pub enum SmartReader {
    Buffered(BufReader<File>),
    Mapped(MappedReader),
}

/// Memory-mapped file reader
pub struct MappedReader {
    mmap: Mmap,
    position: usize,
}

impl MappedReader {
    pub fn new(file: &File) -> io::Result<Self> {
        // SAFETY: input files are not modified while a map is being loaded
        let mmap = unsafe { Mmap::map(file)? };
        Ok(Self { mmap, position: 0 })
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

impl Read for MappedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.mmap[self.position..];
        let n = buf.len().min(remaining.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

impl BufRead for MappedReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(&self.mmap[self.position..])
    }

    fn consume(&mut self, amt: usize) {
        self.position = (self.position + amt).min(self.mmap.len());
    }
}

impl SmartReader {
    /// Open a plain file, choosing the strategy from its size
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        let file_size = file.metadata()?.len();

        if file_size >= MMAP_THRESHOLD {
            return Ok(SmartReader::Mapped(MappedReader::new(&file)?));
        }

        let capacity = if file_size > 10 * 1024 * 1024 {
            LARGE_BUFFER_SIZE
        } else {
            DEFAULT_BUFFER_SIZE
        };
        Ok(SmartReader::Buffered(BufReader::with_capacity(capacity, file)))
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, SmartReader::Mapped(_))
    }
}

impl Read for SmartReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SmartReader::Buffered(reader) => reader.read(buf),
            SmartReader::Mapped(reader) => reader.read(buf),
        }
    }
}

impl BufRead for SmartReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            SmartReader::Buffered(reader) => reader.fill_buf(),
            SmartReader::Mapped(reader) => reader.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            SmartReader::Buffered(reader) => reader.consume(amt),
            SmartReader::Mapped(reader) => reader.consume(amt),
        }
    }
}

/// Compression format of a text input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Plain text (uncompressed)
    Plain,
    /// Gzip compressed (.gz)
    Gzip,
    /// Bzip2 compressed (.bz2)
    Bzip2,
}

impl CompressionFormat {
    /// Detect format from leading bytes (gzip `1f 8b`, bzip2 `BZh`)
    pub fn from_magic(magic: &[u8]) -> Self {
        if magic.starts_with(&[0x1f, 0x8b]) {
            CompressionFormat::Gzip
        } else if magic.starts_with(b"BZh") {
            CompressionFormat::Bzip2
        } else {
            CompressionFormat::Plain
        }
    }
}

/// Detect compression from the file extension, falling back to magic bytes
pub fn detect_compression<P: AsRef<Path>>(path: P) -> io::Result<CompressionFormat> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => return Ok(CompressionFormat::Gzip),
        Some("bz2") => return Ok(CompressionFormat::Bzip2),
        _ => {}
    }

    let mut file = File::open(path)?;
    let mut magic = [0u8; 3];
    let bytes_read = file.read(&mut magic)?;
    Ok(CompressionFormat::from_magic(&magic[..bytes_read]))
}

/// Open a possibly compressed text file for line reading
pub fn open_text<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let reader: Box<dyn BufRead> = match detect_compression(path)? {
        CompressionFormat::Gzip => {
            let decoder = flate2::read::MultiGzDecoder::new(File::open(path)?);
            Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, decoder))
        }
        CompressionFormat::Bzip2 => {
            let decoder = bzip2::read::BzDecoder::new(File::open(path)?);
            Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, decoder))
        }
        CompressionFormat::Plain => Box::new(SmartReader::open(path)?),
    };
    Ok(reader)
}

/// Zero-copy iterator over the tab-separated fields of one line
///
/// An empty line yields a single empty field, like `str::split`.
pub struct TabFields<'a> {
    line: &'a [u8],
    pos: Option<usize>,
}

impl<'a> TabFields<'a> {
    pub fn new(line: &'a [u8]) -> Self {
        Self { line, pos: Some(0) }
    }
}

impl<'a> Iterator for TabFields<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.pos?;
        match memchr(b'\t', &self.line[start..]) {
            Some(offset) => {
                self.pos = Some(start + offset + 1);
                Some(&self.line[start..start + offset])
            }
            None => {
                self.pos = None;
                Some(&self.line[start..])
            }
        }
    }
}

/// Byte line iterator that reuses one buffer and strips `\n` / `\r\n`
pub struct LineIterator<R: BufRead> {
    reader: R,
    buffer: Vec<u8>,
    line_number: usize,
}

impl<R: BufRead> LineIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(4096),
            line_number: 0,
        }
    }

    /// 1-based number of the line last returned
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next line; `None` at EOF
    pub fn next_line(&mut self) -> Option<io::Result<&[u8]>> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                if self.buffer.last() == Some(&b'\n') {
                    self.buffer.pop();
                    if self.buffer.last() == Some(&b'\r') {
                        self.buffer.pop();
                    }
                }
                Some(Ok(&self.buffer))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// True for lines that carry no record (blank or `#` comment)
pub fn is_skippable(line: &[u8]) -> bool {
    line.iter().all(|b| b.is_ascii_whitespace()) || line.first() == Some(&b'#')
}
