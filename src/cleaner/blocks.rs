//! Block segmenter: re-splits a `.ma` byte stream into logical records.
//!
//! A block is a header line (no leading whitespace) followed by every
//! continuation line (leading whitespace) up to the next header. Lines are
//! right-trimmed and blank lines are dropped before any of this happens, so a
//! blank line never starts or ends a block.
//!
//! ```
//! use scene_vaccine_sweeper::cleaner::blocks::segment_bytes;
//!
//! let blocks = segment_bytes(b"createNode transform;\n\tsetAttr \".v\" no;\n\nrequires maya;\n");
//! assert_eq!(blocks.len(), 2);
//! assert_eq!(blocks[0].as_bytes(), b"createNode transform;\n\tsetAttr \".v\" no;");
//! assert_eq!(blocks[1].header(), b"requires maya;");
//! ```

use std::io::{self, BufRead};
use std::iter::FusedIterator;

use memchr::memmem;

/// One logical record: header plus continuation lines, joined by `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    bytes: Vec<u8>,
    line_count: usize,
}

impl Block {
    /// Joined form; never ends with a newline.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// First line of the block. For a stream that starts with continuation
    /// lines this is itself an indented line.
    pub fn header(&self) -> &[u8] {
        self.lines().next().unwrap_or_default()
    }

    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        self.bytes.split(|b| *b == b'\n')
    }

    /// Substring search over the joined bytes, so a needle spanning a line
    /// boundary (`...\n  ...`) is found as well.
    pub fn contains(&self, needle: &[u8]) -> bool {
        memmem::find(&self.bytes, needle).is_some()
    }
}

/// Whitespace as understood by the format: ASCII space, tab, LF, CR, VT, FF.
const fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn trimmed_len(line: &[u8]) -> usize {
    line.iter().rposition(|b| !is_space(*b)).map_or(0, |i| i + 1)
}

/// Lazy, single-pass block iterator over any buffered reader.
///
/// Yields `Err` once if the underlying reader fails, then stops. To start
/// over, reopen the source and build a new reader.
pub struct BlockReader<R> {
    reader: R,
    line: Vec<u8>,
    pending: Vec<u8>,
    pending_lines: usize,
    done: bool,
}

impl<R: BufRead> BlockReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::with_capacity(256),
            pending: Vec::new(),
            pending_lines: 0,
            done: false,
        }
    }

    fn take_block(&mut self) -> Option<Block> {
        if self.pending_lines == 0 {
            return None;
        }
        Some(Block {
            bytes: std::mem::take(&mut self.pending),
            line_count: std::mem::replace(&mut self.pending_lines, 0),
        })
    }

    fn push_line(&mut self, len: usize) {
        if self.pending_lines > 0 {
            self.pending.push(b'\n');
        }
        self.pending.extend_from_slice(&self.line[..len]);
        self.pending_lines += 1;
    }
}

impl<R: BufRead> Iterator for BlockReader<R> {
    type Item = io::Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => {
                    self.done = true;
                    return self.take_block().map(Ok);
                }
                Ok(_) => {
                    let len = trimmed_len(&self.line);
                    if len == 0 {
                        continue;
                    }
                    let completed = if is_space(self.line[0]) {
                        None
                    } else {
                        self.take_block()
                    };
                    self.push_line(len);
                    if let Some(block) = completed {
                        return Some(Ok(block));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<R: BufRead> FusedIterator for BlockReader<R> {}

/// Segment an in-memory buffer.
pub fn segment_bytes(data: &[u8]) -> Vec<Block> {
    BlockReader::new(data).map_while(Result::ok).collect()
}
