//! Text buffer for the output of the outstanding command.
//!
//! Raw shell bytes are run through a `vte` parser so escape sequences
//! (colours, cursor movement) never reach the patterns. The parser lives as
//! long as the buffer, so a sequence split across two chunks is still
//! stripped correctly.

use regex::Regex;
use vte::{Parser, Perform};

/// Buffer for accumulating decoded output and searching it for patterns.
///
/// Prompt detection only looks at the last `search_depth` bytes, which keeps
/// it cheap when a command prints a lot before the prompt returns.
pub struct PatternBuffer {
    /// Decoded text since the last clear.
    text: String,

    /// Escape-sequence parser, kept across chunks.
    parser: Parser,

    /// How many bytes from the end to search for prompt patterns.
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            text: String::with_capacity(4096),
            parser: Parser::new(),
            search_depth,
        }
    }

    /// Extend the buffer with raw bytes, stripping terminal escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let mut sink = TextSink {
            out: &mut self.text,
        };
        self.parser.advance(&mut sink, data);
    }

    /// Search only the tail of the buffer for the pattern.
    pub fn tail_matches(&self, pattern: &Regex) -> bool {
        pattern.is_match(self.tail())
    }

    /// Check the whole buffer for the pattern.
    pub fn contains(&self, pattern: &Regex) -> bool {
        pattern.is_match(&self.text)
    }

    /// Drop everything up to byte offset `end`.
    ///
    /// Used after a value has been extracted so it is not read twice.
    pub fn consume(&mut self, end: usize) {
        let end = end.min(self.text.len());
        self.text.drain(..end);
    }

    /// Get the buffered text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Get the current buffer length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Clear the buffer. Parser state is kept.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    fn tail(&self) -> &str {
        let mut start = self.text.len().saturating_sub(self.search_depth);
        while !self.text.is_char_boundary(start) {
            start += 1;
        }
        &self.text[start..]
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl std::fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("text", &self.text)
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

/// Collects printable characters and line control, drops everything else.
struct TextSink<'a> {
    out: &'a mut String,
}

impl Perform for TextSink<'_> {
    fn print(&mut self, c: char) {
        self.out.push(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' | b'\r' | b'\t' => self.out.push(byte as char),
            // backspace
            0x08 => {
                self.out.pop();
            }
            _ => {}
        }
    }
}
