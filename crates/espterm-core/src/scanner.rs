//! Incremental marker scanner for the device byte stream.
//!
//! ESP firmware frames an exception dump between two occurrences of
//! [`MARKER`]. Serial reads deliver the stream in arbitrary chunks, so the
//! marker can be split across any number of reads; [`PatternScanner`] keeps
//! the matched-prefix length between calls to [`PatternScanner::feed`].

/// Marker line printed by the ESP core around an exception dump
pub const MARKER: &[u8] = b"--------------- CUT HERE FOR EXCEPTION DECODER ---------------";

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Result of feeding a chunk to the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanResult {
    /// The marker did not complete inside this chunk
    NoMatch,

    /// The marker completed; `offset` is the index just past its last byte
    /// within the chunk that was fed
    Matched { offset: usize },
}

// ─────────────────────────────────────────────────────────────────────────────
// Scanner
// ─────────────────────────────────────────────────────────────────────────────

/// Byte-by-byte matcher for a fixed pattern across an unbounded stream.
///
/// The automaton is deliberately naive: a mismatching byte resets the
/// matched prefix to zero without any failure-function fallback, and the
/// mismatching byte is not re-tested against the first pattern byte.
#[derive(Debug, Clone)]
pub struct PatternScanner {
    pattern: &'static [u8],
    matched: usize,
}

impl PatternScanner {
    /// Create a scanner for [`MARKER`]
    pub fn new() -> Self {
        Self::with_pattern(MARKER)
    }

    /// Create a scanner for an arbitrary non-empty pattern
    pub fn with_pattern(pattern: &'static [u8]) -> Self {
        assert!(!pattern.is_empty(), "pattern must not be empty");
        Self {
            pattern,
            matched: 0,
        }
    }

    /// The pattern this scanner looks for
    pub fn pattern(&self) -> &'static [u8] {
        self.pattern
    }

    /// Number of pattern bytes matched so far, carried across chunks
    pub fn matched_prefix_len(&self) -> usize {
        self.matched
    }

    /// Scan `chunk`, stopping at the first completed match.
    ///
    /// Bytes after a match are left to the caller and are not scanned in
    /// this call; the scanner starts from an empty prefix afterwards.
    pub fn feed(&mut self, chunk: &[u8]) -> ScanResult {
        for (i, &byte) in chunk.iter().enumerate() {
            if byte == self.pattern[self.matched] {
                self.matched += 1;
                if self.matched == self.pattern.len() {
                    self.matched = 0;
                    return ScanResult::Matched { offset: i + 1 };
                }
            } else {
                self.matched = 0;
            }
        }
        ScanResult::NoMatch
    }
}

impl Default for PatternScanner {
    fn default() -> Self {
        Self::new()
    }
}
