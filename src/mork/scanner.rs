//! Single-character lookahead over the in-memory Mork buffer.

/// Cursor over the raw Mork bytes.
///
/// `next` yields one byte at a time and never re-reads; `None` is the end
/// sentinel. Positions are byte offsets into the original buffer, used for
/// error reporting and for the column-marker lookbehind in the dictionary
/// decoder.
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Consume and return the next byte, or `None` once exhausted.
    pub fn next(&mut self) -> Option<u8> {
        let b = self.data.get(self.pos).copied();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    /// Peek at the next byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Byte offset of the next unread byte.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Whether the buffer contains `pat` starting at absolute offset `at`.
    pub fn matches_at(&self, at: usize, pat: &[u8]) -> bool {
        self.data.get(at..at + pat.len()) == Some(pat)
    }

    /// Skip `n` bytes forward (saturating at end of buffer).
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.data.len());
    }
}

/// Mork whitespace: space, tab, carriage return, line feed, form feed.
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c')
}
