//! Byte/character offset conversion and context snippets.
//!
//! Regex engines and tokenizers report byte offsets; entities carry
//! character offsets so they line up with what a reviewer sees.

/// Byte → character offset lookup for one source text.
pub struct CharIndex<'a> {
    text: &'a str,
    /// Byte offset of every character boundary, plus `text.len()`.
    boundaries: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        Self { text, boundaries }
    }

    /// Number of characters in the source.
    pub fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Character offset of a byte offset. Offsets inside a multi-byte
    /// character round down to that character.
    pub fn char_offset(&self, byte: usize) -> usize {
        match self.boundaries.binary_search(&byte) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    /// Byte offset of a character offset (clamped to the text end).
    pub fn byte_offset(&self, chr: usize) -> usize {
        self.boundaries[chr.min(self.char_len())]
    }

    /// Substring by character range.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.byte_offset(start)..self.byte_offset(end)]
    }

    /// Up to `radius` characters either side of `[start, end)`.
    pub fn context(&self, start: usize, end: usize, radius: usize) -> String {
        let from = start.saturating_sub(radius);
        let to = (end + radius).min(self.char_len());
        self.slice(from, to).to_string()
    }
}

/// Characters of context kept either side of a detection.
pub const CONTEXT_RADIUS: usize = 20;
