// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Text buffer with a single char-indexed cursor
//!
//! Cursor positions count chars, not bytes, so multi-byte text moves the
//! cursor one step per visible character.

/// Byte offset of the `index`-th char, or `text.len()` past the end.
pub fn byte_offset(text: &str, index: usize) -> usize {
    text.char_indices()
        .nth(index)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

/// Number of chars in `text[..byte]`.
pub fn char_index(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    text: String,
    // Invariant: cursor <= char count of text
    cursor: usize,
    len: usize,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Moves the cursor, clamping it to the end of the text.
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.len);
    }

    /// Inserts `s` at the cursor and moves the cursor past it.
    pub fn insert(&mut self, s: &str) {
        let at = byte_offset(&self.text, self.cursor);
        self.text.insert_str(at, s);
        let added = s.chars().count();
        self.len += added;
        self.cursor += added;
    }

    pub fn insert_char(&mut self, c: char) {
        let at = byte_offset(&self.text, self.cursor);
        self.text.insert(at, c);
        self.len += 1;
        self.cursor += 1;
    }

    /// Deletes up to `count` chars before the cursor, returning how many went.
    pub fn delete_before(&mut self, count: usize) -> usize {
        let count = count.min(self.cursor);
        if count == 0 {
            return 0;
        }
        let start = byte_offset(&self.text, self.cursor - count);
        let end = byte_offset(&self.text, self.cursor);
        self.text.replace_range(start..end, "");
        self.len -= count;
        self.cursor -= count;
        count
    }

    /// Replaces the whole text, pulling the cursor back if it now overhangs.
    pub fn replace(&mut self, text: String) {
        self.len = text.chars().count();
        self.text = text;
        self.cursor = self.cursor.min(self.len);
    }
}
