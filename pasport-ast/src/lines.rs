#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// A line/column position. Both are 1-based; `0:0` marks an unknown position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl LineCol {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Maps byte offsets of one source text to line/column positions.
#[derive(Clone, Debug)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts: Vec<usize> = Vec::new();
        line_starts.push(0);
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_col(&self, offset: usize) -> LineCol {
        let off = offset.min(self.len);

        // Find the last line start <= off.
        let line_idx = match self.line_starts.binary_search(&off) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };

        let line_start = self.line_starts.get(line_idx).copied().unwrap_or(0);
        let col0 = off.saturating_sub(line_start);

        LineCol {
            line: u32::try_from(line_idx + 1).unwrap_or(u32::MAX),
            column: u32::try_from(col0 + 1).unwrap_or(u32::MAX),
        }
    }

    pub fn span(&self, start: usize, end: usize) -> crate::Span {
        crate::Span {
            start: self.line_col(start),
            end: self.line_col(end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_map_to_one_based_positions() {
        let idx = LineIndex::new("unit A;\ninterface\n\nend.");
        assert_eq!(idx.line_col(0), LineCol::new(1, 1));
        assert_eq!(idx.line_col(5), LineCol::new(1, 6));
        assert_eq!(idx.line_col(8), LineCol::new(2, 1));
        assert_eq!(idx.line_col(18), LineCol::new(3, 1));
        assert_eq!(idx.line_col(19), LineCol::new(4, 1));
    }

    #[test]
    fn offsets_past_the_end_clamp() {
        let idx = LineIndex::new("ab");
        assert_eq!(idx.line_col(100), LineCol::new(1, 3));
    }
}
