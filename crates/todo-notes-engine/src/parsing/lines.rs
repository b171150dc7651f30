use super::node::Point;

/// Line-oriented view of a document, as provided by an editor buffer.
///
/// Lines are split on `\n`; a text ending in a newline has a final empty line,
/// matching how editors count lines.
pub trait LineSource {
    fn line_count(&self) -> usize;

    /// Text of the 0-indexed `line` without its terminator.
    fn line_at(&self, line: usize) -> Option<&str>;

    /// Length of the 0-indexed `line` in characters, 0 when out of range.
    fn line_len(&self, line: usize) -> usize {
        self.line_at(line).map_or(0, |text| text.chars().count())
    }
}

/// Owned document text with a line start index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    text: String,
    line_starts: Vec<usize>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// 0-indexed line containing byte `offset`. Offsets past the end map to the last line.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        }
    }

    /// Byte offset where the 0-indexed `line` starts.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    pub fn point(&self, offset: usize) -> Point {
        let line = self.line_of(offset);
        Point {
            line: line + 1,
            column: offset - self.line_starts[line],
            offset,
        }
    }

    /// True when only indentation or block quote markers precede `offset` on its line.
    pub fn is_line_start(&self, offset: usize) -> bool {
        let start = self.line_starts[self.line_of(offset)];
        self.text[start..offset]
            .chars()
            .all(|c| c == ' ' || c == '\t' || c == '>')
    }
}

impl LineSource for SourceText {
    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line_at(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map_or(self.text.len(), |next| next - 1);
        let text = &self.text[start..end];
        Some(text.strip_suffix('\r').unwrap_or(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_count_includes_trailing_empty_line() {
        assert_eq!(SourceText::new("a\nb\n").line_count(), 3);
        assert_eq!(SourceText::new("a\nb").line_count(), 2);
        assert_eq!(SourceText::new("").line_count(), 1);
    }

    #[test]
    fn test_line_at_strips_terminators() {
        let source = SourceText::new("first\r\nsecond\n");
        assert_eq!(source.line_at(0), Some("first"));
        assert_eq!(source.line_at(1), Some("second"));
        assert_eq!(source.line_at(2), Some(""));
        assert_eq!(source.line_at(3), None);
    }

    #[test]
    fn test_line_len_counts_characters() {
        let source = SourceText::new("- [ ] café\n");
        assert_eq!(source.line_len(0), 10);
        assert_eq!(source.line_len(5), 0);
    }

    #[test]
    fn test_point_for_offsets() {
        let source = SourceText::new("ab\ncd\n");
        assert_eq!(
            source.point(4),
            Point {
                line: 2,
                column: 1,
                offset: 4
            }
        );
        assert_eq!(source.point(3).line, 2);
        assert_eq!(source.point(2).line, 1);
    }

    #[test]
    fn test_is_line_start_allows_indent_and_quotes() {
        let source = SourceText::new("> - item\n  > [x]: y\ntext [x]");
        assert!(source.is_line_start(0));
        assert!(source.is_line_start(2));
        assert!(source.is_line_start(13));
        assert!(!source.is_line_start(25));
    }
}
