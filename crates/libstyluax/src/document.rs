use serde::{Deserialize, Serialize};

/// A zero-based line/character position. Characters are counted in Unicode
/// scalar values, the way editor hosts count them, not in bytes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Position { line, character }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Range { start, end }
    }
}

/// A replacement of the text covered by `range` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(range: Range, new_text: impl Into<String>) -> Self {
        TextEdit {
            range,
            new_text: new_text.into(),
        }
    }
}

/// Host-side view of an open buffer: random-access text extraction by
/// position range.
pub trait Document {
    /// Full text of the document.
    fn text(&self) -> &str;

    /// Number of lines. An empty document has one empty line.
    fn line_count(&self) -> usize;

    /// Text of a line, without its line break.
    fn line(&self, line: usize) -> &str;

    /// Extract the text covered by `range`. Positions are clamped to the
    /// document.
    fn text_in_range(&self, range: Range) -> String;
}

/// Convert a position within a document to a byte offset.
///
/// Hosts index positions in characters while stylua addresses ranges in
/// bytes; the two disagree as soon as any preceding character encodes to
/// more than one byte. Extracts the text from the document start to the
/// position and measures its UTF-8 length, so this is O(position) per call.
pub fn byte_offset(document: &dyn Document, position: Position) -> usize {
    document
        .text_in_range(Range::new(Position::default(), position))
        .len()
}

/// The range spanning the entire document.
pub fn full_range(document: &dyn Document) -> Range {
    let last = document.line_count().saturating_sub(1);
    let end = Position::new(last, document.line(last).chars().count());
    Range::new(Position::default(), end)
}

/// An in-memory document buffer; the `Document` used by the CLI driver and
/// tests. Line spans are byte ranges into `text`, excluding line breaks.
pub struct TextBuffer {
    text: String,
    lines: Vec<std::ops::Range<usize>>,
}

impl TextBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut lines = Vec::new();
        let mut start = 0;
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                let mut end = i;
                if end > start && text.as_bytes()[end - 1] == b'\r' {
                    end -= 1;
                }
                lines.push(start..end);
                start = i + 1;
            }
        }
        lines.push(start..text.len());
        TextBuffer { text, lines }
    }

    /// Byte index of a position, clamped to the line and document bounds.
    fn position_to_byte(&self, position: Position) -> usize {
        let Some(span) = self.lines.get(position.line) else {
            return self.text.len();
        };
        let line = &self.text[span.clone()];
        let mut offset = span.start;
        for (i, ch) in line.chars().enumerate() {
            if i == position.character {
                return offset;
            }
            offset += ch.len_utf8();
        }
        offset
    }

    /// Apply a set of edits to the buffer. Edits are applied in reverse
    /// start-position order so earlier offsets stay valid.
    pub fn apply(&mut self, edits: &[TextEdit]) {
        let mut edits: Vec<&TextEdit> = edits.iter().collect();
        edits.sort_by(|a, b| b.range.start.cmp(&a.range.start));
        for edit in edits {
            let start = self.position_to_byte(edit.range.start);
            let end = self.position_to_byte(edit.range.end).max(start);
            self.text.replace_range(start..end, &edit.new_text);
        }
        *self = TextBuffer::new(std::mem::take(&mut self.text));
    }
}

impl Document for TextBuffer {
    fn text(&self) -> &str {
        &self.text
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, line: usize) -> &str {
        self.lines
            .get(line)
            .map(|span| &self.text[span.clone()])
            .unwrap_or("")
    }

    fn text_in_range(&self, range: Range) -> String {
        let start = self.position_to_byte(range.start);
        let end = self.position_to_byte(range.end).max(start);
        self.text[start..end].to_string()
    }
}
