// text.rs — Versioned text buffer for position tracking
//
// A CRDT-flavoured piece log that lets the source rewriter insert text while
// retaining a mapping from any offset in the rewritten buffer back to the
// original pre-edit coordinates. Every edit is tagged with a logical author
// id; author 0 owns the original content. Positions anchor to (author,
// author-local offset) pairs, which stay stable no matter how many edits
// other authors apply afterwards.
//
// Deletions tombstone their pieces rather than removing them, so anchors
// into deleted content resolve to the tombstone's position.
//
// Preconditions: indices are byte offsets on UTF-8 boundaries.
// Postconditions: `text()` is the concatenation of live pieces in order.
// Failure modes: none (out-of-range indices clamp to the buffer end).
// Side effects: none outside `&mut self`.

use serde::Serialize;
use std::collections::HashMap;

/// Logical author of an edit. Author 0 is reserved for the original text.
pub type AuthorId = u32;

/// The author id that seeds the buffer.
pub const ORIGINAL_AUTHOR: AuthorId = 0;

/// Per-author count of inserted bytes. Two vectors compare piecewise; a
/// piece exists "at" a vector when its author-local range is below the
/// author's counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionVector(HashMap<AuthorId, u64>);

impl VersionVector {
    pub fn get(&self, author: AuthorId) -> u64 {
        self.0.get(&author).copied().unwrap_or(0)
    }

    fn bump(&mut self, author: AuthorId, bytes: u64) {
        *self.0.entry(author).or_insert(0) += bytes;
    }
}

/// A stable reference to a position: `offset` bytes into everything
/// `author` has ever inserted, in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub author: AuthorId,
    pub offset: u64,
}

#[derive(Debug, Clone)]
struct Piece {
    author: AuthorId,
    /// Author-local byte offset of this piece's first byte.
    start: u64,
    text: String,
    deleted: bool,
}

impl Piece {
    fn len(&self) -> u64 {
        self.text.len() as u64
    }

    fn visible_len(&self) -> usize {
        if self.deleted {
            0
        } else {
            self.text.len()
        }
    }
}

/// The versioned buffer: an ordered piece log plus the version vector.
#[derive(Debug, Clone)]
pub struct VersionedText {
    pieces: Vec<Piece>,
    version: VersionVector,
}

impl VersionedText {
    /// Seed a buffer with the original content, owned by author 0.
    pub fn new(original: &str) -> Self {
        let mut version = VersionVector::default();
        let mut pieces = Vec::new();
        if !original.is_empty() {
            version.bump(ORIGINAL_AUTHOR, original.len() as u64);
            pieces.push(Piece {
                author: ORIGINAL_AUTHOR,
                start: 0,
                text: original.to_string(),
                deleted: false,
            });
        }
        Self { pieces, version }
    }

    /// Current visible text.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.len());
        for piece in &self.pieces {
            if !piece.deleted {
                out.push_str(&piece.text);
            }
        }
        out
    }

    /// Current visible length in bytes.
    pub fn len(&self) -> usize {
        self.pieces.iter().map(Piece::visible_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the current version vector.
    pub fn version(&self) -> &VersionVector {
        &self.version
    }

    /// Insert `text` at visible byte `index` on behalf of `author`.
    ///
    /// When `index` lands on a piece boundary the new piece goes before any
    /// existing inserted content at that boundary, so a later insertion at
    /// the same original offset nests inside an earlier one.
    pub fn insert(&mut self, author: AuthorId, index: usize, text: &str) -> Anchor {
        let start = self.version.get(author);
        let anchor = Anchor {
            author,
            offset: start,
        };
        if text.is_empty() {
            return anchor;
        }
        let piece = Piece {
            author,
            start,
            text: text.to_string(),
            deleted: false,
        };
        self.version.bump(author, text.len() as u64);

        let mut visible = 0usize;
        for i in 0..self.pieces.len() {
            let end = visible + self.pieces[i].visible_len();
            if index <= visible && !self.pieces[i].deleted {
                self.pieces.insert(i, piece);
                return anchor;
            }
            if index < end {
                // Split the containing piece.
                let tail = self.split_off(i, index - visible);
                self.pieces.insert(i + 1, tail);
                self.pieces.insert(i + 1, piece);
                return anchor;
            }
            visible = end;
        }
        self.pieces.push(piece);
        anchor
    }

    /// Tombstone `len` visible bytes starting at `index`.
    pub fn delete(&mut self, index: usize, len: usize) {
        if len == 0 {
            return;
        }
        let end = index + len;
        // Split first so tombstoning never cuts through a piece. Splits do
        // not change visible coordinates.
        self.split_boundary(index);
        self.split_boundary(end);
        let mut visible = 0usize;
        for piece in &mut self.pieces {
            let piece_len = piece.visible_len();
            let piece_start = visible;
            let piece_end = visible + piece_len;
            if piece_len > 0 && piece_start >= index && piece_end <= end {
                piece.deleted = true;
            }
            visible = piece_end;
        }
    }

    /// Split the piece containing visible offset `at`, if `at` falls
    /// strictly inside one.
    fn split_boundary(&mut self, at: usize) {
        let mut visible = 0usize;
        for i in 0..self.pieces.len() {
            let piece_len = self.pieces[i].visible_len();
            if piece_len > 0 && at > visible && at < visible + piece_len {
                let tail = self.split_off(i, at - visible);
                self.pieces.insert(i + 1, tail);
                return;
            }
            visible += piece_len;
        }
    }

    fn split_off(&mut self, i: usize, at: usize) -> Piece {
        let piece = &mut self.pieces[i];
        let tail_text = piece.text[at..].to_string();
        let tail = Piece {
            author: piece.author,
            start: piece.start + at as u64,
            text: tail_text,
            deleted: piece.deleted,
        };
        piece.text.truncate(at);
        tail
    }

    /// Anchor a current visible byte offset.
    pub fn anchor(&self, index: usize) -> Anchor {
        let mut visible = 0usize;
        let mut last_live: Option<&Piece> = None;
        for piece in &self.pieces {
            let end = visible + piece.visible_len();
            if !piece.deleted {
                if index < end {
                    return Anchor {
                        author: piece.author,
                        offset: piece.start + (index - visible) as u64,
                    };
                }
                last_live = Some(piece);
            }
            visible = end;
        }
        match last_live {
            Some(piece) => Anchor {
                author: piece.author,
                offset: piece.start + piece.len(),
            },
            None => Anchor {
                author: ORIGINAL_AUTHOR,
                offset: 0,
            },
        }
    }

    /// Anchor a byte offset as of a historical `version`, independent of
    /// edits made after that version by other authors.
    ///
    /// Only insert history is replayed; a piece is visible at `version` to
    /// the extent the author's counter covers its range. Returns `None`
    /// when `index` is beyond the buffer length at that version.
    pub fn anchor_at(&self, version: &VersionVector, index: usize) -> Option<Anchor> {
        let mut visible = 0usize;
        for piece in &self.pieces {
            let covered = version.get(piece.author).saturating_sub(piece.start);
            let len_at_version = (piece.len().min(covered)) as usize;
            let end = visible + len_at_version;
            if len_at_version > 0 && index <= end {
                return Some(Anchor {
                    author: piece.author,
                    offset: piece.start + (index - visible) as u64,
                });
            }
            visible = end;
        }
        if index == visible {
            return Some(Anchor {
                author: ORIGINAL_AUTHOR,
                offset: 0,
            });
        }
        None
    }

    /// Resolve an anchor to a current visible byte offset.
    ///
    /// Prefers the left-hand side of a piece boundary: an anchor at the end
    /// of a piece resolves before any content later inserted at that
    /// boundary. Anchors into deleted content resolve to the tombstone's
    /// position.
    pub fn resolve(&self, anchor: Anchor) -> usize {
        let mut visible = 0usize;
        for piece in &self.pieces {
            if piece.author == anchor.author
                && anchor.offset >= piece.start
                && anchor.offset <= piece.start + piece.len()
            {
                if piece.deleted {
                    return visible;
                }
                return visible + (anchor.offset - piece.start) as usize;
            }
            visible += piece.visible_len();
        }
        visible
    }

    /// Map a visible byte offset in the current buffer to the nearest
    /// original (author 0) offset at or to the left of it.
    ///
    /// Offsets inside rewriter-inserted text walk left through the piece
    /// log until original content is found, then report the end of that
    /// original span.
    pub fn resolve_to_original(&self, index: usize) -> u64 {
        let mut visible = 0usize;
        let mut containing = None;
        for (i, piece) in self.pieces.iter().enumerate() {
            let end = visible + piece.visible_len();
            if !piece.deleted && index < end {
                containing = Some((i, index - visible));
                break;
            }
            visible = end;
        }
        let start_at = match containing {
            Some((i, offset)) => {
                let piece = &self.pieces[i];
                if piece.author == ORIGINAL_AUTHOR {
                    return piece.start + offset as u64;
                }
                i
            }
            None => self.pieces.len(),
        };
        for piece in self.pieces[..start_at].iter().rev() {
            if piece.author == ORIGINAL_AUTHOR {
                return piece.start + piece.len();
            }
        }
        0
    }
}

// ── Line/column conversions ──

/// A zero-based (line, column) position. Columns are byte offsets within
/// the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodeLocation {
    pub line: usize,
    pub column: usize,
}

/// Convert a (line, column) location to an absolute byte offset in `text`.
///
/// Exact inverse of [`location_from_index`] for in-bounds locations.
/// Out-of-bounds lines clamp to the end of the text; out-of-bounds columns
/// clamp to the end of the line.
pub fn index_from_location(text: &str, location: CodeLocation) -> usize {
    let mut index = 0usize;
    for (line_no, line) in text.split('\n').enumerate() {
        if line_no == location.line {
            return snap_to_char_boundary(text, index + location.column.min(line.len()));
        }
        index += line.len() + 1;
    }
    text.len()
}

/// Snap `index` down to the nearest char boundary at or before it.
/// Columns are byte offsets, so a caller-supplied column can land inside a
/// multibyte character.
fn snap_to_char_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Convert an absolute byte offset to a (line, column) location in `text`.
pub fn location_from_index(text: &str, index: usize) -> CodeLocation {
    let clamped = snap_to_char_boundary(text, index.min(text.len()));
    let before = &text[..clamped];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    CodeLocation {
        line,
        column: clamped - line_start,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_index_round_trip() {
        let text = "abcdef\nghijfk";
        assert_eq!(index_from_location(text, CodeLocation { line: 1, column: 2 }), 9);
        assert_eq!(index_from_location(text, CodeLocation { line: 1, column: 0 }), 7);
        assert_eq!(
            location_from_index(text, 9),
            CodeLocation { line: 1, column: 2 }
        );
        assert_eq!(
            location_from_index(text, 7),
            CodeLocation { line: 1, column: 0 }
        );
    }

    #[test]
    fn multibyte_indexes_snap_to_char_boundaries() {
        let text = "aé\nbç";
        // Byte 2 is inside `é`; the location snaps back to its start.
        assert_eq!(
            location_from_index(text, 2),
            CodeLocation { line: 0, column: 1 }
        );
        // A column inside `ç` yields the same offset as the char start.
        assert_eq!(
            index_from_location(text, CodeLocation { line: 1, column: 2 }),
            index_from_location(text, CodeLocation { line: 1, column: 1 })
        );
    }

    #[test]
    fn insert_and_read_back() {
        let mut buffer = VersionedText::new("while(true){}");
        buffer.insert(1, 12, "guard();");
        assert_eq!(buffer.text(), "while(true){guard();}");
    }

    #[test]
    fn original_anchor_survives_other_author_edits() {
        let mut buffer = VersionedText::new("abcdef");
        let version = buffer.version().clone();
        let anchor = buffer.anchor_at(&version, 3).expect("in bounds");
        // Another author types at the front.
        buffer.insert(2, 0, "xxxx");
        assert_eq!(buffer.resolve(anchor), 7);
        assert_eq!(anchor.author, ORIGINAL_AUTHOR);
    }

    #[test]
    fn anchor_resolves_left_of_same_boundary_inserts() {
        let mut buffer = VersionedText::new("ab");
        let boundary = buffer.anchor(1);
        buffer.insert(1, 1, "FIRST");
        // A later insertion at the same original boundary lands before the
        // earlier one.
        let index = buffer.resolve(boundary);
        assert_eq!(index, 1);
        buffer.insert(1, index, "second");
        assert_eq!(buffer.text(), "asecondFIRSTb");
    }

    #[test]
    fn resolve_to_original_walks_left_through_insertions() {
        let mut buffer = VersionedText::new("abc");
        buffer.insert(1, 2, "INSERTED");
        // Offsets inside inserted text report the end of the original span
        // to their left.
        for inside in 2..10 {
            assert_eq!(buffer.resolve_to_original(inside), 2);
        }
        assert_eq!(buffer.resolve_to_original(0), 0);
        assert_eq!(buffer.resolve_to_original(10), 2);
        assert_eq!(buffer.resolve_to_original(11), 3);
    }

    #[test]
    fn delete_tombstones_keep_anchors() {
        let mut buffer = VersionedText::new("abcdef");
        let anchor = buffer.anchor(4);
        buffer.delete(2, 3);
        assert_eq!(buffer.text(), "abf");
        // The anchored byte was deleted; it resolves to the tombstone spot.
        assert_eq!(buffer.resolve(anchor), 2);
    }

    #[test]
    fn historical_anchor_ignores_later_inserts() {
        let mut buffer = VersionedText::new("abcdef");
        let v0 = buffer.version().clone();
        buffer.insert(1, 3, "xyz");
        // Index 4 at v0 is 'e', even though the current buffer has "abcxyzdef".
        let anchor = buffer.anchor_at(&v0, 4).expect("in bounds");
        assert_eq!(anchor.author, ORIGINAL_AUTHOR);
        assert_eq!(anchor.offset, 4);
        assert_eq!(buffer.resolve(anchor), 7);
    }

    #[test]
    fn empty_buffer() {
        let buffer = VersionedText::new("");
        assert!(buffer.is_empty());
        assert_eq!(
            buffer.anchor(0),
            Anchor {
                author: ORIGINAL_AUTHOR,
                offset: 0
            }
        );
        assert_eq!(buffer.resolve_to_original(0), 0);
    }
}
