//! Editing session: applies edits to a [`Document`] and keeps the change log in step.
//!
//! Every mutation records its change in the [`UndoList`] and then applies it inside one
//! document update batch, so the log and the text never disagree. Undo and redo replay whole
//! blocks (all items sharing a change number).

use crate::coords::{BufferCoord, CharPos};
use crate::document::Document;
use crate::error::EditError;
use crate::line_ending::split_lines;
use crate::options::UndoLimits;
use crate::undo::{ChangeReason, RedoList, SelectionMode, UndoItem, UndoList};
use std::sync::Arc;

/// A document plus its undo/redo history and caret.
#[derive(Debug)]
pub struct EditSession {
    document: Arc<Document>,
    undo: UndoList,
    redo: RedoList,
    caret: BufferCoord,
}

impl EditSession {
    pub fn new(document: Arc<Document>) -> Self {
        Self::with_limits(document, UndoLimits::default())
    }

    pub fn with_limits(document: Arc<Document>, limits: UndoLimits) -> Self {
        Self {
            document,
            undo: UndoList::new(limits),
            redo: RedoList::new(),
            caret: BufferCoord::default(),
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn undo_list(&self) -> &UndoList {
        &self.undo
    }

    pub fn undo_list_mut(&mut self) -> &mut UndoList {
        &mut self.undo
    }

    pub fn redo_list(&self) -> &RedoList {
        &self.redo
    }

    pub fn caret(&self) -> BufferCoord {
        self.caret
    }

    /// Move the caret, recording the previous position.
    pub fn set_caret(&mut self, caret: BufferCoord) -> Result<(), EditError> {
        self.check_position(caret)?;
        let previous = self.caret;
        self.record(ChangeReason::Caret, previous, previous, Vec::new());
        self.caret = caret;
        Ok(())
    }

    /// Insert `text` (which may contain line breaks) at `at`. Returns the end of the inserted
    /// text, where the caret is placed.
    ///
    /// Inserting into an empty document first creates its only line.
    pub fn insert_text(&mut self, at: BufferCoord, text: &str) -> Result<BufferCoord, EditError> {
        self.check_position(at)?;
        let segments: Vec<String> = split_lines(text)
            .into_iter()
            .map(|(line, _)| line.to_string())
            .collect();
        let end = insert_end(at, &segments);
        self.record(ChangeReason::Insert, at, end, segments.clone());
        apply_insert(&self.document, at, &segments);
        self.caret = end;
        Ok(end)
    }

    /// Delete the text between `start` and `end`. Returns the removed text, lines joined with
    /// `'\n'`.
    pub fn delete_range(
        &mut self,
        start: BufferCoord,
        end: BufferCoord,
    ) -> Result<String, EditError> {
        self.check_position(start)?;
        self.check_position(end)?;
        if end < start {
            return Err(EditError::InvalidRange { start, end });
        }
        let removed = read_range(&self.document, start, end);
        if start != end {
            self.record(ChangeReason::Delete, start, end, removed.clone());
            apply_delete(&self.document, start, end);
        }
        self.caret = start;
        Ok(removed.join("\n"))
    }

    /// Replace the whole text of line `line`.
    pub fn replace_line(&mut self, line: usize, text: &str) -> Result<(), EditError> {
        let Some(previous) = self.document.line(line) else {
            return Err(EditError::InvalidPosition { line, ch: 0 });
        };
        let start = BufferCoord::new(line, 0);
        let end = BufferCoord::new(line, previous.chars().count());
        self.record(ChangeReason::ReplaceLine, start, end, vec![previous]);
        self.document.put_line(line, text);
        Ok(())
    }

    /// Group the following changes into one undoable action. Blocks nest.
    pub fn begin_block(&mut self) {
        self.undo.begin_block();
    }

    pub fn end_block(&mut self) {
        self.undo.end_block();
    }

    /// Keep the next change from being merged with the previous one.
    pub fn add_group_break(&mut self) {
        self.undo.add_group_break();
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.redo.can_redo()
    }

    /// Whether the text changed since [`Self::mark_saved`] (or since the session started).
    pub fn is_modified(&self) -> bool {
        !self.undo.initial_state()
    }

    /// Mark the current history position as the saved one.
    pub fn mark_saved(&mut self) {
        self.undo.set_initial_state();
    }

    /// Drop all history.
    pub fn clear_history(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Undo the newest action. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        if !self.undo.can_undo() {
            return false;
        }
        while self.undo.last_change_reason() == ChangeReason::GroupBreak {
            if let Some(item) = self.undo.pop_item() {
                self.redo.add_redo(item);
            }
        }
        let Some(change_number) = self.undo.peek_item().map(UndoItem::change_number) else {
            return false;
        };

        let document = Arc::clone(&self.document);
        let _batch = document.batch();
        let mut replayed = 0usize;
        while self
            .undo
            .peek_item()
            .is_some_and(|item| item.change_number() == change_number)
        {
            let Some(item) = self.undo.pop_item() else {
                break;
            };
            let item = self.revert(item);
            self.redo.add_redo(item);
            replayed += 1;
        }
        tracing::trace!(change_number, replayed, "undo");
        true
    }

    /// Redo the newest undone action. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(change_number) = self.redo.peek_item().map(UndoItem::change_number) else {
            return false;
        };

        let document = Arc::clone(&self.document);
        let _batch = document.batch();
        self.undo.set_inside_redo(true);
        let mut replayed = 0usize;
        while self
            .redo
            .peek_item()
            .is_some_and(|item| item.change_number() == change_number)
        {
            let Some(item) = self.redo.pop_item() else {
                break;
            };
            let item = self.reapply(item);
            self.undo.restore_change(item);
            replayed += 1;
        }
        while self.redo.last_change_reason() == ChangeReason::GroupBreak {
            if let Some(item) = self.redo.pop_item() {
                self.undo.restore_change(item);
            }
        }
        self.undo.set_inside_redo(false);
        tracing::trace!(change_number, replayed, "redo");
        true
    }

    fn record(
        &mut self,
        reason: ChangeReason,
        start: BufferCoord,
        end: BufferCoord,
        text: Vec<String>,
    ) {
        if !self.undo.inside_redo() {
            self.redo.clear();
        }
        self.undo
            .add_change(reason, start, end, text, SelectionMode::Normal);
    }

    /// Undo one item; returns the item to push on the redo list.
    fn revert(&mut self, item: UndoItem) -> UndoItem {
        match item.reason() {
            ChangeReason::Insert => {
                apply_delete(&self.document, item.start(), item.end());
                self.caret = item.start();
                item
            }
            ChangeReason::Delete => {
                apply_insert(&self.document, item.start(), item.text());
                self.caret = item.end();
                item
            }
            ChangeReason::ReplaceLine | ChangeReason::Caret => self.swap(item),
            _ => item,
        }
    }

    /// Redo one item; returns the item to push back on the undo list.
    fn reapply(&mut self, item: UndoItem) -> UndoItem {
        match item.reason() {
            ChangeReason::Insert => {
                apply_insert(&self.document, item.start(), item.text());
                self.caret = item.end();
                item
            }
            ChangeReason::Delete => {
                apply_delete(&self.document, item.start(), item.end());
                self.caret = item.start();
                item
            }
            ChangeReason::ReplaceLine | ChangeReason::Caret => self.swap(item),
            _ => item,
        }
    }

    /// Restore the state recorded in a self-inverse item and return an item recording the
    /// state it replaced.
    fn swap(&mut self, item: UndoItem) -> UndoItem {
        let (start, end, text) = match item.reason() {
            ChangeReason::Caret => {
                let current = self.caret;
                self.caret = item.start();
                (current, current, Vec::new())
            }
            _ => {
                let line = item.start().line;
                let current = self.document.line(line).unwrap_or_default();
                let restored = item.text().first().map_or("", String::as_str);
                self.document.put_line(line, restored);
                let end = BufferCoord::new(line, current.chars().count());
                (item.start(), end, vec![current])
            }
        };
        UndoItem::new(
            item.reason(),
            item.selection_mode(),
            start,
            end,
            text,
            item.change_number(),
        )
    }

    fn check_position(&self, at: BufferCoord) -> Result<(), EditError> {
        let invalid = EditError::InvalidPosition {
            line: at.line,
            ch: at.ch.get(),
        };
        if self.document.is_empty() {
            return if at == BufferCoord::default() {
                Ok(())
            } else {
                Err(invalid)
            };
        }
        match self.document.line(at.line) {
            Some(text) if at.ch.get() <= text.chars().count() => Ok(()),
            _ => Err(invalid),
        }
    }
}

fn byte_offset(text: &str, ch: CharPos) -> usize {
    text.char_indices()
        .nth(ch.get())
        .map_or(text.len(), |(byte, _)| byte)
}

/// End position of `segments` inserted at `at`.
fn insert_end(at: BufferCoord, segments: &[String]) -> BufferCoord {
    let last = segments.last().map_or(0, |line| line.chars().count());
    match segments.len() {
        0 | 1 => BufferCoord::new(at.line, at.ch.get() + last),
        n => BufferCoord::new(at.line + n - 1, last),
    }
}

fn apply_insert(document: &Document, at: BufferCoord, segments: &[String]) {
    let _batch = document.batch();
    if document.is_empty() {
        document.add_line("");
    }
    let line = document.line(at.line).unwrap_or_default();
    let (head, tail) = line.split_at(byte_offset(&line, at.ch));
    match segments {
        [] => {}
        [only] => document.put_line(at.line, &format!("{head}{only}{tail}")),
        [first, middle @ .., last] => {
            document.put_line(at.line, &format!("{head}{first}"));
            document.insert_strings(at.line + 1, middle);
            document.insert_line(at.line + 1 + middle.len(), &format!("{last}{tail}"));
        }
    }
}

fn apply_delete(document: &Document, start: BufferCoord, end: BufferCoord) {
    let _batch = document.batch();
    let first = document.line(start.line).unwrap_or_default();
    let head = &first[..byte_offset(&first, start.ch)];
    if start.line == end.line {
        let tail = &first[byte_offset(&first, end.ch)..];
        document.put_line(start.line, &format!("{head}{tail}"));
        return;
    }
    let last = document.line(end.line).unwrap_or_default();
    let tail = &last[byte_offset(&last, end.ch)..];
    document.put_line(start.line, &format!("{head}{tail}"));
    document.delete_lines(start.line + 1, end.line - start.line);
}

fn read_range(document: &Document, start: BufferCoord, end: BufferCoord) -> Vec<String> {
    (start.line..=end.line)
        .map(|line| {
            let text = document.line(line).unwrap_or_default();
            let from = if line == start.line {
                byte_offset(&text, start.ch)
            } else {
                0
            };
            let to = if line == end.line {
                byte_offset(&text, end.ch)
            } else {
                text.len()
            };
            text[from..to.max(from)].to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session(text: &str) -> EditSession {
        EditSession::new(Arc::new(Document::from_text(text)))
    }

    fn at(line: usize, ch: usize) -> BufferCoord {
        BufferCoord::new(line, ch)
    }

    #[test]
    fn test_insert_single_and_multi_line() {
        let mut s = session("hello world");
        assert_eq!(s.insert_text(at(0, 5), ",").unwrap(), at(0, 6));
        assert_eq!(s.document().text(), "hello, world");

        let end = s.insert_text(at(0, 6), "\nbig\n").unwrap();
        assert_eq!(end, at(2, 0));
        assert_eq!(s.document().contents(), vec!["hello,", "big", " world"]);
        assert_eq!(s.caret(), end);
    }

    #[test]
    fn test_insert_into_empty_document() {
        let mut s = EditSession::new(Arc::new(Document::new()));
        s.insert_text(at(0, 0), "a\nb").unwrap();
        assert_eq!(s.document().contents(), vec!["a", "b"]);
        assert_eq!(
            s.insert_text(at(5, 0), "x"),
            Err(EditError::InvalidPosition { line: 5, ch: 0 })
        );
    }

    #[test]
    fn test_delete_range_returns_removed_text() {
        let mut s = session("one\ntwo\nthree");
        let removed = s.delete_range(at(0, 1), at(2, 2)).unwrap();
        assert_eq!(removed, "ne\ntwo\nth");
        assert_eq!(s.document().contents(), vec!["oree"]);
        assert_eq!(
            s.delete_range(at(0, 3), at(0, 1)),
            Err(EditError::InvalidRange {
                start: at(0, 3),
                end: at(0, 1)
            })
        );
    }

    #[test]
    fn test_undo_redo_inverse() {
        let mut s = session("alpha\nbeta");
        s.insert_text(at(1, 4), "\ngamma").unwrap();
        s.delete_range(at(0, 0), at(0, 2)).unwrap();
        s.replace_line(1, "BETA").unwrap();
        assert_eq!(s.document().contents(), vec!["pha", "BETA", "gamma"]);

        assert!(s.undo());
        assert_eq!(s.document().contents(), vec!["pha", "beta", "gamma"]);
        assert!(s.undo());
        assert!(s.undo());
        assert_eq!(s.document().contents(), vec!["alpha", "beta"]);
        assert!(!s.undo());

        assert!(s.redo());
        assert!(s.redo());
        assert!(s.redo());
        assert_eq!(s.document().contents(), vec!["pha", "BETA", "gamma"]);
        assert!(!s.redo());
    }

    #[test]
    fn test_block_undoes_as_one_action() {
        let mut s = session("x");
        s.begin_block();
        s.insert_text(at(0, 1), "1").unwrap();
        s.insert_text(at(0, 2), "2").unwrap();
        s.replace_line(0, "block").unwrap();
        s.end_block();
        s.insert_text(at(0, 5), "!").unwrap();

        assert!(s.undo());
        assert_eq!(s.document().text(), "block");
        assert!(s.undo());
        assert_eq!(s.document().text(), "x");
        assert!(s.redo());
        assert_eq!(s.document().text(), "block");
    }

    #[test]
    fn test_group_breaks_travel_with_history() {
        let mut s = session("");
        s.insert_text(at(0, 0), "a").unwrap();
        s.add_group_break();
        s.insert_text(at(0, 1), "b").unwrap();

        assert!(s.undo());
        assert!(s.undo());
        assert_eq!(s.document().text(), "");
        assert!(s.redo());
        assert_eq!(s.undo_list().last_change_reason(), ChangeReason::GroupBreak);
        assert!(s.redo());
        assert_eq!(s.document().text(), "ab");
    }

    #[test]
    fn test_new_change_clears_redo() {
        let mut s = session("abc");
        s.insert_text(at(0, 3), "d").unwrap();
        s.undo();
        assert!(s.can_redo());
        s.insert_text(at(0, 0), "z").unwrap();
        assert!(!s.can_redo());
    }

    #[test]
    fn test_caret_is_restored() {
        let mut s = session("abc\ndef");
        s.set_caret(at(1, 2)).unwrap();
        s.set_caret(at(0, 1)).unwrap();
        s.undo();
        assert_eq!(s.caret(), at(1, 2));
        s.redo();
        assert_eq!(s.caret(), at(0, 1));
        assert!(s.set_caret(at(0, 9)).is_err());
    }

    #[test]
    fn test_modified_tracking() {
        let mut s = session("abc");
        assert!(!s.is_modified());
        s.insert_text(at(0, 0), "x").unwrap();
        assert!(s.is_modified());
        s.mark_saved();
        assert!(!s.is_modified());
        s.undo();
        assert!(s.is_modified());
        s.redo();
        assert!(!s.is_modified());
    }
}
