//! The line store.
//!
//! [`Document`] owns an ordered list of lines. Each line caches its glyph/column segmentation
//! (recomputed lazily for the current fonts and tab width) and the [`SyntaxState`] its
//! syntaxer reached at the end of the line.
//!
//! # Incremental highlighting
//!
//! Every line carries a "dirty" flag, set when its text changes, when it is created, or when
//! the state it resumes from may have changed. A non-dirty line's cached state was computed
//! from its current text and the current cached state of the line above. Storing a state
//! that differs from the cached one dirties the next line, so staleness only ever flows
//! forward and stops at the first line whose recomputed state equals its cached state (the
//! fixed point). Every line at or after [`Document::first_stale_line`] is potentially stale.
//!
//! # Thread safety
//!
//! All state lives behind one re-entrant lock. Every public method takes it for its duration,
//! so a writer thread and reader threads can share an `Arc<Document>`. Listeners run with the
//! lock held but without any interior borrow, so they may call back into the document.

use crate::coords::{CharPos, Column, GlyphIndex};
use crate::encoding::{self, Decoded, EncodingHint, TextEncoding};
use crate::error::FileError;
use crate::glyph::{FontMetrics, GlyphMetrics, LineGlyphs, string_columns};
use crate::line_ending::{LineEnding, split_lines};
use crate::options::DocumentOptions;
use crate::syntax::{SyntaxState, Syntaxer, line_end_state};
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::RefCell;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

/// Change notification delivered to [`Document::subscribe`] listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentEvent {
    /// A change (or an update batch) is about to start.
    Changing,
    /// A change (or the outermost update batch) finished.
    Changed,
    /// All lines were removed.
    Cleared,
    /// `count` lines starting at `start` were removed.
    Deleted { start: usize, count: usize },
    /// `count` lines starting at `start` were inserted.
    Inserted { start: usize, count: usize },
    /// `count` lines starting at `start` got new text.
    Putted { start: usize, count: usize },
}

/// Change listener.
pub type DocumentListener = Arc<dyn Fn(&DocumentEvent) + Send + Sync>;

/// Handle returned by [`Document::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone)]
struct Line {
    text: String,
    /// Break that followed this line when it was loaded; `None` means the document default.
    ending: Option<LineEnding>,
    glyphs: Option<LineGlyphs>,
    syntax_state: Option<SyntaxState>,
    syntax_dirty: bool,
}

impl Line {
    fn new(text: impl Into<String>, ending: Option<LineEnding>) -> Self {
        Self {
            text: text.into(),
            ending,
            glyphs: None,
            syntax_state: None,
            syntax_dirty: true,
        }
    }

    fn set_text(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
        self.glyphs = None;
        self.syntax_dirty = true;
    }
}

#[derive(Debug)]
struct DocumentInner {
    lines: Vec<Line>,
    options: DocumentOptions,
    metrics: GlyphMetrics,
    /// Index and width of the widest line, when known.
    longest: Option<(usize, usize)>,
    /// Every line before this index has a clean syntax state.
    clean_prefix: usize,
    update_count: usize,
}

impl DocumentInner {
    fn check_index(&self, index: usize) {
        assert!(
            index < self.lines.len(),
            "line index {index} out of range (count {})",
            self.lines.len()
        );
    }

    fn check_insert_index(&self, index: usize) {
        assert!(
            index <= self.lines.len(),
            "insertion index {index} out of range (count {})",
            self.lines.len()
        );
    }

    fn glyphs(&mut self, index: usize) -> Option<&LineGlyphs> {
        let metrics = &self.metrics;
        let Line { text, glyphs, .. } = self.lines.get_mut(index)?;
        Some(glyphs.get_or_insert_with(|| LineGlyphs::measure(text, metrics)))
    }

    fn text_matches(&self, index: usize, candidate: &str) -> bool {
        self.lines.get(index).is_some_and(|line| line.text == candidate)
    }

    fn width(&mut self, index: usize) -> usize {
        self.glyphs(index).map_or(0, LineGlyphs::width)
    }

    fn mark_dirty(&mut self, index: usize) {
        if let Some(line) = self.lines.get_mut(index) {
            line.syntax_dirty = true;
            self.clean_prefix = self.clean_prefix.min(index);
        }
    }

    /// Update the longest-line record after line `index` got new text.
    fn track_width(&mut self, index: usize, replaced: bool) {
        let Some((longest, longest_width)) = self.longest else {
            return;
        };
        let width = self.width(index);
        if replaced && longest == index {
            self.longest = (width >= longest_width).then_some((index, width));
        } else if width > longest_width {
            self.longest = Some((index, width));
        }
    }

    fn replace_all(&mut self, lines: Vec<Line>) {
        self.lines = lines;
        self.longest = None;
        self.clean_prefix = 0;
    }

    fn first_stale_line(&mut self) -> Option<usize> {
        let start = self.clean_prefix.min(self.lines.len());
        match self.lines[start..].iter().position(|line| line.syntax_dirty) {
            Some(offset) => {
                self.clean_prefix = start + offset;
                Some(start + offset)
            }
            None => {
                self.clean_prefix = self.lines.len();
                None
            }
        }
    }

    /// Store the end state of line `index`. Returns whether it differs from the cached one.
    fn store_syntax_state(&mut self, index: usize, state: SyntaxState) -> bool {
        self.check_index(index);
        let line = &mut self.lines[index];
        let changed = line.syntax_state.as_ref() != Some(&state);
        line.syntax_state = Some(state);
        line.syntax_dirty = false;
        if changed {
            self.mark_dirty(index + 1);
        }
        changed
    }

    fn level(&self, index: usize, f: impl FnOnce(&SyntaxState) -> u32) -> u32 {
        self.lines
            .get(index)
            .and_then(|line| line.syntax_state.as_ref())
            .map_or(0, f)
    }

    fn joined(&self, trailing_break: bool) -> String {
        let default = self.options.line_ending;
        let mut text = String::with_capacity(
            self.lines.iter().map(|line| line.text.len() + 2).sum::<usize>(),
        );
        let last = self.lines.len().saturating_sub(1);
        for (i, line) in self.lines.iter().enumerate() {
            text.push_str(&line.text);
            if i < last || trailing_break {
                text.push_str(line.ending.unwrap_or(default).as_str());
            }
        }
        text
    }
}

/// A line-oriented text buffer with per-line glyph and syntax caches.
pub struct Document {
    inner: ReentrantMutex<RefCell<DocumentInner>>,
    listeners: Mutex<Arc<Vec<(ListenerId, DocumentListener)>>>,
    next_listener_id: Mutex<u64>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        f.debug_struct("Document")
            .field("lines", &inner.lines.len())
            .field("options", &inner.options)
            .field("update_count", &inner.update_count)
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with default options.
    pub fn new() -> Self {
        Self::with_options(DocumentOptions::default())
    }

    /// Create an empty document.
    pub fn with_options(options: DocumentOptions) -> Self {
        let metrics = GlyphMetrics::with_tab_width(options.tab_width.max(1));
        Self {
            inner: ReentrantMutex::new(RefCell::new(DocumentInner {
                lines: Vec::new(),
                options,
                metrics,
                longest: None,
                clean_prefix: 0,
                update_count: 0,
            })),
            listeners: Mutex::new(Arc::new(Vec::new())),
            next_listener_id: Mutex::new(0),
        }
    }

    /// Create a document from text (see [`Self::set_text`]).
    pub fn from_text(text: &str) -> Self {
        let document = Self::new();
        document.set_text(text);
        document
    }

    fn with<R>(&self, f: impl FnOnce(&DocumentInner) -> R) -> R {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        f(&inner)
    }

    fn with_mut<R>(&self, f: impl FnOnce(&mut DocumentInner) -> R) -> R {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        f(&mut inner)
    }

    /// Run a mutation, wrapping it in `Changing`/`Changed` unless a batch is open.
    fn mutate<R>(&self, f: impl FnOnce(&mut DocumentInner) -> (R, Option<DocumentEvent>)) -> R {
        let _guard = self.inner.lock();
        let batched = self.with(|inner| inner.update_count > 0);
        if !batched {
            self.emit(&DocumentEvent::Changing);
        }
        let (result, event) = self.with_mut(f);
        if !batched {
            if let Some(event) = event {
                self.emit(&event);
            }
            self.emit(&DocumentEvent::Changed);
        }
        result
    }

    fn emit(&self, event: &DocumentEvent) {
        let listeners = Arc::clone(&self.listeners.lock());
        for (_, listener) in listeners.iter() {
            listener(event);
        }
    }

    // ---------------------------------------------------------------------
    // Listeners and batching
    // ---------------------------------------------------------------------

    /// Register a change listener.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&DocumentEvent) + Send + Sync + 'static,
    {
        let id = {
            let mut next = self.next_listener_id.lock();
            *next += 1;
            ListenerId(*next)
        };
        let mut listeners = self.listeners.lock();
        let mut updated = Vec::clone(&listeners);
        updated.push((id, Arc::new(listener)));
        *listeners = Arc::new(updated);
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        let updated: Vec<_> = listeners
            .iter()
            .filter(|(listener_id, _)| *listener_id != id)
            .cloned()
            .collect();
        let removed = updated.len() != before;
        *listeners = Arc::new(updated);
        removed
    }

    /// Open an update batch. Batches nest; per-change notifications are suppressed until the
    /// outermost [`Self::end_update`].
    pub fn begin_update(&self) {
        let _guard = self.inner.lock();
        let first = self.with_mut(|inner| {
            inner.update_count += 1;
            inner.update_count == 1
        });
        if first {
            self.emit(&DocumentEvent::Changing);
        }
    }

    /// Close an update batch. Unbalanced calls are ignored.
    pub fn end_update(&self) {
        let _guard = self.inner.lock();
        let last = self.with_mut(|inner| {
            if inner.update_count == 0 {
                return false;
            }
            inner.update_count -= 1;
            inner.update_count == 0
        });
        if last {
            self.emit(&DocumentEvent::Changed);
        }
    }

    /// Whether an update batch is open.
    pub fn is_updating(&self) -> bool {
        self.with(|inner| inner.update_count > 0)
    }

    /// Open an update batch that closes when the guard is dropped.
    pub fn batch(&self) -> UpdateGuard<'_> {
        self.begin_update();
        UpdateGuard { document: self }
    }

    // ---------------------------------------------------------------------
    // Line access
    // ---------------------------------------------------------------------

    /// Number of lines.
    pub fn count(&self) -> usize {
        self.with(|inner| inner.lines.len())
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Text of line `index`.
    pub fn line(&self, index: usize) -> Option<String> {
        self.with(|inner| inner.lines.get(index).map(|line| line.text.clone()))
    }

    /// Length of line `index` in chars (0 when out of range).
    pub fn line_len(&self, index: usize) -> CharPos {
        self.with(|inner| {
            CharPos(
                inner
                    .lines
                    .get(index)
                    .map_or(0, |line| line.text.chars().count()),
            )
        })
    }

    /// All lines.
    pub fn contents(&self) -> Vec<String> {
        self.with(|inner| inner.lines.iter().map(|line| line.text.clone()).collect())
    }

    /// All lines joined with their line breaks, without a trailing break.
    pub fn text(&self) -> String {
        self.with(|inner| inner.joined(false))
    }

    /// Length of [`Self::text`] in chars.
    pub fn text_len(&self) -> usize {
        self.with(|inner| {
            let default = inner.options.line_ending;
            let last = inner.lines.len().saturating_sub(1);
            inner
                .lines
                .iter()
                .enumerate()
                .map(|(i, line)| {
                    let brk = if i < last {
                        line.ending.unwrap_or(default).len_chars()
                    } else {
                        0
                    };
                    line.text.chars().count() + brk
                })
                .sum()
        })
    }

    /// Replace everything with `text`, split on CR, LF and CRLF.
    ///
    /// `N` line breaks produce `N + 1` lines; an empty text produces no lines. The first line
    /// break found becomes the default line ending. The trailing-newline flag is not touched.
    pub fn set_text(&self, text: &str) {
        self.mutate(|inner| {
            if let Some(ending) = LineEnding::detect_in_text(text) {
                inner.options.line_ending = ending;
            }
            let lines = if text.is_empty() {
                Vec::new()
            } else {
                split_lines(text)
                    .into_iter()
                    .map(|(line, ending)| Line::new(line, ending))
                    .collect()
            };
            let count = lines.len();
            inner.replace_all(lines);
            ((), Some(DocumentEvent::Inserted { start: 0, count }))
        })
    }

    /// Replace everything with `lines`, which use the default line ending.
    pub fn set_contents<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<Line> = lines
            .into_iter()
            .map(|line| Line::new(line.as_ref(), None))
            .collect();
        self.mutate(|inner| {
            let count = lines.len();
            inner.replace_all(lines);
            ((), Some(DocumentEvent::Inserted { start: 0, count }))
        })
    }

    /// Remove every line.
    pub fn clear(&self) {
        self.mutate(|inner| {
            inner.replace_all(Vec::new());
            ((), Some(DocumentEvent::Cleared))
        })
    }

    /// Replace the text of line `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count()`.
    pub fn put_line(&self, index: usize, text: &str) {
        self.mutate(|inner| {
            inner.check_index(index);
            if inner.lines[index].text == text {
                return ((), None);
            }
            inner.lines[index].set_text(text);
            inner.mark_dirty(index);
            inner.track_width(index, true);
            ((), Some(DocumentEvent::Putted { start: index, count: 1 }))
        })
    }

    /// Insert a line before `index` (`index == count()` appends).
    ///
    /// # Panics
    ///
    /// Panics if `index > count()`.
    pub fn insert_line(&self, index: usize, text: &str) {
        self.insert_many(index, vec![Line::new(text, None)]);
    }

    /// Insert `count` empty lines before `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > count()`.
    pub fn insert_lines(&self, index: usize, count: usize) {
        self.insert_many(index, (0..count).map(|_| Line::new("", None)).collect());
    }

    /// Insert several lines of text before `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > count()`.
    pub fn insert_strings<I, S>(&self, index: usize, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lines
            .into_iter()
            .map(|line| Line::new(line.as_ref(), None))
            .collect();
        self.insert_many(index, lines);
    }

    /// Append a line. Returns its index.
    pub fn add_line(&self, text: &str) -> usize {
        let _guard = self.inner.lock();
        let index = self.count();
        self.insert_line(index, text);
        index
    }

    /// Append several lines.
    pub fn add_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _guard = self.inner.lock();
        let index = self.count();
        self.insert_strings(index, lines);
    }

    fn insert_many(&self, index: usize, new_lines: Vec<Line>) {
        self.mutate(|inner| {
            inner.check_insert_index(index);
            let count = new_lines.len();
            if count == 0 {
                return ((), None);
            }
            inner.lines.splice(index..index, new_lines);
            if let Some((longest, width)) = inner.longest
                && longest >= index
            {
                inner.longest = Some((longest + count, width));
            }
            for i in index..index + count {
                inner.track_width(i, false);
            }
            inner.clean_prefix = inner.clean_prefix.min(index);
            // The line after the block now resumes from a different state.
            inner.mark_dirty(index + count);
            ((), Some(DocumentEvent::Inserted { start: index, count }))
        })
    }

    /// Delete line `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count()`.
    pub fn delete_at(&self, index: usize) {
        self.delete_lines(index, 1);
    }

    /// Delete `count` lines starting at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index + count > count()`.
    pub fn delete_lines(&self, index: usize, count: usize) {
        self.mutate(|inner| {
            let end = index
                .checked_add(count)
                .filter(|end| *end <= inner.lines.len());
            let Some(end) = end else {
                panic!(
                    "cannot delete lines {index}..{index}+{count} (count {})",
                    inner.lines.len()
                );
            };
            if count == 0 {
                return ((), None);
            }
            inner.lines.drain(index..end);
            inner.longest = match inner.longest {
                Some((longest, _)) if (index..end).contains(&longest) => None,
                Some((longest, width)) if longest >= end => Some((longest - count, width)),
                other => other,
            };
            inner.clean_prefix = inner.clean_prefix.min(index);
            inner.mark_dirty(index);
            ((), Some(DocumentEvent::Deleted { start: index, count }))
        })
    }

    /// Swap lines `a` and `b`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn exchange(&self, a: usize, b: usize) {
        let _guard = self.inner.lock();
        self.with(|inner| {
            inner.check_index(a);
            inner.check_index(b);
        });
        if a == b {
            return;
        }
        let batched = self.is_updating();
        if !batched {
            self.emit(&DocumentEvent::Changing);
        }
        self.with_mut(|inner| {
            inner.lines.swap(a, b);
            inner.longest = inner.longest.map(|(longest, width)| {
                let moved = if longest == a {
                    b
                } else if longest == b {
                    a
                } else {
                    longest
                };
                (moved, width)
            });
            for i in [a, a + 1, b, b + 1] {
                inner.mark_dirty(i);
            }
        });
        if !batched {
            self.emit(&DocumentEvent::Putted { start: a, count: 1 });
            self.emit(&DocumentEvent::Putted { start: b, count: 1 });
            self.emit(&DocumentEvent::Changed);
        }
    }

    // ---------------------------------------------------------------------
    // Options
    // ---------------------------------------------------------------------

    pub fn options(&self) -> DocumentOptions {
        self.with(|inner| inner.options.clone())
    }

    pub fn tab_width(&self) -> usize {
        self.with(|inner| inner.metrics.tab_width)
    }

    /// Change the tab width (at least 1). Invalidates all cached columns.
    pub fn set_tab_width(&self, tab_width: usize) {
        let tab_width = tab_width.max(1);
        self.with_mut(|inner| {
            if inner.metrics.tab_width == tab_width {
                return;
            }
            inner.metrics.tab_width = tab_width;
            inner.options.tab_width = tab_width;
            invalidate_columns(inner);
        });
    }

    /// Change the fonts used to measure glyphs. Invalidates all cached columns.
    pub fn set_fonts(&self, primary: Arc<dyn FontMetrics>, non_ascii: Arc<dyn FontMetrics>) {
        self.with_mut(|inner| {
            inner.metrics.primary = primary;
            inner.metrics.non_ascii = non_ascii;
            invalidate_columns(inner);
        });
    }

    /// Current measuring setup.
    pub fn metrics(&self) -> GlyphMetrics {
        self.with(|inner| inner.metrics.clone())
    }

    /// Drop every cached glyph segmentation.
    pub fn invalidate_all_line_columns(&self) {
        self.with_mut(invalidate_columns);
    }

    /// Default line ending, used for new lines and on save.
    pub fn newline_type(&self) -> LineEnding {
        self.with(|inner| inner.options.line_ending)
    }

    /// Set the default line ending and convert every line to it.
    pub fn set_newline_type(&self, line_ending: LineEnding) {
        self.with_mut(|inner| {
            inner.options.line_ending = line_ending;
            for line in &mut inner.lines {
                line.ending = None;
            }
        });
    }

    pub fn append_newline_at_eof(&self) -> bool {
        self.with(|inner| inner.options.append_newline_at_eof)
    }

    pub fn set_append_newline_at_eof(&self, append: bool) {
        self.with_mut(|inner| inner.options.append_newline_at_eof = append);
    }

    // ---------------------------------------------------------------------
    // Glyphs and columns
    // ---------------------------------------------------------------------

    /// Width of line `index` in columns, measured and cached on first use.
    pub fn line_columns(&self, index: usize) -> usize {
        self.with_mut(|inner| inner.width(index))
    }

    /// Width of `candidate` as if it were line `index`.
    ///
    /// Uses the cache when `candidate` equals the stored text; otherwise measures without
    /// caching.
    pub fn line_columns_for(&self, index: usize, candidate: &str) -> usize {
        self.with_mut(|inner| {
            if inner.text_matches(index, candidate) {
                inner.width(index)
            } else {
                string_columns(candidate, Column::ZERO, &inner.metrics)
            }
        })
    }

    /// Width of the widest line.
    pub fn longest_line_columns(&self) -> usize {
        self.with_mut(|inner| {
            if let Some((_, width)) = inner.longest {
                return width;
            }
            let mut longest: Option<(usize, usize)> = None;
            for i in 0..inner.lines.len() {
                let width = inner.width(i);
                if longest.is_none_or(|(_, w)| width > w) {
                    longest = Some((i, width));
                }
            }
            inner.longest = longest;
            longest.map_or(0, |(_, width)| width)
        })
    }

    /// Width of `text` placed after `cols_before` columns.
    pub fn string_columns(&self, text: &str, cols_before: usize) -> usize {
        self.with(|inner| string_columns(text, Column(cols_before), &inner.metrics))
    }

    fn with_glyphs<R: Default>(&self, index: usize, f: impl FnOnce(&LineGlyphs) -> R) -> R {
        self.with_mut(|inner| inner.glyphs(index).map(f).unwrap_or_default())
    }

    /// Run `f` on the glyphs of `candidate`, reusing the cache of line `index` when the text
    /// matches.
    fn with_candidate<R: Default>(
        &self,
        index: usize,
        candidate: &str,
        f: impl FnOnce(&LineGlyphs) -> R,
    ) -> R {
        self.with_mut(|inner| {
            if inner.text_matches(index, candidate) {
                inner.glyphs(index).map(f).unwrap_or_default()
            } else {
                f(&LineGlyphs::measure(candidate, &inner.metrics))
            }
        })
    }

    /// Number of glyphs on line `index`.
    pub fn glyph_count(&self, index: usize) -> usize {
        self.with_glyphs(index, LineGlyphs::glyph_count)
    }

    /// Start char offset of every glyph on line `index`.
    pub fn glyph_positions(&self, index: usize) -> Vec<CharPos> {
        self.with_glyphs(index, |glyphs| glyphs.positions.clone())
    }

    /// Text of glyph `glyph` on line `index`.
    pub fn glyph(&self, index: usize, glyph: GlyphIndex) -> Option<String> {
        self.with_mut(|inner| {
            let glyphs = inner.glyphs(index)?;
            if glyph.get() >= glyphs.glyph_count() {
                return None;
            }
            let (start, end) = (glyphs.glyph_start(glyph), glyphs.glyph_end(glyph));
            let text = &inner.lines[index].text;
            Some(
                text.chars()
                    .skip(start.get())
                    .take(end.get() - start.get())
                    .collect(),
            )
        })
    }

    pub fn glyph_start(&self, index: usize, glyph: GlyphIndex) -> CharPos {
        self.with_glyphs(index, |glyphs| glyphs.glyph_start(glyph))
    }

    pub fn glyph_end(&self, index: usize, glyph: GlyphIndex) -> CharPos {
        self.with_glyphs(index, |glyphs| glyphs.glyph_end(glyph))
    }

    pub fn glyph_start_column(&self, index: usize, glyph: GlyphIndex) -> Column {
        self.with_glyphs(index, |glyphs| glyphs.glyph_start_column(glyph))
    }

    pub fn glyph_end_column(&self, index: usize, glyph: GlyphIndex) -> Column {
        self.with_glyphs(index, |glyphs| glyphs.glyph_end_column(glyph))
    }

    /// Start column of the glyph containing char `ch` of line `index`.
    pub fn char_to_column(&self, index: usize, ch: CharPos) -> Column {
        self.with_glyphs(index, |glyphs| glyphs.char_to_column(ch))
    }

    /// Char offset of the glyph covering column `column` of line `index`.
    pub fn column_to_char(&self, index: usize, column: Column) -> CharPos {
        self.with_glyphs(index, |glyphs| glyphs.column_to_char(column))
    }

    pub fn char_to_glyph_index(&self, index: usize, ch: CharPos) -> GlyphIndex {
        self.with_glyphs(index, |glyphs| glyphs.char_to_glyph_index(ch))
    }

    pub fn column_to_glyph_index(&self, index: usize, column: Column) -> GlyphIndex {
        self.with_glyphs(index, |glyphs| glyphs.column_to_glyph_index(column))
    }

    /// [`Self::char_to_column`] for text that is not (yet) stored as line `index`.
    pub fn char_to_column_in(&self, index: usize, text: &str, ch: CharPos) -> Column {
        self.with_candidate(index, text, |glyphs| glyphs.char_to_column(ch))
    }

    /// [`Self::column_to_char`] for text that is not (yet) stored as line `index`.
    pub fn column_to_char_in(&self, index: usize, text: &str, column: Column) -> CharPos {
        self.with_candidate(index, text, |glyphs| glyphs.column_to_char(column))
    }

    // ---------------------------------------------------------------------
    // Syntax states
    // ---------------------------------------------------------------------

    /// Cached end state of line `index`, if it was ever lexed.
    pub fn syntax_state(&self, index: usize) -> Option<SyntaxState> {
        self.with(|inner| {
            inner
                .lines
                .get(index)
                .and_then(|line| line.syntax_state.clone())
        })
    }

    /// Publish a freshly computed end state for line `index`.
    ///
    /// `state` must have been computed from the line's current text and the cached state of
    /// the line above. Returns whether it differs from the cached state; if so, the next line
    /// becomes stale.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count()`.
    pub fn set_syntax_state(&self, index: usize, state: SyntaxState) -> bool {
        self.with_mut(|inner| inner.store_syntax_state(index, state))
    }

    /// First line whose cached state may be stale.
    pub fn first_stale_line(&self) -> Option<usize> {
        self.with_mut(DocumentInner::first_stale_line)
    }

    /// Whether the cached state of line `index` may be stale.
    pub fn is_syntax_state_stale(&self, index: usize) -> bool {
        self.with_mut(|inner| {
            index < inner.lines.len()
                && inner
                    .first_stale_line()
                    .is_some_and(|stale| index >= stale)
        })
    }

    pub fn parenthesis_level(&self, index: usize) -> u32 {
        self.with(|inner| inner.level(index, |state| state.parenthesis_level))
    }

    pub fn bracket_level(&self, index: usize) -> u32 {
        self.with(|inner| inner.level(index, |state| state.bracket_level))
    }

    pub fn brace_level(&self, index: usize) -> u32 {
        self.with(|inner| inner.level(index, |state| state.brace_level))
    }

    pub fn block_level(&self, index: usize) -> u32 {
        self.with(|inner| inner.level(index, |state| state.block_level))
    }

    pub fn block_started(&self, index: usize) -> u32 {
        self.with(|inner| inner.level(index, |state| state.block_started))
    }

    pub fn block_ended(&self, index: usize) -> u32 {
        self.with(|inner| inner.level(index, |state| state.block_ended))
    }

    /// Re-lex line `index` from the cached state of the line above and store the result.
    /// Returns whether the end state changed.
    ///
    /// This is one step of the fixed-point pass; callers that need to stay responsive can
    /// drive it line by line and check a deadline in between.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count()`.
    pub fn rescan_line(&self, index: usize, syntaxer: &mut dyn Syntaxer) -> bool {
        let _guard = self.inner.lock();
        let state = self.with(|inner| {
            inner.check_index(index);
            let previous = index
                .checked_sub(1)
                .and_then(|above| inner.lines[above].syntax_state.as_ref());
            line_end_state(syntaxer, previous, &inner.lines[index].text, index)
        });
        self.set_syntax_state(index, state)
    }

    /// Re-lex from line `from` until a line's end state equals its cached state.
    ///
    /// Returns the range of lines that were re-lexed.
    pub fn rescan(&self, from: usize, syntaxer: &mut dyn Syntaxer) -> Range<usize> {
        let _guard = self.inner.lock();
        let count = self.count();
        let mut line = from;
        while line < count {
            let changed = self.rescan_line(line, syntaxer);
            line += 1;
            if !changed {
                break;
            }
        }
        tracing::trace!(
            from,
            visited = line.saturating_sub(from),
            stop = line,
            "rescanned syntax states"
        );
        from..line.max(from)
    }

    /// Bring every stale line up to date. Returns the number of lines re-lexed.
    pub fn rescan_stale(&self, syntaxer: &mut dyn Syntaxer) -> usize {
        let _guard = self.inner.lock();
        let mut visited = 0;
        while let Some(stale) = self.first_stale_line() {
            visited += self.rescan(stale, syntaxer).len();
        }
        visited
    }

    // ---------------------------------------------------------------------
    // Files
    // ---------------------------------------------------------------------

    /// Load a file, replacing the whole document. Returns the encoding used.
    ///
    /// Line breaks are preserved per line, the first one becomes the default line ending and
    /// [`Self::append_newline_at_eof`] records whether the file ended with a break. On error
    /// the document is left untouched.
    pub fn load_from_file(
        &self,
        path: impl AsRef<Path>,
        hint: EncodingHint,
    ) -> Result<TextEncoding, FileError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| FileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let encoding = self.load_from_bytes(&bytes, hint)?;
        tracing::debug!(
            path = %path.display(),
            %encoding,
            lines = self.count(),
            "loaded document"
        );
        Ok(encoding)
    }

    /// [`Self::load_from_file`] for bytes already in memory.
    pub fn load_from_bytes(
        &self,
        bytes: &[u8],
        hint: EncodingHint,
    ) -> Result<TextEncoding, FileError> {
        let Decoded { text, encoding } = encoding::decode(bytes, hint)?;
        self.mutate(|inner| {
            if let Some(ending) = LineEnding::detect_in_text(&text) {
                inner.options.line_ending = ending;
            }
            let mut segments = split_lines(&text);
            if text.is_empty() {
                segments.clear();
            } else {
                let trailing_break = segments.len() > 1
                    && segments.last().is_some_and(|(line, _)| line.is_empty());
                if trailing_break {
                    segments.pop();
                }
                inner.options.append_newline_at_eof = trailing_break;
            }
            let lines: Vec<Line> = segments
                .into_iter()
                .map(|(line, ending)| Line::new(line, ending))
                .collect();
            let count = lines.len();
            inner.replace_all(lines);
            ((), Some(DocumentEvent::Inserted { start: 0, count }))
        });
        Ok(encoding)
    }

    /// Encode the document. Returns the bytes and the encoding used.
    ///
    /// With [`EncodingHint::Auto`] the text is written as ASCII when it is pure ASCII and in
    /// `default` otherwise. A break is appended after the last line when
    /// [`Self::append_newline_at_eof`] is set.
    pub fn to_bytes(
        &self,
        hint: EncodingHint,
        default: TextEncoding,
    ) -> Result<(Vec<u8>, TextEncoding), FileError> {
        let text = self.with(|inner| inner.joined(inner.options.append_newline_at_eof));
        let encoding = match hint {
            EncodingHint::Exact(encoding) => encoding,
            EncodingHint::Auto if text.is_ascii() => TextEncoding::Ascii,
            EncodingHint::Auto => default,
        };
        let bytes = encoding::encode(&text, encoding)?;
        Ok((bytes, encoding))
    }

    /// Write the document to `path`. Returns the encoding used.
    pub fn save_to_file(
        &self,
        path: impl AsRef<Path>,
        hint: EncodingHint,
        default: TextEncoding,
    ) -> Result<TextEncoding, FileError> {
        let path = path.as_ref();
        let (bytes, encoding) = self.to_bytes(hint, default)?;
        std::fs::write(path, &bytes).map_err(|source| FileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            path = %path.display(),
            %encoding,
            bytes = bytes.len(),
            lines = self.count(),
            "saved document"
        );
        Ok(encoding)
    }
}

fn invalidate_columns(inner: &mut DocumentInner) {
    for line in &mut inner.lines {
        line.glyphs = None;
    }
    inner.longest = None;
    tracing::debug!(
        lines = inner.lines.len(),
        tab_width = inner.metrics.tab_width,
        "invalidated line columns"
    );
}

/// Closes an update batch when dropped. See [`Document::batch`].
#[must_use = "the batch ends when the guard is dropped"]
pub struct UpdateGuard<'a> {
    document: &'a Document,
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.document.end_update();
    }
}
