//! Glyph segmentation and column measurement.
//!
//! A line is split into glyphs (extended grapheme clusters, UAX #29), then every glyph is
//! measured in display columns. Tabs advance to the next tab stop, every other glyph uses the
//! font advance rounded up to whole columns.
//!
//! Everything in this module is a pure function of its inputs; [`Document`](crate::Document)
//! caches the results per line.

use crate::coords::{CharPos, Column, GlyphIndex};
use std::fmt;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Default tab width (in columns) used when a caller does not specify a tab width.
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Font measurement used to turn glyphs into columns.
///
/// Advances are in arbitrary units (pixels, points, cells); only the ratio between
/// [`FontMetrics::advance`] and [`FontMetrics::column_advance`] matters.
pub trait FontMetrics: fmt::Debug + Send + Sync {
    /// Advance of one display column, usually the advance of a reference glyph like `M`.
    fn column_advance(&self) -> f32;

    /// Horizontal advance of a single glyph.
    fn advance(&self, glyph: &str) -> f32;
}

/// Terminal-style metrics: one column per narrow glyph, two per wide glyph (UAX #11).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellMetrics;

impl FontMetrics for CellMetrics {
    fn column_advance(&self) -> f32 {
        1.0
    }

    fn advance(&self, glyph: &str) -> f32 {
        UnicodeWidthStr::width(glyph) as f32
    }
}

/// Fixed-advance metrics, handy for tests and for monospace fonts with a known cell size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedMetrics {
    /// Advance of one column.
    pub column_advance: f32,
    /// Advance reported for every glyph.
    pub glyph_advance: f32,
}

impl FontMetrics for FixedMetrics {
    fn column_advance(&self) -> f32 {
        self.column_advance
    }

    fn advance(&self, _glyph: &str) -> f32 {
        self.glyph_advance
    }
}

/// Everything needed to measure a glyph: the primary font, the font used for glyphs outside
/// the primary (ASCII) script, and the tab width.
#[derive(Debug, Clone)]
pub struct GlyphMetrics {
    /// Font used for ASCII glyphs.
    pub primary: Arc<dyn FontMetrics>,
    /// Font used for every other glyph.
    pub non_ascii: Arc<dyn FontMetrics>,
    /// Tab stop distance in columns.
    pub tab_width: usize,
}

impl Default for GlyphMetrics {
    fn default() -> Self {
        Self {
            primary: Arc::new(CellMetrics),
            non_ascii: Arc::new(CellMetrics),
            tab_width: DEFAULT_TAB_WIDTH,
        }
    }
}

impl GlyphMetrics {
    /// Cell metrics for both fonts with the given tab width.
    pub fn with_tab_width(tab_width: usize) -> Self {
        Self {
            tab_width,
            ..Self::default()
        }
    }

    /// Width in columns of `glyph` when it starts at `column`.
    pub fn glyph_width(&self, glyph: &str, column: Column) -> usize {
        if glyph == "\t" {
            return tab_width_at(column, self.tab_width);
        }

        let font = if glyph.is_ascii() {
            &self.primary
        } else {
            &self.non_ascii
        };
        let unit = self.primary.column_advance();
        if unit <= 0.0 {
            return 1;
        }
        let advance = font.advance(glyph);
        if advance <= 0.0 {
            return 0;
        }
        (advance / unit).ceil() as usize
    }
}

/// Columns covered by a tab that starts at `column`.
#[inline]
pub fn tab_width_at(column: Column, tab_width: usize) -> usize {
    let tab_width = tab_width.max(1);
    tab_width - (column.get() % tab_width)
}

/// Start offsets (in chars) of every glyph of `text`.
///
/// An empty text has no glyphs. The result is strictly increasing and starts at 0 otherwise.
pub fn glyph_positions(text: &str) -> Vec<CharPos> {
    let mut positions = Vec::new();
    let mut ch = 0usize;
    for grapheme in text.graphemes(true) {
        positions.push(CharPos(ch));
        ch += grapheme.chars().count();
    }
    positions
}

/// Start columns of the glyphs of one line, plus the column where the line ends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlyphColumns {
    /// Column where measuring started.
    pub start: Column,
    /// Absolute start column of each glyph.
    pub starts: Vec<Column>,
    /// Absolute column right after the last glyph.
    pub end: Column,
}

impl GlyphColumns {
    /// Total width in columns, not counting [`GlyphColumns::start`].
    pub fn width(&self) -> usize {
        self.end.get() - self.start.get()
    }

    /// Width of each glyph.
    pub fn widths(&self) -> impl Iterator<Item = usize> + '_ {
        self.starts
            .iter()
            .enumerate()
            .map(|(i, s)| self.starts.get(i + 1).unwrap_or(&self.end).get() - s.get())
    }
}

/// Measure every glyph of `text`, starting at `start`.
///
/// `positions` must come from [`glyph_positions`] for the same `text`.
pub fn glyph_columns(
    text: &str,
    positions: &[CharPos],
    start: Column,
    metrics: &GlyphMetrics,
) -> GlyphColumns {
    let mut starts = Vec::with_capacity(positions.len());
    let mut column = start;
    for glyph in glyph_slices(text, positions) {
        starts.push(column);
        column = column.saturating_add(metrics.glyph_width(glyph, column));
    }
    GlyphColumns {
        start,
        starts,
        end: column,
    }
}

/// Width in columns of `text` placed at column `start`, not counting `start`.
pub fn string_columns(text: &str, start: Column, metrics: &GlyphMetrics) -> usize {
    let mut column = start;
    for glyph in text.graphemes(true) {
        column = column.saturating_add(metrics.glyph_width(glyph, column));
    }
    column.get() - start.get()
}

fn glyph_slices<'a>(text: &'a str, positions: &'a [CharPos]) -> impl Iterator<Item = &'a str> {
    let mut boundaries = Vec::with_capacity(positions.len() + 1);
    let mut wanted = positions.iter().peekable();
    for (ch, (byte, _)) in text.char_indices().enumerate() {
        if wanted.peek().is_some_and(|p| p.get() == ch) {
            boundaries.push(byte);
            wanted.next();
        }
    }
    boundaries.push(text.len());
    (0..boundaries.len() - 1).map(move |i| &text[boundaries[i]..boundaries[i + 1]])
}

/// Index of the glyph containing char `ch`.
///
/// Offsets past the end of the line map to the last glyph; [`LineGlyphs`] knows the line
/// length and maps them to the glyph count instead.
pub fn char_to_glyph_index(positions: &[CharPos], ch: CharPos) -> GlyphIndex {
    let idx = positions.partition_point(|p| *p <= ch);
    GlyphIndex(idx.saturating_sub(1))
}

/// Index of the glyph covering display column `column`.
///
/// Returns the glyph count when `column` is at or past the end of the line.
pub fn column_to_glyph_index(columns: &GlyphColumns, column: Column) -> GlyphIndex {
    if column >= columns.end {
        return GlyphIndex(columns.starts.len());
    }
    let idx = columns.starts.partition_point(|s| *s <= column);
    GlyphIndex(idx.saturating_sub(1))
}

/// Glyph/column index of one line: glyph start offsets plus their measured columns.
///
/// All conversions clamp out-of-range input to the nearest valid boundary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineGlyphs {
    /// Length of the line in chars.
    pub len: CharPos,
    /// Start offset of each glyph.
    pub positions: Vec<CharPos>,
    /// Start column of each glyph.
    pub columns: GlyphColumns,
}

impl LineGlyphs {
    /// Segment and measure `text` from column 0.
    pub fn measure(text: &str, metrics: &GlyphMetrics) -> Self {
        let positions = glyph_positions(text);
        let columns = glyph_columns(text, &positions, Column::ZERO, metrics);
        Self {
            len: CharPos(text.chars().count()),
            positions,
            columns,
        }
    }

    /// Number of glyphs.
    pub fn glyph_count(&self) -> usize {
        self.positions.len()
    }

    /// Width of the line in columns.
    pub fn width(&self) -> usize {
        self.columns.width()
    }

    /// Char offset where glyph `glyph` starts.
    pub fn glyph_start(&self, glyph: GlyphIndex) -> CharPos {
        self.positions.get(glyph.get()).copied().unwrap_or(self.len)
    }

    /// Char offset right after glyph `glyph`.
    pub fn glyph_end(&self, glyph: GlyphIndex) -> CharPos {
        self.positions
            .get(glyph.get() + 1)
            .copied()
            .unwrap_or(self.len)
    }

    /// Column where glyph `glyph` starts.
    pub fn glyph_start_column(&self, glyph: GlyphIndex) -> Column {
        self.columns
            .starts
            .get(glyph.get())
            .copied()
            .unwrap_or(self.columns.end)
    }

    /// Column right after glyph `glyph`.
    pub fn glyph_end_column(&self, glyph: GlyphIndex) -> Column {
        self.columns
            .starts
            .get(glyph.get() + 1)
            .copied()
            .unwrap_or(self.columns.end)
    }

    /// Glyph containing char `ch`, or the glyph count at/after the end of the line.
    pub fn char_to_glyph_index(&self, ch: CharPos) -> GlyphIndex {
        if ch >= self.len {
            return GlyphIndex(self.glyph_count());
        }
        char_to_glyph_index(&self.positions, ch)
    }

    /// Start column of the glyph containing char `ch`.
    pub fn char_to_column(&self, ch: CharPos) -> Column {
        self.glyph_start_column(self.char_to_glyph_index(ch))
    }

    /// Glyph covering column `column`, or the glyph count at/after the end of the line.
    pub fn column_to_glyph_index(&self, column: Column) -> GlyphIndex {
        column_to_glyph_index(&self.columns, column)
    }

    /// Char offset of the glyph covering column `column`.
    pub fn column_to_char(&self, column: Column) -> CharPos {
        self.glyph_start(self.column_to_glyph_index(column))
    }
}
