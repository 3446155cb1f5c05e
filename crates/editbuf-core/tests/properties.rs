use editbuf_core::encoding;
use editbuf_core::glyph::{GlyphMetrics, glyph_positions, string_columns};
use editbuf_core::{
    BufferCoord, ChangeReason, Column, Document, EditSession, EncodingHint, SelectionMode,
    TextEncoding, UndoLimits, UndoList,
};
use std::sync::Arc;

fn clean_line(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, '\r' | '\n' | '\0')).collect()
}

fn build_text(lines: &[(String, u8)]) -> String {
    let mut text = String::new();
    for (raw, ending) in lines {
        text.push_str(&clean_line(raw));
        text.push_str(match ending % 4 {
            0 => "\n",
            1 => "\r\n",
            2 => "\r",
            _ => "",
        });
    }
    text
}

/// One random edit, decoded from raw quickcheck values.
fn apply_edit(session: &mut EditSession, kind: u8, a: usize, b: usize, text: &str) {
    let document = Arc::clone(session.document());
    let count = document.count();
    let line = a % count;
    let len = document.line_len(line).get();
    match kind % 3 {
        0 => {
            let at = BufferCoord::new(line, b % (len + 1));
            session.insert_text(at, text).unwrap();
        }
        1 => {
            let end_line = (line + b % 3).min(count - 1);
            let end_len = document.line_len(end_line).get();
            let start = BufferCoord::new(line, (b / 3) % (len + 1));
            let end = BufferCoord::new(end_line, b % (end_len + 1));
            if start <= end {
                session.delete_range(start, end).unwrap();
            }
        }
        _ => session.replace_line(line, &clean_line(text)).unwrap(),
    }
}

quickcheck::quickcheck! {
    fn prop_load_save_round_trip(lines: Vec<(String, u8)>, pick: u8) -> bool {
        const ENCODINGS: [TextEncoding; 10] = [
            TextEncoding::Utf8,
            TextEncoding::Utf8Bom,
            TextEncoding::Utf16Le,
            TextEncoding::Utf16LeBom,
            TextEncoding::Utf16Be,
            TextEncoding::Utf16BeBom,
            TextEncoding::Utf32Le,
            TextEncoding::Utf32LeBom,
            TextEncoding::Utf32Be,
            TextEncoding::Utf32BeBom,
        ];
        let requested = ENCODINGS[usize::from(pick) % ENCODINGS.len()];
        let text = build_text(&lines);
        let source = encoding::encode(&text, requested).unwrap();
        if encoding::sniff_bom(&source)
            .is_some_and(|found| found.without_bom() != requested.without_bom())
        {
            // Unmarked content that happens to start like another encoding's mark.
            return true;
        }
        let document = Document::new();
        let loaded = document
            .load_from_bytes(&source, EncodingHint::Exact(requested))
            .unwrap();
        let (bytes, used) = document
            .to_bytes(EncodingHint::Exact(loaded), TextEncoding::Utf8)
            .unwrap();
        used == loaded && bytes == source
    }

    fn prop_set_text_line_count(lines: Vec<(String, u8)>) -> bool {
        let text = build_text(&lines);
        let document = Document::from_text(&text);
        let breaks = text.matches("\r\n").count()
            + text.matches('\n').count()
            + text.matches('\r').count()
            - 2 * text.matches("\r\n").count();
        if text.is_empty() {
            document.count() == 0
        } else {
            document.count() == breaks + 1 && document.text() == text
        }
    }

    fn prop_glyph_segmentation_is_idempotent(raw: String) -> bool {
        let line = clean_line(&raw);
        let document = Document::from_text(&line);
        if line.is_empty() {
            return glyph_positions(&line).is_empty();
        }
        let positions = document.glyph_positions(0);
        let width = document.line_columns(0);
        document.put_line(0, &line);
        document.invalidate_all_line_columns();
        positions == glyph_positions(&line)
            && positions == document.glyph_positions(0)
            && width == document.line_columns(0)
            && width == string_columns(&line, Column::ZERO, &GlyphMetrics::default())
    }

    fn prop_column_conversions_stay_in_bounds(raw: String, offset: usize) -> bool {
        let line = clean_line(&raw);
        let document = Document::from_text(&line);
        let len = document.line_len(0);
        let width = document.line_columns(0);
        let ch = document.column_to_char(0, Column(offset % (width + 4)));
        let column = document.char_to_column(0, editbuf_core::CharPos(offset % (len.get() + 4)));
        ch <= len && column.get() <= width
    }

    fn prop_undo_redo_inverse(edits: Vec<(u8, usize, usize, String)>) -> bool {
        let document = Arc::new(Document::from_text("alpha\n\tbeta\ngamma δ\n"));
        let initial = document.contents();
        let mut session = EditSession::with_limits(Arc::clone(&document), UndoLimits::UNLIMITED);
        for (kind, a, b, text) in &edits {
            apply_edit(&mut session, *kind, *a, *b, text);
            session.add_group_break();
        }
        let edited = document.contents();

        while session.undo() {}
        let undone = document.contents();
        while session.redo() {}
        undone == initial && document.contents() == edited
    }

    fn prop_eviction_never_exceeds_caps(ops: Vec<u8>, cap: u8) -> bool {
        let cap = usize::from(cap % 5) + 1;
        let mut list = UndoList::new(UndoLimits::UNLIMITED.with_max_undo_actions(cap));
        let mut truncated = false;
        for op in ops {
            match op % 4 {
                0 => list.begin_block(),
                1 => list.end_block(),
                2 => list.add_group_break(),
                _ => list.add_change(
                    ChangeReason::Insert,
                    BufferCoord::default(),
                    BufferCoord::new(0, 1),
                    vec!["x".to_string()],
                    SelectionMode::Normal,
                ),
            }
            if list.action_count() > cap || (truncated && !list.full_undo_impossible()) {
                return false;
            }
            truncated = list.full_undo_impossible();
        }
        true
    }
}
