//! Document and change-log settings.

use crate::glyph::DEFAULT_TAB_WIDTH;
use crate::line_ending::LineEnding;

/// Default cap on undoable user actions.
pub const DEFAULT_MAX_UNDO_ACTIONS: usize = 1024;

/// Default cap on the estimated memory held by the undo list (50 MiB).
pub const DEFAULT_MAX_UNDO_MEMORY: usize = 50 * 1024 * 1024;

/// Document-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DocumentOptions {
    /// Tab stop distance in columns.
    pub tab_width: usize,
    /// Line ending used for lines created by editing.
    pub line_ending: LineEnding,
    /// Whether a line break is written after the last line on save.
    pub append_newline_at_eof: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
            line_ending: LineEnding::Lf,
            append_newline_at_eof: true,
        }
    }
}

impl DocumentOptions {
    /// Set the tab width (clamped to at least 1).
    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width.max(1);
        self
    }

    /// Set the default line ending.
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Set the trailing newline policy.
    pub fn with_append_newline_at_eof(mut self, append: bool) -> Self {
        self.append_newline_at_eof = append;
        self
    }
}

/// Eviction ceilings for [`UndoList`](crate::UndoList). `0` disables a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UndoLimits {
    /// Maximum number of user actions (blocks) kept.
    pub max_undo_actions: usize,
    /// Maximum estimated memory in bytes.
    pub max_memory_usage: usize,
}

impl Default for UndoLimits {
    fn default() -> Self {
        Self {
            max_undo_actions: DEFAULT_MAX_UNDO_ACTIONS,
            max_memory_usage: DEFAULT_MAX_UNDO_MEMORY,
        }
    }
}

impl UndoLimits {
    /// No ceilings at all.
    pub const UNLIMITED: Self = Self {
        max_undo_actions: 0,
        max_memory_usage: 0,
    };

    /// Set the action ceiling.
    pub fn with_max_undo_actions(mut self, max: usize) -> Self {
        self.max_undo_actions = max;
        self
    }

    /// Set the memory ceiling.
    pub fn with_max_memory_usage(mut self, bytes: usize) -> Self {
        self.max_memory_usage = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DocumentOptions::default();
        assert_eq!(options.tab_width, 4);
        assert_eq!(options.line_ending, LineEnding::Lf);
        assert!(options.append_newline_at_eof);

        let limits = UndoLimits::default();
        assert_eq!(limits.max_undo_actions, 1024);
        assert_eq!(limits.max_memory_usage, 50 * 1024 * 1024);
    }

    #[test]
    fn test_builders() {
        let options = DocumentOptions::default()
            .with_tab_width(0)
            .with_line_ending(LineEnding::Crlf)
            .with_append_newline_at_eof(false);
        assert_eq!(options.tab_width, 1);
        assert_eq!(options.line_ending, LineEnding::Crlf);
        assert!(!options.append_newline_at_eof);

        let limits = UndoLimits::UNLIMITED.with_max_undo_actions(2);
        assert_eq!(limits.max_undo_actions, 2);
        assert_eq!(limits.max_memory_usage, 0);
    }
}
