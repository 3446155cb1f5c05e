//! Bounded undo/redo change log.
//!
//! Every reversible edit is recorded as an [`UndoItem`]. Items recorded between
//! [`UndoList::begin_block`] and [`UndoList::end_block`] share one change number and are
//! undone as a single user action. [`ChangeReason::GroupBreak`] markers separate actions that
//! would otherwise be merged by the caller.
//!
//! The list enforces two independent ceilings from [`UndoLimits`]: the number of user actions
//! and the estimated memory footprint. Exceeding either evicts whole actions from the oldest
//! end and sets the sticky [`UndoList::full_undo_impossible`] flag.

use crate::coords::BufferCoord;
use crate::options::UndoLimits;
use std::collections::VecDeque;
use std::mem::size_of;

/// What an [`UndoItem`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeReason {
    /// Text was inserted between `start` and `end`.
    Insert,
    /// The recorded text was deleted at `start`.
    Delete,
    /// Only restores the caret position.
    Caret,
    /// Only restores the selection.
    Selection,
    /// Boundary between two user actions.
    GroupBreak,
    /// Restores the scroll position.
    LeftTop,
    /// A line break was inserted.
    LineBreak,
    /// Selected lines moved up.
    MoveSelectionUp,
    /// Selected lines moved down.
    MoveSelectionDown,
    /// A whole line was replaced; the recorded text is the previous content.
    ReplaceLine,
    /// Reported when the list is empty.
    Nothing,
}

/// Selection mode in effect when a change was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectionMode {
    /// Character-wise selection.
    #[default]
    Normal,
    /// Whole-line selection.
    Line,
    /// Rectangular selection.
    Column,
}

/// One reversible edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoItem {
    reason: ChangeReason,
    selection_mode: SelectionMode,
    start: BufferCoord,
    end: BufferCoord,
    text: Vec<String>,
    change_number: u64,
    memory_usage: usize,
}

impl UndoItem {
    /// Create an item. The memory footprint is estimated from the recorded text.
    pub fn new(
        reason: ChangeReason,
        selection_mode: SelectionMode,
        start: BufferCoord,
        end: BufferCoord,
        text: Vec<String>,
        change_number: u64,
    ) -> Self {
        let memory_usage = size_of::<Self>()
            + text
                .iter()
                .map(|line| line.len() + size_of::<String>())
                .sum::<usize>();
        Self {
            reason,
            selection_mode,
            start,
            end,
            text,
            change_number,
            memory_usage,
        }
    }

    pub fn reason(&self) -> ChangeReason {
        self.reason
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection_mode
    }

    pub fn start(&self) -> BufferCoord {
        self.start
    }

    pub fn end(&self) -> BufferCoord {
        self.end
    }

    /// The affected text, one entry per line.
    pub fn text(&self) -> &[String] {
        &self.text
    }

    pub fn change_number(&self) -> u64 {
        self.change_number
    }

    /// Estimated bytes held by this item.
    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    fn counts_as_action(&self) -> bool {
        self.reason != ChangeReason::GroupBreak
    }
}

/// The undo side of the change log.
#[derive(Debug)]
pub struct UndoList {
    items: VecDeque<UndoItem>,
    limits: UndoLimits,
    next_change_number: u64,
    block_lock: usize,
    block_change_number: u64,
    /// User actions currently held (distinct change numbers of non-break items).
    block_count: usize,
    memory_usage: usize,
    initial_change_number: u64,
    full_undo_impossible: bool,
    inside_redo: bool,
}

impl Default for UndoList {
    fn default() -> Self {
        Self::new(UndoLimits::default())
    }
}

impl UndoList {
    pub fn new(limits: UndoLimits) -> Self {
        Self {
            items: VecDeque::new(),
            limits,
            next_change_number: 1,
            block_lock: 0,
            block_change_number: 0,
            block_count: 0,
            memory_usage: 0,
            initial_change_number: 0,
            full_undo_impossible: false,
            inside_redo: false,
        }
    }

    /// Record a change. Inside a block it joins the block; otherwise it is its own action.
    pub fn add_change(
        &mut self,
        reason: ChangeReason,
        start: BufferCoord,
        end: BufferCoord,
        text: Vec<String>,
        selection_mode: SelectionMode,
    ) {
        let change_number = if self.in_block() {
            self.block_change_number
        } else {
            self.take_change_number()
        };
        self.push(UndoItem::new(
            reason,
            selection_mode,
            start,
            end,
            text,
            change_number,
        ));
    }

    /// Push back an item popped from the redo list, keeping its change number.
    pub fn restore_change(&mut self, item: UndoItem) {
        if item.change_number >= self.next_change_number {
            self.next_change_number = item.change_number + 1;
        }
        self.push(item);
    }

    /// Insert a boundary marker, unless the list is empty or already ends with one.
    pub fn add_group_break(&mut self) {
        if !self.can_undo() || self.last_change_reason() == ChangeReason::GroupBreak {
            return;
        }
        self.add_change(
            ChangeReason::GroupBreak,
            BufferCoord::default(),
            BufferCoord::default(),
            Vec::new(),
            SelectionMode::Normal,
        );
    }

    /// Open a block. Blocks nest; only the outermost one allocates a change number.
    pub fn begin_block(&mut self) {
        self.block_lock += 1;
        if self.block_lock == 1 {
            self.block_change_number = self.take_change_number();
        }
    }

    /// Close a block. Unbalanced calls are ignored.
    pub fn end_block(&mut self) {
        self.block_lock = self.block_lock.saturating_sub(1);
    }

    pub fn in_block(&self) -> bool {
        self.block_lock > 0
    }

    /// Drop all history and reset the truncation flag.
    pub fn clear(&mut self) {
        self.items.clear();
        self.block_count = 0;
        self.memory_usage = 0;
        self.block_lock = 0;
        self.initial_change_number = 0;
        self.full_undo_impossible = false;
    }

    /// Reason of the newest item, or [`ChangeReason::Nothing`].
    pub fn last_change_reason(&self) -> ChangeReason {
        self.items
            .back()
            .map_or(ChangeReason::Nothing, UndoItem::reason)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn peek_item(&self) -> Option<&UndoItem> {
        self.items.back()
    }

    /// Remove and return the newest item.
    pub fn pop_item(&mut self) -> Option<UndoItem> {
        let item = self.items.pop_back()?;
        self.memory_usage = self.memory_usage.saturating_sub(item.memory_usage);
        if item.counts_as_action() && !self.tail_has_action(item.change_number) {
            self.block_count = self.block_count.saturating_sub(1);
        }
        Some(item)
    }

    /// Whether any real change is held; group breaks alone do not count.
    pub fn can_undo(&self) -> bool {
        self.items.iter().any(UndoItem::counts_as_action)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of user actions held.
    pub fn action_count(&self) -> usize {
        self.block_count
    }

    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    pub fn limits(&self) -> UndoLimits {
        self.limits
    }

    pub fn max_undo_actions(&self) -> usize {
        self.limits.max_undo_actions
    }

    /// Set the action ceiling (`0` = unlimited), evicting immediately if needed.
    pub fn set_max_undo_actions(&mut self, max: usize) {
        self.limits.max_undo_actions = max;
        self.ensure_max_entries();
    }

    pub fn max_memory_usage(&self) -> usize {
        self.limits.max_memory_usage
    }

    /// Set the memory ceiling in bytes (`0` = unlimited), evicting immediately if needed.
    pub fn set_max_memory_usage(&mut self, bytes: usize) {
        self.limits.max_memory_usage = bytes;
        self.ensure_max_entries();
    }

    /// Whether the current position is the one marked by [`Self::set_initial_state`].
    pub fn initial_state(&self) -> bool {
        self.top_change_number() == self.initial_change_number
    }

    /// Mark the current position as unmodified.
    pub fn set_initial_state(&mut self) {
        self.initial_change_number = self.top_change_number();
    }

    pub fn inside_redo(&self) -> bool {
        self.inside_redo
    }

    pub fn set_inside_redo(&mut self, inside_redo: bool) {
        self.inside_redo = inside_redo;
    }

    /// Whether old history was evicted, so undoing back to the start is no longer possible.
    ///
    /// Stays set until [`Self::clear`].
    pub fn full_undo_impossible(&self) -> bool {
        self.full_undo_impossible
    }

    fn take_change_number(&mut self) -> u64 {
        let number = self.next_change_number;
        self.next_change_number += 1;
        number
    }

    /// Change number of the newest real change; trailing group breaks do not count.
    fn top_change_number(&self) -> u64 {
        self.items
            .iter()
            .rev()
            .find(|item| item.counts_as_action())
            .map_or(0, UndoItem::change_number)
    }

    /// Whether the tail run of items numbered `change_number` contains a real change.
    fn tail_has_action(&self, change_number: u64) -> bool {
        self.items
            .iter()
            .rev()
            .take_while(|item| item.change_number == change_number)
            .any(UndoItem::counts_as_action)
    }

    fn push(&mut self, item: UndoItem) {
        if item.counts_as_action() && !self.tail_has_action(item.change_number) {
            self.block_count += 1;
        }
        self.memory_usage += item.memory_usage;
        self.items.push_back(item);
        self.ensure_max_entries();
    }

    fn over_limits(&self) -> bool {
        let UndoLimits {
            max_undo_actions,
            max_memory_usage,
        } = self.limits;
        (max_undo_actions > 0 && self.block_count > max_undo_actions)
            || (max_memory_usage > 0 && self.memory_usage > max_memory_usage)
    }

    fn ensure_max_entries(&mut self) {
        if !self.over_limits() {
            return;
        }
        self.full_undo_impossible = true;
        let mut evicted = 0usize;
        while self.over_limits() {
            let Some(change_number) = self.items.front().map(UndoItem::change_number) else {
                break;
            };
            let mut had_action = false;
            while let Some(front) = self.items.front() {
                if front.change_number != change_number {
                    break;
                }
                had_action |= front.counts_as_action();
                self.memory_usage = self.memory_usage.saturating_sub(front.memory_usage);
                self.items.pop_front();
                evicted += 1;
            }
            if had_action {
                self.block_count = self.block_count.saturating_sub(1);
            }
        }
        tracing::debug!(
            evicted,
            actions = self.block_count,
            memory_usage = self.memory_usage,
            "undo history truncated"
        );
    }
}

/// The redo side of the change log.
#[derive(Debug, Default)]
pub struct RedoList {
    items: Vec<UndoItem>,
}

impl RedoList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an item to redo, keeping its change number.
    pub fn add_redo(&mut self, item: UndoItem) {
        self.items.push(item);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Reason of the newest item, or [`ChangeReason::Nothing`].
    pub fn last_change_reason(&self) -> ChangeReason {
        self.items
            .last()
            .map_or(ChangeReason::Nothing, UndoItem::reason)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn peek_item(&self) -> Option<&UndoItem> {
        self.items.last()
    }

    pub fn pop_item(&mut self) -> Option<UndoItem> {
        self.items.pop()
    }

    pub fn can_redo(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize, ch: usize) -> BufferCoord {
        BufferCoord::new(line, ch)
    }

    fn insert(list: &mut UndoList, text: &str) {
        list.add_change(
            ChangeReason::Insert,
            at(0, 0),
            at(0, text.chars().count()),
            vec![text.to_string()],
            SelectionMode::Normal,
        );
    }

    #[test]
    fn test_entry_cap_evicts_oldest() {
        let mut list = UndoList::new(UndoLimits::UNLIMITED.with_max_undo_actions(2));
        insert(&mut list, "a");
        insert(&mut list, "b");
        assert!(!list.full_undo_impossible());
        insert(&mut list, "c");

        assert_eq!(list.item_count(), 2);
        assert!(list.full_undo_impossible());
        assert_eq!(list.pop_item().unwrap().text(), ["c".to_string()]);
        assert_eq!(list.pop_item().unwrap().text(), ["b".to_string()]);
        assert!(list.pop_item().is_none());
        assert!(list.full_undo_impossible());

        list.clear();
        assert!(!list.full_undo_impossible());
    }

    #[test]
    fn test_block_shares_change_number_and_counts_once() {
        let mut list = UndoList::new(UndoLimits::UNLIMITED);
        list.begin_block();
        insert(&mut list, "a");
        list.begin_block();
        insert(&mut list, "b");
        list.end_block();
        insert(&mut list, "c");
        list.end_block();
        insert(&mut list, "d");

        assert_eq!(list.item_count(), 4);
        assert_eq!(list.action_count(), 2);
        let numbers: Vec<u64> = list.items.iter().map(UndoItem::change_number).collect();
        assert_eq!(numbers[0], numbers[1]);
        assert_eq!(numbers[1], numbers[2]);
        assert!(numbers[3] > numbers[2]);

        list.pop_item();
        assert_eq!(list.action_count(), 1);
        list.pop_item();
        assert_eq!(list.action_count(), 1);
        list.pop_item();
        list.pop_item();
        assert_eq!(list.action_count(), 0);
    }

    #[test]
    fn test_block_eviction_removes_whole_block() {
        let mut list = UndoList::new(UndoLimits::UNLIMITED.with_max_undo_actions(1));
        list.begin_block();
        insert(&mut list, "a");
        insert(&mut list, "b");
        list.end_block();
        insert(&mut list, "c");

        assert_eq!(list.item_count(), 1);
        assert_eq!(list.action_count(), 1);
        assert_eq!(list.peek_item().unwrap().text(), ["c".to_string()]);
    }

    #[test]
    fn test_memory_cap() {
        let one = UndoItem::new(
            ChangeReason::Insert,
            SelectionMode::Normal,
            at(0, 0),
            at(0, 1),
            vec!["x".to_string()],
            0,
        )
        .memory_usage();
        let mut list = UndoList::new(UndoLimits::UNLIMITED.with_max_memory_usage(one * 2));
        insert(&mut list, "x");
        insert(&mut list, "y");
        assert_eq!(list.memory_usage(), one * 2);
        assert!(!list.full_undo_impossible());
        insert(&mut list, "z");
        assert_eq!(list.item_count(), 2);
        assert!(list.memory_usage() <= one * 2);
        assert!(list.full_undo_impossible());
    }

    #[test]
    fn test_lowering_cap_evicts_immediately() {
        let mut list = UndoList::new(UndoLimits::UNLIMITED);
        for text in ["a", "b", "c", "d"] {
            insert(&mut list, text);
        }
        list.set_max_undo_actions(1);
        assert_eq!(list.item_count(), 1);
        assert!(list.full_undo_impossible());
    }

    #[test]
    fn test_group_break_rules() {
        let mut list = UndoList::default();
        list.add_group_break();
        assert!(list.is_empty());

        insert(&mut list, "a");
        list.add_group_break();
        list.add_group_break();
        assert_eq!(list.item_count(), 2);
        assert_eq!(list.last_change_reason(), ChangeReason::GroupBreak);
        assert_eq!(list.action_count(), 1);
    }

    #[test]
    fn test_initial_state_tracking() {
        let mut list = UndoList::default();
        assert!(list.initial_state());
        insert(&mut list, "a");
        assert!(!list.initial_state());
        list.set_initial_state();
        assert!(list.initial_state());
        let item = list.pop_item().unwrap();
        assert!(!list.initial_state());
        list.restore_change(item);
        assert!(list.initial_state());
        list.add_group_break();
        assert!(list.initial_state());
    }

    #[test]
    fn test_restore_keeps_numbers_monotonic() {
        let mut list = UndoList::default();
        insert(&mut list, "a");
        let item = list.pop_item().unwrap();
        let number = item.change_number();
        list.restore_change(item);
        insert(&mut list, "b");
        assert!(list.peek_item().unwrap().change_number() > number);
    }

    #[test]
    fn test_redo_list() {
        let mut redo = RedoList::new();
        assert!(!redo.can_redo());
        assert_eq!(redo.last_change_reason(), ChangeReason::Nothing);
        redo.add_redo(UndoItem::new(
            ChangeReason::Delete,
            SelectionMode::Line,
            at(1, 0),
            at(1, 0),
            vec!["gone".to_string()],
            7,
        ));
        assert_eq!(redo.item_count(), 1);
        assert_eq!(redo.peek_item().unwrap().change_number(), 7);
        assert_eq!(redo.last_change_reason(), ChangeReason::Delete);
        assert_eq!(
            redo.pop_item().unwrap().selection_mode(),
            SelectionMode::Line
        );
        assert!(redo.is_empty());
    }
}
