//! 選択状態の取り消し・やり直し
//!
//! スナップショット列とカーソルで線形の履歴を持つ。常に「現在」のエントリが1つある。
//! 取り消し後に新しい変更を積むと、カーソルより先（やり直し側）は捨てる。

use std::collections::{BTreeSet, VecDeque};

/// 選択状態のスナップショット
pub type SelectionSnapshot = BTreeSet<String>;

/// 既定の履歴上限
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct SelectionHistory {
    entries: VecDeque<SelectionSnapshot>,
    cursor: usize,
    limit: usize,
}

impl Default for SelectionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl SelectionHistory {
    /// 空の選択を現在エントリとして作る。`limit` は最低2
    pub fn new(limit: usize) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(SelectionSnapshot::new());
        Self {
            entries,
            cursor: 0,
            limit: limit.max(2),
        }
    }

    pub fn current(&self) -> &SelectionSnapshot {
        &self.entries[self.cursor]
    }

    /// 変更を積む。現在と同じなら何もしない（false）
    pub fn push(&mut self, snapshot: SelectionSnapshot) -> bool {
        if &snapshot == self.current() {
            return false;
        }

        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(snapshot);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
        true
    }

    /// 履歴を捨てて基準状態から始め直す（カタログ再構築時）
    pub fn reset(&mut self, baseline: SelectionSnapshot) {
        self.entries.clear();
        self.entries.push_back(baseline);
        self.cursor = 0;
    }

    pub fn undo(&mut self) -> Option<&SelectionSnapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor])
    }

    pub fn redo(&mut self) -> Option<&SelectionSnapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(&self.entries[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(ids: &[&str]) -> SelectionSnapshot {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_starts_with_empty_current() {
        let history = SelectionHistory::default();
        assert!(history.current().is_empty());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = SelectionHistory::default();
        let states = [snap(&["a"]), snap(&["a", "b"]), snap(&["b"]), snap(&[])];
        for s in &states {
            assert!(history.push(s.clone()));
        }
        let top = history.current().clone();

        for _ in 0..states.len() {
            assert!(history.undo().is_some());
        }
        assert!(history.current().is_empty());
        assert!(history.undo().is_none());

        for _ in 0..states.len() {
            assert!(history.redo().is_some());
        }
        assert_eq!(history.current(), &top);
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_duplicate_push_is_noop() {
        let mut history = SelectionHistory::default();
        assert!(history.push(snap(&["a"])));
        assert!(!history.push(snap(&["a"])));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_push_truncates_redo() {
        let mut history = SelectionHistory::default();
        history.push(snap(&["a"]));
        history.push(snap(&["b"]));
        history.undo();
        history.push(snap(&["c"]));
        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        history.undo();
        assert_eq!(history.current(), &snap(&["a"]));
    }

    #[test]
    fn test_reset_discards_history() {
        let mut history = SelectionHistory::default();
        history.push(snap(&["a"]));
        history.push(snap(&["b"]));
        history.reset(snap(&["b"]));
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
        assert_eq!(history.current(), &snap(&["b"]));
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut history = SelectionHistory::new(3);
        for id in ["a", "b", "c", "d"] {
            history.push(snap(&[id]));
        }
        assert_eq!(history.len(), 3);
        history.undo();
        history.undo();
        assert_eq!(history.current(), &snap(&["b"]));
        assert!(history.undo().is_none());
    }
}
