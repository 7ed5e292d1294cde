//! ブラシ（ドラッグでの塗り選択）
//!
//! ## 状態遷移
//! - `Idle` --押下--> `Armed`（まだ選択は変えない）
//! - `Armed` --別のエリアに進入--> `Dragging`（起点と進入先に方向を適用）
//! - `Dragging` --進入--> 未訪問のエリアにだけ方向を適用
//! - `Armed` --離す--> 通常のクリック（起点をトグル）
//! - `Dragging` --離す--> 変更があれば履歴に1件だけ積む
//!
//! 方向は押下時に決まる。起点が選択済みなら「外す」、未選択なら「加える」。

use crate::history::SelectionSnapshot;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushDirection {
    Add,
    Remove,
}

impl BrushDirection {
    /// 適用して選択が変わったら true
    fn apply(self, selection: &mut SelectionSnapshot, zone_id: &str) -> bool {
        match self {
            BrushDirection::Add => selection.insert(zone_id.to_string()),
            BrushDirection::Remove => selection.remove(zone_id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BrushState {
    #[default]
    Idle,
    Armed {
        origin: String,
        direction: BrushDirection,
    },
    Dragging {
        direction: BrushDirection,
        visited: HashSet<String>,
        changed: bool,
    },
}

/// ジェスチャ終了時の扱い
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrushOutcome {
    /// 何もしない
    Nothing,
    /// 動かさずに離した: 起点をクリック扱い
    Click(String),
    /// ドラッグで選択が変わった: 履歴に1件積む
    Commit,
}

#[derive(Debug, Clone, Default)]
pub struct BrushSelector {
    state: BrushState,
}

impl BrushSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BrushState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, BrushState::Idle)
    }

    /// 押下。選択可能なエリアかどうかは呼び出し側で判定済み
    pub fn pointer_down(&mut self, zone_id: &str, selection: &SelectionSnapshot) {
        let direction = if selection.contains(zone_id) {
            BrushDirection::Remove
        } else {
            BrushDirection::Add
        };
        self.state = BrushState::Armed {
            origin: zone_id.to_string(),
            direction,
        };
    }

    /// エリアへの進入。`eligible` が false のエリアは訪問済みにもしない
    pub fn pointer_enter<F>(&mut self, zone_id: &str, selection: &mut SelectionSnapshot, eligible: F)
    where
        F: Fn(&str) -> bool,
    {
        if !eligible(zone_id) {
            return;
        }

        match &mut self.state {
            BrushState::Idle => {}
            BrushState::Armed { origin, direction } => {
                if origin == zone_id {
                    return;
                }
                let origin = origin.clone();
                let direction = *direction;
                let mut visited = HashSet::new();
                let mut changed = false;
                for id in [origin.as_str(), zone_id] {
                    visited.insert(id.to_string());
                    changed |= direction.apply(selection, id);
                }
                self.state = BrushState::Dragging {
                    direction,
                    visited,
                    changed,
                };
            }
            BrushState::Dragging {
                direction,
                visited,
                changed,
            } => {
                if visited.insert(zone_id.to_string()) {
                    *changed |= direction.apply(selection, zone_id);
                }
            }
        }
    }

    /// 離す
    pub fn pointer_up(&mut self) -> BrushOutcome {
        match std::mem::take(&mut self.state) {
            BrushState::Idle => BrushOutcome::Nothing,
            BrushState::Armed { origin, .. } => BrushOutcome::Click(origin),
            BrushState::Dragging { changed: true, .. } => BrushOutcome::Commit,
            BrushState::Dragging { changed: false, .. } => BrushOutcome::Nothing,
        }
    }

    /// 中断（カタログ再構築時など）。ドラッグ中だった場合 true
    ///
    /// 途中で選択に加えた変更は戻さないので、true なら呼び出し側が押下前の選択に戻す。
    pub fn cancel(&mut self) -> bool {
        matches!(std::mem::take(&mut self.state), BrushState::Dragging { .. })
    }
}
