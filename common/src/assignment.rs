//! デポ割当の保持
//!
//! ## 2つのテーブル
//! - `full`: 読み込んだ全地域のエリアに対する割当（正）
//! - `visible`: 現在表示中のカタログに属するエリアだけを `full` から抜き出したもの
//!
//! 地域を非表示にしても `full` 側に割当が残るため、再表示で元に戻る。
//! `initial` は元データ読み込み時の割当で、リセットに使う。

use crate::catalog::ZoneCatalog;
use crate::csv::{parse_csv_rows, HeaderIndex};
use crate::depot::{normalize_depot_code, DepotCode};
use crate::error::{Error, Result};
use crate::keys::overrides;
use crate::scope::InScopeSet;
use std::collections::BTreeMap;

pub type AssignmentTable = BTreeMap<String, Option<DepotCode>>;

/// 割当の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentStats {
    pub total: usize,
    pub assigned: usize,
    pub unassigned: usize,
    pub by_depot: BTreeMap<DepotCode, usize>,
}

/// 初期状態からの変更
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentChange {
    pub zone_id: String,
    pub before: Option<DepotCode>,
    pub after: Option<DepotCode>,
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentStore {
    full: AssignmentTable,
    visible: AssignmentTable,
    initial: AssignmentTable,
    fingerprint: Option<String>,
}

impl AssignmentStore {
    /// 全地域のカタログから初期割当を取り込む（初期スナップショットもここで確定）
    pub fn seed(full_catalog: &ZoneCatalog, fingerprint: Option<&str>) -> Self {
        let full: AssignmentTable = full_catalog
            .ids()
            .map(|id| {
                let seed = full_catalog.seeds().get(id).copied().flatten();
                (id.to_string(), seed)
            })
            .collect();

        tracing::debug!(
            zones = full.len(),
            seeded = full.values().filter(|v| v.is_some()).count(),
            "assignment store seeded"
        );

        Self {
            initial: full.clone(),
            visible: AssignmentTable::new(),
            full,
            fingerprint: fingerprint.map(str::to_string),
        }
    }

    /// 元データの指紋（同一データの再読込判定に使う）
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// 表示中カタログに合わせて `visible` を作り直す
    ///
    /// `full` にないIDは（連番IDのずれ等）カタログの初期デポで補う。
    /// 既存の割当や初期スナップショットは上書きしない。
    pub fn sync_visible(&mut self, catalog: &ZoneCatalog) {
        for id in catalog.ids() {
            if !self.full.contains_key(id) {
                let seed = catalog.seeds().get(id).copied().flatten();
                self.full.insert(id.to_string(), seed);
                self.initial.entry(id.to_string()).or_insert(seed);
            }
        }

        self.visible = catalog
            .ids()
            .map(|id| (id.to_string(), self.full.get(id).copied().flatten()))
            .collect();
    }

    pub fn get(&self, zone_id: &str) -> Option<DepotCode> {
        self.visible.get(zone_id).copied().flatten()
    }

    /// 割当（`None` は割当解除）
    ///
    /// カタログにないIDはエラー。運用対象外の市区町村は何もせず `Ok(false)`。
    pub fn set(
        &mut self,
        catalog: &ZoneCatalog,
        scope: &InScopeSet,
        zone_id: &str,
        depot: Option<DepotCode>,
    ) -> Result<bool> {
        let zone = catalog
            .get(zone_id)
            .ok_or_else(|| Error::UnknownZone(zone_id.to_string()))?;
        if !scope.contains(&zone.municipality) {
            return Ok(false);
        }

        self.full.insert(zone_id.to_string(), depot);
        self.visible.insert(zone_id.to_string(), depot);
        Ok(true)
    }

    /// 初期スナップショットに戻す
    pub fn reset_to_initial(&mut self, catalog: &ZoneCatalog) {
        self.full = self.initial.clone();
        self.sync_visible(catalog);
    }

    pub fn visible(&self) -> &AssignmentTable {
        &self.visible
    }

    pub fn full(&self) -> &AssignmentTable {
        &self.full
    }

    pub fn initial(&self) -> &AssignmentTable {
        &self.initial
    }

    /// 表示中エリアの集計
    pub fn stats(&self) -> AssignmentStats {
        let mut stats = AssignmentStats {
            total: self.visible.len(),
            ..Default::default()
        };
        for depot in DepotCode::ALL {
            stats.by_depot.insert(depot, 0);
        }
        for depot in self.visible.values().flatten() {
            stats.assigned += 1;
            *stats.by_depot.entry(*depot).or_insert(0) += 1;
        }
        stats.unassigned = stats.total - stats.assigned;
        stats
    }

    /// 初期状態から割当が変わったエリア（全地域、ID順）
    pub fn changes_since_initial(&self) -> Vec<AssignmentChange> {
        self.full
            .iter()
            .filter_map(|(id, &after)| {
                let before = self.initial.get(id).copied().flatten();
                (before != after).then(|| AssignmentChange {
                    zone_id: id.clone(),
                    before,
                    after,
                })
            })
            .collect()
    }
}

/// 割当CSV（area_id, depot_code）を読み込む
///
/// デポ列が空の行は割当解除、判別できないデポ表記の行は読み飛ばす。
pub fn parse_assignment_overrides(content: &str) -> Result<Vec<(String, Option<DepotCode>)>> {
    let rows = parse_csv_rows(content);
    let Some((header, body)) = rows.split_first() else {
        return Ok(Vec::new());
    };
    let header = HeaderIndex::new(header);
    if !header.has_any(overrides::AREA_ID) {
        return Err(Error::InputFormat("割当CSVに area_id 列がありません".into()));
    }

    let mut out = Vec::new();
    for row in body {
        let Some(id) = header.pick(row, overrides::AREA_ID) else {
            continue;
        };
        match header.pick(row, overrides::DEPOT) {
            None => out.push((id.to_string(), None)),
            Some(raw) => match normalize_depot_code(raw) {
                Some(depot) => out.push((id.to_string(), Some(depot))),
                None => tracing::warn!(zone = id, depot = raw, "unrecognized depot in override row"),
            },
        }
    }
    Ok(out)
}
