//! 割当セッション
//!
//! カタログ・割当・選択・履歴をひとまとめに持つ状態オブジェクト。
//! 画面側（地図描画・REPL）はこのオブジェクトの問い合わせと操作だけを使う。
//!
//! ## 処理フロー
//! 1. `load_source` で詳細度ごとの元データを取り込む（初期割当を確定）
//! 2. `rebuild` で表示中の地域だけのカタログ・検索インデックスを作る
//! 3. 選択（クリック・ブラシ・検索ジャンプ）→ `assign_selected`
//! 4. `export_rows` で結果を出力
//!
//! 地域の表示切替・詳細度の切替は `rebuild_pending` を立てるだけで、
//! 実際の再構築は呼び出し側（スケジューラ）が `flush` でまとめて行う。

use crate::assignment::{parse_assignment_overrides, AssignmentStats, AssignmentStore};
use crate::brush::{BrushOutcome, BrushSelector};
use crate::canonical::{canonical_municipality, format_postal_codes};
use crate::catalog::{CatalogOptions, RegionVisibility, ZoneCatalog};
use crate::collate;
use crate::depot::DepotCode;
use crate::error::{Error, Result};
use crate::export::{change_rows, export_rows, ChangeRow, ExportRow};
use crate::zip_report::{area_changes, zip_reassignment, AreaNameIndex, ZipChangeRow};
use crate::geojson::{parse_zone_source, region_of};
use crate::history::{SelectionHistory, SelectionSnapshot, DEFAULT_HISTORY_LIMIT};
use crate::identity::Record;
use crate::reconcile::ReconciliationIndex;
use crate::scope::InScopeSet;
use crate::search::NameSearchIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// 町丁目表示に切り替える既定のズーム
pub const DEFAULT_TOWN_DETAIL_MIN_ZOOM: f64 = 13.0;

/// 表示の詳細度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// 市区町村（行政区域）単位
    Municipality,
    /// 町丁目単位
    Town,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Municipality => "municipality",
            DetailLevel::Town => "town",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            DetailLevel::Municipality => DetailLevel::Town,
            DetailLevel::Town => DetailLevel::Municipality,
        }
    }

    /// ズームから詳細度を決める
    pub fn for_zoom(zoom: f64, town_min_zoom: f64) -> Self {
        if zoom >= town_min_zoom {
            DetailLevel::Town
        } else {
            DetailLevel::Municipality
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// セッション設定
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub history_limit: usize,
    pub town_detail_min_zoom: f64,
    /// 初期表示する地域（None なら全地域）
    pub visible_regions: Option<Vec<String>>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            town_detail_min_zoom: DEFAULT_TOWN_DETAIL_MIN_ZOOM,
            visible_regions: None,
        }
    }
}

/// 描画側に渡すスタイル入力
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleInputs {
    pub selected: bool,
    pub assigned_depot: Option<DepotCode>,
    pub in_scope: bool,
    /// 市区町村フィルタで薄く表示する
    pub filtered_out: bool,
}

/// ラベル表示用
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneLabel {
    pub display_name: String,
    pub dispatch_label: String,
    pub municipality: String,
    pub postal_codes_formatted: String,
}

/// 元データ読込の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub level: DetailLevel,
    pub records: usize,
    /// 同一データの再読込で割当を引き継いだ
    pub reused_assignments: bool,
}

/// 割当CSV適用の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideReport {
    pub applied: usize,
    pub unknown_zone: usize,
    pub out_of_scope: usize,
}

/// 詳細度ごとの元データと割当
#[derive(Debug, Clone)]
struct DetailLayer {
    records: Vec<Record>,
    regions: BTreeSet<String>,
    assignments: AssignmentStore,
}

/// 先読み済みカタログ
#[derive(Debug, Clone)]
struct Prewarmed {
    level: DetailLevel,
    visibility: RegionVisibility,
    catalog: ZoneCatalog,
    search: NameSearchIndex,
}

#[derive(Debug)]
pub struct ZoningSession {
    options: SessionOptions,
    layers: HashMap<DetailLevel, DetailLayer>,
    active: DetailLevel,
    zoom: Option<f64>,
    reconciliation: ReconciliationIndex,
    scope: InScopeSet,
    visibility: RegionVisibility,
    seen_regions: BTreeSet<String>,
    catalog: ZoneCatalog,
    search: NameSearchIndex,
    selection: SelectionSnapshot,
    history: SelectionHistory,
    brush: BrushSelector,
    municipality_filter: Option<String>,
    prewarmed: Option<Prewarmed>,
    rebuild_pending: bool,
}

impl Default for ZoningSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl ZoningSession {
    pub fn new(options: SessionOptions) -> Self {
        let history = SelectionHistory::new(options.history_limit);
        Self {
            options,
            layers: HashMap::new(),
            active: DetailLevel::Municipality,
            zoom: None,
            reconciliation: ReconciliationIndex::empty(),
            scope: InScopeSet::default(),
            visibility: RegionVisibility::default(),
            seen_regions: BTreeSet::new(),
            catalog: ZoneCatalog::default(),
            search: NameSearchIndex::default(),
            selection: SelectionSnapshot::new(),
            history,
            brush: BrushSelector::new(),
            municipality_filter: None,
            prewarmed: None,
            rebuild_pending: false,
        }
    }

    // ------------------------------------------------------------------
    // 入力
    // ------------------------------------------------------------------

    /// 元データ（GeoJSON / レコード配列）を取り込む
    ///
    /// 不正な入力はエラーを返し、現在のカタログは変えない。
    /// `fingerprint` が前回と同じなら割当と初期スナップショットを引き継ぐ。
    pub fn load_source(&mut self, level: DetailLevel, text: &str, fingerprint: &str) -> Result<LoadSummary> {
        let records = parse_zone_source(text)?;
        let regions: BTreeSet<String> = records.iter().filter_map(region_of).collect();

        let reused = self
            .layers
            .get(&level)
            .and_then(|layer| layer.assignments.fingerprint())
            .is_some_and(|fp| fp == fingerprint);

        let assignments = match self.layers.remove(&level) {
            Some(layer) if reused => layer.assignments,
            _ => {
                let full = ZoneCatalog::build(&records, self.catalog_options(None));
                AssignmentStore::seed(&full, Some(fingerprint))
            }
        };

        self.register_regions(&regions);
        let summary = LoadSummary {
            level,
            records: records.len(),
            reused_assignments: reused,
        };
        self.layers.insert(
            level,
            DetailLayer {
                records,
                regions,
                assignments,
            },
        );
        self.prewarmed = None;

        tracing::info!(
            level = %level,
            records = summary.records,
            reused = summary.reused_assignments,
            "zone source loaded"
        );

        if level == self.active {
            self.rebuild();
        }
        Ok(summary)
    }

    /// 初めて見る地域に初期表示設定を適用
    fn register_regions(&mut self, regions: &BTreeSet<String>) {
        for region in regions {
            if !self.seen_regions.insert(region.clone()) {
                continue;
            }
            if let Some(visible) = &self.options.visible_regions {
                if !visible.iter().any(|v| v == region) {
                    self.visibility.set_visible(region, false);
                }
            }
        }
    }

    /// 配車エリア表を差し替える（全置換）
    pub fn set_reference(&mut self, index: ReconciliationIndex) {
        self.reconciliation = index;
        self.prewarmed = None;
        self.rebuild();
    }

    /// 運用対象を差し替える。対象外になった選択は落とし、履歴はそこから始め直す
    pub fn set_in_scope(&mut self, scope: InScopeSet) {
        self.scope = scope;
        self.cancel_brush();
        self.retain_selectable();
        self.history.reset(self.selection.clone());
    }

    pub fn in_scope(&self) -> &InScopeSet {
        &self.scope
    }

    /// 割当CSVを一括適用
    pub fn apply_overrides(&mut self, text: &str) -> Result<OverrideReport> {
        let rows = parse_assignment_overrides(text)?;
        let mut report = OverrideReport::default();
        let Some(layer) = self.layers.get_mut(&self.active) else {
            report.unknown_zone = rows.len();
            return Ok(report);
        };

        for (id, depot) in rows {
            match layer.assignments.set(&self.catalog, &self.scope, &id, depot) {
                Ok(true) => report.applied += 1,
                Ok(false) => report.out_of_scope += 1,
                Err(_) => report.unknown_zone += 1,
            }
        }
        tracing::info!(
            applied = report.applied,
            unknown = report.unknown_zone,
            out_of_scope = report.out_of_scope,
            "assignment overrides applied"
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // 表示切替・再構築
    // ------------------------------------------------------------------

    fn catalog_options<'a>(&'a self, visibility: Option<&'a RegionVisibility>) -> CatalogOptions<'a> {
        CatalogOptions {
            reconciliation: Some(&self.reconciliation),
            visibility,
        }
    }

    /// 地域の表示切替。変化があれば再構築待ちにする
    pub fn set_region_visible(&mut self, region: &str, visible: bool) -> bool {
        let changed = self.visibility.set_visible(region, visible);
        if changed {
            self.rebuild_pending = true;
        }
        changed
    }

    pub fn visibility(&self) -> &RegionVisibility {
        &self.visibility
    }

    /// 読込済みの全地域
    pub fn regions(&self) -> BTreeSet<String> {
        self.layers.values().flat_map(|l| l.regions.iter().cloned()).collect()
    }

    /// ズーム変更。詳細度が変われば再構築待ちにする
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        self.zoom = Some(zoom);
        let level = DetailLevel::for_zoom(zoom, self.options.town_detail_min_zoom);
        self.switch_detail(level)
    }

    pub fn zoom(&self) -> Option<f64> {
        self.zoom
    }

    /// 詳細度の切替。データ未読込の詳細度には切り替えない
    pub fn switch_detail(&mut self, level: DetailLevel) -> bool {
        if level == self.active || !self.layers.contains_key(&level) {
            return false;
        }
        self.active = level;
        self.rebuild_pending = true;
        true
    }

    pub fn active_level(&self) -> DetailLevel {
        self.active
    }

    pub fn is_loaded(&self, level: DetailLevel) -> bool {
        self.layers.contains_key(&level)
    }

    pub fn rebuild_pending(&self) -> bool {
        self.rebuild_pending
    }

    /// 再構築待ちなら再構築する
    pub fn flush(&mut self) -> bool {
        if self.rebuild_pending {
            self.rebuild();
            true
        } else {
            false
        }
    }

    /// 表示中カタログを作り直す
    ///
    /// 選択は新しいカタログにあるものだけ残し、履歴はそこから始め直す。
    pub fn rebuild(&mut self) {
        self.rebuild_pending = false;
        self.cancel_brush();

        let level = self.active;
        let prewarmed = self
            .prewarmed
            .take()
            .filter(|p| p.level == level && p.visibility == self.visibility);

        let (catalog, search) = match prewarmed {
            Some(p) => {
                tracing::debug!(level = %level, "using prewarmed catalog");
                (p.catalog, p.search)
            }
            None => match self.layers.get(&level) {
                Some(layer) => {
                    let catalog = ZoneCatalog::build(&layer.records, self.catalog_options(Some(&self.visibility)));
                    let search = NameSearchIndex::build(&catalog);
                    (catalog, search)
                }
                None => (ZoneCatalog::default(), NameSearchIndex::default()),
            },
        };

        if let Some(layer) = self.layers.get_mut(&level) {
            layer.assignments.sync_visible(&catalog);
        }
        self.catalog = catalog;
        self.search = search;

        if let Some(filter) = &self.municipality_filter {
            if !self.catalog.iter().any(|z| &z.municipality == filter) {
                self.municipality_filter = None;
            }
        }

        self.retain_selectable();
        self.history.reset(self.selection.clone());

        tracing::debug!(
            level = %level,
            zones = self.catalog.len(),
            selected = self.selection.len(),
            "catalog rebuilt"
        );
    }

    /// カタログ外・対象外の選択を落とす
    fn retain_selectable(&mut self) {
        let catalog = &self.catalog;
        let scope = &self.scope;
        self.selection.retain(|id| {
            catalog
                .get(id)
                .is_some_and(|z| scope.contains(&z.municipality))
        });
    }

    /// もう一方の詳細度のカタログを先に作っておく
    ///
    /// 未読込なら何もしない（false）。
    pub fn prewarm(&mut self) -> bool {
        let level = self.active.other();
        let Some(layer) = self.layers.get(&level) else {
            return false;
        };
        let catalog = ZoneCatalog::build(&layer.records, self.catalog_options(Some(&self.visibility)));
        let search = NameSearchIndex::build(&catalog);
        tracing::debug!(level = %level, zones = catalog.len(), "catalog prewarmed");
        self.prewarmed = Some(Prewarmed {
            level,
            visibility: self.visibility.clone(),
            catalog,
            search,
        });
        true
    }

    pub fn is_prewarmed(&self, level: DetailLevel) -> bool {
        self.prewarmed.as_ref().is_some_and(|p| p.level == level)
    }

    // ------------------------------------------------------------------
    // 選択
    // ------------------------------------------------------------------

    /// 選択・割当できるエリアか
    pub fn is_selectable(&self, zone_id: &str) -> bool {
        self.catalog
            .get(zone_id)
            .is_some_and(|z| self.scope.contains(&z.municipality))
    }

    pub fn is_in_scope(&self, zone_id: &str) -> bool {
        self.catalog
            .get(zone_id)
            .map(|z| self.scope.contains(&z.municipality))
            .unwrap_or(false)
    }

    /// クリックでの選択トグル。対象外エリアは無視（false）
    pub fn toggle(&mut self, zone_id: &str) -> Result<bool> {
        if !self.catalog.contains(zone_id) {
            return Err(Error::UnknownZone(zone_id.to_string()));
        }
        if !self.is_selectable(zone_id) {
            return Ok(false);
        }
        if !self.selection.remove(zone_id) {
            self.selection.insert(zone_id.to_string());
        }
        self.history.push(self.selection.clone());
        Ok(true)
    }

    /// ドラッグ途中なら押下前の選択（履歴の現在エントリ）に戻す
    fn cancel_brush(&mut self) {
        if self.brush.cancel() {
            self.selection = self.history.current().clone();
        }
    }

    /// ブラシ開始。選択できないエリアでは開始しない
    pub fn brush_down(&mut self, zone_id: &str) -> bool {
        if !self.is_selectable(zone_id) {
            return false;
        }
        self.brush.pointer_down(zone_id, &self.selection);
        true
    }

    pub fn brush_enter(&mut self, zone_id: &str) {
        let catalog = &self.catalog;
        let scope = &self.scope;
        self.brush.pointer_enter(zone_id, &mut self.selection, |id| {
            catalog.get(id).is_some_and(|z| scope.contains(&z.municipality))
        });
    }

    /// ブラシ終了。クリック扱いならトグル、ドラッグで変化があれば履歴に1件
    pub fn brush_up(&mut self) -> Result<BrushOutcome> {
        let outcome = self.brush.pointer_up();
        match &outcome {
            BrushOutcome::Click(origin) => {
                self.toggle(origin)?;
            }
            BrushOutcome::Commit => {
                self.history.push(self.selection.clone());
            }
            BrushOutcome::Nothing => {}
        }
        Ok(outcome)
    }

    /// 選択を全解除
    pub fn clear_selection(&mut self) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        self.selection.clear();
        self.history.push(self.selection.clone());
        true
    }

    pub fn undo(&mut self) -> bool {
        self.cancel_brush();
        match self.history.undo() {
            Some(snapshot) => {
                self.selection = snapshot.clone();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_brush();
        match self.history.redo() {
            Some(snapshot) => {
                self.selection = snapshot.clone();
                true
            }
            None => false,
        }
    }

    pub fn selection(&self) -> &SelectionSnapshot {
        &self.selection
    }

    /// 選択中のID（日本語順）
    pub fn selected_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.selection.iter().cloned().collect();
        ids.sort_by(|a, b| collate::compare(a, b));
        ids
    }

    pub fn history(&self) -> &SelectionHistory {
        &self.history
    }

    // ------------------------------------------------------------------
    // 割当
    // ------------------------------------------------------------------

    /// 1エリアへの割当（`None` は解除）
    pub fn assign(&mut self, zone_id: &str, depot: Option<DepotCode>) -> Result<bool> {
        let layer = self
            .layers
            .get_mut(&self.active)
            .ok_or_else(|| Error::UnknownZone(zone_id.to_string()))?;
        layer.assignments.set(&self.catalog, &self.scope, zone_id, depot)
    }

    /// 選択中のエリアにデポを割り当てる。割り当てた件数を返す
    pub fn assign_selected(&mut self, depot_code: &str) -> Result<usize> {
        let depot = DepotCode::parse(depot_code)?;
        self.set_selected(Some(depot))
    }

    /// 選択中のエリアの割当を解除
    pub fn clear_assignment_for_selected(&mut self) -> Result<usize> {
        self.set_selected(None)
    }

    fn set_selected(&mut self, depot: Option<DepotCode>) -> Result<usize> {
        let ids: Vec<String> = self.selection.iter().cloned().collect();
        let mut count = 0;
        for id in ids {
            if self.assign(&id, depot)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// 初期割当に戻す
    pub fn reset_to_initial(&mut self) {
        if let Some(layer) = self.layers.get_mut(&self.active) {
            layer.assignments.reset_to_initial(&self.catalog);
        }
    }

    pub fn assignments(&self) -> Option<&AssignmentStore> {
        self.layers.get(&self.active).map(|l| &l.assignments)
    }

    pub fn stats(&self) -> AssignmentStats {
        self.assignments().map(|a| a.stats()).unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // 問い合わせ
    // ------------------------------------------------------------------

    pub fn catalog(&self) -> &ZoneCatalog {
        &self.catalog
    }

    pub fn style_inputs_for(&self, zone_id: &str) -> Option<StyleInputs> {
        let zone = self.catalog.get(zone_id)?;
        let filtered_out = self
            .municipality_filter
            .as_ref()
            .is_some_and(|f| &zone.municipality != f);
        Some(StyleInputs {
            selected: self.selection.contains(zone_id),
            assigned_depot: self.assignments().and_then(|a| a.get(zone_id)),
            in_scope: self.scope.contains(&zone.municipality),
            filtered_out,
        })
    }

    pub fn label_for(&self, zone_id: &str) -> Option<ZoneLabel> {
        let zone = self.catalog.get(zone_id)?;
        Some(ZoneLabel {
            display_name: zone.display_name.clone(),
            dispatch_label: zone.dispatch_label.clone(),
            municipality: zone.municipality.clone(),
            postal_codes_formatted: format_postal_codes(&zone.postal_codes),
        })
    }

    /// `名称 / ID / 市区町村`
    pub fn tooltip_for(&self, zone_id: &str) -> String {
        let Some(zone) = self.catalog.get(zone_id) else {
            return zone_id.to_string();
        };
        [zone.display_name.as_str(), zone_id, zone.municipality.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" / ")
    }

    /// `名称 [ID]`（名称がIDと同じならIDだけ）
    pub fn chip_label_for(&self, zone_id: &str) -> String {
        match self.catalog.get(zone_id) {
            Some(zone) if !zone.display_name.is_empty() && zone.display_name != zone_id => {
                format!("{} [{}]", zone.display_name, zone_id)
            }
            _ => zone_id.to_string(),
        }
    }

    pub fn search_zones(&self, query: &str) -> Vec<String> {
        self.search.search(&self.catalog, query)
    }

    /// 検索して対象内のヒットを選択に加える（履歴1件）。ヒット全体を返す
    pub fn jump_to(&mut self, query: &str) -> Vec<String> {
        let hits = self.search_zones(query);
        for id in &hits {
            if self.is_selectable(id) {
                self.selection.insert(id.clone());
            }
        }
        self.history.push(self.selection.clone());
        hits
    }

    /// 市区町村フィルタ（None・空文字で解除）
    pub fn set_municipality_filter(&mut self, municipality: Option<&str>) {
        self.municipality_filter = municipality
            .map(canonical_municipality)
            .filter(|m| !m.is_empty());
    }

    pub fn municipality_filter(&self) -> Option<&str> {
        self.municipality_filter.as_deref()
    }

    pub fn municipalities(&self) -> Vec<String> {
        self.catalog.municipalities()
    }

    // ------------------------------------------------------------------
    // エクスポート
    // ------------------------------------------------------------------

    pub fn export_rows(&self) -> Result<Vec<ExportRow>> {
        let assignments = self.assignments().ok_or(Error::EmptyCatalog)?;
        export_rows(&self.catalog, assignments.visible())
    }

    /// 初期状態から変わった割当（非表示地域を含む）
    pub fn change_rows(&self) -> Vec<ChangeRow> {
        self.assignments()
            .map(|a| change_rows(&self.catalog, &a.changes_since_initial()))
            .unwrap_or_default()
    }

    /// 郵便番号単位の変更レポート
    ///
    /// 非表示地域のエリアも突き合わせ対象にする。`asis_rows` は先頭行ヘッダ。
    pub fn zip_change_report(&self, asis_rows: &[Vec<String>], include_clear: bool) -> Result<ZipChangeReport> {
        let layer = self.layers.get(&self.active).ok_or(Error::EmptyCatalog)?;
        let full = ZoneCatalog::build(&layer.records, self.catalog_options(None));
        let names = AreaNameIndex::build(&full);

        let areas = area_changes(
            &change_rows(&full, &layer.assignments.changes_since_initial()),
            include_clear,
        );
        let zips = zip_reassignment(asis_rows, &names, &full, &areas, &self.reconciliation)?;
        Ok(ZipChangeReport { areas, zips })
    }
}

/// エリア単位の変更と、それを郵便番号に展開した一覧
#[derive(Debug, Clone, Default)]
pub struct ZipChangeReport {
    pub areas: Vec<ChangeRow>,
    pub zips: Vec<ZipChangeRow>,
}
