//! 割当結果のエクスポート行
//!
//! ## 並び順
//! (市区町村, 表示名, エリアID) を日本語順で比較する。

use crate::assignment::{AssignmentChange, AssignmentTable};
use crate::catalog::ZoneCatalog;
use crate::collate;
use crate::csv::quote_field;
use crate::depot::DepotCode;
use crate::error::{Error, Result};
use serde::Serialize;

/// CSVヘッダ
pub const EXPORT_HEADER: [&str; 5] = ["area_id", "area_name", "municipality", "depot_code", "depot_name"];

/// 変更分エクスポートのヘッダ
pub const CHANGES_HEADER: [&str; 6] = [
    "area_id",
    "area_name",
    "municipality",
    "before_depot_code",
    "after_depot_code",
    "after_depot_name",
];

/// エクスポート1行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub zone_id: String,
    pub display_name: String,
    pub municipality: String,
    pub depot_code: Option<DepotCode>,
}

impl ExportRow {
    pub fn depot_code_str(&self) -> &'static str {
        self.depot_code.map(|d| d.code()).unwrap_or("")
    }

    pub fn depot_name(&self) -> &'static str {
        self.depot_code.map(|d| d.display_name()).unwrap_or("")
    }

    pub fn fields(&self) -> [&str; 5] {
        [
            self.zone_id.as_str(),
            self.display_name.as_str(),
            self.municipality.as_str(),
            self.depot_code_str(),
            self.depot_name(),
        ]
    }
}

/// 変更分の1行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRow {
    pub zone_id: String,
    pub display_name: String,
    pub municipality: String,
    pub before: Option<DepotCode>,
    pub after: Option<DepotCode>,
}

fn sort_key(zone_id: &str, catalog: &ZoneCatalog) -> (String, String) {
    catalog
        .get(zone_id)
        .map(|z| (z.municipality.clone(), z.display_name.clone()))
        .unwrap_or_default()
}

/// 表示中の全エリアを並び順どおりに行にする。カタログが空ならエラー
pub fn export_rows(catalog: &ZoneCatalog, assignments: &AssignmentTable) -> Result<Vec<ExportRow>> {
    if catalog.is_empty() {
        return Err(Error::EmptyCatalog);
    }

    let mut rows: Vec<ExportRow> = catalog
        .iter()
        .map(|zone| ExportRow {
            zone_id: zone.id.clone(),
            display_name: zone.display_name.clone(),
            municipality: zone.municipality.clone(),
            depot_code: assignments.get(&zone.id).copied().flatten(),
        })
        .collect();

    rows.sort_by(|a, b| {
        collate::compare_keys(
            &[a.municipality.as_str(), a.display_name.as_str(), a.zone_id.as_str()],
            &[b.municipality.as_str(), b.display_name.as_str(), b.zone_id.as_str()],
        )
    });
    Ok(rows)
}

/// 初期状態からの変更を行にする（カタログにないエリアはIDだけ）
pub fn change_rows(catalog: &ZoneCatalog, changes: &[AssignmentChange]) -> Vec<ChangeRow> {
    let mut rows: Vec<ChangeRow> = changes
        .iter()
        .map(|change| {
            let (municipality, display_name) = sort_key(&change.zone_id, catalog);
            ChangeRow {
                zone_id: change.zone_id.clone(),
                display_name,
                municipality,
                before: change.before,
                after: change.after,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        collate::compare_keys(
            &[a.municipality.as_str(), a.display_name.as_str(), a.zone_id.as_str()],
            &[b.municipality.as_str(), b.display_name.as_str(), b.zone_id.as_str()],
        )
    });
    rows
}

fn join_line<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields.into_iter().map(quote_field).collect::<Vec<_>>().join(",")
}

/// CSV本文（全フィールドをダブルクォート、改行区切り）
pub fn rows_to_csv(rows: &[ExportRow]) -> String {
    let mut lines = vec![join_line(EXPORT_HEADER)];
    lines.extend(rows.iter().map(|row| join_line(row.fields())));
    lines.join("\n")
}

pub fn changes_to_csv(rows: &[ChangeRow]) -> String {
    let code = |d: Option<DepotCode>| d.map(|d| d.code()).unwrap_or("");
    let mut lines = vec![join_line(CHANGES_HEADER)];
    for row in rows {
        lines.push(join_line([
            row.zone_id.as_str(),
            row.display_name.as_str(),
            row.municipality.as_str(),
            code(row.before),
            code(row.after),
            row.after.map(|d| d.display_name()).unwrap_or(""),
        ]));
    }
    lines.join("\n")
}
