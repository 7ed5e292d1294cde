//! 郵便番号単位の変更レポート
//!
//! エリア単位の割当変更を、現行の郵便番号別配車表（as-is）に重ねて
//! 郵便番号ごとの付け替え一覧にする。
//!
//! ## 処理フロー
//! 1. 変更エリアを抽出（割当解除は `include_clear` のときだけ）
//! 2. as-is の各行を (市区, 対応エリア) の正規化名でエリアに突き合わせ
//! 3. 一意に決まれば変更後デポを適用、複数なら AMBIGUOUS、なければ NO_MATCH
//! 4. 郵便番号が空の行は配車エリア表から (市区, 町) の郵便番号を補う

use crate::canonical::{canonical_municipality, normalize_postal};
use crate::catalog::ZoneCatalog;
use crate::csv::{quote_field, HeaderIndex};
use crate::depot::{normalize_depot_code, DepotCode};
use crate::error::{Error, Result};
use crate::export::ChangeRow;
use crate::keys::reference;
use crate::reconcile::ReconciliationIndex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// エリア変更一覧のヘッダ
pub const AREA_CHANGES_HEADER: [&str; 6] = [
    "area_id",
    "area_name",
    "before_depot_code",
    "before_depot_name",
    "after_depot_code",
    "after_depot_name",
];

/// 郵便番号別一覧のヘッダ
pub const ZIP_REPORT_HEADER: [&str; 12] = [
    "zip_code",
    "city",
    "town",
    "area_label",
    "area_id",
    "area_name",
    "match_status",
    "before_depot_code",
    "before_depot_name",
    "after_depot_code",
    "after_depot_name",
    "changed",
];

/// as-is 行とエリアの突き合わせ結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchStatus {
    Ok,
    Ambiguous,
    NoMatch,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Ok => "OK",
            MatchStatus::Ambiguous => "AMBIGUOUS",
            MatchStatus::NoMatch => "NO_MATCH",
        }
    }
}

/// 正規化名 → エリアID
///
/// エリアID・表示名・市区町村名のそれぞれで引ける。
#[derive(Debug, Clone, Default)]
pub struct AreaNameIndex {
    by_name: HashMap<String, BTreeSet<String>>,
}

impl AreaNameIndex {
    pub fn build(catalog: &ZoneCatalog) -> Self {
        let mut by_name: HashMap<String, BTreeSet<String>> = HashMap::new();
        for zone in catalog.iter() {
            for raw in [&zone.id, &zone.display_name, &zone.municipality] {
                let key = canonical_municipality(raw);
                if key.is_empty() {
                    continue;
                }
                by_name.entry(key).or_default().insert(zone.id.clone());
            }
        }
        Self { by_name }
    }

    /// 市区・対応エリアのどちらかに一致したエリアをすべて返す
    pub fn resolve(&self, city: &str, area_label: &str) -> BTreeSet<String> {
        let mut hits = BTreeSet::new();
        for raw in [city, area_label] {
            if let Some(ids) = self.by_name.get(&canonical_municipality(raw)) {
                hits.extend(ids.iter().cloned());
            }
        }
        hits
    }
}

fn depot_code(d: Option<DepotCode>) -> &'static str {
    d.map(|d| d.code()).unwrap_or("")
}

fn depot_name(d: Option<DepotCode>) -> &'static str {
    d.map(|d| d.display_name()).unwrap_or("")
}

/// 報告対象の変更エリア。割当解除は `include_clear` のときだけ含める
pub fn area_changes(changes: &[ChangeRow], include_clear: bool) -> Vec<ChangeRow> {
    changes
        .iter()
        .filter(|c| c.before != c.after && (c.after.is_some() || include_clear))
        .cloned()
        .collect()
}

/// 郵便番号別の1行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZipChangeRow {
    pub zip_code: String,
    pub city: String,
    pub town: String,
    pub area_label: String,
    pub zone_id: String,
    pub area_name: String,
    pub status: MatchStatus,
    pub before: Option<DepotCode>,
    pub after: Option<DepotCode>,
}

impl ZipChangeRow {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

/// as-is 表（先頭行ヘッダ）を郵便番号別の付け替え一覧にする
///
/// `changes` は [`area_changes`] で絞った後のもの。
pub fn zip_reassignment(
    asis_rows: &[Vec<String>],
    names: &AreaNameIndex,
    catalog: &ZoneCatalog,
    changes: &[ChangeRow],
    reconciliation: &ReconciliationIndex,
) -> Result<Vec<ZipChangeRow>> {
    let Some((header, rows)) = asis_rows.split_first() else {
        return Ok(Vec::new());
    };
    let header = HeaderIndex::new(header);
    if !header.has_any(reference::MUNICIPALITY) && !header.has_any(reference::LABEL) {
        return Err(Error::InputFormat(
            "配車表に市区・対応エリアの列がありません".to_string(),
        ));
    }

    let after_by_id: HashMap<&str, Option<DepotCode>> =
        changes.iter().map(|c| (c.zone_id.as_str(), c.after)).collect();

    let mut out = Vec::new();
    for row in rows {
        let field = |keys: &[&str]| header.pick(row, keys).unwrap_or("").to_string();
        let city = field(reference::MUNICIPALITY);
        let town = field(reference::TOWN);
        let area_label = field(reference::LABEL);
        let before = header.pick(row, reference::DEPOT).and_then(normalize_depot_code);

        let hits = names.resolve(&city, &area_label);
        let (status, zone_id) = match hits.len() {
            0 => (MatchStatus::NoMatch, String::new()),
            1 => (MatchStatus::Ok, hits.into_iter().next().unwrap_or_default()),
            _ => (MatchStatus::Ambiguous, String::new()),
        };
        let area_name = catalog
            .get(&zone_id)
            .map(|z| z.display_name.clone())
            .unwrap_or_default();
        let after = after_by_id.get(zone_id.as_str()).copied().unwrap_or(before);

        let zip = normalize_postal(&field(reference::POSTAL));
        let zips = if zip.is_empty() {
            let found = reconciliation.lookup_postal_codes(&city, &town);
            if found.is_empty() {
                vec![String::new()]
            } else {
                found
            }
        } else {
            vec![zip]
        };

        for zip_code in zips {
            out.push(ZipChangeRow {
                zip_code,
                city: city.clone(),
                town: town.clone(),
                area_label: area_label.clone(),
                zone_id: zone_id.clone(),
                area_name: area_name.clone(),
                status,
                before,
                after,
            });
        }
    }

    tracing::debug!(
        rows = out.len(),
        changed = out.iter().filter(|r| r.changed()).count(),
        "zip reassignment built"
    );
    Ok(out)
}

fn join_line<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields.into_iter().map(quote_field).collect::<Vec<_>>().join(",")
}

/// エリア変更一覧のCSV本文
pub fn area_changes_to_csv(rows: &[ChangeRow]) -> String {
    let mut lines = vec![join_line(AREA_CHANGES_HEADER)];
    for row in rows {
        let name = if row.display_name.is_empty() {
            row.zone_id.as_str()
        } else {
            row.display_name.as_str()
        };
        lines.push(join_line([
            row.zone_id.as_str(),
            name,
            depot_code(row.before),
            depot_name(row.before),
            depot_code(row.after),
            depot_name(row.after),
        ]));
    }
    lines.join("\n")
}

/// 郵便番号別一覧のCSV本文。`changed_only` なら変わった行だけ
pub fn zip_rows_to_csv(rows: &[ZipChangeRow], changed_only: bool) -> String {
    let mut lines = vec![join_line(ZIP_REPORT_HEADER)];
    for row in rows.iter().filter(|r| !changed_only || r.changed()) {
        lines.push(join_line([
            row.zip_code.as_str(),
            row.city.as_str(),
            row.town.as_str(),
            row.area_label.as_str(),
            row.zone_id.as_str(),
            row.area_name.as_str(),
            row.status.as_str(),
            depot_code(row.before),
            depot_name(row.before),
            depot_code(row.after),
            depot_name(row.after),
            if row.changed() { "1" } else { "0" },
        ]));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogOptions;
    use crate::csv::parse_csv_rows;
    use crate::geojson::records_from_value;
    use serde_json::json;

    fn catalog() -> ZoneCatalog {
        let records = records_from_value(&json!([
            {"area_id": "14205", "name": "藤沢市", "municipality": "藤沢市"},
            {"area_id": "13209", "name": "町田市", "municipality": "町田市"},
            {"area_id": "S1", "name": "相模原市中央区上溝", "municipality": "相模原市中央区"},
            {"area_id": "S2", "name": "相模原市中央区中央", "municipality": "相模原市中央区"}
        ]))
        .unwrap();
        ZoneCatalog::build(&records, CatalogOptions::default())
    }

    fn change(id: &str, name: &str, before: Option<DepotCode>, after: Option<DepotCode>) -> ChangeRow {
        ChangeRow {
            zone_id: id.into(),
            display_name: name.into(),
            municipality: name.into(),
            before,
            after,
        }
    }

    const ASIS: &str = "郵便番号,市区,町,対応エリア,管轄デポ
251-0053,藤沢市,本町,藤沢,FUJ
194-0013,町田市,原町田,町田,相模原デポ SGM
252-0243,相模原中央区,上溝,中央区一円,SGM
242-0001,大和市,,大和,FUJ
,藤沢市,鵠沼海岸,藤沢,FUJ
";

    fn report(include_clear: bool) -> Vec<ZipChangeRow> {
        let catalog = catalog();
        let names = AreaNameIndex::build(&catalog);
        let all = vec![
            change("14205", "藤沢市", Some(DepotCode::Fuj), Some(DepotCode::Yok)),
            change("13209", "町田市", Some(DepotCode::Sgm), None),
        ];
        let changes = area_changes(&all, include_clear);
        let reconciliation =
            ReconciliationIndex::from_csv_str("管轄デポ,市区,町,郵便番号,対応エリア\nFUJ,藤沢,鵠沼海岸,251-0037,南部\n")
                .unwrap();
        zip_reassignment(&parse_csv_rows(ASIS), &names, &catalog, &changes, &reconciliation).unwrap()
    }

    #[test]
    fn test_match_status() {
        let rows = report(false);
        assert_eq!(rows.len(), 5);

        assert_eq!(rows[0].zip_code, "2510053");
        assert_eq!(rows[0].status, MatchStatus::Ok);
        assert_eq!(rows[0].zone_id, "14205");
        assert_eq!(rows[0].area_name, "藤沢市");
        assert_eq!(rows[0].after, Some(DepotCode::Yok));
        assert!(rows[0].changed());

        // 区名だけでは2エリアに当たる
        assert_eq!(rows[2].status, MatchStatus::Ambiguous);
        assert!(rows[2].zone_id.is_empty());
        assert_eq!(rows[2].after, Some(DepotCode::Sgm));
        assert!(!rows[2].changed());

        assert_eq!(rows[3].status, MatchStatus::NoMatch);
        assert_eq!(rows[3].before, Some(DepotCode::Fuj));
        assert!(!rows[3].changed());
    }

    #[test]
    fn test_blank_zip_filled_from_reference() {
        let rows = report(false);
        assert_eq!(rows[4].zip_code, "2510037");
        assert_eq!(rows[4].status, MatchStatus::Ok);
        assert!(rows[4].changed());
    }

    #[test]
    fn test_clear_only_with_include_clear() {
        let rows = report(false);
        assert_eq!(rows[1].before, Some(DepotCode::Sgm));
        assert!(!rows[1].changed());

        let rows = report(true);
        assert_eq!(rows[1].after, None);
        assert!(rows[1].changed());
    }

    #[test]
    fn test_area_changes_csv() {
        let all = vec![
            change("14205", "藤沢市", Some(DepotCode::Fuj), Some(DepotCode::Yok)),
            change("13209", "", Some(DepotCode::Sgm), None),
        ];
        let csv = area_changes_to_csv(&area_changes(&all, true));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "\"14205\",\"藤沢市\",\"FUJ\",\"藤沢デポ FUJ\",\"YOK\",\"横浜港北デポ YOK\""
        );
        // 名前がなければID
        assert_eq!(lines[2], "\"13209\",\"13209\",\"SGM\",\"相模原デポ SGM\",\"\",\"\"");

        let csv = area_changes_to_csv(&area_changes(&all, false));
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn test_zip_rows_csv_changed_only() {
        let rows = report(false);
        let all = zip_rows_to_csv(&rows, false);
        let changed = zip_rows_to_csv(&rows, true);
        assert_eq!(all.lines().count(), 6);
        assert_eq!(changed.lines().count(), 3);
        assert!(changed.lines().skip(1).all(|l| l.ends_with(",\"1\"")));
        assert!(all.contains("\"AMBIGUOUS\""));
        assert!(all.contains("\"NO_MATCH\""));
    }

    #[test]
    fn test_missing_columns_is_format_error() {
        let catalog = catalog();
        let rows = parse_csv_rows("foo,bar\n1,2\n");
        let result = zip_reassignment(
            &rows,
            &AreaNameIndex::build(&catalog),
            &catalog,
            &[],
            &ReconciliationIndex::empty(),
        );
        assert!(matches!(result, Err(Error::InputFormat(_))));
    }
}
