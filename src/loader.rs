//! 入力ファイルの読み込み
//!
//! ## 失敗時の扱い
//! - エリアGeoJSON: エラーを返す（セッション側のカタログは変えない）
//! - 配車エリア表: 警告を出して空のインデックス
//! - 運用対象リスト: 警告を出して既定の市区町村一覧

use crate::config::Config;
use crate::error::{Result, ZoningError};
use crate::fingerprint::fingerprint_bytes;
use calamine::{open_workbook_auto, Reader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zoning_common::csv::parse_csv_rows;
use zoning_common::geojson::municipalities_from_geojson;
use zoning_common::reconcile::ReconciliationStats;
use zoning_common::session::{DetailLevel, LoadSummary};
use zoning_common::{InScopeSet, ReconciliationIndex, ZoningSession};

/// 読み込んだエリア元データ
#[derive(Debug, Clone)]
pub struct ZoneSource {
    pub path: PathBuf,
    pub text: String,
    pub fingerprint: String,
}

/// UTF-8 として読めなければ入力形式エラー
fn decode_utf8(bytes: Vec<u8>, path: &Path) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| {
        ZoningError::Engine(zoning_common::Error::InputFormat(format!(
            "UTF-8ではありません: {} ({})",
            path.display(),
            e.utf8_error()
        )))
    })
}

pub async fn read_zone_source(path: &Path) -> Result<ZoneSource> {
    if !path.exists() {
        return Err(ZoningError::FileNotFound(path.display().to_string()));
    }
    let bytes = tokio::fs::read(path).await?;
    let fingerprint = fingerprint_bytes(&bytes);
    let text = decode_utf8(bytes, path)?;
    Ok(ZoneSource {
        path: path.to_path_buf(),
        text,
        fingerprint,
    })
}

/// エリア元データを読み込んでセッションに渡す
pub async fn load_zone_source(
    session: &mut ZoningSession,
    level: DetailLevel,
    path: &Path,
) -> Result<LoadSummary> {
    let source = read_zone_source(path).await?;
    let summary = session.load_source(level, &source.text, &source.fingerprint)?;
    Ok(summary)
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "xlsx" | "xlsm" | "xls"))
        .unwrap_or(false)
}

/// XLSXの先頭シートを行に展開
pub fn read_xlsx_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ZoningError::Spreadsheet(format!("シートがありません: {}", path.display())))??;

    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
        .collect())
}

/// 表（CSV / XLSX）を行に展開。先頭行がヘッダ
pub async fn read_table(path: &Path) -> Result<Vec<Vec<String>>> {
    if !path.exists() {
        return Err(ZoningError::FileNotFound(path.display().to_string()));
    }

    if is_xlsx(path) {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || read_xlsx_rows(&owned))
            .await
            .map_err(|e| ZoningError::Spreadsheet(e.to_string()))?
    } else {
        let bytes = tokio::fs::read(path).await?;
        Ok(parse_csv_rows(&decode_utf8(bytes, path)?))
    }
}

/// 配車エリア表（CSV / XLSX）を読み込む
pub async fn read_reference(path: &Path) -> Result<(ReconciliationIndex, ReconciliationStats)> {
    let rows = read_table(path).await?;
    Ok(ReconciliationIndex::from_rows(&rows)?)
}

/// 配車エリア表。読めなければ空のインデックス
pub async fn load_reference_or_empty(path: Option<&Path>) -> ReconciliationIndex {
    let Some(path) = path else {
        return ReconciliationIndex::empty();
    };
    match read_reference(path).await {
        Ok((index, stats)) => {
            tracing::info!(
                path = %path.display(),
                rows = stats.rows_used,
                skipped = stats.rows_skipped,
                towns = stats.towns,
                "reference dataset loaded"
            );
            index
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "reference dataset unavailable; labels stay unresolved");
            ReconciliationIndex::empty()
        }
    }
}

/// 運用対象リスト（GeoJSON の municipality / 改行区切り）
pub async fn read_in_scope(path: &Path) -> Result<InScopeSet> {
    let text = tokio::fs::read_to_string(path).await?;
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        let names = municipalities_from_geojson(&text)?;
        Ok(InScopeSet::from_names(names))
    } else {
        Ok(InScopeSet::from_lines(&text))
    }
}

/// 運用対象リスト。読めなければ既定の一覧
pub async fn load_in_scope_or_default(path: Option<&Path>) -> InScopeSet {
    let Some(path) = path else {
        return InScopeSet::default();
    };
    match read_in_scope(path).await {
        Ok(scope) => {
            tracing::info!(path = %path.display(), municipalities = scope.len(), "in-scope list loaded");
            scope
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "in-scope list unavailable; using built-in list");
            InScopeSet::default()
        }
    }
}

/// データフォルダ内で見つかったファイル
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataFiles {
    pub zone_source: Option<PathBuf>,
    pub town_source: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub in_scope: Option<PathBuf>,
}

const TOWN_HINTS: &[&str] = &["town", "chome", "fine", "町丁"];
const SCOPE_HINTS: &[&str] = &["scope", "target", "対象"];

fn name_has(path: &Path, hints: &[&str]) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    hints.iter().any(|h| name.contains(h))
}

/// データフォルダを走査してファイルを振り分ける（ファイル名順で最初のもの）
pub fn discover_data_files(dir: &Path) -> Result<DataFiles> {
    if !dir.is_dir() {
        return Err(ZoningError::FolderNotFound(dir.display().to_string()));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    paths.sort();

    let mut files = DataFiles::default();
    for path in paths {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "geojson" | "json" => {
                let slot = if name_has(&path, SCOPE_HINTS) {
                    &mut files.in_scope
                } else if name_has(&path, TOWN_HINTS) {
                    &mut files.town_source
                } else {
                    &mut files.zone_source
                };
                slot.get_or_insert(path);
            }
            "txt" if name_has(&path, SCOPE_HINTS) => {
                files.in_scope.get_or_insert(path);
            }
            "csv" | "xlsx" | "xlsm" => {
                files.reference.get_or_insert(path);
            }
            _ => {}
        }
    }

    tracing::debug!(?files, "data files discovered");
    Ok(files)
}

/// セッション開始時に読むファイル
///
/// 優先順: コマンドライン引数 → データフォルダの検出結果 → 設定ファイル
#[derive(Debug, Clone, Default)]
pub struct SessionInputs {
    pub zone_source: Option<PathBuf>,
    pub town_source: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub in_scope: Option<PathBuf>,
}

impl SessionInputs {
    pub fn resolve(config: &Config, overrides: SessionInputs, data_dir: Option<&Path>) -> Result<Self> {
        let found = match data_dir {
            Some(dir) => discover_data_files(dir)?,
            None => DataFiles::default(),
        };
        Ok(Self {
            zone_source: overrides
                .zone_source
                .or(found.zone_source)
                .or_else(|| config.zone_source_path.clone()),
            town_source: overrides
                .town_source
                .or(found.town_source)
                .or_else(|| config.town_source_path.clone()),
            reference: overrides
                .reference
                .or(found.reference)
                .or_else(|| config.reference_path()),
            in_scope: overrides
                .in_scope
                .or(found.in_scope)
                .or_else(|| config.in_scope_path.clone()),
        })
    }
}

/// 設定と入力ファイルからセッションを組み立てる
///
/// 配車エリア表・運用対象リストは失敗しても続行する。エリアGeoJSONは必須。
pub async fn open_session(config: &Config, inputs: &SessionInputs) -> Result<ZoningSession> {
    let zone_source = inputs
        .zone_source
        .as_deref()
        .ok_or_else(|| ZoningError::Config("エリアGeoJSONが指定されていません（--source または設定）".into()))?;

    let mut session = ZoningSession::new(config.session_options());

    let (reference, scope) = tokio::join!(
        load_reference_or_empty(inputs.reference.as_deref()),
        load_in_scope_or_default(inputs.in_scope.as_deref()),
    );
    session.set_reference(reference);
    session.set_in_scope(scope);

    load_zone_source(&mut session, DetailLevel::Municipality, zone_source).await?;
    Ok(session)
}
