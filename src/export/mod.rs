pub mod csv;
pub mod excel;

use crate::cli::ExportFormat;
use crate::error::Result;
use std::path::{Path, PathBuf};
use zoning_common::session::ZipChangeReport;
use zoning_common::ZoningSession;

/// 既定のファイル名（拡張子なし）
pub fn default_file_stem(changes_only: bool, stamp: &str) -> String {
    if changes_only {
        format!("depot_assignment_changes_{}", stamp)
    } else {
        format!("depot_assignments_admin_{}", stamp)
    }
}

/// `YYYYMMDD`
pub fn date_stamp() -> String {
    chrono::Local::now().format("%Y%m%d").to_string()
}

/// 出力先の親ディレクトリを作る
pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn output_path_for_format(output: &Path, stem: &str, extension: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.{}", stem, extension))
    } else {
        output.to_path_buf()
    }
}

fn output_paths_for_both(output: &Path, stem: &str) -> (PathBuf, PathBuf) {
    if output.is_dir() || output.extension().is_none() {
        (
            output.join(format!("{}.csv", stem)),
            output.join(format!("{}.xlsx", stem)),
        )
    } else {
        let parent = output.parent().unwrap_or_else(|| Path::new("."));
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(stem);
        (
            parent.join(format!("{}.csv", stem)),
            parent.join(format!("{}.xlsx", stem)),
        )
    }
}

/// セッションの割当をファイルに出力し、書き出したパスを返す
///
/// `changes_only` なら初期状態から変わった割当だけ（CSVのみ）。
pub fn export_session(
    session: &ZoningSession,
    format: &ExportFormat,
    output: &Path,
    changes_only: bool,
) -> Result<Vec<PathBuf>> {
    let stem = default_file_stem(changes_only, &date_stamp());

    if changes_only {
        let path = output_path_for_format(output, &stem, "csv");
        let rows = session.change_rows();
        println!("- 変更分CSVを生成中... ({}件)", rows.len());
        csv::write_changes_csv(&rows, &path)?;
        println!("✔ CSV出力: {}", path.display());
        return Ok(vec![path]);
    }

    let rows = session.export_rows()?;
    let stats = session.stats();
    let mut written = Vec::new();

    match format {
        ExportFormat::Csv => {
            let path = output_path_for_format(output, &stem, "csv");
            println!("- CSVを生成中...");
            csv::write_assignments_csv(&rows, &path)?;
            println!("✔ CSV出力: {}", path.display());
            written.push(path);
        }
        ExportFormat::Excel => {
            let path = output_path_for_format(output, &stem, "xlsx");
            println!("- Excelを生成中...");
            excel::generate_excel(&rows, &stats, &path)?;
            println!("✔ Excel出力: {}", path.display());
            written.push(path);
        }
        ExportFormat::Both => {
            let (csv_path, excel_path) = output_paths_for_both(output, &stem);

            println!("- CSVを生成中...");
            csv::write_assignments_csv(&rows, &csv_path)?;
            println!("✔ CSV出力: {}", csv_path.display());

            println!("- Excelを生成中...");
            excel::generate_excel(&rows, &stats, &excel_path)?;
            println!("✔ Excel出力: {}", excel_path.display());

            written.push(csv_path);
            written.push(excel_path);
        }
    }

    tracing::info!(rows = rows.len(), files = written.len(), "assignments exported");
    Ok(written)
}

/// 郵便番号単位の変更レポートの出力ファイル名
pub const AREA_CHANGES_FILE: &str = "area_changes.csv";
pub const ZIP_ALL_FILE: &str = "zip_reassignment_all.csv";
pub const ZIP_CHANGES_FILE: &str = "zip_changes_only.csv";

/// 変更レポートを3つのCSVに書き出し、書き出したパスを返す
///
/// ## 出力
/// - `area_changes.csv`: 変わったエリア
/// - `zip_reassignment_all.csv`: as-is の全郵便番号行
/// - `zip_changes_only.csv`: デポが変わる郵便番号行だけ
pub fn export_zip_report(report: &ZipChangeReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let area_path = output_dir.join(AREA_CHANGES_FILE);
    let all_path = output_dir.join(ZIP_ALL_FILE);
    let changed_path = output_dir.join(ZIP_CHANGES_FILE);

    csv::write_area_changes_csv(&report.areas, &area_path)?;
    println!("✔ 変更エリア: {}件 → {}", report.areas.len(), area_path.display());

    csv::write_zip_rows_csv(&report.zips, false, &all_path)?;
    println!("✔ 郵便番号: {}件 → {}", report.zips.len(), all_path.display());

    let changed = report.zips.iter().filter(|r| r.changed()).count();
    csv::write_zip_rows_csv(&report.zips, true, &changed_path)?;
    println!("✔ 付け替え: {}件 → {}", changed, changed_path.display());

    let unresolved = report.zips.len() - report.zips.iter().filter(|r| !r.zone_id.is_empty()).count();
    if unresolved > 0 {
        println!("- エリアを特定できない行: {}件（AMBIGUOUS / NO_MATCH）", unresolved);
    }

    tracing::info!(
        areas = report.areas.len(),
        zips = report.zips.len(),
        changed,
        "zip change report exported"
    );
    Ok(vec![area_path, all_path, changed_path])
}
