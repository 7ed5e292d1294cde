//! CSV出力
//!
//! 全フィールドをダブルクォートで囲み、行は LF 区切り。

use super::ensure_parent;
use crate::error::Result;
use std::path::Path;
use zoning_common::export::{changes_to_csv, rows_to_csv};
use zoning_common::zip_report::{area_changes_to_csv, zip_rows_to_csv};
use zoning_common::ZipChangeRow;
use zoning_common::{ChangeRow, ExportRow};

fn write_text(path: &Path, text: &str) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, text)?;
    Ok(())
}

pub fn write_assignments_csv(rows: &[ExportRow], path: &Path) -> Result<()> {
    write_text(path, &rows_to_csv(rows))
}

pub fn write_changes_csv(rows: &[ChangeRow], path: &Path) -> Result<()> {
    write_text(path, &changes_to_csv(rows))
}

pub fn write_area_changes_csv(rows: &[ChangeRow], path: &Path) -> Result<()> {
    write_text(path, &area_changes_to_csv(rows))
}

pub fn write_zip_rows_csv(rows: &[ZipChangeRow], changed_only: bool, path: &Path) -> Result<()> {
    write_text(path, &zip_rows_to_csv(rows, changed_only))
}
