//! Excel生成
//!
//! シート1「割当」: エクスポート行（デポ列はデポ色で塗る）
//! シート2「集計」: 総数・割当済み・未割当・デポ別件数

use super::ensure_parent;
use crate::error::Result;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use std::path::Path;
use zoning_common::export::EXPORT_HEADER;
use zoning_common::{AssignmentStats, DepotCode, ExportRow};

const COLUMN_WIDTHS: [f64; 5] = [16.0, 28.0, 18.0, 12.0, 20.0];

/// `#rrggbb` → 0xRRGGBB
fn depot_rgb(depot: DepotCode) -> u32 {
    u32::from_str_radix(depot.color().trim_start_matches('#'), 16).unwrap_or(0xFFFFFF)
}

pub fn generate_excel(rows: &[ExportRow], stats: &AssignmentStats, output_path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xAAAAAA));

    let cell_format = Format::new()
        .set_border(FormatBorder::Hair)
        .set_border_color(Color::RGB(0xCCCCCC));

    // 割当シート
    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("割当")?;

        for (col, (title, width)) in EXPORT_HEADER.iter().zip(COLUMN_WIDTHS).enumerate() {
            let col = col as u16;
            worksheet.set_column_width(col, width)?;
            worksheet.write_string_with_format(0, col, *title, &header_format)?;
        }

        for (i, row) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, value) in row.fields().iter().enumerate() {
                worksheet.write_string_with_format(r, col as u16, *value, &cell_format)?;
            }
            if let Some(depot) = row.depot_code {
                let depot_format = Format::new()
                    .set_bold()
                    .set_font_color(Color::White)
                    .set_background_color(Color::RGB(depot_rgb(depot)))
                    .set_border(FormatBorder::Hair)
                    .set_border_color(Color::RGB(0xCCCCCC));
                worksheet.write_string_with_format(r, 3, depot.code(), &depot_format)?;
            }
        }

        worksheet.set_freeze_panes(1, 0)?;
        if !rows.is_empty() {
            worksheet.autofilter(0, 0, rows.len() as u32, (EXPORT_HEADER.len() - 1) as u16)?;
        }
    }

    // 集計シート
    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("集計")?;
        worksheet.set_column_width(0, 18.0)?;
        worksheet.set_column_width(1, 10.0)?;

        let mut lines: Vec<(String, usize)> = vec![
            ("総エリア数".into(), stats.total),
            ("割当済み".into(), stats.assigned),
            ("未割当".into(), stats.unassigned),
        ];
        for depot in DepotCode::ALL {
            let count = stats.by_depot.get(&depot).copied().unwrap_or(0);
            lines.push((depot.display_name().to_string(), count));
        }

        for (i, (label, count)) in lines.iter().enumerate() {
            let r = i as u32;
            worksheet.write_string_with_format(r, 0, label, &header_format)?;
            worksheet.write_number_with_format(r, 1, *count as f64, &cell_format)?;
        }
    }

    ensure_parent(output_path)?;
    workbook.save(output_path)?;
    Ok(())
}
