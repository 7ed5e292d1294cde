//! CSV読み込み
//!
//! ダブルクォート（`""` エスケープ、クォート内改行）に対応した最小限のパーサと、
//! ヘッダ名の同義語で列を引くためのインデックス。

use std::collections::HashMap;

/// CSVテキスト全体を行×フィールドに分解
pub fn parse_csv_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            '\r' => {}
            _ => field.push(c),
        }
    }

    // 最終行（末尾改行なし）
    row.push(field);
    if row.len() > 1 || !row[0].trim().is_empty() {
        rows.push(row);
    }

    rows
}

/// ヘッダ名の正規化（BOM除去・trim・小文字化）
pub fn normalize_header(value: &str) -> String {
    value.replace('\u{feff}', "").trim().to_lowercase()
}

/// ヘッダ名 → 列番号
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    index: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(header: &[String]) -> Self {
        let mut index = HashMap::new();
        for (i, name) in header.iter().enumerate() {
            // 同名列は先頭優先
            index.entry(normalize_header(name)).or_insert(i);
        }
        Self { index }
    }

    /// 候補名のいずれかに一致する列があるか
    pub fn has_any(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.index.contains_key(&normalize_header(k)))
    }

    /// 候補名を順に試し、最初の空でない値を返す
    pub fn pick<'a>(&self, row: &'a [String], keys: &[&str]) -> Option<&'a str> {
        for key in keys {
            let Some(&idx) = self.index.get(&normalize_header(key)) else {
                continue;
            };
            if let Some(value) = row.get(idx) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
        None
    }
}

/// CSVフィールドのクォート（常にクォートする）
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
