//! 日本語向けの並び順
//!
//! カタカナはひらがなに、全角英数は半角に寄せ、英字は小文字化して比較する。
//! 寄せた結果が同じなら元の文字列のコードポイント順。

use std::cmp::Ordering;

fn fold_char(c: char) -> char {
    match c {
        // カタカナ → ひらがな
        'ァ'..='ヶ' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
        // 全角英数記号 → 半角
        '！'..='～' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        '　' => ' ',
        _ => c,
    }
}

/// 比較用キー
pub fn collation_key(text: &str) -> String {
    text.chars().map(fold_char).flat_map(char::to_lowercase).collect()
}

pub fn compare(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

/// 複数列のキーを順に比較
pub fn compare_keys(a: &[&str], b: &[&str]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = compare(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}
