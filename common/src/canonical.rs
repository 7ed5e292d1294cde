//! 地名・郵便番号の正規化
//!
//! 出典ごとに表記が揺れる市区町村名・町名・郵便番号を、比較可能なキーに揃える。
//! 表示用の値ではなく照合用の値を作る点に注意。

use regex::Regex;
use std::collections::BTreeSet;

lazy_static::lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"[\s　]").unwrap();
    static ref PAREN_RE: Regex = Regex::new(r"\(.*?\)").unwrap();
    static ref FULLWIDTH_PAREN_RE: Regex = Regex::new(r"（.*?）").unwrap();
    static ref PREFECTURE_PREFIX_RE: Regex = Regex::new(r"^(?:東京都|神奈川県)+").unwrap();
    static ref CHOME_SUFFIX_RE: Regex =
        Regex::new(r"(?:[0-9０-９]+|[一二三四五六七八九十]+)丁目$").unwrap();
    static ref POSTAL_RE: Regex = Regex::new(r"([0-9]{3})-?([0-9]{4})").unwrap();
    static ref DATASET_PREFIX_RE: Regex =
        Regex::new(r"(?i)^(?:KA\d+|TK\d+|SA\d+|CB\d+|N03|KA|TK|SA|CB)-").unwrap();
}

/// 政令市の区名の短縮形（`横浜鶴見区` → `横浜市鶴見区`）
const WARD_CITY_PREFIXES: &[(&str, &str)] = &[
    ("横浜", "横浜市"),
    ("川崎", "川崎市"),
    ("相模原", "相模原市"),
];

/// 「市」が落ちた市名
const SHORT_CITY_NAMES: &[(&str, &str)] = &[("町田", "町田市"), ("藤沢", "藤沢市")];

/// 空白・括弧書き・都県名を除いた共通部分
fn strip_common(text: &str) -> String {
    let out = WHITESPACE_RE.replace_all(text.trim(), "");
    let out = PAREN_RE.replace_all(&out, "");
    let out = FULLWIDTH_PAREN_RE.replace_all(&out, "");
    PREFECTURE_PREFIX_RE.replace(&out, "").into_owned()
}

/// 市区町村名の正規化
///
/// 冪等: `canonical_municipality(canonical_municipality(x)) == canonical_municipality(x)`
pub fn canonical_municipality(text: &str) -> String {
    let out = strip_common(text);

    for (short, full) in SHORT_CITY_NAMES {
        if out == *short {
            return full.to_string();
        }
    }

    for (short, full) in WARD_CITY_PREFIXES {
        if let Some(rest) = out.strip_prefix(short) {
            if !out.starts_with(full) && rest.ends_with('区') && rest.chars().count() >= 2 {
                return format!("{}{}", full, rest);
            }
        }
    }

    out
}

/// 町名の正規化（丁目を落として町単位のキーにする）
///
/// 市区町村名と同じく括弧書きも除く（`本町（一部）` → `本町`）。
pub fn canonical_town(text: &str) -> String {
    let squeezed = WHITESPACE_RE.replace_all(text.trim(), "");
    if squeezed.is_empty() || squeezed == crate::keys::UNLISTED_TOWN {
        return String::new();
    }

    let out = PAREN_RE.replace_all(&squeezed, "");
    let mut out: String = FULLWIDTH_PAREN_RE
        .replace_all(&out, "")
        .chars()
        .map(|c| match c {
            'ヶ' | 'ヵ' | 'ｹ' => 'ケ',
            '之' => 'の',
            _ => c,
        })
        .collect();

    while let Some(m) = CHOME_SUFFIX_RE.find(&out) {
        out.truncate(m.start());
    }

    out
}

/// 索引照合用のキー（表示には使わない）
pub fn normalize_match_key(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, "").to_lowercase()
}

/// 全角数字を半角に
fn ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// 郵便番号の正規化
///
/// 数字以外を除去し、7桁以上なら先頭7桁。7桁未満はそのまま返すので
/// 呼び出し側で `len() == 7` を確認すること。
pub fn normalize_postal(text: &str) -> String {
    let digits: String = ascii_digits(text)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.len() >= 7 {
        digits[..7].to_string()
    } else {
        digits
    }
}

/// テキスト中の郵便番号をすべて抽出（出現順・重複除去）
pub fn collect_postal_codes(text: &str) -> Vec<String> {
    let input = ascii_digits(text.trim());
    if input.is_empty() {
        return Vec::new();
    }

    let mut codes: Vec<String> = Vec::new();
    for cap in POSTAL_RE.captures_iter(&input) {
        let code = format!("{}{}", &cap[1], &cap[2]);
        if !codes.contains(&code) {
            codes.push(code);
        }
    }

    if codes.is_empty() {
        let normalized = normalize_postal(&input);
        if normalized.len() == 7 {
            codes.push(normalized);
        }
    }

    codes
}

/// `2520001` → `252-0001`。7桁でなければ空文字
pub fn format_postal(code: &str) -> String {
    let digits = normalize_postal(code);
    if digits.len() != 7 {
        return String::new();
    }
    format!("{}-{}", &digits[..3], &digits[3..])
}

/// 郵便番号集合の表示形式（ソート済み、` / ` 区切り、空なら `-`）
pub fn format_postal_codes<'a>(codes: impl IntoIterator<Item = &'a String>) -> String {
    let formatted: BTreeSet<String> = codes
        .into_iter()
        .map(|c| format_postal(c))
        .filter(|c| !c.is_empty())
        .collect();

    if formatted.is_empty() {
        return "-".to_string();
    }
    formatted.into_iter().collect::<Vec<_>>().join(" / ")
}

/// 表示用にデータセット接頭辞（`KA14-` 等）を外す
pub fn format_zone_id_for_display(zone_id: &str) -> String {
    if zone_id.starts_with("name:") || zone_id.starts_with("feature:") {
        return zone_id.to_string();
    }
    DATASET_PREFIX_RE.replace(zone_id, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_municipality_basic() {
        assert_eq!(canonical_municipality(" 神奈川県 藤沢市 "), "藤沢市");
        assert_eq!(canonical_municipality("東京都町田市"), "町田市");
        assert_eq!(canonical_municipality("町田"), "町田市");
        assert_eq!(canonical_municipality("藤沢"), "藤沢市");
        assert_eq!(canonical_municipality("横浜鶴見区"), "横浜市鶴見区");
        assert_eq!(canonical_municipality("川崎中原区"), "川崎市中原区");
        assert_eq!(canonical_municipality("相模原南区"), "相模原市南区");
        assert_eq!(canonical_municipality("横浜市港北区（一部）"), "横浜市港北区");
        assert_eq!(canonical_municipality("大和市(旧)"), "大和市");
    }

    #[test]
    fn test_canonical_municipality_keeps_full_form() {
        assert_eq!(canonical_municipality("横浜市鶴見区"), "横浜市鶴見区");
        assert_eq!(canonical_municipality("横浜区"), "横浜区");
        assert_eq!(canonical_municipality(""), "");
    }

    #[test]
    fn test_canonical_municipality_idempotent() {
        let inputs = [
            "神奈川県東京都町田",
            "東京都神奈川県横浜港北区",
            " 横浜 鶴見区 ",
            "(注)藤沢",
            "川崎市（川崎区）",
            "a((b))c",
            "相模原中央区",
            "茅ヶ崎市",
            "横浜市",
        ];
        for input in inputs {
            let once = canonical_municipality(input);
            let twice = canonical_municipality(&once);
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_canonical_town() {
        assert_eq!(canonical_town("本町1丁目"), "本町");
        assert_eq!(canonical_town("本町１丁目"), "本町");
        assert_eq!(canonical_town("本町三丁目"), "本町");
        assert_eq!(canonical_town("本町"), "本町");
        assert_eq!(canonical_town("霞ヶ丘"), "霞ケ丘");
        assert_eq!(canonical_town("霞ヵ丘"), "霞ケ丘");
        assert_eq!(canonical_town("霞之丘"), "霞の丘");
        assert_eq!(canonical_town("以下に掲載がない場合"), "");
        assert_eq!(canonical_town(" 以下に掲載がない場合 "), "");
        // 括弧書きは半角・全角とも落とす
        assert_eq!(canonical_town("本町（一部）"), "本町");
        assert_eq!(canonical_town("栄町(東)2丁目"), "栄町");
    }

    #[test]
    fn test_canonical_town_idempotent() {
        for input in ["本町一丁目2丁目", "霞ヶ丘 10丁目", "栄町(東)"] {
            let once = canonical_town(input);
            assert_eq!(canonical_town(&once), once);
        }
    }

    #[test]
    fn test_normalize_match_key() {
        assert_eq!(normalize_match_key(" Ab C　d "), "abcd");
    }

    #[test]
    fn test_normalize_postal() {
        assert_eq!(normalize_postal("252-0001"), "2520001");
        assert_eq!(normalize_postal("〒２５２－０００１"), "2520001");
        assert_eq!(normalize_postal("25200019"), "2520001");
        assert_eq!(normalize_postal("252"), "252");
        assert_eq!(normalize_postal("abc"), "");
    }

    #[test]
    fn test_collect_postal_codes() {
        assert_eq!(
            collect_postal_codes("252-0001, 2520002 / 252-0001"),
            vec!["2520001".to_string(), "2520002".to_string()]
        );
        assert!(collect_postal_codes("").is_empty());
        assert!(collect_postal_codes("本町").is_empty());
    }

    #[test]
    fn test_format_postal_codes() {
        let codes = vec!["2520002".to_string(), "2520001".to_string(), "bad".to_string()];
        assert_eq!(format_postal_codes(&codes), "252-0001 / 252-0002");
        let empty: Vec<String> = Vec::new();
        assert_eq!(format_postal_codes(&empty), "-");
    }

    #[test]
    fn test_format_zone_id_for_display() {
        assert_eq!(format_zone_id_for_display("KA14-12345"), "12345");
        assert_eq!(format_zone_id_for_display("n03-14101"), "14101");
        assert_eq!(format_zone_id_for_display("name:藤沢市"), "name:藤沢市");
        assert_eq!(format_zone_id_for_display("2520001"), "2520001");
    }
}
