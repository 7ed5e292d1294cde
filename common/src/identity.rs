//! エリアの識別情報の抽出
//!
//! 出典の異なるレコード（N03行政区域、町丁目ポリゴン、郵便番号ポリゴン等）から、
//! エリアID・表示名・市区町村・町名を取り出す。
//!
//! ## 抽出の方針
//! 論理フィールドごとに「候補抽出器」を優先順に並べ、最初に値を返したものを採用する。

use crate::canonical::{canonical_municipality, normalize_postal};
use crate::keys;
use serde_json::{Map, Value};

/// 入力レコード（任意のプロパティ集合）
pub type Record = Map<String, Value>;

/// プロパティ値を文字列化（空・null は None）
pub fn value_as_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// レコードからキーの値を取得
pub fn prop(record: &Record, key: &str) -> Option<String> {
    record.get(key).and_then(value_as_string)
}

/// 候補名を順に試す
pub fn first_prop(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| prop(record, k))
}

/// 候補抽出器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// プロパティ値をそのまま
    Plain(&'static str),
    /// 郵便番号として正規化
    Postal(&'static str),
    /// N03の市区町村名＋政令市区名
    ComposedN03,
}

impl Extractor {
    pub fn extract(&self, record: &Record) -> Option<String> {
        match self {
            Extractor::Plain(key) => prop(record, key),
            Extractor::Postal(key) => {
                prop(record, key).map(|v| normalize_postal(&v)).filter(|v| !v.is_empty())
            }
            Extractor::ComposedN03 => compose_n03_name(record),
        }
    }
}

/// 抽出器の並びを先頭から試す
pub fn extract_first(extractors: &[Extractor], record: &Record) -> Option<String> {
    extractors.iter().find_map(|e| e.extract(record))
}

fn plain_then_postal(keys: &[&'static str]) -> Vec<Extractor> {
    keys.iter()
        .map(|&k| {
            if keys::ZIP_KEYS.contains(&k) {
                Extractor::Postal(k)
            } else {
                Extractor::Plain(k)
            }
        })
        .collect()
}

fn composed_then(keys: &[&'static str]) -> Vec<Extractor> {
    std::iter::once(Extractor::ComposedN03)
        .chain(keys.iter().map(|&k| Extractor::Plain(k)))
        .collect()
}

lazy_static::lazy_static! {
    pub static ref ID_EXTRACTORS: Vec<Extractor> = plain_then_postal(keys::AREA_ID_KEYS);
    pub static ref NAME_EXTRACTORS: Vec<Extractor> = composed_then(keys::AREA_NAME_KEYS);
    pub static ref MUNICIPALITY_EXTRACTORS: Vec<Extractor> = composed_then(keys::MUNICIPALITY_KEYS);
    pub static ref TOWN_EXTRACTORS: Vec<Extractor> =
        keys::TOWN_KEYS.iter().map(|&k| Extractor::Plain(k)).collect();
}

/// `N03_004` + `N03_005`（区がなければ市名のみ）
pub fn compose_n03_name(record: &Record) -> Option<String> {
    let city = prop(record, keys::N03_CITY_KEY)?;
    match prop(record, keys::N03_WARD_KEY) {
        Some(ward) => Some(format!("{}{}", city, ward)),
        None => Some(city),
    }
}

/// 抽出した識別情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub id: String,
    pub display_name: String,
    pub municipality: String,
    pub town_name: String,
}

/// ID を持たないレコードに連番を振るためのカウンタ（カタログ構築ごとに1つ）
#[derive(Debug, Clone, Default)]
pub struct FallbackSequence {
    next: u32,
}

impl FallbackSequence {
    pub fn new() -> Self {
        Self::default()
    }

    fn advance(&mut self) -> u32 {
        self.next += 1;
        self.next
    }
}

/// レコード1件の識別情報を抽出
///
/// IDが取れない場合は `name:<表示名>`、表示名もなければ `feature:<連番5桁>`。
/// 連番は入力順に依存するため、入力の並びが変わると同じ地物でもIDが変わる。
pub fn resolve(record: &Record, sequence: &mut FallbackSequence) -> ResolvedIdentity {
    let display_name = extract_first(&NAME_EXTRACTORS, record).unwrap_or_default();
    let municipality = canonical_municipality(
        &extract_first(&MUNICIPALITY_EXTRACTORS, record).unwrap_or_else(|| display_name.clone()),
    );
    let town_name = extract_town_name(record, &display_name, &municipality);

    let id = match extract_first(&ID_EXTRACTORS, record) {
        Some(id) => id,
        None => {
            // 連番は ID がない地物ごとに消費する
            let seq = sequence.advance();
            if display_name.is_empty() {
                format!("feature:{:05}", seq)
            } else {
                format!("name:{}", display_name)
            }
        }
    };

    ResolvedIdentity {
        id,
        display_name,
        municipality,
        town_name,
    }
}

/// 町名: 専用プロパティ、なければ表示名から市区町村名を除いた残り
pub fn extract_town_name(record: &Record, display_name: &str, municipality: &str) -> String {
    if let Some(direct) = extract_first(&TOWN_EXTRACTORS, record) {
        return direct;
    }

    let name = display_name.trim();
    let muni = municipality.trim();
    if !name.is_empty() && !muni.is_empty() && name.len() > muni.len() {
        if let Some(rest) = name.strip_prefix(muni) {
            return rest.trim().to_string();
        }
    }
    String::new()
}
