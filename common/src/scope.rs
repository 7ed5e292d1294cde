//! 運用対象の市区町村
//!
//! 対象外の市区町村は地図上に表示されるが、選択・割当はできない。

use crate::canonical::canonical_municipality;
use std::collections::HashSet;

/// 既定の対象市区町村（外部リストが取得できないときに使う）
pub const DEFAULT_IN_SCOPE_MUNICIPALITIES: &[&str] = &[
    "大和市",
    "川崎市中原区",
    "川崎市多摩区",
    "川崎市宮前区",
    "川崎市川崎区",
    "川崎市幸区",
    "川崎市高津区",
    "川崎市麻生区",
    "平塚市",
    "座間市",
    "横浜市中区",
    "横浜市保土ケ谷区",
    "横浜市南区",
    "横浜市戸塚区",
    "横浜市旭区",
    "横浜市栄区",
    "横浜市泉区",
    "横浜市港北区",
    "横浜市港南区",
    "横浜市瀬谷区",
    "横浜市磯子区",
    "横浜市神奈川区",
    "横浜市緑区",
    "横浜市西区",
    "横浜市都筑区",
    "横浜市金沢区",
    "横浜市青葉区",
    "横浜市鶴見区",
    "海老名市",
    "町田市",
    "相模原市中央区",
    "相模原市南区",
    "綾瀬市",
    "茅ヶ崎市",
    "藤沢市",
    "鎌倉市",
];

/// 対象市区町村の集合
#[derive(Debug, Clone)]
pub struct InScopeSet {
    municipalities: HashSet<String>,
}

impl Default for InScopeSet {
    fn default() -> Self {
        Self::from_names(DEFAULT_IN_SCOPE_MUNICIPALITIES.iter().copied())
    }
}

impl InScopeSet {
    /// 名前は正規化して保持する。空なら既定値
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let municipalities: HashSet<String> = names
            .into_iter()
            .map(|n| canonical_municipality(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        if municipalities.is_empty() {
            return Self::default();
        }
        Self { municipalities }
    }

    /// 改行区切りのテキストから
    pub fn from_lines(text: &str) -> Self {
        Self::from_names(text.lines())
    }

    /// 市区町村が空のエリアは対象扱い
    pub fn contains(&self, municipality: &str) -> bool {
        let municipality = municipality.trim();
        municipality.is_empty() || self.municipalities.contains(municipality)
    }

    pub fn len(&self) -> usize {
        self.municipalities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.municipalities.is_empty()
    }
}
