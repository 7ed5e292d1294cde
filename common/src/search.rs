//! エリア検索
//!
//! 1. IDまたは郵便番号の完全一致
//! 2. 正規化キー（ID・名称・市区町村・対応エリア・町名）の一致
//! 3. 部分一致（最大40件）

use crate::canonical::{canonical_municipality, canonical_town, normalize_match_key, normalize_postal};
use crate::catalog::ZoneCatalog;
use std::collections::{BTreeSet, HashMap, HashSet};

/// 部分一致の最大件数
pub const MAX_SUBSTRING_RESULTS: usize = 40;

/// 名称検索インデックス（カタログ再構築のたびに作り直す）
#[derive(Debug, Clone, Default)]
pub struct NameSearchIndex {
    keys: HashMap<String, BTreeSet<String>>,
    postal: HashMap<String, BTreeSet<String>>,
}

impl NameSearchIndex {
    pub fn build(catalog: &ZoneCatalog) -> Self {
        let mut index = Self::default();

        for zone in catalog.iter() {
            let names = [
                zone.id.as_str(),
                zone.display_name.as_str(),
                zone.municipality.as_str(),
                zone.dispatch_label.as_str(),
                zone.town_name.as_str(),
            ];
            for name in names.iter().filter(|n| !n.is_empty()) {
                index.add_key(normalize_match_key(name), &zone.id);
                index.add_key(normalize_match_key(&canonical_municipality(name)), &zone.id);
            }
            if !zone.town_name.is_empty() {
                let town = canonical_town(&zone.town_name);
                index.add_key(normalize_match_key(&town), &zone.id);
                index.add_key(
                    normalize_match_key(&format!("{}{}", zone.municipality, town)),
                    &zone.id,
                );
            }
            for code in &zone.postal_codes {
                index.postal.entry(code.clone()).or_default().insert(zone.id.clone());
            }
        }

        tracing::debug!(keys = index.keys.len(), postal = index.postal.len(), "search index built");
        index
    }

    fn add_key(&mut self, key: String, id: &str) {
        if key.is_empty() {
            return;
        }
        self.keys.entry(key).or_default().insert(id.to_string());
    }

    /// 完全一致（ID・郵便番号）
    fn exact(&self, catalog: &ZoneCatalog, raw: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        if catalog.contains(raw) {
            out.push(raw.to_string());
        }

        let zipped = normalize_postal(raw);
        if zipped.len() == 7 {
            if catalog.contains(&zipped) && !out.contains(&zipped) {
                out.push(zipped.clone());
            }
            if let Some(ids) = self.postal.get(&zipped) {
                for id in ids {
                    if !out.contains(id) {
                        out.push(id.clone());
                    }
                }
            }
        }
        out
    }

    /// 正規化キー一致（カタログ順）
    fn by_key(&self, catalog: &ZoneCatalog, raw: &str) -> Vec<String> {
        let mut hits: HashSet<&str> = HashSet::new();
        for key in [
            normalize_match_key(raw),
            normalize_match_key(&canonical_municipality(raw)),
            normalize_match_key(&canonical_town(raw)),
        ] {
            if let Some(ids) = self.keys.get(&key) {
                hits.extend(ids.iter().map(String::as_str));
            }
        }
        catalog
            .ids()
            .filter(|id| hits.contains(id))
            .map(str::to_string)
            .collect()
    }

    /// 部分一致（ID・名称・市区町村・対応エリア・町名）
    fn by_substring(&self, catalog: &ZoneCatalog, raw: &str) -> Vec<String> {
        let lowered = raw.to_lowercase();
        catalog
            .iter()
            .filter(|zone| {
                let haystack = format!(
                    "{} {} {} {} {}",
                    zone.id, zone.display_name, zone.municipality, zone.dispatch_label, zone.town_name
                )
                .to_lowercase();
                haystack.contains(&lowered)
            })
            .take(MAX_SUBSTRING_RESULTS)
            .map(|zone| zone.id.clone())
            .collect()
    }

    /// 検索。空のクエリは空の結果
    pub fn search(&self, catalog: &ZoneCatalog, query: &str) -> Vec<String> {
        let raw = query.trim();
        if raw.is_empty() {
            return Vec::new();
        }

        let exact = self.exact(catalog, raw);
        if !exact.is_empty() {
            return exact;
        }

        let keyed = self.by_key(catalog, raw);
        if !keyed.is_empty() {
            return keyed;
        }

        self.by_substring(catalog, raw)
    }
}
