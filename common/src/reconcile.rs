//! 配車エリア表との照合インデックス
//!
//! 参照CSV（市区・町・郵便番号・対応エリア・管轄デポ）からラベルを多数決で決め、
//! ポリゴン側に欠けている対応エリア名・郵便番号を補う。
//!
//! ## 多数決
//! キーごとにラベルの出現回数を数え、最多のものを採用。同数なら文字列順で小さい方。

use crate::canonical::{canonical_municipality, canonical_town, collect_postal_codes};
use crate::csv::{parse_csv_rows, HeaderIndex};
use crate::depot::normalize_depot_code;
use crate::error::{Error, Result};
use crate::keys::{self, reference};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// ラベルの出現回数
#[derive(Debug, Clone, Default)]
pub struct LabelTally {
    counts: BTreeMap<String, usize>,
}

impl LabelTally {
    pub fn add(&mut self, label: &str) {
        *self.counts.entry(label.to_string()).or_insert(0) += 1;
    }

    /// 最多ラベル（同数なら辞書順で先）
    pub fn majority(&self) -> Option<&str> {
        // BTreeMap は昇順なので、同数のときは先に見たものを残す
        let mut best: Option<(&str, usize)> = None;
        for (label, &count) in &self.counts {
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((label.as_str(), count)),
            }
        }
        best.map(|(label, _)| label)
    }
}

fn collapse<K: std::hash::Hash + Eq>(tallies: HashMap<K, LabelTally>) -> HashMap<K, String> {
    tallies
        .into_iter()
        .filter_map(|(key, tally)| tally.majority().map(|label| (key, label.to_string())))
        .collect()
}

type TownKey = (String, String);

/// 照合インデックス
#[derive(Debug, Clone, Default)]
pub struct ReconciliationIndex {
    town_labels: HashMap<TownKey, String>,
    municipality_labels: HashMap<String, String>,
    postal_labels: HashMap<String, String>,
    town_postal_codes: HashMap<TownKey, BTreeSet<String>>,
}

/// インデックスの件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationStats {
    pub rows_used: usize,
    pub rows_skipped: usize,
    pub towns: usize,
    pub municipalities: usize,
    pub postal_codes: usize,
}

impl ReconciliationIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// CSV文字列から構築
    pub fn from_csv_str(content: &str) -> Result<Self> {
        let rows = parse_csv_rows(content);
        Ok(Self::from_rows(&rows)?.0)
    }

    /// ヘッダ行付きの行データから構築（先頭行がヘッダ）
    pub fn from_rows(rows: &[Vec<String>]) -> Result<(Self, ReconciliationStats)> {
        let Some((header, body)) = rows.split_first() else {
            return Ok((Self::empty(), ReconciliationStats::default()));
        };

        let header = HeaderIndex::new(header);
        for (name, synonyms) in [
            ("市区", reference::MUNICIPALITY),
            ("対応エリア", reference::LABEL),
            ("管轄デポ", reference::DEPOT),
        ] {
            if !header.has_any(synonyms) {
                return Err(Error::InputFormat(format!("参照データに{}列がありません", name)));
            }
        }

        let mut town_tallies: HashMap<TownKey, LabelTally> = HashMap::new();
        let mut municipality_tallies: HashMap<String, LabelTally> = HashMap::new();
        let mut postal_tallies: HashMap<String, LabelTally> = HashMap::new();
        let mut town_postal_codes: HashMap<TownKey, BTreeSet<String>> = HashMap::new();
        let mut stats = ReconciliationStats::default();

        for row in body {
            let depot = header
                .pick(row, reference::DEPOT)
                .and_then(normalize_depot_code);
            let municipality = header
                .pick(row, reference::MUNICIPALITY)
                .map(canonical_municipality)
                .unwrap_or_default();
            let label = header.pick(row, reference::LABEL).unwrap_or_default();

            if depot.is_none()
                || municipality.is_empty()
                || label.is_empty()
                || label == keys::SPECIAL_FACILITY_LABEL
            {
                stats.rows_skipped += 1;
                continue;
            }
            stats.rows_used += 1;

            municipality_tallies
                .entry(municipality.clone())
                .or_default()
                .add(label);

            let postal_codes = header
                .pick(row, reference::POSTAL)
                .map(collect_postal_codes)
                .unwrap_or_default();

            let town = header
                .pick(row, reference::TOWN)
                .map(canonical_town)
                .unwrap_or_default();
            if !town.is_empty() {
                let key = (municipality.clone(), town);
                town_tallies.entry(key.clone()).or_default().add(label);
                town_postal_codes
                    .entry(key)
                    .or_default()
                    .extend(postal_codes.iter().cloned());
            }

            for code in &postal_codes {
                postal_tallies.entry(code.clone()).or_default().add(label);
            }
        }

        let index = Self {
            town_labels: collapse(town_tallies),
            municipality_labels: collapse(municipality_tallies),
            postal_labels: collapse(postal_tallies),
            town_postal_codes,
        };
        stats.towns = index.town_labels.len();
        stats.municipalities = index.municipality_labels.len();
        stats.postal_codes = index.postal_labels.len();

        tracing::debug!(
            rows_used = stats.rows_used,
            rows_skipped = stats.rows_skipped,
            towns = stats.towns,
            municipalities = stats.municipalities,
            "reconciliation index built"
        );

        Ok((index, stats))
    }

    pub fn is_empty(&self) -> bool {
        self.municipality_labels.is_empty()
            && self.town_labels.is_empty()
            && self.postal_labels.is_empty()
    }

    fn town_key(municipality: &str, town: &str) -> Option<TownKey> {
        let town = canonical_town(town);
        if town.is_empty() {
            return None;
        }
        Some((canonical_municipality(municipality), town))
    }

    /// 対応エリア名を引く
    ///
    /// (市区町村, 町) → 郵便番号（順に） → 市区町村の既定ラベル → 空文字
    pub fn lookup_label(&self, municipality: &str, town: &str, postal_codes: &[String]) -> String {
        if let Some(key) = Self::town_key(municipality, town) {
            if let Some(label) = self.town_labels.get(&key) {
                return label.clone();
            }
        }

        for code in postal_codes {
            if let Some(label) = self.postal_labels.get(code) {
                return label.clone();
            }
        }

        self.municipality_labels
            .get(&canonical_municipality(municipality))
            .cloned()
            .unwrap_or_default()
    }

    /// (市区町村, 町) に属する郵便番号（昇順）
    pub fn lookup_postal_codes(&self, municipality: &str, town: &str) -> Vec<String> {
        Self::town_key(municipality, town)
            .and_then(|key| self.town_postal_codes.get(&key))
            .map(|codes| codes.iter().cloned().collect())
            .unwrap_or_default()
    }
}
