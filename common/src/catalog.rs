//! エリアカタログ
//!
//! 表示中のエリア集合（ID → メタデータ）。入力レコードに識別情報の抽出と
//! 配車エリア表の照合をかけて構築する。
//!
//! ## 重複ID
//! 同じIDのレコードが複数ある場合（マルチポリゴンの分割等）、メタデータは
//! 最初のレコードのものを採用し、後続レコードは初期デポの指定だけを反映する。

use crate::canonical::{collect_postal_codes, format_zone_id_for_display, normalize_postal};
use crate::collate;
use crate::depot::{normalize_depot_code, DepotCode};
use crate::error::Result;
use crate::geojson::{records_from_value, region_of};
use crate::identity::{first_prop, prop, resolve, FallbackSequence, Record};
use crate::keys;
use crate::reconcile::ReconciliationIndex;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};

/// エリアのメタデータ
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneMeta {
    pub id: String,
    pub display_name: String,
    /// 正規化済み市区町村名
    pub municipality: String,
    pub town_name: String,
    pub dispatch_label: String,
    pub postal_codes: BTreeSet<String>,
    pub region: Option<String>,
    pub raw: Record,
}

/// 地域（都道府県）単位の表示切替
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionVisibility {
    hidden: BTreeSet<String>,
}

impl RegionVisibility {
    /// 表示する地域を限定する。`visible` にない地域は `known` から非表示に
    pub fn only<I, S>(visible: I, known: &BTreeSet<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let visible: HashSet<String> = visible.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self {
            hidden: known.iter().filter(|r| !visible.contains(*r)).cloned().collect(),
        }
    }

    /// 地域名のないレコードは常に表示
    pub fn is_visible(&self, region: Option<&str>) -> bool {
        match region {
            Some(region) => !self.hidden.contains(region),
            None => true,
        }
    }

    /// 変化があった場合 true
    pub fn set_visible(&mut self, region: &str, visible: bool) -> bool {
        if visible {
            self.hidden.remove(region)
        } else {
            self.hidden.insert(region.to_string())
        }
    }

    pub fn hidden(&self) -> &BTreeSet<String> {
        &self.hidden
    }
}

/// カタログ構築オプション
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogOptions<'a> {
    pub reconciliation: Option<&'a ReconciliationIndex>,
    pub visibility: Option<&'a RegionVisibility>,
}

/// レコードの初期デポ指定
pub fn extract_depot_hint(record: &Record) -> Option<DepotCode> {
    keys::DEPOT_HINT_KEYS
        .iter()
        .filter_map(|k| prop(record, k))
        .find_map(|v| normalize_depot_code(&v))
}

/// レコード自身の郵便番号フィールド
fn record_postal_codes(record: &Record) -> BTreeSet<String> {
    let mut codes = BTreeSet::new();
    for key in keys::ZIP_KEYS.iter().chain(["postal_codes"].iter()) {
        match record.get(*key) {
            Some(Value::Array(items)) => {
                for item in items.iter().filter_map(|v| v.as_str()) {
                    codes.extend(collect_postal_codes(item));
                }
            }
            Some(_) => {
                if let Some(value) = prop(record, key) {
                    codes.extend(collect_postal_codes(&value));
                }
            }
            None => {}
        }
    }
    codes
}

/// IDそのものが郵便番号の形（`2520001`, `252-0001`）なら取り出す
fn postal_codes_from_id(id: &str) -> BTreeSet<String> {
    let display = format_zone_id_for_display(id);
    let postal_like = !display.is_empty()
        && display.chars().all(|c| c.is_ascii_digit() || c == '-');
    let normalized = normalize_postal(&display);
    if postal_like && normalized.len() == 7 {
        BTreeSet::from([normalized])
    } else {
        BTreeSet::new()
    }
}

/// エリアカタログ
#[derive(Debug, Clone, Default)]
pub struct ZoneCatalog {
    zones: Vec<ZoneMeta>,
    index: HashMap<String, usize>,
    seeds: HashMap<String, Option<DepotCode>>,
    skipped_hidden: usize,
}

impl ZoneCatalog {
    /// JSON値から構築。レコード集合として不正なら全体を拒否
    pub fn from_value(value: &Value, options: CatalogOptions<'_>) -> Result<Self> {
        let records = records_from_value(value)?;
        Ok(Self::build(&records, options))
    }

    /// レコード列から構築
    pub fn build(records: &[Record], options: CatalogOptions<'_>) -> Self {
        let mut catalog = Self::default();
        let mut sequence = FallbackSequence::new();

        for record in records {
            let region = region_of(record);
            if let Some(visibility) = options.visibility {
                if !visibility.is_visible(region.as_deref()) {
                    catalog.skipped_hidden += 1;
                    continue;
                }
            }

            let identity = resolve(record, &mut sequence);
            let hint = extract_depot_hint(record);

            if let Some(&existing) = catalog.index.get(&identity.id) {
                // 後続レコードは初期デポだけ反映
                if hint.is_some() {
                    catalog.seeds.insert(catalog.zones[existing].id.clone(), hint);
                }
                continue;
            }

            let mut postal_codes = record_postal_codes(record);
            if postal_codes.is_empty() {
                if let Some(index) = options.reconciliation {
                    postal_codes = index
                        .lookup_postal_codes(&identity.municipality, &identity.town_name)
                        .into_iter()
                        .collect();
                }
            }
            if postal_codes.is_empty() {
                postal_codes = postal_codes_from_id(&identity.id);
            }

            let codes: Vec<String> = postal_codes.iter().cloned().collect();
            let mut dispatch_label = options
                .reconciliation
                .map(|index| index.lookup_label(&identity.municipality, &identity.town_name, &codes))
                .unwrap_or_default();
            if dispatch_label.is_empty() {
                dispatch_label = first_prop(record, keys::INLINE_LABEL_KEYS).unwrap_or_default();
            }

            let display_name = if identity.display_name.is_empty() {
                identity.id.clone()
            } else {
                identity.display_name
            };

            catalog.index.insert(identity.id.clone(), catalog.zones.len());
            catalog.seeds.insert(identity.id.clone(), hint);
            catalog.zones.push(ZoneMeta {
                id: identity.id,
                display_name,
                municipality: identity.municipality,
                town_name: identity.town_name,
                dispatch_label,
                postal_codes,
                region,
                raw: record.clone(),
            });
        }

        tracing::debug!(
            records = records.len(),
            zones = catalog.zones.len(),
            hidden = catalog.skipped_hidden,
            "zone catalog built"
        );

        catalog
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ZoneMeta> {
        self.index.get(id).map(|&i| &self.zones[i])
    }

    /// 入力順
    pub fn iter(&self) -> impl Iterator<Item = &ZoneMeta> {
        self.zones.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.zones.iter().map(|z| z.id.as_str())
    }

    /// ID → 初期デポ（後続の重複レコードの指定を含む）
    pub fn seeds(&self) -> &HashMap<String, Option<DepotCode>> {
        &self.seeds
    }

    /// 表示切替で除外したレコード数
    pub fn skipped_hidden(&self) -> usize {
        self.skipped_hidden
    }

    /// 市区町村一覧（日本語順）
    pub fn municipalities(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .zones
            .iter()
            .map(|z| z.municipality.as_str())
            .filter(|m| !m.is_empty())
            .collect();
        let mut list: Vec<String> = set.into_iter().map(str::to_string).collect();
        list.sort_by(|a, b| collate::compare(a, b));
        list
    }

    /// 地域名一覧
    pub fn regions(&self) -> BTreeSet<String> {
        self.zones.iter().filter_map(|z| z.region.clone()).collect()
    }
}
