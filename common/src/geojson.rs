//! エリア元データ（GeoJSON）の読み込み
//!
//! 図形は扱わず、各地物のプロパティだけをレコードとして取り出す。

use crate::error::{Error, Result};
use crate::identity::{first_prop, Record};
use crate::keys;
use serde_json::Value;

/// JSON文字列からレコード列を取り出す
///
/// `FeatureCollection` または プロパティオブジェクトの配列を受け付ける。
/// それ以外は全体を拒否し、部分的な結果は返さない。
pub fn parse_zone_source(text: &str) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::InputFormat(format!("JSONとして読み込めません: {}", e)))?;
    records_from_value(&value)
}

pub fn records_from_value(value: &Value) -> Result<Vec<Record>> {
    match value {
        Value::Object(obj) => {
            if obj.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
                return Err(Error::InputFormat(
                    "FeatureCollection形式のGeoJSONを指定してください".into(),
                ));
            }
            let features = obj
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| Error::InputFormat("features配列がありません".into()))?;

            features
                .iter()
                .enumerate()
                .map(|(i, feature)| feature_properties(i, feature))
                .collect()
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_object()
                    .cloned()
                    .ok_or_else(|| Error::InputFormat(format!("{}件目がオブジェクトではありません", i + 1)))
            })
            .collect(),
        _ => Err(Error::InputFormat(
            "FeatureCollection形式のGeoJSONを指定してください".into(),
        )),
    }
}

fn feature_properties(index: usize, feature: &Value) -> Result<Record> {
    let obj = feature
        .as_object()
        .ok_or_else(|| Error::InputFormat(format!("{}件目の地物が不正です", index + 1)))?;
    match obj.get("properties") {
        Some(Value::Object(props)) => Ok(props.clone()),
        Some(Value::Null) | None => Ok(Record::new()),
        Some(_) => Err(Error::InputFormat(format!(
            "{}件目の properties がオブジェクトではありません",
            index + 1
        ))),
    }
}

/// 地域名（都道府県）。表示切替のキー
pub fn region_of(record: &Record) -> Option<String> {
    first_prop(record, keys::REGION_KEYS)
}

/// 運用対象の市区町村一覧を GeoJSON の `municipality` プロパティから取り出す
pub fn municipalities_from_geojson(text: &str) -> Result<Vec<String>> {
    let records = parse_zone_source(text)?;
    Ok(records
        .iter()
        .filter_map(|r| crate::identity::prop(r, "municipality"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_collection() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"N03_001":"神奈川県","N03_004":"藤沢市"},"geometry":null},
            {"type":"Feature","properties":null,"geometry":null}
        ]}"#;
        let records = parse_zone_source(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(region_of(&records[0]).as_deref(), Some("神奈川県"));
        assert!(records[1].is_empty());
    }

    #[test]
    fn test_plain_array() {
        let records = parse_zone_source(r#"[{"zip_code":"2520001"}]"#).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_rejects_non_collection() {
        assert!(matches!(
            parse_zone_source(r#"{"type":"Feature"}"#),
            Err(Error::InputFormat(_))
        ));
        assert!(matches!(parse_zone_source("not json"), Err(Error::InputFormat(_))));
        assert!(matches!(parse_zone_source("[1, {}]"), Err(Error::InputFormat(_))));
        assert!(matches!(
            parse_zone_source(r#"{"type":"FeatureCollection","features":[{"properties":3}]}"#),
            Err(Error::InputFormat(_))
        ));
    }

    #[test]
    fn test_municipalities_from_geojson() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"properties":{"municipality":"藤沢市"}},
            {"properties":{"municipality":" "}},
            {"properties":{"municipality":"大和市"}}
        ]}"#;
        assert_eq!(municipalities_from_geojson(text).unwrap(), vec!["藤沢市", "大和市"]);
    }
}
