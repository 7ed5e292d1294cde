//! デポ定義
//!
//! 割当先となるデポは固定の少数集合。コードは3文字の略称。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// デポコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DepotCode {
    #[serde(rename = "SGM")]
    Sgm,
    #[serde(rename = "FUJ")]
    Fuj,
    #[serde(rename = "YOK")]
    Yok,
}

impl DepotCode {
    /// 全デポ（表示順）
    pub const ALL: [DepotCode; 3] = [DepotCode::Sgm, DepotCode::Fuj, DepotCode::Yok];

    pub fn code(&self) -> &'static str {
        match self {
            DepotCode::Sgm => "SGM",
            DepotCode::Fuj => "FUJ",
            DepotCode::Yok => "YOK",
        }
    }

    /// 表示名（エクスポートの depot_name 列）
    pub fn display_name(&self) -> &'static str {
        match self {
            DepotCode::Sgm => "相模原デポ SGM",
            DepotCode::Fuj => "藤沢デポ FUJ",
            DepotCode::Yok => "横浜港北デポ YOK",
        }
    }

    /// 塗り色
    pub fn color(&self) -> &'static str {
        match self {
            DepotCode::Sgm => "#2e7d32",
            DepotCode::Fuj => "#2d6cdf",
            DepotCode::Yok => "#b71c1c",
        }
    }

    /// 厳密なコード文字列から変換（大文字小文字は無視）
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_uppercase().as_str() {
            "SGM" => Ok(DepotCode::Sgm),
            "FUJ" => Ok(DepotCode::Fuj),
            "YOK" => Ok(DepotCode::Yok),
            _ => Err(Error::UnknownDepot(value.to_string())),
        }
    }
}

impl fmt::Display for DepotCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 自由記述のデポ表記をコードに正規化する
///
/// `SGM` / `相模原デポ SGM` / `藤沢` のような表記ゆれを吸収する。
/// 判定できない場合は `None`。
pub fn normalize_depot_code(value: &str) -> Option<DepotCode> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(code) = DepotCode::parse(raw) {
        return Some(code);
    }

    let upper = raw.to_uppercase();
    if upper.contains("SGM") {
        return Some(DepotCode::Sgm);
    }
    if upper.contains("FUJ") {
        return Some(DepotCode::Fuj);
    }
    if upper.contains("YOK") {
        return Some(DepotCode::Yok);
    }

    if raw.contains("相模原") {
        return Some(DepotCode::Sgm);
    }
    if raw.contains("藤沢") {
        return Some(DepotCode::Fuj);
    }
    if raw.contains("横浜港北") {
        return Some(DepotCode::Yok);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact() {
        assert_eq!(DepotCode::parse("sgm").unwrap(), DepotCode::Sgm);
        assert_eq!(DepotCode::parse(" YOK ").unwrap(), DepotCode::Yok);
        assert!(matches!(DepotCode::parse("ABC"), Err(Error::UnknownDepot(_))));
    }

    #[test]
    fn test_normalize_depot_code_variants() {
        assert_eq!(normalize_depot_code("相模原デポ SGM"), Some(DepotCode::Sgm));
        assert_eq!(normalize_depot_code("藤沢"), Some(DepotCode::Fuj));
        assert_eq!(normalize_depot_code("横浜港北デポ"), Some(DepotCode::Yok));
        assert_eq!(normalize_depot_code("fuj-2"), Some(DepotCode::Fuj));
        assert_eq!(normalize_depot_code(""), None);
        assert_eq!(normalize_depot_code("横浜"), None);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(DepotCode::Fuj.display_name(), "藤沢デポ FUJ");
        assert_eq!(DepotCode::Yok.to_string(), "YOK");
    }
}
