use crate::error::{Result, ZoningError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use zoning_common::session::{SessionOptions, DEFAULT_TOWN_DETAIL_MIN_ZOOM};
use zoning_common::history::DEFAULT_HISTORY_LIMIT;

/// 配車エリア表パスの環境変数
pub const REFERENCE_ENV: &str = "DEPOT_ZONING_REFERENCE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 市区町村単位のエリアGeoJSON
    pub zone_source_path: Option<PathBuf>,
    /// 町丁目単位のエリアGeoJSON（ズーム時に使う）
    pub town_source_path: Option<PathBuf>,
    /// 配車エリア表（CSV / XLSX）
    pub reference_path: Option<PathBuf>,
    /// 運用対象の市区町村（GeoJSON / 改行区切りテキスト）
    pub in_scope_path: Option<PathBuf>,
    pub visible_regions: Vec<String>,
    pub rebuild_debounce_ms: u64,
    pub prewarm_delay_ms: u64,
    pub history_limit: usize,
    pub town_detail_min_zoom: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zone_source_path: None,
            town_source_path: None,
            reference_path: None,
            in_scope_path: None,
            visible_regions: vec!["神奈川県".into(), "東京都".into()],
            rebuild_debounce_ms: 16,
            prewarm_delay_ms: 800,
            history_limit: DEFAULT_HISTORY_LIMIT,
            town_detail_min_zoom: DEFAULT_TOWN_DETAIL_MIN_ZOOM,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ZoningError::Config(format!("{}: {}", config_path.display(), e)))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ZoningError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("depot-zoning").join("config.json"))
    }

    /// 配車エリア表のパス（環境変数を優先）
    pub fn reference_path(&self) -> Option<PathBuf> {
        if let Ok(path) = std::env::var(REFERENCE_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        self.reference_path.clone()
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            history_limit: self.history_limit,
            town_detail_min_zoom: self.town_detail_min_zoom,
            visible_regions: if self.visible_regions.is_empty() {
                None
            } else {
                Some(self.visible_regions.clone())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.rebuild_debounce_ms, 16);
        assert_eq!(config.prewarm_delay_ms, 800);
        assert_eq!(config.history_limit, 200);
        assert_eq!(config.visible_regions, vec!["神奈川県", "東京都"]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"history_limit": 50}"#).unwrap();
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.prewarm_delay_ms, 800);
        assert!(config.reference_path.is_none());
    }

    #[test]
    fn test_session_options() {
        let mut config = Config::default();
        config.visible_regions.clear();
        let options = config.session_options();
        assert!(options.visible_regions.is_none());
        assert_eq!(options.town_detail_min_zoom, 13.0);
    }
}
