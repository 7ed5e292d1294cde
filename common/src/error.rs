//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 入力がレコード集合として不正（FeatureCollectionでない等）
    #[error("Input format error: {0}")]
    InputFormat(String),

    /// 現在のカタログに存在しないエリアへの操作
    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    #[error("Unknown depot code: {0}")]
    UnknownDepot(String),

    #[error("エクスポートするデータがありません")]
    EmptyCatalog,

    #[error("Config error: {0}")]
    Config(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::Io(io_error);
        let display = format!("{}", error);
        assert!(display.contains("IO error"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_error_display_input_format() {
        let error = Error::InputFormat("FeatureCollectionではありません".to_string());
        assert_eq!(
            format!("{}", error),
            "Input format error: FeatureCollectionではありません"
        );
    }

    #[test]
    fn test_error_display_unknown_zone() {
        let error = Error::UnknownZone("KA14-001".to_string());
        assert_eq!(format!("{}", error), "Unknown zone: KA14-001");
    }

    #[test]
    fn test_error_display_empty_catalog() {
        let display = format!("{}", Error::EmptyCatalog);
        assert!(display.contains("データがありません"));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }

    #[test]
    fn test_error_debug() {
        let error = Error::Config("テスト".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("Config"));
        assert!(debug.contains("テスト"));
    }
}
