use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZoningError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("データフォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error(transparent)]
    Engine(#[from] zoning_common::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel生成エラー: {0}")]
    Excel(String),

    #[error("表計算ファイル読み込みエラー: {0}")]
    Spreadsheet(String),

    #[error("エクスポートエラー: {0}")]
    Export(String),

    #[error("入力エラー: {0}")]
    Prompt(String),
}

impl From<rust_xlsxwriter::XlsxError> for ZoningError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        ZoningError::Excel(e.to_string())
    }
}

impl From<calamine::Error> for ZoningError {
    fn from(e: calamine::Error) -> Self {
        ZoningError::Spreadsheet(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ZoningError>;
