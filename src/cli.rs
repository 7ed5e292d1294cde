use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "depot-zoning")]
#[command(about = "デポ担当エリア割当ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// データフォルダ（GeoJSON・配車エリア表を自動検出）
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// 配車エリア表（CSV/XLSX）
    #[arg(long, global = true)]
    pub reference: Option<PathBuf>,

    /// 運用対象の市区町村リスト（GeoJSON/テキスト）
    #[arg(long, global = true)]
    pub in_scope: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// エリアGeoJSONを読み込んで概要を表示
    Inspect {
        /// エリアGeoJSON（省略時は設定・データフォルダから）
        source: Option<PathBuf>,

        /// エリアごとの詳細を表示
        #[arg(long)]
        zones: bool,
    },

    /// エリアを検索
    Search {
        /// 検索語（ID・郵便番号・名称）
        #[arg(required = true)]
        query: String,

        /// エリアGeoJSON
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// 割当結果を出力
    Export {
        /// エリアGeoJSON
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// 割当CSV（area_id, depot_code）を適用してから出力
        #[arg(short, long)]
        assignments: Option<PathBuf>,

        /// 出力形式 (csv/excel/both)
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,

        /// 出力ファイル/ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 初期状態から変わった割当だけを出力
        #[arg(long)]
        changes_only: bool,

        /// 郵便番号別の現行配車表（CSV/XLSX）に変更を重ねてレポートを出力
        #[arg(long, value_name = "ASIS")]
        changes_zip: Option<PathBuf>,

        /// 割当解除も変更として扱う（--changes-zip と併用）
        #[arg(long, requires = "changes_zip")]
        include_clear: bool,
    },

    /// 対話式で選択・割当を行う
    Session {
        /// エリアGeoJSON（市区町村単位）
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// エリアGeoJSON（町丁目単位）
        #[arg(long)]
        town_source: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// 配車エリア表のパスを設定
        #[arg(long)]
        set_reference: Option<PathBuf>,

        /// エリアGeoJSONのパスを設定
        #[arg(long)]
        set_source: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Excel,
    Both,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "both" => Ok(ExportFormat::Both),
            _ => Err(format!("Unknown format: {}. Use csv, excel, or both", s)),
        }
    }
}
