//! depot-zoning
//!
//! エリアGeoJSONと配車エリア表を読み込み、デポ担当エリアの選択・割当・出力を行う。
//! エンジン本体は `zoning-common`、ここではファイル入出力と対話操作を扱う。

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod fingerprint;
pub mod loader;
pub mod repl;
pub mod scheduler;
