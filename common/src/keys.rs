//! プロパティ名・CSVヘッダの同義語リスト
//!
//! 入力データの列名は出典ごとに異なるため、論理フィールドごとに
//! 候補名を優先順で並べて保持する。分岐コードではなくデータとして持つ。

/// 郵便番号系のプロパティ（値は7桁に正規化）
pub const ZIP_KEYS: &[&str] = &["zip_code", "zipcode", "zip", "postal_code", "郵便番号"];

/// エリアID候補（先頭ほど優先、末尾に郵便番号系）
pub const AREA_ID_KEYS: &[&str] = &[
    "area_id",
    "area_code",
    "code",
    "id",
    "N03_007",
    "zip_code",
    "zipcode",
    "zip",
    "postal_code",
    "郵便番号",
];

pub const AREA_NAME_KEYS: &[&str] = &[
    "area_name",
    "name",
    "名称",
    "municipality",
    "市区町村",
    "市区",
    "対応エリア",
    "N03_004",
    "N03_003",
];

pub const MUNICIPALITY_KEYS: &[&str] = &[
    "municipality",
    "city",
    "ward",
    "自治体",
    "市区町村",
    "市区",
    "対応エリア",
    "N03_004",
];

pub const TOWN_KEYS: &[&str] = &["town_name", "S_NAME", "町"];

/// N03 行政区域データの市区町村名・政令市区名
pub const N03_CITY_KEY: &str = "N03_004";
pub const N03_WARD_KEY: &str = "N03_005";

/// 表示の切替に使う地域名（都道府県）
pub const REGION_KEYS: &[&str] = &["N03_001", "pref_name", "PREF_NAME", "prefecture", "都道府県"];

/// レコードに直接埋め込まれた配車ラベル
pub const INLINE_LABEL_KEYS: &[&str] = &["対応エリア", "dispatch_label", "area_label"];

/// レコードに埋め込まれた初期デポ
pub const DEPOT_HINT_KEYS: &[&str] = &[
    "depot",
    "depot_code",
    "depot_name",
    "担当デポ",
    "管轄デポ",
    "管轄",
];

/// 参照CSV（配車エリア表）の列名
pub mod reference {
    pub const DEPOT: &[&str] = &["管轄デポ", "担当デポ", "depot_code", "depot"];
    pub const MUNICIPALITY: &[&str] = &["市区", "city", "municipality", "市区町村"];
    pub const LABEL: &[&str] = &["対応エリア", "area_name", "dispatch_label", "label"];
    pub const TOWN: &[&str] = &["町", "town", "S_NAME", "town_name"];
    pub const POSTAL: &[&str] = &["郵便番号", "zip_code", "zipcode", "zip", "postal_code"];
}

/// 割当上書きCSVの列名
pub mod overrides {
    pub const AREA_ID: &[&str] = &["area_id", "area_code", "id", "code", "N03_007"];
    pub const DEPOT: &[&str] = &["depot_code", "depot", "管轄デポ", "担当デポ"];
}

/// 特定施設向けの例外行を示すラベル（集計対象外）
pub const SPECIAL_FACILITY_LABEL: &str = "特定施設・基地等";

/// 「以下に掲載がない場合」＝町名なし
pub const UNLISTED_TOWN: &str = "以下に掲載がない場合";
