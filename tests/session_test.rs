//! セッション全体の統合テスト
//!
//! 読込 → 照合 → 選択 → 割当 → 表示切替 の一連の流れを検証

use serde_json::json;
use std::collections::HashSet;
use zoning_common::session::DetailLevel;
use zoning_common::{
    canonical_municipality, CatalogOptions, DepotCode, InScopeSet, ReconciliationIndex,
    ZoneCatalog, ZoningSession,
};

fn fujisawa_source() -> String {
    json!({"type": "FeatureCollection", "features": [
        {"properties": {"area_id": "F1", "municipality": "藤沢市", "town_name": "本町1丁目", "N03_001": "神奈川県", "depot": "FUJ"}},
        {"properties": {"area_id": "F2", "municipality": "藤沢市", "town_name": "辻堂", "N03_001": "神奈川県"}},
        {"properties": {"area_id": "F3", "municipality": "藤沢市", "town_name": "鵠沼", "N03_001": "神奈川県", "depot": "SGM"}},
        {"properties": {"area_id": "F4", "municipality": "藤沢市", "town_name": "湘南台", "N03_001": "神奈川県"}},
        {"properties": {"area_id": "F5", "municipality": "藤沢市", "town_name": "善行", "N03_001": "神奈川県"}},
        {"properties": {"area_id": "M1", "municipality": "町田市", "town_name": "原町田", "N03_001": "東京都", "depot": "SGM"}}
    ]})
    .to_string()
}

fn loaded_session() -> ZoningSession {
    let mut session = ZoningSession::default();
    session
        .load_source(DetailLevel::Municipality, &fujisawa_source(), "fp-fujisawa")
        .unwrap();
    session
}

/// 正規化は何度かけても同じ結果
#[test]
fn test_canonical_municipality_idempotent() {
    for input in ["神奈川県 横浜港北区", "藤沢", "東京都町田（旧）", "川崎中原区", "相模原市緑区"] {
        let once = canonical_municipality(input);
        assert_eq!(canonical_municipality(&once), once, "input: {}", input);
    }
}

/// 1回の構築でIDは重複しない
#[test]
fn test_zone_ids_unique_per_build() {
    let value = json!([
        {"area_id": "A1", "municipality": "藤沢市"},
        {"area_id": "A1", "municipality": "藤沢市", "depot": "YOK"},
        {"name": "辻堂"},
        {"name": "辻堂"},
        {},
        {}
    ]);
    let catalog = ZoneCatalog::from_value(&value, CatalogOptions::default()).unwrap();
    let ids: Vec<&str> = catalog.ids().collect();
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len());
    assert!(catalog.contains("A1"));
    assert!(catalog.contains("name:辻堂"));
    // 後から出た空でない割当ヒントが勝つ
    assert_eq!(catalog.seeds().get("A1"), Some(&Some(DepotCode::Yok)));
}

/// N03 の市区町村と区を合成、郵便番号IDは7桁に正規化
#[test]
fn test_n03_and_zip_identity() {
    let source = json!({"type": "FeatureCollection", "features": [
        {"properties": {"N03_001": "神奈川県", "N03_004": "横浜市", "N03_005": "鶴見区", "N03_007": "14101"}},
        {"properties": {"zip_code": "252-0001", "municipality": "相模原市緑区"}}
    ]})
    .to_string();
    let mut session = ZoningSession::default();
    session.load_source(DetailLevel::Municipality, &source, "fp").unwrap();

    let label = session.label_for("14101").unwrap();
    assert_eq!(label.municipality, "横浜市鶴見区");
    assert_eq!(label.display_name, "横浜市鶴見区");

    let label = session.label_for("2520001").unwrap();
    assert_eq!(label.postal_codes_formatted, "252-0001");
}

/// 町丁目の「1丁目」を落として照合
#[test]
fn test_reference_matches_town_without_chome() {
    let index = ReconciliationIndex::from_csv_str("管轄デポ,市区,町,対応エリア\nFUJ,藤沢市,本町1丁目,中央\n").unwrap();
    assert_eq!(index.lookup_label("藤沢市", "本町1丁目", &[]), "中央");
    assert_eq!(index.lookup_label("藤沢市", "本町", &[]), "中央");

    let mut session = loaded_session();
    session.set_reference(index);
    assert_eq!(session.label_for("F1").unwrap().dispatch_label, "中央");
    // 町が一致しなくても市区町村の既定ラベル
    assert_eq!(session.label_for("F2").unwrap().dispatch_label, "中央");
}

/// 多数決。同数なら辞書順で小さいラベル
#[test]
fn test_majority_vote() {
    let tie = "管轄デポ,市区,対応エリア\n\
               FUJ,藤沢市,B\nFUJ,藤沢市,B\nFUJ,藤沢市,B\n\
               FUJ,藤沢市,A\nFUJ,藤沢市,A\nFUJ,藤沢市,A\n";
    let index = ReconciliationIndex::from_csv_str(tie).unwrap();
    assert_eq!(index.lookup_label("藤沢市", "", &[]), "A");

    let majority = "管轄デポ,市区,対応エリア\n\
                    FUJ,藤沢市,A\nFUJ,藤沢市,A\nFUJ,藤沢市,A\n\
                    FUJ,藤沢市,B\nFUJ,藤沢市,B\n";
    let index = ReconciliationIndex::from_csv_str(majority).unwrap();
    assert_eq!(index.lookup_label("藤沢市", "", &[]), "A");
}

/// 初期化で最初の割当表に戻る
#[test]
fn test_reset_to_initial_reproduces_seed() {
    let mut session = loaded_session();
    let seeded = session.assignments().unwrap().full().clone();
    assert_eq!(seeded.get("F1"), Some(&Some(DepotCode::Fuj)));

    session.assign("F1", Some(DepotCode::Yok)).unwrap();
    session.assign("F2", Some(DepotCode::Sgm)).unwrap();
    assert_ne!(session.assignments().unwrap().full(), &seeded);

    session.reset_to_initial();
    assert_eq!(session.assignments().unwrap().full(), &seeded);
    assert_eq!(session.assignments().unwrap().visible(), &seeded);
}

/// N回取り消してN回やり直すと元に戻る
#[test]
fn test_undo_redo_round_trip() {
    let mut session = loaded_session();
    let ids = ["F1", "F2", "F3", "F4", "F5"];
    for id in ids {
        assert!(session.toggle(id).unwrap());
    }
    let after = session.selection().clone();

    for _ in ids {
        assert!(session.undo());
    }
    assert!(session.selection().is_empty());
    assert!(!session.undo());

    for _ in ids {
        assert!(session.redo());
    }
    assert_eq!(session.selection(), &after);
    assert!(!session.redo());
}

/// 5エリアをなぞると5件選択、履歴は1件だけ増える。戻っても解除しない
#[test]
fn test_brush_across_five_zones() {
    let mut session = loaded_session();
    let before = session.history().len();

    assert!(session.brush_down("F1"));
    for id in ["F2", "F3", "F4", "F5", "F3", "F1"] {
        session.brush_enter(id);
    }
    session.brush_up().unwrap();

    assert_eq!(session.selection().len(), 5);
    assert_eq!(session.history().len(), before + 1);

    assert!(session.undo());
    assert!(session.selection().is_empty());
}

/// 地域を隠して戻しても割当は変わらない
#[test]
fn test_hide_and_restore_region_keeps_assignments() {
    let mut session = loaded_session();
    session.assign("F2", Some(DepotCode::Yok)).unwrap();
    session.toggle("M1").unwrap();
    let full = session.assignments().unwrap().full().clone();

    assert!(session.set_region_visible("東京都", false));
    assert!(session.flush());
    assert!(!session.catalog().contains("M1"));
    assert!(session.selection().is_empty());
    assert_eq!(session.assignments().unwrap().full(), &full);
    assert!(!session.assignments().unwrap().visible().contains_key("M1"));

    assert!(session.set_region_visible("東京都", true));
    assert!(session.flush());
    assert!(session.catalog().contains("M1"));
    assert_eq!(session.assignments().unwrap().full(), &full);
    assert_eq!(
        session.style_inputs_for("M1").unwrap().assigned_depot,
        Some(DepotCode::Sgm)
    );
    assert_eq!(
        session.style_inputs_for("F2").unwrap().assigned_depot,
        Some(DepotCode::Yok)
    );
}

/// 割当CSVの適用。不明なエリアは数えるだけ
#[test]
fn test_apply_overrides() {
    let mut session = loaded_session();
    let report = session
        .apply_overrides("area_id,depot_code\nF2,YOK\nF1,\nZZ,FUJ\n")
        .unwrap();
    assert_eq!(report.applied, 2);
    assert_eq!(report.unknown_zone, 1);
    assert_eq!(session.style_inputs_for("F1").unwrap().assigned_depot, None);
    assert_eq!(
        session.style_inputs_for("F2").unwrap().assigned_depot,
        Some(DepotCode::Yok)
    );
    assert_eq!(session.change_rows().len(), 2);
}

/// 運用対象を絞ると、対象外になったエリアは取り消しでも戻らない
#[test]
fn test_narrowing_scope_resets_undo() {
    let mut session = loaded_session();
    session.toggle("M1").unwrap();
    session.toggle("F1").unwrap();

    session.set_in_scope(InScopeSet::from_names(["藤沢市"]));
    assert!(!session.is_in_scope("M1"));
    assert!(!session.history().can_undo());
    assert!(!session.undo());
    assert_eq!(session.selected_ids(), vec!["F1".to_string()]);
}
