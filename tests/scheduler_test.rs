//! 遅延実行（再構築・先読み）の統合テスト
//!
//! 時計を止めた状態で、要求の合流・取り消し・先読みを検証

use depot_zoning::loader;
use depot_zoning::scheduler::{run_ticket, DeferredScheduler, PrewarmSources};
use std::time::Duration;
use tempfile::tempdir;
use tokio::time::Instant;
use zoning_common::session::DetailLevel;
use zoning_common::{DeferredKind, ZoningSession};

const DEBOUNCE: Duration = Duration::from_millis(16);
const PREWARM: Duration = Duration::from_millis(800);

const MUNICIPALITY_SOURCE: &str = r#"{"type": "FeatureCollection", "features": [
    {"properties": {"area_id": "KA14-205", "municipality": "藤沢市", "N03_001": "神奈川県"}},
    {"properties": {"area_id": "TK13-209", "municipality": "町田市", "N03_001": "東京都"}}
]}"#;

const TOWN_SOURCE: &str = r#"{"type": "FeatureCollection", "features": [
    {"properties": {"area_id": "KA14-205-001", "municipality": "藤沢市", "town_name": "本町", "N03_001": "神奈川県"}},
    {"properties": {"area_id": "KA14-205-002", "municipality": "藤沢市", "town_name": "辻堂", "N03_001": "神奈川県"}},
    {"properties": {"area_id": "TK13-209-001", "municipality": "町田市", "town_name": "原町田", "N03_001": "東京都"}}
]}"#;

fn session() -> ZoningSession {
    let mut session = ZoningSession::default();
    session
        .load_source(DetailLevel::Municipality, MUNICIPALITY_SOURCE, "fp-muni")
        .unwrap();
    session
}

/// 連続した再構築要求は最後の1件だけが届く
#[tokio::test(start_paused = true)]
async fn test_rebuild_requests_coalesce() {
    let mut scheduler = DeferredScheduler::new(DEBOUNCE, PREWARM);
    let start = Instant::now();

    scheduler.request_rebuild();
    scheduler.request_rebuild();
    let last = scheduler.request_rebuild();

    let ticket = scheduler.next_due().await;
    assert_eq!(ticket, last);
    assert!(start.elapsed() >= DEBOUNCE);

    tokio::time::sleep(DEBOUNCE * 4).await;
    assert!(scheduler.try_next_due().is_none());
}

/// 取り消した再構築は届かない
#[tokio::test(start_paused = true)]
async fn test_cancelled_rebuild_never_fires() {
    let mut scheduler = DeferredScheduler::new(DEBOUNCE, PREWARM);

    let rebuild = scheduler.request_rebuild();
    scheduler.cancel(DeferredKind::Rebuild);
    assert!(!scheduler.is_current(&rebuild));

    scheduler.request_prewarm();
    let ticket = scheduler.next_due().await;
    assert_eq!(ticket.kind, DeferredKind::Prewarm);
}

/// 操作が続く間は先読みが後ろにずれる
#[tokio::test(start_paused = true)]
async fn test_prewarm_waits_for_idle() {
    let mut scheduler = DeferredScheduler::new(DEBOUNCE, PREWARM);
    let start = Instant::now();

    scheduler.request_prewarm();
    tokio::time::sleep(PREWARM / 2).await;
    scheduler.request_prewarm();

    let ticket = scheduler.next_due().await;
    assert_eq!(ticket.kind, DeferredKind::Prewarm);
    assert!(start.elapsed() >= PREWARM + PREWARM / 2);
}

/// 表示切替の再構築チケットを実行すると最新の表示状態になる
#[tokio::test(start_paused = true)]
async fn test_rebuild_ticket_applies_latest_visibility() {
    let mut session = session();
    let mut scheduler = DeferredScheduler::new(DEBOUNCE, PREWARM);

    session.set_region_visible("東京都", false);
    scheduler.request_rebuild();
    session.set_region_visible("東京都", true);
    session.set_region_visible("神奈川県", false);
    scheduler.request_rebuild();

    let ticket = scheduler.next_due().await;
    assert!(run_ticket(&mut session, &ticket, &PrewarmSources::default()).await);
    assert_eq!(session.catalog().len(), 1);
    assert!(session.catalog().contains("TK13-209"));

    // 既に反映済みなら何もしない
    assert!(!run_ticket(&mut session, &ticket, &PrewarmSources::default()).await);
}

/// 先読みで町丁目データを読み込み、ズーム時にそのカタログを使う
#[tokio::test]
async fn test_prewarm_loads_town_level() {
    let dir = tempdir().expect("Failed to create temp dir");
    let town_path = dir.path().join("town_blocks.geojson");
    std::fs::write(&town_path, TOWN_SOURCE).unwrap();

    let mut session = session();
    let sources = PrewarmSources {
        municipality: None,
        town: Some(town_path),
    };
    let mut scheduler = DeferredScheduler::new(DEBOUNCE, Duration::from_millis(1));

    scheduler.request_prewarm();
    let ticket = scheduler.next_due().await;
    assert!(run_ticket(&mut session, &ticket, &sources).await);
    assert!(session.is_loaded(DetailLevel::Town));
    assert!(session.is_prewarmed(DetailLevel::Town));
    assert_eq!(session.active_level(), DetailLevel::Municipality);

    assert!(session.set_zoom(14.0));
    assert!(session.flush());
    assert_eq!(session.active_level(), DetailLevel::Town);
    assert_eq!(session.catalog().len(), 3);
    assert!(!session.is_prewarmed(DetailLevel::Town));
}

/// 先読み元が読めなくても失敗を握りつぶす
#[tokio::test]
async fn test_prewarm_failure_is_swallowed() {
    let mut session = session();
    let sources = PrewarmSources {
        municipality: None,
        town: Some("/nonexistent/town.geojson".into()),
    };
    let mut scheduler = DeferredScheduler::new(DEBOUNCE, Duration::from_millis(1));

    scheduler.request_prewarm();
    let ticket = scheduler.next_due().await;
    assert!(!run_ticket(&mut session, &ticket, &sources).await);
    assert!(!session.is_loaded(DetailLevel::Town));
    assert_eq!(session.catalog().len(), 2);

    // 読み込みは後から明示的に行える
    let missing = loader::load_zone_source(&mut session, DetailLevel::Town, std::path::Path::new("/nonexistent/town.geojson")).await;
    assert!(missing.is_err());
}
