//! 再構築・先読みの遅延実行
//!
//! ## 処理フロー
//! 1. 表示切替のたびに `request_rebuild`（世代を進めて前のタイマーを止める）
//! 2. `rebuild_debounce_ms` 後にチケットがチャネルに届く
//! 3. 受け取り側（REPLのループ）が最新のチケットだけを `run_ticket` で実行
//!
//! 先読みは操作が `prewarm_delay_ms` 途切れたら実行する。失敗しても握りつぶす。
//! セッションの変更は受け取り側のループだけが行う。

use crate::config::Config;
use crate::loader;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zoning_common::session::DetailLevel;
use zoning_common::{DeferredKind, Generation, Ticket, ZoningSession};

pub struct DeferredScheduler {
    debounce: Duration,
    prewarm_delay: Duration,
    generations: HashMap<DeferredKind, Generation>,
    timers: HashMap<DeferredKind, JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Ticket>,
    rx: mpsc::UnboundedReceiver<Ticket>,
}

impl DeferredScheduler {
    pub fn new(debounce: Duration, prewarm_delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let generations = [DeferredKind::Rebuild, DeferredKind::Prewarm]
            .into_iter()
            .map(|kind| (kind, Generation::new()))
            .collect();
        Self {
            debounce,
            prewarm_delay,
            generations,
            timers: HashMap::new(),
            tx,
            rx,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.rebuild_debounce_ms),
            Duration::from_millis(config.prewarm_delay_ms),
        )
    }

    fn generation(&self, kind: DeferredKind) -> &Generation {
        // new() で両方登録済み
        &self.generations[&kind]
    }

    fn schedule(&mut self, kind: DeferredKind, delay: Duration) -> Ticket {
        let ticket = self.generation(kind).issue(kind);
        if let Some(previous) = self.timers.remove(&kind) {
            previous.abort();
        }

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ticket);
        });
        self.timers.insert(kind, handle);
        ticket
    }

    /// 再構築を予約（保留中の再構築は無効になる）
    pub fn request_rebuild(&mut self) -> Ticket {
        self.schedule(DeferredKind::Rebuild, self.debounce)
    }

    /// 先読みを予約（操作のたびに呼んで待ち時間をやり直す）
    pub fn request_prewarm(&mut self) -> Ticket {
        self.schedule(DeferredKind::Prewarm, self.prewarm_delay)
    }

    /// 保留中の予約を取り消す
    pub fn cancel(&mut self, kind: DeferredKind) {
        self.generation(kind).invalidate();
        if let Some(handle) = self.timers.remove(&kind) {
            handle.abort();
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.generation(ticket.kind).is_current(ticket)
    }

    /// 次に期限が来た最新のチケットを待つ（古いチケットは捨てる）
    pub async fn next_due(&mut self) -> Ticket {
        loop {
            // tx を自分で持っているのでチャネルは閉じない
            let Some(ticket) = self.rx.recv().await else {
                return std::future::pending().await;
            };
            if self.is_current(&ticket) {
                self.timers.remove(&ticket.kind);
                return ticket;
            }
            tracing::trace!(kind = ?ticket.kind, "stale ticket dropped");
        }
    }

    /// 期限が来ているチケットがあれば返す
    pub fn try_next_due(&mut self) -> Option<Ticket> {
        while let Ok(ticket) = self.rx.try_recv() {
            if self.is_current(&ticket) {
                self.timers.remove(&ticket.kind);
                return Some(ticket);
            }
        }
        None
    }
}

/// 先読みに使う元データの場所
#[derive(Debug, Clone, Default)]
pub struct PrewarmSources {
    pub municipality: Option<PathBuf>,
    pub town: Option<PathBuf>,
}

impl PrewarmSources {
    pub fn from_config(config: &Config) -> Self {
        Self {
            municipality: config.zone_source_path.clone(),
            town: config.town_source_path.clone(),
        }
    }

    fn path_for(&self, level: DetailLevel) -> Option<&PathBuf> {
        match level {
            DetailLevel::Municipality => self.municipality.as_ref(),
            DetailLevel::Town => self.town.as_ref(),
        }
    }
}

/// チケットを実行する。実行した場合 true
pub async fn run_ticket(session: &mut ZoningSession, ticket: &Ticket, sources: &PrewarmSources) -> bool {
    match ticket.kind {
        DeferredKind::Rebuild => session.flush(),
        DeferredKind::Prewarm => prewarm(session, sources).await,
    }
}

/// もう一方の詳細度を先読みする。未読込なら読み込みから行い、失敗は無視
async fn prewarm(session: &mut ZoningSession, sources: &PrewarmSources) -> bool {
    let level = session.active_level().other();
    if !session.is_loaded(level) {
        let Some(path) = sources.path_for(level) else {
            return false;
        };
        if let Err(e) = loader::load_zone_source(session, level, path).await {
            tracing::debug!(level = %level, error = %e, "prewarm load failed; will retry on demand");
            return false;
        }
    }
    session.prewarm()
}
