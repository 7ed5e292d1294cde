//! 遅延処理の世代管理
//!
//! 再構築要求のたびに世代を進め、発行したチケットに世代を刻む。
//! 実行時点で世代が進んでいればそのチケットは古いので捨てる（最後の要求だけが残る）。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 遅延処理の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredKind {
    /// 表示地域・詳細度変更に伴うカタログ再構築
    Rebuild,
    /// もう一方の詳細度のデータの先読み
    Prewarm,
}

/// 世代カウンタ（複製すると同じカウンタを共有する）
#[derive(Debug, Clone, Default)]
pub struct Generation {
    counter: Arc<AtomicU64>,
}

/// 発行時点の世代
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub kind: DeferredKind,
    generation: u64,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// 世代を進めて新しいチケットを発行（それ以前のチケットは無効になる）
    pub fn issue(&self, kind: DeferredKind) -> Ticket {
        let generation = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { kind, generation }
    }

    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// チケットがまだ最新か
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.current() == ticket.generation
    }

    /// 保留中のチケットをすべて無効化
    pub fn invalidate(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }
}
