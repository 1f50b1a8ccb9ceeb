//! イベント処理ゲートとディスパッチャ
//!
//! ブレークポイント設置中はゲートを閉じ、到着したプロトコルイベントを
//! その場で破棄します（キューに溜めて後で処理することはしません）。
//! ホストのライフサイクルイベントはゲートの状態に関わらず転送します。

use crate::protocol::{Event, HostEvent, Incoming};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// イベント処理の可否フラグ
#[derive(Debug, Clone)]
pub struct Gate {
    enabled: Arc<AtomicBool>,
}

impl Gate {
    /// 開いた状態のゲートを作成する
    pub fn new() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn open(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// セッション側の受信口
pub type EventStream = mpsc::UnboundedReceiver<Incoming>;

/// ディスパッチ結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// セッションへ転送した
    Forwarded,
    /// ゲートが閉じていたため破棄した
    Dropped,
    /// ペイロードが不正だったため破棄した
    Malformed,
    /// 受信側が既に閉じている
    Disconnected,
}

/// 到着したイベントをゲートで振り分ける
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    gate: Gate,
    sender: mpsc::UnboundedSender<Incoming>,
    dropped: Arc<AtomicU64>,
}

impl EventDispatcher {
    /// ディスパッチャと受信口の組を作成する
    pub fn new(gate: Gate) -> (Self, EventStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let dispatcher = Self {
            gate,
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (dispatcher, receiver)
    }

    /// 生のイベントを振り分ける
    pub fn dispatch(&self, method: &str, params: Value) -> Dispatch {
        if let Some(host_event) = HostEvent::parse(method, &params) {
            return self.forward(Incoming::Host(host_event));
        }

        if !self.gate.is_open() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("Dropped {} while processing is disabled", method);
            return Dispatch::Dropped;
        }

        match Event::parse(method, params) {
            Ok(event) => self.forward(Incoming::Protocol(event)),
            Err(e) => {
                warn!("Malformed {} event: {}", method, e);
                Dispatch::Malformed
            }
        }
    }

    fn forward(&self, incoming: Incoming) -> Dispatch {
        match self.sender.send(incoming) {
            Ok(()) => Dispatch::Forwarded,
            Err(_) => Dispatch::Disconnected,
        }
    }

    /// これまでに破棄したイベント数
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
