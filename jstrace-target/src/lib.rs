//! jstrace ターゲット接続
//!
//! このクレートは、デバッグ対象のJavaScriptエンジンと通信するための低レベル機能を提供します。
//! プロトコルのメッセージ型、コマンドチャネル、イベント処理ゲート、
//! DevTools WebSocket トランスポートなどを含みます。

pub mod protocol;
pub mod channel;
pub mod gate;
pub mod cdp;

pub use protocol::{
    methods, CallFrame, Event, HostEvent, Incoming, Location, Paused, RemoteError, ScriptId,
    ScriptParsed,
};
pub use channel::{Channel, ChannelError};
pub use gate::{Dispatch, EventDispatcher, EventStream, Gate};
pub use cdp::CdpConnection;

/// ターゲット接続の結果型
pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;
