//! jstrace のコア機能
//!
//! このクレートは、行単位トレーサの中核となるロジックを提供します。
//! デバッグセッションの制御、スクリプトの発見と管理、全行へのブレークポイント設置、
//! 停止時のトレース出力を統合します。

pub mod session;
pub mod breakpoint;
pub mod command;
pub mod errors;
pub mod registry;
pub mod script;
pub mod trace;

pub use session::{FailurePolicy, Session, SessionConfig, SessionState};
pub use breakpoint::{BreakpointInstaller, InstallOutcome};
pub use command::{CommandChannel, BREAKPOINT_EXISTS};
pub use errors::TraceError;
pub use registry::ScriptRegistry;
pub use script::{ScriptRecord, TargetPattern};
pub use trace::{Reporter, Resolution, TraceLine};

// 他のクレートから使用するために再エクスポート
pub use jstrace_target::{Gate, ScriptId};

/// トレーサの結果型
pub type Result<T> = std::result::Result<T, TraceError>;
