//! トレーサのエラー型

use jstrace_target::{ChannelError, ScriptId};
use thiserror::Error;

/// トレーサのエラー
#[derive(Debug, Error)]
pub enum TraceError {
    /// コマンドが失敗した（既存ブレークポイントの衝突は含まない）
    #[error(transparent)]
    Command(#[from] ChannelError),

    /// コマンドの結果が期待した形をしていない
    #[error("unexpected result for {command}: {reason}")]
    MalformedResult { command: String, reason: String },

    /// ブレークポイントの設置に失敗した
    #[error("breakpoint installation for script {script_id} failed: {source}")]
    Install {
        script_id: ScriptId,
        #[source]
        source: Box<TraceError>,
    },

    /// ターゲットがクラッシュした
    #[error("target crashed: {0}")]
    TargetCrashed(String),
}

impl TraceError {
    /// セッション全体を終了させるべきエラーか
    pub fn is_fatal(&self) -> bool {
        matches!(self, TraceError::Install { .. } | TraceError::TargetCrashed(_))
    }
}
