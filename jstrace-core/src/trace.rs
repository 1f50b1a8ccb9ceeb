//! トレース出力
//!
//! 停止イベントの最上位フレームをスクリプトレジストリで解決し、
//! 実行中のソース行を出力します。

use crate::ScriptRegistry;
use jstrace_target::{Paused, ScriptId};
use std::fmt;

/// トレース1行分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    pub location: String,
    pub line_number: usize,
    pub text: String,
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] => {}", self.location, self.line_number, self.text)
    }
}

/// 進捗とトレースの出力先
pub trait Reporter {
    /// ブレークポイント設置の進捗（`installed` は単調増加し、最後は `total` に等しい）
    fn progress(&mut self, installed: usize, total: usize);

    /// トレース行を出力する
    fn trace(&mut self, line: &TraceLine);
}

/// 停止イベントの解決結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 出力すべき行
    Trace(TraceLine),
    /// コールフレームがない
    NoFrames,
    /// レジストリにないスクリプト
    UnknownScript(ScriptId),
    /// 設置が完了していないスクリプト
    Untracked(ScriptId),
    /// 行番号が記録したソースの範囲外
    OutOfRange {
        script_id: ScriptId,
        line_number: usize,
        line_count: usize,
    },
}

/// 停止イベントを解決する
pub fn resolve(registry: &ScriptRegistry, paused: &Paused) -> Resolution {
    let Some(location) = paused.top_location() else {
        return Resolution::NoFrames;
    };

    let Some(record) = registry.lookup(&location.script_id) else {
        return Resolution::UnknownScript(location.script_id.clone());
    };

    if !record.is_tracked {
        return Resolution::Untracked(record.id.clone());
    }

    let line_number = location.line_number as usize;
    match record.line(line_number) {
        Some(text) => Resolution::Trace(TraceLine {
            location: record.location.clone(),
            line_number,
            text: text.to_string(),
        }),
        None => Resolution::OutOfRange {
            script_id: record.id.clone(),
            line_number,
            line_count: record.line_count(),
        },
    }
}
