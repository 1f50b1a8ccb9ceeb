//! DevToolsプロトコルのメッセージ型
//!
//! コマンドのパラメータ・結果、イベントのペイロードを型付きで定義します。
//! 認識できるイベント名はそれぞれ専用のバリアントに変換し、
//! それ以外は生のペイロードを持つ `Other` として扱います。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// コマンド名・イベント名の定数
pub mod methods {
    pub const DEBUGGER_ENABLE: &str = "Debugger.enable";
    pub const DEBUGGER_DISABLE: &str = "Debugger.disable";
    pub const PAUSE: &str = "Debugger.pause";
    pub const RESUME: &str = "Debugger.resume";
    pub const SET_BREAKPOINT: &str = "Debugger.setBreakpoint";
    pub const SET_BREAKPOINT_BY_URL: &str = "Debugger.setBreakpointByUrl";
    pub const SET_BREAKPOINTS_ACTIVE: &str = "Debugger.setBreakpointsActive";
    pub const SET_SKIP_ALL_PAUSES: &str = "Debugger.setSkipAllPauses";
    pub const GET_SCRIPT_SOURCE: &str = "Debugger.getScriptSource";

    pub const SCRIPT_PARSED: &str = "Debugger.scriptParsed";
    pub const PAUSED: &str = "Debugger.paused";
    pub const RESUMED: &str = "Debugger.resumed";
    pub const BREAKPOINT_RESOLVED: &str = "Debugger.breakpointResolved";

    pub const PAGE_ENABLE: &str = "Page.enable";
    pub const PAGE_NAVIGATE: &str = "Page.navigate";
    pub const FRAME_NAVIGATED: &str = "Page.frameNavigated";
    pub const LOAD_EVENT_FIRED: &str = "Page.loadEventFired";

    pub const INSPECTOR_ENABLE: &str = "Inspector.enable";
    pub const TARGET_CRASHED: &str = "Inspector.targetCrashed";
}

/// エンジンが割り当てたスクリプトID
///
/// プロトコル上の文字列表現をそのまま保持します。数値への変換は行いません。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptId(pub String);

impl ScriptId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScriptId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// スクリプト内の位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub script_id: ScriptId,
    pub line_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
}

impl Location {
    pub fn new(script_id: ScriptId, line_number: u32) -> Self {
        Self {
            script_id,
            line_number,
            column_number: None,
        }
    }
}

/// 停止時のコールフレーム
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub location: Location,
    #[serde(default)]
    pub call_frame_id: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,
}

/// プロトコルのエラーオブジェクト
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RemoteError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// 応答の `error` メンバーからエラーを取り出す
    ///
    /// `null` や空のオブジェクトはエラーなしとみなします。
    pub fn from_value(value: Value) -> Option<Self> {
        match &value {
            Value::Null => None,
            Value::Object(fields) if fields.is_empty() => None,
            _ => Some(serde_json::from_value(value.clone()).unwrap_or_else(|_| Self {
                code: 0,
                message: String::new(),
                data: Some(value),
            })),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)?;
        if let Some(data) = &self.data {
            write!(f, " {}", data)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// コマンドのパラメータと結果
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointParams {
    pub location: Location,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrlParams {
    pub line_number: u32,
    pub url_regex: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetBreakpointsActiveParams {
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetSkipAllPausesParams {
    pub skip: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScriptSourceParams {
    pub script_id: ScriptId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSource {
    pub script_source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavigateParams {
    pub url: String,
}

/// パラメータを持たないコマンド用
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoParams {}

// ---------------------------------------------------------------------------
// イベント
// ---------------------------------------------------------------------------

/// `Debugger.scriptParsed`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptParsed {
    pub script_id: ScriptId,
    pub url: String,
}

/// `Debugger.paused`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paused {
    pub call_frames: Vec<CallFrame>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Paused {
    /// 最上位フレームの位置
    pub fn top_location(&self) -> Option<&Location> {
        self.call_frames.first().map(|frame| &frame.location)
    }
}

/// デバッガドメインのイベント
#[derive(Debug, Clone)]
pub enum Event {
    ScriptParsed(ScriptParsed),
    Paused(Paused),
    Resumed,
    BreakpointResolved,
    /// 未知のイベント（生のペイロードを保持）
    Other { method: String, params: Value },
}

impl Event {
    /// イベント名とペイロードから型付きイベントを作る
    ///
    /// 既知のイベント名で必須フィールドが欠けている場合はエラーを返します。
    pub fn parse(method: &str, params: Value) -> serde_json::Result<Self> {
        let event = match method {
            methods::SCRIPT_PARSED => Event::ScriptParsed(serde_json::from_value(params)?),
            methods::PAUSED => Event::Paused(serde_json::from_value(params)?),
            methods::RESUMED => Event::Resumed,
            methods::BREAKPOINT_RESOLVED => Event::BreakpointResolved,
            _ => Event::Other {
                method: method.to_string(),
                params,
            },
        };
        Ok(event)
    }

    /// イベント名
    pub fn method(&self) -> &str {
        match self {
            Event::ScriptParsed(_) => methods::SCRIPT_PARSED,
            Event::Paused(_) => methods::PAUSED,
            Event::Resumed => methods::RESUMED,
            Event::BreakpointResolved => methods::BREAKPOINT_RESOLVED,
            Event::Other { method, .. } => method,
        }
    }
}

/// ホスト側のライフサイクルイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// メインフレームの読み込み開始
    LoadStarted { url: Option<String> },
    /// 読み込み完了
    LoadFinished,
    /// ターゲットのクラッシュ
    Crashed { reason: String },
}

impl HostEvent {
    /// ライフサイクルイベントであれば変換する
    pub fn parse(method: &str, params: &Value) -> Option<Self> {
        match method {
            methods::FRAME_NAVIGATED => {
                let frame = params.get("frame")?;
                // 子フレームのナビゲーションは無視
                if frame.get("parentId").is_some_and(|p| !p.is_null()) {
                    return None;
                }
                let url = frame.get("url").and_then(Value::as_str).map(str::to_string);
                Some(HostEvent::LoadStarted { url })
            }
            methods::LOAD_EVENT_FIRED => Some(HostEvent::LoadFinished),
            methods::TARGET_CRASHED => Some(HostEvent::Crashed {
                reason: params.to_string(),
            }),
            _ => None,
        }
    }
}

/// セッションが受け取るメッセージ
#[derive(Debug, Clone)]
pub enum Incoming {
    Protocol(Event),
    Host(HostEvent),
}
