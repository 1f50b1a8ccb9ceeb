//! テスト用のチャネルと出力先

#![allow(dead_code)]

use jstrace_core::{Reporter, TraceLine};
use jstrace_target::{methods, Channel, ChannelError, RemoteError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type CallHook = Box<dyn FnMut(&str, &Value) + Send>;

#[derive(Default)]
struct ChannelState {
    calls: Vec<(String, Value)>,
    sources: HashMap<String, String>,
    /// (コマンド名, 行番号) -> 返すエラー
    failures: Vec<(String, Option<u64>, RemoteError)>,
    hook: Option<CallHook>,
}

/// 送られたコマンドを記録し、あらかじめ決めた応答を返すチャネル
#[derive(Clone, Default)]
pub struct ScriptedChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Debugger.getScriptSource` が返すソースを登録する
    pub fn with_source(self, script_id: &str, source: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .sources
            .insert(script_id.to_string(), source.to_string());
        self
    }

    /// 指定したコマンドを失敗させる
    pub fn fail(&self, method: &str, code: i64) {
        self.state.lock().unwrap().failures.push((
            method.to_string(),
            None,
            RemoteError::new(code, "scripted failure"),
        ));
    }

    /// 指定した行への `Debugger.setBreakpoint` を失敗させる
    pub fn fail_breakpoint_at(&self, line_number: u64, code: i64) {
        self.state.lock().unwrap().failures.push((
            methods::SET_BREAKPOINT.to_string(),
            Some(line_number),
            RemoteError::new(code, "scripted failure"),
        ));
    }

    /// コマンド受信時に呼ばれるフックを設定する
    pub fn on_call(&self, hook: impl FnMut(&str, &Value) + Send + 'static) {
        self.state.lock().unwrap().hook = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(method, _)| method).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|(m, _)| m == method).count()
    }

    /// `Debugger.setBreakpoint` で指定された行番号
    pub fn breakpoint_lines(&self) -> Vec<u64> {
        self.calls()
            .iter()
            .filter(|(m, _)| m == methods::SET_BREAKPOINT)
            .filter_map(|(_, params)| params["location"]["lineNumber"].as_u64())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn respond(&self, method: &str, params: Value) -> Result<Value, ChannelError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((method.to_string(), params.clone()));

        if let Some(hook) = state.hook.as_mut() {
            hook(method, &params);
        }

        let line_number = params["location"]["lineNumber"].as_u64();
        let failure = state
            .failures
            .iter()
            .find(|(m, line, _)| m == method && (line.is_none() || *line == line_number));
        if let Some((_, _, error)) = failure {
            return Err(ChannelError::Remote {
                method: method.to_string(),
                error: error.clone(),
            });
        }

        match method {
            methods::GET_SCRIPT_SOURCE => {
                let script_id = params["scriptId"].as_str().unwrap_or_default();
                match state.sources.get(script_id) {
                    Some(source) => Ok(json!({ "scriptSource": source })),
                    None => Err(ChannelError::Remote {
                        method: method.to_string(),
                        error: RemoteError::new(-32000, "No script for id"),
                    }),
                }
            }
            methods::SET_BREAKPOINT => Ok(json!({
                "breakpointId": format!("bp:{}", line_number.unwrap_or_default()),
                "actualLocation": params["location"].clone(),
            })),
            _ => Ok(json!({})),
        }
    }
}

impl Channel for ScriptedChannel {
    async fn send(&self, method: &str, params: Value) -> Result<Value, ChannelError> {
        self.respond(method, params)
    }
}

/// 進捗とトレース行を記録する出力先
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub progress: Vec<(usize, usize)>,
    pub traces: Vec<String>,
}

impl Reporter for RecordingReporter {
    fn progress(&mut self, installed: usize, total: usize) {
        self.progress.push((installed, total));
    }

    fn trace(&mut self, line: &TraceLine) {
        self.traces.push(line.to_string());
    }
}
