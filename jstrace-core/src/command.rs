//! コマンドチャネルアダプタ
//!
//! 生のチャネルをラップし、応答を成功と失敗に分類します。
//! `Debugger.setBreakpoint` が「既に存在する」エラーで失敗した場合は、
//! 結果なしの成功として扱います。

use crate::{Result, TraceError};
use jstrace_target::{methods, Channel, ChannelError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

/// 「ブレークポイントが既に存在する」ことを示すエラーコード
pub const BREAKPOINT_EXISTS: i64 = -32000;

/// 衝突として無視してよいエラーか
pub fn is_benign(command: &str, err: &ChannelError) -> bool {
    command == methods::SET_BREAKPOINT
        && err.remote().is_some_and(|e| e.code == BREAKPOINT_EXISTS)
}

/// コマンドチャネル
pub struct CommandChannel<C> {
    inner: C,
}

impl<C: Channel> CommandChannel<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// コマンドを送信して結果を待つ
    ///
    /// 無視できる衝突の場合は `Ok(None)` を返します。
    pub async fn send<P: Serialize>(&self, command: &str, params: &P) -> Result<Option<Value>> {
        let params = serde_json::to_value(params).map_err(|source| ChannelError::Encode {
            method: command.to_string(),
            source,
        })?;

        match self.inner.send(command, params).await {
            Ok(result) => Ok(Some(result)),
            Err(err) if is_benign(command, &err) => {
                debug!("Ignoring {}", err);
                Ok(None)
            }
            Err(err) => {
                error!("{}", err);
                Err(err.into())
            }
        }
    }

    /// コマンドを送信し、結果を型付きで受け取る
    pub async fn request<P: Serialize, T: DeserializeOwned>(
        &self,
        command: &str,
        params: &P,
    ) -> Result<T> {
        let result = self
            .send(command, params)
            .await?
            .ok_or_else(|| TraceError::MalformedResult {
                command: command.to_string(),
                reason: "no result".to_string(),
            })?;

        serde_json::from_value(result).map_err(|e| TraceError::MalformedResult {
            command: command.to_string(),
            reason: e.to_string(),
        })
    }
}
