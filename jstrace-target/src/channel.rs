//! コマンドチャネル

use crate::protocol::RemoteError;
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

/// コマンド送信時のエラー
#[derive(Debug, Error)]
pub enum ChannelError {
    /// エンジンがエラーを返した
    #[error("{method} failed: {error}")]
    Remote { method: String, error: RemoteError },

    /// 応答を受け取る前に接続が閉じた
    #[error("connection closed before {method} was answered")]
    Closed { method: String },

    /// 送信に失敗した
    #[error("failed to send {method}: {source}")]
    Transport {
        method: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// パラメータのエンコードに失敗した
    #[error("failed to encode parameters for {method}: {source}")]
    Encode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ChannelError {
    /// 失敗したコマンド名
    pub fn method(&self) -> &str {
        match self {
            ChannelError::Remote { method, .. }
            | ChannelError::Closed { method }
            | ChannelError::Transport { method, .. }
            | ChannelError::Encode { method, .. } => method,
        }
    }

    /// エンジンが返したエラーオブジェクト
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            ChannelError::Remote { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// エンジンとの双方向チャネル
///
/// コマンドを送り、応答が届くまで待機します。タイムアウトや再送は行いません。
pub trait Channel {
    /// コマンドを送信して結果を待つ
    fn send(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ChannelError>> + Send;
}
