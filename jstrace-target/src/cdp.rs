//! DevTools WebSocket トランスポート
//!
//! リクエストごとに連番IDを振り、応答は一度だけ完了する oneshot で待ち合わせます。
//! イベントは受信タスクから [`EventDispatcher`] へ渡します。

use crate::channel::{Channel, ChannelError};
use crate::gate::EventDispatcher;
use crate::protocol::RemoteError;
use crate::Result;
use anyhow::Context;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 応答の中身
#[derive(Debug)]
enum Reply {
    Result(Value),
    Error(RemoteError),
}

/// 応答待ちのリクエスト
#[derive(Debug, Default, Clone)]
struct Pending {
    waiters: Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>,
}

impl Pending {
    fn insert(&self, id: u64, waiter: oneshot::Sender<Reply>) {
        self.waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, waiter);
    }

    fn take(&self, id: u64) -> Option<oneshot::Sender<Reply>> {
        self.waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    /// 全ての待ち合わせを破棄する（待機側には Closed が返る）
    fn fail_all(&self) {
        self.waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// 受信したメッセージ（応答またはイベント）
#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Value,
}

/// DevToolsエンドポイントへの接続
pub struct CdpConnection {
    writer: tokio::sync::Mutex<SplitSink<WsStream, Frame>>,
    pending: Pending,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
}

impl CdpConnection {
    /// WebSocketエンドポイントに接続し、受信タスクを起動する
    pub async fn connect(endpoint: &str, dispatcher: EventDispatcher) -> Result<Self> {
        info!("Connecting to {}", endpoint);
        let (stream, _response) = tokio_tungstenite::connect_async(endpoint)
            .await
            .with_context(|| format!("Failed to connect to {}", endpoint))?;

        let (writer, reader) = stream.split();
        let pending = Pending::default();
        let reader = tokio::spawn(read_loop(reader, pending.clone(), dispatcher));

        Ok(Self {
            writer: tokio::sync::Mutex::new(writer),
            pending,
            next_id: AtomicU64::new(1),
            reader,
        })
    }
}

impl Channel for CdpConnection {
    async fn send(&self, method: &str, params: Value) -> Result<Value, ChannelError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (waiter, reply) = oneshot::channel();
        self.pending.insert(id, waiter);

        let request = json!({ "id": id, "method": method, "params": params });
        debug!("-> {}", request);

        let sent = self
            .writer
            .lock()
            .await
            .send(Frame::text(request.to_string()))
            .await;
        if let Err(source) = sent {
            self.pending.take(id);
            return Err(ChannelError::Transport {
                method: method.to_string(),
                source,
            });
        }

        match reply.await {
            Ok(Reply::Result(result)) => Ok(result),
            Ok(Reply::Error(error)) => Err(ChannelError::Remote {
                method: method.to_string(),
                error,
            }),
            Err(_) => Err(ChannelError::Closed {
                method: method.to_string(),
            }),
        }
    }
}

impl Drop for CdpConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// 受信ループ
async fn read_loop(mut reader: SplitStream<WsStream>, pending: Pending, dispatcher: EventDispatcher) {
    while let Some(frame) = reader.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
        };

        if frame.is_close() {
            info!("Debugger connection closed by remote");
            break;
        }
        if !frame.is_text() {
            continue;
        }

        let text = match frame.to_text() {
            Ok(text) => text,
            Err(e) => {
                warn!("Non UTF-8 frame: {}", e);
                continue;
            }
        };

        let message: WireMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Unparsable message ({}): {}", e, text);
                continue;
            }
        };

        match (message.id, message.method) {
            (Some(id), _) => {
                let reply = match RemoteError::from_value(message.error) {
                    Some(error) => Reply::Error(error),
                    None => Reply::Result(message.result),
                };
                match pending.take(id) {
                    Some(waiter) => {
                        // 待機側が既にいなくなっていても問題ない
                        let _ = waiter.send(reply);
                    }
                    None => warn!("Response for unknown request id {}", id),
                }
            }
            (None, Some(method)) => {
                debug!("<- {}", method);
                dispatcher.dispatch(&method, message.params);
            }
            (None, None) => warn!("Message without id or method: {}", text),
        }
    }

    pending.fail_all();
}
