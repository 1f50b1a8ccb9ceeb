//! 行ブレークポイントの設置

use crate::{CommandChannel, Reporter, Result, ScriptRecord};
use jstrace_target::protocol::{NoParams, SetBreakpointParams};
use jstrace_target::{methods, Channel, Gate, Location};
use tracing::{debug, warn};

/// 設置結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// 全行に設置した
    Installed { lines: usize },
    /// 既に設置済みのため何もしなかった
    AlreadyHooked,
}

/// スクリプトの全行にブレークポイントを設置する
///
/// 設置中はイベント処理ゲートを閉じ、エンジンを停止させておきます。
/// 設置用のコマンド自体が停止イベントを引き起こしても、
/// レジストリが整合するまでは処理されません。
pub struct BreakpointInstaller<'a, C> {
    channel: &'a CommandChannel<C>,
    gate: &'a Gate,
}

impl<'a, C: Channel> BreakpointInstaller<'a, C> {
    pub fn new(channel: &'a CommandChannel<C>, gate: &'a Gate) -> Self {
        Self { channel, gate }
    }

    /// ブレークポイントを設置する
    ///
    /// 行番号は1から行数まで（1始まりの規約、0行目には設置しない）。
    /// 1件ずつ応答を待ってから次を送ります。
    /// 設置に失敗した場合はエラーを返し、ゲートは閉じたまま、エンジンは停止したままです。
    /// 停止・再開コマンドの失敗は警告に留めます（アイドル中のエンジンへの停止要求は
    /// すぐには効かず、続く再開が -32000 で拒否されることがある）。
    pub async fn install<R: Reporter>(
        &self,
        record: &mut ScriptRecord,
        reporter: &mut R,
    ) -> Result<InstallOutcome> {
        if record.is_hooked {
            debug!("Script {} is already hooked", record.id);
            return Ok(InstallOutcome::AlreadyHooked);
        }
        record.is_hooked = true;

        self.gate.close();
        self.run_control(methods::PAUSE).await;

        let total = record.line_count();
        for line_number in 1..=total {
            let params = SetBreakpointParams {
                location: Location::new(record.id.clone(), line_number as u32),
            };
            self.channel.send(methods::SET_BREAKPOINT, &params).await?;
            reporter.progress(line_number, total);
        }

        record.is_tracked = true;
        self.gate.open();
        self.run_control(methods::RESUME).await;

        Ok(InstallOutcome::Installed { lines: total })
    }

    /// 実行制御コマンドを送る（失敗しても設置は続ける）
    async fn run_control(&self, command: &str) {
        if let Err(e) = self.channel.send(command, &NoParams {}).await {
            warn!("{} failed, continuing: {}", command, e);
        }
    }
}
