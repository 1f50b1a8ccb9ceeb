//! デバッグセッションの制御
//!
//! プロトコルイベントを受け取り、スクリプトの発見・ブレークポイント設置・
//! 停止時のトレース出力を振り分けます。全てのイベントは処理の前に
//! ゲートで検査され、閉じている間は破棄されます。

use crate::breakpoint::{BreakpointInstaller, InstallOutcome};
use crate::trace::{resolve, Reporter, Resolution};
use crate::{CommandChannel, Result, ScriptRecord, ScriptRegistry, TargetPattern, TraceError};
use jstrace_target::protocol::{
    GetScriptSourceParams, NoParams, ScriptSource, SetBreakpointByUrlParams,
    SetBreakpointsActiveParams, SetSkipAllPausesParams,
};
use jstrace_target::{
    methods, Channel, Event, EventStream, Gate, HostEvent, Incoming, Paused, ScriptId,
    ScriptParsed,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// セッションの状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Detached,
    Attaching,
    Idle,
    Installing(ScriptId),
}

/// ブレークポイント設置に失敗したときの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// ゲートを開いてエンジンを再開し、そのスクリプトは出力対象外のままにする
    #[default]
    Recover,
    /// エンジンを停止・ゲートを閉じたままにし、セッションを終了させる
    Halt,
}

/// セッション設定
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// フック対象のURLパターン
    pub pattern: TargetPattern,
    /// 設置失敗時の扱い
    pub on_install_failure: FailurePolicy,
}

/// デバッグセッション
pub struct Session<C, R> {
    /// コマンドチャネル
    channel: CommandChannel<C>,
    /// イベント処理ゲート
    gate: Gate,
    /// 発見したスクリプト
    registry: ScriptRegistry,
    /// 設定
    config: SessionConfig,
    /// 出力先
    reporter: R,
    /// 現在の状態
    state: SessionState,
    /// デバッガが有効化済みか
    attached: bool,
}

impl<C: Channel, R: Reporter> Session<C, R> {
    /// 新しいセッションを作成する
    ///
    /// `gate` はイベントディスパッチャと共有したものを渡します。
    pub fn new(channel: C, gate: Gate, config: SessionConfig, reporter: R) -> Self {
        Self {
            channel: CommandChannel::new(channel),
            gate,
            registry: ScriptRegistry::new(),
            config,
            reporter,
            state: SessionState::Detached,
            attached: false,
        }
    }

    /// デバッガを有効化する
    ///
    /// 既に有効化済みなら何もしません。セットアップコマンドの失敗は警告に留めます。
    pub async fn attach(&mut self) -> Result<()> {
        if self.attached {
            debug!("Debugger already attached");
            self.state = SessionState::Idle;
            return Ok(());
        }

        self.state = SessionState::Attaching;

        self.setup(methods::DEBUGGER_ENABLE, &NoParams {}).await;
        self.setup(methods::SET_SKIP_ALL_PAUSES, &SetSkipAllPausesParams { skip: false })
            .await;
        let by_url = SetBreakpointByUrlParams {
            line_number: 1,
            url_regex: self.config.pattern.as_str().to_string(),
        };
        self.setup(methods::SET_BREAKPOINT_BY_URL, &by_url).await;
        self.setup(
            methods::SET_BREAKPOINTS_ACTIVE,
            &SetBreakpointsActiveParams { active: true },
        )
        .await;

        self.attached = true;
        self.state = SessionState::Idle;
        info!("Debugger attached (pattern: {})", self.config.pattern.as_str());
        Ok(())
    }

    /// セットアップコマンドを送る（結果で状態遷移は変わらない）
    async fn setup<P: Serialize>(&self, command: &str, params: &P) {
        match self.channel.send(command, params).await {
            Ok(result) => debug!("{} -> {:?}", command, result),
            Err(e) => warn!("Setup command {} failed: {}", command, e),
        }
    }

    /// デバッガを無効化する（ブレークポイントは解除され、エンジンは再開する）
    pub async fn detach(&mut self) -> Result<()> {
        if !self.attached {
            return Ok(());
        }
        self.channel
            .send(methods::DEBUGGER_DISABLE, &NoParams {})
            .await?;
        self.attached = false;
        self.state = SessionState::Detached;
        info!("Debugger detached");
        Ok(())
    }

    /// イベントストリームが閉じるか致命的なエラーが起きるまで処理を続ける
    pub async fn run(&mut self, events: &mut EventStream) -> Result<()> {
        while let Some(incoming) = events.recv().await {
            let handled = match incoming {
                Incoming::Host(event) => self.handle_host_event(event).await,
                Incoming::Protocol(event) => self.handle_event(event).await,
            };

            if let Err(e) = handled {
                if e.is_fatal() {
                    return Err(e);
                }
                error!("{}", e);
            }
        }

        info!("Event stream closed");
        self.attached = false;
        self.state = SessionState::Detached;
        Ok(())
    }

    /// ホストのライフサイクルイベントを処理する
    pub async fn handle_host_event(&mut self, event: HostEvent) -> Result<()> {
        match event {
            HostEvent::LoadStarted { url } => {
                info!(
                    "Target load started ({}), dropping {} scripts ({} tracked)",
                    url.as_deref().unwrap_or("<unknown>"),
                    self.registry.len(),
                    self.registry.tracked_count()
                );
                self.state = SessionState::Detached;
                self.registry.clear_all();
                self.attach().await
            }
            HostEvent::LoadFinished => {
                info!("Loading complete");
                Ok(())
            }
            HostEvent::Crashed { reason } => {
                error!("Target crashed: {}", reason);
                Err(TraceError::TargetCrashed(reason))
            }
        }
    }

    /// プロトコルイベントを処理する
    pub async fn handle_event(&mut self, event: Event) -> Result<()> {
        if !self.gate.is_open() {
            debug!("Processing disabled, dropping {}", event.method());
            return Ok(());
        }

        match event {
            Event::ScriptParsed(data) => self.on_script_parsed(data).await,
            Event::Paused(data) => self.on_paused(data).await,
            Event::Resumed | Event::BreakpointResolved => Ok(()),
            Event::Other { method, .. } => {
                info!("Unhandled message '{}'", method);
                Ok(())
            }
        }
    }

    /// スクリプトの発見
    async fn on_script_parsed(&mut self, data: ScriptParsed) -> Result<()> {
        info!("=> Loaded {} (ID: {})", data.url, data.script_id);

        if self
            .registry
            .lookup(&data.script_id)
            .is_some_and(|record| record.is_hooked)
        {
            debug!("Script {} already hooked, skipping", data.script_id);
            return Ok(());
        }

        let source: ScriptSource = self
            .channel
            .request(
                methods::GET_SCRIPT_SOURCE,
                &GetScriptSourceParams {
                    script_id: data.script_id.clone(),
                },
            )
            .await?;

        let record = ScriptRecord::new(data.script_id.clone(), data.url, &source.script_source);
        let eligible = self.config.pattern.is_eligible(&record);
        self.registry.register(record);

        if eligible {
            self.hook(&data.script_id).await?;
        }
        Ok(())
    }

    /// スクリプトにブレークポイントを設置する
    async fn hook(&mut self, id: &ScriptId) -> Result<()> {
        let Some(record) = self.registry.get_mut(id) else {
            return Ok(());
        };
        if record.is_hooked {
            return Ok(());
        }

        info!("!! HOOKING {} ({} breakpoints)!!", record.name, record.line_count());
        self.state = SessionState::Installing(id.clone());

        let installer = BreakpointInstaller::new(&self.channel, &self.gate);
        let outcome = installer.install(record, &mut self.reporter).await;
        self.state = SessionState::Idle;

        match outcome {
            Ok(InstallOutcome::Installed { lines }) => {
                info!("Done ({} breakpoints)", lines);
                Ok(())
            }
            Ok(InstallOutcome::AlreadyHooked) => Ok(()),
            Err(e) => self.on_install_failed(id, e).await,
        }
    }

    /// 設置失敗時の処理
    async fn on_install_failed(&mut self, id: &ScriptId, err: TraceError) -> Result<()> {
        match self.config.on_install_failure {
            FailurePolicy::Recover => {
                error!("Failed to hook script {}: {} (script stays untracked)", id, err);
                self.gate.open();
                self.resume().await
            }
            FailurePolicy::Halt => Err(TraceError::Install {
                script_id: id.clone(),
                source: Box::new(err),
            }),
        }
    }

    /// 停止イベントの処理
    async fn on_paused(&mut self, data: Paused) -> Result<()> {
        match resolve(&self.registry, &data) {
            Resolution::Trace(line) => self.reporter.trace(&line),
            Resolution::NoFrames => warn!("Paused without call frames"),
            Resolution::UnknownScript(id) => debug!("Paused in unknown script {}", id),
            Resolution::Untracked(id) => debug!("Paused in untracked script {}", id),
            Resolution::OutOfRange {
                script_id,
                line_number,
                line_count,
            } => warn!(
                "Paused at line {} of script {}, but only {} lines were recorded",
                line_number, script_id, line_count
            ),
        }
        self.resume().await
    }

    async fn resume(&self) -> Result<()> {
        self.channel.send(methods::RESUME, &NoParams {}).await?;
        Ok(())
    }

    /// 現在の状態
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// デバッガが有効化済みか
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// スクリプトレジストリ
    pub fn registry(&self) -> &ScriptRegistry {
        &self.registry
    }

    /// イベント処理ゲート
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// コマンドチャネル
    pub fn channel(&self) -> &CommandChannel<C> {
        &self.channel
    }

    /// 出力先
    pub fn reporter(&self) -> &R {
        &self.reporter
    }
}
