//! スクリプト情報とフック対象の判定

use jstrace_target::ScriptId;
use regex::Regex;

/// 発見したスクリプトの情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRecord {
    /// エンジンが割り当てたID
    pub id: ScriptId,
    /// エンジンが報告したURL
    pub location: String,
    /// URLのベース名（eval等では空）
    pub name: String,
    /// ソースの各行（内部的には0始まり、外部からは1始まりの行番号で参照する）
    pub lines: Vec<String>,
    /// ブレークポイントの設置を試みたか
    pub is_hooked: bool,
    /// 設置が完了し、停止イベントを出力対象にするか
    pub is_tracked: bool,
}

impl ScriptRecord {
    /// ソースから新しいスクリプト情報を作成する
    pub fn new(id: ScriptId, location: impl Into<String>, source: &str) -> Self {
        let location = location.into();
        Self {
            id,
            name: basename(&location).to_string(),
            location,
            lines: source.split('\n').map(str::to_string).collect(),
            is_hooked: false,
            is_tracked: false,
        }
    }

    /// 1始まりの行番号で行テキストを取得する
    ///
    /// 停止位置の `lineNumber` はブレークポイント設置時と同じ1始まりとして扱う。
    /// DevToolsの行番号は0始まりなので、実ブラウザでは停止行の1行前が返る。
    /// 既知の差異（DESIGN.md の行番号の項を参照）。
    pub fn line(&self, line_number: usize) -> Option<&str> {
        let index = line_number.checked_sub(1)?;
        self.lines.get(index).map(String::as_str)
    }

    /// 行数
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// URLまたはパスのベース名を取得する
///
/// 末尾の区切り文字は無視します（`http://example.com/` -> `example.com`）。
pub fn basename(location: &str) -> &str {
    let trimmed = location.trim_end_matches(['/', '\\']);
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

/// フック対象のスクリプトを選ぶパターン
#[derive(Debug, Clone)]
pub struct TargetPattern {
    regex: Regex,
}

impl TargetPattern {
    /// 正規表現からパターンを作成する
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// パターンの文字列表現
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// URLがパターンにマッチするか
    pub fn is_match(&self, location: &str) -> bool {
        self.regex.is_match(location)
    }

    /// フック対象か判定する
    ///
    /// ベース名が空のスクリプト（インラインやeval）はパターンに関わらず対象です。
    pub fn is_eligible(&self, record: &ScriptRecord) -> bool {
        self.is_match(&record.location) || record.name.is_empty()
    }
}

impl Default for TargetPattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(".*").expect("'.*' is a valid regex"),
        }
    }
}
