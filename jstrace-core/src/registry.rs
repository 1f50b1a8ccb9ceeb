//! スクリプトレジストリ

use crate::ScriptRecord;
use jstrace_target::ScriptId;
use std::collections::HashMap;

/// スクリプトID -> スクリプト情報の対応表
///
/// スクリプトIDは再読み込みをまたいで安定しないため、
/// ターゲットの読み込み開始ごとに [`ScriptRegistry::clear_all`] で全て破棄します。
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: HashMap<ScriptId, ScriptRecord>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// スクリプト情報を登録する（同じIDがあれば置き換える）
    pub fn register(&mut self, record: ScriptRecord) -> Option<ScriptRecord> {
        self.scripts.insert(record.id.clone(), record)
    }

    /// スクリプト情報を取得する
    pub fn lookup(&self, id: &ScriptId) -> Option<&ScriptRecord> {
        self.scripts.get(id)
    }

    /// スクリプト情報を可変参照で取得する
    pub fn get_mut(&mut self, id: &ScriptId) -> Option<&mut ScriptRecord> {
        self.scripts.get_mut(id)
    }

    /// 全てのスクリプト情報を破棄する
    pub fn clear_all(&mut self) {
        self.scripts.clear();
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// 出力対象のスクリプト数
    pub fn tracked_count(&self) -> usize {
        self.scripts.values().filter(|r| r.is_tracked).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, source: &str) -> ScriptRecord {
        ScriptRecord::new(ScriptId::from(id), "http://example.com/app.js", source)
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ScriptRegistry::new();
        assert!(registry.register(record("1", "old")).is_none());
        let previous = registry.register(record("1", "new();"));

        assert_eq!(previous.map(|r| r.lines), Some(vec!["old".to_string()]));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.lookup(&ScriptId::from("1")).unwrap().lines,
            vec!["new();".to_string()]
        );
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = ScriptRegistry::new();
        assert!(registry.lookup(&ScriptId::from("404")).is_none());
    }

    #[test]
    fn test_non_numeric_ids() {
        let mut registry = ScriptRegistry::new();
        registry.register(record("a1b2", "x"));
        registry.register(record("07", "y"));
        registry.register(record("7", "z"));

        // 数値に変換しないので "07" と "7" は別物
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.lookup(&ScriptId::from("a1b2")).unwrap().lines[0], "x");
    }

    #[test]
    fn test_clear_all() {
        let mut registry = ScriptRegistry::new();
        registry.register(record("1", "a"));
        registry.register(record("2", "b"));
        registry.get_mut(&ScriptId::from("2")).unwrap().is_tracked = true;
        assert_eq!(registry.tracked_count(), 1);

        registry.clear_all();
        assert!(registry.is_empty());
        assert_eq!(registry.tracked_count(), 0);
    }
}
