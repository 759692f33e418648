//! # History 模块
//!
//! 基于整文档快照的撤销 / 重做。
//!
//! ## 设计原则
//!
//! - 快照是完整文档的深拷贝，不做差分
//! - 由调用方在每次操作结束后显式调用 [`EditHistory::record_if_changed`]，不依赖定时器
//! - 撤销 / 重做恢复的状态直接成为"最近记录"，恢复本身不会被记录为新的编辑
//! - 撤销栈有上限，超出时丢弃最早的快照
//!
//! ```text
//!  record_if_changed(cur):   undo ← last, redo = [], last = cur
//!  undo(doc):                redo ← doc, doc = undo.pop(), last = doc
//!  redo(doc):                undo ← doc, doc = redo.pop(), last = doc
//! ```

use crate::model::EditorPersistence;

/// 默认撤销上限
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// 编辑历史
#[derive(Debug, Clone)]
pub struct EditHistory {
    /// 最近一次记录的状态
    last: EditorPersistence,
    undo_stack: Vec<EditorPersistence>,
    redo_stack: Vec<EditorPersistence>,
    /// 撤销栈最大长度
    limit: usize,
}

impl EditHistory {
    /// 以当前文档为起点创建空历史
    pub fn new(initial: &EditorPersistence) -> Self {
        Self {
            last: initial.clone(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// 设置撤销上限（至少为 1）
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self.trim();
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 与最近记录比较，不同则记录一条撤销项
    ///
    /// 返回是否记录。
    pub fn record_if_changed(&mut self, current: &EditorPersistence) -> bool {
        if *current == self.last {
            return false;
        }

        let previous = std::mem::replace(&mut self.last, current.clone());
        self.undo_stack.push(previous);
        self.trim();
        self.redo_stack.clear();
        true
    }

    /// 撤销，返回是否发生了恢复
    pub fn undo(&mut self, doc: &mut EditorPersistence) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(doc, previous);
        self.redo_stack.push(current);
        self.last = doc.clone();
        true
    }

    /// 重做，返回是否发生了恢复
    pub fn redo(&mut self, doc: &mut EditorPersistence) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(doc, next);
        self.undo_stack.push(current);
        self.trim();
        self.last = doc.clone();
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// 清空历史，以给定文档为新起点
    pub fn reset(&mut self, doc: &EditorPersistence) {
        self.last = doc.clone();
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn trim(&mut self) {
        if self.undo_stack.len() > self.limit {
            let excess = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..excess);
        }
    }
}
