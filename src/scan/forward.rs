//! 前向链接队列
//!
//! 记录在 `process()` 收尾时把前向链接目标推入队列，调度器在前向处理阶段消费。
//! 处理过程从不递归调用下游记录。

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::record::common::mutex_guard;

#[derive(Debug, Default)]
pub struct ForwardQueue {
    pending: Mutex<VecDeque<String>>,
}

impl ForwardQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, name: &str) {
        mutex_guard(&self.pending).push_back(name.to_string());
    }

    pub fn push_all(&self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        mutex_guard(&self.pending).extend(names.iter().cloned());
    }

    /// 取出当前全部待处理目标（先进先出）
    pub fn take_all(&self) -> Vec<String> {
        mutex_guard(&self.pending).drain(..).collect()
    }

    pub fn len(&self) -> usize {
        mutex_guard(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        mutex_guard(&self.pending).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = ForwardQueue::new();
        queue.push("A");
        queue.push_all(&["B".to_string(), "C".to_string()]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.take_all(), vec!["A", "B", "C"]);
        assert!(queue.is_empty());
    }
}
