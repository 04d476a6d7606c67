//! 顺序账本
//!
//! 预约使用的先进先出链表，保持到达顺序。

use hms_core::{HmsError, Result};
use std::collections::{linked_list, LinkedList};

/// 先进先出账本
#[derive(Debug, Clone)]
pub struct SequentialLedger<T> {
    entries: LinkedList<T>,
}

impl<T> SequentialLedger<T> {
    pub fn new() -> Self {
        Self {
            entries: LinkedList::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 追加到队尾
    pub fn enqueue(&mut self, record: T) {
        self.entries.push_back(record);
    }

    /// 取出队首记录，账本为空时返回 `EmptyLedger`
    pub fn dequeue(&mut self) -> Result<T> {
        self.entries.pop_front().ok_or(HmsError::EmptyLedger)
    }

    /// 查看队首记录
    pub fn peek(&self) -> Option<&T> {
        self.entries.front()
    }

    /// 按插入顺序遍历当前内容，每次调用都从队首重新开始
    pub fn iter(&self) -> linked_list::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> linked_list::IterMut<'_, T> {
        self.entries.iter_mut()
    }

    /// 删除所有满足条件的记录，返回删除数量
    ///
    /// 逐个出队，不匹配的重新入队，保留记录的相对顺序不变。
    /// 重建期间账本暂时为空，只能在独占访问下调用（`&mut self` 保证这一点）。
    pub fn remove_where<P>(&mut self, mut predicate: P) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        let mut retained = SequentialLedger::new();
        let mut removed = 0;
        while let Ok(record) = self.dequeue() {
            if predicate(&record) {
                removed += 1;
            } else {
                retained.enqueue(record);
            }
        }
        *self = retained;
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for SequentialLedger<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a SequentialLedger<T> {
    type Item = &'a T;
    type IntoIter = linked_list::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> FromIterator<T> for SequentialLedger<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut ledger = SequentialLedger::new();
        ledger.enqueue("a");
        ledger.enqueue("b");
        assert_eq!(ledger.peek(), Some(&"a"));
        assert_eq!(ledger.dequeue().unwrap(), "a");
        ledger.enqueue("c");
        assert_eq!(ledger.dequeue().unwrap(), "b");
        assert_eq!(ledger.dequeue().unwrap(), "c");
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_dequeue_empty_fails() {
        let mut ledger: SequentialLedger<u32> = SequentialLedger::new();
        assert!(matches!(ledger.dequeue(), Err(HmsError::EmptyLedger)));
        assert!(ledger.peek().is_none());
    }

    #[test]
    fn test_interleaved_operations_keep_order() {
        let mut ledger = SequentialLedger::new();
        let mut out = Vec::new();
        for round in 0..5u32 {
            ledger.enqueue(round * 2);
            ledger.enqueue(round * 2 + 1);
            out.push(ledger.dequeue().unwrap());
        }
        while let Ok(value) = ledger.dequeue() {
            out.push(value);
        }
        assert_eq!(out, (0..10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_remove_where_keeps_relative_order() {
        let mut ledger: SequentialLedger<u32> = (1..=8).collect();
        let removed = ledger.remove_where(|v| v % 3 == 0);
        assert_eq!(removed, 2);
        assert_eq!(ledger.iter().copied().collect::<Vec<_>>(), vec![1, 2, 4, 5, 7, 8]);

        assert_eq!(ledger.remove_where(|v| *v > 100), 0);
        assert_eq!(ledger.len(), 6);
    }

    #[test]
    fn test_iter_reflects_current_state() {
        let mut ledger: SequentialLedger<u32> = (1..=3).collect();
        assert_eq!(ledger.iter().count(), 3);
        ledger.dequeue().unwrap();
        ledger.enqueue(9);
        assert_eq!(ledger.iter().copied().collect::<Vec<_>>(), vec![2, 3, 9]);
        for value in ledger.iter_mut() {
            *value += 1;
        }
        assert_eq!(ledger.iter().copied().collect::<Vec<_>>(), vec![3, 4, 10]);
        ledger.clear();
        assert_eq!(ledger.iter().count(), 0);
    }
}
