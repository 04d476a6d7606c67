//! 单调递增的 ID 序列

use hms_core::{HmsError, Result};

/// ID 序列
///
/// 加载时用已有的最大 ID 播种，之后只增不减，保证本进程内分配的 ID 不与已持久化的冲突。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdSequence {
    last: u32,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以给定值为已分配的最大 ID 创建
    pub fn starting_after(last: u32) -> Self {
        Self { last }
    }

    /// 记录一个已存在的 ID，序列只会前进
    pub fn observe(&mut self, id: u32) {
        self.last = self.last.max(id);
    }

    /// 分配下一个 ID，`u32` 用尽时返回错误且序列不变
    pub fn next_id(&mut self) -> Result<u32> {
        self.last = self
            .last
            .checked_add(1)
            .ok_or_else(|| HmsError::Validation("ID space exhausted".to_string()))?;
        Ok(self.last)
    }

    /// 最近分配或观察到的最大 ID
    pub fn current(&self) -> u32 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_from_max() {
        let mut seq = IdSequence::new();
        for id in [7, 42, 3] {
            seq.observe(id);
        }
        assert_eq!(seq.next_id().unwrap(), 43);
        assert_eq!(seq.next_id().unwrap(), 44);
    }

    #[test]
    fn test_never_moves_backwards() {
        let mut seq = IdSequence::starting_after(10);
        seq.observe(2);
        assert_eq!(seq.current(), 10);
        assert_eq!(seq.next_id().unwrap(), 11);
        assert_eq!(IdSequence::new().next_id().unwrap(), 1);
    }

    #[test]
    fn test_exhausted_sequence_does_not_wrap() {
        let mut seq = IdSequence::new();
        seq.observe(u32::MAX);
        assert!(matches!(seq.next_id(), Err(HmsError::Validation(_))));
        assert_eq!(seq.current(), u32::MAX);
        assert!(seq.next_id().is_err());
    }
}
