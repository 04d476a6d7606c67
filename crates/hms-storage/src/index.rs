//! 有序索引
//!
//! 以整数 ID 为键的二叉搜索树，医生和患者各用一棵。
//!
//! 树不做平衡：高度取决于插入顺序，按 ID 升序插入时会退化成链表，查找变为 O(n)。
//! 所有遍历和修改都用循环实现，退化的树也不会耗尽调用栈。

use hms_core::{HmsError, Result};

/// 可按整数主键索引的记录
pub trait Keyed {
    fn key(&self) -> u32;
}

type Link<T> = Option<Box<Node<T>>>;

struct Node<T> {
    record: T,
    left: Link<T>,
    right: Link<T>,
}

impl<T> Node<T> {
    fn leaf(record: T) -> Box<Self> {
        Box::new(Self {
            record,
            left: None,
            right: None,
        })
    }
}

/// 有序索引（不平衡二叉搜索树）
pub struct OrderedIndex<T> {
    root: Link<T>,
    len: usize,
}

impl<T: Keyed> OrderedIndex<T> {
    /// 创建空索引
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// 插入记录
    ///
    /// 键小于当前节点向左，否则向右。已存在相同键时返回 `DuplicateKey`，索引不变。
    pub fn insert(&mut self, record: T) -> Result<()> {
        let key = record.key();
        let mut link = &mut self.root;
        while let Some(node) = link {
            let current = node.record.key();
            if key == current {
                return Err(HmsError::DuplicateKey(key));
            }
            link = if key < current {
                &mut node.left
            } else {
                &mut node.right
            };
        }
        *link = Some(Node::leaf(record));
        self.len += 1;
        Ok(())
    }

    /// 按 ID 精确查找
    pub fn search_by_id(&self, key: u32) -> Option<&T> {
        let mut link = &self.root;
        while let Some(node) = link {
            let current = node.record.key();
            if key == current {
                return Some(&node.record);
            }
            link = if key < current { &node.left } else { &node.right };
        }
        None
    }

    /// 按 ID 获取可变引用，用于原地更新
    ///
    /// 调用方不得修改记录的键，否则树的有序性被破坏。
    pub fn get_mut(&mut self, key: u32) -> Option<&mut T> {
        let mut link = &mut self.root;
        while let Some(node) = link {
            let current = node.record.key();
            if key == current {
                return Some(&mut node.record);
            }
            link = if key < current {
                &mut node.left
            } else {
                &mut node.right
            };
        }
        None
    }

    pub fn contains(&self, key: u32) -> bool {
        self.search_by_id(key).is_some()
    }

    /// 删除指定 ID 的记录，不存在时返回 `None`
    ///
    /// 有两个子节点时，用右子树最小节点（中序后继）的记录替换目标，再把后继从右子树摘除。
    pub fn delete(&mut self, key: u32) -> Option<T> {
        let link = Self::find_link(&mut self.root, key)?;
        let mut node = *link.take()?;
        let removed = match (node.left.take(), node.right.take()) {
            (None, None) => node.record,
            (Some(child), None) | (None, Some(child)) => {
                *link = Some(child);
                node.record
            }
            (Some(left), Some(right)) => {
                node.left = Some(left);
                node.right = Some(right);
                let successor = Self::take_min(&mut node.right)?;
                let removed = std::mem::replace(&mut node.record, successor);
                *link = Some(Box::new(node));
                removed
            }
        };
        self.len -= 1;
        Some(removed)
    }

    /// 找到指向目标节点的链接
    fn find_link(mut link: &mut Link<T>, key: u32) -> Option<&mut Link<T>> {
        loop {
            let current = link.as_ref()?.record.key();
            if key == current {
                return Some(link);
            }
            let node = link.as_mut()?;
            link = if key < current {
                &mut node.left
            } else {
                &mut node.right
            };
        }
    }

    /// 摘除子树中的最小节点，返回其记录
    fn take_min(mut link: &mut Link<T>) -> Option<T> {
        while link.as_ref()?.left.is_some() {
            link = &mut link.as_mut()?.left;
        }
        let mut min = *link.take()?;
        *link = min.right.take();
        Some(min.record)
    }

    /// 最大键
    pub fn max_key(&self) -> Option<u32> {
        let mut node = self.root.as_ref()?;
        while let Some(right) = node.right.as_ref() {
            node = right;
        }
        Some(node.record.key())
    }

    /// 按键升序遍历，惰性求值
    pub fn iter(&self) -> InOrder<'_, T> {
        let mut iter = InOrder { stack: Vec::new() };
        iter.push_left(self.root.as_deref());
        iter
    }

    /// 中序遍历结果，也是持久化时的保存顺序
    pub fn in_order(&self) -> Vec<&T> {
        self.iter().collect()
    }

    /// 全量中序扫描并过滤，O(n)
    pub fn find_all<P>(&self, mut predicate: P) -> Vec<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().filter(|record| predicate(record)).collect()
    }

    /// 清空索引，重新加载前调用
    pub fn clear(&mut self) {
        dismantle(self.root.take());
        self.len = 0;
    }
}

/// 逐个拆开节点，退化树在递归 Drop 中会爆栈
fn dismantle<T>(root: Link<T>) {
    let mut pending: Vec<Box<Node<T>>> = root.into_iter().collect();
    while let Some(mut node) = pending.pop() {
        pending.extend(node.left.take());
        pending.extend(node.right.take());
    }
}

impl<T: Keyed> Default for OrderedIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for OrderedIndex<T> {
    fn drop(&mut self) {
        dismantle(self.root.take());
    }
}

impl<T: Keyed + std::fmt::Debug> std::fmt::Debug for OrderedIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T: Keyed> IntoIterator for &'a OrderedIndex<T> {
    type Item = &'a T;
    type IntoIter = InOrder<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// 中序迭代器
pub struct InOrder<'a, T> {
    stack: Vec<&'a Node<T>>,
}

impl<'a, T> InOrder<'a, T> {
    fn push_left(&mut self, mut node: Option<&'a Node<T>>) {
        while let Some(current) = node {
            self.stack.push(current);
            node = current.left.as_deref();
        }
    }
}

impl<'a, T> Iterator for InOrder<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some(&node.record)
    }
}
