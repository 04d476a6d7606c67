//! # HMS存储模块
//!
//! 内存索引结构以及与 CSV 文件之间的同步。
//!
//! - [`OrderedIndex`]：以整数 ID 为键的二叉搜索树（医生、患者）
//! - [`SequentialLedger`]：先进先出链表（预约）
//! - [`CsvStore`]：加载、整体重写、追加
//! - [`IdSequence`]：单调递增的 ID 分配

pub mod index;
pub mod ledger;
pub mod record;
pub mod sequence;
pub mod store;

pub use index::*;
pub use ledger::*;
pub use record::*;
pub use sequence::*;
pub use store::*;
