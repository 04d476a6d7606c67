//! 错误定义模块

use thiserror::Error;

/// 医院记录系统统一错误类型
#[derive(Error, Debug)]
pub enum HmsError {
    #[error("记录未找到: {0}")]
    NotFound(String),

    #[error("主键重复: {0}")]
    DuplicateKey(u32),

    #[error("条目重复: {0}")]
    DuplicateItem(String),

    #[error("队列为空")]
    EmptyLedger,

    #[error("第 {line} 行格式错误: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("医生 {doctor_id} 在 {day} 不出诊")]
    DoctorUnavailable { doctor_id: u32, day: String },

    #[error("预约时间超出可预约范围: {0}")]
    OutsideBookingWindow(String),

    #[error("库存不足: {item} 需要 {requested}，仅剩 {available}")]
    InsufficientStock {
        item: String,
        requested: u32,
        available: u32,
    },

    #[error("持久化错误: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    Config(String),
}

impl HmsError {
    /// 构造格式错误，行号从 1 开始计数
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }
}

/// 医院记录系统统一结果类型
pub type Result<T> = std::result::Result<T, HmsError>;
