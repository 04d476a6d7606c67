//! # 医院记录管理配置
//!
//! 负责加载、验证和保存运行配置：数据文件位置、预约窗口和日志级别。

pub mod config;

pub use config::{BookingConfig, ConfigManager, ConfigValidator, DataConfig, HmsConfig, LoggingConfig};
