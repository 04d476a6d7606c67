//! 配置管理
//!
//! 默认值、可选的 TOML 配置文件和 `HMS_` 前缀的环境变量依次叠加，
//! 加载后经过验证器检查。嵌套字段的环境变量以 `__` 分隔，
//! 例如 `HMS_BOOKING__HORIZON_DAYS=30`。

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: HmsConfig,
    /// 配置文件路径，未指定时只使用默认值和环境变量
    config_path: Option<PathBuf>,
    validator: ConfigValidator,
}

/// 系统完整配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmsConfig {
    /// 数据文件
    pub data: DataConfig,
    /// 预约规则
    pub booking: BookingConfig,
    /// 日志
    pub logging: LoggingConfig,
}

/// 数据文件配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// 数据目录
    pub dir: PathBuf,
    pub doctors_file: String,
    pub patients_file: String,
    pub appointments_file: String,
    pub pharmacy_file: String,
    pub canteen_file: String,
}

/// 预约配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// 最多可提前预约的天数
    pub horizon_days: u32,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别，可以是 EnvFilter 指令
    pub level: String,
}

impl DataConfig {
    pub fn doctors_path(&self) -> PathBuf {
        self.dir.join(&self.doctors_file)
    }

    pub fn patients_path(&self) -> PathBuf {
        self.dir.join(&self.patients_file)
    }

    pub fn appointments_path(&self) -> PathBuf {
        self.dir.join(&self.appointments_file)
    }

    pub fn pharmacy_path(&self) -> PathBuf {
        self.dir.join(&self.pharmacy_file)
    }

    pub fn canteen_path(&self) -> PathBuf {
        self.dir.join(&self.canteen_file)
    }
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: String,
    /// 验证函数
    validator: fn(&HmsConfig) -> Result<()>,
    /// 错误消息
    error_message: String,
}

impl ConfigManager {
    /// 加载配置，配置文件不存在时使用默认值
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = Self::load_config(config_path.as_deref())?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config,
            config_path,
            validator,
        })
    }

    /// 按 默认值 → 配置文件 → 环境变量 的顺序叠加
    fn load_config(config_path: Option<&Path>) -> Result<HmsConfig> {
        let defaults = Config::try_from(&HmsConfig::default())
            .context("Failed to build default configuration")?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("HMS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: HmsConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded from: {}", path.display()),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    pub fn get_config(&self) -> &HmsConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// 保存配置到文件
    pub fn save_config(&self) -> Result<()> {
        let path = self
            .config_path
            .as_deref()
            .context("No configuration file path set")?;
        self.validate_config()?;
        let config_str =
            toml::to_string_pretty(&self.config).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, config_str).context("Failed to write configuration file")?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// 按点分路径读取配置值，例如 `booking.horizon_days`
    pub fn get_value<T>(&self, path: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let value = self
            .extract_nested_value(path)
            .context(format!("Configuration path not found: {}", path))?;

        serde_json::from_value(value).context("Failed to deserialize configuration value")
    }

    /// 按点分路径设置配置值，只修改内存中的配置
    pub fn set_value<T>(&mut self, path: &str, value: T) -> Result<()>
    where
        T: Serialize,
    {
        let value_json = serde_json::to_value(value).context("Failed to serialize value")?;
        let mut config_json =
            serde_json::to_value(&self.config).context("Failed to serialize config to JSON")?;

        let mut current = &mut config_json;
        for part in path.split('.') {
            current = current
                .as_object_mut()
                .and_then(|map| map.get_mut(part))
                .ok_or_else(|| anyhow::anyhow!("Path segment not found: {}", part))?;
        }
        *current = value_json;

        let new_config: HmsConfig = serde_json::from_value(config_json)
            .context(format!("Invalid value for configuration path: {}", path))?;
        self.validator.validate(&new_config)?;
        self.config = new_config;

        info!("Configuration value updated: {}", path);
        Ok(())
    }

    /// 命令行指定的数据目录优先于配置文件
    pub fn override_data_dir(&mut self, dir: impl Into<PathBuf>) {
        self.config.data.dir = dir.into();
        debug!("Data directory overridden: {}", self.config.data.dir.display());
    }

    /// 提取嵌套值
    fn extract_nested_value(&self, path: &str) -> Result<serde_json::Value> {
        let config_json =
            serde_json::to_value(&self.config).context("Failed to serialize config to JSON")?;

        let mut current = &config_json;
        for part in path.split('.') {
            match current {
                serde_json::Value::Object(map) => {
                    current = map
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Path segment not found: {}", part))?;
                }
                _ => return Err(anyhow::anyhow!("Invalid path at segment: {}", part)),
            }
        }

        Ok(current.clone())
    }

    /// 验证配置
    pub fn validate_config(&self) -> Result<()> {
        self.validator.validate(&self.config)
    }
}

fn require_file_name(name: &str, field: &str) -> Result<()> {
    if name.trim().is_empty() {
        Err(anyhow::anyhow!("{} cannot be empty", field))
    } else {
        Ok(())
    }
}

impl ConfigValidator {
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "data.files".to_string(),
                validator: |config| {
                    let data = &config.data;
                    require_file_name(&data.doctors_file, "data.doctors_file")?;
                    require_file_name(&data.patients_file, "data.patients_file")?;
                    require_file_name(&data.appointments_file, "data.appointments_file")?;
                    require_file_name(&data.pharmacy_file, "data.pharmacy_file")?;
                    require_file_name(&data.canteen_file, "data.canteen_file")
                },
                error_message: "Invalid data file name".to_string(),
            },
            ValidationRule {
                field_path: "booking.horizon_days".to_string(),
                validator: |config| {
                    if config.booking.horizon_days == 0 {
                        Err(anyhow::anyhow!("Booking horizon cannot be 0 days"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid booking horizon".to_string(),
            },
            ValidationRule {
                field_path: "logging.level".to_string(),
                validator: |config| {
                    if config.logging.level.trim().is_empty() {
                        Err(anyhow::anyhow!("Log level cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid log level".to_string(),
            },
        ];

        Self { validation_rules }
    }

    pub fn validate(&self, config: &HmsConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("{}: {}", rule.error_message, e));
            }
        }

        debug!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for HmsConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            booking: BookingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            doctors_file: "Doctors.csv".to_string(),
            patients_file: "Patients.csv".to_string(),
            appointments_file: "Appointments.csv".to_string(),
            pharmacy_file: "Pharmacy.csv".to_string(),
            canteen_file: "Menu.csv".to_string(),
        }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self { horizon_days: 90 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(Some(dir.path().join("absent.toml"))).unwrap();
        let config = manager.get_config();
        assert_eq!(config.data.dir, PathBuf::from("data"));
        assert_eq!(config.data.canteen_path(), PathBuf::from("data/Menu.csv"));
        assert_eq!(config.booking.horizon_days, 90);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hms.toml");
        fs::write(
            &path,
            "[data]\ndir = \"records\"\ndoctors_file = \"staff.csv\"\n\n[booking]\nhorizon_days = 14\n",
        )
        .unwrap();

        let manager = ConfigManager::new(Some(path)).unwrap();
        let config = manager.get_config();
        assert_eq!(config.data.doctors_path(), PathBuf::from("records/staff.csv"));
        assert_eq!(config.data.patients_file, "Patients.csv");
        assert_eq!(config.booking.horizon_days, 14);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hms.toml");
        fs::write(&path, "[booking]\nhorizon_days = 0\n").unwrap();
        assert!(ConfigManager::new(Some(path)).is_err());
    }

    #[test]
    fn test_get_and_set_value() {
        let mut manager = ConfigManager::new(None).unwrap();
        let horizon: u32 = manager.get_value("booking.horizon_days").unwrap();
        assert_eq!(horizon, 90);
        let file: String = manager.get_value("data.pharmacy_file").unwrap();
        assert_eq!(file, "Pharmacy.csv");
        assert!(manager.get_value::<u32>("booking.missing").is_err());

        manager.set_value("booking.horizon_days", 30).unwrap();
        assert_eq!(manager.get_config().booking.horizon_days, 30);
        assert!(manager.set_value("booking.horizon_days", 0).is_err());
        assert!(manager.set_value("booking.horizon_days", "soon").is_err());
        assert_eq!(manager.get_config().booking.horizon_days, 30);
    }

    #[test]
    fn test_set_then_save_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf").join("hms.toml");
        let mut manager = ConfigManager::new(Some(path.clone())).unwrap();

        manager.set_value("booking.horizon_days", 45).unwrap();
        manager.set_value("logging.level", "debug").unwrap();
        manager.save_config().unwrap();
        assert!(path.exists());

        let reloaded = ConfigManager::new(Some(path)).unwrap();
        assert_eq!(reloaded.get_config(), manager.get_config());
        assert_eq!(reloaded.config_path(), manager.config_path());
        assert_eq!(reloaded.get_config().booking.horizon_days, 45);
    }

    #[test]
    fn test_override_data_dir() {
        let mut manager = ConfigManager::new(None).unwrap();
        manager.override_data_dir("/var/lib/hms");
        assert_eq!(
            manager.get_config().data.appointments_path(),
            PathBuf::from("/var/lib/hms/Appointments.csv")
        );
        assert!(manager.validate_config().is_ok());
        assert!(manager.save_config().is_err());
    }
}
