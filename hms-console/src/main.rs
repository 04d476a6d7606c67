//! 医院记录管理控制台

mod menu;
mod prompt;

use anyhow::{Context, Result};
use clap::Parser;
use hms_admin::ConfigManager;
use hms_services::{HospitalRecords, RecordPaths};
use menu::Console;
use prompt::{InputClosed, Prompt};
use std::io;
use std::path::PathBuf;
use tracing::info;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "hms-console")]
#[command(about = "医院记录管理系统：医生、患者、预约、药房和食堂")]
struct Args {
    /// 数据目录，覆盖配置文件中的 data.dir
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// 配置文件路径 (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别，未指定时使用配置中的 logging.level
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config_manager =
        ConfigManager::new(args.config.clone()).context("Failed to load configuration")?;
    if let Some(dir) = &args.data_dir {
        config_manager.override_data_dir(dir);
    }
    let config = config_manager.get_config().clone();

    // 日志写到 stderr，菜单输出在 stdout
    let log_level = args.log_level.unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(log_level.as_str())
        .with_writer(io::stderr)
        .init();

    info!("启动医院记录管理系统...");
    info!("  数据目录: {}", config.data.dir.display());
    info!("  预约窗口: {} 天", config.booking.horizon_days);

    let paths = RecordPaths {
        doctors: config.data.doctors_path(),
        patients: config.data.patients_path(),
        appointments: config.data.appointments_path(),
        pharmacy: config.data.pharmacy_path(),
        canteen: config.data.canteen_path(),
    };
    let records = HospitalRecords::open(paths, config.booking.horizon_days)
        .context("Failed to load hospital records")?;

    let stdin = io::stdin();
    let prompt = Prompt::new(stdin.lock(), io::stdout());
    let mut console = Console::new(records, config_manager, prompt);

    match console.run() {
        Err(e) if e.downcast_ref::<InputClosed>().is_some() => {
            info!("输入结束，退出");
            Ok(())
        }
        other => other,
    }
}
