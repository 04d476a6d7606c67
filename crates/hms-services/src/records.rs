//! 医院记录总览
//!
//! 持有全部记录服务，会话开始时统一加载。

use crate::{AppointmentService, CanteenService, DoctorService, PatientService, PharmacyService};
use hms_core::Result;
use hms_storage::LoadSummary;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 各集合的文件位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPaths {
    pub doctors: PathBuf,
    pub patients: PathBuf,
    pub appointments: PathBuf,
    pub pharmacy: PathBuf,
    pub canteen: PathBuf,
}

impl RecordPaths {
    /// 使用默认文件名
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            doctors: dir.join("Doctors.csv"),
            patients: dir.join("Patients.csv"),
            appointments: dir.join("Appointments.csv"),
            pharmacy: dir.join("Pharmacy.csv"),
            canteen: dir.join("Menu.csv"),
        }
    }
}

impl Default for RecordPaths {
    fn default() -> Self {
        Self::in_dir("data")
    }
}

/// 加载统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordsOverview {
    pub doctors: usize,
    pub patients: usize,
    pub appointments: usize,
    pub pharmacy_items: usize,
    pub canteen_items: usize,
    pub skipped_lines: usize,
}

#[derive(Debug)]
pub struct HospitalRecords {
    pub doctors: DoctorService,
    pub patients: PatientService,
    pub appointments: AppointmentService,
    pub pharmacy: PharmacyService,
    pub canteen: CanteenService,
}

impl HospitalRecords {
    pub fn new(paths: RecordPaths, booking_horizon_days: u32) -> Self {
        Self {
            doctors: DoctorService::new(paths.doctors),
            patients: PatientService::new(paths.patients),
            appointments: AppointmentService::new(paths.appointments, booking_horizon_days),
            pharmacy: PharmacyService::new(paths.pharmacy),
            canteen: CanteenService::new(paths.canteen),
        }
    }

    /// 创建并立即加载
    pub fn open(paths: RecordPaths, booking_horizon_days: u32) -> Result<Self> {
        let mut records = Self::new(paths, booking_horizon_days);
        records.load_all()?;
        Ok(records)
    }

    /// 重新加载全部集合
    pub fn load_all(&mut self) -> Result<RecordsOverview> {
        let summaries: [(&str, LoadSummary); 5] = [
            ("doctors", self.doctors.load()?),
            ("patients", self.patients.load()?),
            ("appointments", self.appointments.load()?),
            ("pharmacy", self.pharmacy.load()?),
            ("canteen", self.canteen.load()?),
        ];

        let skipped_lines = summaries.iter().map(|(_, s)| s.skipped).sum();
        for (name, summary) in &summaries {
            if summary.skipped > 0 {
                tracing::warn!("{}: 跳过 {} 行格式错误的记录", name, summary.skipped);
            }
        }

        let overview = RecordsOverview {
            doctors: summaries[0].1.loaded,
            patients: summaries[1].1.loaded,
            appointments: summaries[2].1.loaded,
            pharmacy_items: summaries[3].1.loaded,
            canteen_items: summaries[4].1.loaded,
            skipped_lines,
        };
        tracing::info!("Hospital records loaded: {:?}", overview);
        Ok(overview)
    }
}
