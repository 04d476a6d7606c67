//! 医生服务
//!
//! 医生档案的增删改查，数据保存在以医生 ID 为键的有序索引中。

use chrono::NaiveDateTime;
use chrono::Weekday;
use hms_core::{Doctor, HmsError, Result};
use hms_storage::{CsvStore, LoadSummary, OrderedIndex};
use std::path::PathBuf;

/// 医生信息更新，`None` 表示保持原值
#[derive(Debug, Clone, Default)]
pub struct DoctorUpdate {
    pub name: Option<String>,
    pub qualification: Option<String>,
    pub specialization: Option<String>,
    pub contact: Option<String>,
    pub experience: Option<u32>,
    pub availability: Option<Vec<Weekday>>,
}

impl DoctorUpdate {
    fn apply_to(self, doctor: &mut Doctor) {
        if let Some(name) = self.name {
            doctor.name = name;
        }
        if let Some(qualification) = self.qualification {
            doctor.qualification = qualification;
        }
        if let Some(specialization) = self.specialization {
            doctor.specialization = specialization;
        }
        if let Some(contact) = self.contact {
            doctor.contact = contact;
        }
        if let Some(experience) = self.experience {
            doctor.experience = experience;
        }
        if let Some(availability) = self.availability {
            doctor.availability = availability;
        }
    }
}

/// 医生服务
#[derive(Debug)]
pub struct DoctorService {
    doctors: OrderedIndex<Doctor>,
    store: CsvStore<Doctor>,
}

impl DoctorService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            doctors: OrderedIndex::new(),
            store: CsvStore::new(path),
        }
    }

    /// 从文件重新加载全部医生
    pub fn load(&mut self) -> Result<LoadSummary> {
        self.store.load_into_index(&mut self.doctors)
    }

    /// 新增医生，ID 已存在时拒绝
    pub fn add_doctor(&mut self, doctor: Doctor) -> Result<()> {
        let id = doctor.id;
        self.doctors.insert(doctor)?;
        if let Err(e) = self.store.save_index(&self.doctors) {
            self.doctors.delete(id);
            tracing::error!("保存医生 {} 失败，已撤销: {}", id, e);
            return Err(e);
        }
        tracing::info!("Added doctor {}", id);
        Ok(())
    }

    /// 更新医生信息，返回更新后的记录
    pub fn update_doctor(&mut self, id: u32, update: DoctorUpdate) -> Result<Doctor> {
        let doctor = self
            .doctors
            .get_mut(id)
            .ok_or_else(|| HmsError::NotFound(format!("医生 {}", id)))?;
        let previous = doctor.clone();
        update.apply_to(doctor);
        let updated = doctor.clone();

        if let Err(e) = self.store.save_index(&self.doctors) {
            if let Some(doctor) = self.doctors.get_mut(id) {
                *doctor = previous;
            }
            tracing::error!("保存医生 {} 失败，已撤销: {}", id, e);
            return Err(e);
        }
        tracing::info!("Updated doctor {}", id);
        Ok(updated)
    }

    /// 删除医生，返回被删除的记录
    pub fn delete_doctor(&mut self, id: u32) -> Result<Doctor> {
        let removed = self
            .doctors
            .delete(id)
            .ok_or_else(|| HmsError::NotFound(format!("医生 {}", id)))?;

        if let Err(e) = self.store.save_index(&self.doctors) {
            self.doctors.insert(removed)?;
            tracing::error!("删除医生 {} 后保存失败，已恢复: {}", id, e);
            return Err(e);
        }
        tracing::info!("Deleted doctor {}", id);
        Ok(removed)
    }

    /// 全部医生，按 ID 升序
    pub fn list_doctors(&self) -> Vec<&Doctor> {
        self.doctors.in_order()
    }

    pub fn find_by_id(&self, id: u32) -> Option<&Doctor> {
        self.doctors.search_by_id(id)
    }

    /// 姓名包含关键字（忽略大小写）
    pub fn search_by_name(&self, text: &str) -> Vec<&Doctor> {
        let needle = text.trim().to_lowercase();
        self.doctors
            .find_all(|d| d.name.to_lowercase().contains(&needle))
    }

    /// 专业包含关键字（忽略大小写）
    pub fn search_by_specialization(&self, text: &str) -> Vec<&Doctor> {
        let needle = text.trim().to_lowercase();
        self.doctors
            .find_all(|d| d.specialization.to_lowercase().contains(&needle))
    }

    /// 从业年限等于给定值
    pub fn search_by_experience(&self, years: u32) -> Vec<&Doctor> {
        self.doctors.find_all(|d| d.experience == years)
    }

    /// 医生是否在给定时间所在的星期出诊，医生不存在时为 `false`
    pub fn is_available_on(&self, id: u32, date_time: &NaiveDateTime) -> bool {
        self.find_by_id(id)
            .map_or(false, |doctor| doctor.is_available_at(date_time))
    }

    pub fn len(&self) -> usize {
        self.doctors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doctors.is_empty()
    }
}
