//! 患者服务
//!
//! 患者档案管理以及预约时的自动登记。

use hms_core::utils::{is_valid_age, is_valid_emergency_contact, MAX_PATIENT_AGE};
use hms_core::{HmsError, Patient, Result};
use hms_storage::{CsvStore, LoadSummary, OrderedIndex};
use std::path::PathBuf;

/// 患者信息更新，`None` 表示保持原值
#[derive(Debug, Clone, Default)]
pub struct PatientUpdate {
    pub emergency_contact: Option<String>,
    pub vegetarian: Option<bool>,
}

/// 新患者登记信息（姓名和联系电话由预约流程提供）
#[derive(Debug, Clone)]
pub struct PatientRegistration {
    pub age: u8,
    pub gender: String,
    pub illness: String,
    pub vegetarian: bool,
    pub was_admitted_before: bool,
}

/// 患者服务
#[derive(Debug)]
pub struct PatientService {
    patients: OrderedIndex<Patient>,
    store: CsvStore<Patient>,
}

impl PatientService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            patients: OrderedIndex::new(),
            store: CsvStore::new(path),
        }
    }

    pub fn load(&mut self) -> Result<LoadSummary> {
        self.store.load_into_index(&mut self.patients)
    }

    /// 程序化新增患者，追加写入文件（不校验联系电话）
    pub fn add_patient(&mut self, patient: Patient) -> Result<()> {
        let id = patient.patient_id;
        let line = patient.clone();
        self.patients.insert(patient)?;
        if let Err(e) = self.store.append(&line) {
            self.patients.delete(id);
            tracing::error!("追加患者 {} 失败，已撤销: {}", id, e);
            return Err(e);
        }
        tracing::info!("Added patient {}", id);
        Ok(())
    }

    /// 更新紧急联系电话或饮食偏好
    pub fn update_patient(&mut self, id: u32, update: PatientUpdate) -> Result<Patient> {
        let patient = self
            .patients
            .get_mut(id)
            .ok_or_else(|| HmsError::NotFound(format!("患者 {}", id)))?;
        let previous = patient.clone();
        if let Some(contact) = update.emergency_contact {
            patient.emergency_contact = contact;
        }
        if let Some(vegetarian) = update.vegetarian {
            patient.vegetarian = vegetarian;
        }
        let updated = patient.clone();

        if let Err(e) = self.store.save_index(&self.patients) {
            if let Some(patient) = self.patients.get_mut(id) {
                *patient = previous;
            }
            tracing::error!("保存患者 {} 失败，已撤销: {}", id, e);
            return Err(e);
        }
        tracing::info!("Updated patient {}", id);
        Ok(updated)
    }

    /// 删除患者，整体重写文件
    pub fn delete_patient(&mut self, id: u32) -> Result<Patient> {
        let removed = self
            .patients
            .delete(id)
            .ok_or_else(|| HmsError::NotFound(format!("患者 {}", id)))?;

        if let Err(e) = self.store.save_index(&self.patients) {
            self.patients.insert(removed)?;
            tracing::error!("删除患者 {} 后保存失败，已恢复: {}", id, e);
            return Err(e);
        }
        tracing::info!("Deleted patient {}", id);
        Ok(removed)
    }

    pub fn list_patients(&self) -> Vec<&Patient> {
        self.patients.in_order()
    }

    pub fn find_by_id(&self, id: u32) -> Option<&Patient> {
        self.patients.search_by_id(id)
    }

    /// 姓名完全匹配（忽略大小写）
    pub fn search_by_name(&self, name: &str) -> Vec<&Patient> {
        let name = name.trim();
        self.patients
            .find_all(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// 下一个可用患者 ID：现有最大 ID + 1
    pub fn next_patient_id(&self) -> Result<u32> {
        match self.patients.max_key() {
            None => Ok(1),
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| HmsError::Validation("ID space exhausted".to_string())),
        }
    }

    /// 按姓名（忽略大小写）和联系电话查找已登记患者
    pub fn find_registered(&self, name: &str, contact: &str) -> Option<&Patient> {
        let (name, contact) = (name.trim(), contact.trim());
        self.patients
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name) && p.emergency_contact == contact)
    }

    /// 返回已登记患者的 ID，未登记时登记新患者
    ///
    /// 新登记时校验年龄和联系电话，首次登记就诊次数记为 1。
    pub fn get_or_register(
        &mut self,
        name: &str,
        contact: &str,
        registration: PatientRegistration,
    ) -> Result<u32> {
        if let Some(existing) = self.find_registered(name, contact) {
            return Ok(existing.patient_id);
        }
        let contact = contact.trim();
        if !is_valid_emergency_contact(contact) {
            return Err(HmsError::Validation(format!(
                "联系电话须为 10 位数字且以 6-9 开头: {}",
                contact
            )));
        }
        if !is_valid_age(registration.age) {
            return Err(HmsError::Validation(format!(
                "年龄须在 0-{} 之间: {}",
                MAX_PATIENT_AGE, registration.age
            )));
        }

        let patient_id = self.next_patient_id()?;
        self.add_patient(Patient {
            patient_id,
            name: name.trim().to_string(),
            age: registration.age,
            gender: registration.gender,
            illness: registration.illness,
            emergency_contact: contact.to_string(),
            vegetarian: registration.vegetarian,
            number_of_visits: 1,
            was_admitted_before: registration.was_admitted_before,
        })?;
        Ok(patient_id)
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::patient;
    use tempfile::tempdir;

    fn registration(age: u8) -> PatientRegistration {
        PatientRegistration {
            age,
            gender: "F".to_string(),
            illness: "Migraine".to_string(),
            vegetarian: true,
            was_admitted_before: false,
        }
    }

    #[test]
    fn test_next_id_is_max_plus_one() {
        let dir = tempdir().unwrap();
        let mut service = PatientService::new(dir.path().join("Patients.csv"));
        assert_eq!(service.next_patient_id().unwrap(), 1);
        service.add_patient(patient(101, "Anu")).unwrap();
        service.add_patient(patient(7, "Ben")).unwrap();
        assert_eq!(service.next_patient_id().unwrap(), 102);
    }

    #[test]
    fn test_register_after_max_id_fails_cleanly() {
        let dir = tempdir().unwrap();
        let mut service = PatientService::new(dir.path().join("Patients.csv"));
        service.add_patient(patient(u32::MAX, "Anu")).unwrap();

        assert!(matches!(service.next_patient_id(), Err(HmsError::Validation(_))));
        assert!(matches!(
            service.get_or_register("Kavya", "9876512345", registration(28)),
            Err(HmsError::Validation(_))
        ));
        assert_eq!(service.len(), 1);
        // 已登记患者仍可直接找回
        assert_eq!(
            service
                .get_or_register("anu", "9876543210", registration(28))
                .unwrap(),
            u32::MAX
        );
    }

    #[test]
    fn test_add_appends_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Patients.csv");
        let mut service = PatientService::new(&path);
        service.add_patient(patient(3, "Anu")).unwrap();
        service.add_patient(patient(1, "Ben")).unwrap();

        let mut reloaded = PatientService::new(&path);
        let summary = reloaded.load().unwrap();
        assert_eq!(summary.loaded, 2);
        assert_eq!(reloaded.find_by_id(3).unwrap().name, "Anu");
        assert!(matches!(
            service.add_patient(patient(3, "Again")),
            Err(HmsError::DuplicateKey(3))
        ));
    }

    #[test]
    fn test_register_then_find_existing() {
        let dir = tempdir().unwrap();
        let mut service = PatientService::new(dir.path().join("Patients.csv"));
        service.add_patient(patient(10, "Anu")).unwrap();

        let id = service
            .get_or_register("Kavya", "9876512345", registration(28))
            .unwrap();
        assert_eq!(id, 11);
        let found = service.find_registered("KAVYA", "9876512345").unwrap();
        assert_eq!(found.patient_id, 11);
        assert_eq!(found.number_of_visits, 1);
        assert!(service.find_registered("Kavya", "9876500000").is_none());

        let again = service
            .get_or_register("kavya", "9876512345", registration(99))
            .unwrap();
        assert_eq!(again, 11);
        assert_eq!(service.len(), 2);
    }

    #[test]
    fn test_register_validates_contact_and_age() {
        let dir = tempdir().unwrap();
        let mut service = PatientService::new(dir.path().join("Patients.csv"));
        assert!(matches!(
            service.get_or_register("Kavya", "12345", registration(28)),
            Err(HmsError::Validation(_))
        ));
        assert!(matches!(
            service.get_or_register("Kavya", "9876512345", registration(121)),
            Err(HmsError::Validation(_))
        ));
        assert!(service.is_empty());
    }

    #[test]
    fn test_update_and_delete() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Patients.csv");
        let mut service = PatientService::new(&path);
        for (id, name) in [(1, "Anu"), (2, "Ben"), (3, "Cy")] {
            service.add_patient(patient(id, name)).unwrap();
        }

        let updated = service
            .update_patient(
                2,
                PatientUpdate {
                    vegetarian: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated.vegetarian);
        assert_eq!(updated.emergency_contact, "9876543210");

        service.delete_patient(1).unwrap();
        assert!(matches!(service.delete_patient(1), Err(HmsError::NotFound(_))));

        let mut reloaded = PatientService::new(&path);
        reloaded.load().unwrap();
        let ids: Vec<u32> = reloaded.list_patients().iter().map(|p| p.patient_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(reloaded.find_by_id(2).unwrap().vegetarian);
    }

    #[test]
    fn test_search_by_name_is_exact() {
        let dir = tempdir().unwrap();
        let mut service = PatientService::new(dir.path().join("Patients.csv"));
        service.add_patient(patient(1, "Anu")).unwrap();
        service.add_patient(patient(2, "Anupama")).unwrap();
        let hits: Vec<u32> = service.search_by_name("anu").iter().map(|p| p.patient_id).collect();
        assert_eq!(hits, vec![1]);
    }
}
