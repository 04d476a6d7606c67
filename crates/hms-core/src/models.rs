//! 核心数据模型定义

use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// 医生信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: u32,
    pub name: String,
    pub qualification: String,
    pub specialization: String,
    pub contact: String,
    pub experience: u32,          // 从业年限
    pub availability: Vec<Weekday>, // 出诊日，允许重复
}

impl Doctor {
    /// 医生是否在指定星期出诊
    pub fn is_available_on(&self, day: Weekday) -> bool {
        self.availability.contains(&day)
    }

    /// 医生是否在指定时间所在的星期出诊
    pub fn is_available_at(&self, date_time: &NaiveDateTime) -> bool {
        self.is_available_on(date_time.weekday())
    }
}

/// 患者基本信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: u32,
    pub name: String,
    pub age: u8,
    pub gender: String,
    pub illness: String,
    pub emergency_contact: String,
    pub vegetarian: bool,
    pub number_of_visits: u32,
    pub was_admitted_before: bool,
}

/// 预约信息
///
/// `patient_name` 是预约时的快照，患者档案后续变更不会回写。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub appointment_id: u32,
    pub patient_id: u32,
    pub patient_name: String,
    pub reason: String,
    pub date_time: NaiveDateTime,
    pub doctor_id: u32,
}

/// 药房库存条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PharmacyItem {
    pub item_id: String,
    pub name: String,
    pub category: String, // Medicine, Equipment, FirstAid 等
    pub manufacturer: String,
    pub quantity: u32,
    pub price: f64,
}

/// 食堂菜品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanteenItem {
    pub name: String,
    pub price: f64,
}

/// 带分类的食堂菜品，对应菜单文件中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub category: String,
    pub item: CanteenItem,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn doctor(availability: Vec<Weekday>) -> Doctor {
        Doctor {
            id: 1,
            name: "Asha Rao".to_string(),
            qualification: "MBBS".to_string(),
            specialization: "Cardiology".to_string(),
            contact: "9876543210".to_string(),
            experience: 12,
            availability,
        }
    }

    #[test]
    fn test_availability_ignores_duplicates() {
        let doc = doctor(vec![Weekday::Mon, Weekday::Mon, Weekday::Fri]);
        assert!(doc.is_available_on(Weekday::Mon));
        assert!(doc.is_available_on(Weekday::Fri));
        assert!(!doc.is_available_on(Weekday::Tue));
    }

    #[test]
    fn test_is_available_at_uses_weekday() {
        let doc = doctor(vec![Weekday::Wed]);
        // 2025-01-01 是星期三
        let wed = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let thu = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert!(doc.is_available_at(&wed));
        assert!(!doc.is_available_at(&thu));
    }
}
