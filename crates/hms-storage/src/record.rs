//! CSV 行编解码
//!
//! 每种实体一个文件，固定表头，按位置排列字段。

use crate::index::Keyed;
use hms_core::utils::{
    format_availability, format_date_time, parse_availability, parse_bool, parse_date_time,
};
use hms_core::{
    Appointment, CanteenItem, Doctor, HmsError, MenuEntry, Patient, PharmacyItem, Result,
};
use std::str::FromStr;

/// 可按位置字段读写的记录
pub trait CsvRecord: Sized {
    /// 表头行（不含换行）
    const HEADER: &'static str;
    /// 每行字段数
    const FIELD_COUNT: usize;

    fn to_fields(&self) -> Vec<String>;

    /// 从已去除首尾空白的字段解析
    fn from_fields(fields: &[&str]) -> Result<Self>;
}

fn parse_field<N>(value: &str, column: &str) -> Result<N>
where
    N: FromStr,
    N::Err: std::fmt::Display,
{
    value
        .parse::<N>()
        .map_err(|e| HmsError::Validation(format!("{} 字段 '{}' 无法解析: {}", column, value, e)))
}

fn parse_price(value: &str, column: &str) -> Result<f64> {
    let price: f64 = parse_field(value, column)?;
    if !price.is_finite() || price < 0.0 {
        return Err(HmsError::Validation(format!("{} 不能为负数: {}", column, value)));
    }
    Ok(price)
}

impl Keyed for Doctor {
    fn key(&self) -> u32 {
        self.id
    }
}

impl Keyed for Patient {
    fn key(&self) -> u32 {
        self.patient_id
    }
}

impl Keyed for Appointment {
    fn key(&self) -> u32 {
        self.appointment_id
    }
}

impl CsvRecord for Doctor {
    const HEADER: &'static str =
        "id,name,qualification,specialization,contact,experience,availability";
    const FIELD_COUNT: usize = 7;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.qualification.clone(),
            self.specialization.clone(),
            self.contact.clone(),
            self.experience.to_string(),
            format_availability(&self.availability),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self> {
        Ok(Self {
            id: parse_field(fields[0], "id")?,
            name: fields[1].to_string(),
            qualification: fields[2].to_string(),
            specialization: fields[3].to_string(),
            contact: fields[4].to_string(),
            experience: parse_field(fields[5], "experience")?,
            availability: parse_availability(fields[6])?,
        })
    }
}

impl CsvRecord for Patient {
    const HEADER: &'static str = "patientId,name,age,gender,illness,emergencyContact,vegetarian,numberOfVisits,wasAdmittedBefore";
    const FIELD_COUNT: usize = 9;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.patient_id.to_string(),
            self.name.clone(),
            self.age.to_string(),
            self.gender.clone(),
            self.illness.clone(),
            self.emergency_contact.clone(),
            self.vegetarian.to_string(),
            self.number_of_visits.to_string(),
            self.was_admitted_before.to_string(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self> {
        Ok(Self {
            patient_id: parse_field(fields[0], "patientId")?,
            name: fields[1].to_string(),
            age: parse_field(fields[2], "age")?,
            gender: fields[3].to_string(),
            illness: fields[4].to_string(),
            emergency_contact: fields[5].to_string(),
            vegetarian: parse_bool(fields[6])?,
            number_of_visits: parse_field(fields[7], "numberOfVisits")?,
            was_admitted_before: parse_bool(fields[8])?,
        })
    }
}

impl CsvRecord for Appointment {
    const HEADER: &'static str = "appointmentId,patientId,patientName,reason,dateTime,doctorId";
    const FIELD_COUNT: usize = 6;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.appointment_id.to_string(),
            self.patient_id.to_string(),
            self.patient_name.clone(),
            self.reason.clone(),
            format_date_time(&self.date_time),
            self.doctor_id.to_string(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self> {
        Ok(Self {
            appointment_id: parse_field(fields[0], "appointmentId")?,
            patient_id: parse_field(fields[1], "patientId")?,
            patient_name: fields[2].to_string(),
            reason: fields[3].to_string(),
            date_time: parse_date_time(fields[4])?,
            doctor_id: parse_field(fields[5], "doctorId")?,
        })
    }
}

impl CsvRecord for PharmacyItem {
    const HEADER: &'static str = "itemId,name,category,manufacturer,quantity,price";
    const FIELD_COUNT: usize = 6;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.item_id.clone(),
            self.name.clone(),
            self.category.clone(),
            self.manufacturer.clone(),
            self.quantity.to_string(),
            self.price.to_string(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self> {
        Ok(Self {
            item_id: fields[0].to_string(),
            name: fields[1].to_string(),
            category: fields[2].to_string(),
            manufacturer: fields[3].to_string(),
            quantity: parse_field(fields[4], "quantity")?,
            price: parse_price(fields[5], "price")?,
        })
    }
}

impl CsvRecord for MenuEntry {
    const HEADER: &'static str = "category,itemName,price";
    const FIELD_COUNT: usize = 3;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.category.clone(),
            self.item.name.clone(),
            self.item.price.to_string(),
        ]
    }

    /// 分类统一转为小写
    fn from_fields(fields: &[&str]) -> Result<Self> {
        Ok(Self {
            category: fields[0].to_lowercase(),
            item: CanteenItem {
                name: fields[1].to_string(),
                price: parse_price(fields[2], "price")?,
            },
        })
    }
}

/// 编码为一行（不含换行），字段中出现分隔符或首尾空白时拒绝写入
pub fn encode_line<T: CsvRecord>(record: &T) -> Result<String> {
    let fields = record.to_fields();
    if let Some(bad) = fields
        .iter()
        .find(|field| field.contains([',', '\n', '\r']))
    {
        return Err(HmsError::Validation(format!(
            "字段不能包含逗号或换行: '{}'",
            bad.escape_debug()
        )));
    }
    // 解析时会去掉首尾空白
    if let Some(bad) = fields.iter().find(|field| field.trim() != field.as_str()) {
        return Err(HmsError::Validation(format!(
            "字段首尾不能有空白: '{}'",
            bad.escape_debug()
        )));
    }
    Ok(fields.join(","))
}

/// 解析一行，`line_no` 从 1 开始，用于错误报告
pub fn decode_line<T: CsvRecord>(line: &str, line_no: usize) -> Result<T> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != T::FIELD_COUNT {
        return Err(HmsError::malformed(
            line_no,
            format!("期望 {} 个字段，实际 {} 个", T::FIELD_COUNT, fields.len()),
        ));
    }
    T::from_fields(&fields).map_err(|e| HmsError::malformed(line_no, e.to_string()))
}
