//! 通用工具函数

use crate::error::{HmsError, Result};
use chrono::{NaiveDateTime, Weekday};
use regex::Regex;
use std::sync::OnceLock;

/// 预约时间格式，分钟精度，无时区
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// 患者年龄上限
pub const MAX_PATIENT_AGE: u8 = 120;

fn contact_regex() -> &'static Regex {
    static CONTACT: OnceLock<Regex> = OnceLock::new();
    CONTACT.get_or_init(|| Regex::new(r"^[6-9][0-9]{9}$").expect("static pattern"))
}

/// 验证紧急联系电话：10 位数字，首位 6-9
pub fn is_valid_emergency_contact(contact: &str) -> bool {
    contact_regex().is_match(contact)
}

/// 验证患者年龄
pub fn is_valid_age(age: u8) -> bool {
    age <= MAX_PATIENT_AGE
}

/// 解析 `yyyy-MM-dd HH:mm` 格式的时间
pub fn parse_date_time(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), DATE_TIME_FORMAT)
        .map_err(|e| HmsError::Validation(format!("无效的日期时间 '{}': {}", text, e)))
}

/// 格式化为 `yyyy-MM-dd HH:mm`
pub fn format_date_time(date_time: &NaiveDateTime) -> String {
    date_time.format(DATE_TIME_FORMAT).to_string()
}

/// 解析 `Mon-Wed-Fri` 形式的出诊日列表，空串表示无出诊日
pub fn parse_availability(text: &str) -> Result<Vec<Weekday>> {
    text.split('-')
        .map(str::trim)
        .filter(|day| !day.is_empty())
        .map(|day| {
            day.parse::<Weekday>()
                .map_err(|_| HmsError::Validation(format!("无效的星期: {}", day)))
        })
        .collect()
}

/// 将出诊日列表格式化为 `Mon-Wed-Fri`
pub fn format_availability(days: &[Weekday]) -> String {
    days.iter()
        .map(|day| day.to_string())
        .collect::<Vec<_>>()
        .join("-")
}

/// 解析字面量 `true`/`false`（忽略大小写）
pub fn parse_bool(text: &str) -> Result<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(HmsError::Validation(format!("无效的布尔值: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emergency_contact() {
        assert!(is_valid_emergency_contact("9876543210"));
        assert!(is_valid_emergency_contact("6000000000"));
        assert!(!is_valid_emergency_contact("5876543210"));
        assert!(!is_valid_emergency_contact("987654321"));
        assert!(!is_valid_emergency_contact("98765432100"));
        assert!(!is_valid_emergency_contact("98765abcde"));
    }

    #[test]
    fn test_date_time_round_trip() {
        let dt = parse_date_time("2025-03-14 09:05").unwrap();
        assert_eq!(format_date_time(&dt), "2025-03-14 09:05");
        assert!(parse_date_time("2025-03-14").is_err());
        assert!(parse_date_time("14/03/2025 09:05").is_err());
    }

    #[test]
    fn test_availability() {
        let days = parse_availability("Mon-wed-FRI").unwrap();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
        assert_eq!(format_availability(&days), "Mon-Wed-Fri");
        assert!(parse_availability("").unwrap().is_empty());
        assert!(parse_availability("Mon-Funday").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true").unwrap());
        assert!(!parse_bool(" FALSE ").unwrap());
        assert!(parse_bool("yes").is_err());
    }
}
