//! 交互输入
//!
//! 读取失败或格式不对时重新提示，输入流结束时返回 [`InputClosed`]。

use anyhow::Result;
use chrono::{NaiveDateTime, Weekday};
use hms_core::utils::{parse_availability, parse_date_time, DATE_TIME_FORMAT};
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

/// 输入流已关闭
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputClosed;

impl fmt::Display for InputClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input closed")
    }
}

impl std::error::Error for InputClosed {}

pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[cfg(test)]
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// 输出一行
    pub fn say(&mut self, text: impl fmt::Display) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    /// 读取一行，去掉首尾空白
    pub fn line(&mut self, label: &str) -> Result<String> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Err(InputClosed.into());
        }
        Ok(buf.trim().to_string())
    }

    /// 读取非空文本
    pub fn text(&mut self, label: &str) -> Result<String> {
        loop {
            let value = self.line(label)?;
            if !value.is_empty() {
                return Ok(value);
            }
            self.say("Value cannot be empty.")?;
        }
    }

    /// 可选文本，直接回车表示不修改
    pub fn optional_text(&mut self, label: &str) -> Result<Option<String>> {
        let value = self.line(label)?;
        Ok((!value.is_empty()).then_some(value))
    }

    pub fn number<T: FromStr>(&mut self, label: &str) -> Result<T> {
        loop {
            let value = self.line(label)?;
            match value.parse() {
                Ok(number) => return Ok(number),
                Err(_) => self.say(format!("'{}' is not a valid number.", value))?,
            }
        }
    }

    /// 可选数字，直接回车表示不修改
    pub fn optional_number<T: FromStr>(&mut self, label: &str) -> Result<Option<T>> {
        loop {
            let value = self.line(label)?;
            if value.is_empty() {
                return Ok(None);
            }
            match value.parse() {
                Ok(number) => return Ok(Some(number)),
                Err(_) => self.say(format!("'{}' is not a valid number.", value))?,
            }
        }
    }

    /// 菜单选项；无法解析时返回 `None`
    pub fn choice(&mut self, label: &str) -> Result<Option<u32>> {
        Ok(self.line(label)?.parse().ok())
    }

    pub fn yes_no(&mut self, label: &str) -> Result<bool> {
        loop {
            let value = self.line(label)?.to_ascii_lowercase();
            match value.as_str() {
                "y" | "yes" | "true" => return Ok(true),
                "n" | "no" | "false" => return Ok(false),
                _ => self.say("Please answer yes or no.")?,
            }
        }
    }

    pub fn date_time(&mut self, label: &str) -> Result<NaiveDateTime> {
        loop {
            let value = self.line(label)?;
            match parse_date_time(&value) {
                Ok(date_time) => return Ok(date_time),
                Err(_) => self.say(format!("Invalid date-time, expected {}", DATE_TIME_FORMAT))?,
            }
        }
    }

    pub fn optional_date_time(&mut self, label: &str) -> Result<Option<NaiveDateTime>> {
        loop {
            let value = self.line(label)?;
            if value.is_empty() {
                return Ok(None);
            }
            match parse_date_time(&value) {
                Ok(date_time) => return Ok(Some(date_time)),
                Err(_) => self.say(format!("Invalid date-time, expected {}", DATE_TIME_FORMAT))?,
            }
        }
    }

    /// 出诊日，例如 `Mon-Wed-Fri`
    pub fn weekdays(&mut self, label: &str) -> Result<Vec<Weekday>> {
        loop {
            let value = self.line(label)?;
            match parse_availability(&value) {
                Ok(days) => return Ok(days),
                Err(e) => self.say(e)?,
            }
        }
    }

    pub fn optional_weekdays(&mut self, label: &str) -> Result<Option<Vec<Weekday>>> {
        loop {
            let value = self.line(label)?;
            if value.is_empty() {
                return Ok(None);
            }
            match parse_availability(&value) {
                Ok(days) => return Ok(Some(days)),
                Err(e) => self.say(e)?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompt(input: &str) -> Prompt<Cursor<Vec<u8>>, Vec<u8>> {
        Prompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_number_reprompts_until_valid() {
        let mut p = prompt("abc\n\n 42 \n");
        let value: u32 = p.number("Age: ").unwrap();
        assert_eq!(value, 42);
        let out = String::from_utf8(p.output().clone()).unwrap();
        assert_eq!(out.matches("Age: ").count(), 3);
        assert!(out.contains("'abc' is not a valid number."));
    }

    #[test]
    fn test_optional_values() {
        let mut p = prompt("\n7\n\nTue-Thu\n");
        assert_eq!(p.optional_number::<u32>("n: ").unwrap(), None);
        assert_eq!(p.optional_number::<u32>("n: ").unwrap(), Some(7));
        assert_eq!(p.optional_weekdays("days: ").unwrap(), None);
        assert_eq!(
            p.optional_weekdays("days: ").unwrap(),
            Some(vec![Weekday::Tue, Weekday::Thu])
        );
    }

    #[test]
    fn test_date_time_and_yes_no() {
        let mut p = prompt("tomorrow\n2025-01-06 09:30\nmaybe\nYes\n");
        let when = p.date_time("When: ").unwrap();
        assert_eq!(when, parse_date_time("2025-01-06 09:30").unwrap());
        assert!(p.yes_no("Confirm? ").unwrap());
    }

    #[test]
    fn test_end_of_input() {
        let mut p = prompt("");
        let err = p.line("> ").unwrap_err();
        assert!(err.downcast_ref::<InputClosed>().is_some());
        assert_eq!(prompt("x\n").choice("> ").unwrap(), None);
    }
}
