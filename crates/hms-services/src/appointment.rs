//! 预约服务
//!
//! 预约按到达顺序保存在先进先出账本中，预约 ID 由加载时播种的序列分配。

use crate::doctor::DoctorService;
use chrono::{Datelike, Duration, NaiveDateTime};
use hms_core::utils::format_date_time;
use hms_core::{Appointment, HmsError, Result};
use hms_storage::{CsvStore, IdSequence, LoadSummary, SequentialLedger};
use std::path::PathBuf;

/// 新预约请求
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub patient_id: u32,
    pub patient_name: String,
    pub reason: String,
    pub date_time: NaiveDateTime,
    pub doctor_id: u32,
}

/// 预约修改，`None` 表示保持原值
#[derive(Debug, Clone, Default)]
pub struct AppointmentUpdate {
    pub doctor_id: Option<u32>,
    pub reason: Option<String>,
    pub date_time: Option<NaiveDateTime>,
}

/// 预约服务
#[derive(Debug)]
pub struct AppointmentService {
    ledger: SequentialLedger<Appointment>,
    store: CsvStore<Appointment>,
    sequence: IdSequence,
    horizon: Duration,
}

impl AppointmentService {
    /// `horizon_days` 为可提前预约的最长天数
    pub fn new(path: impl Into<PathBuf>, horizon_days: u32) -> Self {
        Self {
            ledger: SequentialLedger::new(),
            store: CsvStore::new(path),
            sequence: IdSequence::new(),
            horizon: Duration::days(i64::from(horizon_days)),
        }
    }

    /// 加载预约并用最大 ID 推进序列，序列不会因重新加载而回退
    pub fn load(&mut self) -> Result<LoadSummary> {
        let summary = self.store.load_into_ledger(&mut self.ledger)?;
        for appointment in self.ledger.iter() {
            self.sequence.observe(appointment.appointment_id);
        }
        tracing::debug!("Appointment sequence at {}", self.sequence.current());
        Ok(summary)
    }

    /// 分配下一个预约 ID
    pub fn next_appointment_id(&mut self) -> Result<u32> {
        self.sequence.next_id()
    }

    /// 可提前预约的最长天数
    pub fn horizon_days(&self) -> u32 {
        u32::try_from(self.horizon.num_days()).unwrap_or(u32::MAX)
    }

    /// 调整预约窗口，只影响之后的预约和修改
    pub fn set_horizon_days(&mut self, horizon_days: u32) {
        self.horizon = Duration::days(i64::from(horizon_days));
        tracing::info!("Booking horizon set to {} days", horizon_days);
    }

    /// 校验医生存在、时间在可预约范围内且医生当天出诊
    fn check_slot(
        &self,
        doctors: &DoctorService,
        doctor_id: u32,
        date_time: &NaiveDateTime,
        now: NaiveDateTime,
        check_window: bool,
    ) -> Result<()> {
        let doctor = doctors
            .find_by_id(doctor_id)
            .ok_or_else(|| HmsError::NotFound(format!("医生 {}", doctor_id)))?;

        if check_window {
            if *date_time < now {
                return Err(HmsError::OutsideBookingWindow(format!(
                    "{} 早于当前时间",
                    format_date_time(date_time)
                )));
            }
            if *date_time > now + self.horizon {
                return Err(HmsError::OutsideBookingWindow(format!(
                    "{} 超过 {} 天",
                    format_date_time(date_time),
                    self.horizon.num_days()
                )));
            }
        }

        if !doctor.is_available_at(date_time) {
            return Err(HmsError::DoctorUnavailable {
                doctor_id,
                day: date_time.weekday().to_string(),
            });
        }
        Ok(())
    }

    /// 预约：校验通过后入队并保存
    pub fn book(
        &mut self,
        request: BookingRequest,
        doctors: &DoctorService,
        now: NaiveDateTime,
    ) -> Result<Appointment> {
        if let Err(e) = self.check_slot(doctors, request.doctor_id, &request.date_time, now, true) {
            tracing::warn!("Booking rejected for patient {}: {}", request.patient_id, e);
            return Err(e);
        }

        let appointment = Appointment {
            appointment_id: self.next_appointment_id()?,
            patient_id: request.patient_id,
            patient_name: request.patient_name,
            reason: request.reason,
            date_time: request.date_time,
            doctor_id: request.doctor_id,
        };
        let id = appointment.appointment_id;
        self.ledger.enqueue(appointment.clone());

        if let Err(e) = self.store.save_ledger(&self.ledger) {
            self.ledger.remove_where(|a| a.appointment_id == id);
            tracing::error!("保存预约 {} 失败，已撤销: {}", id, e);
            return Err(e);
        }
        tracing::info!(
            "Booked appointment {} for patient {} with doctor {}",
            id,
            appointment.patient_id,
            appointment.doctor_id
        );
        Ok(appointment)
    }

    /// 修改预约，医生或时间变化后重新校验
    pub fn update_appointment(
        &mut self,
        id: u32,
        update: AppointmentUpdate,
        doctors: &DoctorService,
        now: NaiveDateTime,
    ) -> Result<Appointment> {
        let current = self
            .find(id)
            .cloned()
            .ok_or_else(|| HmsError::NotFound(format!("预约 {}", id)))?;

        let doctor_id = update.doctor_id.unwrap_or(current.doctor_id);
        let date_time = update.date_time.unwrap_or(current.date_time);
        self.check_slot(doctors, doctor_id, &date_time, now, update.date_time.is_some())?;

        let mut updated = current.clone();
        updated.doctor_id = doctor_id;
        updated.date_time = date_time;
        if let Some(reason) = update.reason {
            updated.reason = reason;
        }

        self.replace(id, updated.clone());
        if let Err(e) = self.store.save_ledger(&self.ledger) {
            self.replace(id, current);
            tracing::error!("保存预约 {} 失败，已撤销: {}", id, e);
            return Err(e);
        }
        tracing::info!("Updated appointment {}", id);
        Ok(updated)
    }

    fn replace(&mut self, id: u32, record: Appointment) {
        if let Some(slot) = self.ledger.iter_mut().find(|a| a.appointment_id == id) {
            *slot = record;
        }
    }

    /// 取消预约
    pub fn cancel_appointment(&mut self, id: u32) -> Result<()> {
        let snapshot = self.ledger.clone();
        if self.ledger.remove_where(|a| a.appointment_id == id) == 0 {
            return Err(HmsError::NotFound(format!("预约 {}", id)));
        }
        if let Err(e) = self.store.save_ledger(&self.ledger) {
            self.ledger = snapshot;
            tracing::error!("取消预约 {} 后保存失败，已恢复: {}", id, e);
            return Err(e);
        }
        tracing::info!("Cancelled appointment {}", id);
        Ok(())
    }

    /// 队首预约
    pub fn next_in_queue(&self) -> Option<&Appointment> {
        self.ledger.peek()
    }

    /// 接诊队首预约并从账本移除
    pub fn serve_next(&mut self) -> Result<Appointment> {
        let snapshot = self.ledger.clone();
        let served = self.ledger.dequeue()?;
        if let Err(e) = self.store.save_ledger(&self.ledger) {
            self.ledger = snapshot;
            tracing::error!("接诊预约 {} 后保存失败，已恢复: {}", served.appointment_id, e);
            return Err(e);
        }
        tracing::info!("Served appointment {}", served.appointment_id);
        Ok(served)
    }

    pub fn find(&self, id: u32) -> Option<&Appointment> {
        self.ledger.iter().find(|a| a.appointment_id == id)
    }

    pub fn appointments_for_patient(&self, patient_id: u32) -> Vec<&Appointment> {
        self.ledger
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .collect()
    }

    pub fn appointments_for_doctor(&self, doctor_id: u32) -> Vec<&Appointment> {
        self.ledger
            .iter()
            .filter(|a| a.doctor_id == doctor_id)
            .collect()
    }

    /// 全部预约，按到达顺序
    pub fn all(&self) -> impl Iterator<Item = &Appointment> {
        self.ledger.iter()
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }
}
