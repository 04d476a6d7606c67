//! 控制台菜单
//!
//! 顶层菜单按角色划分：管理员、医生、患者、食堂、药房。
//! 业务错误只提示给用户，输入输出错误向上返回。

use crate::prompt::Prompt;
use anyhow::Result;
use chrono::NaiveDateTime;
use hms_core::utils::{format_availability, format_date_time};
use hms_admin::ConfigManager;
use hms_core::{Appointment, CanteenItem, Doctor, HmsError, Patient, PharmacyItem};
use hms_services::{
    AppointmentUpdate, BookingRequest, DoctorUpdate, HospitalRecords, MenuPick, OrderLine,
    PatientRegistration, PatientUpdate, PharmacyItemUpdate,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

fn doctor_row(d: &Doctor) -> String {
    format!(
        "{:<5} {:<20} {:<12} {:<22} {:<12} {:>3}y  {}",
        d.id,
        d.name,
        d.qualification,
        d.specialization,
        d.contact,
        d.experience,
        format_availability(&d.availability)
    )
}

fn patient_row(p: &Patient) -> String {
    format!(
        "{:<5} {:<20} {:>3} {:<6} {:<18} {:<12} veg:{:<5} visits:{:<3} admitted:{}",
        p.patient_id,
        p.name,
        p.age,
        p.gender,
        p.illness,
        p.emergency_contact,
        p.vegetarian,
        p.number_of_visits,
        p.was_admitted_before
    )
}

fn appointment_row(a: &Appointment) -> String {
    format!(
        "#{:<5} {} patient {} ({}) with doctor {}: {}",
        a.appointment_id,
        format_date_time(&a.date_time),
        a.patient_id,
        a.patient_name,
        a.doctor_id,
        a.reason
    )
}

fn pharmacy_row(p: &PharmacyItem) -> String {
    format!(
        "{:<8} {:<20} {:<14} {:<18} Rs.{:<9.2} {}",
        p.item_id, p.name, p.category, p.manufacturer, p.price, p.quantity
    )
}

fn canteen_row(item: &CanteenItem) -> String {
    format!("{} - Rs{:.2}", item.name, item.price)
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub struct Console<R, W> {
    records: HospitalRecords,
    config: ConfigManager,
    prompt: Prompt<R, W>,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(records: HospitalRecords, config: ConfigManager, prompt: Prompt<R, W>) -> Self {
        Self {
            records,
            config,
            prompt,
        }
    }

    #[cfg(test)]
    pub fn records(&self) -> &HospitalRecords {
        &self.records
    }

    /// 提示业务错误，继续当前菜单
    fn report(&mut self, err: HmsError) -> Result<()> {
        warn!("操作失败: {}", err);
        self.prompt.say(format!("Error: {}", err))
    }

    fn invalid(&mut self) -> Result<()> {
        self.prompt.say("Invalid choice. Please try again.")
    }

    pub fn run(&mut self) -> Result<()> {
        loop {
            self.prompt.say("\n==== HEALTHCARE ADMINISTRATION SUITE MENU ====")?;
            self.prompt.say("1. Administrator")?;
            self.prompt.say("2. Doctor")?;
            self.prompt.say("3. Patient")?;
            self.prompt.say("4. Canteen")?;
            self.prompt.say("5. Pharmacy")?;
            self.prompt.say("0. Exit")?;
            match self.prompt.choice("Enter your choice: ")? {
                Some(1) => self.admin_menu()?,
                Some(2) => self.doctor_portal()?,
                Some(3) => self.patient_menu()?,
                Some(4) => self.canteen_menu()?,
                Some(5) => self.pharmacy_menu()?,
                Some(0) => {
                    self.prompt.say("Exiting system. Goodbye!")?;
                    return Ok(());
                }
                _ => self.invalid()?,
            }
        }
    }

    // ---------- 管理员 ----------

    fn admin_menu(&mut self) -> Result<()> {
        loop {
            self.prompt.say("\n===== Admin Menu =====")?;
            self.prompt.say("1. Manage Doctors")?;
            self.prompt.say("2. Manage Patients")?;
            self.prompt.say("3. Manage Appointments")?;
            self.prompt.say("4. Manage Canteen")?;
            self.prompt.say("5. Manage Pharmacy")?;
            self.prompt.say("6. Settings")?;
            self.prompt.say("0. Back")?;
            match self.prompt.choice("Enter your choice: ")? {
                Some(1) => self.manage_doctors()?,
                Some(2) => self.manage_patients()?,
                Some(3) => self.manage_appointments()?,
                Some(4) => self.canteen_manager()?,
                Some(5) => self.pharmacy_admin()?,
                Some(6) => self.settings_menu()?,
                Some(0) => return Ok(()),
                _ => self.invalid()?,
            }
        }
    }

    /// 配置错误来自 anyhow，只提示不中断菜单
    fn report_config(&mut self, err: anyhow::Error) -> Result<()> {
        warn!("配置操作失败: {:#}", err);
        self.prompt.say(format!("Error: {:#}", err))
    }

    fn settings_menu(&mut self) -> Result<()> {
        loop {
            self.prompt.say("\n==== Settings ====")?;
            self.prompt.say("1. View Settings")?;
            self.prompt.say("2. Change Booking Horizon")?;
            self.prompt.say("3. Save Settings")?;
            self.prompt.say("0. Back")?;
            match self.prompt.choice("Enter your choice: ")? {
                Some(1) => self.show_settings()?,
                Some(2) => {
                    let days: u32 = self.prompt.number("Booking horizon in days: ")?;
                    match self.config.set_value("booking.horizon_days", days) {
                        Ok(()) => {
                            self.records.appointments.set_horizon_days(days);
                            self.prompt.say(format!("Booking horizon set to {} days.", days))?;
                        }
                        Err(e) => self.report_config(e)?,
                    }
                }
                Some(3) => match self.config.save_config() {
                    Ok(()) => self.prompt.say("Settings saved.")?,
                    Err(e) => self.report_config(e)?,
                },
                Some(0) => return Ok(()),
                _ => self.invalid()?,
            }
        }
    }

    fn current_settings(&self) -> Result<(PathBuf, u32, String)> {
        Ok((
            self.config.get_value("data.dir")?,
            self.config.get_value("booking.horizon_days")?,
            self.config.get_value("logging.level")?,
        ))
    }

    fn show_settings(&mut self) -> Result<()> {
        let (dir, horizon, level) = match self.current_settings() {
            Ok(values) => values,
            Err(e) => return self.report_config(e),
        };
        let file = self
            .config
            .config_path()
            .map_or_else(|| "(none)".to_string(), |p| p.display().to_string());
        self.prompt.say(format!("Data directory: {}", dir.display()))?;
        self.prompt.say(format!("Booking horizon: {} days", horizon))?;
        self.prompt.say(format!("Log level: {}", level))?;
        self.prompt.say(format!("Settings file: {}", file))
    }

    fn manage_doctors(&mut self) -> Result<()> {
        loop {
            self.prompt.say("\n==== Doctor Management ====")?;
            self.prompt.say("1. Add Doctor")?;
            self.prompt.say("2. Delete Doctor")?;
            self.prompt.say("3. Update Doctor")?;
            self.prompt.say("4. View All Doctors")?;
            self.prompt.say("5. Search Doctor by ID")?;
            self.prompt.say("6. Search Doctor by Name")?;
            self.prompt.say("7. Search Doctor by Specialization")?;
            self.prompt.say("8. Search Doctor by Experience")?;
            self.prompt.say("0. Return to Main Menu")?;
            match self.prompt.choice("Enter your choice: ")? {
                Some(1) => self.add_doctor()?,
                Some(2) => {
                    let id = self.prompt.number("Enter Doctor ID to delete: ")?;
                    match self.records.doctors.delete_doctor(id) {
                        Ok(d) => self.prompt.say(format!("Doctor {} deleted.", d.name))?,
                        Err(e) => self.report(e)?,
                    }
                }
                Some(3) => self.update_doctor()?,
                Some(4) => self.list_doctors()?,
                Some(5) => {
                    let id = self.prompt.number("Enter Doctor ID: ")?;
                    let row = self.records.doctors.find_by_id(id).map(doctor_row);
                    self.prompt
                        .say(row.unwrap_or_else(|| format!("No doctor found with ID {}.", id)))?;
                }
                Some(6) => {
                    let text = self.prompt.text("Enter name: ")?;
                    let rows: Vec<String> =
                        self.records.doctors.search_by_name(&text).into_iter().map(doctor_row).collect();
                    self.print_rows(rows, "No doctors matched.")?;
                }
                Some(7) => {
                    let text = self.prompt.text("Enter specialization: ")?;
                    let rows: Vec<String> = self
                        .records
                        .doctors
                        .search_by_specialization(&text)
                        .into_iter()
                        .map(doctor_row)
                        .collect();
                    self.print_rows(rows, "No doctors matched.")?;
                }
                Some(8) => {
                    let years = self.prompt.number("Enter years of experience: ")?;
                    let rows: Vec<String> = self
                        .records
                        .doctors
                        .search_by_experience(years)
                        .into_iter()
                        .map(doctor_row)
                        .collect();
                    self.print_rows(rows, "No doctors matched.")?;
                }
                Some(0) => return Ok(()),
                _ => self.invalid()?,
            }
        }
    }

    fn print_rows(&mut self, rows: Vec<String>, empty: &str) -> Result<()> {
        if rows.is_empty() {
            return self.prompt.say(empty);
        }
        for row in rows {
            self.prompt.say(row)?;
        }
        Ok(())
    }

    fn list_doctors(&mut self) -> Result<()> {
        let rows: Vec<String> = self
            .records
            .doctors
            .list_doctors()
            .into_iter()
            .map(doctor_row)
            .collect();
        self.print_rows(rows, "No doctors on record.")
    }

    fn add_doctor(&mut self) -> Result<()> {
        let doctor = Doctor {
            id: self.prompt.number("Doctor ID: ")?,
            name: self.prompt.text("Name: ")?,
            qualification: self.prompt.text("Qualification: ")?,
            specialization: self.prompt.text("Specialization: ")?,
            contact: self.prompt.text("Contact: ")?,
            experience: self.prompt.number("Experience (years): ")?,
            availability: self.prompt.weekdays("Availability (e.g. Mon-Wed-Fri): ")?,
        };
        match self.records.doctors.add_doctor(doctor) {
            Ok(()) => self.prompt.say("Doctor added."),
            Err(e) => self.report(e),
        }
    }

    fn update_doctor(&mut self) -> Result<()> {
        let id = self.prompt.number("Enter Doctor ID to update: ")?;
        let Some(current) = self.records.doctors.find_by_id(id).map(doctor_row) else {
            return self.prompt.say(format!("No doctor found with ID {}.", id));
        };
        self.prompt.say(current)?;
        self.prompt.say("Press Enter to keep the current value.")?;
        let update = DoctorUpdate {
            name: self.prompt.optional_text("Name: ")?,
            qualification: self.prompt.optional_text("Qualification: ")?,
            specialization: self.prompt.optional_text("Specialization: ")?,
            contact: self.prompt.optional_text("Contact: ")?,
            experience: self.prompt.optional_number("Experience (years): ")?,
            availability: self.prompt.optional_weekdays("Availability: ")?,
        };
        match self.records.doctors.update_doctor(id, update) {
            Ok(d) => self.prompt.say(format!("Updated: {}", doctor_row(&d))),
            Err(e) => self.report(e),
        }
    }

    fn manage_patients(&mut self) -> Result<()> {
        loop {
            self.prompt.say("\n==== Patient Management ====")?;
            self.prompt.say("1. Add Patients")?;
            self.prompt.say("2. Delete Patients")?;
            self.prompt.say("3. Update Patients")?;
            self.prompt.say("4. View All Patients")?;
            self.prompt.say("5. Search Patients")?;
            self.prompt.say("0. Back")?;
            match self.prompt.choice("Enter your choice: ")? {
                Some(1) => self.add_patient()?,
                Some(2) => {
                    let id = self.prompt.number("Enter Patient ID to delete: ")?;
                    match self.records.patients.delete_patient(id) {
                        Ok(p) => self.prompt.say(format!("Patient {} deleted.", p.name))?,
                        Err(e) => self.report(e)?,
                    }
                }
                Some(3) => {
                    let id = self.prompt.number("Enter Patient ID to update: ")?;
                    self.update_patient(id)?;
                }
                Some(4) => {
                    let rows: Vec<String> = self
                        .records
                        .patients
                        .list_patients()
                        .into_iter()
                        .map(patient_row)
                        .collect();
                    self.print_rows(rows, "No patients on record.")?;
                }
                Some(5) => self.search_patients()?,
                Some(0) => return Ok(()),
                _ => self.invalid()?,
            }
        }
    }

    fn add_patient(&mut self) -> Result<()> {
        let suggested = match self.records.patients.next_patient_id() {
            Ok(id) => id,
            Err(e) => return self.report(e),
        };
        let patient_id = self
            .prompt
            .optional_number(&format!("Patient ID [{}]: ", suggested))?
            .unwrap_or(suggested);
        let patient = Patient {
            patient_id,
            name: self.prompt.text("Name: ")?,
            age: self.prompt.number("Age: ")?,
            gender: self.prompt.text("Gender: ")?,
            illness: self.prompt.text("Illness: ")?,
            emergency_contact: self.prompt.text("Emergency contact: ")?,
            vegetarian: self.prompt.yes_no("Vegetarian (yes/no): ")?,
            number_of_visits: self.prompt.number("Number of visits: ")?,
            was_admitted_before: self.prompt.yes_no("Admitted before (yes/no): ")?,
        };
        match self.records.patients.add_patient(patient) {
            Ok(()) => self.prompt.say(format!("Patient {} added.", patient_id)),
            Err(e) => self.report(e),
        }
    }

    fn update_patient(&mut self, id: u32) -> Result<()> {
        if self.records.patients.find_by_id(id).is_none() {
            return self.prompt.say(format!("No patient found with ID {}.", id));
        }
        self.prompt.say("Press Enter to keep the current value.")?;
        let emergency_contact = self.prompt.optional_text("Emergency contact: ")?;
        let vegetarian = match self.prompt.optional_text("Vegetarian (yes/no): ")? {
            Some(answer) => Some(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes" | "true")),
            None => None,
        };
        let update = PatientUpdate {
            emergency_contact,
            vegetarian,
        };
        match self.records.patients.update_patient(id, update) {
            Ok(p) => self.prompt.say(format!("Updated: {}", patient_row(&p))),
            Err(e) => self.report(e),
        }
    }

    fn search_patients(&mut self) -> Result<()> {
        self.prompt.say("1. Search by ID")?;
        self.prompt.say("2. Search by Name")?;
        match self.prompt.choice("Choose: ")? {
            Some(1) => {
                let id = self.prompt.number("Enter Patient ID: ")?;
                let row = self.records.patients.find_by_id(id).map(patient_row);
                self.prompt
                    .say(row.unwrap_or_else(|| format!("No patient found with ID {}.", id)))
            }
            Some(2) => {
                let name = self.prompt.text("Enter Patient Name: ")?;
                let rows: Vec<String> = self
                    .records
                    .patients
                    .search_by_name(&name)
                    .into_iter()
                    .map(patient_row)
                    .collect();
                self.print_rows(rows, &format!("No patients found with name '{}'.", name))
            }
            _ => self.invalid(),
        }
    }

    fn manage_appointments(&mut self) -> Result<()> {
        loop {
            self.prompt.say("\n==== Appointment Queue ====")?;
            self.prompt.say("1. View All Appointments")?;
            self.prompt.say("2. View Next Appointment")?;
            self.prompt.say("3. Serve Next Appointment")?;
            self.prompt.say("4. Cancel Appointment")?;
            self.prompt.say("0. Back")?;
            match self.prompt.choice("Enter your choice: ")? {
                Some(1) => {
                    let rows: Vec<String> =
                        self.records.appointments.all().map(appointment_row).collect();
                    self.print_rows(rows, "No appointments in the queue.")?;
                }
                Some(2) => {
                    let row = self.records.appointments.next_in_queue().map(appointment_row);
                    self.prompt
                        .say(row.unwrap_or_else(|| "No appointments in the queue.".to_string()))?;
                }
                Some(3) => match self.records.appointments.serve_next() {
                    Ok(a) => self.prompt.say(format!("Serving {}", appointment_row(&a)))?,
                    Err(e) => self.report(e)?,
                },
                Some(4) => {
                    let id = self.prompt.number("Enter Appointment ID to cancel: ")?;
                    match self.records.appointments.cancel_appointment(id) {
                        Ok(()) => self.prompt.say("Appointment cancelled.")?,
                        Err(e) => self.report(e)?,
                    }
                }
                Some(0) => return Ok(()),
                _ => self.invalid()?,
            }
        }
    }

    // ---------- 医生 ----------

    fn doctor_portal(&mut self) -> Result<()> {
        let id = self.prompt.number::<u32>("\nEnter Doctor ID: ")?;
        let Some(doctor) = self.records.doctors.find_by_id(id).cloned() else {
            return self.prompt.say("Doctor ID not found. Returning to main menu.");
        };
        self.prompt.say(format!("Welcome, {}!", doctor.name))?;

        loop {
            self.prompt.say("\n==== Doctor Menu: ====")?;
            self.prompt.say("1. View My Appointments")?;
            self.prompt.say("2. Search Patient by ID")?;
            self.prompt.say("3. Search Patient by Name")?;
            self.prompt.say("0. Logout")?;
            match self.prompt.choice("Choose an option: ")? {
                Some(1) => {
                    let rows: Vec<String> = self
                        .records
                        .appointments
                        .appointments_for_doctor(doctor.id)
                        .into_iter()
                        .map(|a| {
                            let name = self
                                .records
                                .patients
                                .find_by_id(a.patient_id)
                                .map_or(a.patient_name.as_str(), |p| p.name.as_str());
                            format!(
                                "Appointment ID: {}, Patient: {}, Date: {}",
                                a.appointment_id,
                                name,
                                format_date_time(&a.date_time)
                            )
                        })
                        .collect();
                    self.print_rows(
                        rows,
                        &format!("No appointments found for Dr. {}.", doctor.name),
                    )?;
                }
                Some(2) => {
                    let pid = self.prompt.number("Enter Patient ID to search: ")?;
                    let row = self.records.patients.find_by_id(pid).map(patient_row);
                    self.prompt
                        .say(row.unwrap_or_else(|| format!("No patient found with ID {}.", pid)))?;
                }
                Some(3) => {
                    let name = self.prompt.text("Enter Patient Name to search: ")?;
                    let rows: Vec<String> = self
                        .records
                        .patients
                        .search_by_name(&name)
                        .into_iter()
                        .map(|p| format!("- {} (ID: {})", p.name, p.patient_id))
                        .collect();
                    self.print_rows(rows, &format!("No patients found with name '{}'.", name))?;
                }
                Some(0) => return self.prompt.say("Logging out of doctor portal."),
                _ => self.invalid()?,
            }
        }
    }

    // ---------- 患者 ----------

    fn patient_menu(&mut self) -> Result<()> {
        loop {
            self.prompt.say("\n==== Patient Menu ====")?;
            self.prompt.say("1. Book an Appointment")?;
            self.prompt.say("2. Check My Appointments")?;
            self.prompt.say("3. Update My Appointment")?;
            self.prompt.say("4. Cancel My Appointment")?;
            self.prompt.say("5. View Doctors List")?;
            self.prompt.say("6. Update Patient Information")?;
            self.prompt.say("0. Back to Main Menu")?;
            match self.prompt.choice("Enter your choice: ")? {
                Some(1) => self.book_appointment()?,
                Some(2) => {
                    let pid = self.prompt.number("Enter your Patient ID: ")?;
                    self.show_patient_appointments(pid)?;
                }
                Some(3) => self.update_my_appointment()?,
                Some(4) => self.cancel_my_appointment()?,
                Some(5) => self.list_doctors()?,
                Some(6) => {
                    let pid = self.prompt.number("Enter your Patient ID: ")?;
                    self.update_patient(pid)?;
                }
                Some(0) => return Ok(()),
                _ => self.invalid()?,
            }
        }
    }

    fn show_patient_appointments(&mut self, patient_id: u32) -> Result<bool> {
        let rows: Vec<String> = self
            .records
            .appointments
            .appointments_for_patient(patient_id)
            .into_iter()
            .map(appointment_row)
            .collect();
        let found = !rows.is_empty();
        self.print_rows(
            rows,
            &format!("No appointments found for Patient ID: {}", patient_id),
        )?;
        Ok(found)
    }

    fn book_appointment(&mut self) -> Result<()> {
        let name = self.prompt.text("Enter your name: ")?;
        let contact = self.prompt.text("Enter contact number: ")?;
        let reason = self.prompt.text("Enter illness details: ")?;

        let existing = self
            .records
            .patients
            .find_registered(&name, &contact)
            .map(|p| p.patient_id);
        let patient_id = match existing {
            Some(id) => id,
            None => {
                self.prompt.say("New patient, please register.")?;
                let registration = PatientRegistration {
                    age: self.prompt.number("Age: ")?,
                    gender: self.prompt.text("Gender: ")?,
                    illness: reason.clone(),
                    vegetarian: self.prompt.yes_no("Vegetarian (yes/no): ")?,
                    was_admitted_before: self.prompt.yes_no("Admitted before (yes/no): ")?,
                };
                match self.records.patients.get_or_register(&name, &contact, registration) {
                    Ok(id) => {
                        self.prompt.say(format!("Registered with Patient ID {}.", id))?;
                        id
                    }
                    Err(e) => return self.report(e),
                }
            }
        };

        self.prompt.say("==== Doctors' List ====")?;
        self.list_doctors()?;
        let doctor_id = self.prompt.number("Enter preferred doctor ID: ")?;
        let date_time = self
            .prompt
            .date_time("Preferred date and time (yyyy-MM-dd HH:mm): ")?;

        let request = BookingRequest {
            patient_id,
            patient_name: name,
            reason,
            date_time,
            doctor_id,
        };
        match self
            .records
            .appointments
            .book(request, &self.records.doctors, now())
        {
            Ok(a) => self.prompt.say(format!(
                "Appointment booked successfully! Appointment ID: {}",
                a.appointment_id
            )),
            Err(e) => self.report(e),
        }
    }

    fn update_my_appointment(&mut self) -> Result<()> {
        let pid = self.prompt.number("Enter your Patient ID: ")?;
        if !self.show_patient_appointments(pid)? {
            return Ok(());
        }
        let id: u32 = self.prompt.number("Enter Appointment ID to update: ")?;
        if self.records.appointments.find(id).map(|a| a.patient_id) != Some(pid) {
            return self.prompt.say("Appointment not found for this patient.");
        }
        self.prompt.say("Press Enter to keep the current value.")?;
        let update = AppointmentUpdate {
            doctor_id: self.prompt.optional_number("New doctor ID: ")?,
            reason: self.prompt.optional_text("New reason: ")?,
            date_time: self
                .prompt
                .optional_date_time("New date and time (yyyy-MM-dd HH:mm): ")?,
        };
        match self
            .records
            .appointments
            .update_appointment(id, update, &self.records.doctors, now())
        {
            Ok(a) => self.prompt.say(format!("Updated: {}", appointment_row(&a))),
            Err(e) => self.report(e),
        }
    }

    fn cancel_my_appointment(&mut self) -> Result<()> {
        let pid = self.prompt.number("Enter your Patient ID: ")?;
        if !self.show_patient_appointments(pid)? {
            return Ok(());
        }
        let id: u32 = self.prompt.number("Enter Appointment ID to cancel: ")?;
        if self.records.appointments.find(id).map(|a| a.patient_id) != Some(pid) {
            return self.prompt.say("Appointment not found for this patient.");
        }
        match self.records.appointments.cancel_appointment(id) {
            Ok(()) => self.prompt.say("Appointment cancelled."),
            Err(e) => self.report(e),
        }
    }

    // ---------- 食堂 ----------

    fn canteen_menu(&mut self) -> Result<()> {
        self.prompt.say("\n--- Welcome to the Canteen ---")?;
        self.prompt.say("1. Manager")?;
        self.prompt.say("2. Customer")?;
        match self.prompt.choice("Enter choice (1 or 2): ")? {
            Some(1) => self.canteen_manager(),
            Some(2) => self.canteen_customer(),
            _ => self.prompt.say("Invalid role selected."),
        }
    }

    fn show_menu(&mut self) -> Result<()> {
        if self.records.canteen.is_empty() {
            return self.prompt.say("Menu is empty.");
        }
        let mut lines = Vec::new();
        for (category, items) in self.records.canteen.menu() {
            lines.push(format!("\nCategory: {}", category));
            lines.extend(items.iter().map(canteen_row));
        }
        self.print_rows(lines, "Menu is empty.")
    }

    fn canteen_manager(&mut self) -> Result<()> {
        loop {
            self.prompt.say("\n--- CANTEEN MANAGER MENU ---")?;
            self.prompt.say("1. Add Item")?;
            self.prompt.say("2. Delete Item")?;
            self.prompt.say("3. Update Item")?;
            self.prompt.say("4. Show Menu")?;
            self.prompt.say("0. Back")?;
            match self.prompt.choice("Choose: ")? {
                Some(1) => {
                    let category = self.prompt.text("Category (Snacks/Breakfast/Lunch/Dinner): ")?;
                    let item = CanteenItem {
                        name: self.prompt.text("Item name: ")?,
                        price: self.prompt.number("Price: ")?,
                    };
                    match self.records.canteen.add_item(&category, item) {
                        Ok(()) => self.prompt.say(format!("Item added to {}.", category))?,
                        Err(e) => self.report(e)?,
                    }
                }
                Some(2) => {
                    let category = self.prompt.text("Category: ")?;
                    let name = self.prompt.text("Item name to delete: ")?;
                    match self.records.canteen.delete_item(&category, &name) {
                        Ok(_) => self.prompt.say("Item deleted.")?,
                        Err(e) => self.report(e)?,
                    }
                }
                Some(3) => {
                    let category = self.prompt.text("Category: ")?;
                    let name = self.prompt.text("Item name to update: ")?;
                    let replacement = CanteenItem {
                        name: self.prompt.text("New name: ")?,
                        price: self.prompt.number("New price: ")?,
                    };
                    match self.records.canteen.update_item(&category, &name, replacement) {
                        Ok(()) => self.prompt.say("Item updated.")?,
                        Err(e) => self.report(e)?,
                    }
                }
                Some(4) => self.show_menu()?,
                Some(0) => return Ok(()),
                _ => self.prompt.say("Invalid option!")?,
            }
        }
    }

    fn canteen_customer(&mut self) -> Result<()> {
        let mut picks = Vec::new();
        loop {
            let categories: Vec<String> = self
                .records
                .canteen
                .categories()
                .into_iter()
                .map(|c| format!("- {}", c))
                .collect();
            self.prompt.say("\nAvailable Categories:")?;
            self.print_rows(categories, "Menu is empty.")?;
            let category = self.prompt.line("Choose a category (or 0 to confirm order): ")?;
            if category == "0" {
                break;
            }
            let items: Vec<CanteenItem> = self.records.canteen.items_in(&category).to_vec();
            if items.is_empty() {
                self.prompt.say("Category not found. Please choose again.")?;
                continue;
            }
            loop {
                self.prompt.say(format!("\n--- {} MENU ---", category))?;
                for (i, item) in items.iter().enumerate() {
                    self.prompt.say(format!("{}. {}", i + 1, canteen_row(item)))?;
                }
                self.prompt.say("0. Back to category selection")?;
                match self.prompt.choice("Select item number to order (0 to go back): ")? {
                    Some(0) => break,
                    Some(n) if (n as usize) <= items.len() => {
                        picks.push(MenuPick {
                            category: category.clone(),
                            name: items[n as usize - 1].name.clone(),
                        });
                        self.prompt.say("Item added to order.")?;
                    }
                    _ => self.prompt.say("Invalid choice.")?,
                }
            }
        }

        if picks.is_empty() {
            return self.prompt.say("No items were selected.");
        }
        let bill = match self.records.canteen.quote(&picks) {
            Ok(bill) => bill,
            Err(e) => return self.report(e),
        };
        self.prompt.say("\nYour Order:")?;
        for item in &bill.items {
            self.prompt.say(canteen_row(item))?;
        }
        self.prompt.say(format!("Total: Rs{:.2}", bill.total))?;
        if self.prompt.yes_no("Confirm order? (yes/no): ")? {
            self.prompt.say("Order placed successfully!")
        } else {
            self.prompt.say("Order cancelled.")
        }
    }

    // ---------- 药房 ----------

    fn pharmacy_menu(&mut self) -> Result<()> {
        self.prompt.say("\n--- Pharmacy ---")?;
        self.prompt.say("1. Administrator")?;
        self.prompt.say("2. Customer")?;
        match self.prompt.choice("Enter choice (1 or 2): ")? {
            Some(1) => self.pharmacy_admin(),
            Some(2) => self.pharmacy_customer(),
            _ => self.prompt.say("Invalid role selected."),
        }
    }

    fn pharmacy_admin(&mut self) -> Result<()> {
        loop {
            self.prompt.say("\n==== Pharmacy Admin Menu ====")?;
            self.prompt.say("1. View All Items")?;
            self.prompt.say("2. Add Item")?;
            self.prompt.say("3. Update Item")?;
            self.prompt.say("4. Delete Item")?;
            self.prompt.say("5. Search Item")?;
            self.prompt.say("0. Back to Main Menu")?;
            match self.prompt.choice("Enter your choice: ")? {
                Some(1) => {
                    let rows: Vec<String> =
                        self.records.pharmacy.list_items().iter().map(pharmacy_row).collect();
                    self.print_rows(rows, "Pharmacy inventory is empty.")?;
                }
                Some(2) => {
                    let item = PharmacyItem {
                        item_id: self.prompt.text("Item ID: ")?,
                        name: self.prompt.text("Name: ")?,
                        category: self.prompt.text("Category: ")?,
                        manufacturer: self.prompt.text("Manufacturer: ")?,
                        quantity: self.prompt.number("Quantity: ")?,
                        price: self.prompt.number("Price: ")?,
                    };
                    match self.records.pharmacy.add_item(item) {
                        Ok(()) => self.prompt.say("Item added.")?,
                        Err(e) => self.report(e)?,
                    }
                }
                Some(3) => {
                    let id = self.prompt.text("Item ID to update: ")?;
                    self.prompt.say("Press Enter to keep the current value.")?;
                    let update = PharmacyItemUpdate {
                        name: self.prompt.optional_text("Name: ")?,
                        category: self.prompt.optional_text("Category: ")?,
                        manufacturer: self.prompt.optional_text("Manufacturer: ")?,
                        quantity: self.prompt.optional_number("Quantity: ")?,
                        price: self.prompt.optional_number("Price: ")?,
                    };
                    match self.records.pharmacy.update_item(&id, update) {
                        Ok(item) => self.prompt.say(format!("Updated: {}", pharmacy_row(&item)))?,
                        Err(e) => self.report(e)?,
                    }
                }
                Some(4) => {
                    let id = self.prompt.text("Item ID to delete: ")?;
                    match self.records.pharmacy.delete_item(&id) {
                        Ok(item) => self.prompt.say(format!("{} deleted.", item.name))?,
                        Err(e) => self.report(e)?,
                    }
                }
                Some(5) => {
                    let query = self.prompt.text("Enter item name or ID: ")?;
                    let row = self
                        .records
                        .pharmacy
                        .find_by_name(&query)
                        .or_else(|| self.records.pharmacy.find_by_id(&query))
                        .map(pharmacy_row);
                    self.prompt.say(row.unwrap_or_else(|| "Item not found.".to_string()))?;
                }
                Some(0) => return Ok(()),
                _ => self.invalid()?,
            }
        }
    }

    fn show_available_items(&mut self) -> Result<()> {
        let rows: Vec<String> = self
            .records
            .pharmacy
            .available_items()
            .into_iter()
            .map(pharmacy_row)
            .collect();
        self.print_rows(rows, "No items in stock.")
    }

    fn pharmacy_customer(&mut self) -> Result<()> {
        loop {
            self.prompt.say("\n==== Pharmacy Customer Menu ====")?;
            self.prompt.say("1. View Available Items")?;
            self.prompt.say("2. Search Item by Name")?;
            self.prompt.say("3. Order Items")?;
            self.prompt.say("0. Back to Main Menu")?;
            match self.prompt.choice("Enter your choice: ")? {
                Some(1) => self.show_available_items()?,
                Some(2) => {
                    let name = self.prompt.text("Enter item name: ")?;
                    let row = self.records.pharmacy.find_by_name(&name).map(pharmacy_row);
                    self.prompt.say(row.unwrap_or_else(|| "Item not found.".to_string()))?;
                }
                Some(3) => self.order_items()?,
                Some(0) => return Ok(()),
                _ => self.invalid()?,
            }
        }
    }

    /// 收集订单行后整单提交
    fn order_items(&mut self) -> Result<()> {
        let mut lines = Vec::new();
        loop {
            self.prompt.say("\nAvailable Items:")?;
            self.show_available_items()?;
            let name = self
                .prompt
                .line("Enter item name to order (or type 'confirm' to finish): ")?;
            if name.eq_ignore_ascii_case("confirm") {
                break;
            }
            if name.is_empty() {
                continue;
            }
            let quantity = self.prompt.number("Enter quantity: ")?;
            lines.push(OrderLine { name, quantity });
        }

        if lines.is_empty() {
            return self.prompt.say("No items were ordered.");
        }
        match self.records.pharmacy.order(&lines) {
            Ok(receipt) => {
                for line in &receipt.lines {
                    self.prompt.say(format!(
                        "{} x {} @ Rs.{:.2} = Rs.{:.2}",
                        line.quantity, line.name, line.unit_price, line.subtotal
                    ))?;
                }
                self.prompt
                    .say(format!("Total amount to be paid: Rs.{:.2}", receipt.total))
            }
            Err(e) => self.report(e),
        }
    }
}
