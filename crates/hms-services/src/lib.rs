//! # 医院记录服务
//!
//! 在存储层之上提供各类记录的业务操作：
//! - 医生档案：增删改查、按姓名/专科/年限搜索、出诊日判断
//! - 患者档案：登记、查找、更新
//! - 预约：按出诊日和预约窗口校验后排队，支持修改、取消、叫号
//! - 药房：库存维护与整单下单
//! - 食堂：分类菜单维护与点餐计价
//!
//! 每个修改操作都会立即写回对应的 CSV 文件，写入失败时内存状态回滚。

pub mod appointment;
pub mod canteen;
pub mod doctor;
pub mod patient;
pub mod pharmacy;
pub mod records;

// 重新导出主要类型
pub use appointment::{AppointmentService, AppointmentUpdate, BookingRequest};
pub use canteen::{CanteenBill, CanteenService, MenuPick};
pub use doctor::{DoctorService, DoctorUpdate};
pub use patient::{PatientRegistration, PatientService, PatientUpdate};
pub use pharmacy::{OrderLine, OrderReceipt, PharmacyItemUpdate, PharmacyService, ReceiptLine};
pub use records::{HospitalRecords, RecordPaths, RecordsOverview};
