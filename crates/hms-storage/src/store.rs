//! 持久化同步器
//!
//! 负责内存结构与 CSV 文件之间的双向映射：启动时加载，每次修改后整体重写或追加。

use crate::index::{Keyed, OrderedIndex};
use crate::ledger::SequentialLedger;
use crate::record::{decode_line, encode_line, CsvRecord};
use hms_core::{HmsError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str;
use tracing::{debug, info, warn};

/// 加载时跳过的行
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    /// 行号，从 1 开始（表头为第 1 行）
    pub line: usize,
    pub reason: String,
}

/// 加载结果
#[derive(Debug)]
pub struct LoadReport<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedLine>,
}

/// 加载到索引或账本后的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
}

/// 单个 CSV 文件的读写器
#[derive(Debug, Clone)]
pub struct CsvStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: CsvRecord> CsvStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 尽力加载：表头丢弃，空行忽略，格式错误的行记录警告后跳过
    ///
    /// 文件不存在时返回空结果，首次保存时创建。
    pub fn load(&self) -> Result<LoadReport<T>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("{} 不存在，将在保存时创建", self.path.display());
                return Ok(LoadReport {
                    records: Vec::new(),
                    skipped: Vec::new(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        // 逐行解码，单行的非 UTF-8 内容只影响该行
        for (idx, raw) in bytes.split(|&b| b == b'\n').enumerate().skip(1) {
            let line_no = idx + 1;
            let decoded = str::from_utf8(raw)
                .map_err(|e| HmsError::malformed(line_no, format!("非 UTF-8 内容: {}", e)))
                .and_then(|line| {
                    let line = line.trim_end_matches('\r');
                    if line.trim().is_empty() {
                        Ok(None)
                    } else {
                        decode_line::<T>(line, line_no).map(Some)
                    }
                });
            match decoded {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    warn!("跳过 {} 第 {} 行: {}", self.path.display(), line_no, e);
                    skipped.push(SkippedLine {
                        line: line_no,
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            "Loaded {} records from {} ({} skipped)",
            records.len(),
            self.path.display(),
            skipped.len()
        );
        Ok(LoadReport { records, skipped })
    }

    /// 整体重写文件
    ///
    /// 先写入同目录下的临时文件并同步到磁盘，成功后再替换原文件；
    /// 任一步失败都会删除临时文件，原文件保持不变。
    pub fn save_all<'a, I>(&self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut content = String::from(T::HEADER);
        content.push('\n');
        let mut count = 0;
        for record in records {
            content.push_str(&encode_line(record)?);
            content.push('\n');
            count += 1;
        }

        self.ensure_parent_dir()?;
        let tmp_path = self.tmp_path();
        if let Err(e) = Self::write_and_replace(&tmp_path, &self.path, content.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!("Saved {} records to {}", count, self.path.display());
        Ok(count)
    }

    fn write_and_replace(tmp_path: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(tmp_path, path)
    }

    /// 追加单条记录，布局与整体保存一致
    ///
    /// 文件缺失或为空时先写表头；末尾没有换行时先补一个。
    pub fn append(&self, record: &T) -> Result<()> {
        let line = encode_line(record)?;
        self.ensure_parent_dir()?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        let len = file.metadata()?.len();
        let mut chunk = String::new();
        if len == 0 {
            chunk.push_str(T::HEADER);
            chunk.push('\n');
        } else {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                chunk.push('\n');
            }
        }
        chunk.push_str(&line);
        chunk.push('\n');

        file.write_all(chunk.as_bytes())?;
        file.sync_all()?;
        debug!("Appended record to {}", self.path.display());
        Ok(())
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(HmsError::from)
            }
            _ => Ok(()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// 加载到账本，先清空原有内容
    pub fn load_into_ledger(&self, ledger: &mut SequentialLedger<T>) -> Result<LoadSummary> {
        let report = self.load()?;
        ledger.clear();
        let summary = LoadSummary {
            loaded: report.records.len(),
            skipped: report.skipped.len(),
        };
        for record in report.records {
            ledger.enqueue(record);
        }
        info!(
            "从 {} 加载 {} 条记录，跳过 {} 行",
            self.path.display(),
            summary.loaded,
            summary.skipped
        );
        Ok(summary)
    }

    /// 按账本顺序重写文件
    pub fn save_ledger(&self, ledger: &SequentialLedger<T>) -> Result<usize> {
        self.save_all(ledger.iter())
    }
}

impl<T: CsvRecord + Keyed> CsvStore<T> {
    /// 加载到索引，先清空原有内容；文件中的重复主键按格式错误处理
    pub fn load_into_index(&self, index: &mut OrderedIndex<T>) -> Result<LoadSummary> {
        let report = self.load()?;
        index.clear();
        let mut summary = LoadSummary {
            loaded: 0,
            skipped: report.skipped.len(),
        };
        for record in report.records {
            let key = record.key();
            match index.insert(record) {
                Ok(()) => summary.loaded += 1,
                Err(e) => {
                    warn!("跳过 {} 中的记录 {}: {}", self.path.display(), key, e);
                    summary.skipped += 1;
                }
            }
        }
        info!(
            "从 {} 加载 {} 条记录，跳过 {} 行",
            self.path.display(),
            summary.loaded,
            summary.skipped
        );
        Ok(summary)
    }

    /// 按中序（主键升序）重写文件
    pub fn save_index(&self, index: &OrderedIndex<T>) -> Result<usize> {
        self.save_all(index.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use hms_core::{Doctor, Patient};
    use tempfile::tempdir;

    fn doctor(id: u32) -> Doctor {
        Doctor {
            id,
            name: format!("Doctor {}", id),
            qualification: "MBBS".to_string(),
            specialization: "General".to_string(),
            contact: "9000000000".to_string(),
            experience: id,
            availability: vec![Weekday::Tue, Weekday::Thu],
        }
    }

    fn patient(id: u32) -> Patient {
        Patient {
            patient_id: id,
            name: format!("Patient {}", id),
            age: 40,
            gender: "F".to_string(),
            illness: "Cough".to_string(),
            emergency_contact: "9876501234".to_string(),
            vegetarian: id % 2 == 0,
            number_of_visits: 1,
            was_admitted_before: false,
        }
    }

    #[test]
    fn test_save_clear_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = CsvStore::<Doctor>::new(dir.path().join("Doctors.csv"));
        let mut index = OrderedIndex::new();
        for id in [5, 2, 8, 1, 3] {
            index.insert(doctor(id)).unwrap();
        }
        let before: Vec<Doctor> = index.iter().cloned().collect();

        assert_eq!(store.save_index(&index).unwrap(), 5);
        index.clear();
        let summary = store.load_into_index(&mut index).unwrap();

        assert_eq!(summary, LoadSummary { loaded: 5, skipped: 0 });
        let after: Vec<Doctor> = index.iter().cloned().collect();
        assert_eq!(before, after);

        let text = fs::read_to_string(store.path()).unwrap();
        let ids: Vec<&str> = text.lines().skip(1).map(|l| &l[..1]).collect();
        assert_eq!(ids, vec!["1", "2", "3", "5", "8"]);
        assert!(text.starts_with(Doctor::HEADER));
    }

    #[test]
    fn test_save_removes_stale_rows() {
        let dir = tempdir().unwrap();
        let store = CsvStore::<Doctor>::new(dir.path().join("Doctors.csv"));
        let mut index = OrderedIndex::new();
        for id in 1..=4 {
            index.insert(doctor(id)).unwrap();
        }
        store.save_index(&index).unwrap();
        index.delete(2);
        store.save_index(&index).unwrap();

        let report = store.load().unwrap();
        let ids: Vec<u32> = report.records.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
        assert!(!dir.path().join("Doctors.csv.tmp").exists());
    }

    #[test]
    fn test_load_skips_malformed_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Patients.csv");
        fs::write(
            &path,
            format!(
                "{}\n1,Anu,30,F,Cold,9876543210,true,1,false\n\nbad,line\n2,Ben,x,M,Flu,9876543211,false,1,true\r\n3,Cy,50,M,Flu,9876543212,false,4,true\r\n",
                Patient::HEADER
            ),
        )
        .unwrap();

        let store = CsvStore::<Patient>::new(&path);
        let report = store.load().unwrap();
        let ids: Vec<u32> = report.records.iter().map(|p| p.patient_id).collect();
        assert_eq!(ids, vec![1, 3]);
        let lines: Vec<usize> = report.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![4, 5]);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = CsvStore::<Patient>::new(dir.path().join("missing.csv"));
        let report = store.load().unwrap();
        assert!(report.records.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_duplicate_keys_in_file_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Doctors.csv");
        fs::write(
            &path,
            format!(
                "{}\n4,A,MD,X,1,2,Mon\n4,B,MD,Y,1,2,Tue\n",
                Doctor::HEADER
            ),
        )
        .unwrap();
        let store = CsvStore::<Doctor>::new(&path);
        let mut index = OrderedIndex::new();
        let summary = store.load_into_index(&mut index).unwrap();
        assert_eq!(summary, LoadSummary { loaded: 1, skipped: 1 });
        assert_eq!(index.search_by_id(4).unwrap().name, "A");
    }

    #[test]
    fn test_repeated_load_does_not_accumulate() {
        let dir = tempdir().unwrap();
        let store = CsvStore::<Patient>::new(dir.path().join("Patients.csv"));
        store.save_all([patient(1), patient(2)].iter()).unwrap();

        let mut index = OrderedIndex::new();
        store.load_into_index(&mut index).unwrap();
        store.load_into_index(&mut index).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_append_matches_full_save_layout() {
        let dir = tempdir().unwrap();
        let appended = CsvStore::<Patient>::new(dir.path().join("a.csv"));
        let saved = CsvStore::<Patient>::new(dir.path().join("b.csv"));

        appended.append(&patient(1)).unwrap();
        appended.append(&patient(2)).unwrap();
        saved.save_all([patient(1), patient(2)].iter()).unwrap();

        assert_eq!(
            fs::read_to_string(appended.path()).unwrap(),
            fs::read_to_string(saved.path()).unwrap()
        );
    }

    #[test]
    fn test_append_adds_missing_trailing_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Patients.csv");
        fs::write(
            &path,
            format!("{}\n1,Anu,30,F,Cold,9876543210,true,1,false", Patient::HEADER),
        )
        .unwrap();
        let store = CsvStore::<Patient>::new(&path);
        store.append(&patient(2)).unwrap();
        let report = store.load().unwrap();
        assert_eq!(report.records.len(), 2);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_failed_save_keeps_original() {
        let dir = tempdir().unwrap();
        let store = CsvStore::<Doctor>::new(dir.path().join("Doctors.csv"));
        store.save_all([doctor(1)].iter()).unwrap();
        let original = fs::read_to_string(store.path()).unwrap();

        let mut bad = doctor(2);
        bad.name = "Bad, Name".to_string();
        assert!(store.save_all([doctor(1), bad].iter()).is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), original);
    }

    #[test]
    fn test_unwritable_target_reports_persistence_error() {
        let dir = tempdir().unwrap();
        // 目标路径是一个目录，重命名必然失败
        let target = dir.path().join("Doctors.csv");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();
        let store = CsvStore::<Doctor>::new(&target);
        let err = store.save_all([doctor(1)].iter()).unwrap_err();
        assert!(matches!(err, HmsError::Persistence(_)));
        assert!(target.join("keep").exists());
        assert!(!dir.path().join("Doctors.csv.tmp").exists());
    }

    #[test]
    fn test_ledger_round_trip_keeps_order() {
        use hms_core::Appointment;
        use hms_core::utils::parse_date_time;

        let dir = tempdir().unwrap();
        let store = CsvStore::<Appointment>::new(dir.path().join("Appointments.csv"));
        let mut ledger = SequentialLedger::new();
        for id in [9, 3, 7] {
            ledger.enqueue(Appointment {
                appointment_id: id,
                patient_id: 1,
                patient_name: "Anu".to_string(),
                reason: "Checkup".to_string(),
                date_time: parse_date_time("2025-06-02 10:15").unwrap(),
                doctor_id: 2,
            });
        }
        store.save_ledger(&ledger).unwrap();
        let mut reloaded = SequentialLedger::new();
        store.load_into_ledger(&mut reloaded).unwrap();
        let ids: Vec<u32> = reloaded.iter().map(|a| a.appointment_id).collect();
        assert_eq!(ids, vec![9, 3, 7]);
    }

    #[test]
    fn test_load_skips_non_utf8_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Patients.csv");
        let mut bytes = format!(
            "{}\n1,Anu,30,F,Cold,9876543210,true,1,false\n",
            Patient::HEADER
        )
        .into_bytes();
        bytes.extend_from_slice(b"2,B\xffn,41,M,Flu,9876543211,false,1,true\n");
        bytes.extend_from_slice(b"3,Cy,50,M,Flu,9876543212,false,4,true\n");
        fs::write(&path, bytes).unwrap();

        let report = CsvStore::<Patient>::new(&path).load().unwrap();
        let ids: Vec<u32> = report.records.iter().map(|p| p.patient_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 3);
    }

    #[test]
    fn test_whitespace_field_rejected_before_write() {
        let dir = tempdir().unwrap();
        let store = CsvStore::<Doctor>::new(dir.path().join("Doctors.csv"));
        let mut index = OrderedIndex::new();
        index.insert(doctor(1)).unwrap();
        store.save_index(&index).unwrap();
        let original = fs::read_to_string(store.path()).unwrap();

        let mut padded = doctor(2);
        padded.name = " Asha ".to_string();
        index.insert(padded).unwrap();
        assert!(matches!(store.save_index(&index), Err(HmsError::Validation(_))));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), original);

        // 合法记录保存后重新加载，字段逐一相等
        index.get_mut(2).unwrap().name = "Asha".to_string();
        store.save_index(&index).unwrap();
        let before: Vec<Doctor> = index.iter().cloned().collect();
        index.clear();
        store.load_into_index(&mut index).unwrap();
        assert_eq!(index.iter().cloned().collect::<Vec<_>>(), before);
    }

    #[test]
    fn test_failed_load_keeps_index_contents() {
        let dir = tempdir().unwrap();
        // 路径是目录，读取失败且不是 NotFound
        let target = dir.path().join("Doctors.csv");
        fs::create_dir(&target).unwrap();
        let store = CsvStore::<Doctor>::new(&target);

        let mut index = OrderedIndex::new();
        for id in [2, 1, 3] {
            index.insert(doctor(id)).unwrap();
        }
        let err = store.load_into_index(&mut index).unwrap_err();
        assert!(matches!(err, HmsError::Persistence(_)));
        let ids: Vec<u32> = index.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_failed_load_keeps_ledger_contents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Patients.csv");
        fs::create_dir(&target).unwrap();
        let store = CsvStore::<Patient>::new(&target);

        let mut ledger = SequentialLedger::new();
        for id in [9, 4] {
            ledger.enqueue(patient(id));
        }
        let err = store.load_into_ledger(&mut ledger).unwrap_err();
        assert!(matches!(err, HmsError::Persistence(_)));
        let ids: Vec<u32> = ledger.iter().map(|p| p.patient_id).collect();
        assert_eq!(ids, vec![9, 4]);
    }
}
