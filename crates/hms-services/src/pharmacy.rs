//! 药房服务
//!
//! 库存按录入顺序保存，下单时整单校验，任一行库存不足则整单拒绝、库存不变。

use hms_core::{HmsError, PharmacyItem, Result};
use hms_storage::{CsvStore, LoadSummary};
use std::collections::HashMap;
use std::path::PathBuf;

/// 药品信息更新，`None` 表示保持原值
#[derive(Debug, Clone, Default)]
pub struct PharmacyItemUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub quantity: Option<u32>,
    pub price: Option<f64>,
}

/// 订单行，按药品名称（忽略大小写）下单
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub name: String,
    pub quantity: u32,
}

/// 收据行
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLine {
    pub item_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// 订单收据
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
    pub lines: Vec<ReceiptLine>,
    pub total: f64,
}

fn check_price(price: f64) -> Result<()> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(HmsError::Validation(format!("价格必须为非负数: {}", price)))
    }
}

/// 药房服务
#[derive(Debug)]
pub struct PharmacyService {
    items: Vec<PharmacyItem>,
    store: CsvStore<PharmacyItem>,
}

impl PharmacyService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            items: Vec::new(),
            store: CsvStore::new(path),
        }
    }

    pub fn load(&mut self) -> Result<LoadSummary> {
        let report = self.store.load()?;
        self.items = report.records;
        let summary = LoadSummary {
            loaded: self.items.len(),
            skipped: report.skipped.len(),
        };
        tracing::info!(
            "Loaded {} pharmacy items ({} skipped)",
            summary.loaded,
            summary.skipped
        );
        Ok(summary)
    }

    /// 保存失败时恢复快照
    fn commit(&mut self, snapshot: Vec<PharmacyItem>) -> Result<()> {
        if let Err(e) = self.store.save_all(self.items.iter()) {
            self.items = snapshot;
            tracing::error!("保存药房库存失败，已恢复: {}", e);
            return Err(e);
        }
        Ok(())
    }

    fn position_by_id(&self, item_id: &str) -> Option<usize> {
        let item_id = item_id.trim();
        self.items
            .iter()
            .position(|item| item.item_id.eq_ignore_ascii_case(item_id))
    }

    fn position_by_name(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.items
            .iter()
            .position(|item| item.name.eq_ignore_ascii_case(name))
    }

    pub fn add_item(&mut self, item: PharmacyItem) -> Result<()> {
        check_price(item.price)?;
        if self.position_by_id(&item.item_id).is_some() {
            return Err(HmsError::DuplicateItem(item.item_id));
        }
        let snapshot = self.items.clone();
        let item_id = item.item_id.clone();
        self.items.push(item);
        self.commit(snapshot)?;
        tracing::info!("Added pharmacy item {}", item_id);
        Ok(())
    }

    pub fn update_item(&mut self, item_id: &str, update: PharmacyItemUpdate) -> Result<PharmacyItem> {
        if let Some(price) = update.price {
            check_price(price)?;
        }
        let pos = self
            .position_by_id(item_id)
            .ok_or_else(|| HmsError::NotFound(format!("药品 {}", item_id)))?;
        let snapshot = self.items.clone();

        let item = &mut self.items[pos];
        if let Some(name) = update.name {
            item.name = name;
        }
        if let Some(category) = update.category {
            item.category = category;
        }
        if let Some(manufacturer) = update.manufacturer {
            item.manufacturer = manufacturer;
        }
        if let Some(quantity) = update.quantity {
            item.quantity = quantity;
        }
        if let Some(price) = update.price {
            item.price = price;
        }
        let updated = item.clone();

        self.commit(snapshot)?;
        tracing::info!("Updated pharmacy item {}", updated.item_id);
        Ok(updated)
    }

    pub fn delete_item(&mut self, item_id: &str) -> Result<PharmacyItem> {
        let pos = self
            .position_by_id(item_id)
            .ok_or_else(|| HmsError::NotFound(format!("药品 {}", item_id)))?;
        let snapshot = self.items.clone();
        let removed = self.items.remove(pos);
        self.commit(snapshot)?;
        tracing::info!("Deleted pharmacy item {}", removed.item_id);
        Ok(removed)
    }

    /// 全部库存，按录入顺序
    pub fn list_items(&self) -> &[PharmacyItem] {
        &self.items
    }

    /// 有库存的药品
    pub fn available_items(&self) -> Vec<&PharmacyItem> {
        self.items.iter().filter(|item| item.quantity > 0).collect()
    }

    pub fn find_by_id(&self, item_id: &str) -> Option<&PharmacyItem> {
        self.position_by_id(item_id).map(|pos| &self.items[pos])
    }

    pub fn find_by_name(&self, name: &str) -> Option<&PharmacyItem> {
        self.position_by_name(name).map(|pos| &self.items[pos])
    }

    /// 下单
    ///
    /// 先校验所有订单行（同一药品多行合并计算），全部通过后才扣减库存并保存。
    pub fn order(&mut self, lines: &[OrderLine]) -> Result<OrderReceipt> {
        if lines.is_empty() {
            return Err(HmsError::Validation("订单为空".to_string()));
        }

        let mut requested: HashMap<usize, u32> = HashMap::new();
        let mut positions = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity == 0 {
                return Err(HmsError::Validation(format!("{} 的数量必须大于 0", line.name)));
            }
            let pos = self
                .position_by_name(&line.name)
                .ok_or_else(|| HmsError::NotFound(format!("药品 {}", line.name)))?;
            let total = requested.entry(pos).or_insert(0);
            *total = total.saturating_add(line.quantity);

            let item = &self.items[pos];
            if *total > item.quantity {
                tracing::warn!(
                    "Order rejected: {} requested {}, only {} in stock",
                    item.name,
                    *total,
                    item.quantity
                );
                return Err(HmsError::InsufficientStock {
                    item: item.name.clone(),
                    requested: *total,
                    available: item.quantity,
                });
            }
            positions.push(pos);
        }

        let snapshot = self.items.clone();
        let mut receipt = OrderReceipt {
            lines: Vec::with_capacity(lines.len()),
            total: 0.0,
        };
        for (line, pos) in lines.iter().zip(positions) {
            let item = &mut self.items[pos];
            item.quantity -= line.quantity;
            let subtotal = f64::from(line.quantity) * item.price;
            receipt.total += subtotal;
            receipt.lines.push(ReceiptLine {
                item_id: item.item_id.clone(),
                name: item.name.clone(),
                quantity: line.quantity,
                unit_price: item.price,
                subtotal,
            });
        }

        self.commit(snapshot)?;
        tracing::info!(
            "Order placed: {} lines, total {:.2}",
            receipt.lines.len(),
            receipt.total
        );
        Ok(receipt)
    }
}
