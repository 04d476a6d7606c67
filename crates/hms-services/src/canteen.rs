//! 食堂服务
//!
//! 菜单按分类组织，分类名统一小写；同一分类内按菜名（忽略大小写）定位菜品。

use hms_core::{CanteenItem, HmsError, MenuEntry, Result};
use hms_storage::{CsvStore, LoadSummary};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 顾客点的一份菜
#[derive(Debug, Clone)]
pub struct MenuPick {
    pub category: String,
    pub name: String,
}

/// 点餐账单
#[derive(Debug, Clone, PartialEq)]
pub struct CanteenBill {
    pub items: Vec<CanteenItem>,
    pub total: f64,
}

fn category_key(category: &str) -> String {
    category.trim().to_lowercase()
}

fn check_price(price: f64) -> Result<()> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(HmsError::Validation(format!("价格必须为非负数: {}", price)))
    }
}

#[derive(Debug)]
pub struct CanteenService {
    menu: BTreeMap<String, Vec<CanteenItem>>,
    store: CsvStore<MenuEntry>,
}

impl CanteenService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            menu: BTreeMap::new(),
            store: CsvStore::new(path),
        }
    }

    pub fn load(&mut self) -> Result<LoadSummary> {
        let report = self.store.load()?;
        self.menu.clear();
        for entry in report.records {
            self.menu.entry(entry.category).or_default().push(entry.item);
        }
        let summary = LoadSummary {
            loaded: self.menu.values().map(Vec::len).sum(),
            skipped: report.skipped.len(),
        };
        tracing::info!(
            "Loaded {} canteen items in {} categories ({} skipped)",
            summary.loaded,
            self.menu.len(),
            summary.skipped
        );
        Ok(summary)
    }

    fn entries(&self) -> Vec<MenuEntry> {
        self.menu
            .iter()
            .flat_map(|(category, items)| {
                items.iter().map(move |item| MenuEntry {
                    category: category.clone(),
                    item: item.clone(),
                })
            })
            .collect()
    }

    fn commit(&mut self, snapshot: BTreeMap<String, Vec<CanteenItem>>) -> Result<()> {
        if let Err(e) = self.store.save_all(self.entries().iter()) {
            self.menu = snapshot;
            tracing::error!("保存菜单失败，已恢复: {}", e);
            return Err(e);
        }
        Ok(())
    }

    fn position(&self, category: &str, name: &str) -> Result<(String, usize)> {
        let key = category_key(category);
        let items = self
            .menu
            .get(&key)
            .ok_or_else(|| HmsError::NotFound(format!("分类 {}", category.trim())))?;
        let name = name.trim();
        let pos = items
            .iter()
            .position(|item| item.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| HmsError::NotFound(format!("菜品 {} ({})", name, key)))?;
        Ok((key, pos))
    }

    /// 分类列表，按字母序
    pub fn categories(&self) -> Vec<&str> {
        self.menu.keys().map(String::as_str).collect()
    }

    /// 分类下的菜品；分类不存在时返回空
    pub fn items_in(&self, category: &str) -> &[CanteenItem] {
        self.menu
            .get(&category_key(category))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn menu(&self) -> &BTreeMap<String, Vec<CanteenItem>> {
        &self.menu
    }

    /// 添加菜品，分类不存在时自动创建
    pub fn add_item(&mut self, category: &str, item: CanteenItem) -> Result<()> {
        check_price(item.price)?;
        let key = category_key(category);
        if key.is_empty() {
            return Err(HmsError::Validation("分类不能为空".to_string()));
        }
        if self
            .items_in(&key)
            .iter()
            .any(|existing| existing.name.eq_ignore_ascii_case(item.name.trim()))
        {
            return Err(HmsError::DuplicateItem(item.name));
        }

        let snapshot = self.menu.clone();
        let name = item.name.clone();
        self.menu.entry(key.clone()).or_default().push(item);
        self.commit(snapshot)?;
        tracing::info!("Added canteen item {} to {}", name, key);
        Ok(())
    }

    /// 修改菜名和价格，菜品位置不变
    pub fn update_item(
        &mut self,
        category: &str,
        name: &str,
        replacement: CanteenItem,
    ) -> Result<()> {
        check_price(replacement.price)?;
        let (key, pos) = self.position(category, name)?;
        let snapshot = self.menu.clone();
        if let Some(items) = self.menu.get_mut(&key) {
            items[pos] = replacement;
        }
        self.commit(snapshot)?;
        tracing::info!("Updated canteen item {} in {}", name.trim(), key);
        Ok(())
    }

    /// 删除菜品；分类清空后一并移除
    pub fn delete_item(&mut self, category: &str, name: &str) -> Result<CanteenItem> {
        let (key, pos) = self.position(category, name)?;
        let snapshot = self.menu.clone();
        let mut removed = None;
        if let Some(items) = self.menu.get_mut(&key) {
            removed = Some(items.remove(pos));
            if items.is_empty() {
                self.menu.remove(&key);
            }
        }
        let removed = removed.ok_or_else(|| HmsError::NotFound(format!("菜品 {}", name.trim())))?;
        self.commit(snapshot)?;
        tracing::info!("Deleted canteen item {} from {}", removed.name, key);
        Ok(removed)
    }

    /// 计算点餐总价，不修改菜单
    pub fn quote(&self, picks: &[MenuPick]) -> Result<CanteenBill> {
        let mut bill = CanteenBill {
            items: Vec::with_capacity(picks.len()),
            total: 0.0,
        };
        for pick in picks {
            let (key, pos) = self.position(&pick.category, &pick.name)?;
            let item = &self.menu[&key][pos];
            bill.total += item.price;
            bill.items.push(item.clone());
        }
        Ok(bill)
    }

    pub fn len(&self) -> usize {
        self.menu.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.menu.is_empty()
    }
}
