// ==========================================
// 轮胎厂生产 KPI 系统 - 标准记录与标准数据集
// ==========================================
// 职责: 加载层的唯一产物，KPI 引擎与质量检查的唯一输入
// 红线: 记录必须具备 date + tyre_size；数值缺失按 0，负值不自动修正
// ==========================================

use crate::domain::types::DedupPolicy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ==========================================
// CanonicalRecord - 一条生产观测
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    // ===== 必填键 =====
    pub date: NaiveDate,   // 生产日期
    pub tyre_size: String, // 轮胎规格（已 TRIM）

    // ===== 计数字段（缺失按 0）=====
    pub quantity: f64,
    pub target: f64,
    pub a_grade: f64,
    pub b_grade: f64,
    pub scrap: f64,
    pub rework: f64,

    // ===== 百分比字段（缺失保持 None，越界不截断）=====
    pub oee: Option<f64>,
    pub fpy: Option<f64>,

    // ===== 溯源 =====
    pub source_file: String,

    // 未识别的列，按归一化列名原样保留
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

impl CanonicalRecord {
    /// 创建只有键字段的记录，其它数值为 0
    pub fn new(date: NaiveDate, tyre_size: impl Into<String>, source_file: impl Into<String>) -> Self {
        Self {
            date,
            tyre_size: tyre_size.into(),
            quantity: 0.0,
            target: 0.0,
            a_grade: 0.0,
            b_grade: 0.0,
            scrap: 0.0,
            rework: 0.0,
            oee: None,
            fpy: None,
            source_file: source_file.into(),
            extras: BTreeMap::new(),
        }
    }

    /// 去重键 (date, tyre_size)
    pub fn key(&self) -> (NaiveDate, &str) {
        (self.date, self.tyre_size.as_str())
    }
}

// ==========================================
// CanonicalDataset - 按日期升序的标准数据集
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDataset {
    records: Vec<CanonicalRecord>,
}

impl CanonicalDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由任意记录构造（只排序，不去重）
    ///
    /// 质量检查需要看到原始重复，因此这里不做去重
    pub fn from_records(mut records: Vec<CanonicalRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    /// 去重后构造
    ///
    /// # 返回
    /// - (数据集, 被去掉的重复行数)
    pub fn from_records_dedup(records: Vec<CanonicalRecord>, policy: DedupPolicy) -> (Self, usize) {
        let (kept, removed) = dedup_records(records, policy);
        (Self::from_records(kept), removed)
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CanonicalRecord> {
        self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CanonicalRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 数据中最晚的日期（周期窗口的锚点）
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    /// 闭区间 [start, end] 内的记录
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&CanonicalRecord> {
        self.records
            .iter()
            .filter(|r| r.date >= start && r.date <= end)
            .collect()
    }

    /// 某一天的记录
    pub fn on(&self, date: NaiveDate) -> Vec<&CanonicalRecord> {
        self.between(date, date)
    }
}

impl<'a> IntoIterator for &'a CanonicalDataset {
    type Item = &'a CanonicalRecord;
    type IntoIter = std::slice::Iter<'a, CanonicalRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// 按 (date, tyre_size) 去重，保持首次出现的位置
///
/// KeepLast 时后到的记录覆盖首次出现位置上的记录
pub fn dedup_records(records: Vec<CanonicalRecord>, policy: DedupPolicy) -> (Vec<CanonicalRecord>, usize) {
    let total = records.len();
    let mut index: HashMap<(NaiveDate, String), usize> = HashMap::with_capacity(total);
    let mut kept: Vec<CanonicalRecord> = Vec::with_capacity(total);

    for record in records {
        let key = (record.date, record.tyre_size.clone());
        match index.get(&key) {
            Some(&pos) => {
                if policy == DedupPolicy::KeepLast {
                    kept[pos] = record;
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(record);
            }
        }
    }

    let removed = total - kept.len();
    (kept, removed)
}
