// ==========================================
// 轮胎厂生产 KPI 系统 - 数据质量检查
// ==========================================
// 职责: 对标准数据集运行合理性规则，输出发现列表
// 规则: 重复键 / 产量为负 / 其它计数为负 / OEE 越界 / FPY 越界
// 红线: 仅提示，不修改、不过滤数据集；每条规则至多一条发现
// ==========================================

use crate::domain::record::{CanonicalDataset, CanonicalRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    DuplicateKey,     // (date, tyre_size) 重复
    NegativeQuantity, // 产量为负
    NegativeCount,    // 计划/分级/废品/返修为负
    OeeOutOfRange,    // OEE 不在 [0, 100]
    FpyOutOfRange,    // FPY 不在 [0, 100]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityFinding {
    pub kind: FindingKind,
    pub affected_rows: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QualityChecker;

impl QualityChecker {
    pub fn new() -> Self {
        Self
    }

    /// 运行全部规则（空数据集返回空列表）
    pub fn check(&self, dataset: &CanonicalDataset) -> Vec<QualityFinding> {
        let records = dataset.records();
        let mut findings = Vec::new();

        let duplicates = count_duplicates(records);
        if duplicates > 0 {
            findings.push(QualityFinding {
                kind: FindingKind::DuplicateKey,
                affected_rows: duplicates,
                message: format!("发现 {} 行重复的 (date, tyre_size) 记录", duplicates),
            });
        }

        let negative_qty = records.iter().filter(|r| r.quantity < 0.0).count();
        if negative_qty > 0 {
            findings.push(QualityFinding {
                kind: FindingKind::NegativeQuantity,
                affected_rows: negative_qty,
                message: format!("发现 {} 行产量为负数", negative_qty),
            });
        }

        let negative_other = records
            .iter()
            .filter(|r| {
                [r.target, r.a_grade, r.b_grade, r.scrap, r.rework]
                    .iter()
                    .any(|v| *v < 0.0)
            })
            .count();
        if negative_other > 0 {
            findings.push(QualityFinding {
                kind: FindingKind::NegativeCount,
                affected_rows: negative_other,
                message: format!("发现 {} 行计划/分级/废品/返修数量为负数", negative_other),
            });
        }

        let bad_oee = records.iter().filter(|r| out_of_range(r.oee)).count();
        if bad_oee > 0 {
            findings.push(QualityFinding {
                kind: FindingKind::OeeOutOfRange,
                affected_rows: bad_oee,
                message: format!("发现 {} 行 OEE 超出 0-100 范围", bad_oee),
            });
        }

        let bad_fpy = records.iter().filter(|r| out_of_range(r.fpy)).count();
        if bad_fpy > 0 {
            findings.push(QualityFinding {
                kind: FindingKind::FpyOutOfRange,
                affected_rows: bad_fpy,
                message: format!("发现 {} 行 FPY 超出 0-100 范围", bad_fpy),
            });
        }

        findings
    }

    /// 仅返回文本
    pub fn messages(&self, dataset: &CanonicalDataset) -> Vec<String> {
        self.check(dataset).into_iter().map(|f| f.message).collect()
    }
}

/// 重复行数（每个键第二次及以后的出现）
fn count_duplicates(records: &[CanonicalRecord]) -> usize {
    let mut seen = HashSet::with_capacity(records.len());
    records.iter().filter(|r| !seen.insert(r.key())).count()
}

fn out_of_range(value: Option<f64>) -> bool {
    value.is_some_and(|v| !(0.0..=100.0).contains(&v))
}
