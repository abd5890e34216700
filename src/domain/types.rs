// ==========================================
// 轮胎厂生产 KPI 系统 - 领域类型定义
// ==========================================
// 职责: 标准列词表、列角色、去重策略、数据源类别
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 标准列 (Canonical Column)
// ==========================================
// 所有报表的表头最终都归一到这一组列名
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalColumn {
    Date,     // 生产日期
    TyreSize, // 轮胎规格
    Quantity, // 产量
    Target,   // 计划产量
    AGrade,   // A 级品数量
    BGrade,   // B 级品数量
    Scrap,    // 废品数量
    Rework,   // 返修数量
    Oee,      // 设备综合效率（%）
    Fpy,      // 一次合格率（%）
}

impl CanonicalColumn {
    pub const ALL: [CanonicalColumn; 10] = [
        CanonicalColumn::Date,
        CanonicalColumn::TyreSize,
        CanonicalColumn::Quantity,
        CanonicalColumn::Target,
        CanonicalColumn::AGrade,
        CanonicalColumn::BGrade,
        CanonicalColumn::Scrap,
        CanonicalColumn::Rework,
        CanonicalColumn::Oee,
        CanonicalColumn::Fpy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalColumn::Date => "date",
            CanonicalColumn::TyreSize => "tyre_size",
            CanonicalColumn::Quantity => "quantity",
            CanonicalColumn::Target => "target",
            CanonicalColumn::AGrade => "a_grade",
            CanonicalColumn::BGrade => "b_grade",
            CanonicalColumn::Scrap => "scrap",
            CanonicalColumn::Rework => "rework",
            CanonicalColumn::Oee => "oee",
            CanonicalColumn::Fpy => "fpy",
        }
    }

    /// 列角色决定类型转换策略
    pub fn role(&self) -> ColumnRole {
        match self {
            CanonicalColumn::Date => ColumnRole::Date,
            CanonicalColumn::TyreSize => ColumnRole::Label,
            CanonicalColumn::Oee | CanonicalColumn::Fpy => ColumnRole::Percentage,
            _ => ColumnRole::Count,
        }
    }
}

impl fmt::Display for CanonicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CanonicalColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        CanonicalColumn::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| format!("未知标准列: {}", s))
    }
}

// ==========================================
// 列角色 (Column Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnRole {
    Date,       // 日期：多格式试解析，失败为缺失
    Label,      // 文本标签：TRIM
    Count,      // 计数：失败按 0 处理
    Percentage, // 百分比：失败为缺失，越界不截断
}

// ==========================================
// 列名 (Column) - 标准列或保留原样的其它列
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Canonical(CanonicalColumn),
    Other(String),
}

impl Column {
    pub fn name(&self) -> &str {
        match self {
            Column::Canonical(c) => c.as_str(),
            Column::Other(name) => name.as_str(),
        }
    }

    pub fn canonical(&self) -> Option<CanonicalColumn> {
        match self {
            Column::Canonical(c) => Some(*c),
            Column::Other(_) => None,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ==========================================
// 去重策略 (Dedup Policy)
// ==========================================
// 键: (date, tyre_size)；加载顺序 = 文件名字典序 → 工作表顺序 → 行顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    #[default]
    KeepFirst, // 先到先得
    KeepLast,  // 后到覆盖
}

impl fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupPolicy::KeepFirst => write!(f, "keep_first"),
            DedupPolicy::KeepLast => write!(f, "keep_last"),
        }
    }
}

impl FromStr for DedupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep_first" | "first" => Ok(DedupPolicy::KeepFirst),
            "keep_last" | "last" => Ok(DedupPolicy::KeepLast),
            other => Err(format!("未知去重策略: {}", other)),
        }
    }
}

// ==========================================
// 数据源类别 (Source Kind)
// ==========================================
// 仅按文件名关键字分类，用于日志和加载报告，不改变解析路径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Generic,
}

impl SourceKind {
    pub fn from_file_name(file_name: &str) -> Self {
        let lower = file_name.to_lowercase();
        if lower.contains("weekly") {
            SourceKind::Weekly
        } else if lower.contains("daily") {
            SourceKind::Daily
        } else if lower.contains("monthly") {
            SourceKind::Monthly
        } else if lower.contains("year") {
            SourceKind::Yearly
        } else {
            SourceKind::Generic
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Daily => write!(f, "DAILY"),
            SourceKind::Weekly => write!(f, "WEEKLY"),
            SourceKind::Monthly => write!(f, "MONTHLY"),
            SourceKind::Yearly => write!(f, "YEARLY"),
            SourceKind::Generic => write!(f, "GENERIC"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_column_round_trip_names() {
        for column in CanonicalColumn::ALL {
            assert_eq!(column.as_str().parse::<CanonicalColumn>(), Ok(column));
        }
        assert!("remarks".parse::<CanonicalColumn>().is_err());
    }

    #[test]
    fn test_column_roles() {
        assert_eq!(CanonicalColumn::Date.role(), ColumnRole::Date);
        assert_eq!(CanonicalColumn::TyreSize.role(), ColumnRole::Label);
        assert_eq!(CanonicalColumn::Oee.role(), ColumnRole::Percentage);
        assert_eq!(CanonicalColumn::Scrap.role(), ColumnRole::Count);
    }

    #[test]
    fn test_source_kind_from_file_name() {
        assert_eq!(SourceKind::from_file_name("Weekly Tyre 2025.xlsx"), SourceKind::Weekly);
        assert_eq!(SourceKind::from_file_name("Daily Pro; A,B,R Report .xlsx"), SourceKind::Daily);
        assert_eq!(SourceKind::from_file_name("MONTHLY.xlsx"), SourceKind::Monthly);
        assert_eq!(
            SourceKind::from_file_name("1.  Tyre PD ; A.B.R ( 2025) year ).xlsx"),
            SourceKind::Yearly
        );
        assert_eq!(SourceKind::from_file_name("export.csv"), SourceKind::Generic);
    }

    #[test]
    fn test_dedup_policy_parse() {
        assert_eq!("keep_last".parse::<DedupPolicy>(), Ok(DedupPolicy::KeepLast));
        assert_eq!(" First ".parse::<DedupPolicy>(), Ok(DedupPolicy::KeepFirst));
        assert!("random".parse::<DedupPolicy>().is_err());
    }
}
